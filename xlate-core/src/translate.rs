//! Translation provider seam

use crate::error::{Error, Result};

/// One request to a translation provider.
#[derive(Debug, Clone)]
pub struct TranslationBatch {
    pub texts: Vec<String>,
    pub source_lang: Option<String>,
    pub target_lang: String,
    /// Free-form domain hint forwarded to the provider.
    pub context: Option<String>,
}

/// A translation backend.
///
/// Implementations translate every text in the batch and return the
/// results in the same order. The equal-length requirement is enforced
/// by the caller, so providers only need to report their own failures.
pub trait Translator {
    fn translate(&self, batch: &TranslationBatch) -> Result<Vec<String>>;
}

/// Call the provider and enforce the response-count invariant.
///
/// A response whose length differs from the request cannot be mapped
/// back to cells, so it fails loudly instead of being truncated or
/// padded.
pub fn translate_checked(
    translator: &dyn Translator,
    batch: &TranslationBatch,
) -> Result<Vec<String>> {
    let translations = translator.translate(batch)?;
    if translations.len() != batch.texts.len() {
        return Err(Error::Translation(format!(
            "provider returned {} translations for {} texts",
            translations.len(),
            batch.texts.len()
        )));
    }
    Ok(translations)
}

/// Translate `texts` in order-preserving batches of at most
/// `batch_size`.
pub fn translate_in_batches(
    translator: &dyn Translator,
    texts: &[String],
    batch_size: usize,
    source_lang: Option<&str>,
    target_lang: &str,
    context: Option<&str>,
) -> Result<Vec<String>> {
    let batch_size = batch_size.max(1);
    let mut translations = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let batch = TranslationBatch {
            texts: chunk.to_vec(),
            source_lang: source_lang.map(str::to_string),
            target_lang: target_lang.to_string(),
            context: context.map(str::to_string),
        };
        translations.extend(translate_checked(translator, &batch)?);
    }
    Ok(translations)
}

#[cfg(feature = "http-provider")]
pub use self::http::HttpTranslator;

#[cfg(feature = "http-provider")]
mod http {
    use super::{TranslationBatch, Translator};
    use crate::error::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize)]
    struct WireRequest<'a> {
        texts: &'a [String],
        #[serde(skip_serializing_if = "Option::is_none")]
        source_lang: Option<&'a str>,
        target_lang: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<&'a str>,
    }

    #[derive(Deserialize)]
    struct WireResponse {
        translations: Vec<String>,
    }

    /// Blocking JSON client for an HTTP translation endpoint.
    ///
    /// Posts `{texts, source_lang, target_lang, context}` and expects
    /// `{translations}` back.
    pub struct HttpTranslator {
        client: reqwest::blocking::Client,
        endpoint: String,
    }

    impl HttpTranslator {
        pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Translation(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: endpoint.to_string(),
            })
        }
    }

    impl Translator for HttpTranslator {
        fn translate(&self, batch: &TranslationBatch) -> Result<Vec<String>> {
            let request = WireRequest {
                texts: &batch.texts,
                source_lang: batch.source_lang.as_deref(),
                target_lang: &batch.target_lang,
                context: batch.context.as_deref(),
            };
            let body = serde_json::to_string(&request)
                .map_err(|e| Error::Translation(e.to_string()))?;
            let response = self
                .client
                .post(&self.endpoint)
                .header("content-type", "application/json")
                .body(body)
                .send()
                .map_err(|e| Error::Translation(e.to_string()))?;
            let status = response.status();
            let text = response
                .text()
                .map_err(|e| Error::Translation(e.to_string()))?;
            if !status.is_success() {
                return Err(Error::Translation(format!(
                    "endpoint returned {status}: {text}"
                )));
            }
            let wire: WireResponse = serde_json::from_str(&text)
                .map_err(|e| Error::Translation(format!("bad provider response: {e}")))?;
            Ok(wire.translations)
        }
    }
}
