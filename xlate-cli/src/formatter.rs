//! Output formatters for scans and run reports

use anyhow::Result;
use colored::*;
use std::path::Path;
use xlate_core::{Cell, RunReport, SheetFault};

/// Print a dry-run scan in human-readable format
pub fn print_candidates(file_path: &Path, cells: &[Cell], faults: &[SheetFault]) {
    println!("{}", format!("Scanning: {}", file_path.display()).bold());
    println!();

    if cells.is_empty() {
        println!("{}", "No translatable cells found.".yellow());
    } else {
        // Group by sheet, keeping document order
        let mut current_sheet: Option<&str> = None;
        for cell in cells {
            if current_sheet != Some(cell.sheet.as_str()) {
                if current_sheet.is_some() {
                    println!();
                }
                println!("{} {}", "Sheet:".bold(), cell.sheet.cyan().bold());
                current_sheet = Some(cell.sheet.as_str());
            }
            println!("  {} {}", cell.reference().yellow(), cell.value);
        }
        println!();
        println!("{} {}", "Translatable cells:".bold(), cells.len());
    }

    print_faults(faults);
}

/// Print a completed run in human-readable format
pub fn print_report(input: &Path, output: &Path, report: &RunReport) {
    println!(
        "{}",
        format!("Translated: {} -> {}", input.display(), output.display()).bold()
    );
    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Cells found:".bold(), report.cells_found);
    println!(
        "  {} {}",
        "Cells translated:".bold(),
        report.cells_translated
    );
    println!(
        "  {} {}",
        "Sheets modified:".bold(),
        report.sheets_modified
    );

    if !report.misses.is_empty() {
        println!();
        println!("{}", "Unmatched cells:".bold().underline());
        for miss in &report.misses {
            println!(
                "  {} {} {}",
                "MISS".yellow().bold(),
                miss.sheet.cyan(),
                miss.reference.yellow()
            );
        }
    }

    print_faults(&report.faults);
}

fn print_faults(faults: &[SheetFault]) {
    if faults.is_empty() {
        return;
    }
    println!();
    println!("{}", "Sheet faults:".bold().underline());
    for fault in faults {
        println!(
            "  {} {} {}",
            "FAULT".red().bold(),
            fault.sheet.cyan(),
            fault.message
        );
    }
}

/// Print a dry-run scan in JSON format
pub fn print_candidates_json(file_path: &Path, cells: &[Cell], faults: &[SheetFault]) -> Result<()> {
    let output = serde_json::json!({
        "file": file_path.display().to_string(),
        "cells": cells,
        "faults": faults,
        "summary": {
            "translatable_cells": cells.len(),
            "faults": faults.len(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print a completed run in JSON format
pub fn print_report_json(input: &Path, output: &Path, report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "input": input.display().to_string(),
        "output": output.display().to_string(),
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
