//! Comparison Report Generator
//!
//! Reads two persisted run records (one per platform, same phase) and
//! renders a self-contained HTML comparison report. Exit code is
//! non-zero with a stderr message when the records are incomparable,
//! missing, or malformed.

use anyhow::{anyhow, Result};
use chrono::Utc;
use record::RunResultRecord;
use report::{compare, render, write_report, ReportOptions};
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <record_a.json> <record_b.json> <out.html>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!(
            "  {} results/windows_accelerated.json results/jetson_accelerated.json report.html",
            args[0]
        );
        eprintln!();
        return Err(anyhow!("Expected two record paths and an output path"));
    }

    let record_a = RunResultRecord::load(Path::new(&args[1]))?;
    let record_b = RunResultRecord::load(Path::new(&args[2]))?;

    println!("📊 Comparing run records");
    println!("  A: {} ({}, {})", args[1], record_a.platform, record_a.phase);
    println!("  B: {} ({}, {})", args[2], record_b.platform, record_b.phase);

    let comparison = compare(&record_a, &record_b)?;

    for name in &comparison.only_in_a {
        println!(
            "  ⚠️  Skipped (only {} reports it): {}",
            record_a.platform, name
        );
    }
    for name in &comparison.only_in_b {
        println!(
            "  ⚠️  Skipped (only {} reports it): {}",
            record_b.platform, name
        );
    }

    let title = format!(
        "{} vs {} ({})",
        record_a.platform, record_b.platform, comparison.phase
    );
    let options = ReportOptions::new(&title, Utc::now());
    let bytes = render(&comparison, &options);

    let out_path = Path::new(&args[3]);
    write_report(out_path, &bytes)?;

    println!();
    println!("✅ Report written to: {}", out_path.display());
    Ok(())
}
