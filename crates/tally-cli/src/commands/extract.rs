//! Extract command - read field counts from a single card.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::output::{check_meta, format_report, parse_meta, CardReport, OutputFormat};
use super::{load_config, load_schema, CardSource, InputKind};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input card: an image, or a JSON file of OCR fragments
    #[arg(required = true)]
    input: PathBuf,

    /// Form schema (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Metadata column for CSV output (key=value, repeatable)
    #[arg(long = "meta", value_parser = parse_meta)]
    meta: Vec<(String, String)>,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let schema = load_schema(&args.schema)?;
    check_meta(&args.meta)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let Some(kind) = InputKind::of(&args.input) else {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    };

    info!("Extracting from {} ({:?})", args.input.display(), kind);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(match kind {
        InputKind::Image => "Running OCR...",
        InputKind::Fragments => "Matching fragments...",
    });

    let mut source = CardSource::new(&config, args.model_dir.clone());
    let reading = source.read(&args.input, &schema);
    pb.finish_and_clear();
    let reading = reading?;

    if let Some(failure) = &reading.ocr_failure {
        eprintln!(
            "{} OCR failed, every field reported as not found: {}",
            style("⚠").yellow(),
            failure
        );
    }

    let fragment_count = reading.fragment_count;
    let report = CardReport::new(&args.input, reading, &schema, &config.validation);
    let output = format_report(&report, args.format, &args.meta, args.show_confidence)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
        if !output.ends_with('\n') {
            println!();
        }
    }

    if args.show_confidence {
        let (found, count_missing, label_missing) = report.result.outcome_counts();
        eprintln!();
        eprintln!(
            "{} {} fragments: {} counts read, {} labels without count, {} labels not found",
            style("ℹ").blue(),
            fragment_count,
            found,
            count_missing,
            label_missing
        );
        eprintln!(
            "{} {} fields need review",
            style("ℹ").blue(),
            report.issue_count
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
