//! Batch processing command for many card files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use tally_core::validation::sort_by_issues;
use tally_core::{FormSchema, TallyConfig, ValidatedForm};

use super::output::{check_meta, format_report, parse_meta, CardReport, OutputFormat};
use super::{load_config, load_schema, CardSource, InputKind};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input cards (images or fragment JSON)
    #[arg(required = true)]
    input: String,

    /// Form schema (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Metadata column for CSV output (key=value, repeatable)
    #[arg(long = "meta", value_parser = parse_meta)]
    meta: Vec<(String, String)>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    report: Option<CardReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

impl FileResult {
    fn review(&self) -> Option<&ValidatedForm> {
        self.report.as_ref().map(|r| &r.review)
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let schema = load_schema(&args.schema)?;
    check_meta(&args.meta)?;

    let output_dir_ref = args.output_dir.as_deref();
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| InputKind::of(p).is_some())
        .filter(|p| !is_own_output(p, output_dir_ref))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        check_output_names(&files, args.format, args.summary)?;
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = process_files(&files, &schema, &config, &args, &pb);
    pb.finish_and_clear();

    if !args.continue_on_error {
        if let Some(failed) = results.iter().find(|r| r.error.is_some()) {
            let message = failed.error.as_deref().unwrap_or("unknown error");
            error!("Failed to process {}: {}", failed.path.display(), message);
            anyhow::bail!("Processing failed for {}: {}", failed.path.display(), message);
        }
    }

    sort_by_issues(&mut results, FileResult::review);

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            let Some(report) = &result.report else {
                continue;
            };
            let output_path = output_dir.join(output_name(&result.path, args.format));

            let content = format_report(report, args.format, &args.meta, false)?;
            fs::write(&output_path, content)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let (successful, failed): (Vec<&FileResult>, Vec<&FileResult>) =
        results.iter().partition(|r| r.report.is_some());

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    let needing_review: Vec<_> = successful
        .iter()
        .filter_map(|r| r.report.as_ref().map(|report| (&r.path, report)))
        .filter(|(_, report)| report.issue_count > 0)
        .collect();
    if !needing_review.is_empty() {
        println!();
        println!("{}", style("Cards needing review:").yellow());
        for (path, report) in needing_review {
            let note = if report.ocr_failure.is_some() {
                " (OCR failed)"
            } else {
                ""
            };
            println!("  - {}: {} fields{}", path.display(), report.issue_count, note);
        }
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Process `files` on scoped worker threads, returning results in input order.
///
/// Each worker owns its own card source, so OCR models load once per worker.
/// Without `--continue-on-error`, workers stop picking up files after the
/// first failure.
fn process_files(
    files: &[PathBuf],
    schema: &FormSchema,
    config: &TallyConfig,
    args: &BatchArgs,
    pb: &ProgressBar,
) -> Vec<FileResult> {
    let jobs = args.jobs.clamp(1, files.len().max(1));
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);

    debug!("Processing {} files with {} workers", files.len(), jobs);

    let (next, stop) = (&next, &stop);

    let mut indexed: Vec<(usize, FileResult)> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(jobs);
        for _ in 0..jobs {
            handles.push(scope.spawn(move || {
                let mut source = CardSource::new(config, args.model_dir.clone());
                let mut done = Vec::new();

                while !stop.load(Ordering::Relaxed) {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = files.get(index) else {
                        break;
                    };

                    let result = process_single_file(&mut source, path, schema, config);
                    if let Some(e) = &result.error {
                        warn!("Failed to process {}: {}", path.display(), e);
                        if !args.continue_on_error {
                            stop.store(true, Ordering::Relaxed);
                        }
                    }

                    done.push((index, result));
                    pb.inc(1);
                }

                done
            }));
        }

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(done) => done,
                Err(_) => {
                    error!("Batch worker panicked; its files are missing from the results");
                    Vec::new()
                }
            })
            .collect()
    });

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

fn process_single_file(
    source: &mut CardSource<'_>,
    path: &Path,
    schema: &FormSchema,
    config: &TallyConfig,
) -> FileResult {
    let file_start = Instant::now();
    let outcome = source.read(path, schema);
    let processing_time_ms = file_start.elapsed().as_millis() as u64;

    match outcome {
        Ok(reading) => FileResult {
            path: path.to_path_buf(),
            report: Some(CardReport::new(path, reading, schema, &config.validation)),
            error: None,
            processing_time_ms,
        },
        Err(e) => FileResult {
            path: path.to_path_buf(),
            report: None,
            error: Some(e.to_string()),
            processing_time_ms,
        },
    }
}

/// Report file name for an input card.
fn output_name(path: &Path, format: OutputFormat) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "card".into());
    format!("{}.{}", stem, format.extension())
}

/// Refuse inputs whose reports would overwrite each other in the output directory.
fn check_output_names(files: &[PathBuf], format: OutputFormat, summary: bool) -> anyhow::Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();

    for path in files {
        let name = output_name(path, format);
        if summary && name == "summary.csv" {
            anyhow::bail!(
                "Report for {} would overwrite the batch summary",
                path.display()
            );
        }
        if let Some(previous) = seen.insert(name.clone(), path.as_path()) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                path.display(),
                name
            );
        }
    }

    Ok(())
}

/// Whether `path` is a report this command wrote on an earlier run.
fn is_own_output(path: &Path, output_dir: Option<&Path>) -> bool {
    match (output_dir, path.parent()) {
        (Some(dir), Some(parent)) => {
            parent == dir && path.extension().and_then(|e| e.to_str()) == Some("json")
        }
        _ => false,
    }
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "issue_count",
        "found",
        "count_missing",
        "label_missing",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(report) = &result.report {
            let (found, count_missing, label_missing) = report.result.outcome_counts();
            let status = if report.ocr_failure.is_some() {
                "ocr-failed"
            } else {
                "success"
            };
            wtr.write_record([
                filename,
                status,
                &report.issue_count.to_string(),
                &found.to_string(),
                &count_missing.to_string(),
                &label_missing.to_string(),
                &result.processing_time_ms.to_string(),
                report.ocr_failure.as_deref().unwrap_or(""),
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
