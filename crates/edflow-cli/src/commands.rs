use std::fs::File;
use std::io::{self, BufReader};

use anyhow::{Context, Result};
use edflow_cli::input::{load_options, read_csv_text};
use edflow_transform::{RowProgress, transform_ed, transform_visits};
use edflow_worker::{ServeStats, Worker, serve};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span};

use crate::cli::{EdSummaryArgs, ServeArgs, TransformArgs};
use crate::summary::{print_ed_summary, print_visit_summary};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} rows {msg}";

pub fn run_serve(args: &ServeArgs) -> Result<ServeStats> {
    let mut worker = Worker::default();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    let stats = match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("open requests {}", path.display()))?;
            serve(&mut worker, BufReader::new(file), &mut output)
        }
        None => serve(&mut worker, io::stdin().lock(), &mut output),
    }
    .context("serve requests")?;
    Ok(stats)
}

pub fn run_transform(args: &TransformArgs) -> Result<()> {
    let span = info_span!("transform", path = %args.csv.display());
    let _guard = span.enter();
    let text = read_csv_text(&args.csv)?;
    let options = load_options(args.options.as_deref())?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .context("progress bar template")?
            .progress_chars("#>-"),
    );
    let mut sink = |progress: RowProgress| -> io::Result<()> {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.current as u64);
        Ok(())
    };
    let result = transform_visits(&text, &options, args.progress_step, &mut sink)
        .with_context(|| format!("transform {}", args.csv.display()))?;
    bar.finish_and_clear();
    info!(records = result.records.len(), "transform finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_visit_summary(&result, args.days);
    }
    Ok(())
}

pub fn run_ed_summary(args: &EdSummaryArgs) -> Result<()> {
    let span = info_span!("ed_summary", path = %args.csv.display());
    let _guard = span.enter();
    let text = read_csv_text(&args.csv)?;
    let options = load_options(args.options.as_deref())?;
    let result = transform_ed(&text, &options)
        .with_context(|| format!("summarize {}", args.csv.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_ed_summary(&result);
    }
    Ok(())
}
