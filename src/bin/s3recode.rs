use anyhow::Result;
use colored::Colorize;
use s3recode::{
    cli::{Settings, start},
    pipeline::{RecordOutcome, Recoder},
};
use std::{process::exit, sync::Arc};

fn status_line(outcome: &RecordOutcome) -> String {
    let source = format!("{}/{}", outcome.bucket, outcome.source_key);
    let target = format!("{}/{}", outcome.bucket, outcome.target_key);

    match &outcome.result {
        Ok(summary) => format!(
            "{} {source} -> {target} ({} parts, {} bytes, etag: {})",
            "OK".green(),
            summary.parts,
            summary.bytes_written,
            summary.etag
        ),
        Err(e) => {
            let mut line = format!("{} {source} -> {target}: {e}", "FAILED".red());
            if let Some(abort_error) = &outcome.abort_error {
                line.push_str(&format!(", abort failed: {abort_error}"));
            }
            line
        }
    }
}

async fn run(settings: Settings) -> Result<bool> {
    let Settings { s3, config, event } = settings;

    let recoder = Recoder::new(Arc::new(s3), config)?;

    // Ctrl-C aborts the open uploads before exiting
    let token = recoder.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, aborting");
            token.cancel();
        }
    });

    if event.records.is_empty() {
        println!("no records to process");
        return Ok(true);
    }

    let outcomes = recoder.process_batch(&event).await;

    for outcome in &outcomes {
        println!("{}", status_line(outcome));
    }

    Ok(outcomes.iter().all(RecordOutcome::is_success))
}

#[tokio::main]
async fn main() {
    let settings = match start() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red());
            exit(1);
        }
    };

    match run(settings).await {
        Ok(true) => (),
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red());
            exit(1);
        }
    }
}
