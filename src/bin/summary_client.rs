//! Command-line front end for the summary server.
//!
//! Uploads one PDF, prints the markdown summary on stdout, and reports failures on stderr with a
//! non-zero exit code.
use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use pdfsummary::{
    client::{ClientSession, SelectedFile, SummaryClient},
    logging,
};

#[derive(Parser)]
#[command(
    name = "summary-client",
    about = "Upload a PDF to the summary server and print its summary"
)]
struct Cli {
    /// PDF file to summarize.
    file: PathBuf,
    /// Base URL of the summary server.
    #[arg(long, env = "SUMMARY_SERVER_URI", default_value = "http://localhost:3000")]
    server: String,
    /// Write the summary to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Log request details to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing(cli.verbose);

    let mut session = ClientSession::new();
    match SelectedFile::from_path(&cli.file).await {
        Ok(file) => {
            session.select_file(file, Instant::now());
        }
        Err(error) => session.reject_file(&error, Instant::now()),
    }
    if let Some(message) = session.error_message() {
        bail!("{message}");
    }

    let Some(file) = session.begin_submit() else {
        bail!("no file selected");
    };
    tracing::info!(file = %file.name, size = file.size, server = %cli.server, "Uploading PDF");

    let client = SummaryClient::new(cli.server.clone())?;
    let outcome = client.request_summary(&file).await;
    session.finish_submit(outcome, Instant::now());

    if let Some(message) = session.error_message() {
        bail!("{message}");
    }
    let summary = session.summary().unwrap_or_default();

    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, summary)
                .await
                .with_context(|| format!("failed to write summary to {}", path.display()))?;
            eprintln!("Summary written to {}", path.display());
        }
        None => println!("{summary}"),
    }
    Ok(())
}
