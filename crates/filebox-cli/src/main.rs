//! FileBox CLI: validate, screen and pack files from disk.
//!
//! Configuration comes from `--config <file.json>` or `FILEBOX_*` variables
//! (a `.env` file is honoured), with flags applied on top.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use filebox_cli::{
    default_output_path, load_config, open_files, parse_archive_format, ConfigOverrides,
    IntakeReport, PackReport,
};
use filebox_core::AppError;
use filebox_infra::{ArchiveFormat, ErrorResponse};
use filebox_services::IntakeController;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "filebox", about = "Validate, screen and archive files")]
struct Cli {
    /// JSON configuration file (partial documents merge over the defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Skip screening entirely
    #[arg(long, global = true)]
    no_scan: bool,
    /// Remote scanning endpoint receiving each file as multipart upload
    #[arg(long, global = true)]
    scan_endpoint: Option<String>,
    /// Per-file size limit in MiB
    #[arg(long, global = true)]
    max_file_size_mb: Option<u64>,
    /// Maximum number of files (<= 0 for unlimited)
    #[arg(long, global = true)]
    max_files: Option<i64>,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and screen files, printing a report
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate, screen and archive the accepted files
    Pack {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output path (defaults to filebox-YYYY-MM-DD.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Archive format: zip or tar-gz
        #[arg(long, default_value = "zip", value_parser = parse_archive_format)]
        format: ArchiveFormat,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print the structured error and turn it into the process error.
fn report_error(err: AppError) -> anyhow::Error {
    if let Ok(out) = serde_json::to_string_pretty(&ErrorResponse::from(&err)) {
        eprintln!("{}", out);
    }
    anyhow::Error::new(err)
}

async fn intake(controller: &IntakeController, files: &[PathBuf]) -> anyhow::Result<IntakeReport> {
    let handles = open_files(files).await?;
    controller.files_added(handles).map_err(report_error)?;
    controller.wait_until_idle().await;
    Ok(IntakeReport::from(&controller.snapshot()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    filebox_infra::init_telemetry(cli.json_logs)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let overrides = ConfigOverrides {
        no_scan: cli.no_scan,
        scan_endpoint: cli.scan_endpoint,
        max_file_size_mb: cli.max_file_size_mb,
        max_files: cli.max_files,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;
    let controller = IntakeController::new(config).map_err(report_error)?;

    match cli.command {
        Commands::Check { files } => {
            let report = intake(&controller, &files).await?;
            print_json(&report)?;
        }
        Commands::Pack {
            files,
            output,
            format,
        } => {
            let report = intake(&controller, &files).await?;
            if report.valid == 0 {
                print_json(&report)?;
                anyhow::bail!("No files passed validation and screening");
            }

            controller.set_archive_format(format);
            let archive = controller.create_archive().await.map_err(report_error)?;
            let path = output
                .unwrap_or_else(|| default_output_path(format, chrono::Local::now().date_naive()));
            tokio::fs::write(&path, &archive.bytes)
                .await
                .with_context(|| format!("Failed to write archive to {}", path.display()))?;

            tracing::info!(path = %path.display(), entries = archive.names.len(), "Archive written");
            print_json(&PackReport {
                archive: path,
                size: archive.bytes.len() as u64,
                entries: archive.names,
                intake: report,
            })?;
        }
    }

    filebox_infra::shutdown_telemetry().await;
    Ok(())
}
