mod config;
mod error;
mod publish;
mod s3;
mod site;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use config::Config;
use error::SyncError;
use publish::{SyncReport, publish, sync};
use s3::{DryRunUploader, S3BatchUploader};
use site::HugoSiteBuilder;

#[derive(Parser, Debug)]
#[command(
    name = "site-publish",
    version = env!("CARGO_PKG_VERSION"),
    author = "Tyr Chen <tyr.chen@gmail.com>",
    about = "Build a Hugo site from git and publish it to S3",
    long_about = "Clones the site repository, runs hugo to generate it and uploads every generated file \
                  to an S3 bucket with a Content-Type and Cache-Control derived from its extension. \
                  Every file is uploaded on every run. Configure via .env file or flags.",
    after_help = "Examples:\n  \
                  site-publish                                  # Clone GIT_REPO, build, upload to S3_BUCKET\n  \
                  site-publish --dry-run                        # Build and show what would be uploaded\n  \
                  site-publish --output-dir ./public            # Upload an already generated site\n  \
                  site-publish --hugo-arg=--minify --hugo-arg=-D  # Pass custom arguments to hugo\n\n\
                  Configuration (.env):\n  \
                  GIT_REPO=https://github.com/me/blog.git\n  \
                  S3_BUCKET=my-blog\n  \
                  S3_REGION=us-west-2\n  \
                  HUGO_BIN=/var/task/hugo\n  \
                  SITE_WORK_DIR=/tmp/blog"
)]
struct Cli {
    /// Git repository holding the site source (overrides GIT_REPO)
    #[arg(long)]
    repo: Option<String>,

    /// Destination bucket (overrides S3_BUCKET)
    #[arg(long)]
    bucket: Option<String>,

    /// Bucket region (overrides S3_REGION)
    #[arg(long)]
    region: Option<String>,

    /// AWS profile to load credentials from (overrides AWS_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Checkout directory, wiped before every build (overrides SITE_WORK_DIR)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Path of the hugo executable (overrides HUGO_BIN)
    #[arg(long)]
    hugo: Option<PathBuf>,

    /// Argument passed to hugo after `-s <dir>`; repeat for more (default: --minify)
    #[arg(long = "hugo-arg", allow_hyphen_values = true)]
    hugo_args: Vec<String>,

    /// Skip cloning and building, upload this directory instead
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of concurrent uploads (overrides MAX_CONCURRENT)
    #[arg(long, short = 'c')]
    max_concurrent: Option<usize>,

    /// Perform a dry run (show what would be uploaded without uploading)
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Command line value for a configuration variable, if given
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "GIT_REPO" => self.repo.clone(),
            "S3_BUCKET" => self.bucket.clone(),
            "S3_REGION" => self.region.clone(),
            "AWS_PROFILE" => self.profile.clone(),
            "SITE_WORK_DIR" => self.work_dir.as_ref().map(|p| p.display().to_string()),
            "HUGO_BIN" => self.hugo.as_ref().map(|p| p.display().to_string()),
            "MAX_CONCURRENT" => self.max_concurrent.map(|n| n.to_string()),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("Site Publish v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env_with(|name| cli.lookup(name))?;

    let mut builder = HugoSiteBuilder::from_config(&config);
    if !cli.hugo_args.is_empty() {
        builder = builder.with_generator_args(cli.hugo_args.clone());
    }

    println!(
        "{}",
        style(format!("📦 Target: s3://{}", config.s3_bucket))
            .cyan()
            .bold()
    );

    let start = Instant::now();

    let result = if cli.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - No files will be uploaded")
                .yellow()
                .bold()
        );
        println!();
        run(&cli, &config, &builder, &DryRunUploader).await
    } else {
        info!("Concurrent workers: {}", config.max_concurrent);
        let client = s3::client::connect(&config).await;
        let uploader = S3BatchUploader::new(client, config.max_concurrent).with_progress();
        run(&cli, &config, &builder, &uploader).await
    };

    match result {
        Ok(report) => {
            print_summary(&report, start, cli.dry_run);
            Ok(())
        }
        Err(RunError::Config(e)) => Err(e),
        Err(RunError::Sync(e)) => {
            eprintln!("{} {}", style("✗").red(), style(e.user_message()).red());
            Err(e).context("Site publish failed")
        }
    }
}

enum RunError {
    Config(anyhow::Error),
    Sync(SyncError),
}

impl From<SyncError> for RunError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

async fn run<U: s3::BatchUploader>(
    cli: &Cli,
    config: &Config,
    builder: &HugoSiteBuilder,
    uploader: &U,
) -> std::result::Result<SyncReport, RunError> {
    if let Some(output_dir) = &cli.output_dir {
        return Ok(sync(output_dir, &config.s3_bucket, uploader).await?);
    }

    config.require_git_repo().map_err(RunError::Config)?;
    Ok(publish(config, builder, uploader).await?)
}

fn print_summary(report: &SyncReport, start: Instant, dry_run: bool) {
    let duration = start.elapsed();
    let verb = if dry_run { "would be uploaded" } else { "uploaded" };

    println!("\n{}", style("═".repeat(70)).dim());
    println!(
        "{}",
        style(format!(
            "Summary: {} object(s) {} to s3://{}",
            report.objects, verb, report.bucket
        ))
        .bold()
    );
    println!(
        "{}",
        style(format!(
            "Total: {} in {:.2}s",
            format_size(report.bytes),
            duration.as_secs_f64()
        ))
        .dim()
    );
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_cli_overrides_lookup() {
        let cli = Cli::parse_from([
            "site-publish",
            "--bucket",
            "my-blog",
            "--region",
            "eu-west-1",
            "-c",
            "3",
            "--hugo-arg=--minify",
            "--hugo-arg=-D",
        ]);

        assert_eq!(cli.lookup("S3_BUCKET").as_deref(), Some("my-blog"));
        assert_eq!(cli.lookup("S3_REGION").as_deref(), Some("eu-west-1"));
        assert_eq!(cli.lookup("MAX_CONCURRENT").as_deref(), Some("3"));
        assert_eq!(cli.lookup("GIT_REPO"), None);
        assert_eq!(cli.hugo_args, vec!["--minify", "-D"]);

        let config = Config::from_lookup(|name| cli.lookup(name)).unwrap();
        assert_eq!(config.s3_bucket, "my-blog");
        assert_eq!(config.max_concurrent, 3);
    }
}
