use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use garment_uploader::catalog::matcher::Rename;
use garment_uploader::job::{BatchFile, JobOverrides, JobSpec, Layout, Preset};
use garment_uploader::pipeline::{self, RunReport, StatusLog};
use garment_uploader::{PipelineError, StoreConfig, store};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "garment-upload",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bulk-upload garment photos and save the resulting URLs as a JSON manifest",
    long_about = "Matches loosely named front/back product photos into items, uploads each image \
                  to Cloudinary or S3 one at a time, and writes an item -> [front_url, back_url] \
                  manifest. Failed uploads are reported and counted, never retried.",
    after_help = "Examples:\n  \
                  garment-upload run ~/Downloads/Hoodie --preset hoodies -o hoodie_urls.json\n  \
                  garment-upload run ./Tshirts --preset tshirts -o tshirt_urls.json --dry-run\n  \
                  garment-upload run ./Mockups --category sweatshirts --layout folders -o sweatshirt_urls.json\n  \
                  garment-upload batch jobs.yaml\n\n\
                  Configuration (.env):\n  \
                  STORE_BACKEND=cloudinary            # or s3\n  \
                  CLOUDINARY_CLOUD_NAME=my-cloud\n  \
                  CLOUDINARY_API_KEY=...\n  \
                  CLOUDINARY_API_SECRET=...\n  \
                  AWS_REGION=us-west-2                # s3 backend\n  \
                  S3_BUCKET=my-bucket                 # s3 backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one source directory
    Run(RunArgs),
    /// Upload every job listed in a YAML file, in order
    Batch {
        /// Path to the YAML batch file
        #[arg(value_name = "JOBS_YAML")]
        file: PathBuf,

        /// Show what would be uploaded without uploading
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding the photos (or one folder per item)
    source: PathBuf,

    /// Manifest file to write (overwritten if present)
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Start from the settings of a known garment category
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Category name used in destination tags (required without --preset)
    #[arg(long)]
    category: Option<String>,

    /// Prefix for manifest keys and destination folders, e.g. "Hoodie"
    #[arg(long)]
    label: Option<String>,

    /// How the source directory is organised
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Accepted image extensions (comma-separated, e.g., "png,jpg")
    #[arg(long, short = 'e', value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Fix a known misspelling before parsing item keys (from=to, repeatable)
    #[arg(long = "rename", value_name = "FROM=TO")]
    renames: Vec<Rename>,

    /// Root of every destination tag
    #[arg(long)]
    tag_root: Option<String>,

    /// Show what would be uploaded without uploading
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn into_job(self) -> Result<(JobSpec, bool)> {
        let overrides = JobOverrides {
            preset: self.preset,
            category: self.category,
            label: self.label,
            layout: self.layout,
            extensions: self.extensions,
            renames: (!self.renames.is_empty()).then_some(self.renames),
            tag_root: self.tag_root,
        };
        Ok((overrides.resolve(self.source, self.output)?, self.dry_run))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let log_level = log_directive(
        std::env::var("LOG_LEVEL").ok(),
        std::env::var("RUST_LOG").ok(),
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    info!("Garment upload v{}", env!("CARGO_PKG_VERSION"));

    let (jobs, dry_run) = match cli.command {
        Command::Run(args) => {
            let (job, dry_run) = args.into_job()?;
            (vec![job], dry_run)
        }
        Command::Batch { file, dry_run } => (BatchFile::load(&file)?, dry_run),
    };

    let status = StatusLog::new();

    if dry_run {
        let mut slots = 0;
        for job in &jobs {
            slots += pipeline::dry_run(job, &status).map_err(fatal)?;
        }
        status.finish();
        println!();
        println!("{}", style(format!("{} image(s) would be uploaded", slots)).bold());
        return Ok(());
    }

    let config = StoreConfig::from_env()?;
    let store = store::connect(&config).await?;

    let mut runs: Vec<(String, RunReport)> = Vec::new();
    for job in &jobs {
        let report = pipeline::run(&*store, job, &status)
            .await
            .map_err(fatal)?;
        runs.push((job.category.clone(), report));
    }

    if runs.len() > 1 {
        status.grand_total(&runs);
    }

    Ok(())
}

/// `LOG_LEVEL` wins over `RUST_LOG`; blank values are skipped
fn log_directive(log_level: Option<String>, rust_log: Option<String>) -> String {
    log_level
        .filter(|v| !v.trim().is_empty())
        .or_else(|| rust_log.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "info".to_string())
}

fn fatal(e: PipelineError) -> anyhow::Error {
    eprintln!("{} {}", style("✗").red(), style(e.user_message()).red());
    if e.after_uploads() {
        eprintln!(
            "{}",
            style("  Images from this job are already in the store; re-running uploads them again")
                .dim()
        );
    }
    anyhow::Error::new(e)
}
