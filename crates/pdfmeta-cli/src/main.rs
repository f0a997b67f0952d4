use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfmeta_batch::{BatchIngestionCoordinator, BatchOptions, UploadedFile};
use pdfmeta_core::Config;
use pdfmeta_core::config_file::{self, ConfigFile};
use pdfmeta_ingest::{MetadataExtractor, get_pdf_info};

mod output;

use output::ColorMode;

/// Extract bibliographic metadata from academic PDFs and ingest them into an
/// article database
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract title, authors, year, DOI, ISSN, abstract and keywords from a PDF
    Extract {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Number of leading pages to read
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show page count, size, version and document info of a PDF
    Info {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Ingest PDFs into the article database
    Ingest {
        /// PDF files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory uploaded PDFs are stored in
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// Path to the SQLite article database
        #[arg(long)]
        database: Option<PathBuf>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-file timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show or initialise the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration (defaults, config files, environment)
    Show {
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Write the default configuration to the platform config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfmeta=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = config_file::resolve_config();

    match cli.command {
        Command::Extract {
            file_path,
            max_pages,
            json,
            no_color,
        } => extract(&file_path, config, max_pages, json, no_color),
        Command::Info {
            file_path,
            json,
            no_color,
        } => info(&file_path, json, no_color),
        Command::Ingest {
            files,
            upload_dir,
            database,
            workers,
            timeout,
            json,
            no_color,
        } => {
            let mut config = config;
            if let Some(dir) = upload_dir {
                config.upload_dir = dir;
            }
            if let Some(db) = database {
                config.database_path = db;
            }
            if let Some(n) = workers {
                config.max_workers = n.max(1);
            }
            if let Some(secs) = timeout {
                config.per_file_timeout = Duration::from_secs(secs);
            }
            ingest(files, config, json, no_color).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show { no_color } => show_config(&config, no_color),
            ConfigAction::Init { force } => init_config(force),
        },
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn extract(
    file_path: &Path,
    config: Config,
    max_pages: Option<usize>,
    json: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let mut extractor = MetadataExtractor::from_config(&config);
    if let Some(n) = max_pages {
        extractor = extractor.with_max_pages(n);
    }
    let meta = extractor.extract_metadata(file_path);

    let mut stdout = std::io::stdout();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &meta)?;
        writeln!(stdout)?;
    } else {
        output::print_metadata(
            &mut stdout,
            &display_name(file_path),
            &meta,
            ColorMode(!no_color),
        )?;
    }

    if !meta.success {
        anyhow::bail!(
            "Extraction failed for {}",
            file_path.display()
        );
    }
    Ok(())
}

fn info(file_path: &Path, json: bool, no_color: bool) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    let info = get_pdf_info(file_path);

    let mut stdout = std::io::stdout();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &info)?;
        writeln!(stdout)?;
    } else {
        output::print_pdf_info(
            &mut stdout,
            &display_name(file_path),
            &info,
            ColorMode(!no_color),
        )?;
    }
    Ok(())
}

async fn ingest(
    paths: Vec<PathBuf>,
    config: Config,
    json: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        files.push(UploadedFile::new(display_name(path), bytes));
    }

    let coordinator = BatchIngestionCoordinator::from_config(&config)?;
    coordinator.validate(&files)?;

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.set_message("ingesting");
    bar.enable_steady_tick(Duration::from_millis(120));

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let progress_bar = bar.clone();
    let options = BatchOptions::new()
        .with_cancel(cancel)
        .with_progress(move |done, _total| progress_bar.set_position(done as u64));

    let result = coordinator.process_files_tracked(files, options).await?;
    bar.finish_and_clear();

    let mut stdout = std::io::stdout();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &result)?;
        writeln!(stdout)?;
    } else {
        output::print_batch_summary(&mut stdout, &result, ColorMode(!no_color))?;
    }

    if result.success == 0 {
        anyhow::bail!("No files were ingested");
    }
    Ok(())
}

fn show_config(config: &Config, no_color: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    match config_file::config_path() {
        Some(path) if path.exists() => writeln!(stdout, "Config file: {}", path.display())?,
        Some(path) => writeln!(stdout, "Config file: {} (not present)", path.display())?,
        None => writeln!(stdout, "Config file: (no config directory)")?,
    }
    writeln!(stdout)?;
    output::print_config(&mut stdout, config, ColorMode(!no_color))?;
    Ok(())
}

fn init_config(force: bool) -> anyhow::Result<()> {
    if let Some(path) = config_file::config_path()
        && path.exists()
        && !force
    {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    let path = config_file::save_config(&ConfigFile::from(&Config::default()))
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("Default configuration written to {}", path.display());
    Ok(())
}
