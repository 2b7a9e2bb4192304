//! Worker binary: run the loop, enqueue a URL, or list pending jobs.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vibes_models::normalize;
use vibes_store::Store;
use vibes_worker::{Worker, WorkerConfig};
use vibes_youtube::{ApiBackend, BackendKind, ScraperBackend, YoutubeBackend};

#[derive(Parser)]
#[command(name = "vibes-worker", about = "Playlist analysis worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the worker loop until the wall-clock budget is spent.
    Run {
        /// Polling interval in seconds
        #[arg(long, default_value_t = 10)]
        poll_interval: u64,
        /// Max jobs leased per tick
        #[arg(long, default_value_t = 3)]
        batch_size: i64,
        /// Max runtime in seconds
        #[arg(long, default_value_t = 300)]
        max_runtime: u64,
        /// Primary backend: api or scraper
        #[arg(long)]
        backend: Option<BackendKind>,
    },
    /// Enqueue a single playlist URL as a pending job.
    Enqueue { playlist_url: String },
    /// List pending jobs.
    Pending,
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vibes=info".parse().unwrap()))
        .init();

    let cli = Cli::parse();

    let store = match Store::from_env().await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to store: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.run_migrations().await {
        error!("Failed to apply migrations: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Command::Run {
            poll_interval,
            batch_size,
            max_runtime,
            backend,
        } => {
            let mut config = WorkerConfig::from_env();
            config.poll_interval = Duration::from_secs(poll_interval);
            config.batch_size = batch_size;
            config.max_runtime = Duration::from_secs(max_runtime);
            if let Some(kind) = backend {
                config.backend = kind;
            }
            run_worker(store, config).await;
        }
        Command::Enqueue { playlist_url } => {
            let url = match normalize(&playlist_url) {
                Ok(url) => url,
                Err(e) => {
                    error!("Rejected URL: {}", e);
                    std::process::exit(1);
                }
            };
            match store.enqueue_job(&url).await {
                Ok(job_id) => println!("Enqueued job {job_id} for {url}"),
                Err(e) => {
                    error!("Enqueue failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Pending => match store.pending_jobs(100).await {
            Ok(jobs) if jobs.is_empty() => println!("No pending jobs found."),
            Ok(jobs) => {
                for job in jobs {
                    println!(
                        "Job {} - {} - {} (created {})",
                        job.id, job.playlist_url, job.status, job.created_at
                    );
                }
            }
            Err(e) => {
                error!("Failed to list pending jobs: {}", e);
                std::process::exit(1);
            }
        },
    }
}

async fn run_worker(store: Store, config: WorkerConfig) {
    let (primary, fallback) = match build_backends(config.backend) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to build backends: {}", e);
            std::process::exit(1);
        }
    };

    let worker = Worker::new(Arc::new(store), primary, fallback, config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    match worker.run(shutdown_rx).await {
        Ok(processed) => info!(processed, "Worker finished"),
        Err(e) => {
            error!("Worker error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Primary backend per config; when the primary is the API, a scraper
/// fallback is attached if yt-dlp is available on this host.
fn build_backends(
    kind: BackendKind,
) -> Result<(Arc<dyn YoutubeBackend>, Option<Arc<dyn YoutubeBackend>>), Box<dyn std::error::Error>>
{
    match kind {
        BackendKind::Api => {
            let primary: Arc<dyn YoutubeBackend> = Arc::new(ApiBackend::from_env()?);
            let fallback = match ScraperBackend::from_env() {
                Ok(scraper) => Some(Arc::new(scraper) as Arc<dyn YoutubeBackend>),
                Err(e) => {
                    info!("Scraper fallback unavailable: {}", e);
                    None
                }
            };
            Ok((primary, fallback))
        }
        BackendKind::Scraper => {
            let primary: Arc<dyn YoutubeBackend> = Arc::new(ScraperBackend::from_env()?);
            Ok((primary, None))
        }
    }
}
