mod http;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use seed_page::{ArchivePage, LoadStatus, PageVariant};
use seed_proto::config::Config;
use seed_proto::fetch::ListingFetcher;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// StreamSeed - episode pages for the radio archive bucket
#[derive(Parser)]
#[command(name = "streamseed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the episode and archive pages over HTTP (default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Render one page to an HTML file and exit
    Render {
        /// episodes or archive
        #[arg(long, default_value = "episodes")]
        variant: PageVariant,
        /// Output file
        #[arg(long)]
        out: PathBuf,
        /// Render pages 1..=N of the episodes listing
        #[arg(long, default_value = "1")]
        pages: usize,
    },
}

fn init_logging() -> anyhow::Result<PathBuf> {
    let data_dir = seed_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,seed_daemon=debug,hyper_util=warn,reqwest=warn")
            }),
        )
        .init();

    Ok(log_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging()?;
    eprintln!("Logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Render { variant, out, pages } => render(config, variant, out, pages).await,
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let bind_address = config.http.bind_address.clone();
    let port = port.unwrap_or(config.http.port);
    eprintln!("Serving on http://{}:{}", bind_address, port);

    let state = http::HttpState::new(config)?;
    let handle = http::start_server(bind_address, port, state);
    handle.await?;
    Ok(())
}

async fn render(config: Config, variant: PageVariant, out: PathBuf, pages: usize) -> anyhow::Result<()> {
    let fetcher = ListingFetcher::new(config.bucket.clone(), &config.listing)?;
    let mut page = ArchivePage::from_config(variant, fetcher, &config);
    let status = match variant {
        PageVariant::Episodes => page.load_pages(pages.max(1)).await,
        PageVariant::Archive => page.load().await,
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&out, page.to_html()).await?;
    info!("Wrote {} page to {:?} ({:?})", variant.title(), out, status);
    println!("{}", out.display());

    if status == LoadStatus::Failed {
        warn!("Listing could not be loaded; {:?} holds the error page", out);
        anyhow::bail!("listing could not be loaded, wrote error page to {}", out.display());
    }
    Ok(())
}
