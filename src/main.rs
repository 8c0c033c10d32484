use clap::{Parser, Subcommand};
use gallery_preview::config::{self, PreviewConfig};
use gallery_preview::index::GroupIndex;
use gallery_preview::output;
use gallery_preview::serve::{self, AppState, ServeError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that discover images.
#[derive(clap::Args, Clone)]
struct DiscoveryArgs {
    /// Image files, directories and zip archives to browse
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Detect archives by opening files instead of trusting their extension
    #[arg(short = 'c', long)]
    check_archives: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "gallery-preview")]
#[command(about = "Browse the images in directories and zip archives")]
#[command(long_about = "\
Browse the images in directories and zip archives

Point it at any mix of image files, directories and zip archives. Images are
grouped by the directory (or archive-internal directory) they live in, and
served as a local web page. Nothing is copied, converted or written.

  gallery-preview serve ~/Pictures/trip ~/Downloads/scans.zip cover.jpg

Grouping:
  ~/Pictures/trip/day1/a.jpg     → group ~/Pictures/trip/day1
  cover.jpg                      → group of its parent directory
  scans.zip: pages/001.png       → group scans.zip → pages

Archives found inside directories are opened too (one level deep).

Run 'gallery-preview gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML). Command-line flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log discovery details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the roots and serve them over HTTP
    Serve {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Address to listen on
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Index the roots and print the groups found
    Scan {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Print the index as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Serve {
            discovery,
            host,
            port,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            apply_discovery_args(&mut config, &discovery);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let index = Arc::new(build_index(&discovery, &config)?);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let listener = serve::bind(&config.server).await?;
                let url = format!("http://{}/", listener.local_addr()?);
                output::print_serve_banner(&index, &url);
                serve::run(listener, AppState::new(index, config.browse.clone())).await?;
                Ok::<(), ServeError>(())
            })?;
        }
        Command::Scan { discovery, json } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            apply_discovery_args(&mut config, &discovery);

            let index = build_index(&discovery, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&index)?);
            } else {
                output::print_scan_output(&index);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for this crate
/// with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,gallery_preview=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_discovery_args(config: &mut PreviewConfig, args: &DiscoveryArgs) {
    if args.check_archives {
        config.discovery.check_archives = true;
    }
}

fn build_index(
    args: &DiscoveryArgs,
    config: &PreviewConfig,
) -> Result<GroupIndex, gallery_preview::index::BuildError> {
    init_thread_pool(&config.discovery);
    GroupIndex::build(&args.roots, &config.discovery.classifier())
}

/// Initialize the rayon thread pool based on discovery config.
///
/// Caps at the number of available CPU cores: the config can lower it, not raise it.
fn init_thread_pool(discovery: &config::DiscoveryConfig) {
    let threads = config::effective_threads(discovery);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
