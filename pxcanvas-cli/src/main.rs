//! pxcanvas: entry point.
//!
//! ```text
//! pxcanvas size                          Print the canvas size
//! pxcanvas get X Y                       Read one pixel
//! pxcanvas set X Y COLOR                 Write one pixel
//! pxcanvas fill X Y W H COLOR            Paint a rectangle
//! pxcanvas snapshot [--out <path>]       Fetch the whole canvas
//! pxcanvas watch [--count N]             Poll snapshots until Ctrl-C
//! pxcanvas help [TOPIC]                  Show the server's help text
//! pxcanvas --gen-config                  Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pxcanvas_cli::commands::{fill_rect, write_rgb};
use pxcanvas_cli::config::CliConfig;
use pxcanvas_core::{CanvasClient, Color, SnapshotPoller, StateEncoding, WriteAck};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pxcanvas",
    about = "Client for a remote pixelflut canvas",
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "pxcanvas.toml")]
    config: PathBuf,

    /// Server host, overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canvas size.
    Size,
    /// Read one pixel.
    Get { x: u32, y: u32 },
    /// Write one pixel (RRGGBB or RRGGBBAA).
    Set { x: u32, y: u32, color: Color },
    /// Paint a rectangle, clipped to the canvas.
    Fill {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        color: Color,
    },
    /// Fetch the whole canvas.
    Snapshot {
        /// Payload encoding (rgb64 or rgba64).
        #[arg(short, long)]
        encoding: Option<StateEncoding>,
        /// Use the legacy BINARY command.
        #[arg(long, conflicts_with = "encoding")]
        legacy: bool,
        /// Write raw row-major RGB bytes here.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Poll snapshots until Ctrl-C.
    Watch {
        /// Stop after this many snapshots.
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
    /// Show the server's help text.
    Help { topic: Option<String> },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", CliConfig::default_toml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        eprintln!("no command given; see --help");
        std::process::exit(2);
    };

    let mut config = CliConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.client.host = host;
    }
    if let Some(port) = cli.port {
        config.client.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("pxcanvas v{}", env!("CARGO_PKG_VERSION"));
    info!("server: {}", config.client.connection_info());

    let mut client = CanvasClient::connect_with(config.client).await?;

    match command {
        Command::Size => {
            if let Some((width, height)) = client.size() {
                println!("{width} {height}");
            }
        }
        Command::Get { x, y } => {
            let color = client.get_pixel(x, y).await?;
            println!("{color}");
        }
        Command::Set { x, y, color } => match client.set_pixel(x, y, color).await? {
            WriteAck::Mismatch { received, .. } => warn!("server answered '{received}'"),
            ack => info!("write {ack:?}"),
        },
        Command::Fill { x, y, w, h, color } => {
            let report = fill_rect(&mut client, x, y, w, h, color).await?;
            info!(
                "wrote {} pixels ({} echo mismatches)",
                report.written, report.mismatched
            );
        }
        Command::Snapshot {
            encoding,
            legacy,
            out,
        } => {
            let buffer = if legacy {
                client.snapshot_legacy().await?
            } else {
                match encoding {
                    Some(encoding) => client.snapshot(encoding).await?,
                    None => client.snapshot_default().await?,
                }
            };
            match out {
                Some(path) => {
                    write_rgb(&path, &buffer).await?;
                    info!(
                        "wrote {}x{} RGB snapshot to {}",
                        buffer.width(),
                        buffer.height(),
                        path.display()
                    );
                }
                None => println!(
                    "{}x{} ({} bytes RGB)",
                    buffer.width(),
                    buffer.height(),
                    buffer.as_bytes().len()
                ),
            }
        }
        Command::Watch { count } => {
            let mut poller = SnapshotPoller::new(client);
            if let Some(count) = count {
                poller = poller.with_limit(count);
            }
            let stop = poller.stop_handle();
            let stats = poller.stats_receiver();

            // Ctrl-C handler.
            let stop_clone = stop.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Ctrl-C received, stopping");
                stop_clone.store(false, Ordering::SeqCst);
            });

            // Periodic stats report.
            let reporter = tokio::spawn(async move {
                let mut tick = tokio::time::interval(Duration::from_secs(1));
                tick.tick().await;
                loop {
                    tick.tick().await;
                    let s = stats.borrow().clone();
                    info!(
                        "{:.1} fps, {} snapshots, {} timeouts, last fetch {:?}",
                        s.fps, s.total_snapshots, s.timeouts, s.last_fetch
                    );
                }
            });

            let result = poller.run().await;
            reporter.abort();
            let s = poller.stats_receiver().borrow().clone();
            info!(
                "polled {} snapshots ({} bytes, {} timeouts)",
                s.total_snapshots, s.total_bytes, s.timeouts
            );
            result?;
            client = poller.into_client();
        }
        Command::Help { topic } => {
            let text = client.help(topic.as_deref()).await?;
            println!("{text}");
        }
    }

    client.close().await;
    Ok(())
}
