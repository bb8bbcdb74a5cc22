//! oxide-web-server CLI
//!
//! Serves the demo application over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_web::AppConfig;
use oxide_web_server::{demo, gateway};

/// Development server for oxide-web applications.
#[derive(Parser)]
#[command(name = "oxide-web-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "OXIDE_WEB_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Directory static files are served from.
    #[arg(short, long, env = "OXIDE_WEB_ROOT", default_value = ".")]
    document_root: PathBuf,

    /// URL prefix of static files.
    #[arg(long, env = "OXIDE_WEB_STATIC_PREFIX", default_value = "/static/")]
    static_prefix: String,

    /// Disable static file serving.
    #[arg(long)]
    no_static: bool,

    /// Show fault traces in error pages.
    #[arg(long, env = "OXIDE_WEB_DEBUG")]
    debug: bool,

    /// Idle lifetime of sessions, in seconds.
    #[arg(long, env = "OXIDE_WEB_SESSION_IDLE", default_value_t = 14 * 24 * 60 * 60)]
    session_idle: u64,

    /// How often idle sessions are swept, in seconds.
    #[arg(long, default_value_t = 3600)]
    sweep_interval: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let config = AppConfig::new(&self.document_root)
            .debug(self.debug)
            .session_max_idle(Duration::from_secs(self.session_idle));
        if self.no_static {
            config.without_static_files()
        } else {
            config.static_prefix(self.static_prefix.as_str())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let app = Arc::new(demo::build_app(cli.app_config())?);
    tokio::spawn(gateway::sweep_sessions(
        Arc::clone(&app),
        Duration::from_secs(cli.sweep_interval.max(1)),
    ));

    let listener = TcpListener::bind(cli.addr).await?;
    info!(
        addr = %cli.addr,
        root = %cli.document_root.display(),
        debug = cli.debug,
        "Listening"
    );

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        };
        let io = TokioIo::new(stream);
        let app = Arc::clone(&app);

        tokio::task::spawn(async move {
            let service =
                service_fn(move |req| gateway::handle_request(req, Arc::clone(&app), remote));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %err, "Error serving connection");
            }
        });
    }
}
