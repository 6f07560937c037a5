//! Strand broker server binary.
//!
//! Serves the Strand gRPC API over a local data directory.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use strand_broker::TopicRegistry;
use strand_log::LogConfig;
use strand_server::proto::broker_server::BrokerServer;
use strand_server::BrokerService;
use tonic::transport::Server;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Strand commit log broker.
#[derive(Parser, Debug)]
#[command(name = "strand-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on for gRPC.
    #[arg(long, default_value = "127.0.0.1:9092")]
    listen_addr: SocketAddr,

    /// Data directory for topic logs.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Segment size threshold in bytes before rolling.
    #[arg(long, default_value_t = strand_core::limits::SEGMENT_MAX_BYTES_DEFAULT)]
    segment_max_bytes: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // The registry expects its data root to exist.
    std::fs::create_dir_all(&args.data_dir)?;

    let config = LogConfig::new().with_segment_max_bytes(args.segment_max_bytes);
    config.validate()?;

    let registry = Arc::new(TopicRegistry::new(&args.data_dir, config));
    let service = BrokerService::new(Arc::clone(&registry));

    info!(
        listen_addr = %args.listen_addr,
        data_dir = %args.data_dir.display(),
        segment_max_bytes = args.segment_max_bytes,
        "starting strand server"
    );

    Server::builder()
        .add_service(BrokerServer::new(service))
        .serve_with_shutdown(args.listen_addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // Flush everything before the process exits.
    registry.close()?;
    info!("registry closed, exiting");

    Ok(())
}
