//! kvdb Server Binary
//!
//! Starts the TCP server for kvdb.

use std::sync::Arc;

use clap::Parser;
use kvdb::network::Server;
use kvdb::{ServerConfig, ServerContext};
use tracing_subscriber::{fmt, EnvFilter};

/// kvdb Server
#[derive(Parser, Debug)]
#[command(name = "kvdb-server")]
#[command(about = "Networked multi-database key-value store")]
#[command(version)]
struct Args {
    /// Default root directory for databases
    #[arg(short, long, default_value = "./kvdb_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7060")]
    listen: String,

    /// Default partition count for databases
    #[arg(short, long, default_value = "4")]
    partitions: usize,

    /// Database list file
    #[arg(long, default_value = "./config/dblist")]
    dblist: String,

    /// Cluster configuration file
    #[arg(long, default_value = "./config/cluster")]
    cluster: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvdb Server v{}", kvdb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig::builder()
        .dbs_root_dir(&args.data_dir)
        .dbs_partitions(args.partitions)
        .dblist_path(&args.dblist)
        .cluster_path(&args.cluster)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    let context = match ServerContext::open(config.clone()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Failed to initialize server context: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Databases: {:?}", context.database_names());

    let server = match Server::bind(config, Arc::clone(&context)) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    let handle = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        handle.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        context.stop();
        std::process::exit(1);
    }

    context.stop();
    tracing::info!("Server stopped");
}
