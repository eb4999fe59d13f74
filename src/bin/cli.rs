//! kvdb CLI Client
//!
//! Command-line interface for interacting with a kvdb server.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use kvdb::{ClientConfig, KvdbOperator, KvdbSingle};

/// kvdb CLI
#[derive(Parser, Debug)]
#[command(name = "kvdb-cli")]
#[command(about = "CLI for the kvdb key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7060")]
    server: String,

    /// Database to run the command against
    #[arg(short, long)]
    database: Option<String>,

    /// Response timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether keys exist
    Exists {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Get values by key
    Get {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set key-value pairs: KEY VALUE [KEY VALUE ...]
    Put {
        #[arg(required = true)]
        kvs: Vec<String>,
    },

    /// Create a database
    Create {
        name: String,

        /// Partition count (server default if omitted)
        #[arg(short, long)]
        partitions: Option<u32>,
    },

    /// List databases
    Dbs,

    /// Show cluster topology
    Cluster,
}

fn to_bytes(items: &[String]) -> Vec<Bytes> {
    items.iter().map(|s| Bytes::from(s.clone())).collect()
}

fn run(args: Args) -> kvdb::Result<()> {
    let mut builder = ClientConfig::builder()
        .addr(&args.server)
        .timeout_ms(args.timeout_ms);
    if let Some(database) = &args.database {
        builder = builder.database(database);
    }
    let client = KvdbSingle::connect(&builder.build())?;

    match args.command {
        Commands::Exists { keys } => {
            let flags = client.exists_many(&to_bytes(&keys))?;
            for (key, flag) in keys.iter().zip(flags) {
                println!("{}: {}", key, flag);
            }
        }
        Commands::Get { keys } => {
            let values = client.get_many(&to_bytes(&keys))?;
            for (key, value) in keys.iter().zip(values) {
                match value {
                    Some(v) => println!("{}: {}", key, String::from_utf8_lossy(&v)),
                    None => println!("{}: (nil)", key),
                }
            }
        }
        Commands::Put { kvs } => {
            client.put(&to_bytes(&kvs))?;
            println!("OK");
        }
        Commands::Create { name, partitions } => {
            client.create_database(&name, partitions)?;
            println!("OK");
        }
        Commands::Dbs => {
            for name in client.show_databases()? {
                println!("{}", name);
            }
        }
        Commands::Cluster => {
            for cluster in client.cluster_info()?.clusters {
                println!("{}", cluster.name);
                for url in cluster.urls {
                    println!("  {}", url);
                }
            }
        }
    }

    client.close();
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
