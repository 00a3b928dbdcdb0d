use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod commands;

/// NDN face command line interface
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Forwarder host
    #[clap(long, global = true, default_value = "127.0.0.1")]
    host: String,

    /// Forwarder port
    #[clap(long, global = true, default_value_t = ndn_face::DEFAULT_NDN_PORT)]
    port: u16,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Express an Interest and print the returned Data
    Get {
        /// Name to request (NDN URI format)
        name: String,

        /// Interest lifetime in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u32,

        /// Deliver content without checking its signature
        #[clap(long)]
        no_verify: bool,

        /// Print the response as JSON
        #[clap(long)]
        json: bool,
    },

    /// Register a prefix and answer Interests under it
    Serve {
        /// Prefix to register (NDN URI format)
        prefix: String,

        /// Content to answer with
        content: String,

        /// Freshness period of served Data in milliseconds
        #[clap(short, long, default_value = "10000")]
        freshness: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Get {
            name,
            timeout,
            no_verify,
            json,
        } => commands::get::run(&cli.host, cli.port, &name, timeout, no_verify, json).await,
        Commands::Serve {
            prefix,
            content,
            freshness,
        } => commands::serve::run(&cli.host, cli.port, &prefix, content, freshness).await,
    }
}
