//! Process entry point (§4.6, §4.7): parses CLI options, loads configuration,
//! bootstraps structured logging, and hands off to the supervisor. Exits `1`
//! on any startup or runtime error rather than panicking.

use clap::Parser;

/// The Via bridge relayer: relays bridge messages and vault settlement state
/// between Ethereum and Via.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct RelayerOpts {
    /// Optional `.env`-style file layered under the process environment.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Validate configuration and exit without starting any worker, store, or
    /// indexer connection.
    #[arg(long)]
    config_check: bool,
}

fn main() -> anyhow::Result<()> {
    let opts = RelayerOpts::parse();

    if opts.config_check {
        return match relayer_config::RelayerConfig::validate_only(Some(&opts.env_file)) {
            Ok(()) => {
                println!("configuration OK");
                Ok(())
            }
            Err(e) => {
                eprintln!("configuration error: {e}");
                std::process::exit(1);
            }
        };
    }

    let config = relayer_config::RelayerConfig::load(Some(&opts.env_file))
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    relayer_telemetry::init::init_tracing()?;

    tracing::info!(target = "node", "starting via-bridge-relayer");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(relayer_worker::run(config))
}
