//! mongoport - clone, export and import MongoDB databases
//!
//! # Usage
//!
//! ```bash
//! # List databases
//! mongoport --uri mongodb://localhost:27017 databases
//!
//! # Export, then import into another database
//! mongoport export shop --out ./shop
//! mongoport import ./shop shop_restored
//!
//! # Clone across clusters
//! mongoport clone shop shop --target-uri mongodb://replica:27017
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use mongoport::cli::CliInterface;
use mongoport::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse arguments, initialize logging and run the subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    cli.execute().await
}

/// Initialize logging from the effective configuration
///
/// The level comes from the config file with -q/-v/--vv applied on top;
/// `RUST_LOG` replaces it entirely when set.
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
