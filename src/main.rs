//! Bank account service CLI
//!
//! Replays account and balance requests from a CSV file and writes one
//! result row per request to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- requests.csv > results.csv
//! cargo run -- --strategy sync requests.csv > results.csv
//! cargo run -- --strategy async --batch-size 2000 --workers 8 requests.csv
//! cargo run -- --config service.toml --lock-wait-ms 250 requests.csv
//! RUST_LOG=info cargo run -- requests.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad configuration, file not found, output not writable, etc.)

use bank_account_service::cli;
use bank_account_service::strategy;
use env_logger::Env;
use log::error;
use std::process;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = cli::parse_args();

    let service = match args.to_service_config() {
        Ok(service) => service,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let batch = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy, service, batch);

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!("{}", e);
        process::exit(1);
    }
}
