use gridrl::config::RunConfig;
use std::process::ExitCode;
use tracing::error;

const DEMO: &str = include_str!("../configs/value_iteration.json");

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_file(path),
        None => RunConfig::from_json(DEMO),
    };

    match config.and_then(|c| c.run()) {
        Ok(outcome) => {
            println!("{outcome}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
