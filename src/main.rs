use std::path::PathBuf;
use std::process::ExitCode;

use danci_memory_core::batch;
use danci_memory_core::config::CoreConfig;
use danci_memory_core::logging;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = CoreConfig::from_env();
    let _log_guard = match logging::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialise logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = config.validate() {
        tracing::error!(error = %err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let Some(path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SWEEP_INPUT").ok())
        .map(PathBuf::from)
    else {
        tracing::error!("usage: danci-review-sweep <input.json> (or set SWEEP_INPUT)");
        return ExitCode::FAILURE;
    };

    tracing::info!(path = %path.display(), "review sweep starting");

    let output = match batch::run_file(&path, &config) {
        Ok(output) => output,
        Err(err) => {
            tracing::error!(error = %err, path = %path.display(), "review sweep failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to encode sweep output");
            ExitCode::FAILURE
        }
    }
}
