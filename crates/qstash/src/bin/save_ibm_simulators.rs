//! Build simulator artifacts for every supported IBM backend
//!
//! Reads `IBM_SIMULATORS_BASE_PATH`, `IBM_API_TOKEN` and optionally
//! `IBM_QUANTUM_CHANNEL` (a `.env` file is honoured), then writes
//! `{base}/ibm_simulators/{backend}/{method}.json` for every pair.
//!
//! Usage:
//! ```bash
//! RUST_LOG=info cargo run --bin save_ibm_simulators
//! ```

use anyhow::Context;
use qstash::{save_from_config, BuildOutcome, StoreConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = StoreConfig::from_env().context("reading configuration")?;
    log::info!(
        "Building simulators under {} ({})",
        config.base_path().display(),
        config.channel
    );

    let report = save_from_config(&config)?;

    println!("Simulator build: {}", report);
    for entry in report.entries() {
        match &entry.outcome {
            BuildOutcome::Saved(path) => println!("  ok    {}", path.display()),
            BuildOutcome::Failed(reason) => {
                println!("  FAIL  {}/{}: {}", entry.backend, entry.method, reason)
            }
        }
    }
    Ok(())
}
