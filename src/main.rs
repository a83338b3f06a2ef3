use std::path::Path;
use std::time::Instant;

use ev_propensity::{PipelineConfig, Result, run_pipeline};
use log::info;

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // A config.json next to the binary overrides the documented defaults
    let config_path = Path::new("config.json");
    let config = if config_path.exists() {
        info!("loading configuration from {}", config_path.display());
        PipelineConfig::from_file(config_path)?
    } else {
        PipelineConfig::default()
    };

    info!("\n{config}");

    let start = Instant::now();
    let summaries = run_pipeline(&config)?;

    for summary in &summaries {
        info!(
            "{}: {} -> {} rows ({})",
            summary.stage,
            summary.rows_in,
            summary.rows_out,
            summary.output.display()
        );
    }
    info!("pipeline completed in {:?}", start.elapsed());

    Ok(())
}
