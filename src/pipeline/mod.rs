//! Sequential pipeline stages
//!
//! Four batch stages run in fixed order, each reading the previous stage's
//! output file and writing its own. The file hand-off is the only
//! coordination mechanism; a stage failure aborts the run and leaves
//! upstream outputs in place for debugging.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::error::Result;

pub mod features;
pub mod loader;
pub mod simulate;
pub mod train;

pub use features::FeatureStage;
pub use loader::LoadStage;
pub use simulate::SimulateStage;
pub use train::TrainStage;

/// Outcome of one completed stage
#[derive(Debug, Clone)]
pub struct StageSummary {
    /// Stage name
    pub stage: &'static str,
    /// Rows read from the stage input
    pub rows_in: usize,
    /// Rows written to the stage output
    pub rows_out: usize,
    /// Primary output file of the stage
    pub output: PathBuf,
}

/// A batch transformation with file-based input and output
pub trait Stage {
    /// Short stage name used in logs
    fn name(&self) -> &'static str;

    /// Execute the stage under the given configuration
    fn run(&self, config: &PipelineConfig) -> Result<StageSummary>;
}

/// Run all four stages in fixed order, stopping at the first failure
pub fn run_pipeline(config: &PipelineConfig) -> Result<Vec<StageSummary>> {
    let stages: [&dyn Stage; 4] = [&LoadStage, &FeatureStage, &SimulateStage, &TrainStage];
    let mut summaries = Vec::with_capacity(stages.len());

    for stage in stages {
        log::info!("starting stage {}", stage.name());
        let start = Instant::now();

        let summary = stage.run(config)?;

        log::info!(
            "stage {} finished: {} rows in, {} rows out, wrote {} in {:?}",
            stage.name(),
            summary.rows_in,
            summary.rows_out,
            summary.output.display(),
            start.elapsed()
        );
        summaries.push(summary);
    }

    Ok(summaries)
}
