use thiserror::Error;

use super::config::ConfigError;
use super::external::process::ToolError;
use super::state::SyncStage;
use crate::core::io::pdb::PdbError;
use crate::core::models::assembly::AssemblyError;

/// Errors that abort a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("External tool '{tool}' is unavailable: {source}")]
    ToolUnavailable {
        tool: &'static str,
        #[source]
        source: ToolError,
    },

    #[error("External tool '{tool}' failed: {source}")]
    ToolFailed {
        tool: &'static str,
        #[source]
        source: ToolError,
    },

    #[error("No structures remain after stage '{stage}'")]
    NoSurvivingStructures { stage: SyncStage },

    #[error("No chain is present in every structure of the ensemble")]
    NoSharedChains,

    #[error("Ensemble has {count} shared chains but only {max} canonical labels exist")]
    TooManyChains { count: usize, max: usize },

    #[error("Structure '{structure}' uses every chain label; no placeholder is left to swap chains")]
    ChainLabelsExhausted { structure: String },

    #[error("Output directory '{path}' already exists and is not empty")]
    OutputExists { path: String },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: PdbError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

/// Why a single structure was dropped from the ensemble.
#[derive(Debug, Error)]
pub enum ExclusionReason {
    #[error("could not be read: {0}")]
    Load(#[source] PdbError),

    #[error("models could not be merged: {0}")]
    Assembly(#[source] AssemblyError),

    #[error("cleanup failed: {0}")]
    Cleanup(#[source] ToolError),

    #[error("contains no protein chain")]
    NoChains,

    #[error("mean similarity {mean_score:.3} to the ensemble is at or below {threshold:.2}")]
    LowSimilarity { mean_score: f64, threshold: f64 },

    #[error("structural alignment failed: {0}")]
    StructuralAlignment(#[source] ToolError),
}

/// A structure dropped during a run, with the stage that dropped it.
#[derive(Debug)]
pub struct Exclusion {
    pub structure: String,
    pub stage: SyncStage,
    pub reason: ExclusionReason,
}
