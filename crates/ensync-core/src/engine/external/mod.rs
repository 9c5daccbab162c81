//! Wrappers around the external programs the pipeline delegates to.
//!
//! Each program sits behind a trait so the orchestrator can be driven by
//! in-process substitutes. The concrete wrappers run the program in a scoped
//! temporary directory through [`process`].

pub mod foldx;
pub mod lovoalign;
pub mod muscle;
pub mod process;

use crate::core::align::msa::AlignmentMatrix;
use crate::core::models::structure::StructureRecord;
use crate::engine::config::SyncConfig;
use process::ToolError;

/// Repairs a structure (missing side-chain atoms and similar defects).
pub trait StructureCleaner {
    fn clean(&self, structure: &StructureRecord) -> Result<StructureRecord, ToolError>;
}

/// Aligns one sequence per structure into a column-aligned matrix.
///
/// Rows of the result are in submission order.
pub trait SequenceAligner {
    fn align(&self, sequences: &[String]) -> Result<AlignmentMatrix, ToolError>;
}

/// The outcome of superposing one structure onto a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Superposition {
    pub structure: StructureRecord,
    pub rmsd: f64,
}

/// Rigidly superposes a structure onto a reference.
pub trait StructureAligner {
    fn superpose(
        &self,
        mobile: &StructureRecord,
        reference: &StructureRecord,
        chain: char,
    ) -> Result<Superposition, ToolError>;
}

/// The set of external collaborators used by one synchronization run.
pub struct Toolbox {
    pub cleaner: Box<dyn StructureCleaner>,
    pub sequence_aligner: Box<dyn SequenceAligner>,
    pub structure_aligner: Box<dyn StructureAligner>,
}

impl Toolbox {
    /// Builds the default program wrappers from the configured tool paths.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            cleaner: Box::new(foldx::FoldxCleaner::new(
                config.tools.cleaner.clone(),
                config.keep_temporary,
            )),
            sequence_aligner: Box::new(muscle::MuscleAligner::new(
                config.tools.sequence_aligner.clone(),
                config.keep_temporary,
            )),
            structure_aligner: Box::new(lovoalign::LovoalignAligner::new(
                config.tools.structure_aligner.clone(),
                config.keep_temporary,
            )),
        }
    }
}
