use crate::core::align::pairwise::PairwiseAligner;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::{StructureFile, WriteOptions};
use crate::core::models::assembly::{first_model, incorporate_models};
use crate::core::models::structure::StructureRecord;
use crate::core::utils::naming::{strip_extensions, unique_output_names};
use crate::engine::chains::{ChainGrouper, ChainGrouping};
use crate::engine::config::SyncConfig;
use crate::engine::error::{Exclusion, ExclusionReason, SyncError};
use crate::engine::external::Toolbox;
use crate::engine::external::process::ToolError;
use crate::engine::matching::ChainMatcher;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::similarity::SimilarityGate;
use crate::engine::state::SyncStage;
use crate::engine::superposition::select_alignment_chain;
use crate::engine::unify::{ResidueNumberUnifier, shared_residue_keys};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File listing the canonical chain labels, one per line.
pub const MANIFEST_FILE: &str = "shared_chains.txt";

/// The synchronized ensemble, before anything is written.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Surviving structures, in input order.
    pub structures: Vec<StructureRecord>,
    /// Canonical chain labels, in manifest order.
    pub shared_chains: Vec<char>,
    /// Chain used for structural superposition, if it ran.
    pub alignment_chain: Option<char>,
    /// RMSD of each superposed structure against the first one.
    pub rmsd: Vec<(String, f64)>,
    /// Whether residue annotations were computed and should be written.
    pub annotated: bool,
    pub excluded: Vec<Exclusion>,
}

impl SyncOutcome {
    pub fn manifest(&self) -> String {
        self.shared_chains.iter().map(|c| format!("{}\n", c)).collect()
    }
}

#[derive(Debug)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
    /// Structure identifier and the file it was written to.
    pub output_files: Vec<(String, PathBuf)>,
    pub manifest_path: PathBuf,
}

/// Synchronizes the structure files in `inputs` and writes them to `out_dir`.
///
/// Inputs and the output directory are validated before any external program
/// runs. The output directory is only created once at least one structure has
/// made it through every stage.
#[instrument(skip_all, name = "sync_workflow")]
pub fn run(
    inputs: &[PathBuf],
    out_dir: &Path,
    config: &SyncConfig,
    tools: &Toolbox,
    reporter: &ProgressReporter,
) -> Result<SyncResult, SyncError> {
    // === Phase 0: Validation ===
    validate_inputs(inputs)?;
    check_output_dir(out_dir, config.overwrite)?;
    info!(structures = inputs.len(), out_dir = %out_dir.display(), "Starting ensemble synchronization.");

    // === Phase 1: Loading ===
    let (structures, mut excluded) = load_structures(inputs, config, reporter);

    // === Phase 2-5: Cleaning, matching, alignment ===
    let mut outcome = synchronize(structures, config, tools, reporter)?;
    excluded.append(&mut outcome.excluded);
    outcome.excluded = excluded;

    // === Phase 6: Writing ===
    let (output_files, manifest_path) = write_outputs(&outcome, out_dir, config, reporter)?;

    reporter.report(Progress::StageStart {
        stage: SyncStage::Done,
    });
    reporter.report(Progress::StageFinish);
    info!(
        written = output_files.len(),
        excluded = outcome.excluded.len(),
        "Synchronization complete."
    );

    Ok(SyncResult {
        outcome,
        output_files,
        manifest_path,
    })
}

fn validate_inputs(inputs: &[PathBuf]) -> Result<(), SyncError> {
    if inputs.is_empty() {
        return Err(SyncError::InputValidation(
            "no structure files were given".to_string(),
        ));
    }
    unique_output_names(inputs).map_err(|e| SyncError::InputValidation(e.to_string()))?;
    Ok(())
}

fn check_output_dir(out_dir: &Path, overwrite: bool) -> Result<(), SyncError> {
    if !out_dir.exists() {
        return Ok(());
    }
    if !out_dir.is_dir() {
        return Err(SyncError::InputValidation(format!(
            "output path '{}' exists and is not a directory",
            out_dir.display()
        )));
    }
    let is_empty = fs::read_dir(out_dir)?.next().is_none();
    if !is_empty && !overwrite {
        return Err(SyncError::OutputExists {
            path: out_dir.display().to_string(),
        });
    }
    Ok(())
}

fn exclude(excluded: &mut Vec<Exclusion>, structure: &str, stage: SyncStage, reason: ExclusionReason) {
    warn!(structure, stage = %stage, reason = %reason, "Excluding structure from the ensemble.");
    excluded.push(Exclusion {
        structure: structure.to_string(),
        stage,
        reason,
    });
}

fn load_structures(
    inputs: &[PathBuf],
    config: &SyncConfig,
    reporter: &ProgressReporter,
) -> (Vec<StructureRecord>, Vec<Exclusion>) {
    reporter.report(Progress::StageStart {
        stage: SyncStage::Loading,
    });
    let mut excluded = Vec::new();

    let loaded = reporter.task(inputs.iter(), |path| {
        let id = path.display().to_string();
        let structure = match PdbFile::read_from_path(path) {
            Ok(structure) => structure,
            Err(e) => {
                exclude(&mut excluded, &id, SyncStage::Loading, ExclusionReason::Load(e));
                return None;
            }
        };
        if !config.incorporate_models {
            return Some(first_model(&structure));
        }
        match incorporate_models(&structure) {
            Ok(merged) => Some(merged),
            Err(e) => {
                exclude(&mut excluded, &id, SyncStage::Loading, ExclusionReason::Assembly(e));
                None
            }
        }
    });

    reporter.report(Progress::StageFinish);
    (loaded.into_iter().flatten().collect(), excluded)
}

fn sequence_aligner_error(source: ToolError) -> SyncError {
    if source.is_unavailable() {
        SyncError::ToolUnavailable {
            tool: "sequence aligner",
            source,
        }
    } else {
        SyncError::ToolFailed {
            tool: "sequence aligner",
            source,
        }
    }
}

/// Runs every in-memory stage on already loaded structures.
///
/// The similarity gate compares structures on their canonical chains, after
/// matching; if it drops anything, the survivors are matched again.
///
/// A lone structure, given or left by the gate, is neither relabeled nor
/// renumbered: it keeps its chain labels and its copy chains, and the
/// manifest lists one representative label per copy class. Larger ensembles
/// keep only their canonical protein chains.
///
/// # Errors
///
/// Fails when no structure survives a stage, no chain is shared by the whole
/// ensemble, or an aligner is unavailable or returns unusable output.
pub fn synchronize(
    structures: Vec<StructureRecord>,
    config: &SyncConfig,
    tools: &Toolbox,
    reporter: &ProgressReporter,
) -> Result<SyncOutcome, SyncError> {
    let mut excluded = Vec::new();
    if structures.is_empty() {
        return Err(SyncError::NoSurvivingStructures {
            stage: SyncStage::Loading,
        });
    }

    // === Cleaning ===
    let structures = if config.clean_structures {
        reporter.report(Progress::StageStart {
            stage: SyncStage::Cleaning,
        });
        let cleaned = reporter.task(structures.into_iter(), |structure| {
            match tools.cleaner.clean(&structure) {
                Ok(cleaned) => Some(cleaned),
                Err(e) => {
                    exclude(
                        &mut excluded,
                        structure.id(),
                        SyncStage::Cleaning,
                        ExclusionReason::Cleanup(e),
                    );
                    None
                }
            }
        });
        reporter.report(Progress::StageFinish);
        let cleaned: Vec<_> = cleaned.into_iter().flatten().collect();
        if cleaned.is_empty() {
            return Err(SyncError::NoSurvivingStructures {
                stage: SyncStage::Cleaning,
            });
        }
        cleaned
    } else {
        structures
    };

    // === Chain grouping and matching ===
    reporter.report(Progress::StageStart {
        stage: SyncStage::ChainMatching,
    });
    let aligner = PairwiseAligner::new(config.scoring);
    let grouper = ChainGrouper::new(&aligner, config.thresholds.within_structure);

    let mut structures_with_chains = Vec::new();
    let mut groupings: Vec<ChainGrouping> = Vec::new();
    for structure in structures {
        match grouper.group(&structure) {
            Some(grouping) => {
                structures_with_chains.push(structure);
                groupings.push(grouping);
            }
            None => exclude(
                &mut excluded,
                structure.id(),
                SyncStage::ChainMatching,
                ExclusionReason::NoChains,
            ),
        }
    }
    let mut structures = structures_with_chains;
    if structures.is_empty() {
        return Err(SyncError::NoSurvivingStructures {
            stage: SyncStage::ChainMatching,
        });
    }

    let matcher = ChainMatcher::new(&aligner, config.thresholds.cross_structure);
    let mut matching = None;
    if structures.len() > 1 {
        let candidate = matcher.match_chains(&groupings)?;

        // === Similarity gate ===
        let gate = SimilarityGate::new(&aligner, config.thresholds.ensemble);
        let verdict =
            gate.evaluate(&candidate.relabel(&structures)?, &candidate.shared_chains());
        if verdict.excluded.is_empty() {
            matching = Some(candidate);
        } else {
            for &(index, mean_score) in &verdict.excluded {
                exclude(
                    &mut excluded,
                    structures[index].id(),
                    SyncStage::ChainMatching,
                    ExclusionReason::LowSimilarity {
                        mean_score,
                        threshold: gate.threshold(),
                    },
                );
            }
            structures = retain_indices(structures, &verdict.retained);
            groupings = retain_indices(groupings, &verdict.retained);
            // Chains the excluded structures lacked may now be shared.
            if structures.len() > 1 {
                matching = Some(matcher.match_chains(&groupings)?);
            }
        }
    }

    let Some(matching) = matching else {
        reporter.report(Progress::StageFinish);
        info!("Single structure in the ensemble; skipping matching and alignment.");
        return Ok(SyncOutcome {
            shared_chains: groupings[0].unique_representatives(),
            structures: vec![ResidueNumberUnifier::annotate_single(&structures[0])],
            alignment_chain: None,
            rmsd: Vec::new(),
            annotated: true,
            excluded,
        });
    };

    let shared_chains = matching.shared_chains();
    for canonical in matching.canonical_chains() {
        debug!(label = %canonical.label, members = ?canonical.members, "Canonical chain");
    }
    let mut structures = matching.relabel(&structures)?;
    info!(shared = shared_chains.len(), "Matched chains across the ensemble.");
    reporter.report(Progress::StageFinish);

    // === Sequence alignment and residue renumbering ===
    if config.align_sequences {
        reporter.report(Progress::StageStart {
            stage: SyncStage::SequenceAligning,
        });
        reporter.report(Progress::TaskStart {
            total_steps: shared_chains.len() as u64,
        });
        for &chain in &shared_chains {
            let sequences: Vec<String> = structures
                .iter()
                .map(|s| s.chain_sequence(chain).map(|seq| seq.sequence).unwrap_or_default())
                .collect();
            let alignment = tools
                .sequence_aligner
                .align(&sequences)
                .map_err(sequence_aligner_error)?;
            structures = ResidueNumberUnifier::unify_chain(&structures, chain, &alignment)?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        info!(
            shared_residues = shared_residue_keys(&structures[0]).len(),
            "Unified residue numbering."
        );
        reporter.report(Progress::StageFinish);
    }

    // === Structural alignment ===
    let mut rmsd = Vec::new();
    let mut alignment_chain = None;
    if config.align_structures {
        reporter.report(Progress::StageStart {
            stage: SyncStage::StructureAligning,
        });
        let chain = select_alignment_chain(&structures, &shared_chains).ok_or_else(|| {
            SyncError::Internal("no shared chain to superpose on".to_string())
        })?;
        info!(chain = %chain, "Superposing structures onto the first structure.");

        let mut remaining = structures.into_iter();
        let reference = remaining.next().ok_or_else(|| {
            SyncError::Internal("no reference structure for superposition".to_string())
        })?;
        let mut aligned = vec![reference.clone()];

        reporter.report(Progress::TaskStart {
            total_steps: remaining.len() as u64,
        });
        for mobile in remaining {
            match tools.structure_aligner.superpose(&mobile, &reference, chain) {
                Ok(superposition) => {
                    info!(structure = mobile.id(), rmsd = superposition.rmsd, "Superposed structure.");
                    rmsd.push((mobile.id().to_string(), superposition.rmsd));
                    aligned.push(superposition.structure);
                }
                Err(e) if e.is_unavailable() => {
                    return Err(SyncError::ToolUnavailable {
                        tool: "structural aligner",
                        source: e,
                    });
                }
                Err(e) => exclude(
                    &mut excluded,
                    mobile.id(),
                    SyncStage::StructureAligning,
                    ExclusionReason::StructuralAlignment(e),
                ),
            }
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::StageFinish);

        structures = aligned;
        alignment_chain = Some(chain);
    }

    Ok(SyncOutcome {
        structures,
        shared_chains,
        alignment_chain,
        rmsd,
        annotated: config.align_sequences,
        excluded,
    })
}

fn retain_indices<T>(items: Vec<T>, keep: &[usize]) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, item)| item)
        .collect()
}

fn write_outputs(
    outcome: &SyncOutcome,
    out_dir: &Path,
    config: &SyncConfig,
    reporter: &ProgressReporter,
) -> Result<(Vec<(String, PathBuf)>, PathBuf), SyncError> {
    reporter.report(Progress::StageStart {
        stage: SyncStage::Writing,
    });

    let ids: Vec<PathBuf> = outcome
        .structures
        .iter()
        .map(|s| PathBuf::from(s.id()))
        .collect();
    let names = unique_output_names(&ids)
        .map(|names| strip_extensions(&names))
        .map_err(|e| SyncError::InputValidation(e.to_string()))?;

    if out_dir.exists() && config.overwrite {
        fs::remove_dir_all(out_dir)?;
    }
    fs::create_dir_all(out_dir)?;

    let options = WriteOptions {
        overwrite: config.overwrite,
        with_models: false,
        annotations: outcome.annotated,
    };

    let mut written = Vec::with_capacity(outcome.structures.len());
    for (structure, name) in outcome.structures.iter().zip(&names) {
        let path = out_dir.join(format!("{}{}.pdb", name, config.output_suffix));
        PdbFile::write_to_path(structure, &options, &path).map_err(|source| SyncError::Write {
            path: path.display().to_string(),
            source,
        })?;
        written.push((structure.id().to_string(), path));
    }

    let manifest_path = out_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, outcome.manifest())?;

    reporter.report(Progress::StageFinish);
    Ok((written, manifest_path))
}
