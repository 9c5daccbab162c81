use super::error::SyncError;
use crate::core::align::msa::{AlignmentMatrix, ColumnConsensus, GAP};
use crate::core::models::atom::ResidueAnnotation;
use crate::core::models::residue::{AminoAcidType, ResidueKey};
use crate::core::models::structure::StructureRecord;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResidueAssignment {
    number: isize,
    annotation: ResidueAnnotation,
    serine_to_cysteine: bool,
}

/// Walks one alignment row and assigns every residue its unified number.
///
/// Identical columns advance the shared counter (1, 2, ...); all other columns
/// advance the structure-specific counter (-1, -2, ...). Gaps consume nothing.
fn assign_row(
    row: &[char],
    residues: &[ResidueKey],
    consensus: &[ColumnConsensus],
    shared_fraction: &[f64],
) -> Option<HashMap<ResidueKey, ResidueAssignment>> {
    let mut assignments = HashMap::with_capacity(residues.len());
    let mut residue_iter = residues.iter();
    let mut shared_counter = 1isize;
    let mut specific_counter = -1isize;

    for (column, &code) in row.iter().enumerate() {
        if code == GAP {
            continue;
        }
        let key = residue_iter.next()?;
        let identical = consensus[column] != ColumnConsensus::Divergent;
        let number = if identical {
            let n = shared_counter;
            shared_counter += 1;
            n
        } else {
            let n = specific_counter;
            specific_counter -= 1;
            n
        };
        assignments.insert(
            *key,
            ResidueAssignment {
                number,
                annotation: ResidueAnnotation {
                    shared_fraction: shared_fraction[column],
                    identical_aa: identical,
                },
                serine_to_cysteine: consensus[column] == ColumnConsensus::SerineCysteine
                    && code == 'S',
            },
        );
    }

    if residue_iter.next().is_some() {
        return None;
    }
    Some(assignments)
}

/// Renumbers the residues of aligned chains so that equivalent positions share numbers.
///
/// Residues at identical columns get positive numbers that agree across the
/// ensemble. Residues anywhere else get negative, structure-specific numbers.
/// Serine at a serine/cysteine column is mutated to cysteine (`OG` becomes
/// `SG`). Protein residues of the chain without an alpha carbon are not part of
/// the aligned sequence and are dropped.
pub struct ResidueNumberUnifier;

impl ResidueNumberUnifier {
    /// Applies `alignment` (one row per structure, in order) to `chain` of each structure.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Internal`] if the alignment shape or residue counts
    /// disagree with the structures' chain sequences.
    pub fn unify_chain(
        structures: &[StructureRecord],
        chain: char,
        alignment: &AlignmentMatrix,
    ) -> Result<Vec<StructureRecord>, SyncError> {
        if alignment.num_rows() != structures.len() {
            return Err(SyncError::Internal(format!(
                "alignment of chain {} has {} rows for {} structures",
                chain,
                alignment.num_rows(),
                structures.len()
            )));
        }

        let columns: Vec<_> = alignment.columns().collect();
        let consensus: Vec<ColumnConsensus> = columns.iter().map(|c| c.consensus()).collect();
        let shared_fraction: Vec<f64> = columns.iter().map(|c| c.shared_fraction()).collect();
        let shared = consensus
            .iter()
            .filter(|&&c| c != ColumnConsensus::Divergent)
            .count();
        debug!(chain = %chain, columns = columns.len(), shared, "Unifying residue numbers");

        structures
            .iter()
            .enumerate()
            .map(|(index, structure)| {
                let residues = structure
                    .chain_sequence(chain)
                    .map(|sequence| sequence.residues)
                    .unwrap_or_default();
                let assignments = assign_row(
                    alignment.row(index),
                    &residues,
                    &consensus,
                    &shared_fraction,
                )
                .ok_or_else(|| {
                    SyncError::Internal(format!(
                        "alignment row for chain {} of '{}' does not match its {} residues",
                        chain,
                        structure.id(),
                        residues.len()
                    ))
                })?;
                Ok(apply_assignments(structure, chain, &assignments))
            })
            .collect()
    }

    /// Marks every protein residue of a lone structure as fully shared.
    pub fn annotate_single(structure: &StructureRecord) -> StructureRecord {
        let atoms = structure
            .atoms()
            .iter()
            .cloned()
            .map(|mut atom| {
                if atom.is_protein() {
                    atom.annotation = Some(ResidueAnnotation::fully_shared());
                }
                atom
            })
            .collect();
        structure.with_atoms(atoms)
    }
}

fn apply_assignments(
    structure: &StructureRecord,
    chain: char,
    assignments: &HashMap<ResidueKey, ResidueAssignment>,
) -> StructureRecord {
    let atoms = structure
        .atoms()
        .iter()
        .filter_map(|atom| {
            if !atom.is_protein() || atom.chain != chain {
                return Some(atom.clone());
            }
            let assignment = assignments.get(&atom.residue_key())?;
            let mut atom = atom.clone();
            atom.residue_number = assignment.number;
            atom.insertion_code = None;
            atom.annotation = Some(assignment.annotation);
            if assignment.serine_to_cysteine {
                atom.residue_name = AminoAcidType::Cysteine.three_letter_code().to_string();
                if atom.name == "OG" {
                    atom.name = "SG".to_string();
                    atom.element = "S".to_string();
                }
            }
            Some(atom)
        })
        .collect();
    structure.with_atoms(atoms)
}

/// The `(chain, number)` positions every structure shares after unification.
pub fn shared_residue_keys(structure: &StructureRecord) -> BTreeSet<(char, isize)> {
    structure
        .atoms()
        .iter()
        .filter(|atom| atom.is_protein() && atom.residue_number > 0)
        .filter(|atom| atom.annotation.is_some_and(|a| a.identical_aa))
        .map(|atom| (atom.chain, atom.residue_number))
        .collect()
}
