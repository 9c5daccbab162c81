use super::chains::ChainGrouping;
use super::error::SyncError;
use crate::core::align::pairwise::PairwiseAligner;
use crate::core::models::atom::AtomClass;
use crate::core::models::structure::StructureRecord;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const CANONICAL_LABELS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const PLACEHOLDER_POOL: &str =
    "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ!#$%&*+";

/// A chain present exactly once in every structure, under its ensemble-wide label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalChain {
    pub label: char,
    /// The chain's current label in each structure, in ensemble order.
    pub members: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatching {
    canonical: Vec<CanonicalChain>,
}

impl ChainMatching {
    pub fn canonical_chains(&self) -> &[CanonicalChain] {
        &self.canonical
    }

    pub fn shared_chains(&self) -> Vec<char> {
        self.canonical.iter().map(|chain| chain.label).collect()
    }

    /// Applies the canonical labels to every structure, in ensemble order.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Internal`] if the structure count differs from the
    /// number of structures the matching was computed for, or
    /// [`SyncError::ChainLabelsExhausted`] if a structure leaves no label free
    /// for swapping.
    pub fn relabel(&self, structures: &[StructureRecord]) -> Result<Vec<StructureRecord>, SyncError> {
        structures
            .iter()
            .enumerate()
            .map(|(index, structure)| {
                let renames = self
                    .canonical
                    .iter()
                    .map(|chain| {
                        chain
                            .members
                            .get(index)
                            .map(|&member| (member, chain.label))
                            .ok_or_else(|| {
                                SyncError::Internal(format!(
                                    "no chain assignment for structure {} ('{}')",
                                    index,
                                    structure.id()
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                relabel_structure(structure, &renames)
            })
            .collect()
    }
}

fn unused_label(in_use: &HashSet<char>) -> Option<char> {
    PLACEHOLDER_POOL.chars().find(|c| !in_use.contains(c))
}

/// Moves each `(original, target)` chain to its target label.
///
/// Labels are swapped through a placeholder so that a chain already sitting on
/// a target label trades places instead of merging. Later renames look up
/// where an original chain currently lives, since earlier swaps may have moved
/// it. Protein rows left on non-canonical labels are dropped; hetero rows stay.
/// Rows are then stably ordered by chain label.
pub fn relabel_structure(
    structure: &StructureRecord,
    renames: &[(char, char)],
) -> Result<StructureRecord, SyncError> {
    let mut current = structure.clone();
    let mut location: HashMap<char, char> = current
        .chain_labels()
        .into_iter()
        .map(|label| (label, label))
        .collect();

    for &(original, target) in renames {
        let source = location.get(&original).copied().unwrap_or(original);
        if source == target {
            continue;
        }
        let in_use: HashSet<char> = current.chain_labels().into_iter().collect();
        let placeholder =
            unused_label(&in_use).ok_or_else(|| SyncError::ChainLabelsExhausted {
                structure: current.id().to_string(),
            })?;

        current = current
            .rename_chain(target, placeholder)
            .rename_chain(source, target)
            .rename_chain(placeholder, source);

        for label in location.values_mut() {
            if *label == target {
                *label = source;
            } else if *label == source {
                *label = target;
            }
        }
    }

    let canonical: HashSet<char> = renames.iter().map(|&(_, target)| target).collect();
    let mut atoms: Vec<_> = current
        .into_atoms()
        .into_iter()
        .filter(|atom| atom.class == AtomClass::Hetatm || canonical.contains(&atom.chain))
        .collect();
    atoms.sort_by_key(|atom| atom.chain);
    Ok(structure.with_atoms(atoms))
}

/// Finds the chains shared by every structure and assigns them canonical labels.
///
/// The first structure's unique chains form the reference set. A reference
/// chain becomes canonical when every other structure has exactly one unique
/// chain scoring at or above the threshold against it, and that chain is not
/// already claimed by an earlier canonical chain.
pub struct ChainMatcher<'a> {
    aligner: &'a PairwiseAligner,
    threshold: f64,
}

impl<'a> ChainMatcher<'a> {
    pub fn new(aligner: &'a PairwiseAligner, threshold: f64) -> Self {
        Self { aligner, threshold }
    }

    pub fn match_chains(&self, groupings: &[ChainGrouping]) -> Result<ChainMatching, SyncError> {
        let Some(reference) = groupings.first() else {
            return Err(SyncError::Internal(
                "chain matching needs at least one structure".to_string(),
            ));
        };

        // Every structure holds a single chain: nothing to compare.
        if groupings.iter().all(|g| g.sequences().len() == 1) {
            let members = groupings.iter().map(|g| g.sequences()[0].chain).collect();
            return Ok(ChainMatching {
                canonical: vec![CanonicalChain { label: 'A', members }],
            });
        }

        let reference_sequences = reference.representative_sequences();
        // matches[r][s]: chains of structure s matching reference chain r.
        let mut matches: Vec<Vec<Vec<char>>> = reference_sequences
            .iter()
            .map(|sequence| {
                let mut per_structure = vec![Vec::new(); groupings.len()];
                per_structure[0].push(sequence.chain);
                per_structure
            })
            .collect();

        for (s, grouping) in groupings.iter().enumerate().skip(1) {
            for candidate in grouping.representative_sequences() {
                for (r, reference_sequence) in reference_sequences.iter().enumerate() {
                    let score = self
                        .aligner
                        .normalized_score(&reference_sequence.sequence, &candidate.sequence);
                    if score >= self.threshold {
                        matches[r][s].push(candidate.chain);
                    }
                }
            }
        }

        let mut claimed: Vec<HashSet<char>> = vec![HashSet::new(); groupings.len()];
        let mut shared: Vec<Vec<char>> = Vec::new();
        for (r, per_structure) in matches.iter().enumerate() {
            let reference_chain = reference_sequences[r].chain;
            if per_structure.iter().any(|m| m.len() != 1) {
                debug!(chain = %reference_chain, "Chain is not present exactly once in every structure");
                continue;
            }
            let members: Vec<char> = per_structure.iter().map(|m| m[0]).collect();
            if members.iter().zip(&claimed).any(|(m, used)| used.contains(m)) {
                warn!(chain = %reference_chain, "Chain matches a chain already assigned elsewhere");
                continue;
            }
            for (member, used) in members.iter().zip(claimed.iter_mut()) {
                used.insert(*member);
            }
            shared.push(members);
        }

        if shared.is_empty() {
            return Err(SyncError::NoSharedChains);
        }
        let max = CANONICAL_LABELS.len();
        if shared.len() > max {
            return Err(SyncError::TooManyChains {
                count: shared.len(),
                max,
            });
        }

        let canonical: Vec<CanonicalChain> = CANONICAL_LABELS
            .chars()
            .zip(shared)
            .map(|(label, members)| CanonicalChain { label, members })
            .collect();
        info!(
            shared = canonical.len(),
            reference_chains = reference_sequences.len(),
            "Matched chains across the ensemble"
        );
        Ok(ChainMatching { canonical })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chains::ChainGrouper;
    use crate::engine::chains::test_support::build_structure;
    use crate::core::models::atom::AtomRecord;
    use nalgebra::Point3;

    const SEQ_1: &str = "MKTAYIAKQRQISFVKSHFSRQ";
    const SEQ_2: &str = "GSHMLEDPVAGWTCEQLRKAAR";
    const SEQ_3: &str = "PPGWEEVNNCRYFLWHKDNIPQ";

    fn groupings(structures: &[StructureRecord]) -> Vec<ChainGrouping> {
        let aligner = PairwiseAligner::default();
        let grouper = ChainGrouper::new(&aligner, 0.99);
        structures.iter().map(|s| grouper.group(s).unwrap()).collect()
    }

    fn match_and_relabel(structures: &[StructureRecord]) -> (ChainMatching, Vec<StructureRecord>) {
        let aligner = PairwiseAligner::default();
        let matching = ChainMatcher::new(&aligner, 0.95)
            .match_chains(&groupings(structures))
            .unwrap();
        let relabeled = matching.relabel(structures).unwrap();
        (matching, relabeled)
    }

    #[test]
    fn duplicate_chain_leaves_one_shared_class() {
        // Chain B of the second structure repeats its chain A.
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('A', SEQ_1), ('B', SEQ_1)]);
        let (matching, relabeled) = match_and_relabel(&[first, second]);

        assert_eq!(matching.shared_chains(), vec!['A']);
        assert_eq!(matching.canonical_chains()[0].members, vec!['A', 'A']);
        for structure in &relabeled {
            assert_eq!(structure.chain_labels(), vec!['A']);
            assert_eq!(structure.chain_sequence('A').unwrap().sequence, SEQ_1);
        }
    }

    #[test]
    fn shared_chains_may_sit_on_any_label() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('A', SEQ_1), ('B', SEQ_1), ('C', SEQ_2)]);
        let (matching, relabeled) = match_and_relabel(&[first, second]);

        assert_eq!(matching.shared_chains(), vec!['A', 'B']);
        assert_eq!(matching.canonical_chains()[1].members, vec!['B', 'C']);
        assert_eq!(relabeled[1].chain_sequence('B').unwrap().sequence, SEQ_2);
        assert_eq!(relabeled[1].chain_labels(), vec!['A', 'B']);
    }

    #[test]
    fn swapped_labels_are_exchanged_through_a_placeholder() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('A', SEQ_2), ('B', SEQ_1)]);
        let (matching, relabeled) = match_and_relabel(&[first, second]);

        assert_eq!(matching.shared_chains(), vec!['A', 'B']);
        let second = &relabeled[1];
        assert_eq!(second.chain_sequence('A').unwrap().sequence, SEQ_1);
        assert_eq!(second.chain_sequence('B').unwrap().sequence, SEQ_2);
        assert_eq!(second.chain_labels(), vec!['A', 'B']);
    }

    #[test]
    fn rotated_labels_follow_earlier_swaps() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2), ('C', SEQ_3)]);
        let second = build_structure("2.pdb", &[('A', SEQ_3), ('B', SEQ_1), ('C', SEQ_2)]);
        let (_, relabeled) = match_and_relabel(&[first, second]);

        let second = &relabeled[1];
        assert_eq!(second.chain_sequence('A').unwrap().sequence, SEQ_1);
        assert_eq!(second.chain_sequence('B').unwrap().sequence, SEQ_2);
        assert_eq!(second.chain_sequence('C').unwrap().sequence, SEQ_3);
    }

    #[test]
    fn matching_is_idempotent_on_canonical_ensembles() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('B', SEQ_2), ('A', SEQ_1)]);
        let (first_matching, once) = match_and_relabel(&[first, second]);
        let (second_matching, twice) = match_and_relabel(&once);

        assert_eq!(first_matching.shared_chains(), second_matching.shared_chains());
        assert_eq!(once, twice);
    }

    #[test]
    fn single_chain_structures_map_to_a() {
        let first = build_structure("1.pdb", &[('X', SEQ_1)]);
        let second = build_structure("2.pdb", &[('Q', "MKTAYIAKQRQ")]);
        let (matching, relabeled) = match_and_relabel(&[first, second]);

        assert_eq!(matching.shared_chains(), vec!['A']);
        assert!(relabeled.iter().all(|s| s.chain_labels() == vec!['A']));
    }

    #[test]
    fn hetero_rows_are_kept_and_non_shared_protein_is_dropped() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let mut second = build_structure("2.pdb", &[('A', SEQ_1), ('B', SEQ_3)]);
        let mut atoms = second.atoms().to_vec();
        atoms.push(AtomRecord::new(AtomClass::Hetatm, "ZN", "ZN", 'B', 900, Point3::origin()));
        second = second.with_atoms(atoms);

        let (matching, relabeled) = match_and_relabel(&[first, second]);
        assert_eq!(matching.shared_chains(), vec!['A']);
        let second = &relabeled[1];
        assert_eq!(second.chain_sequences().len(), 1);
        assert!(second.atoms().iter().any(|a| a.class == AtomClass::Hetatm));
        assert!(second
            .atoms()
            .iter()
            .filter(|a| a.class == AtomClass::Atom)
            .all(|a| a.chain == 'A'));
    }

    #[test]
    fn no_shared_chain_is_an_error() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('A', SEQ_3), ('B', SEQ_3)]);
        let aligner = PairwiseAligner::default();
        let result = ChainMatcher::new(&aligner, 0.95).match_chains(&groupings(&[first, second]));
        assert!(matches!(result, Err(SyncError::NoSharedChains)));
    }

    #[test]
    fn relabel_rejects_foreign_structure_lists() {
        let first = build_structure("1.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let second = build_structure("2.pdb", &[('A', SEQ_1), ('B', SEQ_2)]);
        let aligner = PairwiseAligner::default();
        let matching = ChainMatcher::new(&aligner, 0.95)
            .match_chains(&groupings(&[first.clone(), second.clone()]))
            .unwrap();
        let extra = [first, second.clone(), second];
        assert!(matches!(matching.relabel(&extra), Err(SyncError::Internal(_))));
    }

    #[test]
    fn swap_without_free_label_is_an_error() {
        let chains: Vec<(char, &str)> = PLACEHOLDER_POOL.chars().map(|c| (c, "G")).collect();
        let crowded = build_structure("crowded.pdb", &chains);
        let result = relabel_structure(&crowded, &[('a', 'B')]);
        assert!(matches!(
            result,
            Err(SyncError::ChainLabelsExhausted { structure }) if structure == "crowded.pdb"
        ));
    }
}
