use crate::core::align::pairwise::PairwiseAligner;
use crate::core::models::structure::{ChainSequence, StructureRecord};
use std::collections::HashMap;
use tracing::debug;

/// Chains of one structure whose sequences are copies of each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainClass {
    /// The first-seen member, which stands for the class.
    pub representative: char,
    /// Every member label, representative first.
    pub members: Vec<char>,
}

/// The equivalence classes of one structure's chains.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainGrouping {
    sequences: Vec<ChainSequence>,
    classes: Vec<ChainClass>,
    class_of: HashMap<char, usize>,
}

impl ChainGrouping {
    pub fn sequences(&self) -> &[ChainSequence] {
        &self.sequences
    }

    pub fn classes(&self) -> &[ChainClass] {
        &self.classes
    }

    pub fn class_of(&self, chain: char) -> Option<&ChainClass> {
        self.class_of.get(&chain).map(|&index| &self.classes[index])
    }

    pub fn sequence(&self, chain: char) -> Option<&ChainSequence> {
        self.sequences.iter().find(|s| s.chain == chain)
    }

    /// One label per class, in chain encounter order.
    pub fn unique_representatives(&self) -> Vec<char> {
        self.classes.iter().map(|class| class.representative).collect()
    }

    pub fn representative_sequences(&self) -> Vec<&ChainSequence> {
        self.classes
            .iter()
            .filter_map(|class| self.sequence(class.representative))
            .collect()
    }
}

/// Clusters the chains of a structure by sequence identity.
///
/// Chains are compared pairwise in encounter order. A chain scoring at or above
/// the threshold against an earlier representative joins that class and is not
/// compared again.
pub struct ChainGrouper<'a> {
    aligner: &'a PairwiseAligner,
    threshold: f64,
}

impl<'a> ChainGrouper<'a> {
    pub fn new(aligner: &'a PairwiseAligner, threshold: f64) -> Self {
        Self { aligner, threshold }
    }

    /// Groups the chains of `structure`; `None` if it has no protein chain.
    pub fn group(&self, structure: &StructureRecord) -> Option<ChainGrouping> {
        let sequences = structure.chain_sequences();
        if sequences.is_empty() {
            return None;
        }

        let mut assigned: Vec<Option<usize>> = vec![None; sequences.len()];
        let mut classes: Vec<ChainClass> = Vec::new();

        for i in 0..sequences.len() {
            if assigned[i].is_some() {
                continue;
            }
            let class_index = classes.len();
            assigned[i] = Some(class_index);
            let mut members = vec![sequences[i].chain];

            for j in (i + 1)..sequences.len() {
                if assigned[j].is_some() {
                    continue;
                }
                let score = self
                    .aligner
                    .normalized_score(&sequences[i].sequence, &sequences[j].sequence);
                if score >= self.threshold {
                    debug!(
                        structure = structure.id(),
                        chain = %sequences[j].chain,
                        duplicate_of = %sequences[i].chain,
                        score,
                        "Chain duplicates an earlier chain"
                    );
                    assigned[j] = Some(class_index);
                    members.push(sequences[j].chain);
                }
            }

            classes.push(ChainClass {
                representative: sequences[i].chain,
                members,
            });
        }

        let class_of = sequences
            .iter()
            .zip(&assigned)
            .filter_map(|(sequence, class)| class.map(|c| (sequence.chain, c)))
            .collect();

        Some(ChainGrouping {
            sequences,
            classes,
            class_of,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::models::atom::{AtomClass, AtomRecord};
    use crate::core::models::residue::AminoAcidType;
    use crate::core::models::structure::StructureRecord;
    use nalgebra::Point3;

    fn three_letter(code: char) -> &'static str {
        [
            AminoAcidType::Alanine,
            AminoAcidType::Glycine,
            AminoAcidType::Isoleucine,
            AminoAcidType::Leucine,
            AminoAcidType::Proline,
            AminoAcidType::Valine,
            AminoAcidType::Phenylalanine,
            AminoAcidType::Tryptophan,
            AminoAcidType::Tyrosine,
            AminoAcidType::Asparagine,
            AminoAcidType::Cysteine,
            AminoAcidType::Glutamine,
            AminoAcidType::Serine,
            AminoAcidType::Threonine,
            AminoAcidType::Methionine,
            AminoAcidType::Arginine,
            AminoAcidType::Lysine,
            AminoAcidType::Histidine,
            AminoAcidType::AsparticAcid,
            AminoAcidType::GlutamicAcid,
        ]
        .iter()
        .find(|aa| aa.one_letter_code() == code)
        .map_or("UNK", |aa| aa.three_letter_code())
    }

    /// Builds a structure with N, CA and C rows per residue from `(chain, sequence)` pairs.
    pub fn build_structure(id: &str, chains: &[(char, &str)]) -> StructureRecord {
        let mut atoms = Vec::new();
        for &(chain, sequence) in chains {
            for (i, code) in sequence.chars().enumerate() {
                let number = i as isize + 1;
                let x = i as f64 * 3.8;
                for (name, offset) in [("N", -1.0), ("CA", 0.0), ("C", 1.0)] {
                    atoms.push(AtomRecord::new(
                        AtomClass::Atom,
                        name,
                        three_letter(code),
                        chain,
                        number,
                        Point3::new(x + offset, 0.0, 0.0),
                    ));
                }
            }
        }
        StructureRecord::new(id, atoms)
    }
}
