use crate::core::align::pairwise::PairwiseAligner;
use crate::core::models::structure::StructureRecord;
use tracing::debug;

/// Mean similarity of two relabeled structures over `shared_chains`, in `[0, 1]`.
///
/// Each shared chain is scored on its own; a chain missing from either
/// structure scores zero.
pub fn structure_similarity(
    aligner: &PairwiseAligner,
    a: &StructureRecord,
    b: &StructureRecord,
    shared_chains: &[char],
) -> f64 {
    if shared_chains.is_empty() {
        return 0.0;
    }
    let total: f64 = shared_chains
        .iter()
        .map(|&chain| match (a.chain_sequence(chain), b.chain_sequence(chain)) {
            (Some(x), Some(y)) => aligner.normalized_score(&x.sequence, &y.sequence),
            _ => 0.0,
        })
        .sum();
    total / shared_chains.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    /// Indices of retained structures, in ensemble order.
    pub retained: Vec<usize>,
    /// Excluded structure indices with their mean similarity when dropped.
    pub excluded: Vec<(usize, f64)>,
}

/// Drops structures too dissimilar from the rest of the ensemble.
///
/// Structures are compared on their canonical chains only, so chains that are
/// not shared across the ensemble do not count against a structure. Each
/// structure's score is its mean similarity to every other retained
/// structure. While the lowest score is at or below the threshold, that single
/// structure is dropped and the scores are recomputed, so one outlier cannot
/// drag the others down with it. Ties drop the later structure.
pub struct SimilarityGate<'a> {
    aligner: &'a PairwiseAligner,
    threshold: f64,
}

impl<'a> SimilarityGate<'a> {
    pub fn new(aligner: &'a PairwiseAligner, threshold: f64) -> Self {
        Self { aligner, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluates relabeled `structures` over their `shared_chains`.
    pub fn evaluate(&self, structures: &[StructureRecord], shared_chains: &[char]) -> GateOutcome {
        let n = structures.len();
        let mut similarity = vec![vec![1.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let score =
                    structure_similarity(self.aligner, &structures[i], &structures[j], shared_chains);
                similarity[i][j] = score;
                similarity[j][i] = score;
            }
        }

        let mut retained: Vec<usize> = (0..n).collect();
        let mut excluded = Vec::new();

        while retained.len() > 1 {
            let means: Vec<(usize, f64)> = retained
                .iter()
                .map(|&i| {
                    let others: Vec<f64> = retained
                        .iter()
                        .filter(|&&j| j != i)
                        .map(|&j| similarity[i][j])
                        .collect();
                    (i, others.iter().sum::<f64>() / others.len() as f64)
                })
                .collect();

            let Some(&(worst, mean)) = means
                .iter()
                .min_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            else {
                break;
            };

            debug!(structure = worst, mean, "Lowest mean ensemble similarity");
            if mean > self.threshold {
                break;
            }
            retained.retain(|&i| i != worst);
            excluded.push((worst, mean));
        }

        GateOutcome { retained, excluded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chains::test_support::build_structure;

    const BASE: &str = "MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ";
    const UNRELATED: &str = "GSHMWEDPVNGWTCEYLRKAARPPCDNHTWYFD";

    fn single(id: &str, sequence: &str) -> StructureRecord {
        build_structure(id, &[('A', sequence)])
    }

    #[test]
    fn identical_structures_are_fully_similar() {
        let aligner = PairwiseAligner::default();
        let a = single("a", BASE);
        assert!((structure_similarity(&aligner, &a, &a, &['A']) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn chains_outside_the_shared_set_are_ignored() {
        let aligner = PairwiseAligner::default();
        let complex = build_structure("complex", &[('A', BASE), ('B', UNRELATED)]);
        let apo = single("apo", BASE);
        let forward = structure_similarity(&aligner, &complex, &apo, &['A']);
        let backward = structure_similarity(&aligner, &apo, &complex, &['A']);
        assert!((forward - 1.0).abs() < 1e-12);
        assert!((backward - 1.0).abs() < 1e-12);

        let outcome = SimilarityGate::new(&aligner, 0.90).evaluate(&[complex, apo], &['A']);
        assert_eq!(outcome.retained, vec![0, 1]);
        assert!(outcome.excluded.is_empty());
    }

    #[test]
    fn missing_shared_chain_scores_zero() {
        let aligner = PairwiseAligner::default();
        let both = build_structure("both", &[('A', BASE), ('B', UNRELATED)]);
        let only_a = single("only_a", BASE);
        let score = structure_similarity(&aligner, &both, &only_a, &['A', 'B']);
        assert!((score - 0.5).abs() < 1e-12);
        assert_eq!(structure_similarity(&aligner, &both, &only_a, &[]), 0.0);
    }

    #[test]
    fn single_outlier_is_excluded() {
        let aligner = PairwiseAligner::default();
        let structures = vec![
            single("1", BASE),
            single("2", BASE),
            single("3", UNRELATED),
            single("4", BASE),
        ];
        let outcome = SimilarityGate::new(&aligner, 0.90).evaluate(&structures, &['A']);
        assert_eq!(outcome.retained, vec![0, 1, 3]);
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].0, 2);
    }

    #[test]
    fn pair_below_threshold_drops_the_later_structure() {
        let aligner = PairwiseAligner::default();
        let structures = vec![single("1", BASE), single("2", UNRELATED)];
        let outcome = SimilarityGate::new(&aligner, 0.90).evaluate(&structures, &['A']);
        assert_eq!(outcome.retained, vec![0]);
        assert_eq!(outcome.excluded[0].0, 1);
    }

    #[test]
    fn single_structure_is_never_excluded() {
        let aligner = PairwiseAligner::default();
        let outcome = SimilarityGate::new(&aligner, 0.90).evaluate(&[single("1", BASE)], &['A']);
        assert_eq!(outcome.retained, vec![0]);
        assert!(outcome.excluded.is_empty());
    }
}
