use bio::alignment::pairwise::{Aligner, MatchParams, Scoring};

/// Fixed-point factor applied to the scores before integer alignment.
const SCORE_SCALE: f64 = 1000.0;

/// Scores used by [`PairwiseAligner`].
///
/// Gaps at either end of a sequence are free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseScoring {
    pub match_score: f64,
    pub mismatch_score: f64,
    /// Score of the first position of an internal gap.
    pub open_gap_score: f64,
    /// Score of every further position of an internal gap.
    pub extend_gap_score: f64,
}

impl Default for PairwiseScoring {
    fn default() -> Self {
        Self {
            match_score: 1.0,
            mismatch_score: 0.0,
            open_gap_score: -0.5,
            extend_gap_score: -0.1,
        }
    }
}

fn scaled(score: f64) -> i32 {
    (score * SCORE_SCALE).round() as i32
}

impl PairwiseScoring {
    /// Integer scoring for a gap of length `k` costing `open + (k - 1) * extend`.
    ///
    /// Clipping either end of either sequence costs nothing, which turns
    /// overhangs into free end gaps.
    fn to_bio(self) -> Scoring<MatchParams> {
        Scoring::from_scores(
            scaled(self.open_gap_score - self.extend_gap_score),
            scaled(self.extend_gap_score),
            scaled(self.match_score),
            scaled(self.mismatch_score),
        )
        .xclip(0)
        .yclip(0)
    }
}

/// Pairwise alignment scorer with affine internal gaps and free end gaps.
#[derive(Debug, Clone, Default)]
pub struct PairwiseAligner {
    scoring: PairwiseScoring,
}

impl PairwiseAligner {
    pub fn new(scoring: PairwiseScoring) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> &PairwiseScoring {
        &self.scoring
    }

    /// Returns the optimal alignment score of `a` against `b`.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let mut aligner =
            Aligner::with_capacity_and_scoring(a.len(), b.len(), self.scoring.to_bio());
        let alignment = aligner.custom(a.as_bytes(), b.as_bytes());
        f64::from(alignment.score) / SCORE_SCALE
    }

    /// Score divided by the length of the shorter sequence; `0.0` if either is empty.
    pub fn normalized_score(&self, a: &str, b: &str) -> f64 {
        let shorter = a.len().min(b.len());
        if shorter == 0 {
            return 0.0;
        }
        self.score(a, b) / shorter as f64
    }
}
