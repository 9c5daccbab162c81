use crate::core::align::pairwise::PairwiseScoring;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Threshold '{name}' must lie within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error(
        "Gap scores must not be positive and opening must cost at least as much as extending (open: {open}, extend: {extend})"
    )]
    InvalidGapScores { open: f64, extend: f64 },
    #[error("Output suffix must not be empty")]
    EmptyOutputSuffix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityThresholds {
    /// Normalized score at or above which two chains of one structure are copies.
    pub within_structure: f64,
    /// Normalized score at or above which chains of two structures correspond.
    pub cross_structure: f64,
    /// Mean similarity at or below which a structure is dropped from the ensemble.
    pub ensemble: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            within_structure: 0.99,
            cross_structure: 0.95,
            ensemble: 0.90,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub cleaner: PathBuf,
    pub sequence_aligner: PathBuf,
    pub structure_aligner: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            cleaner: PathBuf::from("foldx"),
            sequence_aligner: PathBuf::from("muscle"),
            structure_aligner: PathBuf::from("lovoalign"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub thresholds: SimilarityThresholds,
    pub scoring: PairwiseScoring,
    pub tools: ToolPaths,
    pub clean_structures: bool,
    pub align_sequences: bool,
    pub align_structures: bool,
    /// Merge every MODEL of a file into one; otherwise only the first model is kept.
    pub incorporate_models: bool,
    pub keep_temporary: bool,
    pub overwrite: bool,
    /// Appended to each output base name, before the `.pdb` extension.
    pub output_suffix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            thresholds: SimilarityThresholds::default(),
            scoring: PairwiseScoring::default(),
            tools: ToolPaths::default(),
            clean_structures: true,
            align_sequences: true,
            align_structures: true,
            incorporate_models: false,
            keep_temporary: false,
            overwrite: false,
            output_suffix: "_clean".to_string(),
        }
    }
}

#[derive(Default)]
pub struct SyncConfigBuilder {
    within_structure_threshold: Option<f64>,
    cross_structure_threshold: Option<f64>,
    ensemble_threshold: Option<f64>,
    scoring: Option<PairwiseScoring>,
    cleaner_path: Option<PathBuf>,
    sequence_aligner_path: Option<PathBuf>,
    structure_aligner_path: Option<PathBuf>,
    clean_structures: Option<bool>,
    align_sequences: Option<bool>,
    align_structures: Option<bool>,
    incorporate_models: Option<bool>,
    keep_temporary: Option<bool>,
    overwrite: Option<bool>,
    output_suffix: Option<String>,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within_structure_threshold(mut self, threshold: f64) -> Self {
        self.within_structure_threshold = Some(threshold);
        self
    }
    pub fn cross_structure_threshold(mut self, threshold: f64) -> Self {
        self.cross_structure_threshold = Some(threshold);
        self
    }
    pub fn ensemble_threshold(mut self, threshold: f64) -> Self {
        self.ensemble_threshold = Some(threshold);
        self
    }
    pub fn scoring(mut self, scoring: PairwiseScoring) -> Self {
        self.scoring = Some(scoring);
        self
    }
    pub fn cleaner_path(mut self, path: PathBuf) -> Self {
        self.cleaner_path = Some(path);
        self
    }
    pub fn sequence_aligner_path(mut self, path: PathBuf) -> Self {
        self.sequence_aligner_path = Some(path);
        self
    }
    pub fn structure_aligner_path(mut self, path: PathBuf) -> Self {
        self.structure_aligner_path = Some(path);
        self
    }
    pub fn clean_structures(mut self, enabled: bool) -> Self {
        self.clean_structures = Some(enabled);
        self
    }
    pub fn align_sequences(mut self, enabled: bool) -> Self {
        self.align_sequences = Some(enabled);
        self
    }
    pub fn align_structures(mut self, enabled: bool) -> Self {
        self.align_structures = Some(enabled);
        self
    }
    pub fn incorporate_models(mut self, enabled: bool) -> Self {
        self.incorporate_models = Some(enabled);
        self
    }
    pub fn keep_temporary(mut self, enabled: bool) -> Self {
        self.keep_temporary = Some(enabled);
        self
    }
    pub fn overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = Some(enabled);
        self
    }
    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = Some(suffix.into());
        self
    }

    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();

        let thresholds = SimilarityThresholds {
            within_structure: check_threshold(
                "within_structure",
                self.within_structure_threshold
                    .unwrap_or(defaults.thresholds.within_structure),
            )?,
            cross_structure: check_threshold(
                "cross_structure",
                self.cross_structure_threshold
                    .unwrap_or(defaults.thresholds.cross_structure),
            )?,
            ensemble: check_threshold(
                "ensemble",
                self.ensemble_threshold.unwrap_or(defaults.thresholds.ensemble),
            )?,
        };

        let scoring = self.scoring.unwrap_or(defaults.scoring);
        if scoring.open_gap_score > 0.0
            || scoring.extend_gap_score > 0.0
            || scoring.open_gap_score > scoring.extend_gap_score
        {
            return Err(ConfigError::InvalidGapScores {
                open: scoring.open_gap_score,
                extend: scoring.extend_gap_score,
            });
        }

        let output_suffix = self.output_suffix.unwrap_or(defaults.output_suffix);
        if output_suffix.is_empty() {
            return Err(ConfigError::EmptyOutputSuffix);
        }

        Ok(SyncConfig {
            thresholds,
            scoring,
            tools: ToolPaths {
                cleaner: self.cleaner_path.unwrap_or(defaults.tools.cleaner),
                sequence_aligner: self
                    .sequence_aligner_path
                    .unwrap_or(defaults.tools.sequence_aligner),
                structure_aligner: self
                    .structure_aligner_path
                    .unwrap_or(defaults.tools.structure_aligner),
            },
            clean_structures: self.clean_structures.unwrap_or(defaults.clean_structures),
            align_sequences: self.align_sequences.unwrap_or(defaults.align_sequences),
            align_structures: self.align_structures.unwrap_or(defaults.align_structures),
            incorporate_models: self
                .incorporate_models
                .unwrap_or(defaults.incorporate_models),
            keep_temporary: self.keep_temporary.unwrap_or(defaults.keep_temporary),
            overwrite: self.overwrite.unwrap_or(defaults.overwrite),
            output_suffix,
        })
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}
