pub mod defaults;

use crate::cli::SyncArgs;
use crate::error::{CliError, Result};
use ensync::core::align::pairwise::PairwiseScoring;
use ensync::engine::config::{SyncConfig, SyncConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialThresholdsConfig {
    within_structure: Option<f64>,
    cross_structure: Option<f64>,
    ensemble: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialScoringConfig {
    match_score: Option<f64>,
    mismatch_score: Option<f64>,
    open_gap_score: Option<f64>,
    extend_gap_score: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialToolsConfig {
    foldx: Option<PathBuf>,
    muscle: Option<PathBuf>,
    lovoalign: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPipelineConfig {
    clean: Option<bool>,
    align_sequences: Option<bool>,
    align_structures: Option<bool>,
    all_models: Option<bool>,
    keep_temporary: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    suffix: Option<String>,
    overwrite: Option<bool>,
}

/// The TOML configuration file, every key optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSyncConfig {
    thresholds: Option<PartialThresholdsConfig>,
    scoring: Option<PartialScoringConfig>,
    tools: Option<PartialToolsConfig>,
    pipeline: Option<PartialPipelineConfig>,
    output: Option<PartialOutputConfig>,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

/// A disabling CLI flag wins; otherwise the file decides, then the default.
fn merge_switch(cli_disabled: bool, file_val: Option<bool>, default: bool) -> bool {
    if cli_disabled {
        false
    } else {
        file_val.unwrap_or(default)
    }
}

impl PartialSyncConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &SyncArgs) -> Result<SyncConfig> {
        self.apply_set_values(&args.set_values)?;

        let thresholds = self.thresholds.take().unwrap_or_default();
        let scoring = self.scoring.take().unwrap_or_default();
        let tools = self.tools.take().unwrap_or_default();
        let pipeline = self.pipeline.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let defaults = SyncConfig::default();
        let default_scoring = PairwiseScoring::default();

        let mut builder = SyncConfigBuilder::new()
            .scoring(PairwiseScoring {
                match_score: scoring.match_score.unwrap_or(default_scoring.match_score),
                mismatch_score: scoring
                    .mismatch_score
                    .unwrap_or(default_scoring.mismatch_score),
                open_gap_score: scoring
                    .open_gap_score
                    .unwrap_or(default_scoring.open_gap_score),
                extend_gap_score: scoring
                    .extend_gap_score
                    .unwrap_or(default_scoring.extend_gap_score),
            })
            .clean_structures(merge_switch(
                args.no_clean,
                pipeline.clean,
                defaults.clean_structures,
            ))
            .align_sequences(merge_switch(
                args.no_sequence_alignment,
                pipeline.align_sequences,
                defaults.align_sequences,
            ))
            .align_structures(merge_switch(
                args.no_structure_alignment,
                pipeline.align_structures,
                defaults.align_structures,
            ))
            .incorporate_models(args.all_models || pipeline.all_models.unwrap_or(false))
            .keep_temporary(args.keep_temporary || pipeline.keep_temporary.unwrap_or(false))
            .overwrite(args.overwrite || output.overwrite.unwrap_or(false));

        if let Some(value) = thresholds.within_structure {
            builder = builder.within_structure_threshold(value);
        }
        if let Some(value) = thresholds.cross_structure {
            builder = builder.cross_structure_threshold(value);
        }
        if let Some(value) = thresholds.ensemble {
            builder = builder.ensemble_threshold(value);
        }
        if let Some(path) = args.foldx.clone().or(tools.foldx) {
            builder = builder.cleaner_path(path);
        }
        if let Some(path) = args.muscle.clone().or(tools.muscle) {
            builder = builder.sequence_aligner_path(path);
        }
        if let Some(path) = args.lovoalign.clone().or(tools.lovoalign) {
            builder = builder.structure_aligner_path(path);
        }
        if let Some(suffix) = output.suffix {
            builder = builder.output_suffix(suffix);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "thresholds.within-structure" => {
                    self.thresholds.get_or_insert_with(Default::default).within_structure =
                        Some(parse_value(key, value_str)?);
                }
                "thresholds.cross-structure" => {
                    self.thresholds.get_or_insert_with(Default::default).cross_structure =
                        Some(parse_value(key, value_str)?);
                }
                "thresholds.ensemble" => {
                    self.thresholds.get_or_insert_with(Default::default).ensemble =
                        Some(parse_value(key, value_str)?);
                }
                "scoring.match-score" => {
                    self.scoring.get_or_insert_with(Default::default).match_score =
                        Some(parse_value(key, value_str)?);
                }
                "scoring.mismatch-score" => {
                    self.scoring.get_or_insert_with(Default::default).mismatch_score =
                        Some(parse_value(key, value_str)?);
                }
                "scoring.open-gap-score" => {
                    self.scoring.get_or_insert_with(Default::default).open_gap_score =
                        Some(parse_value(key, value_str)?);
                }
                "scoring.extend-gap-score" => {
                    self.scoring.get_or_insert_with(Default::default).extend_gap_score =
                        Some(parse_value(key, value_str)?);
                }
                "pipeline.all-models" => {
                    self.pipeline.get_or_insert_with(Default::default).all_models =
                        Some(parse_value(key, value_str)?);
                }
                "output.suffix" => {
                    self.output.get_or_insert_with(Default::default).suffix =
                        Some(value_str.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;

    fn sync_args(extra: &[&str]) -> SyncArgs {
        let mut args = vec!["ensync", "sync", "-e", "set.csv", "-n", "kinase"];
        args.extend_from_slice(extra);
        let Commands::Sync(args) = Cli::parse_from(args).command;
        args
    }

    #[test]
    fn empty_config_yields_core_defaults() {
        let config = PartialSyncConfig::default()
            .merge_with_cli(&sync_args(&[]))
            .unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn file_values_are_applied_and_cli_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensync.toml");
        fs::write(
            &path,
            r#"
            [thresholds]
            ensemble = 0.8
            cross-structure = 0.9

            [tools]
            muscle = "/opt/muscle5"
            foldx = "/opt/foldx"

            [pipeline]
            clean = true
            all-models = true

            [output]
            suffix = "_sync"
            "#,
        )
        .unwrap();

        let partial = PartialSyncConfig::from_file(&path).unwrap();
        let config = partial
            .merge_with_cli(&sync_args(&["--no-clean", "--muscle", "/usr/bin/muscle"]))
            .unwrap();

        assert_eq!(config.thresholds.ensemble, 0.8);
        assert_eq!(config.thresholds.cross_structure, 0.9);
        assert_eq!(config.thresholds.within_structure, 0.99);
        assert_eq!(config.tools.sequence_aligner, PathBuf::from("/usr/bin/muscle"));
        assert_eq!(config.tools.cleaner, PathBuf::from("/opt/foldx"));
        assert!(!config.clean_structures);
        assert!(config.incorporate_models);
        assert_eq!(config.output_suffix, "_sync");
    }

    #[test]
    fn set_values_override_the_file() {
        let config = PartialSyncConfig::default()
            .merge_with_cli(&sync_args(&[
                "-S",
                "thresholds.ensemble=0.5",
                "-S",
                "scoring.open-gap-score=-1.0",
                "-S",
                "output.suffix=_aligned",
            ]))
            .unwrap();
        assert_eq!(config.thresholds.ensemble, 0.5);
        assert_eq!(config.scoring.open_gap_score, -1.0);
        assert_eq!(config.output_suffix, "_aligned");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for extra in [
            ["-S", "thresholds.ensemble"],
            ["-S", "thresholds.ensemble=high"],
            ["-S", "thresholds.ensemble=1.5"],
            ["-S", "unknown.key=1"],
        ] {
            let result = PartialSyncConfig::default().merge_with_cli(&sync_args(&extra));
            assert!(matches!(result, Err(CliError::Config(_))), "{:?}", extra);
        }
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[thresholds]\nsimilarity = 0.5\n").unwrap();
        assert!(matches!(
            PartialSyncConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
