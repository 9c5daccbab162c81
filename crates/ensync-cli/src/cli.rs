use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "EnSync CLI - Synchronizes chain labels, residue numbering and coordinate frames across an ensemble of protein structures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize the structures listed in an ensemble descriptor.
    Sync(SyncArgs),
}

/// Arguments for the `sync` subcommand.
#[derive(Args, Debug)]
pub struct SyncArgs {
    // --- Core Arguments ---
    /// CSV file listing the ensemble, with `NAME` and `PDB` columns.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ensemble: PathBuf,

    /// Name of the ensemble, used for the residue table file.
    #[arg(short, long, required = true, value_name = "NAME")]
    pub name: String,

    /// Output directory. Defaults to a directory named after the ensemble.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Tool Overrides ---
    /// Path to the MUSCLE executable.
    #[arg(long, value_name = "PATH")]
    pub muscle: Option<PathBuf>,

    /// Path to the LovoAlign executable.
    #[arg(long, value_name = "PATH")]
    pub lovoalign: Option<PathBuf>,

    /// Path to the FoldX executable.
    #[arg(long, value_name = "PATH")]
    pub foldx: Option<PathBuf>,

    // --- Pipeline Overrides ---
    /// Skip structure cleanup with FoldX.
    #[arg(long)]
    pub no_clean: bool,

    /// Skip multiple sequence alignment and residue renumbering.
    #[arg(long)]
    pub no_sequence_alignment: bool,

    /// Skip structural superposition.
    #[arg(long)]
    pub no_structure_alignment: bool,

    /// Merge every MODEL of a file into one structure instead of keeping the first.
    #[arg(long)]
    pub all_models: bool,

    /// Keep the temporary directories used by external tools.
    #[arg(long)]
    pub keep_temporary: bool,

    /// Replace the output directory if it already exists.
    #[arg(long)]
    pub overwrite: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S thresholds.ensemble=0.85
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_sync_invocation() {
        let cli = Cli::parse_from(["ensync", "sync", "--ensemble", "set.csv", "--name", "kinase"]);
        let Commands::Sync(args) = cli.command;
        assert_eq!(args.ensemble, PathBuf::from("set.csv"));
        assert_eq!(args.name, "kinase");
        assert!(args.output.is_none());
        assert!(!args.no_clean);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_overrides_and_global_flags() {
        let cli = Cli::parse_from([
            "ensync",
            "sync",
            "-e",
            "set.csv",
            "-n",
            "kinase",
            "-vv",
            "--no-clean",
            "--muscle",
            "/opt/muscle",
            "-S",
            "thresholds.ensemble=0.8",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Sync(args) = cli.command;
        assert!(args.no_clean);
        assert_eq!(args.muscle, Some(PathBuf::from("/opt/muscle")));
        assert_eq!(args.set_values, vec!["thresholds.ensemble=0.8".to_string()]);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["ensync", "-q", "-v", "sync", "-e", "a.csv", "-n", "x"]);
        assert!(result.is_err());
    }
}
