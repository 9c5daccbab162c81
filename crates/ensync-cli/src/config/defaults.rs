use std::path::{Path, PathBuf};

/// Appended to the ensemble name for the combined per-residue table.
pub const RESIDUE_TABLE_SUFFIX: &str = "_residues.csv";

/// The output directory used when `--output` is not given.
pub fn output_dir(name: &str) -> PathBuf {
    PathBuf::from(name)
}

pub fn residue_table_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}{}", name, RESIDUE_TABLE_SUFFIX))
}
