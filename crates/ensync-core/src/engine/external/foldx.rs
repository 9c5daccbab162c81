use super::StructureCleaner;
use super::process::{ToolCommand, ToolError, Workspace, run};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::{StructureFile, WriteOptions};
use crate::core::models::assembly::first_model;
use crate::core::models::atom::AtomClass;
use crate::core::models::structure::StructureRecord;
use std::path::PathBuf;

const TOOL_NAME: &str = "foldx";
const INPUT_FILE: &str = "input.pdb";
const OUTPUT_FILE: &str = "PF_input.fxout";

/// FoldX-compatible structure cleaner that rebuilds incomplete side chains.
///
/// The program drops hetero atoms, so the input's `HETATM` rows are appended
/// to the cleaned protein.
pub struct FoldxCleaner {
    binary: PathBuf,
    keep_temporary: bool,
}

impl FoldxCleaner {
    pub fn new(binary: PathBuf, keep_temporary: bool) -> Self {
        Self {
            binary,
            keep_temporary,
        }
    }
}

fn merge_hetero_rows(original: &StructureRecord, cleaned: &StructureRecord) -> StructureRecord {
    let mut atoms: Vec<_> = first_model(cleaned)
        .into_atoms()
        .into_iter()
        .filter(|atom| atom.class == AtomClass::Atom)
        .collect();
    atoms.extend(
        original
            .atoms()
            .iter()
            .filter(|atom| atom.class == AtomClass::Hetatm)
            .cloned(),
    );
    original.with_atoms(atoms)
}

impl StructureCleaner for FoldxCleaner {
    fn clean(&self, structure: &StructureRecord) -> Result<StructureRecord, ToolError> {
        let workspace = Workspace::new("ensync-foldx-", self.keep_temporary)?;
        let options = WriteOptions {
            overwrite: true,
            ..WriteOptions::default()
        };
        PdbFile::write_to_path(structure, &options, workspace.path().join(INPUT_FILE)).map_err(
            |e| ToolError::MalformedOutput {
                tool: TOOL_NAME.to_string(),
                message: format!("could not stage '{}': {}", structure.id(), e),
            },
        )?;

        let command = ToolCommand::new(&self.binary).args([
            "-c",
            "PDBFile",
            "--fixSideChains",
            "1",
            "--pdb",
            INPUT_FILE,
        ]);
        run(&command, workspace.path())?;

        let output_path = workspace.path().join(OUTPUT_FILE);
        if !output_path.exists() {
            return Err(ToolError::MissingOutput {
                tool: TOOL_NAME.to_string(),
                path: output_path,
            });
        }
        let cleaned =
            PdbFile::read_from_path(&output_path).map_err(|e| ToolError::MalformedOutput {
                tool: TOOL_NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(merge_hetero_rows(structure, &cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomRecord;
    use nalgebra::Point3;

    fn sample() -> StructureRecord {
        StructureRecord::new(
            "in.pdb",
            vec![
                AtomRecord::new(AtomClass::Atom, "CA", "SER", 'A', 1, Point3::origin()),
                AtomRecord::new(AtomClass::Hetatm, "ZN", "ZN", 'A', 101, Point3::origin()),
            ],
        )
    }

    #[test]
    fn hetero_rows_of_the_input_are_restored() {
        let original = sample();
        let cleaned = StructureRecord::new(
            "PF_input.fxout",
            vec![
                AtomRecord::new(AtomClass::Atom, "CA", "SER", 'A', 1, Point3::origin()),
                AtomRecord::new(AtomClass::Atom, "OG", "SER", 'A', 1, Point3::origin()),
            ],
        );
        let merged = merge_hetero_rows(&original, &cleaned);
        assert_eq!(merged.id(), "in.pdb");
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.atoms()[2].name, "ZN");
    }

    #[cfg(unix)]
    #[test]
    fn cleans_through_external_program() {
        use crate::engine::external::process::test_support::write_script;

        let bin = tempfile::tempdir().unwrap();
        let script = write_script(bin.path(), "foldx", "grep '^ATOM' input.pdb > PF_input.fxout");
        let cleaner = FoldxCleaner::new(script, false);

        let cleaned = cleaner.clean(&sample()).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.atoms()[1].class, AtomClass::Hetatm);
    }

    #[cfg(unix)]
    #[test]
    fn missing_output_file_is_reported() {
        use crate::engine::external::process::test_support::write_script;

        let bin = tempfile::tempdir().unwrap();
        let script = write_script(bin.path(), "foldx", "exit 0");
        let cleaner = FoldxCleaner::new(script, false);
        assert!(matches!(
            cleaner.clean(&sample()),
            Err(ToolError::MissingOutput { .. })
        ));
    }
}
