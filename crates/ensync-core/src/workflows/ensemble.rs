use crate::core::io::residue_table::ResidueTable;
use crate::core::models::structure::StructureRecord;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

const NAME_COLUMN: &str = "NAME";
const PDB_COLUMN: &str = "PDB";

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Cannot read ensemble descriptor '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed ensemble descriptor: {0}")]
    Csv(#[from] csv::Error),
    #[error("Ensemble descriptor has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("Structure file '{}' is listed more than once", .0.display())]
    DuplicateFile(PathBuf),
    #[error("Structure name '{0}' is used more than once")]
    DuplicateName(String),
    #[error("Row {row} has an empty '{column}' value")]
    EmptyValue { row: usize, column: &'static str },
    #[error("Ensemble descriptor lists no structures")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct DescriptorRow {
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "PDB")]
    pdb: String,
}

/// One named structure of an ensemble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleMember {
    pub name: String,
    pub path: PathBuf,
}

/// The structures making up an ensemble, as listed in a CSV descriptor.
///
/// The descriptor needs a `NAME` and a `PDB` column; other columns are
/// ignored. Relative `PDB` paths are resolved against the descriptor's
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleDescriptor {
    members: Vec<EnsembleMember>,
}

impl EnsembleDescriptor {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EnsembleError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EnsembleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_reader(file, base)
    }

    pub fn from_reader(reader: impl Read, base_dir: &Path) -> Result<Self, EnsembleError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in [NAME_COLUMN, PDB_COLUMN] {
            if !headers.iter().any(|h| h == column) {
                return Err(EnsembleError::MissingColumn(column));
            }
        }

        let mut members = Vec::new();
        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for (index, row) in csv_reader.deserialize::<DescriptorRow>().enumerate() {
            let row = row?;
            let line = index + 2;
            if row.name.is_empty() {
                return Err(EnsembleError::EmptyValue {
                    row: line,
                    column: NAME_COLUMN,
                });
            }
            if row.pdb.is_empty() {
                return Err(EnsembleError::EmptyValue {
                    row: line,
                    column: PDB_COLUMN,
                });
            }

            let path = base_dir.join(&row.pdb);
            if !names.insert(row.name.clone()) {
                return Err(EnsembleError::DuplicateName(row.name));
            }
            if !paths.insert(path.clone()) {
                return Err(EnsembleError::DuplicateFile(path));
            }
            members.push(EnsembleMember {
                name: row.name,
                path,
            });
        }

        if members.is_empty() {
            return Err(EnsembleError::Empty);
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }

    /// The descriptor name of the structure loaded from `path`.
    pub fn name_for(&self, path: &Path) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.path == path)
            .map(|m| m.name.as_str())
    }

    /// Builds the per-residue table of synchronized structures, one column per member.
    ///
    /// `structures` carry the identifiers assigned at load time, the display
    /// form of each member's path. Structures that are not members are skipped.
    pub fn residue_table(&self, structures: &[StructureRecord]) -> ResidueTable {
        let named: Vec<(&str, &StructureRecord)> = structures
            .iter()
            .filter_map(|structure| {
                self.members
                    .iter()
                    .find(|m| m.path.display().to_string() == structure.id())
                    .map(|m| (m.name.as_str(), structure))
            })
            .collect();
        ResidueTable::from_structures(&named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chains::test_support::build_structure;

    #[test]
    fn reads_members_and_resolves_paths() {
        let csv = "NAME,PDB,NOTE\nopen, 1abc.pdb ,apo\nclosed,/data/2xyz.pdb,holo\n";
        let descriptor = EnsembleDescriptor::from_reader(csv.as_bytes(), Path::new("runs")).unwrap();

        assert_eq!(descriptor.members().len(), 2);
        assert_eq!(descriptor.members()[0].name, "open");
        assert_eq!(descriptor.members()[0].path, Path::new("runs/1abc.pdb"));
        assert_eq!(descriptor.paths()[1], PathBuf::from("/data/2xyz.pdb"));
        assert_eq!(descriptor.name_for(Path::new("/data/2xyz.pdb")), Some("closed"));
        assert_eq!(descriptor.name_for(Path::new("missing.pdb")), None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let result = EnsembleDescriptor::from_reader("NAME,FILE\na,a.pdb\n".as_bytes(), Path::new(""));
        assert!(matches!(result, Err(EnsembleError::MissingColumn("PDB"))));
    }

    #[test]
    fn duplicates_and_empty_descriptors_are_rejected() {
        let base = Path::new("");
        assert!(matches!(
            EnsembleDescriptor::from_reader("NAME,PDB\na,x.pdb\nb,x.pdb\n".as_bytes(), base),
            Err(EnsembleError::DuplicateFile(_))
        ));
        assert!(matches!(
            EnsembleDescriptor::from_reader("NAME,PDB\na,x.pdb\na,y.pdb\n".as_bytes(), base),
            Err(EnsembleError::DuplicateName(name)) if name == "a"
        ));
        assert!(matches!(
            EnsembleDescriptor::from_reader("NAME,PDB\n".as_bytes(), base),
            Err(EnsembleError::Empty)
        ));
        assert!(matches!(
            EnsembleDescriptor::from_reader("NAME,PDB\na,\n".as_bytes(), base),
            Err(EnsembleError::EmptyValue { row: 2, column: "PDB" })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EnsembleDescriptor::from_path(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(EnsembleError::Io { .. })));
    }

    #[test]
    fn residue_table_uses_member_names() {
        let descriptor =
            EnsembleDescriptor::from_reader("NAME,PDB\nfirst,a.pdb\nsecond,b.pdb\n".as_bytes(), Path::new(""))
                .unwrap();
        let structures = vec![
            build_structure("a.pdb", &[('A', "MKT")]),
            build_structure("b.pdb", &[('A', "MKS")]),
            build_structure("stray.pdb", &[('A', "MKT")]),
        ];
        let table = descriptor.residue_table(&structures);
        assert_eq!(table.columns(), &["first".to_string(), "second".to_string()]);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.rows()[2].residues, vec!["THR".to_string(), "SER".to_string()]);
    }
}
