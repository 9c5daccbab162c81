use crate::core::models::structure::StructureRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResidueTableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueRow {
    pub chain: char,
    pub residue_number: isize,
    /// Residue name per structure, in column order.
    pub residues: Vec<String>,
}

/// A combined per-residue table across a synchronized ensemble.
///
/// Rows cover the residues every structure shares after unification: protein
/// residues with a positive number. Each structure contributes one column
/// holding its residue name at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueTable {
    columns: Vec<String>,
    rows: Vec<ResidueRow>,
}

impl ResidueTable {
    pub fn from_structures(structures: &[(&str, &StructureRecord)]) -> Self {
        let columns = structures.iter().map(|(name, _)| name.to_string()).collect();

        let per_structure: Vec<BTreeMap<(char, isize), String>> = structures
            .iter()
            .map(|(_, structure)| {
                structure
                    .atoms()
                    .iter()
                    .filter(|atom| atom.is_alpha_carbon() && atom.residue_number > 0)
                    .map(|atom| {
                        (
                            (atom.chain, atom.residue_number),
                            atom.residue_name.clone(),
                        )
                    })
                    .collect()
            })
            .collect();

        let shared: BTreeSet<(char, isize)> = match per_structure.split_first() {
            Some((first, rest)) => first
                .keys()
                .filter(|key| rest.iter().all(|other| other.contains_key(*key)))
                .copied()
                .collect(),
            None => BTreeSet::new(),
        };

        let rows = shared
            .into_iter()
            .map(|key| ResidueRow {
                chain: key.0,
                residue_number: key.1,
                residues: per_structure
                    .iter()
                    .map(|residues| residues.get(&key).cloned().unwrap_or_default())
                    .collect(),
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResidueRow] {
        &self.rows
    }

    pub fn write_csv(&self, writer: impl Write) -> Result<(), ResidueTableError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["chain".to_string(), "residue_number".to_string()];
        header.extend(self.columns.iter().cloned());
        csv_writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.chain.to_string(), row.residue_number.to_string()];
            record.extend(row.residues.iter().cloned());
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ResidueTableError> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))
    }
}
