use std::collections::BTreeSet;
use thiserror::Error;

pub const GAP: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentShapeError {
    #[error("Alignment has no rows")]
    Empty,
    #[error("Alignment row {row} has length {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// How the residues of one fully-occupied alignment column relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConsensus {
    /// Every structure has the same residue type.
    Identical,
    /// The residue set is exactly serine and cysteine.
    SerineCysteine,
    /// Residue types differ, or some structure has a gap.
    Divergent,
}

/// A column-aligned set of sequences, one row per structure in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMatrix {
    rows: Vec<Vec<char>>,
}

impl AlignmentMatrix {
    pub fn new(rows: Vec<Vec<char>>) -> Result<Self, AlignmentShapeError> {
        let expected = rows.first().ok_or(AlignmentShapeError::Empty)?.len();
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(AlignmentShapeError::RaggedRow {
                row,
                expected,
                found,
            });
        }
        Ok(Self { rows })
    }

    pub fn from_strs<S: AsRef<str>>(rows: &[S]) -> Result<Self, AlignmentShapeError> {
        Self::new(
            rows.iter()
                .map(|row| row.as_ref().chars().map(|c| c.to_ascii_uppercase()).collect())
                .collect(),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn row(&self, index: usize) -> &[char] {
        &self.rows[index]
    }

    /// The row with gaps removed.
    pub fn ungapped(&self, index: usize) -> String {
        self.rows[index].iter().filter(|&&c| c != GAP).collect()
    }

    pub fn column(&self, index: usize) -> AlignmentColumn {
        AlignmentColumn {
            index,
            residues: self
                .rows
                .iter()
                .map(|row| Some(row[index]).filter(|&c| c != GAP))
                .collect(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = AlignmentColumn> + '_ {
        (0..self.num_columns()).map(|index| self.column(index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentColumn {
    pub index: usize,
    /// Residue per row; `None` marks a gap.
    pub residues: Vec<Option<char>>,
}

impl AlignmentColumn {
    pub fn shared_fraction(&self) -> f64 {
        if self.residues.is_empty() {
            return 0.0;
        }
        let present = self.residues.iter().filter(|r| r.is_some()).count();
        present as f64 / self.residues.len() as f64
    }

    pub fn is_fully_shared(&self) -> bool {
        self.residues.iter().all(Option::is_some)
    }

    pub fn consensus(&self) -> ColumnConsensus {
        if self.residues.is_empty() || !self.is_fully_shared() {
            return ColumnConsensus::Divergent;
        }
        let types: BTreeSet<char> = self.residues.iter().flatten().copied().collect();
        match types.len() {
            1 => ColumnConsensus::Identical,
            2 if types.contains(&'S') && types.contains(&'C') => ColumnConsensus::SerineCysteine,
            _ => ColumnConsensus::Divergent,
        }
    }

    pub fn identical_aa(&self) -> bool {
        self.consensus() != ColumnConsensus::Divergent
    }
}
