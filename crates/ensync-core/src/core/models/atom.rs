use super::residue::ResidueKey;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The record class an atom row was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomClass {
    /// Polymer atom (`ATOM` record).
    Atom,
    /// Ligand, ion or solvent atom (`HETATM` record).
    Hetatm,
}

impl AtomClass {
    pub fn record_name(&self) -> &'static str {
        match self {
            AtomClass::Atom => "ATOM",
            AtomClass::Hetatm => "HETATM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown atom record class: '{0}'")]
pub struct ParseAtomClassError(pub String);

impl FromStr for AtomClass {
    type Err = ParseAtomClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ATOM" => Ok(AtomClass::Atom),
            "HETATM" => Ok(AtomClass::Hetatm),
            other => Err(ParseAtomClassError(other.to_string())),
        }
    }
}

impl fmt::Display for AtomClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_name())
    }
}

/// Per-residue bookkeeping produced by residue-number unification.
///
/// Every atom of a unified residue carries the same annotation. Writers encode
/// it into the occupancy (`identical_aa`) and temperature factor
/// (`shared_fraction`) columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidueAnnotation {
    /// Fraction of ensemble members that have a residue at this alignment column.
    pub shared_fraction: f64,
    /// Whether the column is present in every member with a single residue type.
    pub identical_aa: bool,
}

impl ResidueAnnotation {
    pub fn fully_shared() -> Self {
        Self {
            shared_fraction: 1.0,
            identical_aa: true,
        }
    }
}

/// A single atom row of a structure.
///
/// Rows are plain values: pipeline stages build new rows instead of editing
/// shared ones, so a row always describes one consistent state of the atom.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Serial number as read from the source file (renumbered on write).
    pub serial: usize,
    /// One-based model index the row belongs to.
    pub model: usize,
    pub class: AtomClass,
    /// Atom name (e.g., "CA", "OG").
    pub name: String,
    /// Three-letter residue name (e.g., "SER").
    pub residue_name: String,
    pub chain: char,
    pub residue_number: isize,
    pub insertion_code: Option<char>,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub temperature_factor: f64,
    /// Element symbol; derived from the atom name when the file leaves it blank.
    pub element: String,
    pub annotation: Option<ResidueAnnotation>,
}

impl AtomRecord {
    pub fn new(
        class: AtomClass,
        name: &str,
        residue_name: &str,
        chain: char,
        residue_number: isize,
        position: Point3<f64>,
    ) -> Self {
        Self {
            serial: 0,
            model: 1,
            class,
            name: name.to_string(),
            residue_name: residue_name.to_string(),
            chain,
            residue_number,
            insertion_code: None,
            position,
            occupancy: 1.0,
            temperature_factor: 0.0,
            element: element_from_name(name),
            annotation: None,
        }
    }

    pub fn residue_key(&self) -> ResidueKey {
        ResidueKey::new(self.chain, self.residue_number, self.insertion_code)
    }

    pub fn is_protein(&self) -> bool {
        self.class == AtomClass::Atom
    }

    pub fn is_alpha_carbon(&self) -> bool {
        self.class == AtomClass::Atom && self.name == "CA"
    }
}

/// Guesses an element symbol from an atom name by taking its leading letter.
pub fn element_from_name(name: &str) -> String {
    name.trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}
