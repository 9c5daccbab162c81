use super::atom::AtomRecord;
use super::residue::{ResidueKey, one_letter_code};
use std::collections::{HashMap, HashSet};

/// The one-letter sequence of a single chain together with the residues it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSequence {
    pub chain: char,
    pub sequence: String,
    /// Residues in sequence order; `residues[i]` produced `sequence[i]`.
    pub residues: Vec<ResidueKey>,
}

impl ChainSequence {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// An ordered table of atom rows read from one structure file.
///
/// The identifier is the source the rows came from and is carried unchanged
/// through every transformation. Derived views (chain labels, sequences) are
/// computed on demand from the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureRecord {
    id: String,
    atoms: Vec<AtomRecord>,
}

impl StructureRecord {
    pub fn new(id: impl Into<String>, atoms: Vec<AtomRecord>) -> Self {
        Self {
            id: id.into(),
            atoms,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn atoms(&self) -> &[AtomRecord] {
        &self.atoms
    }

    pub fn into_atoms(self) -> Vec<AtomRecord> {
        self.atoms
    }

    /// Builds a record with the same identity and a new set of rows.
    pub fn with_atoms(&self, atoms: Vec<AtomRecord>) -> Self {
        Self {
            id: self.id.clone(),
            atoms,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Every chain label present, in order of first encounter.
    pub fn chain_labels(&self) -> Vec<char> {
        let mut seen = HashSet::new();
        self.atoms
            .iter()
            .filter(|atom| seen.insert(atom.chain))
            .map(|atom| atom.chain)
            .collect()
    }

    /// Distinct model indices, in order of first encounter.
    pub fn models(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.atoms
            .iter()
            .filter(|atom| seen.insert(atom.model))
            .map(|atom| atom.model)
            .collect()
    }

    /// Per-chain sequences built from alpha-carbon rows, in chain encounter order.
    ///
    /// Each residue contributes once, keyed by chain, number and insertion code,
    /// so alternate conformers and duplicated rows do not lengthen a sequence.
    pub fn chain_sequences(&self) -> Vec<ChainSequence> {
        let mut order: Vec<char> = Vec::new();
        let mut by_chain: HashMap<char, ChainSequence> = HashMap::new();
        let mut seen: HashSet<ResidueKey> = HashSet::new();

        for atom in self.atoms.iter().filter(|atom| atom.is_alpha_carbon()) {
            let key = atom.residue_key();
            if !seen.insert(key) {
                continue;
            }
            let entry = by_chain.entry(atom.chain).or_insert_with(|| {
                order.push(atom.chain);
                ChainSequence {
                    chain: atom.chain,
                    sequence: String::new(),
                    residues: Vec::new(),
                }
            });
            entry.sequence.push(one_letter_code(&atom.residue_name));
            entry.residues.push(key);
        }

        order
            .into_iter()
            .filter_map(|chain| by_chain.remove(&chain))
            .collect()
    }

    pub fn chain_sequence(&self, chain: char) -> Option<ChainSequence> {
        self.chain_sequences()
            .into_iter()
            .find(|sequence| sequence.chain == chain)
    }

    /// Returns a copy with every row of chain `from` moved to chain `to`.
    pub fn rename_chain(&self, from: char, to: char) -> Self {
        let atoms = self
            .atoms
            .iter()
            .map(|atom| {
                let mut atom = atom.clone();
                if atom.chain == from {
                    atom.chain = to;
                }
                atom
            })
            .collect();
        self.with_atoms(atoms)
    }
}
