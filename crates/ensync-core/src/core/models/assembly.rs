use super::structure::StructureRecord;
use std::collections::HashMap;
use thiserror::Error;

const CHAIN_LABEL_POOL: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Ran out of chain labels while merging model {model} ({required} chains needed)")]
    LabelsExhausted { model: usize, required: usize },
}

/// Keeps only the rows of the first model in the file.
pub fn first_model(structure: &StructureRecord) -> StructureRecord {
    let Some(&first) = structure.models().first() else {
        return structure.clone();
    };
    let atoms = structure
        .atoms()
        .iter()
        .filter(|atom| atom.model == first)
        .cloned()
        .map(|mut atom| {
            atom.model = 1;
            atom
        })
        .collect();
    structure.with_atoms(atoms)
}

/// Collapses every model into one, giving each model's chains distinct labels.
///
/// Models are visited in file order. A chain keeps its label if no earlier chain
/// already claimed it; otherwise it takes the first unclaimed label of the pool
/// `A-Z`, `a-z`, `0-9`.
pub fn incorporate_models(structure: &StructureRecord) -> Result<StructureRecord, AssemblyError> {
    let models = structure.models();
    if models.len() <= 1 {
        return Ok(first_model(structure));
    }

    let mut available: Vec<char> = CHAIN_LABEL_POOL.chars().collect();
    let mut assignments: HashMap<(usize, char), char> = HashMap::new();

    for &model in &models {
        let mut labels = Vec::new();
        for atom in structure.atoms().iter().filter(|atom| atom.model == model) {
            if !labels.contains(&atom.chain) {
                labels.push(atom.chain);
            }
        }
        for label in labels {
            let assigned = if let Some(pos) = available.iter().position(|&c| c == label) {
                available.remove(pos)
            } else if !available.is_empty() {
                available.remove(0)
            } else {
                return Err(AssemblyError::LabelsExhausted {
                    model,
                    required: assignments.len() + 1,
                });
            };
            assignments.insert((model, label), assigned);
        }
    }

    let atoms = structure
        .atoms()
        .iter()
        .cloned()
        .map(|mut atom| {
            if let Some(&label) = assignments.get(&(atom.model, atom.chain)) {
                atom.chain = label;
            }
            atom.model = 1;
            atom
        })
        .collect();
    Ok(structure.with_atoms(atoms))
}
