use crate::core::models::structure::StructureRecord;

/// Picks the shared chain with the largest mean residue count across structures.
///
/// Ties keep the earlier chain. Returns `None` if `shared_chains` is empty.
pub fn select_alignment_chain(structures: &[StructureRecord], shared_chains: &[char]) -> Option<char> {
    if structures.is_empty() {
        return shared_chains.first().copied();
    }
    let mut best: Option<(char, f64)> = None;
    for &chain in shared_chains {
        let total: usize = structures
            .iter()
            .map(|s| s.chain_sequence(chain).map_or(0, |seq| seq.len()))
            .sum();
        let mean = total as f64 / structures.len() as f64;
        if best.is_none_or(|(_, current)| mean > current) {
            best = Some((chain, mean));
        }
    }
    best.map(|(chain, _)| chain)
}
