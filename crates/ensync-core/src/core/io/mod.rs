//! Provides input/output functionality for structure and sequence files.
//!
//! This module contains the fixed-column PDB reader and writer behind a
//! trait-based interface, multi-FASTA support used to talk to external
//! sequence aligners, and the combined per-residue CSV table written for a
//! synchronized ensemble.

pub mod fasta;
pub mod pdb;
pub mod residue_table;
pub mod traits;
