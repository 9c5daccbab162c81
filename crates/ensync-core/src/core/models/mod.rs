//! # Core Models Module
//!
//! Plain value types describing protein structures as they move through the
//! synchronization pipeline.
//!
//! ## Overview
//!
//! A structure is an ordered table of atom rows ([`structure::StructureRecord`]).
//! Chain sequences, residue keys and chain label sets are derived views over
//! those rows, so every stage can build a new record without maintaining
//! secondary indices.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom rows, record classes and per-residue annotations
//! - [`residue`] - Amino acid codes and residue keys
//! - [`structure`] - Structure records and chain sequences
//! - [`assembly`] - Merging of multi-model files into a single model

pub mod assembly;
pub mod atom;
pub mod residue;
pub mod structure;
