//! # Core Module
//!
//! Stateless building blocks for synchronizing protein structure ensembles.
//!
//! ## Overview
//!
//! The core module holds the data types every pipeline stage exchanges and
//! the algorithms that need no external programs: parsing and writing
//! structures, scoring sequence similarity, classifying alignment columns and
//! fitting rigid-body superpositions.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atom rows, residue codes, structure records
//! - **File I/O** ([`io`]) - PDB and FASTA formats, combined residue tables
//! - **Sequence Alignment** ([`align`]) - Pairwise scoring and multiple-alignment columns
//! - **Utilities** ([`utils`]) - Rigid-body geometry and output naming

pub mod align;
pub mod io;
pub mod models;
pub mod utils;
