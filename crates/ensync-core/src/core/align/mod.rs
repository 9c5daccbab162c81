//! Sequence alignment primitives.
//!
//! [`pairwise`] scores two sequences in-process and drives chain grouping,
//! cross-structure matching and the ensemble similarity gate. [`msa`] holds
//! the column-aligned output of an external multiple aligner and classifies
//! its columns.

pub mod msa;
pub mod pairwise;
