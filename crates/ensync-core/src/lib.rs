//! # EnSync Core Library
//!
//! Synchronizes ensembles of protein structures of the same system so that
//! they share chain labels, residue numbering and a coordinate frame.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`StructureRecord`,
//!   `AtomRecord`), PDB and FASTA I/O, pairwise and multiple sequence alignment
//!   primitives, and geometry helpers.
//!
//! - **[`engine`]: The Logic Core.** The synchronization stages themselves:
//!   chain grouping, cross-structure matching, the similarity gate, residue
//!   number unification, and the wrappers around external cleanup and
//!   alignment programs.
//!
//! - **[`workflows`]: The Public API.** Runs the stages in order on a list of
//!   structure files and writes the synchronized ensemble.

pub mod core;
pub mod engine;
pub mod workflows;
