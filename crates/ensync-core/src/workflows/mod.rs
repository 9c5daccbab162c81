//! # Workflows Module
//!
//! High-level entry points that run a complete ensemble synchronization.
//!
//! ## Overview
//!
//! Workflows tie the [`crate::core`] models and the [`crate::engine`] stages
//! together. They validate inputs before any external program runs, load and
//! filter structures, drive every stage in order and write the synchronized
//! ensemble to disk.
//!
//! ## Architecture
//!
//! - **Synchronization Workflow** ([`sync`]) - Loading, cleanup, chain matching,
//!   residue renumbering, superposition and output writing.
//! - **Ensemble Descriptor** ([`ensemble`]) - The `NAME`/`PDB` CSV listing the
//!   members of an ensemble, and the per-residue table keyed by those names.

pub mod ensemble;
pub mod sync;
