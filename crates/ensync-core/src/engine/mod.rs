//! # Engine Module
//!
//! The stages of ensemble synchronization and the configuration, error and
//! progress types shared between them.
//!
//! ## Overview
//!
//! Each stage consumes structure records and returns new ones: chains are
//! grouped within a structure, matched across the ensemble and relabeled,
//! residues are renumbered from a multiple alignment, and coordinates are moved
//! into a common frame. Work that needs a third-party program goes through the
//! traits in [`external`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Thresholds, tool paths and pipeline switches
//! - **State Tracking** ([`state`]) - The ordered stages of a run
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Fatal errors and per-structure exclusions
//! - **Chain Identity** ([`chains`], [`matching`], [`similarity`]) - Grouping, matching and gating
//! - **Residue Numbering** ([`unify`]) - Shared and structure-specific numbering
//! - **Coordinate Frame** ([`superposition`]) - Alignment chain selection
//! - **External Programs** ([`external`]) - Cleanup, multiple alignment and superposition

pub mod chains;
pub mod config;
pub mod error;
pub mod external;
pub mod matching;
pub mod progress;
pub mod similarity;
pub mod state;
pub mod superposition;
pub mod unify;
