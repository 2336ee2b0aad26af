//! # Molecular Models Module
//!
//! Input records consumed by the solvation model.
//!
//! - [`atom`] - Per-atom records and the fixed-width GBn2 parameter row
//! - [`system`] - Validated, optionally batched atom sets and the input error type
//! - [`lambda`] - Per-molecule alchemical interpolation factors
//!
//! An [`system::AtomSet`] may hold several independent molecules distinguished by batch id.
//! Batch ids must be dense (`0..molecule_count`), and every molecule needs exactly one
//! [`lambda::LambdaFactors`] entry.

pub mod atom;
pub mod lambda;
pub mod system;
