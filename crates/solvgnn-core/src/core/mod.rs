//! # Core Module
//!
//! Stateless building blocks of the solvation model.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atom records, GB parameter rows, batched atom
//!   sets and per-molecule lambda factors
//! - **Graphs** ([`graph`]) - Radius neighbor graphs, spatial hashing and radial basis features
//! - **Physics** ([`forcefield`]) - Closed-form GBn2 integrals and energies, element parameters
//!   and neck integral tables
//!
//! Nothing in this module tracks gradients. The differentiable versions of the same formulas
//! live in [`crate::engine`] and are tested against the scalar functions defined here.

pub mod forcefield;
pub mod graph;
pub mod models;
