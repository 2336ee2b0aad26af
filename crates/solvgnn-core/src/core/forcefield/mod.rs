//! # Force Field Module
//!
//! Physical ingredients of the GBn2 implicit-solvent model.
//!
//! - [`potentials`] - Scalar GBn2 integrals, Born radii and energy terms, with their constants
//! - [`params`] - Neck integral tables loaded from CSV
//! - [`parameterization`] - Element-based assignment of per-atom GBn2 parameter rows
//!
//! The engine evaluates the same expressions on tensors so that they can be differentiated;
//! the scalar forms here are the reference those tensor expressions are tested against.

pub mod parameterization;
pub mod params;
pub mod potentials;
