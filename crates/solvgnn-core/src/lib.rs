//! # solvgnn Core Library
//!
//! Implicit-solvent energies and forces for small molecules and peptides, computed by a
//! generalized-Born (GBn2) continuum model whose Born radii are refined by a learned
//! message-passing correction network.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Plain data models (`AtomSet`, `LambdaFactors`), neighbor
//!   graphs and radial basis features, and the closed-form GBn2 physics (`potentials`,
//!   parameter assignment, neck tables).
//!
//! - **[`engine`]: The Numerical Core.** Differentiable tensor layers built on `candle`:
//!   GB aggregation, the interaction (message-passing) layers of the correction network,
//!   the lambda scale networks and the energy evaluator, assembled into `SolvationModel`
//!   and the physics-only `GbNeckModel`.
//!
//! - **[`workflows`]: The Public API.** A single `evaluate` entry point that validates the
//!   inputs, runs one forward pass, differentiates it once and returns per-molecule energies,
//!   per-atom forces and optionally the lambda derivatives.

pub mod core;
pub mod engine;
pub mod workflows;
