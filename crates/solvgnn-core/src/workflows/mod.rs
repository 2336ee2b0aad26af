//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Evaluation** ([`evaluate`]) - Solvation energies of a batch of molecules, with forces
//!   and lambda derivatives recovered from one reverse-mode pass, plus a Born radius
//!   diagnostic.
//!
//! Workflows validate inputs, prepare differentiable variables on the model's device, run the
//! model and convert tensors back to plain numbers.

pub mod evaluate;
