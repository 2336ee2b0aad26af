//! # Graph Module
//!
//! Geometry-derived inputs of the message-passing layers.
//!
//! - [`neighbor`] - Directed radius graphs with a per-target neighbor cap
//! - [`spatial`] - Uniform grid hashing used by the cell-list neighbor search
//! - [`rbf`] - Compact-support radial basis encoding of edge distances
//!
//! Graph topology is computed from plain coordinates and is piecewise constant in the
//! positions; only the distances along its edges are differentiated later.

pub mod neighbor;
pub mod rbf;
pub(crate) mod spatial;
