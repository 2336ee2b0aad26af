//! # Engine Module
//!
//! Differentiable evaluation of learned and physical GBn2 solvation models.
//!
//! ## Overview
//!
//! The engine turns a prepared batch ([`model::ForwardInputs`]) into per-atom energies as
//! `candle` tensors. Every stage is built from differentiable tensor operations on the
//! position and lambda tensors, so a single backward pass over the summed energy yields both
//! forces and lambda derivatives.
//!
//! ## Pipeline
//!
//! 1. [`gb`] - GBn2 descreening integral on the long-range graph, giving Born radii
//! 2. [`correction`] - Two [`interaction`] layers on the short-range graph predicting a
//!    bounded Born radius correction and a surface-area scale
//! 3. [`lambda_scale`] - Learned gating of the alchemical lambdas
//! 4. [`energy`] - GB polarization and surface-area energies
//!
//! [`model::SolvationModel`] chains all four; [`model::GbNeckModel`] runs the GBn2 stages
//! alone and serves as the physical reference.
//!
//! ## Supporting Modules
//!
//! - [`config`] - Model hyperparameters with TOML loading and validation
//! - [`geometry`] - Graph edges prepared for gather/scatter message passing
//! - [`error`] - The engine error type

pub mod config;
pub mod correction;
pub mod energy;
pub mod error;
pub mod gb;
pub mod geometry;
pub mod interaction;
pub mod lambda_scale;
pub mod model;
