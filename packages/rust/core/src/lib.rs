//! Core pipeline orchestration and domain logic for Veglytics.
//!
//! This crate ties together discovery, extraction, normalization and storage
//! into the `ingest` workflow, and provides the price analytics served by the
//! query commands.

pub mod analytics;
pub mod assembler;
pub mod pipeline;
pub mod queries;
