//! Core pipeline for building the plugin master catalog.
//!
//! This crate ties together manifest collection, provenance-based
//! enrichment, and catalog writing into one run (see [`pipeline::build_catalog`]).

pub mod catalog;
pub mod collector;
pub mod enrichment;
pub mod pipeline;
pub mod provenance;
