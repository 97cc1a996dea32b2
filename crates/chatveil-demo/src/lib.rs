//! Chatveil demo
//!
//! A clap-driven binary that stands up the full pipeline against the
//! simulated host page: scripted chat traffic flows in, the engine veils
//! and classifies it, and the persisted history can be inspected
//! afterwards.

pub mod cli;
pub mod feed;
