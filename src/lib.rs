//! marketbot — regional hull deal scanner.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod universe;
pub mod catalog;
pub mod market;
pub mod engine;
pub mod report;
pub mod dashboard;
