//! Core engine: the scan pipeline and what runs around it.

pub mod evaluator;
pub mod notifier;
pub mod scanner;
pub mod service;

pub use scanner::DealScanner;
pub use service::ScanService;
