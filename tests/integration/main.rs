//! End-to-end tests: graph snapshot → region discovery → market queries →
//! ranked deals, against in-memory and SQLite market backends.

mod mock_market;
mod pipeline;
