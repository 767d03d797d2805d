//! Bank statement reconciliation service
//!
//! This library provides the core of the statement-recon system: it turns a
//! monthly bank statement into typed transaction records, matches them against
//! paid expenses, and exposes manual review actions over a JSON API. Parsing
//! runs as a persisted background job so uploads return immediately.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
