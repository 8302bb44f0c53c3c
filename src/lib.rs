//! Polling ingestion of Vélib station availability into a relational store.
//!
//! Each tick fetches one feed snapshot, splits it into a station dimension
//! and an availability fact, and writes both idempotently.

pub mod config;
pub mod connect;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod transform;
