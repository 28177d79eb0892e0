//! Bulletin - search and personalized feed orchestration
//!
//! Coordinates the QA/recommendation service and the record store, merges
//! their results by id and publishes race-free view models for presentation.

pub mod app_state;
pub mod clients;
pub mod config;
pub mod error;
pub mod merge;
pub mod orchestrator;
