//! Snaplink - a short-link engine
//!
//! The parts of a URL shortener with actual substance: minting unique short
//! codes without a global counter, resolving them under heavy read load
//! through a read-through cache, and recording clicks without ever blocking
//! the redirect response.
//!
//! # Architecture
//! - `generator`: random codes, store-verified uniqueness, bounded retries
//! - `storage`: authoritative `code -> Link` mapping + append-only click log
//! - `cache`: positive/negative resolution cache on the redirect hot path
//! - `analytics`: bounded-queue click recorder, export and retention
//! - `services`: orchestration (`Resolver` capability, `LinkService`)
//! - `api`: HTTP services and middleware
//! - `config` / `errors` / `logging`: the ambient stack

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod generator;
pub mod logging;
pub mod services;
pub mod storage;
pub mod utils;
