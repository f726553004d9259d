//! Core library for the bindery pipeline service.
//!
//! Turns uploaded source documents into finished books through a fixed
//! stage sequence: parse, clean, understand, structure, create, a manual
//! review gate, translate and generate. Stage work runs as tasks on a
//! bounded worker pool; everything durable lives in SQLite.

pub mod config;
pub mod content;
pub mod events;
pub mod pipeline;
pub mod processor;
pub mod task;
pub mod testing;
pub mod translation;

pub use config::{load_config, validate_config, Config, ConfigError};
