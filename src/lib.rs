//! typeload - TypeScript declaration acquisition and caching
//!
//! Resolves npm packages against an ESM registry, walks the declaration
//! files they reference, keeps them in a persistent expiring cache and
//! publishes them to a language-service host under a virtual module root.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod loader;
pub mod registrar;
pub mod ui;
pub mod walker;

pub use error::{TypeLoadError, TypeLoadResult};
