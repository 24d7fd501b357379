//! DreamMesh API server library.
//!
//! Exposes the core building blocks (config, state, error handling, store,
//! runner, routes) so integration tests and the binary entrypoint can both
//! access them.

pub mod background;
pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod runner;
pub mod state;
pub mod store;
