//! Long-lived background tasks spawned at startup.

pub mod retention;
