//! Provider registry, context compaction and provider health probing for
//! the Quantum Studio chat client.

pub mod config;
pub mod models;
pub mod providers;
pub mod services;
