//! Top-k book recommendations served from a precomputed low-rank
//! factorization, with every served item logged for monitoring.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
