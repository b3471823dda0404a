//! Rota HTTP API
//!
//! Thin axum layer over `rota-core`: auth resolves the caller, DTOs
//! translate wire JSON (day labels, "HH:MM" times) into core types, and
//! every mutation runs load-mutate-save against one room document.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
