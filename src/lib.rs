//! Library crate for match-sync, exposing modules for binaries and integration tests.

pub mod auth;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
