//! HTTP transport for the Pedra Conceito prediction service

pub mod api;
pub mod config;
