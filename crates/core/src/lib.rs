//! Core media storage logic for Atelier.
//!
//! This crate contains pure storage logic with ZERO web or database dependencies.
//! The website layer (pages, forms, admin actions) calls into it with raw upload
//! bytes and consumes the public URLs it returns.
//!
//! # Modules
//!
//! - `storage` - Object storage uploads: key sanitization, image normalization,
//!   conflict-free upload resolution
//! - `config` - Layered file/environment configuration

pub mod config;
pub mod storage;

pub use config::AppConfig;
