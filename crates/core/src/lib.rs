//! ShopWave Core - Shared domain types.
//!
//! This crate provides the value types used across ShopWave components:
//! - `storefront` - Customer storefront and role-gated admin console
//! - `cli` - Command-line tools for roles, seeding, and schema output
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no gateway access. This keeps it lightweight and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices, ratings, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
