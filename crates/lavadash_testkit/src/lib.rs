//! # lavadash testkit
//!
//! Test utilities for the lavadash crates.
//!
//! This crate provides:
//! - [`FakeDashboard`], an in-process XML-RPC dashboard server
//! - Sample bundles, populated dashboards and backup scratch directories
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use lavadash_engine::Dashboard;
//! use lavadash_testkit::prelude::*;
//!
//! let fake = FakeDashboard::new(populated_dashboard());
//! let proxy = fake.proxy("http://localhost:8000/").unwrap();
//! assert_eq!(proxy.streams().unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::server::*;
}

pub use fixtures::*;
pub use generators::*;
pub use server::*;
