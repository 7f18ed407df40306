//! # lavadash protocol
//!
//! Typed views over the replies of the LAVA dashboard XML-RPC API.
//!
//! The dashboard answers with loosely typed structs; this crate turns
//! them into records the engine can rely on:
//!
//! - [`Stream`], [`Bundle`] and [`BundleContent`] for replication
//! - [`DataView`] and [`QueryResult`] for server-side queries
//! - [`ServerVersion`] and [`StrictVersion`] for capability checks
//!
//! Optional members that older servers omit (such as a bundle's
//! `content_size`) decode to `None` instead of failing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod data_view;
mod error;
mod records;
mod version;

pub use data_view::{Cell, DataView, DataViewArgument, QueryResult};
pub use error::{ProtocolError, ProtocolResult};
pub use records::{Bundle, BundleContent, Stream};
pub use version::{
    strict_server_version, PreRelease, ReleaseLevel, ServerVersion, StrictVersion,
};
