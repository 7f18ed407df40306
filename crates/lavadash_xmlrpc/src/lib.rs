//! # lavadash XML-RPC
//!
//! XML-RPC value model and wire codec used to talk to LAVA dashboard
//! servers.
//!
//! The codec follows what dashboard servers emit and
//! accepts:
//!
//! - `nil` is transmissible in both directions (`allow_none`)
//! - `dateTime.iso8601` is decoded to a native timestamp (`use_datetime`)
//! - binary content travels as `base64`
//! - untyped `<value>` elements are strings
//!
//! ## Usage
//!
//! ```
//! use lavadash_xmlrpc::{decode_call, encode_call, Value};
//!
//! let body = encode_call("dashboard.bundles", &[Value::from("/anonymous/")]);
//! let call = decode_call(&body).unwrap();
//! assert_eq!(call.method, "dashboard.bundles");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode_call, decode_response, MethodCall, Response};
pub use encoder::{encode_call, encode_fault, encode_response, XmlEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
