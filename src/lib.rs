//! FLRig XML-RPC link library.
//!
//! Talks to a running FLRig instance over its XML-RPC control port:
//! the `rpc` module is the wire layer (envelope codec, line reader,
//! payload extractor, single-in-flight call engine, mode alias table),
//! `app` is the rig-control surface built on it, and `adapters` holds
//! the std implementations (TCP transport, delays).

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod rpc;

mod error;

pub use error::{Error, Result};
