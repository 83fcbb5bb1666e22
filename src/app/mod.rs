//! Rig control on top of the RPC layer.
//!
//! [`service::FlrigRig`] runs the open sequence (version and capability
//! probes, mode table) and exposes the device-control operations. Each
//! operation is one or a few orchestrated calls; results are cached in
//! [`service::RigState`] the way FLRig itself reports them.

pub mod service;
pub mod types;

pub use service::{Capabilities, FlrigRig, RigState};
pub use types::{ExtParm, Func, Hz, Level, LevelValue, Split, Version, Vfo, Width};
