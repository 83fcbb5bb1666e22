//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one layer against a scripted FLRig
//! ([`mock_link`]) or a loopback TCP server. Everything runs on the host
//! with no radio and no FLRig instance required.

mod mock_link;
mod rig_ops_tests;
