//! Adapters — std implementations of the traits the RPC layer is generic over.
//!
//! | Adapter         | Implements        | Connects to                  |
//! |-----------------|-------------------|------------------------------|
//! | `tcp_transport` | Transport         | FLRig XML-RPC port over TCP  |
//! | `time`          | DelayNs           | `std::thread::sleep`         |
//! |                 |                   | (or a recorder for tests)    |

pub mod tcp_transport;
pub mod time;
