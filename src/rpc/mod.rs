//! XML-RPC client subsystem.
//!
//! Minimal, hand-rolled XML-RPC over an HTTP-style envelope, as spoken by
//! FLRig on its control port.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RPC Stack                            │
//! │                                                             │
//! │  caller ──▶ ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//! │             │  Engine  │──▶│  Codec   │──▶│   Writer    │   │
//! │             │ (guard,  │   │(envelope)│   │(discard +   │   │
//! │             │  retry)  │   └──────────┘   │ write)      │   │
//! │             └──────────┘                  └─────────────┘   │
//! │                  ▲                              │           │
//! │                  │                              ▼           │
//! │             ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//! │  value ◀────│ Extract  │◀──│  Reader  │◀──│  Transport  │   │
//! │             │  (FSM)   │   │ (lines)  │   │   (trait)   │   │
//! │             └──────────┘   └──────────┘   └─────────────┘   │
//! │                                                             │
//! │  Modes: alias table built once per connection via Engine    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod engine;
pub mod extract;
pub mod modes;
pub mod reader;
pub mod transport;
pub mod writer;

pub use engine::{Reply, RpcClient};
pub use modes::{Mode, ModeTable};
pub use transport::{Transport, TransportError};
