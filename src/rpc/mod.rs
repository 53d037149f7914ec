//! Datagram command protocol.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Protocol Stack                         │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Transport │──▶│  Codec   │──▶│  Engine (dispatcher)  │  │
//! │  │ (UDP)     │   │ (JSON)   │   │  → ControlPort        │  │
//! │  └───────────┘   └──────────┘   └───────────────────────┘  │
//! │       ▲                                    │               │
//! │       └──────────── reply datagram ────────┘               │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod engine;
pub mod transport;
