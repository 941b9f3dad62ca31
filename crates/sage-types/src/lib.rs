//! SAGE Types - Canonical wire and domain types for the SAGE multi-agent router
//!
//! This crate contains all foundational types shared across the router, the
//! transport layer, and the two service binaries, with zero dependencies on
//! other `sage-*` crates. It defines:
//!
//! - The `AgentMessage` envelope that passes through every hop
//! - The `SecureMessage` wire object the transport layer frames
//! - The open, tagged-variant metadata scheme (`MetadataValue`)
//! - Per-domain slot structs (`PaymentSlots`, `MedicalSlots`)
//! - The stable error taxonomy (`SageError`) used across the system

pub mod error;
pub mod message;
pub mod metadata;
pub mod secure;
pub mod slots;
pub mod stage;

pub use error::*;
pub use message::*;
pub use metadata::*;
pub use secure::*;
pub use slots::*;
pub use stage::*;
