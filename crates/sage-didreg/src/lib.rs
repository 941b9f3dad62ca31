//! SAGE DID Registry - component 4.J: the DID resolver adapter.
//!
//! Exposes `DidResolver` (the interface spec.md §4.A names,
//! `Resolve(did) -> publicKey`) and a retrying wrapper bounded by the 30s
//! deadline of spec.md §5. The on-chain registry implementation a real
//! deployment would use is explicitly out of scope (spec.md §1); this crate
//! ships one concrete resolver, `FileDidResolver`, suitable for tests and
//! local operation.

mod error;
mod file_resolver;
mod resolver;

pub use error::{DidRegError, DidRegResult};
pub use file_resolver::FileDidResolver;
pub use resolver::{DidResolver, ResolvedKey, RetryConfig, RetryingResolver};
