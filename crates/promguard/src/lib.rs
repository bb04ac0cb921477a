//! Top-level facade crate for promguard.
//!
//! Re-exports the enforcement core and the gateway library so users can
//! depend on a single crate.

pub mod core {
    pub use promguard_core::*;
}

pub mod gateway {
    pub use promguard_gateway::*;
}
