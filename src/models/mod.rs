//! Topology data models
//!
//! Entity records shared by the loader, the scanner, the diff engine and the
//! reconciler.

pub mod secret;
pub mod topology;

// Re-export commonly used types
pub use secret::Secret;
pub use topology::*;
