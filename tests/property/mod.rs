//! Property tests
//!
//! Invariants of the wiring engine over randomly generated manifests.

mod scheduler_properties;
