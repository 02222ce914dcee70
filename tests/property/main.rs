//! Property-based soundness tests.
//!
//! Run with: `cargo test --test property`

mod chunk_alignment;
mod ip_roundtrip;
