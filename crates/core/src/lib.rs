//! `opsgate-core` — identity primitives shared by the authorization crates.
//!
//! This crate contains **pure** building blocks (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::ActorId;
