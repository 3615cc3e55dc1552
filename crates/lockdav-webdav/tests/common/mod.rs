//! Common test utilities for lockdav integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod dispatch;
pub mod harness;

pub use assertions::*;
pub use dispatch::*;
pub use harness::*;
