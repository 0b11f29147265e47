//! Common test utilities for atrium-extensions
//!
//! This module provides shared test infrastructure including:
//! - Record builders for installed and catalog extensions
//! - In-memory mocks of every collaborator the workbench drives
//! - A fixture wiring the mocks into a workbench

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::*;
pub use fixtures::*;
pub use mocks::*;
