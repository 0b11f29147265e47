//! Type definitions for extensions, records and environments

mod enablement;
mod identity;
mod manifest;
mod platform;
mod records;

pub use enablement::*;
pub use identity::*;
pub use manifest::*;
pub use platform::*;
pub use records::*;
