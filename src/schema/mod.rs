//! Schema defaults and merge-with-defaults healing.

mod defaults;
mod merge;

pub use defaults::*;
pub use merge::*;
