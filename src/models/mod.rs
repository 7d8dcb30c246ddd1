//! Data models of the creator page.
//!
//! Field names match the JSON payloads stored locally and remotely.

mod app_data;
mod items;
mod profile;

pub use app_data::*;
pub use items::*;
pub use profile::*;
