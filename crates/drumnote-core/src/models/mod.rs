//! Data models for the application
//!
//! Each sub-module holds the rows and request/response types of one feature area.

mod audio;
mod common;
mod enrichment;
mod job;
mod notation;
mod pipeline;
mod role;
mod user;
mod video;

pub use audio::*;
pub use common::*;
pub use enrichment::*;
pub use job::*;
pub use notation::*;
pub use pipeline::*;
pub use role::*;
pub use user::*;
pub use video::*;
