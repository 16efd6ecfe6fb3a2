//! Shared pieces of the StreamSeed archive: configuration, platform paths,
//! the bucket listing model and client, the listing cache and the pager.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod pager;
pub mod platform;

pub use error::{Result, SeedError};
