pub mod cache;
pub mod config;
pub mod discover;
pub mod resolve;

pub use cache::*;
pub use config::*;
pub use discover::*;
pub use resolve::*;
