//! CLI command implementations

pub mod analyze;
pub mod cache;
pub mod config;
pub mod load;

pub use analyze::execute as analyze;
pub use cache::execute as cache;
pub use config::execute as config;
pub use load::execute as load;
