pub mod config;
pub mod output;

pub use config::*;
pub use output::*;
