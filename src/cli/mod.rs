//! CLI command handling

pub mod notify;
pub mod output;
pub mod send;

pub use notify::*;
pub use output::*;
pub use send::*;
