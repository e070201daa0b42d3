//! Command-line front end
mod app;
mod args;

pub use app::*;
pub use args::*;
