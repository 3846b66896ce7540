pub mod cli;
pub mod credential_file;
pub mod http;
pub mod load_config;
pub mod picker;

pub use cli::{run, Cli, Commands};
