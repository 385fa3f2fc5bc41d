pub mod cancel;
pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod git_ops;
pub mod manager;
pub mod model;
pub mod progress;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;
