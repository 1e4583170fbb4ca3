//! Command handlers for pobdata CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod items;
pub mod stat;
pub mod uniques;
