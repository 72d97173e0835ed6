//! Request handlers, one module per endpoint group.

pub mod health;
pub mod install;
pub mod logout;
pub mod resources;
