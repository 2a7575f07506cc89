//! Teloxide dispatcher schema, keyboards and handlers

pub mod bot;
pub mod commands;
pub mod handlers;
pub mod keyboard;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
