pub mod chat;
pub mod config;
pub mod error;
pub mod frontend;
pub mod gateway;
pub mod mcp;

pub use error::{ChatbotError, Result};
