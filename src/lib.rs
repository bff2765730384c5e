pub mod broadcast;
pub mod config;
pub mod error;
pub mod prompts;
pub mod protocol;
pub mod state;
pub mod types;
pub mod ws;
