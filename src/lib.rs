pub mod completion;
pub mod config;
pub mod error;
pub mod handlers;
pub mod intent;
pub mod models;
pub mod prompt;
pub mod session;
