//! The chat session engine: conversation model, dispatch, simulated typing,
//! persistence and theme state. Nothing in here touches the terminal.

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod message;
pub mod persistence;
pub mod reveal;
pub mod session;
pub mod theme;
