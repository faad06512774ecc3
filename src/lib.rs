//! askterm is a full-screen terminal chat window for a question-answering
//! endpoint. Replies are typed out a character at a time.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation, the turn state machine, dispatch to the
//!   endpoint, the typing effect, persistence and the theme flag.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`api`] defines the request and response payloads of the endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
