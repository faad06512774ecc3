//! Terminal front end: palettes, frame rendering and the interactive loop.

pub mod chat_loop;
pub mod renderer;
pub mod theme;
