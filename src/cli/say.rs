//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::conversation::MessageStore;
use crate::core::dispatcher::HttpDispatcher;
use crate::core::persistence::MemoryStore;
use crate::core::session::{run_exchange, SessionController};

/// The part of the answer revealed since `printed` bytes went out. A failed
/// turn has no answer to print.
fn unprinted_reply(session: &SessionController, printed: usize) -> Option<&str> {
    if session.last_error().is_some() {
        return None;
    }
    let reply = session.messages().last().filter(|m| m.is_bot())?;
    reply.content.get(printed..).filter(|delta| !delta.is_empty())
}

/// Asks one question and types the answer out on stdout.
///
/// The turn runs against an in-memory store, so the saved chat history is
/// left alone.
pub async fn run_say(
    question: Vec<String>,
    instant: bool,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        eprintln!("Usage: askterm say <question>");
        std::process::exit(1);
    }

    let dispatcher = HttpDispatcher::new(config.endpoint(), config.request_timeout());
    let mut session = SessionController::new(MessageStore::new(Arc::new(MemoryStore::new())));
    let tick = if instant {
        Duration::ZERO
    } else {
        config.reveal_tick()
    };

    let mut printed = 0;
    run_exchange(&mut session, &dispatcher, tick, &question, |session| {
        if let Some(delta) = unprinted_reply(session, printed) {
            print!("{delta}");
            let _ = io::stdout().flush();
            printed += delta.len();
        }
    })
    .await;

    if let Some(err) = session.last_error() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatcher::NetworkError;
    use crate::core::session::{TickOutcome, ERROR_PREFIX};

    fn new_session() -> SessionController {
        SessionController::new(MessageStore::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn prints_only_the_newly_revealed_part() {
        let mut session = new_session();
        let request = session.send_message("Hello").expect("send accepted");
        assert_eq!(unprinted_reply(&session, 0), None);

        session.complete_dispatch(request.cycle, Ok("Hi!".to_string()));
        session.tick();
        session.tick();
        assert_eq!(unprinted_reply(&session, 0), Some("Hi"));
        assert_eq!(unprinted_reply(&session, 2), None);

        session.tick();
        assert_eq!(unprinted_reply(&session, 2), Some("!"));
    }

    #[test]
    fn answers_that_look_like_errors_are_still_printed() {
        let mut session = new_session();
        let answer = format!("{ERROR_PREFIX}is how the docs spell it");
        let request = session.send_message("Hello").expect("send accepted");
        session.complete_dispatch(request.cycle, Ok(answer.clone()));
        while session.tick() == TickOutcome::Revealed {}

        assert_eq!(unprinted_reply(&session, 0), Some(answer.as_str()));
    }

    #[test]
    fn failed_turns_print_nothing() {
        let mut session = new_session();
        let request = session.send_message("Hello").expect("send accepted");
        session.complete_dispatch(request.cycle, Err(NetworkError::Status(500)));

        assert_eq!(unprinted_reply(&session, 0), None);
        assert!(session.last_error().is_some());
    }
}
