//! Event polling, dispatching, and UI rendering loop.
//!
//! Everything runs on one task: terminal input arrives from a reader task
//! over a channel, answers arrive from [`DispatchService`], and reveal ticks
//! come from an interval that only fires while a reply is being typed out.

use std::{error::Error, io, sync::Arc, time::Duration};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::layout::Rect;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::conversation::MessageStore;
use crate::core::dispatcher::{DispatchService, HttpDispatcher};
use crate::core::persistence::PersistenceAdapter;
use crate::core::session::{DispatchRequest, SessionController, TickOutcome};
use crate::core::theme::{PresentationSink, ThemeController};
use crate::ui::renderer::{max_scroll, ui, ChatView};
use crate::ui::theme::ThemeState;

type ChatTerminal = Terminal<CrosstermBackend<io::Stdout>>;

const PAGE_SCROLL: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Redraw,
    Dispatch(DispatchRequest),
    Quit,
}

/// Applies one key press to the session and theme.
///
/// Typing is ignored while a turn is in flight, mirroring a disabled input.
pub fn handle_key<S: PresentationSink>(
    key: KeyEvent,
    session: &mut SessionController,
    theme: &mut ThemeController<S>,
    scroll_from_bottom: &mut u16,
) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Ignored;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => KeyOutcome::Quit,
        KeyCode::Esc => KeyOutcome::Quit,
        KeyCode::Char('t') if ctrl => {
            theme.toggle();
            KeyOutcome::Redraw
        }
        KeyCode::Char('n') if ctrl => {
            if session.reset() {
                *scroll_from_bottom = 0;
                KeyOutcome::Redraw
            } else {
                KeyOutcome::Ignored
            }
        }
        KeyCode::Up => {
            *scroll_from_bottom = scroll_from_bottom.saturating_add(1);
            KeyOutcome::Redraw
        }
        KeyCode::Down => {
            *scroll_from_bottom = scroll_from_bottom.saturating_sub(1);
            KeyOutcome::Redraw
        }
        KeyCode::PageUp => {
            *scroll_from_bottom = scroll_from_bottom.saturating_add(PAGE_SCROLL);
            KeyOutcome::Redraw
        }
        KeyCode::PageDown => {
            *scroll_from_bottom = scroll_from_bottom.saturating_sub(PAGE_SCROLL);
            KeyOutcome::Redraw
        }
        _ if !session.is_idle() => KeyOutcome::Ignored,
        KeyCode::Enter => match session.submit_input() {
            Some(request) => {
                *scroll_from_bottom = 0;
                KeyOutcome::Dispatch(request)
            }
            None => KeyOutcome::Ignored,
        },
        KeyCode::Backspace => {
            session.input_mut().pop();
            KeyOutcome::Redraw
        }
        KeyCode::Char(ch) if !ctrl => {
            session.input_mut().push(ch);
            KeyOutcome::Redraw
        }
        _ => KeyOutcome::Ignored,
    }
}

fn setup_terminal() -> Result<ChatTerminal, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

fn draw(
    terminal: &mut ChatTerminal,
    session: &SessionController,
    theme: &ThemeController<ThemeState>,
    scroll_from_bottom: &mut u16,
) -> io::Result<()> {
    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);
    let mut view = ChatView {
        session,
        theme: theme.sink(),
        scroll_from_bottom: *scroll_from_bottom,
    };
    view.scroll_from_bottom = view.scroll_from_bottom.min(max_scroll(&view, area));
    *scroll_from_bottom = view.scroll_from_bottom;
    terminal.draw(|f| ui(f, &view))?;
    Ok(())
}

pub async fn run_chat(
    config: Config,
    persistence: Arc<dyn PersistenceAdapter>,
) -> Result<(), Box<dyn Error>> {
    let store = MessageStore::open(persistence.clone(), config.resume_history())
        .with_persist_every(config.persist_every());
    let mut session = SessionController::new(store);
    let mut theme = ThemeController::load(persistence, ThemeState::default());

    let dispatcher = HttpDispatcher::new(config.endpoint(), config.request_timeout());
    info!(endpoint = dispatcher.endpoint(), "Starting chat session");
    let (dispatch_service, mut dispatch_rx) = DispatchService::new(Arc::new(dispatcher));
    let cancel_token = CancellationToken::new();

    let reveal_tick = config.reveal_tick();
    let mut reveal_interval = tokio::time::interval(reveal_tick.max(Duration::from_millis(1)));
    reveal_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let event_reader_handle = spawn_event_reader(event_tx);
    let mut scroll_from_bottom: u16 = 0;
    let mut revisions = session.store().subscribe();
    let mut needs_redraw = true;

    let result: Result<(), Box<dyn Error>> = loop {
        if needs_redraw {
            if let Err(err) = draw(&mut terminal, &session, &theme, &mut scroll_from_bottom) {
                break Err(err.into());
            }
            needs_redraw = false;
        }

        tokio::select! {
            Some(ev) = event_rx.recv() => {
                match ev {
                    Event::Key(key) => {
                        match handle_key(key, &mut session, &mut theme, &mut scroll_from_bottom) {
                            KeyOutcome::Quit => break Ok(()),
                            KeyOutcome::Dispatch(request) => {
                                dispatch_service.spawn(
                                    request.question,
                                    request.cycle,
                                    cancel_token.child_token(),
                                );
                                needs_redraw = true;
                            }
                            KeyOutcome::Redraw => needs_redraw = true,
                            KeyOutcome::Ignored => {}
                        }
                    }
                    Event::Resize(..) => needs_redraw = true,
                    _ => {}
                }
            }
            // Transcript changes arrive here; status-only changes redraw below.
            Ok(()) = revisions.changed() => {
                needs_redraw = true;
            }
            Some((outcome, cycle)) = dispatch_rx.recv() => {
                if session.complete_dispatch(cycle, outcome) {
                    needs_redraw = true;
                    if session.is_streaming() {
                        if reveal_tick.is_zero() {
                            while session.tick() == TickOutcome::Revealed {}
                        } else {
                            reveal_interval.reset();
                        }
                    }
                }
            }
            _ = reveal_interval.tick(), if session.is_streaming() => {
                if session.tick() != TickOutcome::Revealed {
                    needs_redraw = true;
                }
            }
            else => break Ok(()),
        }
    };

    debug!("Leaving chat loop");
    cancel_token.cancel();
    event_reader_handle.abort();
    session.shutdown();
    restore_terminal(&mut terminal)?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatcher::NetworkError;
    use crate::core::message::Message;
    use crate::core::persistence::MemoryStore;
    use crate::core::session::SessionStatus;
    use crate::core::theme::ThemeMode;
    use crate::utils::test_utils::RecordingSink;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn setup() -> (SessionController, ThemeController<RecordingSink>) {
        let backend = Arc::new(MemoryStore::new());
        let session = SessionController::new(MessageStore::new(backend.clone()));
        let theme = ThemeController::load(backend, RecordingSink::default());
        (session, theme)
    }

    fn type_text(
        text: &str,
        session: &mut SessionController,
        theme: &mut ThemeController<RecordingSink>,
        scroll: &mut u16,
    ) {
        for ch in text.chars() {
            handle_key(press(KeyCode::Char(ch)), session, theme, scroll);
        }
    }

    #[test]
    fn enter_dispatches_the_typed_question() {
        let (mut session, mut theme) = setup();
        let mut scroll = 3;
        type_text("Hi!", &mut session, &mut theme, &mut scroll);
        handle_key(press(KeyCode::Backspace), &mut session, &mut theme, &mut scroll);

        let outcome = handle_key(press(KeyCode::Enter), &mut session, &mut theme, &mut scroll);

        match outcome {
            KeyOutcome::Dispatch(request) => assert_eq!(request.question, "Hi"),
            other => panic!("expected dispatch, got {other:?}"),
        }
        assert_eq!(session.input(), "");
        assert_eq!(scroll, 0);
        assert_eq!(session.messages(), &[Message::user("Hi")]);
    }

    #[test]
    fn blank_enter_does_nothing() {
        let (mut session, mut theme) = setup();
        let mut scroll = 0;
        type_text("   ", &mut session, &mut theme, &mut scroll);

        let outcome = handle_key(press(KeyCode::Enter), &mut session, &mut theme, &mut scroll);

        assert_eq!(outcome, KeyOutcome::Ignored);
        assert!(session.messages().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn input_is_locked_while_a_turn_is_in_flight() {
        let (mut session, mut theme) = setup();
        let mut scroll = 0;
        let request = session.send_message("Hello").expect("send accepted");

        type_text("more", &mut session, &mut theme, &mut scroll);
        assert_eq!(session.input(), "");
        assert_eq!(
            handle_key(press(KeyCode::Enter), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Ignored
        );
        assert_eq!(
            handle_key(ctrl('n'), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Ignored
        );

        session.complete_dispatch(request.cycle, Err(NetworkError::Status(500)));
        type_text("more", &mut session, &mut theme, &mut scroll);
        assert_eq!(session.input(), "more");
    }

    #[test]
    fn ctrl_t_toggles_theme_even_mid_turn() {
        let (mut session, mut theme) = setup();
        let mut scroll = 0;
        session.send_message("Hello").expect("send accepted");

        assert_eq!(
            handle_key(ctrl('t'), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Redraw
        );
        assert_eq!(theme.mode(), ThemeMode::Dark);
        assert_eq!(theme.sink().applied.last(), Some(&ThemeMode::Dark));
    }

    #[test]
    fn ctrl_n_starts_a_new_conversation_when_idle() {
        let (mut session, mut theme) = setup();
        let mut scroll = 5;
        let request = session.send_message("Hello").expect("send accepted");
        session.complete_dispatch(request.cycle, Ok(String::new()));

        assert_eq!(
            handle_key(ctrl('n'), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Redraw
        );
        assert!(session.messages().is_empty());
        assert_eq!(scroll, 0);
    }

    fn changed(revisions: &mut tokio::sync::watch::Receiver<u64>) -> bool {
        let seen = revisions.has_changed().expect("store alive");
        let _ = revisions.borrow_and_update();
        seen
    }

    #[test]
    fn every_transcript_change_signals_a_redraw() {
        let (mut session, _) = setup();
        let mut revisions = session.store().subscribe();

        let request = session.send_message("Hello").expect("send accepted");
        assert!(changed(&mut revisions));
        assert!(!changed(&mut revisions));

        session.complete_dispatch(request.cycle, Ok("Hi".to_string()));
        assert!(changed(&mut revisions));
        assert_eq!(session.tick(), TickOutcome::Revealed);
        assert!(changed(&mut revisions));
        assert_eq!(session.tick(), TickOutcome::Finished);
        assert!(changed(&mut revisions));

        assert!(session.reset());
        assert!(changed(&mut revisions));
    }

    #[test]
    fn scrolling_and_quitting() {
        let (mut session, mut theme) = setup();
        let mut scroll = 0;

        handle_key(press(KeyCode::PageUp), &mut session, &mut theme, &mut scroll);
        handle_key(press(KeyCode::Down), &mut session, &mut theme, &mut scroll);
        assert_eq!(scroll, PAGE_SCROLL - 1);

        assert_eq!(
            handle_key(press(KeyCode::Esc), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Quit
        );
        assert_eq!(
            handle_key(ctrl('c'), &mut session, &mut theme, &mut scroll),
            KeyOutcome::Quit
        );
    }
}
