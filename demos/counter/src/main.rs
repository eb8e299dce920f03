//! Counter - Minimal tidux example
//!
//! This example demonstrates the core pattern:
//! - State: What the app knows (shared, mutated only by actions)
//! - Actions: What can happen, sync or async
//! - Selector binding: What the view reads, and when it must redraw
//! - Main loop: Event -> Dispatch -> Broadcast -> Render
//!
//! Keys: k/Up = increment, j/Down = decrement, d = increment after a delay,
//! c = cancel the delayed increment, q = quit
//!
//! Set `RUST_LOG=debug` to write dispatch logs to `counter.log`.

use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Flex, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use tidux::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// State - What the app knows
// ============================================================================

#[derive(Default)]
struct AppState {
    count: i32,
    pending: bool,
}

type Shared = Arc<Mutex<AppState>>;

fn state(shared: &Shared) -> MutexGuard<'_, AppState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Actions - What can happen
// ============================================================================

struct AppActions {
    increase: SyncAction<(), i32>,
    decrease: SyncAction<(), i32>,
    set_pending: SyncAction<bool, ()>,
    delayed_increase: AsyncAction<(), i32>,
}

impl AppActions {
    fn new(shared: &Shared) -> Self {
        let s = shared.clone();
        let increase = SyncAction::new("CountIncrement", move |_: (), _ctx| {
            let mut state = state(&s);
            state.count += 1;
            Ok(state.count)
        });

        let s = shared.clone();
        let decrease = SyncAction::new("CountDecrement", move |_: (), _ctx| {
            let mut state = state(&s);
            state.count -= 1;
            Ok(state.count)
        });

        let s = shared.clone();
        let set_pending = SyncAction::new("PendingSet", move |pending: bool, _ctx| {
            state(&s).pending = pending;
            Ok(())
        });

        let (inc, pend) = (increase.clone(), set_pending.clone());
        let delayed_increase =
            AsyncAction::new("CountIncrementDelayed", move |_: (), ctx: DispatchContext| {
                let (increase, set_pending) = (inc.clone(), pend.clone());
                async move {
                    ctx.dispatch(&set_pending, true)?;
                    tokio::select! {
                        _ = ctx.token().cancelled() => return Err(DispatchError::Cancelled),
                        _ = tokio::time::sleep(DELAY) => {}
                    }
                    let count = ctx.dispatch(&increase, ())?;
                    ctx.dispatch(&set_pending, false)?;
                    Ok::<_, DispatchError>(count)
                }
            });

        Self {
            increase,
            decrease,
            set_pending,
            delayed_increase,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Selection)]
struct CounterView {
    count: i32,
    pending: bool,
}

// ============================================================================
// Main - Setup terminal, run event loop, cleanup
// ============================================================================

fn init_tracing() -> io::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let file = File::create("counter.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    init_tracing()?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal).await;

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Forward key presses from crossterm until cancelled.
fn spawn_key_poller(
    tx: mpsc::UnboundedSender<KeyCode>,
    poll_timeout: Duration,
    loop_sleep: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(loop_sleep) => {
                    while event::poll(poll_timeout).unwrap_or(false) {
                        let Ok(Event::Key(key)) = event::read() else {
                            continue;
                        };
                        if key.kind == KeyEventKind::Press && tx.send(key.code).is_err() {
                            tracing::debug!("key channel closed, stopping poller");
                            return;
                        }
                    }
                }
            }
        }
    })
}

fn draw<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    view: CounterView,
) -> io::Result<()> {
    terminal.draw(|frame| {
        let area = frame.area();

        // Center the counter vertically and horizontally
        let [_, center, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(5),
            Constraint::Fill(1),
        ])
        .areas(area);

        let [_, center, _] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(30),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(center);

        let border = if view.pending { Color::Yellow } else { Color::Cyan };
        let block = Block::default()
            .title(" Counter ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));

        let text = if view.pending {
            format!("{} (+1 pending)", view.count)
        } else {
            view.count.to_string()
        };
        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, center);

        // Help text at bottom
        let [_, help_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);
        let help = Paragraph::new("k/Up: +1  j/Down: -1  d: +1 later  c: cancel  q: quit")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, help_area);
    })?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>) -> io::Result<()> {
    let dispatcher = Dispatcher::new();
    let shared: Shared = Arc::default();
    let actions = AppActions::new(&shared);

    let _logger = ActionLogger::new(ActionLoggerConfig::default()).attach(&dispatcher);

    // The view re-renders only when the selected slice changes
    let flag = RenderFlag::new();
    let source = shared.clone();
    let mut binding = SelectorBinding::new(&dispatcher, flag.clone(), move || {
        let state = state(&source);
        Some(CounterView {
            count: state.count,
            pending: state.pending,
        })
    })
    .map_err(io::Error::other)?;
    binding.mount();

    // Key poller
    let (key_tx, mut key_rx) = mpsc::unbounded_channel::<KeyCode>();
    let cancel_token = CancellationToken::new();
    let _handle = spawn_key_poller(
        key_tx,
        Duration::from_millis(10),
        Duration::from_millis(16),
        cancel_token.clone(),
    );

    let mut frame_tick = tokio::time::interval(Duration::from_millis(16));
    let mut pending: Option<Task<i32>> = None;

    draw(terminal, binding.current())?;

    loop {
        tokio::select! {
            Some(code) = key_rx.recv() => {
                let outcome = match code {
                    KeyCode::Char('k') | KeyCode::Up => {
                        dispatcher.dispatch(&actions.increase, ()).map(drop)
                    }
                    KeyCode::Char('j') | KeyCode::Down => {
                        dispatcher.dispatch(&actions.decrease, ()).map(drop)
                    }
                    KeyCode::Char('d') => {
                        if pending.as_ref().is_none_or(Task::is_finished) {
                            pending = Some(dispatcher.dispatch(&actions.delayed_increase, ()));
                        }
                        Ok(())
                    }
                    KeyCode::Char('c') => match pending.take() {
                        Some(task) => {
                            task.cancel();
                            dispatcher.dispatch(&actions.set_pending, false)
                        }
                        None => Ok(()),
                    },
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    _ => Ok(()),
                };
                if let Err(err) = outcome {
                    tracing::warn!(error = %err, "dispatch failed");
                }
            }

            _ = frame_tick.tick() => {
                if flag.take() {
                    draw(terminal, binding.select().map_err(io::Error::other)?)?;
                }
            }
        }
    }

    binding.unmount();
    cancel_token.cancel();
    Ok(())
}
