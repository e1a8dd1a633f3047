//! The interactive idea page
//!
//! Owns at most one stream session at a time. The session is mounted when
//! the gate is granted and torn down when the gate closes, when a new idea is
//! requested, or on exit.

use std::io::{self, Stdout};
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use ideagen_core::auth::{FileIdentity, IdentityProvider};
use ideagen_core::stream::{EventStreamTransport, HttpEventStream, SessionSnapshot};
use ideagen_core::{gate, Config, Gate, IdeaView, StreamSession};

use crate::tui::theme::Theme;
use crate::tui::{self, Scroll};

type Tui = Terminal<CrosstermBackend<Stdout>>;

const PAGE: usize = 10;

/// A running session and the channel it reports on
struct Mounted {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    snapshots: watch::Receiver<SessionSnapshot>,
    /// False once the session task has dropped its sender
    live: bool,
}

enum Action {
    Snapshot(Option<SessionSnapshot>),
    Input(Option<io::Result<Event>>),
    Interrupt,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    identity: Arc<FileIdentity>,
    transport: Arc<dyn EventStreamTransport>,
    endpoint: Url,
    theme: Theme,
    view: IdeaView,
    scroll: Scroll,
    mounted: Option<Mounted>,
}

/// Run the idea page until the user quits
pub async fn run(config: &Config) -> Result<()> {
    let endpoint = config.endpoint_url()?;
    let identity = Arc::new(FileIdentity::new(config.session_path()).await);
    let transport: Arc<dyn EventStreamTransport> =
        Arc::new(HttpEventStream::new(config.chunk_timeout())?);

    let app = App::new(identity, transport, endpoint);

    let mut terminal = setup_terminal()?;
    let result = app.run(&mut terminal).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

impl App {
    pub fn new(
        identity: Arc<FileIdentity>,
        transport: Arc<dyn EventStreamTransport>,
        endpoint: Url,
    ) -> Self {
        Self {
            identity,
            transport,
            endpoint,
            theme: Theme::default(),
            view: IdeaView::Loading,
            scroll: Scroll::default(),
            mounted: None,
        }
    }

    async fn run(mut self, terminal: &mut Tui) -> Result<()> {
        let mut input = EventStream::new();
        let initial = gate(&self.identity.current_profile());
        self.apply_gate(initial).await;

        let result = loop {
            if let Err(e) = terminal.draw(|f| tui::draw(f, &self.view, &mut self.scroll, &self.theme)) {
                break Err(e.into());
            }

            let action = tokio::select! {
                snapshot = next_snapshot(&mut self.mounted) => Action::Snapshot(snapshot),
                event = input.next() => Action::Input(event),
                _ = tokio::signal::ctrl_c() => Action::Interrupt,
            };

            match action {
                Action::Snapshot(Some(snapshot)) => {
                    self.view = IdeaView::from_snapshot(&snapshot);
                }
                Action::Snapshot(None) => {}
                Action::Input(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
                    if self.handle_key(key).await == Flow::Quit {
                        break Ok(());
                    }
                }
                Action::Input(Some(Ok(_))) => {}
                Action::Input(Some(Err(e))) => break Err(e.into()),
                Action::Input(None) | Action::Interrupt => break Ok(()),
            }
        };

        // Every exit path closes the connection
        self.unmount().await;
        result
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit
            }
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('r') => self.refresh().await,
            KeyCode::Char('n') => self.regenerate().await,
            KeyCode::Up | KeyCode::Char('k') => self.scroll.up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll.down(1),
            KeyCode::PageUp => self.scroll.up(PAGE),
            KeyCode::PageDown => self.scroll.down(PAGE),
            KeyCode::Home | KeyCode::Char('g') => self.scroll.top(),
            KeyCode::End | KeyCode::Char('G') => self.scroll.bottom(),
            _ => {}
        }
        Flow::Continue
    }

    /// Re-read the profile and re-evaluate access
    async fn refresh(&mut self) {
        let snapshot = self.identity.reload().await;
        let gate = gate(&snapshot);
        info!("Profile reloaded; gate is {:?}", gate);
        self.apply_gate(gate).await;
    }

    /// Replace the current session with a fresh one
    async fn regenerate(&mut self) {
        if self.mounted.is_none() {
            return;
        }
        self.unmount().await;
        self.mount();
    }

    async fn apply_gate(&mut self, gate: Gate) {
        match gate {
            Gate::Granted => {
                if self.mounted.is_none() {
                    self.mount();
                }
            }
            Gate::Loading | Gate::Paywall => {
                if self.mounted.is_some() {
                    info!("Access no longer granted; closing idea stream");
                }
                self.unmount().await;
                self.view = IdeaView::for_gate(gate);
            }
        }
    }

    fn mount(&mut self) {
        let mut session = StreamSession::new(self.endpoint.clone(), self.transport.clone());
        let snapshots = session.subscribe();
        let cancel = CancellationToken::new();

        let identity = self.identity.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            session.run_until_cancelled(identity.as_ref(), token).await;
        });

        debug!("Mounted idea stream session");
        self.view = IdeaView::for_gate(Gate::Granted);
        self.scroll = Scroll::default();
        self.mounted = Some(Mounted {
            cancel,
            task,
            snapshots,
            live: true,
        });
    }

    async fn unmount(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        mounted.cancel.cancel();
        if let Err(e) = mounted.task.await {
            warn!("Idea stream task ended abnormally: {}", e);
        }
        debug!("Unmounted idea stream session");
    }
}

/// Next snapshot from the mounted session; pends forever when there is none
async fn next_snapshot(mounted: &mut Option<Mounted>) -> Option<SessionSnapshot> {
    match mounted {
        Some(mounted) if mounted.live => match mounted.snapshots.changed().await {
            Ok(()) => Some(mounted.snapshots.borrow_and_update().clone()),
            Err(_) => {
                mounted.live = false;
                None
            }
        },
        _ => std::future::pending().await,
    }
}
