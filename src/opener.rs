//! Waiting for windows that have to be launched before they can be placed.
//!
//! A small state machine with two states, idle and polling. Queries are
//! queued with [`WindowOpener::add`]; the first add on an idle queue starts
//! a polling interval and a single overall deadline, and every tick scans
//! the live window list for matches. Progress is reported on a typed event
//! channel the caller drains.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, Sleep};
use tracing::{debug, warn};

use crate::gateway::Gateway;
use crate::model::AppQuery;

#[derive(Debug, Clone, Copy)]
pub struct OpenerConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub enum OpenerEvent {
    /// A queued query found its window; the query is out of the queue.
    WindowOpened(AppQuery),
    /// The queue drained. Polling has stopped.
    AllOpened,
    /// The deadline elapsed first. Polling has stopped, but the remaining
    /// queries stay queued so the caller can decide what to do with them; a
    /// later [`WindowOpener::add`] starts a fresh interval and deadline and
    /// they get polled again.
    TimedOut { remaining: Vec<AppQuery> },
}

/// Handle to the background opener task.
pub struct WindowOpener {
    tx: mpsc::UnboundedSender<AppQuery>,
}

impl WindowOpener {
    /// Spawn the opener. Dropping the handle lets the task finish its
    /// current queue (or time out) and exit.
    pub fn spawn(
        gateway: Arc<dyn Gateway + Send + Sync>,
        config: OpenerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<OpenerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(gateway, config, rx, events_tx));
        (Self { tx }, events_rx)
    }

    /// Launch the query's open action (if any) and queue it for polling.
    /// Returns false if the task is gone.
    pub fn add(&self, query: AppQuery) -> bool {
        self.tx.send(query).is_ok()
    }
}

async fn run(
    gateway: Arc<dyn Gateway + Send + Sync>,
    config: OpenerConfig,
    mut commands: mpsc::UnboundedReceiver<AppQuery>,
    events: mpsc::UnboundedSender<OpenerEvent>,
) {
    let mut pending: Vec<AppQuery> = Vec::new();
    let mut poll: Option<Interval> = None;
    let mut deadline: Option<Pin<Box<Sleep>>> = None;
    let mut closed = false;

    loop {
        if closed && poll.is_none() {
            break;
        }
        tokio::select! {
            command = commands.recv(), if !closed => match command {
                Some(query) => {
                    if query.launch() {
                        debug!(app = %query.app, "launched application");
                    }
                    pending.push(query);
                    // Timers run only while the queue is live; an add while
                    // polling joins the existing interval and deadline.
                    if poll.is_none() {
                        let start = Instant::now();
                        poll = Some(time::interval_at(
                            start + config.poll_interval,
                            config.poll_interval,
                        ));
                        deadline = Some(Box::pin(time::sleep(config.timeout)));
                    }
                }
                None => closed = true,
            },
            _ = async { poll.as_mut().unwrap().tick().await }, if poll.is_some() => {
                match gateway.list_windows().await {
                    Ok(live) => {
                        let mut i = 0;
                        while i < pending.len() {
                            if live.iter().any(|w| pending[i].matches(w)) {
                                let query = pending.remove(i);
                                debug!(app = %query.app, "window appeared");
                                let _ = events.send(OpenerEvent::WindowOpened(query));
                            } else {
                                i += 1;
                            }
                        }
                        if pending.is_empty() {
                            let _ = events.send(OpenerEvent::AllOpened);
                            poll = None;
                            deadline = None;
                        }
                    }
                    Err(err) => warn!(error = %err, "window poll failed"),
                }
            },
            _ = async { deadline.as_mut().unwrap().await }, if deadline.is_some() => {
                warn!(remaining = pending.len(), "windows did not appear before the deadline");
                let _ = events.send(OpenerEvent::TimedOut {
                    remaining: pending.clone(),
                });
                poll = None;
                deadline = None;
            }
        }
    }
}
