//! Event types and the main event loop driver for the terminal front-end.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, location
//! and picker snapshots, picker errors) and the [`EventHandler`], which runs a
//! background task that polls crossterm for key events and emits periodic
//! [`Event::Tick`]s. Other producers post through [`EventHandler::tx`];
//! [`forward_changes`] bridges a state `watch` channel onto it.

use crate::picker::PickerState;
use crate::state::LocationState;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::error;

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for spinner animation.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// The location slot changed.
    Location(LocationState),
    /// The picker changed (query, predictions, busy flags).
    Picker(PickerState),
    /// A place selection failed; payload is the message to show.
    PickerError(String),
}

/// Multiplexes terminal input, ticks and state changes into a single stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and handed to other
/// tasks, while the receiver is consumed by [`next`](EventHandler::next) in
/// the main loop.
pub struct EventHandler {
    /// Sender for posting events from other tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// Crossterm polling blocks, so the task runs on the blocking pool. It
    /// stops when the receiver is dropped or the terminal can no longer be
    /// read.
    ///
    /// # Arguments
    ///
    /// * `tick_rate_ms` - Interval in milliseconds between [`Event::Tick`] emissions.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::task::spawn_blocking(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));

                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            return;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        return;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    ///
    /// Returns `None` when all senders have been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Re-posts every value published on `rx` as an event until either side closes.
pub fn forward_changes<T>(
    mut rx: watch::Receiver<T>,
    tx: mpsc::UnboundedSender<Event>,
    wrap: fn(T) -> Event,
) where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            if tx.send(wrap(value)).is_err() {
                break;
            }
        }
    });
}
