//! Per-viewer state shared between a viewer and its session task
//!
//! Every session gets a generation number. Any mutation coming from a
//! session task is applied only while that generation is still current,
//! and the check happens under the same lock as the mutation. Stopping or
//! restarting a viewer bumps the generation, so a task that is still
//! unwinding after `stop()` can no longer touch the buffer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::buffer::LogBuffer;
use crate::state::{StreamPhase, ViewerEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Buffer plus lifecycle bookkeeping
#[derive(Debug)]
pub(crate) struct ViewState<T> {
    pub(crate) buffer: LogBuffer<T>,
    pub(crate) phase: StreamPhase,
    generation: u64,
}

impl<T> ViewState<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: LogBuffer::new(capacity),
            phase: StreamPhase::Idle,
            generation: 0,
        }
    }
}

fn lock<T>(view: &Mutex<ViewState<T>>) -> MutexGuard<'_, ViewState<T>> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit<T>(events: &broadcast::Sender<ViewerEvent<T>>, event: ViewerEvent<T>) {
    // No subscribers is fine; the buffer is still readable by polling
    let _ = events.send(event);
}

/// Handle a session task uses to reach the state it was started for
#[derive(Debug)]
pub(crate) struct SessionContext<T> {
    generation: u64,
    view: Arc<Mutex<ViewState<T>>>,
    events: broadcast::Sender<ViewerEvent<T>>,
}

impl<T: Clone> SessionContext<T> {
    /// Runs `f` if this session is still current
    ///
    /// # Returns
    /// `None` when the session has been superseded or stopped
    pub(crate) fn with_current<R>(
        &self,
        f: impl FnOnce(&mut ViewState<T>, &broadcast::Sender<ViewerEvent<T>>) -> R,
    ) -> Option<R> {
        let mut view = lock(&self.view);
        if view.generation != self.generation {
            return None;
        }
        Some(f(&mut *view, &self.events))
    }

    pub(crate) fn is_current(&self) -> bool {
        self.with_current(|_, _| ()).is_some()
    }

    /// Moves the state machine, publishing the change
    pub(crate) fn set_phase(&self, phase: StreamPhase) -> bool {
        self.with_current(|view, events| {
            if view.phase != phase {
                debug!("Stream phase {:?} -> {:?}", view.phase, phase);
                view.phase = phase;
                emit(events, ViewerEvent::Phase(phase));
            }
        })
        .is_some()
    }

    /// Queues an item for the next flush
    pub(crate) fn push(&self, item: T) -> bool {
        self.with_current(|view, _| view.buffer.push(item)).is_some()
    }

    /// Flushes pending items, publishing the appended batch
    pub(crate) fn flush(&self) -> bool {
        self.with_current(|view, events| {
            let moved = view.buffer.flush();
            if moved > 0 {
                let batch: Arc<[T]> = view.buffer.tail(moved).cloned().collect();
                debug!("Flushed {} entries ({} buffered)", moved, view.buffer.len());
                emit(events, ViewerEvent::Appended(batch));
            }
        })
        .is_some()
    }

    /// Replaces the buffer, publishing the new contents
    pub(crate) fn replace(&self, items: Vec<T>) -> bool {
        self.with_current(|view, events| {
            view.buffer.replace(items);
            let contents: Arc<[T]> = view.buffer.iter().cloned().collect();
            emit(events, ViewerEvent::Replaced(contents));
        })
        .is_some()
    }

    pub(crate) fn notify(&self, message: String) {
        self.with_current(|_, events| emit(events, ViewerEvent::Notice(message)));
    }
}

/// The viewer-owned side: state, event channel and the running session
#[derive(Debug)]
pub(crate) struct ViewHandle<T> {
    view: Arc<Mutex<ViewState<T>>>,
    events: broadcast::Sender<ViewerEvent<T>>,
    session: Option<JoinHandle<()>>,
}

impl<T: Clone> ViewHandle<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            view: Arc::new(Mutex::new(ViewState::new(capacity))),
            events,
            session: None,
        }
    }

    /// Stops any running session, clears the buffer and opens a new generation
    ///
    /// The clear is synchronous: nothing from the previous session can
    /// show up in a later flush.
    pub(crate) fn begin(&mut self) -> SessionContext<T> {
        self.stop();

        let generation = {
            let mut view = lock(&self.view);
            view.generation += 1;
            view.buffer.clear();
            view.generation
        };
        emit(&self.events, ViewerEvent::Cleared);

        SessionContext {
            generation,
            view: Arc::clone(&self.view),
            events: self.events.clone(),
        }
    }

    pub(crate) fn attach(&mut self, session: JoinHandle<()>) {
        self.session = Some(session);
    }

    /// Ends the current session; safe to call repeatedly
    ///
    /// # Returns
    /// Whether a session was actually running
    pub(crate) fn stop(&mut self) -> bool {
        let was_running = {
            let mut view = lock(&self.view);
            view.generation += 1;
            let changed = view.phase != StreamPhase::Idle;
            view.phase = StreamPhase::Idle;
            if changed {
                emit(&self.events, ViewerEvent::Phase(StreamPhase::Idle));
            }
            self.session.is_some()
        };

        if let Some(session) = self.session.take() {
            session.abort();
        }

        was_running
    }

    pub(crate) fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_finished())
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ViewerEvent<T>> {
        self.events.subscribe()
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        lock(&self.view).buffer.to_vec()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.view).buffer.len()
    }

    pub(crate) fn phase(&self) -> StreamPhase {
        lock(&self.view).phase
    }
}

impl<T> Drop for ViewHandle<T> {
    fn drop(&mut self) {
        lock(&self.view).generation += 1;
        if let Some(session) = self.session.take() {
            session.abort();
        }
    }
}
