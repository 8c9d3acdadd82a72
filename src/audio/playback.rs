//! Gapless playback scheduling
//!
//! Inbound audio chunks are laid end to end on the output clock. The cursor
//! and the set of still-playing chunks are updated under a single lock, so a
//! completion arriving from the output device can never race a new schedule
//! that reads a stale cursor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::pcm::PlayableBuffer;

/// Identifier of one scheduled chunk
pub type PlaybackId = u64;

/// Output clock plus the ability to start and stop buffers on it
pub trait PlaybackSink: Send + Sync {
    /// Current output-clock time in seconds
    fn current_time(&self) -> f64;

    /// Start `buffer` at output time `start_at`
    fn play_at(&self, id: PlaybackId, buffer: PlayableBuffer, start_at: f64);

    /// Stop a chunk immediately, whether or not it has started
    fn stop(&self, id: PlaybackId);
}

/// Placement of a scheduled chunk on the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    pub id: PlaybackId,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Default)]
struct QueueState {
    active: HashSet<PlaybackId>,
    next_start: f64,
    next_id: PlaybackId,
    closed: bool,
}

pub struct PlaybackQueue {
    sink: Arc<dyn PlaybackSink>,
    state: Mutex<QueueState>,
}

impl PlaybackQueue {
    pub fn new(sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(QueueState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a buffer at the cursor and advance the cursor by its duration
    ///
    /// Returns `None` once the queue has been closed.
    pub fn schedule(&self, buffer: PlayableBuffer) -> Option<ScheduledChunk> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }

        let start = state.next_start.max(self.sink.current_time());
        let end = start + buffer.duration_secs();
        let id = state.next_id;
        state.next_id += 1;

        self.sink.play_at(id, buffer, start);
        state.active.insert(id);
        state.next_start = end;

        debug!("Scheduled chunk {} at {:.3}s - {:.3}s", id, start, end);

        Some(ScheduledChunk { id, start, end })
    }

    /// A chunk finished playing on its own
    pub fn finished(&self, id: PlaybackId) {
        self.lock().active.remove(&id);
    }

    /// Stop everything scheduled and reset the cursor to the output clock
    ///
    /// Returns the number of chunks stopped.
    pub fn interrupt(&self) -> usize {
        let mut state = self.lock();
        let stopped = self.drain(&mut state);

        debug!("Interrupted playback: {} chunks stopped", stopped);

        stopped
    }

    /// Stop everything and refuse further schedules
    pub fn close(&self) {
        let mut state = self.lock();
        let stopped = self.drain(&mut state);
        state.closed = true;

        debug!("Closed playback: {} chunks stopped", stopped);
    }

    fn drain(&self, state: &mut QueueState) -> usize {
        let stopped = state.active.len();
        for id in state.active.drain() {
            self.sink.stop(id);
        }
        state.next_start = self.sink.current_time();
        stopped
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Where the next chunk would start if nothing else happens
    pub fn cursor(&self) -> f64 {
        self.lock().next_start
    }
}
