//! Bounded history of recent events.
//!
//! Newcomers receive a copy of the archive when they subscribe so they can
//! see what was said before they arrived. Only the hub task ever mutates it.

use std::collections::VecDeque;

use crate::event::Event;

/// Default number of events retained for newcomers.
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 20;

/// A FIFO of the most recent events, oldest first.
#[derive(Clone, Debug)]
pub struct Archive {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Archive {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ARCHIVE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest entry once the archive is full.
    ///
    /// Returns the event that fell out of the history, if any. With a
    /// capacity of zero nothing is retained and the pushed event comes
    /// straight back.
    pub fn push(&mut self, event: Event) -> Option<Event> {
        if self.capacity == 0 {
            return Some(event);
        }

        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Copy of the current history in publish order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}
