//! Fixed-capacity sample window.
//!
//! Holds the most recent samples of one kind in arrival order. Appending and
//! evicting are separate steps so a caller can look at the window while it
//! briefly holds `capacity + 1` samples (the kinematic update reads the
//! oldest sample at that point).
//!
//! Backed by a ring of `capacity + 1` slots: append, evict, `latest` and
//! `oldest` are all O(1) and nothing is reallocated after construction.

use crate::error::{AppResult, StreamError};

/// Samples covering roughly one second at `sample_rate_hz`.
///
/// `ceil(1000 / rate)`, never less than one.
pub fn window_capacity(sample_rate_hz: u32) -> usize {
    1000u32.div_ceil(sample_rate_hz.max(1)).max(1) as usize
}

/// Ring buffer of the most recent samples.
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
    capacity: usize,
}

impl<T> SampleWindow<T> {
    /// Create an empty window retaining `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = std::iter::repeat_with(|| None)
            .take(capacity + 1)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            head: 0,
            len: 0,
            capacity,
        }
    }

    /// Create a window sized for `sample_rate_hz`
    pub fn for_sample_rate(sample_rate_hz: u32) -> Self {
        Self::new(window_capacity(sample_rate_hz))
    }

    /// Append at the newest end.
    ///
    /// The window may temporarily hold `capacity + 1` samples. Appending
    /// beyond that overwrites the oldest and returns it.
    pub fn append(&mut self, sample: T) -> Option<T> {
        let overwritten = if self.len == self.slots.len() {
            self.pop_oldest()
        } else {
            None
        };
        let index = self.slot(self.len);
        self.slots[index] = Some(sample);
        self.len += 1;
        overwritten
    }

    /// Drop the oldest sample if the window holds more than `capacity`.
    pub fn evict_if_over_capacity(&mut self) -> Option<T> {
        if self.len > self.capacity {
            self.pop_oldest()
        } else {
            None
        }
    }

    /// Most recently appended sample
    pub fn latest(&self) -> AppResult<&T> {
        if self.len == 0 {
            return Err(StreamError::EmptyWindow);
        }
        self.slots[self.slot(self.len - 1)]
            .as_ref()
            .ok_or(StreamError::EmptyWindow)
    }

    /// Oldest retained sample
    pub fn oldest(&self) -> AppResult<&T> {
        if self.len == 0 {
            return Err(StreamError::EmptyWindow);
        }
        self.slots[self.head].as_ref().ok_or(StreamError::EmptyWindow)
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.slots[self.slot(i)].as_ref())
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.len
    }

    /// True before the first append
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Retention capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn pop_oldest(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let evicted = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        evicted
    }

    fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % self.slots.len()
    }
}
