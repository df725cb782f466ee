//! Bounded log of recently received frames.

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::Mutex;

/// Default number of frames kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// Longest frame text stored, in bytes.
const MAX_TEXT_LEN: usize = 2048;

/// One received frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentEntry {
    /// When the frame arrived.
    pub received_at: SystemTime,
    /// Frame text, truncated.
    pub text: String,
}

/// Ring buffer of the most recent inbound frames.
#[derive(Debug)]
pub struct RecentLog {
    capacity: usize,
    entries: Mutex<VecDeque<RecentEntry>>,
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RecentLog {
    /// Creates a log keeping at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Records a frame, evicting the oldest one if full.
    pub fn push(&self, text: &str) {
        if self.capacity == 0 {
            return;
        }
        let entry = RecentEntry {
            received_at: SystemTime::now(),
            text: truncate(text, MAX_TEXT_LEN).to_string(),
        };
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the stored frames, oldest first.
    pub fn snapshot(&self) -> Vec<RecentEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns the number of stored frames.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
