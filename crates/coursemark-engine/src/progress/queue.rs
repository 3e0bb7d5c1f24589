/// One accumulated reading-time increment awaiting flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub chapter_key: String,
    pub seconds: u64,
}

/// Append-only queue of reading-time increments.
///
/// Entries pile up until the tracker decides to flush, then the whole queue
/// is merged by summing seconds per chapter key and drained in one step, so
/// a flush can never observe a half-cleared queue.
#[derive(Debug, Default)]
pub struct ProgressQueue {
    entries: Vec<PendingUpdate>,
}

impl ProgressQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chapter_key: &str, seconds: u64) {
        self.entries.push(PendingUpdate {
            chapter_key: chapter_key.to_string(),
            seconds,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain the queue into per-chapter summed totals, first-seen order.
    pub fn drain_merged(&mut self) -> Vec<(String, u64)> {
        let mut totals: Vec<(String, u64)> = Vec::new();
        for entry in self.entries.drain(..) {
            match totals.iter_mut().find(|(key, _)| *key == entry.chapter_key) {
                Some((_, seconds)) => *seconds += entry.seconds,
                None => totals.push((entry.chapter_key, entry.seconds)),
            }
        }
        totals
    }
}
