pub mod mapping;
pub mod queue;
pub mod store;

use crate::outline::OutlineItem;
use mapping::{ChapterInfo, build_chapter_mapping};
use queue::ProgressQueue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use store::{LearningProgress, LearningStatus, ProgressStore, ProgressUpdate};

/// Time source seam so tick arithmetic is testable without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Queue length that triggers a flush on its own.
const FLUSH_THRESHOLD: usize = 3;
/// Accumulated reading time beyond which a chapter counts as half read.
const HALFWAY_SECONDS: u64 = 30;

/// Accumulates time-on-chapter from the active-heading signal and reports it
/// to a [`ProgressStore`] in batched increments.
///
/// Host contract: feed [`ReadingTracker::on_active_anchor`] whenever the
/// scroll-sync engine reports a change, call [`ReadingTracker::tick`] on a
/// 60-second cadence while the view is mounted, and
/// [`ReadingTracker::shutdown`] before teardown. Store failures are logged
/// and swallowed; local accumulation continues regardless, so a flaky
/// backend never interrupts reading.
pub struct ReadingTracker<C: Clock = SystemClock> {
    store: Arc<dyn ProgressStore>,
    clock: C,
    course_id: u64,
    chapter_mapping: HashMap<String, ChapterInfo>,
    current_chapter_key: Option<String>,
    current_progress: Option<LearningProgress>,
    /// Cumulative seconds on the current chapter, for display.
    reading_time_seconds: u64,
    baseline: Instant,
    pending: ProgressQueue,
    tracking_enabled: bool,
}

impl ReadingTracker<SystemClock> {
    pub fn new(store: Arc<dyn ProgressStore>, course_id: u64) -> Self {
        Self::with_clock(store, course_id, SystemClock)
    }
}

impl<C: Clock> ReadingTracker<C> {
    pub fn with_clock(store: Arc<dyn ProgressStore>, course_id: u64, clock: C) -> Self {
        let baseline = clock.now();
        Self {
            store,
            clock,
            course_id,
            chapter_mapping: HashMap::new(),
            current_chapter_key: None,
            current_progress: None,
            reading_time_seconds: 0,
            baseline,
            pending: ProgressQueue::new(),
            tracking_enabled: true,
        }
    }

    pub fn current_chapter_key(&self) -> Option<&str> {
        self.current_chapter_key.as_deref()
    }

    pub fn current_progress(&self) -> Option<&LearningProgress> {
        self.current_progress.as_ref()
    }

    pub fn reading_time_seconds(&self) -> u64 {
        self.reading_time_seconds
    }

    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracking_enabled = enabled;
    }

    /// Rebuild the chapter mapping after an outline change. Keys are
    /// positional, so this must run on every parse pass.
    pub fn set_outline(&mut self, outline: &[OutlineItem]) {
        self.chapter_mapping = build_chapter_mapping(outline);
    }

    pub fn chapter_info(&self, anchor_id: &str) -> Option<&ChapterInfo> {
        self.chapter_mapping.get(anchor_id)
    }

    /// Active-heading change: flush the chapter being left, then fetch (or
    /// default-initialize) the new one and restart the baseline clock.
    /// Anchors with no chapter mapping are ignored.
    pub fn on_active_anchor(&mut self, anchor_id: &str) {
        let Some(info) = self.chapter_mapping.get(anchor_id) else {
            return;
        };
        let key = info.key.clone();
        if self.current_chapter_key.as_deref() == Some(key.as_str()) {
            return;
        }

        if self.current_chapter_key.is_some() {
            self.record_elapsed(true);
        }

        self.current_chapter_key = Some(key.clone());
        self.fetch_current(&key);
        self.baseline = self.clock.now();
    }

    /// Periodic cadence call; hosts run this every 60 seconds while mounted.
    pub fn tick(&mut self) {
        self.record_elapsed(false);
    }

    /// Force accumulated time out to the store.
    pub fn flush(&mut self) {
        self.record_elapsed(true);
    }

    /// Mark the current chapter COMPLETED at 100%. Flushes accumulated time
    /// first so the final record includes it.
    pub fn mark_completed(&mut self) {
        let Some(key) = self.current_chapter_key.clone() else {
            return;
        };
        self.record_elapsed(true);
        self.send(ProgressUpdate {
            course_id: self.course_id,
            chapter_key: key,
            status: Some(LearningStatus::Completed),
            progress_percentage: Some(100),
            reading_time_seconds: None,
            completed: true,
        });
    }

    /// Final flush before the host detaches its timer and listeners.
    pub fn shutdown(&mut self) {
        self.record_elapsed(true);
    }

    fn fetch_current(&mut self, chapter_key: &str) {
        match self.store.fetch_chapter(self.course_id, chapter_key) {
            Ok(Some(progress)) => {
                self.reading_time_seconds = progress.reading_time_seconds;
                self.current_progress = Some(progress);
            }
            Ok(None) => {
                self.reading_time_seconds = 0;
                self.current_progress =
                    Some(LearningProgress::started(self.course_id, chapter_key));
            }
            Err(e) => {
                // Keep tracking locally against a fresh record.
                log::warn!("failed to fetch progress for chapter {chapter_key}: {e}");
                self.reading_time_seconds = 0;
                self.current_progress =
                    Some(LearningProgress::started(self.course_id, chapter_key));
            }
        }
    }

    fn record_elapsed(&mut self, force: bool) {
        if !self.tracking_enabled {
            return;
        }
        let Some(current_key) = self.current_chapter_key.clone() else {
            return;
        };

        let now = self.clock.now();
        let elapsed = now.duration_since(self.baseline).as_secs();
        self.baseline = now;
        if elapsed == 0 && !force {
            return;
        }

        self.reading_time_seconds += elapsed;
        self.pending.push(&current_key, elapsed);

        if force || self.pending.len() >= FLUSH_THRESHOLD {
            self.flush_pending(&current_key);
        }
    }

    /// Drain the queue and send one merged update per chapter key. The
    /// current chapter's update carries the status and the percentage
    /// heuristic; chapters left earlier get a bare seconds increment.
    fn flush_pending(&mut self, current_key: &str) {
        for (chapter_key, seconds) in self.pending.drain_merged() {
            if seconds == 0 {
                continue;
            }
            let is_current = chapter_key == current_key;
            self.send(ProgressUpdate {
                course_id: self.course_id,
                chapter_key,
                status: is_current.then_some(LearningStatus::InProgress),
                progress_percentage: is_current.then(|| {
                    if self.reading_time_seconds > HALFWAY_SECONDS {
                        50
                    } else {
                        10
                    }
                }),
                reading_time_seconds: Some(seconds),
                completed: false,
            });
        }
    }

    fn send(&mut self, update: ProgressUpdate) {
        let chapter_key = update.chapter_key.clone();
        match self.store.update(&update) {
            Ok(progress) => {
                if self.current_chapter_key.as_deref() == Some(chapter_key.as_str()) {
                    self.current_progress = Some(progress);
                }
            }
            Err(e) => {
                log::warn!("failed to update progress for chapter {chapter_key}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::parse_outline;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    struct FakeClock {
        now: Rc<Cell<Instant>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Rc::new(Cell::new(Instant::now())),
            }
        }

        fn advance_secs(&self, seconds: u64) {
            self.now
                .set(self.now.get() + Duration::from_secs(seconds));
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        updates: Mutex<Vec<ProgressUpdate>>,
        fail_fetch: bool,
    }

    impl RecordingStore {
        fn sent(&self) -> Vec<ProgressUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl ProgressStore for RecordingStore {
        fn fetch_chapter(
            &self,
            _course_id: u64,
            chapter_key: &str,
        ) -> Result<Option<LearningProgress>, store::ProgressStoreError> {
            if self.fail_fetch {
                return Err(store::ProgressStoreError::Backend(format!(
                    "unreachable fetching {chapter_key}"
                )));
            }
            Ok(None)
        }

        fn update(
            &self,
            update: &ProgressUpdate,
        ) -> Result<LearningProgress, store::ProgressStoreError> {
            self.updates.lock().unwrap().push(update.clone());
            let mut progress = LearningProgress::started(update.course_id, &update.chapter_key);
            progress.reading_time_seconds = update.reading_time_seconds.unwrap_or(0);
            Ok(progress)
        }
    }

    fn tracker_on(
        markdown: &str,
    ) -> (ReadingTracker<FakeClock>, Arc<RecordingStore>, FakeClock) {
        let store = Arc::new(RecordingStore::default());
        let clock = FakeClock::new();
        let mut tracker = ReadingTracker::with_clock(store.clone(), 42, clock.clone());
        tracker.set_outline(&parse_outline(markdown));
        (tracker, store, clock)
    }

    #[test]
    fn test_first_visit_initializes_default_record() {
        let (mut tracker, _store, _clock) = tracker_on("# A\n## B");

        tracker.on_active_anchor("a");

        assert_eq!(tracker.current_chapter_key(), Some("1"));
        let progress = tracker.current_progress().unwrap();
        assert_eq!(progress.status, LearningStatus::InProgress);
        assert_eq!(progress.progress_percentage, 0);
        assert_eq!(progress.reading_time_seconds, 0);
    }

    #[test]
    fn test_unmapped_anchor_is_ignored() {
        let (mut tracker, store, _clock) = tracker_on("# A");

        tracker.on_active_anchor("nonexistent");

        assert_eq!(tracker.current_chapter_key(), None);
        assert!(store.sent().is_empty());
    }

    #[test]
    fn test_tick_below_threshold_queues_without_sending() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");

        clock.advance_secs(5);
        tracker.tick();
        clock.advance_secs(7);
        tracker.tick();

        assert!(store.sent().is_empty());
        assert_eq!(tracker.reading_time_seconds(), 12);
    }

    #[test]
    fn test_reaching_queue_threshold_sends_merged_update() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");

        for seconds in [5, 7, 3] {
            clock.advance_secs(seconds);
            tracker.tick();
        }

        let sent = store.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chapter_key, "1");
        assert_eq!(sent[0].reading_time_seconds, Some(15));
        assert_eq!(sent[0].status, Some(LearningStatus::InProgress));
    }

    #[test]
    fn test_chapter_switch_force_flushes_merged_time_before_switching() {
        let (mut tracker, store, clock) = tracker_on("# A\n# B");
        tracker.on_active_anchor("a");

        clock.advance_secs(5);
        tracker.tick();
        clock.advance_secs(7);
        tracker.tick();
        // Queue holds {"1": 5}, {"1": 7}; leaving chapter 1 flushes 12.
        tracker.on_active_anchor("b");

        let sent = store.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chapter_key, "1");
        assert_eq!(sent[0].reading_time_seconds, Some(12));
        assert_eq!(tracker.current_chapter_key(), Some("2"));
        // Queue cleared with the flush: the next threshold starts from zero.
        assert!(tracker.pending.is_empty());
    }

    #[test]
    fn test_flush_sends_every_chapter_left_in_the_queue() {
        let (mut tracker, store, clock) = tracker_on("# A\n# B");
        tracker.on_active_anchor("a");
        clock.advance_secs(5);
        tracker.tick();

        tracker.on_active_anchor("b"); // flushes chapter 1 (5s)
        clock.advance_secs(3);
        tracker.shutdown(); // flushes chapter 2 (3s)

        let sent = store.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            (sent[0].chapter_key.as_str(), sent[0].reading_time_seconds),
            ("1", Some(5))
        );
        assert_eq!(
            (sent[1].chapter_key.as_str(), sent[1].reading_time_seconds),
            ("2", Some(3))
        );
        // Each update was flushed while its chapter was current, so both
        // carry the in-progress status.
        assert_eq!(sent[0].status, Some(LearningStatus::InProgress));
        assert_eq!(sent[1].status, Some(LearningStatus::InProgress));
    }

    #[test]
    fn test_percentage_heuristic_crosses_at_thirty_seconds() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");

        clock.advance_secs(20);
        tracker.flush();
        clock.advance_secs(25);
        tracker.flush();

        let sent = store.sent();
        assert_eq!(sent[0].progress_percentage, Some(10));
        // 45 cumulative seconds by the second flush.
        assert_eq!(sent[1].progress_percentage, Some(50));
    }

    #[test]
    fn test_forced_flush_with_no_elapsed_time_sends_nothing() {
        let (mut tracker, store, _clock) = tracker_on("# A");
        tracker.on_active_anchor("a");

        tracker.flush();

        assert!(store.sent().is_empty());
        assert!(tracker.pending.is_empty());
    }

    #[test]
    fn test_mark_completed_flushes_then_reports_terminal_state() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");
        clock.advance_secs(10);

        tracker.mark_completed();

        let sent = store.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].reading_time_seconds, Some(10));
        assert!(sent[1].completed);
        assert_eq!(sent[1].status, Some(LearningStatus::Completed));
        assert_eq!(sent[1].progress_percentage, Some(100));
    }

    #[test]
    fn test_disabled_tracking_accumulates_nothing() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");
        tracker.set_tracking_enabled(false);

        clock.advance_secs(30);
        tracker.tick();
        tracker.shutdown();

        assert!(store.sent().is_empty());
        assert_eq!(tracker.reading_time_seconds(), 0);
    }

    #[test]
    fn test_fetch_failure_is_swallowed_and_tracking_continues() {
        let store = Arc::new(RecordingStore {
            fail_fetch: true,
            ..RecordingStore::default()
        });
        let clock = FakeClock::new();
        let mut tracker = ReadingTracker::with_clock(store.clone(), 42, clock.clone());
        tracker.set_outline(&parse_outline("# A"));

        tracker.on_active_anchor("a");
        clock.advance_secs(8);
        tracker.shutdown();

        // The failed fetch did not stop local accumulation or the flush.
        let sent = store.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reading_time_seconds, Some(8));
    }

    #[test]
    fn test_same_chapter_anchor_change_does_not_reset_accumulation() {
        let (mut tracker, store, clock) = tracker_on("# A");
        tracker.on_active_anchor("a");
        clock.advance_secs(9);

        tracker.on_active_anchor("a");
        tracker.shutdown();

        let sent = store.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reading_time_seconds, Some(9));
    }
}
