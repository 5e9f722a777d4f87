//! Per-lane progress display
//!
//! Each pipeline stage owns one [`Lane`]. A lane shows at most one task
//! label plus a free-form suffix (e.g. `": 42%"`) on a fixed terminal row,
//! so concurrent workers never interleave their output. Lane state is kept
//! in a [`DashMap`] and can be inspected with [`TaskProgressTracker::snapshot`].

use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Pipeline stage a progress line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Upload = 0,
    File = 1,
    Folder = 2,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Upload, Lane::File, Lane::Folder];

    fn index(self) -> usize {
        self as usize
    }
}

/// Text currently displayed on one lane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneStatus {
    pub label: String,
    pub suffix: String,
}

impl LaneStatus {
    fn render(&self) -> String {
        format!("{}{}", self.label, self.suffix)
    }
}

// ============================================================================
// TaskProgressTracker
// ============================================================================

/// Fixed-row progress registry shared by all pipeline workers
pub struct TaskProgressTracker {
    lanes: DashMap<Lane, LaneStatus>,
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl TaskProgressTracker {
    /// Tracker drawing to stderr
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Tracker that records lane state without drawing anything
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let style = ProgressStyle::with_template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bars = Lane::ALL
            .iter()
            .map(|_| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style.clone());
                bar
            })
            .collect();
        Self {
            lanes: DashMap::new(),
            multi,
            bars,
        }
    }

    fn draw(&self, lane: Lane, status: Option<&LaneStatus>) {
        let message = status.map(LaneStatus::render).unwrap_or_default();
        self.bars[lane.index()].set_message(message);
    }

    /// Shows `label` on `lane` until the returned guard is dropped
    pub fn start_task(&self, lane: Lane, label: impl Into<String>) -> TaskGuard<'_> {
        let status = LaneStatus {
            label: label.into(),
            suffix: String::new(),
        };
        self.draw(lane, Some(&status));
        self.lanes.insert(lane, status);
        TaskGuard {
            tracker: self,
            lane,
        }
    }

    /// Overwrites the text displayed on `lane`
    ///
    /// # Arguments
    /// * `lane` - Lane to update
    /// * `label` - Task label
    /// * `suffix` - Text appended to the label, e.g. `": 42%"`
    pub fn update_progress(&self, lane: Lane, label: &str, suffix: &str) {
        let status = LaneStatus {
            label: label.to_string(),
            suffix: suffix.to_string(),
        };
        self.draw(lane, Some(&status));
        self.lanes.insert(lane, status);
    }

    /// Current text of `lane`, `None` when idle
    pub fn snapshot(&self, lane: Lane) -> Option<LaneStatus> {
        self.lanes.get(&lane).map(|status| status.clone())
    }

    /// Prints a line above the progress rows
    pub fn println(&self, line: impl AsRef<str>) {
        if self.multi.println(line.as_ref()).is_err() {
            eprintln!("{}", line.as_ref());
        }
    }

    /// Clears every lane and removes the progress rows
    pub fn finish(&self) {
        self.lanes.clear();
        for bar in &self.bars {
            bar.finish_and_clear();
        }
    }

    fn clear(&self, lane: Lane) {
        self.lanes.remove(&lane);
        self.draw(lane, None);
    }
}

impl Default for TaskProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears its lane when dropped
pub struct TaskGuard<'a> {
    tracker: &'a TaskProgressTracker,
    lane: Lane,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.tracker.clear(self.lane);
    }
}
