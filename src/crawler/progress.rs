use tracing::info;

/// Counts completed units of a crawl step and logs `n/total`.
#[derive(Debug)]
pub struct ProgressTracker {
    description: String,
    total: usize,
    done: usize,
}

impl ProgressTracker {
    pub fn new(description: impl Into<String>, total: usize) -> Self {
        let tracker = Self {
            description: description.into(),
            total,
            done: 0,
        };
        info!("{}: 0/{}", tracker.description, tracker.total);
        tracker
    }

    pub fn advance(&mut self) {
        self.done = (self.done + 1).min(self.total);
        info!("{}: {}/{}", self.description, self.done, self.total);
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}
