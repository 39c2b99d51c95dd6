/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

/// Consecutive-failure counters for the capture loop.
///
/// Empty or closed reads and read errors are counted separately, each
/// against its own limit. Any successful read resets both.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    read_failures: u32,
    errors: u32,
    read_failure_limit: u32,
    error_limit: u32,
}

impl FailureTracker {
    pub fn new(read_failure_limit: u32, error_limit: u32) -> Self {
        Self {
            read_failures: 0,
            errors: 0,
            read_failure_limit: read_failure_limit.max(1),
            error_limit: error_limit.max(1),
        }
    }

    pub fn on_success(&mut self) {
        self.read_failures = 0;
        self.errors = 0;
    }

    pub fn on_read_failure(&mut self) -> Verdict {
        self.read_failures += 1;
        verdict(self.read_failures, self.read_failure_limit)
    }

    pub fn on_error(&mut self) -> Verdict {
        self.errors += 1;
        verdict(self.errors, self.error_limit)
    }

    pub fn read_failures(&self) -> u32 {
        self.read_failures
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }
}

fn verdict(count: u32, limit: u32) -> Verdict {
    if count >= limit {
        Verdict::Stop
    } else {
        Verdict::Continue
    }
}
