/// Scan state definitions for tracking crawl progress
///
/// This module defines the lifecycle a scan moves through and the transient
/// snapshot the controller exposes to callers.
use std::fmt;

/// Lifecycle status of a scan for one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanStatus {
    /// No scan has run in this process
    #[default]
    Idle,

    /// A scan is actively fetching
    Running,

    /// The user cancelled the scan; stored progress is kept
    Paused,

    /// The scan stopped on a fatal condition
    Error,

    /// Every page and eligible thread was fetched
    Complete,
}

impl ScanStatus {
    /// Returns true if a new run may begin from this status
    pub fn can_start(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if this status ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paused | Self::Error | Self::Complete)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Complete => "complete",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "error" => Some(Self::Error),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Crawl strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    /// Page through top-level threads, expanding promising ones as they appear
    Smart,

    /// Expand every thread that still has unfetched replies
    Deep,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one container's scan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanState {
    /// Comments written during the current run
    pub fetched_count: u64,

    pub status: ScanStatus,

    /// Strategy of the current or last run
    pub mode: Option<ScanMode>,

    /// Set only while `status` is `Error`
    pub error: Option<String>,
}

impl ScanState {
    /// Starts a new run, resetting the counter and any previous error
    pub fn begin(&mut self, mode: ScanMode) {
        self.fetched_count = 0;
        self.status = ScanStatus::Running;
        self.mode = Some(mode);
        self.error = None;
    }

    /// Adds a written batch to the run counter
    pub fn record_fetched(&mut self, count: u64) {
        self.fetched_count += count;
    }

    /// Running -> paused. Any other status is left alone.
    pub fn pause(&mut self) -> bool {
        if self.status == ScanStatus::Running {
            self.status = ScanStatus::Paused;
            true
        } else {
            false
        }
    }

    /// Running -> complete
    pub fn complete(&mut self) {
        if self.status == ScanStatus::Running {
            self.status = ScanStatus::Complete;
        }
    }

    /// Running -> error, keeping the message
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status == ScanStatus::Running {
            self.status = ScanStatus::Error;
            self.error = Some(message.into());
        }
    }
}
