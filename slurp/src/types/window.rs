use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Half open time interval `[from, until)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { from, until }
    }

    /// Returns `true` when `from <= at < until`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.until
    }

    /// Returns `true` when no instant can fall inside the window.
    pub fn is_empty(&self) -> bool {
        self.from >= self.until
    }

    /// Returns the smallest window spanning every given window, i.e. the earliest `from` and
    /// the latest `until`, or `None` when there are no windows.
    pub fn covering<'a, I>(windows: I) -> Option<TimeWindow>
    where
        I: IntoIterator<Item = &'a TimeWindow>,
    {
        windows.into_iter().fold(None, |covering, window| {
            Some(match covering {
                None => *window,
                Some(covering) => TimeWindow {
                    from: covering.from.min(window.from),
                    until: covering.until.max(window.until),
                },
            })
        })
    }
}
