use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::analysis::{AnalysisRequest, Analyst};
use crate::describe::Describe;
use crate::loader::DataLoader;
use crate::slurper::Slurper;
use crate::types::TimeWindow;

/// Analyst asking for a fixed span of time around a point in time.
///
/// Every request it builds is consumed by the same slurper.
#[derive(Clone)]
pub struct WindowAnalyst {
    before: TimeDelta,
    after: TimeDelta,
    data_loaders: Vec<Arc<dyn DataLoader>>,
    slurper: Arc<dyn Slurper>,
}

impl WindowAnalyst {
    /// Asks for `[point - before, point + after)`.
    pub fn new<S>(before: TimeDelta, after: TimeDelta, slurper: S) -> Self
    where
        S: Slurper + 'static,
    {
        Self {
            before,
            after,
            data_loaders: Vec::new(),
            slurper: Arc::new(slurper),
        }
    }

    pub fn with_data_loader(mut self, data_loader: Arc<dyn DataLoader>) -> Self {
        self.data_loaders.push(data_loader);
        self
    }

    fn request(&self, window: TimeWindow) -> AnalysisRequest {
        AnalysisRequest::new(window, self.slurper.clone())
            .with_data_loaders(self.data_loaders.clone())
    }
}

impl Analyst for WindowAnalyst {
    fn analysis_request(&self, point_in_time: DateTime<Utc>) -> AnalysisRequest {
        self.request(self.range_for_analysis_request(point_in_time))
    }

    fn analysis_range_request(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> AnalysisRequest {
        self.request(self.range_for_analysis_range_request(from, until))
    }

    fn range_for_analysis_request(&self, point_in_time: DateTime<Utc>) -> TimeWindow {
        TimeWindow::new(point_in_time - self.before, point_in_time + self.after)
    }

    fn range_for_analysis_range_request(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TimeWindow {
        TimeWindow::new(from - self.before, until + self.after)
    }
}

impl Describe for WindowAnalyst {
    fn name(&self) -> &str {
        "Window analyst"
    }

    fn description(&self) -> &str {
        "Collects the items around a point in time"
    }
}
