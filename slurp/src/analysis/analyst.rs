use chrono::{DateTime, Utc};

use crate::analysis::request::AnalysisRequest;
use crate::types::TimeWindow;

/// Conducts analysis by describing which items it wants and who consumes them.
///
/// An analyst only builds [`AnalysisRequest`] values, running them is the job of
/// [`crate::analysis::AnalysisRequestSlurper`]. Every call must build a fresh request.
pub trait Analyst: Send + Sync {
    /// Builds a request for the analysis of a single point in time.
    fn analysis_request(&self, point_in_time: DateTime<Utc>) -> AnalysisRequest;

    /// Builds a request for the analysis of a time range.
    fn analysis_range_request(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> AnalysisRequest;

    /// Returns the window [`Analyst::analysis_request`] would ask for.
    fn range_for_analysis_request(&self, point_in_time: DateTime<Utc>) -> TimeWindow;

    /// Returns the window [`Analyst::analysis_range_request`] would ask for.
    fn range_for_analysis_range_request(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TimeWindow;
}
