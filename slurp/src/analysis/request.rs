use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::loader::DataLoader;
use crate::registry::AnalystId;
use crate::slurper::Slurper;
use crate::types::TimeWindow;

/// What an analyst wants to consume: a time window, the data loaders that must enrich items
/// and the slurper consuming them.
#[derive(Clone)]
pub struct AnalysisRequest {
    window: TimeWindow,
    data_loaders: Vec<Arc<dyn DataLoader>>,
    slurper: Arc<dyn Slurper>,
    analyst: Option<AnalystId>,
}

impl AnalysisRequest {
    pub fn new(window: TimeWindow, slurper: Arc<dyn Slurper>) -> Self {
        Self {
            window,
            data_loaders: Vec::new(),
            slurper,
            analyst: None,
        }
    }

    pub fn with_data_loaders(mut self, data_loaders: Vec<Arc<dyn DataLoader>>) -> Self {
        self.data_loaders = data_loaders;
        self
    }

    pub fn with_data_loader(mut self, data_loader: Arc<dyn DataLoader>) -> Self {
        self.data_loaders.push(data_loader);
        self
    }

    /// Records the registered analyst that built this request, used for reporting.
    pub fn with_analyst(mut self, analyst: AnalystId) -> Self {
        self.analyst = Some(analyst);
        self
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn data_loaders(&self) -> &[Arc<dyn DataLoader>] {
        &self.data_loaders
    }

    pub fn slurper(&self) -> &Arc<dyn Slurper> {
        &self.slurper
    }

    pub fn analyst(&self) -> Option<AnalystId> {
        self.analyst
    }

    /// Returns `true` when an item at `at` belongs to this request.
    pub fn wants(&self, at: DateTime<Utc>) -> bool {
        self.window.contains(at)
    }

    /// Returns the window spanning every request, `None` without requests.
    pub fn covering_window(requests: &[AnalysisRequest]) -> Option<TimeWindow> {
        TimeWindow::covering(requests.iter().map(AnalysisRequest::window))
    }
}

impl std::fmt::Debug for AnalysisRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("window", &self.window)
            .field("data_loaders", &self.data_loaders.len())
            .field("analyst", &self.analyst)
            .finish_non_exhaustive()
    }
}
