//! Run coordination on top of a [`Registry`].
//!
//! [`SlurpService`] turns analysis submissions made of registry keys into analysis runs: it
//! validates the submission, builds fresh analysis requests, starts the producer and the
//! [`AnalysisRequestSlurper`] and tracks the run until it completes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use slurp_config::shared::SlurpConfig;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::{AnalysisRequest, AnalysisRequestSlurper};
use crate::bail;
use crate::concurrency::rate::ChannelStat;
use crate::describe::Description;
use crate::error::{ErrorKind, SlurpResult};
use crate::loader::DataLoaderStat;
use crate::metrics::{PRODUCER_LABEL, SLURP_RUNS_ACTIVE, SLURP_RUNS_STARTED_TOTAL};
use crate::producer::MergeProducer;
use crate::registry::{ProducerId, Registry};
use crate::slurp_error;
use crate::slurper::Slurper;
use crate::types::{TimeWindow, item_channel};

/// Name, description and, for data loaders, statistics of a registered capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<DataLoaderStat>,
}

impl CapabilityReport {
    fn new(description: &Description, stat: Option<DataLoaderStat>) -> Self {
        Self {
            name: description.name.clone(),
            description: description.description.clone(),
            stat,
        }
    }
}

/// One analysis asked for in a run: a registered analyst and the point in time to analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSubmission {
    pub analyst: String,
    pub time: DateTime<Utc>,
}

impl AnalysisSubmission {
    pub fn new(analyst: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            analyst: analyst.into(),
            time,
        }
    }
}

/// Live state of an analysis request of an active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequestReport {
    pub analyst: Option<String>,
    pub time_from: DateTime<Utc>,
    pub time_until: DateTime<Utc>,
    pub stat: ChannelStat,
}

/// Live state of an active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub id: Uuid,
    pub started: DateTime<Utc>,
    pub producer: Option<String>,
    pub stat: ChannelStat,
    pub analysis_requests: Vec<AnalysisRequestReport>,
}

/// Handle on a started run.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    join_handle: JoinHandle<()>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the run to complete.
    pub async fn wait(self) -> SlurpResult<()> {
        self.join_handle
            .await
            .map_err(|err| slurp_error!(ErrorKind::SlurperPanic, "Analysis run failed", err))
    }
}

#[derive(Debug)]
struct ActiveRun {
    started: DateTime<Utc>,
    producer: ProducerId,
    slurper: Arc<AnalysisRequestSlurper>,
}

type ActiveRuns = Arc<RwLock<HashMap<Uuid, ActiveRun>>>;

/// Removes a run from the active set when its task ends, panics included.
struct ActiveRunGuard {
    id: Uuid,
    runs: ActiveRuns,
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        gauge!(SLURP_RUNS_ACTIVE).decrement(1.0);
    }
}

/// Starts and tracks analysis runs over the capabilities of a [`Registry`].
#[derive(Debug, Clone)]
pub struct SlurpService {
    registry: Arc<Registry>,
    config: SlurpConfig,
    runs: ActiveRuns,
}

impl SlurpService {
    /// Creates a service, failing when `config` is invalid.
    pub fn new(registry: Registry, config: SlurpConfig) -> SlurpResult<Self> {
        config.validate()?;

        Ok(Self {
            registry: Arc::new(registry),
            config,
            runs: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &SlurpConfig {
        &self.config
    }

    pub fn analysts(&self) -> BTreeMap<String, CapabilityReport> {
        self.registry
            .analysts()
            .map(|(_, entry)| {
                (
                    entry.key().to_string(),
                    CapabilityReport::new(entry.description(), None),
                )
            })
            .collect()
    }

    pub fn producers(&self) -> BTreeMap<String, CapabilityReport> {
        self.registry
            .producers()
            .map(|(_, entry)| {
                (
                    entry.key().to_string(),
                    CapabilityReport::new(entry.description(), None),
                )
            })
            .collect()
    }

    /// Returns every data loader with its current statistics.
    pub fn data_loaders(&self) -> BTreeMap<String, CapabilityReport> {
        self.registry
            .data_loaders()
            .map(|(_, entry)| {
                (
                    entry.key().to_string(),
                    CapabilityReport::new(entry.description(), Some(entry.capability().stat())),
                )
            })
            .collect()
    }

    /// Returns the window the analyst registered under `analyst` would request for `time`.
    pub fn analysis_range(&self, analyst: &str, time: DateTime<Utc>) -> SlurpResult<TimeWindow> {
        let Some(entry) = self
            .registry
            .analyst_id(analyst)
            .and_then(|id| self.registry.analyst(id))
        else {
            bail!(ErrorKind::UnknownAnalyst, "Unknown analyst", analyst);
        };

        Ok(entry.capability().range_for_analysis_request(time))
    }

    /// Merges the producers registered under `producers` into one time ordered producer.
    pub fn merge_producers(&self, producers: &[&str]) -> SlurpResult<MergeProducer> {
        let mut capabilities = Vec::with_capacity(producers.len());
        for producer in producers {
            let Some(entry) = self
                .registry
                .producer_id(producer)
                .and_then(|id| self.registry.producer(id))
            else {
                bail!(ErrorKind::UnknownProducer, "Unknown producer", producer);
            };

            capabilities.push(entry.capability().clone());
        }

        Ok(MergeProducer::from_config(&self.config, capabilities))
    }

    /// Validates a submission and starts the corresponding run on the current tokio runtime.
    ///
    /// Nothing is spawned when the producer or one of the analysts is unknown, when no analysis
    /// is submitted or when there is no runtime to spawn on.
    pub fn start_analysis(
        &self,
        producer: &str,
        submissions: &[AnalysisSubmission],
    ) -> SlurpResult<RunHandle> {
        let Some(producer_id) = self.registry.producer_id(producer) else {
            bail!(ErrorKind::UnknownProducer, "Unknown producer", producer);
        };
        let Some(producer_entry) = self.registry.producer(producer_id) else {
            bail!(ErrorKind::UnknownProducer, "Unknown producer", producer);
        };

        if submissions.is_empty() {
            bail!(ErrorKind::EmptyAnalysis, "No analysis submitted");
        }

        let mut requests = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let Some(analyst_id) = self.registry.analyst_id(&submission.analyst) else {
                bail!(ErrorKind::UnknownAnalyst, "Unknown analyst", submission.analyst);
            };
            let Some(analyst) = self.registry.analyst(analyst_id) else {
                bail!(ErrorKind::UnknownAnalyst, "Unknown analyst", submission.analyst);
            };

            requests.push(
                analyst
                    .capability()
                    .analysis_request(submission.time)
                    .with_analyst(analyst_id),
            );
        }

        let Some(window) = AnalysisRequest::covering_window(&requests) else {
            bail!(ErrorKind::EmptyAnalysis, "No analysis submitted");
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => bail!(
                ErrorKind::RuntimeUnavailable,
                "Analysis runs must be started from a tokio runtime",
                err
            ),
        };

        let producer_capability = producer_entry.capability().clone();
        let slurper = Arc::new(
            AnalysisRequestSlurper::new(requests).with_rate_config(self.config.rate.clone()),
        );

        let id = Uuid::new_v4();
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ActiveRun {
                    started: Utc::now(),
                    producer: producer_id,
                    slurper: slurper.clone(),
                },
            );
        let guard = ActiveRunGuard {
            id,
            runs: self.runs.clone(),
        };

        counter!(SLURP_RUNS_STARTED_TOTAL, PRODUCER_LABEL => producer.to_string()).increment(1);
        gauge!(SLURP_RUNS_ACTIVE).increment(1.0);
        info!(
            run_id = %id,
            producer,
            analyses = submissions.len(),
            from = %window.from,
            until = %window.until,
            "starting analysis run"
        );

        let slurp_buffer = self.config.slurp_buffer;
        let join_handle = runtime.spawn(async move {
            let _guard = guard;

            let (tx, rx) = item_channel(slurp_buffer);
            let production = producer_capability.produce(window.from, window.until);
            let production = tokio::spawn(async move {
                production.send_items(&tx).await;
            });

            slurper.slurp(rx).await;

            if let Err(err) = production.await {
                let err =
                    slurp_error!(ErrorKind::ProducerPanic, "Producer of analysis run failed", err);
                error!(run_id = %id, error = %err, "analysis run lost part of its items");
            }

            info!(run_id = %id, count = slurper.slurp_stat().count, "analysis run finished");
        });

        Ok(RunHandle { id, join_handle })
    }

    /// Returns the active runs, oldest first.
    pub fn runs(&self) -> Vec<RunReport> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);

        let mut reports: Vec<RunReport> = runs
            .iter()
            .map(|(id, run)| self.run_report(*id, run))
            .collect();
        reports.sort_by_key(|report| (report.started, report.id));

        reports
    }

    fn run_report(&self, id: Uuid, run: &ActiveRun) -> RunReport {
        let analysis_requests = run
            .slurper
            .requests()
            .iter()
            .zip(run.slurper.request_stat())
            .map(|(request, stat)| AnalysisRequestReport {
                analyst: request
                    .analyst()
                    .and_then(|analyst| self.registry.analyst_key(analyst))
                    .map(str::to_string),
                time_from: request.window().from,
                time_until: request.window().until,
                stat,
            })
            .collect();

        RunReport {
            id,
            started: run.started,
            producer: self
                .registry
                .producer_key(run.producer)
                .map(str::to_string),
            stat: run.slurper.slurp_stat(),
            analysis_requests,
        }
    }
}
