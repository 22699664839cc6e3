use std::sync::Arc;

use chrono::TimeDelta;
use slurp::error::ErrorKind;
use slurp::loader::InstrumentedDataLoader;
use slurp::registry::Registry;
use slurp::service::{AnalysisSubmission, SlurpService};
use slurp::test_utils::analyst::WindowAnalyst;
use slurp::test_utils::at;
use slurp::test_utils::loader::StaticLoader;
use slurp::test_utils::producer::VecProducer;
use slurp::test_utils::slurper::{CollectingSlurper, GatedSlurper};
use slurp_config::shared::SlurpConfig;
use slurp_telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn active_runs_are_reported_until_they_complete() {
    init_test_tracing();

    let collected = CollectingSlurper::new();
    let gated = GatedSlurper::new(collected.clone());
    let loader = Arc::new(InstrumentedDataLoader::new(StaticLoader::new("k", 1)));

    let registry = Registry::builder()
        .analyst(
            "around",
            WindowAnalyst::new(TimeDelta::seconds(5), TimeDelta::seconds(5), gated.clone())
                .with_data_loader(loader.clone()),
        )
        .unwrap()
        .producer("ticks", VecProducer::new((0..100).map(at)))
        .unwrap()
        .data_loader("static", loader)
        .unwrap()
        .build();
    let service = SlurpService::new(registry, SlurpConfig::default()).unwrap();

    let handle = service
        .start_analysis(
            "ticks",
            &[
                AnalysisSubmission::new("around", at(20)),
                AnalysisSubmission::new("around", at(50)),
            ],
        )
        .unwrap();

    let runs = service.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.id, handle.id());
    assert_eq!(run.producer.as_deref(), Some("ticks"));
    assert_eq!(run.analysis_requests.len(), 2);
    assert_eq!(run.analysis_requests[0].analyst.as_deref(), Some("around"));
    assert_eq!(run.analysis_requests[0].time_from, at(15));
    assert_eq!(run.analysis_requests[0].time_until, at(25));
    assert_eq!(run.analysis_requests[1].time_from, at(45));

    gated.open();
    handle.wait().await.unwrap();

    assert!(service.runs().is_empty());
    let mut times = collected.times();
    times.sort();
    let expected: Vec<_> = (15..25).chain(45..55).map(at).collect();
    assert_eq!(times, expected);
    assert_eq!(
        service.data_loaders()["static"].stat.unwrap().called.count,
        20
    );
}

#[tokio::test]
async fn submissions_are_validated_before_anything_runs() {
    init_test_tracing();

    let registry = Registry::builder()
        .analyst(
            "around",
            WindowAnalyst::new(
                TimeDelta::seconds(1),
                TimeDelta::seconds(1),
                CollectingSlurper::new(),
            ),
        )
        .unwrap()
        .producer("ticks", VecProducer::new((0..10).map(at)))
        .unwrap()
        .build();
    let service = SlurpService::new(registry, SlurpConfig::default()).unwrap();

    let err = service
        .start_analysis("unknown", &[AnalysisSubmission::new("around", at(1))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProducer);

    let err = service.start_analysis("ticks", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyAnalysis);

    let err = service
        .start_analysis("ticks", &[AnalysisSubmission::new("unknown", at(1))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAnalyst);

    assert!(service.runs().is_empty());
}

#[test]
fn submissions_deserialize_from_json() {
    let submission: AnalysisSubmission =
        serde_json::from_str(r#"{"analyst": "around", "time": "1970-01-01T00:00:05Z"}"#).unwrap();

    assert_eq!(submission, AnalysisSubmission::new("around", at(5)));
}

#[tokio::test(flavor = "multi_thread")]
async fn runs_complete_without_their_handle() {
    init_test_tracing();

    let collected = CollectingSlurper::new();
    let finished = collected.finished();
    let registry = Registry::builder()
        .analyst(
            "around",
            WindowAnalyst::new(TimeDelta::seconds(1), TimeDelta::seconds(2), collected.clone()),
        )
        .unwrap()
        .producer("ticks", VecProducer::new((0..10).map(at)))
        .unwrap()
        .build();
    let service = SlurpService::new(registry, SlurpConfig::default()).unwrap();

    let handle = service
        .start_analysis("ticks", &[AnalysisSubmission::new("around", at(5))])
        .unwrap();
    drop(handle);

    finished.notified().await;
    assert_eq!(collected.times(), vec![at(4), at(5), at(6)]);
}
