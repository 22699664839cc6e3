use std::sync::Arc;

use serde_json::{Value, json};
use slurp::analysis::{AnalysisRequest, AnalysisRequestSlurper};
use slurp::loader::{DataLoader, DataLoaderFn, InstrumentedDataLoader, LoadedData};
use slurp::producer::{MergeProducer, Producer};
use slurp::slurper::{CompositionSlurper, Slurper};
use slurp::test_utils::at;
use slurp::test_utils::loader::StaticLoader;
use slurp::test_utils::producer::VecProducer;
use slurp::test_utils::slurper::CollectingSlurper;
use slurp::types::{Item, TimeWindow, item_channel};
use slurp_telemetry::tracing::init_test_tracing;

/// Runs `producer` over the window covering `slurper`'s requests.
async fn run_pipeline(producer: &dyn Producer, slurper: &AnalysisRequestSlurper, buffer: usize) {
    let window = AnalysisRequest::covering_window(slurper.requests()).unwrap();
    let (tx, rx) = item_channel(buffer);

    let run = producer.produce(window.from, window.until);
    let production = tokio::spawn(async move {
        run.send_items(&tx).await;
    });

    slurper.slurp(rx).await;
    production.await.unwrap();
}

fn request(from: i64, until: i64, slurper: Arc<dyn Slurper>) -> AnalysisRequest {
    AnalysisRequest::new(TimeWindow::new(at(from), at(until)), slurper)
}

#[tokio::test(flavor = "multi_thread")]
async fn merged_sources_are_windowed_per_request() {
    init_test_tracing();

    let producer = MergeProducer::new(vec![
        Arc::new(VecProducer::new([at(0), at(9), at(14)])),
        Arc::new(VecProducer::new([at(4), at(10)])),
        Arc::new(VecProducer::new([at(5)])),
    ])
    .with_send_items_buffer_size(1);

    let first = CollectingSlurper::new();
    let second = CollectingSlurper::new();
    let slurper = AnalysisRequestSlurper::new(vec![
        request(0, 10, Arc::new(first.clone())),
        request(5, 15, Arc::new(second.clone())),
    ]);

    run_pipeline(&producer, &slurper, 2).await;

    assert_eq!(first.times(), vec![at(0), at(4), at(5), at(9)]);
    assert_eq!(second.times(), vec![at(5), at(9), at(10), at(14)]);
    assert_eq!(slurper.slurp_stat().count, 6);

    let request_stat = slurper.request_stat();
    assert_eq!(request_stat[0].count, 4);
    assert_eq!(request_stat[1].count, 4);
    assert_eq!(request_stat[1].item_at, Some(at(14)));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_loaders_run_once_per_delivered_item() {
    init_test_tracing();

    let shared = Arc::new(InstrumentedDataLoader::new(StaticLoader::new("shared", "s")));
    let nil = Arc::new(InstrumentedDataLoader::anonymous(DataLoaderFn::new(|_: &Item| {
        LoadedData::new("nil", Value::Null)
    })));
    let empty = Arc::new(InstrumentedDataLoader::anonymous(DataLoaderFn::new(|_: &Item| {
        LoadedData::none()
    })));

    let first = CollectingSlurper::new();
    let second = CollectingSlurper::new();
    let slurper = AnalysisRequestSlurper::new(vec![
        request(0, 10, Arc::new(first.clone()))
            .with_data_loaders(vec![shared.clone() as Arc<dyn DataLoader>, nil.clone()]),
        request(5, 15, Arc::new(second.clone()))
            .with_data_loaders(vec![shared.clone() as Arc<dyn DataLoader>, empty.clone()]),
    ]);

    let producer = VecProducer::new((0..20).map(at));
    run_pipeline(&producer, &slurper, 4).await;

    // 15 items fall in at least one window, items 15 to 19 are not even produced.
    assert_eq!(shared.stat().called.count, 15);
    assert_eq!(nil.stat().return_nil_data.count, 15);
    assert_eq!(empty.stat().return_empty_key.count, 15);

    for item in first.items().iter().chain(second.items().iter()) {
        assert_eq!(item.data.get("shared"), Some(&json!("s")));
        assert_eq!(item.data.get("nil"), Some(&Value::Null));
        assert_eq!(item.data.len(), 2);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_request_can_fan_out_to_several_slurpers() {
    init_test_tracing();

    let downstream: Vec<CollectingSlurper> = (0..3).map(|_| CollectingSlurper::new()).collect();
    let fan_out = CompositionSlurper::fan_out(
        downstream
            .iter()
            .map(|collector| Arc::new(collector.clone()) as Arc<dyn Slurper>)
            .collect(),
    );
    let loader: Arc<dyn DataLoader> = Arc::new(StaticLoader::new("k", 1));
    let slurper = AnalysisRequestSlurper::new(vec![
        request(2, 6, Arc::new(fan_out)).with_data_loader(loader),
    ]);

    run_pipeline(&VecProducer::new((0..10).map(at)), &slurper, 1).await;

    for collector in &downstream {
        assert_eq!(collector.times(), (2..6).map(at).collect::<Vec<_>>());
        assert!(collector.items().iter().all(|item| item.data["k"] == json!(1)));
        assert_eq!(collector.runs(), 1);
    }
}
