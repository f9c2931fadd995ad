#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::body::Body;

use ratemeter_core::{MetricPath, MetricSink};
use ratemeter_http::obs::prometheus::flatten_name;
use ratemeter_http::obs::{PrometheusExporter, PrometheusSink};
use ratemeter_http::ScrapeHandler;

fn path(id: &str, name: &str) -> MetricPath {
    MetricPath::from_segments([id, name])
}

#[test]
fn names_are_flattened_and_sanitised() {
    assert_eq!(flatten_name(&path("web-1", "totalRequests")), "web_1_totalRequests");
    assert_eq!(flatten_name(&path("host.example.com", "x")), "host_example_com_x");
    assert_eq!(flatten_name(&path("10.0.0.1", "x")), "_10_0_0_1_x");
    assert_eq!(flatten_name(&path("ns:app", "y")), "ns:app_y");
}

#[test]
fn counters_accumulate_gauges_overwrite_samples_summarise() {
    let sink = PrometheusSink::new();
    let c = path("a", "c");
    let g = path("a", "g");
    let s = path("a", "s");

    sink.incr_counter(&c, 1.0);
    sink.incr_counter(&c, 2.0);
    sink.set_gauge(&g, 10.0);
    sink.set_gauge(&g, 4.0);
    sink.add_sample(&s, 3.0);
    sink.add_sample(&s, 5.0);

    assert_eq!(sink.counter(&c), Some(3.0));
    assert_eq!(sink.gauge(&g), Some(4.0));
    assert_eq!(sink.sample(&s), Some((2, 8.0)));
    assert_eq!(sink.counter(&path("a", "missing")), None);
}

#[test]
fn render_is_sorted_text_exposition() {
    let sink = PrometheusSink::new();
    sink.incr_counter(&path("b", "total"), 1.0);
    sink.incr_counter(&path("a", "total"), 2.0);
    sink.set_gauge(&path("a", "current"), 7.0);
    sink.add_sample(&path("a", "rate"), 7.0);

    let expected = "\
# TYPE a_total counter
a_total 2
# TYPE b_total counter
b_total 1
# TYPE a_current gauge
a_current 7
# TYPE a_rate summary
a_rate_sum 7
a_rate_count 1
";
    assert_eq!(sink.render(), expected);
    assert_eq!(PrometheusSink::new().render(), "");
}

#[test]
fn concurrent_reporting_loses_nothing() {
    let sink = PrometheusSink::new();
    let c = path("a", "c");

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..1000 {
                    sink.incr_counter(&c, 1.0);
                }
            });
        }
    });

    assert_eq!(sink.counter(&c), Some(8000.0));
}

#[tokio::test]
async fn exporter_serves_rendered_registry() {
    let sink = Arc::new(PrometheusSink::new());
    sink.incr_counter(&path("a", "total"), 3.0);
    let exporter = PrometheusExporter::new(Arc::clone(&sink));

    let req = axum::http::Request::builder().uri("/metric").body(Body::empty()).unwrap();
    let resp = exporter.handle(req).await;
    assert_eq!(resp.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], sink.render().as_bytes());
}
