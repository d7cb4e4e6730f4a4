//! # ログコンテキストのテスト
//!
//! リクエスト処理中に出力されたログイベントが、そのリクエストの `requestId` を
//! スパン経由で保持していることを検証する。起動時の `app` スパンのサービス名も確認する。

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use axum::body::Body;
use http::{Request, header::CONTENT_TYPE};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;
use tracegate_server::{app_builder::build_app, reporter::TracingFaultReporter};
use tracegate_shared::observability::{LOG_CONTEXT_KEY, LogFormat, TracingConfig};
use tracing::{
    Event,
    Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
};

/// スパンに記録されたフィールド
#[derive(Default)]
struct SpanFields(HashMap<String, String>);

impl Visit for SpanFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// 収集した 1 件のイベント（ターゲットと、祖先スパンのフィールド）
#[derive(Debug, Clone)]
struct CapturedEvent {
    target:      String,
    span_fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn request_id(&self) -> Option<&str> {
        self.span_fields.get(LOG_CONTEXT_KEY).map(String::as_str)
    }
}

/// テスト用: 各イベントが属するスパンのフィールドを記録する Layer
#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = SpanFields::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(fields.0.clone());
                }
            }
        }
        self.events.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            span_fields,
        });
    }
}

#[tokio::test]
async fn test_リクエスト処理中のログにrequest_idが含まれる() {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = build_app(Arc::new(TracingFaultReporter));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/customers")
                .header(CONTENT_TYPE, "application/json")
                .header("X-Request-ID", "log-ctx-1")
                .body(Body::from(
                    json!({
                        "fullName": "",
                        "email": "alice@example.com",
                        "age": 30,
                        "addr": { "streetName": "Main St", "zipCode": "1000001" }
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let events = capture.events.lock().unwrap();
    let request_events: Vec<_> = events
        .iter()
        .filter(|event| event.target.starts_with("tracegate"))
        .collect();
    assert!(
        request_events.len() >= 2,
        "バリデーション失敗のログと障害通知が記録されること: {events:?}"
    );
    for event in request_events {
        assert_eq!(
            event.request_id(),
            Some("log-ctx-1"),
            "{} のイベントに requestId が含まれること",
            event.target
        );
    }
}

#[tokio::test]
async fn test_リクエスト外のログにはrequest_idが含まれない() {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    tracing::info!(target: "tracegate_server", "起動処理");

    let events = capture.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].request_id(), None);
}

#[test]
fn test_appスパンに設定したサービス名が記録される() {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = TracingConfig::new("tracegate-test", LogFormat::Json);
    let _span = config.app_span().entered();
    tracing::info!(target: "tracegate_server", "起動処理");

    let events = capture.events.lock().unwrap();
    assert_eq!(
        events[0].span_fields.get("service").map(String::as_str),
        Some("tracegate-test")
    );
}
