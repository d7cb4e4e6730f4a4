//! # アプリケーション構築
//!
//! ルーター定義と、リクエストパイプラインへのミドルウェア適用を担当する。
//! `main.rs` は設定読み込みとサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    handler::{
        create_customer,
        get_customer,
        health_check,
        method_not_allowed,
        route_not_found,
    },
    middleware::{CorrelationLayer, ErrorTranslationLayer, panic_to_failure},
    reporter::FaultReporter,
};

/// アプリケーションのルーターを構築する
pub fn build_app(reporter: Arc<dyn FaultReporter>) -> Router {
    let routes = Router::new()
        .route("/health", get(health_check))
        .route("/customers", post(create_customer))
        .route("/customers/{id}", get(get_customer));

    with_pipeline(routes, reporter)
}

/// 任意のルーターにフォールバックとミドルウェアを適用する
///
/// レイヤーは後に追加したものほど外側になる:
///
/// ```text
/// CorrelationLayer → ErrorTranslationLayer → CatchPanicLayer → handler / fallback
/// ```
///
/// Correlation を最も外側に置くことで、エラーレスポンスにも `X-Request-ID` が付与され、
/// エラー変換時のログにも `requestId` が含まれる。
pub fn with_pipeline(router: Router, reporter: Arc<dyn FaultReporter>) -> Router {
    router
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(panic_to_failure))
        .layer(ErrorTranslationLayer::new(reporter))
        .layer(CorrelationLayer)
}
