//! # リクエスト相関ミドルウェア
//!
//! すべてのリクエストに Correlation ID を割り当て、処理中のコードから参照できるようにする。
//!
//! ## 仕組み
//!
//! 1. [`CorrelationLayer`] が `X-Request-ID` ヘッダーを読み、値があれば採用し、無ければ生成する
//! 2. 内側のサービス呼び出し全体を task-local スコープと `requestId` つきスパンで包む
//! 3. 成功・失敗にかかわらず、レスポンスに同じ値の `X-Request-ID` を付与する
//!
//! ## なぜ task-local を使用するか
//!
//! 非同期ランタイムでは 1 つのワーカースレッドが複数のリクエストを交互に処理する。
//! スレッドローカルに保存すると別リクエストへ漏れるため、保存先をリクエストの
//! Future そのものに結び付ける。スコープは Future の完了・エラー・パニック・ドロップ
//! （キャンセル）のいずれでも解放される。

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::http::{HeaderName, HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracegate_shared::{
    CorrelationId,
    observability::{REQUEST_ID_HEADER, request_span},
};
use tracing::Instrument;

tokio::task_local! {
    static CORRELATION_ID: CorrelationId;
}

/// 現在のリクエストの Correlation ID を取得する
///
/// task-local スコープ外（リクエスト処理外）では `None` を返す。
pub fn current_correlation_id() -> Option<CorrelationId> {
    CORRELATION_ID.try_with(Clone::clone).ok()
}

/// Correlation ID を束縛した状態で Future を実行する
///
/// Future の終了とともに束縛は解除される。
pub async fn with_correlation_id<F: Future>(id: CorrelationId, future: F) -> F::Output {
    CORRELATION_ID.scope(id, future).await
}

/// 現在の Correlation ID とスパンを引き継いで子タスクを起動する
///
/// task-local は `tokio::spawn` をまたがないため、明示的に引き継ぐ。
pub fn spawn_with_correlation<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let span = tracing::Span::current();
    match current_correlation_id() {
        Some(id) => tokio::spawn(CORRELATION_ID.scope(id, future).instrument(span)),
        None => tokio::spawn(future.instrument(span)),
    }
}

/// Correlation ID を割り当てる Layer
///
/// 最も外側に配置し、エラー変換を含むすべての処理を包む:
///
/// ```text
/// CorrelationLayer → ErrorTranslationLayer → CatchPanicLayer → handler
/// ```
#[derive(Clone, Debug, Default)]
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService { inner }
    }
}

/// [`CorrelationLayer`] が生成する Service
#[derive(Clone, Debug)]
pub struct CorrelationService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // clone-swap パターン: poll_ready で得た readiness を保持する inner を使う
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        // UTF-8 として読めない値は未指定として扱う
        let id = CorrelationId::resolve(
            req.headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok()),
        );
        let header_value = HeaderValue::from_str(id.as_str()).ok();
        let span = request_span(&req, id.as_str());
        req.extensions_mut().insert(id.clone());

        let handling = async move {
            let mut response = inner.call(req).await?;
            if let Some(value) = header_value {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Ok::<_, S::Error>(response)
        };

        Box::pin(CORRELATION_ID.scope(id, handling.instrument(span)))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::response::IntoResponse;

    use super::*;
    use crate::error::AppError;

    // テスト用: ハンドラ内で観測した Correlation ID をボディとして返す Service
    #[derive(Clone)]
    struct EchoCurrentIdService;

    impl Service<Request<()>> for EchoCurrentIdService {
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<Option<String>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<()>) -> Self::Future {
            let from_extension = req.extensions().get::<CorrelationId>().cloned();
            Box::pin(async move {
                tokio::task::yield_now().await;
                let current = current_correlation_id();
                assert_eq!(current, from_extension, "拡張と task-local が一致すること");
                Ok(Response::new(current.map(CorrelationId::into_inner)))
            })
        }
    }

    fn build_request(request_id: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/customers");
        if let Some(id) = request_id {
            builder = builder.header("X-Request-ID", id);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_current_correlation_id_スコープ外でnoneを返す() {
        assert_eq!(current_correlation_id(), None);
    }

    #[tokio::test]
    async fn test_クライアント提供のidがハンドラとレスポンスヘッダーに伝播する() {
        let mut sut = CorrelationLayer.layer(EchoCurrentIdService);

        let response = sut.call(build_request(Some("client-id-1"))).await.unwrap();

        assert_eq!(response.body().as_deref(), Some("client-id-1"));
        assert_eq!(response.headers()["x-request-id"], "client-id-1");
    }

    #[tokio::test]
    async fn test_空のヘッダーでは新しいidを生成する() {
        let mut sut = CorrelationLayer.layer(EchoCurrentIdService);

        let response = sut.call(build_request(Some(""))).await.unwrap();

        let header = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(header).is_ok());
        assert_eq!(response.body().as_deref(), Some(header));
    }

    #[tokio::test]
    async fn test_処理完了後はスコープが解除される() {
        let mut sut = CorrelationLayer.layer(EchoCurrentIdService);

        sut.call(build_request(None)).await.unwrap();

        assert_eq!(current_correlation_id(), None);
    }

    // テスト用: ハンドラ内で失敗する Service
    #[derive(Clone, Copy)]
    enum FailingService {
        ErrorResponse,
        ServiceError,
        Panic,
    }

    impl Service<Request<()>> for FailingService {
        type Error = &'static str;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<axum::body::Body>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let failure = *self;
            Box::pin(async move {
                assert!(current_correlation_id().is_some());
                match failure {
                    Self::ErrorResponse => {
                        Ok(AppError::NotFound("missing".to_string()).into_response())
                    }
                    Self::ServiceError => Err("handler failed"),
                    Self::Panic => panic!("handler failed"),
                }
            })
        }
    }

    async fn assert_next_request_sees_own_id() {
        let mut sut = CorrelationLayer.layer(EchoCurrentIdService);
        let response = sut.call(build_request(Some("next-id"))).await.unwrap();
        assert_eq!(response.body().as_deref(), Some("next-id"));
        assert_eq!(current_correlation_id(), None);
    }

    #[tokio::test]
    async fn test_エラーレスポンスにもidを付与しスコープを解除する() {
        let mut sut = CorrelationLayer.layer(FailingService::ErrorResponse);

        let response = sut.call(build_request(Some("failed-id"))).await.unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], "failed-id");
        assert_eq!(current_correlation_id(), None);
        assert_next_request_sees_own_id().await;
    }

    #[tokio::test]
    async fn test_サービスエラー後はスコープが解除される() {
        let mut sut = CorrelationLayer.layer(FailingService::ServiceError);

        let result = sut.call(build_request(Some("failed-id"))).await;

        assert_eq!(result.unwrap_err(), "handler failed");
        assert_eq!(current_correlation_id(), None);
        assert_next_request_sees_own_id().await;
    }

    #[tokio::test]
    async fn test_パニック後もスコープが残らない() {
        let mut sut = CorrelationLayer.layer(FailingService::Panic);

        let joined = tokio::spawn(sut.call(build_request(Some("panicked-id")))).await;

        assert!(joined.unwrap_err().is_panic(), "パニックが伝播すること");
        assert_eq!(current_correlation_id(), None);
        assert_next_request_sees_own_id().await;
    }

    #[tokio::test]
    async fn test_キャンセルされてもスコープが残らない() {
        let id = CorrelationId::from_string("cancelled");

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            with_correlation_id(id, std::future::pending::<()>()),
        )
        .await;

        assert!(result.is_err(), "タイムアウトでドロップされること");
        assert_eq!(current_correlation_id(), None);
    }

    #[tokio::test]
    async fn test_spawn_with_correlation_子タスクにidを引き継ぐ() {
        let id = CorrelationId::from_string("parent-id");

        let observed = with_correlation_id(id.clone(), async {
            spawn_with_correlation(async { current_correlation_id() })
                .await
                .unwrap()
        })
        .await;

        assert_eq!(observed, Some(id));
    }
}
