//! # エラー変換ミドルウェア
//!
//! ハンドラ・フォールバック・パニックから返された [`AppError`] を、リクエスト情報つきの
//! 最終的なエラーレスポンスに変換する終端ハンドラ。ここより外側へ失敗は伝播しない。
//!
//! リクエスト情報（パス・クライアントアドレス）は内側の呼び出し前に取得しておき、
//! レスポンスに [`FailureCarrier`] が添付されていた場合のみ [`respond`] を実行する。

use std::{
    any::Any,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    BoxError,
    Json,
    body::{Body, Bytes, HttpBody},
    http::{Request, Response, header::CONTENT_LENGTH},
    response::IntoResponse,
};
use tower::{Layer, Service};

use crate::{
    error::{AppError, FailureCarrier, RequestDescription, respond},
    reporter::FaultReporter,
};

/// エラー変換 Layer
#[derive(Clone)]
pub struct ErrorTranslationLayer {
    reporter: Arc<dyn FaultReporter>,
}

impl ErrorTranslationLayer {
    pub fn new(reporter: Arc<dyn FaultReporter>) -> Self {
        Self { reporter }
    }
}

impl<S> Layer<S> for ErrorTranslationLayer {
    type Service = ErrorTranslationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorTranslationService {
            inner,
            reporter: self.reporter.clone(),
        }
    }
}

/// [`ErrorTranslationLayer`] が生成する Service
#[derive(Clone)]
pub struct ErrorTranslationService<S> {
    inner:    S,
    reporter: Arc<dyn FaultReporter>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ErrorTranslationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = Response<Body>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let description = RequestDescription::from_request(&req);
        let reporter = self.reporter.clone();

        Box::pin(async move {
            let response = inner.call(req).await?.map(Body::new);
            Ok::<_, S::Error>(translate(response, &description, reporter.as_ref()))
        })
    }
}

/// 失敗が添付されたレスポンスを最終形に置き換える
///
/// 内側で設定されたヘッダー（`Allow` 等）は保持し、ボディとステータスのみ差し替える。
fn translate(
    response: Response<Body>,
    description: &RequestDescription,
    reporter: &dyn FaultReporter,
) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    let Some(carrier) = parts.extensions.remove::<FailureCarrier>() else {
        return Response::from_parts(parts, body);
    };

    let (status, payload) = respond(carrier.failure(), description, reporter);
    let (rendered, rendered_body) = Json(payload).into_response().into_parts();

    parts.status = status;
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.extend(rendered.headers);
    Response::from_parts(parts, rendered_body)
}

/// パニックを想定外の障害に変換する（`CatchPanicLayer::custom` 用）
pub fn panic_to_failure(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::unexpected(message).into_response()
}
