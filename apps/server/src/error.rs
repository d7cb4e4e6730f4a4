//! # エラー分類とレスポンス変換
//!
//! ハンドラが返す失敗を閉じた分類（[`FailureKind`]）に振り分け、
//! ステータスコードと [`ErrorResponse`] を決定する。
//!
//! ## 分類表
//!
//! | 種別 | ステータス | ログ | errors |
//! |------|-----------|------|--------|
//! | Unexpected | 500 | error（診断情報つき） | なし |
//! | Service | 500 | なし（発生元で記録済み） | なし |
//! | Transform | 500 | warn | なし |
//! | NotFound | 404 | なし | なし |
//! | BusinessValidation | 422 | なし | 失敗が持つ一覧 |
//! | Duplicate | 409 | なし | なし |
//! | InvalidArgument | 400 | warn（リクエスト情報つき） | なし |
//! | MethodNotAllowed | 405 | warn | なし |
//! | UnsupportedMediaType | 415 | warn | なし |
//! | UnreadableBody | 400 | warn（原因・生ボディつき） | なし |
//! | ConstraintViolation | 400 | warn（リクエスト情報つき） | なし |
//! | InvalidInput | 400 | warn（フィールドごと） | フィールドパス解決の結果 |
//!
//! 422 は形式として正しい入力の業務ルール違反、400 は構造・構文として不正な入力を表す。
//!
//! ## パイプラインへの組み込み
//!
//! `IntoResponse` は暫定レスポンスに失敗そのものを添付するだけで、ログ出力と
//! 障害通知は [`ErrorTranslationLayer`](crate::middleware::ErrorTranslationLayer) が
//! リクエスト情報と合わせて 1 回だけ行う。

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{ConnectInfo, rejection::PathRejection},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracegate_shared::{
    ErrorResponse,
    FieldError,
    ObjectShape,
    RawViolation,
    resolve_field_errors,
};

use crate::reporter::FaultReporter;

/// ハンドラから返される失敗
#[derive(Debug, Error)]
pub enum AppError {
    /// 想定外の障害
    #[error("{0}")]
    Unexpected(#[from] anyhow::Error),

    /// サービス層で検出済みの業務エラー
    #[error("{message}")]
    Service { message: String, code: String },

    /// データ変換処理の失敗
    #[error("{0}")]
    Transform(String),

    /// リソースが見つからない
    #[error("{0}")]
    NotFound(String),

    /// 業務バリデーションエラー
    #[error("{message}")]
    BusinessValidation {
        message: String,
        errors:  Option<Vec<FieldError>>,
    },

    /// リソースの重複
    #[error("{0}")]
    Duplicate(String),

    /// 不正な引数
    #[error("{0}")]
    InvalidArgument(String),

    /// 未対応の HTTP メソッド
    #[error("Request method '{method}' is not supported")]
    MethodNotAllowed { method: Method },

    /// 未対応のメディアタイプ
    #[error("Content-Type '{content_type}' is not supported")]
    UnsupportedMediaType { content_type: String },

    /// リクエストボディを読み取れない
    #[error("{message}")]
    UnreadableBody {
        message:  String,
        /// 最も具体的な原因
        cause:    Option<String>,
        /// 復元できた場合の生ボディ
        raw_body: Option<String>,
    },

    /// フレームワークレベルの制約違反
    #[error("{0}")]
    ConstraintViolation(String),

    /// 入力値のフィールド単位バリデーションエラー
    #[error("Validation failed.")]
    InvalidInput(InputViolations),
}

/// フィールド単位の違反一覧と、解決に使う検証対象の形状
#[derive(Debug, Clone)]
pub struct InputViolations {
    pub shape:      Option<&'static ObjectShape>,
    pub violations: Vec<RawViolation>,
}

impl InputViolations {
    pub fn new(shape: Option<&'static ObjectShape>, violations: Vec<RawViolation>) -> Self {
        Self { shape, violations }
    }

    /// 外部名のパスに解決したフィールドエラー
    pub fn resolve(&self) -> Vec<FieldError> {
        resolve_field_errors(self.shape, &self.violations)
    }

    /// ログ用の `field: message` 連結
    fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.raw_path, v.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 失敗の分類タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Unexpected,
    Service,
    Transform,
    NotFound,
    BusinessValidation,
    Duplicate,
    InvalidArgument,
    MethodNotAllowed,
    UnsupportedMediaType,
    UnreadableBody,
    ConstraintViolation,
    InvalidInput,
}

impl FailureKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unexpected | Self::Service | Self::Transform => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BusinessValidation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::InvalidArgument
            | Self::UnreadableBody
            | Self::ConstraintViolation
            | Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// ログ・障害通知用の識別子
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unexpected => "unexpected",
            Self::Service => "service",
            Self::Transform => "transform",
            Self::NotFound => "not_found",
            Self::BusinessValidation => "business_validation",
            Self::Duplicate => "duplicate",
            Self::InvalidArgument => "invalid_argument",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::UnreadableBody => "unreadable_body",
            Self::ConstraintViolation => "constraint_violation",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl AppError {
    /// 想定外の障害をメッセージから作成する
    pub fn unexpected(message: impl std::fmt::Display) -> Self {
        Self::Unexpected(anyhow::anyhow!("{message}"))
    }

    pub fn service(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            code:    code.into(),
        }
    }

    pub fn business_validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::BusinessValidation {
            message: message.into(),
            errors:  Some(errors),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unexpected(_) => FailureKind::Unexpected,
            Self::Service { .. } => FailureKind::Service,
            Self::Transform(_) => FailureKind::Transform,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::BusinessValidation { .. } => FailureKind::BusinessValidation,
            Self::Duplicate(_) => FailureKind::Duplicate,
            Self::InvalidArgument(_) => FailureKind::InvalidArgument,
            Self::MethodNotAllowed { .. } => FailureKind::MethodNotAllowed,
            Self::UnsupportedMediaType { .. } => FailureKind::UnsupportedMediaType,
            Self::UnreadableBody { .. } => FailureKind::UnreadableBody,
            Self::ConstraintViolation(_) => FailureKind::ConstraintViolation,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// サービス層のエラーコード
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// クライアントに返すペイロードを組み立てる（副作用なし）
    ///
    /// `details` にはリクエスト情報（クライアント向け表現）を渡す。
    pub fn to_payload(&self, details: &str) -> ErrorResponse {
        match self {
            Self::InvalidInput(input) => ErrorResponse::validation_failed(input.resolve()),
            Self::BusinessValidation { message, errors } => {
                ErrorResponse::new(message.as_str(), details).with_errors(errors.clone())
            }
            other => ErrorResponse::new(other.to_string(), details),
        }
    }
}

/// パスパラメータの抽出失敗は不正な引数として扱う
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

/// ログと `details` に使うリクエスト情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescription {
    pub path:   String,
    pub client: Option<SocketAddr>,
}

impl RequestDescription {
    pub fn new(path: impl Into<String>, client: Option<SocketAddr>) -> Self {
        Self {
            path: path.into(),
            client,
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::new(request.uri().path(), client)
    }

    /// クライアント向け表現（`uri=/path`）
    pub fn client_view(&self) -> String {
        format!("uri={}", self.path)
    }

    /// ログ向け表現（クライアントアドレスが分かれば付与する）
    pub fn log_view(&self) -> String {
        match self.client {
            Some(addr) => format!("uri={};client={}", self.path, addr.ip()),
            None => self.client_view(),
        }
    }
}

/// 失敗を分類してログ出力・障害通知を行い、ステータスとペイロードを返す
///
/// 分類は全域関数で、この関数自体が失敗することはない。
pub fn respond(
    failure: &AppError,
    request: &RequestDescription,
    reporter: &dyn FaultReporter,
) -> (StatusCode, ErrorResponse) {
    log_failure(failure, request);
    reporter.report(failure);
    (failure.status(), failure.to_payload(&request.client_view()))
}

fn log_failure(failure: &AppError, request: &RequestDescription) {
    match failure {
        AppError::Unexpected(e) => {
            tracing::error!(
                error.category = "unexpected",
                error.kind = FailureKind::Unexpected.as_str(),
                "未処理の例外: {} | 詳細: {:?}",
                e,
                e
            );
        }
        // 発生元で記録済み・想定内の失敗はここでは出力しない
        AppError::Service { .. }
        | AppError::NotFound(_)
        | AppError::BusinessValidation { .. }
        | AppError::Duplicate(_) => {}
        AppError::Transform(message) => {
            tracing::warn!(error.kind = failure.kind().as_str(), "変換処理の例外: {}", message);
        }
        AppError::InvalidArgument(message) => {
            tracing::warn!(
                error.kind = failure.kind().as_str(),
                "不正な引数: {} | Request: {}",
                message,
                request.log_view()
            );
        }
        AppError::MethodNotAllowed { .. } => {
            tracing::warn!(error.kind = failure.kind().as_str(), "未対応の HTTP メソッド: {}", failure);
        }
        AppError::UnsupportedMediaType { .. } => {
            tracing::warn!(error.kind = failure.kind().as_str(), "未対応のメディアタイプ: {}", failure);
        }
        AppError::UnreadableBody {
            message,
            cause,
            raw_body,
        } => {
            tracing::warn!(
                error.kind = failure.kind().as_str(),
                "HTTP メッセージを読み取れません: {} | Request: {} | Failed message: {} | Client Request Body: {}",
                message,
                request.log_view(),
                cause.as_deref().unwrap_or("Unknown"),
                raw_body.as_deref().unwrap_or("Unavailable")
            );
        }
        AppError::ConstraintViolation(message) => {
            tracing::warn!(
                error.kind = failure.kind().as_str(),
                "制約違反: {} | Request: {}",
                message,
                request.log_view()
            );
        }
        AppError::InvalidInput(input) => {
            tracing::warn!(
                error.kind = failure.kind().as_str(),
                "バリデーション失敗: {} | Request: {}",
                input.summary(),
                request.log_view()
            );
        }
    }
}

/// 暫定レスポンスに添付される失敗
///
/// [`ErrorTranslationLayer`](crate::middleware::ErrorTranslationLayer) が取り出して最終レスポンスに変換する。
#[derive(Debug, Clone)]
pub struct FailureCarrier(Arc<AppError>);

impl FailureCarrier {
    pub fn failure(&self) -> &AppError {
        &self.0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.to_payload(""))).into_response();
        response
            .extensions_mut()
            .insert(FailureCarrier(Arc::new(self)));
        response
    }
}
