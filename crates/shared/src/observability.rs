//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定、リクエスト相関に使う定数を提供する。
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えに対応する。
//!
//! リクエスト処理中のログは [`request_span`] が作るスパンの中で出力されるため、
//! `requestId` フィールドを明示的に渡さなくても JSON ログに含まれる。

/// リクエスト / レスポンスの相関ヘッダー名
///
/// HTTP ヘッダー名は大文字小文字を区別しない。`X-Request-ID` と同一。
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ログコンテキスト上の相関 ID のキー
pub const LOG_CONTEXT_KEY: &str = "requestId";

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|val| Self::parse(&val))
            .unwrap_or_default()
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（[`TracingConfig::app_span`] の `service` フィールドに出力）
    pub service_name: String,
    /// ログ出力形式
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// `LOG_FORMAT` 環境変数で出力形式を決定する
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    /// プロセス全体を包む `app` スパンを作成する
    ///
    /// [`init_tracing`] の後に呼び出すこと（初期化前に作成したスパンは記録されない）。
    #[cfg(feature = "observability")]
    pub fn app_span(&self) -> tracing::Span {
        tracing::info_span!("app", service = %self.service_name)
    }
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は `"info,tracegate=debug"` をデフォルトとする。
///
/// JSON モードでは現在のスパン（`requestId`, `method`, `uri`）がイベントと一緒に出力される。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tracegate=debug".into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// リクエスト処理全体を包むスパンを作成する
///
/// 相関 ID を `requestId` フィールドとして保持する。
#[cfg(feature = "observability")]
pub fn request_span<B>(request: &http::Request<B>, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        requestId = %request_id,
        method = %request.method(),
        uri = %request.uri().path(),
    )
}
