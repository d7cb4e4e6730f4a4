//! # TraceGate サーバー
//!
//! エラー変換とリクエスト相関のパイプラインを載せたデモ用 HTTP サーバー。
//!
//! ## パイプライン
//!
//! ```text
//! Client ──▶ CorrelationLayer ──▶ ErrorTranslationLayer ──▶ CatchPanicLayer ──▶ handler
//!            (X-Request-ID)        (AppError → JSON)          (panic → 500)
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `TRACEGATE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `TRACEGATE_PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `LOG_FORMAT` | No | `json` で JSON ログ、それ以外は人間向け出力 |
//! | `RUST_LOG` | No | ログレベル（デフォルト: `info,tracegate=debug`） |
//! | `SENTRY_DSN` | No | Sentry の DSN（`sentry` feature 有効時のみ） |
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p tracegate-server
//!
//! # Sentry へ障害を通知する場合
//! SENTRY_DSN=https://... cargo run -p tracegate-server --features sentry
//! ```

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracegate_server::{
    app_builder::build_app,
    config::ServerConfig,
    reporter::{FaultReporter, TracingFaultReporter},
};
use tracegate_shared::observability::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env("tracegate");
    init_tracing(tracing_config.clone());
    let _tracing_guard = tracing_config.app_span().entered();

    let config = ServerConfig::from_env()?;

    tracing::info!(
        "TraceGate サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // Sentry のガードはプロセス終了まで保持する（ドロップ時に未送信イベントを flush する）
    #[cfg(feature = "sentry")]
    let _sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let reporter = select_reporter(&config);
    let app = build_app(reporter);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("TraceGate サーバーが起動しました: {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// 障害通知先を選択する
///
/// Sentry が有効かつ DSN が設定されていれば Sentry、それ以外はトレーシングに記録する。
#[cfg_attr(not(feature = "sentry"), allow(unused_variables))]
fn select_reporter(config: &ServerConfig) -> Arc<dyn FaultReporter> {
    #[cfg(feature = "sentry")]
    if config.sentry_dsn.is_some() {
        tracing::info!("障害通知先: Sentry");
        return Arc::new(tracegate_server::reporter::SentryFaultReporter);
    }

    tracing::info!("障害通知先: tracing");
    Arc::new(TracingFaultReporter)
}
