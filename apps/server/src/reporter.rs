//! # 障害通知
//!
//! 分類済みのすべての失敗を外部テレメトリへ転送する。
//! 通知はファイア・アンド・フォーゲットで、レスポンス経路をブロックしたり失敗させたりしない。

use crate::error::AppError;

/// 障害通知の送信先
pub trait FaultReporter: Send + Sync {
    fn report(&self, failure: &AppError);
}

/// トレーシングへ障害を記録する通知先（デフォルト）
///
/// ターゲット `tracegate::fault` に DEBUG で 1 件ずつ出力する。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn report(&self, failure: &AppError) {
        let kind = failure.kind();
        tracing::debug!(
            target: "tracegate::fault",
            {
                fault.kind = kind.as_str(),
                fault.status = kind.status().as_u16(),
                fault.code = failure.code().unwrap_or("-")
            },
            "障害を通知しました: {}",
            failure
        );
    }
}

/// Sentry へ障害を送信する通知先
///
/// 送信は Sentry のトランスポートがバックグラウンドで行う。
#[cfg(feature = "sentry")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SentryFaultReporter;

#[cfg(feature = "sentry")]
impl FaultReporter for SentryFaultReporter {
    fn report(&self, failure: &AppError) {
        let kind = failure.kind();
        sentry::with_scope(
            |scope| {
                scope.set_tag("fault.kind", kind.as_str());
                scope.set_tag("fault.status", kind.status().as_u16());
                if let Some(id) = crate::middleware::current_correlation_id() {
                    scope.set_tag("request_id", id.as_str());
                }
            },
            || {
                sentry::capture_error(failure);
            },
        );
    }
}
