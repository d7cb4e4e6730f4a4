//! # ミドルウェア
//!
//! リクエスト相関とエラー変換の tower Layer を提供する。

mod correlation;
mod error_translation;

pub use correlation::{
    CorrelationLayer,
    CorrelationService,
    current_correlation_id,
    spawn_with_correlation,
    with_correlation_id,
};
pub use error_translation::{ErrorTranslationLayer, ErrorTranslationService, panic_to_failure};
