//! # エラーレスポンス
//!
//! 全エラー種別で共通のレスポンス構造体を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサーバー側の責務（shared に axum 依存を入れない）
//! - `errors` はバリデーション系の失敗でのみ `Some` になる。それ以外は `null` で出力する

use serde::{Deserialize, Serialize};

/// Bean バリデーション失敗時の固定メッセージ
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed.";

/// Bean バリデーション失敗時の固定 details
pub const VALIDATION_FAILED_DETAILS: &str = "One or more fields have validation errors";

/// フィールド単位のエラー
///
/// `field` は外部名の末尾セグメント、`path` はルートオブジェクトからの
/// ドット区切り外部パス。同一 `(path, message)` の重複は除去しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field:   String,
    pub message: String,
    pub path:    String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            field:   field.into(),
            message: message.into(),
            path:    path.into(),
        }
    }
}

/// エラーレスポンス
///
/// 失敗したリクエストごとに 1 回だけ構築され、そのままクライアントへ返る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub details: String,
    pub errors:  Option<Vec<FieldError>>,
}

impl ErrorResponse {
    /// フィールドエラーを持たないレスポンスを作成する
    pub fn new(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: details.into(),
            errors:  None,
        }
    }

    /// フィールドエラー一覧を付与する
    pub fn with_errors(mut self, errors: Option<Vec<FieldError>>) -> Self {
        self.errors = errors;
        self
    }

    /// 入力バリデーション失敗（400）のレスポンス
    pub fn validation_failed(errors: Vec<FieldError>) -> Self {
        Self::new(VALIDATION_FAILED_MESSAGE, VALIDATION_FAILED_DETAILS).with_errors(Some(errors))
    }
}
