//! # TraceGate 共有ユーティリティ
//!
//! このクレートは、TraceGate のエラー変換層とリクエスト相関層が共通で使う
//! 型とアルゴリズムを提供する。
//!
//! ## 設計方針
//!
//! - HTTP フレームワーク（axum）には依存しない
//! - ワイヤ形式（`ErrorResponse` / `FieldError`）は純粋なデータ構造として定義する
//! - フィールドパス解決はリフレクションを使わず、宣言的な [`ObjectShape`] で行う
//! - トレーシング初期化は `observability` feature 有効時のみコンパイルされる

pub mod correlation_id;
pub mod error_response;
pub mod field_path;
pub mod observability;

pub use correlation_id::CorrelationId;
pub use error_response::{ErrorResponse, FieldError};
pub use field_path::{
    FieldShape,
    ObjectShape,
    RawViolation,
    Shaped,
    resolve_field_errors,
    resolve_path,
    violations_from_validator,
};
