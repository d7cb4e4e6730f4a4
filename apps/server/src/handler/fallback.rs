//! # フォールバックハンドラ
//!
//! ルーター自身が生成する 404 / 405 を、他の失敗と同じ形式で返すために
//! [`AppError`] へ変換する。

use axum::http::{Method, Uri};

use crate::error::AppError;

/// どのルートにも一致しなかったリクエスト
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No handler found for {}", uri.path()))
}

/// パスは一致したがメソッドが未対応のリクエスト
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed { method }
}
