//! # リクエスト相関用の Correlation ID
//!
//! 1 リクエストの処理中に出力されるすべてのログを束ねるための識別子。
//! クライアントには `X-Request-ID` レスポンスヘッダーで返す。
//!
//! ## 設計判断
//!
//! - **Newtype パターン**: `String` をラップし、他の文字列との取り違えを防ぐ
//! - **UUID v4 採用**: 128 ビットの乱数で、同時生成しても衝突しない
//! - **不透明な文字列**: クライアントから受け取った値は形式を問わずそのまま採用する
//!
//! ## 使用例
//!
//! ```rust
//! use tracegate_shared::CorrelationId;
//!
//! // ヘッダーに値があればそのまま採用
//! let id = CorrelationId::resolve(Some("client-id-123"));
//! assert_eq!(id.as_str(), "client-id-123");
//!
//! // ヘッダーが無い・空の場合は新規生成
//! let generated = CorrelationId::resolve(Some(""));
//! assert_eq!(generated.as_str().len(), 36);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// リクエスト単位の相関識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// 新しい Correlation ID を生成する（UUID v4）
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 外部から受け取った値で Correlation ID を作成する
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// インバウンドヘッダーの値から Correlation ID を決定する
    ///
    /// 値が存在し空でなければ加工せずに採用し、それ以外は新規生成する。
    pub fn resolve(inbound: Option<&str>) -> Self {
        match inbound {
            Some(value) if !value.is_empty() => Self::from_string(value),
            _ => Self::new(),
        }
    }

    /// 文字列スライスとして取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 内部の `String` を取り出す
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
