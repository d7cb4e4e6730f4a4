//! # 検証付き JSON エクストラクタ
//!
//! リクエストボディを JSON としてデシリアライズし、`validator` で検証する。
//! 失敗はすべて [`AppError`] として返し、エラー変換層で分類される。
//!
//! | 状況 | 失敗 |
//! |------|------|
//! | `Content-Type` が JSON でない | `UnsupportedMediaType` |
//! | ボディの読み取りに失敗 | `UnreadableBody`（生ボディなし） |
//! | JSON として不正 | `UnreadableBody`（原因と生ボディつき） |
//! | 検証エラー | `InvalidInput`（型の [`ObjectShape`](tracegate_shared::ObjectShape) つき） |

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tracegate_shared::{Shaped, violations_from_validator};
use validator::Validate;

use crate::error::{AppError, InputViolations};

/// 検証済みの JSON ボディ
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Shaped,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(req.headers()) {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(AppError::UnsupportedMediaType { content_type });
        }

        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                // 読み取り失敗は診断情報なしで返す
                tracing::warn!("リクエストボディの読み取りに失敗しました: {}", rejection);
                return Err(AppError::UnreadableBody {
                    message:  "Failed to read request body".to_string(),
                    cause:    Some(rejection.body_text()),
                    raw_body: None,
                });
            }
        };

        let value: T = serde_json::from_slice(&bytes).map_err(|e| unreadable_json(&bytes, &e))?;

        value.validate().map_err(|errors| {
            AppError::InvalidInput(InputViolations::new(
                Some(T::shape()),
                violations_from_validator(&errors),
            ))
        })?;

        Ok(Self(value))
    }
}

fn unreadable_json(bytes: &Bytes, error: &serde_json::Error) -> AppError {
    let message = if bytes.is_empty() {
        "Required request body is missing".to_string()
    } else {
        format!("JSON parse error: {error}")
    };
    AppError::UnreadableBody {
        message,
        cause: Some(error.to_string()),
        raw_body: Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// `application/json` または `application/*+json` かどうか
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
