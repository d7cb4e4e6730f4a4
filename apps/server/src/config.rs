//! # サーバー設定
//!
//! 環境変数からサーバーの設定を読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `TRACEGATE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `TRACEGATE_PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `SENTRY_DSN` | No | Sentry の DSN（`sentry` feature 有効時のみ使用） |

use std::env;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TRACEGATE_PORT は有効なポート番号である必要があります: {0}")]
    InvalidPort(String),
}

/// サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// バインドアドレス
    pub host:       String,
    /// ポート番号
    pub port:       u16,
    /// Sentry の DSN（未設定なら Sentry へは送信しない）
    pub sentry_dsn: Option<String>,
}

impl ServerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("TRACEGATE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("TRACEGATE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }
}
