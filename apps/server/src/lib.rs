//! # TraceGate サーバーライブラリ
//!
//! HTTP サービスの横断的なエラー変換とリクエスト相関を担うモジュール群。
//!
//! ## モジュール構成
//!
//! - `app_builder`: ルーターとミドルウェアの組み立て
//! - `config`: 環境変数からの設定読み込み
//! - `error`: 失敗の分類とエラーレスポンスへの変換
//! - `extract`: 検証付き JSON エクストラクタ
//! - `handler`: HTTP ハンドラ
//! - `middleware`: リクエスト相関・エラー変換の Layer
//! - `reporter`: 障害通知

pub mod app_builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod reporter;

#[cfg(test)]
mod test_log;
