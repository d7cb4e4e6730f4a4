//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `customer`: 顧客登録・参照（入力検証と業務エラーのデモ）
//! - `fallback`: ルート未一致・メソッド未対応を [`AppError`](crate::error::AppError) に変換する

pub mod customer;
pub mod fallback;
pub mod health;

pub use customer::{create_customer, get_customer};
pub use fallback::{method_not_allowed, route_not_found};
pub use health::health_check;
