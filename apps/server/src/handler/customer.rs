//! # 顧客ハンドラ
//!
//! 入力検証（400）・業務ルール違反（422）・重複（409）・未存在（404）の各経路を持つ
//! エンドポイント。永続化は行わない。

use std::sync::LazyLock;

use axum::{
    Json,
    extract::{Path, rejection::PathRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracegate_shared::{FieldError, FieldShape, ObjectShape, Shaped};
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppError, extract::ValidatedJson, middleware::current_correlation_id};

/// 登録済みとして扱うメールドメイン
const TAKEN_EMAIL_DOMAIN: &str = "@taken.example";

/// 登録可能な最低年齢
const MINIMUM_AGE: i32 = 18;

/// 顧客登録リクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[serde(rename = "fullName")]
    #[validate(length(min = 1, message = "must not be blank"))]
    pub full_name: String,
    #[validate(email(message = "must be a well-formed email address"))]
    pub email:     String,
    #[validate(range(min = 0, message = "must be positive"))]
    pub age:       i32,
    #[serde(rename = "addr")]
    #[validate(nested)]
    pub address:   AddressRequest,
}

/// 住所
#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[serde(rename = "streetName")]
    #[validate(length(min = 1, message = "must not be blank"))]
    pub street: String,
    #[serde(rename = "zipCode")]
    #[validate(length(equal = 7, message = "must be 7 digits"))]
    pub zip:    String,
}

impl Shaped for AddressRequest {
    fn shape() -> &'static ObjectShape {
        static SHAPE: LazyLock<ObjectShape> = LazyLock::new(|| {
            ObjectShape::new()
                .field("street", FieldShape::renamed("streetName"))
                .field("zip", FieldShape::renamed("zipCode"))
        });
        &SHAPE
    }
}

impl Shaped for CreateCustomerRequest {
    fn shape() -> &'static ObjectShape {
        static SHAPE: LazyLock<ObjectShape> = LazyLock::new(|| {
            ObjectShape::new()
                .field("full_name", FieldShape::renamed("fullName"))
                .field("email", FieldShape::plain())
                .field("age", FieldShape::plain())
                .field(
                    "address",
                    FieldShape::renamed("addr").with_nested(AddressRequest::shape().clone()),
                )
        });
        &SHAPE
    }
}

/// 顧客レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id:         Uuid,
    pub full_name:  String,
    pub request_id: Option<String>,
}

/// 顧客を登録する
pub async fn create_customer(
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    if req.age < MINIMUM_AGE {
        return Err(AppError::business_validation(
            "Customer does not meet the registration policy",
            vec![FieldError::new(
                "age",
                format!("must be at least {MINIMUM_AGE}"),
                "age",
            )],
        ));
    }

    if req.email.ends_with(TAKEN_EMAIL_DOMAIN) {
        return Err(AppError::Duplicate(format!(
            "Customer with email {} already exists",
            req.email
        )));
    }

    let id = Uuid::new_v4();
    tracing::info!(customer.id = %id, "顧客を登録しました");

    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse {
            id,
            full_name: req.full_name,
            request_id: current_correlation_id().map(|id| id.into_inner()),
        }),
    ))
}

/// 顧客を取得する
///
/// 永続化を持たないため、形式が正しい ID はすべて未存在として扱う。
pub async fn get_customer(
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<CustomerResponse>, AppError> {
    let Path(id) = path?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidArgument(format!("Invalid customer id: {id}")))?;

    Err(AppError::NotFound(format!("Customer {id} not found")))
}
