//! # フィールドパス解決
//!
//! バリデーション失敗の内部フィールドパス（例: `address.street`）を、
//! クライアントに見える外部パス（例: `addr.streetName`）へ変換する。
//!
//! ## 仕組み
//!
//! 1. 検証対象の型ごとに [`ObjectShape`] を一度だけ宣言する（[`Shaped`]）
//! 2. 生パスを `.` で分割し、形状を 1 セグメントずつ辿る
//! 3. 属性が見つかれば外部名（宣言されていれば）に置き換え、ネストした形状へ降りる
//! 4. 属性が見つからなければ生のセグメント名を残し、以降のセグメントは置き換えない
//!
//! リスト要素のインデックス（`items[0]`）は名前部分で検索し、サフィックスはそのまま残す。

use std::collections::HashMap;

use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::FieldError;

/// 検証対象の型が持つフィールド形状
///
/// 内部属性名 → [`FieldShape`] の対応表。リフレクションの代わりに宣言的に構築する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectShape {
    fields: HashMap<String, FieldShape>,
}

/// 1 フィールド分の形状（外部名とネストした形状）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldShape {
    external_name: Option<String>,
    nested:        Option<ObjectShape>,
}

/// 型に対応する [`ObjectShape`] を提供する
///
/// 実装側は `LazyLock` などで形状を一度だけ構築し、`'static` 参照を返す。
pub trait Shaped {
    fn shape() -> &'static ObjectShape;
}

/// バリデーションサブシステムが報告する 1 件の違反（内部名のパス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawViolation {
    pub raw_path: String,
    pub message:  String,
}

impl RawViolation {
    pub fn new(raw_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            raw_path: raw_path.into(),
            message:  message.into(),
        }
    }
}

impl ObjectShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// 属性を宣言する
    pub fn field(mut self, name: impl Into<String>, shape: FieldShape) -> Self {
        self.fields.insert(name.into(), shape);
        self
    }

    /// 内部属性名で形状を引く
    pub fn lookup(&self, name: &str) -> Option<&FieldShape> {
        self.fields.get(name)
    }
}

impl FieldShape {
    /// 外部名の上書きを持たない属性
    pub fn plain() -> Self {
        Self::default()
    }

    /// 外部名で公開される属性
    ///
    /// 空文字列は上書きなしとして扱う。
    pub fn renamed(external_name: impl Into<String>) -> Self {
        let external_name = external_name.into();
        Self {
            external_name: (!external_name.is_empty()).then_some(external_name),
            nested:        None,
        }
    }

    /// ネストした形状を持たせる
    pub fn with_nested(mut self, nested: ObjectShape) -> Self {
        self.nested = Some(nested);
        self
    }

    pub fn external_name(&self) -> Option<&str> {
        self.external_name.as_deref()
    }

    pub fn nested(&self) -> Option<&ObjectShape> {
        self.nested.as_ref()
    }
}

/// 生パスを外部パスに変換する
///
/// 形状が無い場合は生パスをそのまま返す。
pub fn resolve_path(shape: Option<&ObjectShape>, raw_path: &str) -> String {
    let Some(root) = shape else {
        return raw_path.to_owned();
    };

    let mut current = Some(root);
    let mut resolved = Vec::new();

    for segment in raw_path.split('.') {
        let (name, index_suffix) = split_index_suffix(segment);

        match current.and_then(|shape| shape.lookup(name)) {
            Some(field) => {
                let external = field.external_name().unwrap_or(name);
                resolved.push(format!("{external}{index_suffix}"));
                current = field.nested();
            }
            None => {
                // 見つからなかった時点で以降の置き換えは行わない
                resolved.push(segment.to_owned());
                current = None;
            }
        }
    }

    resolved.join(".")
}

/// 違反一覧を [`FieldError`] に変換する（入力順を保持し、重複は除去しない）
pub fn resolve_field_errors(
    shape: Option<&ObjectShape>,
    violations: &[RawViolation],
) -> Vec<FieldError> {
    violations
        .iter()
        .map(|violation| {
            let path = resolve_path(shape, &violation.raw_path);
            let field = leaf_segment(&path).to_owned();
            FieldError::new(field, violation.message.clone(), path)
        })
        .collect()
}

/// `validator` のエラーを内部名パスの違反一覧に平坦化する
///
/// `ValidationErrors` はハッシュマップで順序が不定なため、生パスで安定ソートする。
/// リスト要素はインデックスの数値順に並べる（`items[2]` → `items[10]`）。
pub fn violations_from_validator(errors: &ValidationErrors) -> Vec<RawViolation> {
    let mut violations = Vec::new();
    collect_violations("", errors, &mut violations);
    violations.sort_by_cached_key(|violation| path_sort_key(&violation.raw_path));
    violations
}

/// セグメントごとに (名前, インデックス) の組へ分解した並び替えキー
fn path_sort_key(raw_path: &str) -> Vec<(String, Option<usize>)> {
    raw_path
        .split('.')
        .map(|segment| {
            let (name, suffix) = split_index_suffix(segment);
            let index = suffix
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(|digits| digits.parse().ok());
            (name.to_owned(), index)
        })
        .collect()
}

fn collect_violations(prefix: &str, errors: &ValidationErrors, out: &mut Vec<RawViolation>) {
    for (name, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(
                    field_errors
                        .iter()
                        .map(|error| RawViolation::new(path.clone(), violation_message(error))),
                );
            }
            ValidationErrorsKind::Struct(nested) => collect_violations(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_violations(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

fn violation_message(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("invalid value ({})", error.code),
    }
}

/// `items[0]` → (`items`, `[0]`)
fn split_index_suffix(segment: &str) -> (&str, &str) {
    match segment.find('[') {
        Some(pos) => segment.split_at(pos),
        None => (segment, ""),
    }
}

fn leaf_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
