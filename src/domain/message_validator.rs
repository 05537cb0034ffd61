/// メッセージ作成リクエストのバリデーション
///
/// 違反をまとめて`Vec<Violation>`で返す。データ構造側には制約を持たせない。
use std::fmt;

use thiserror::Error;

use super::message::{CreateMessageRequest, NewMessage};

/// 違反の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// フィールドが存在しない、または`null`
    Missing,
    /// 空文字列（空白のみの値は受け付ける）
    Blank,
}

/// 1フィールド分の制約違反
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// 違反したフィールド名
    pub field: &'static str,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::Missing => write!(f, "{} is required", self.field),
            ViolationKind::Blank => write!(f, "{} must not be blank", self.field),
        }
    }
}

/// バリデーションエラー（1件以上の違反を保持）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid message: {}", format_violations(.0))]
pub struct ValidationError(pub Vec<Violation>);

impl ValidationError {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// 違反したフィールド名の一覧（ログ出力用）
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|v| v.field).collect()
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_field(field: &'static str, value: Option<&str>) -> Option<Violation> {
    match value {
        None => Some(Violation {
            field,
            kind: ViolationKind::Missing,
        }),
        Some(v) if v.is_empty() => Some(Violation {
            field,
            kind: ViolationKind::Blank,
        }),
        Some(_) => None,
    }
}

/// 作成リクエストの違反を列挙する
///
/// チェック順は name, email, message。違反がなければ空のVecを返す。
pub fn validate_create_request(request: &CreateMessageRequest) -> Vec<Violation> {
    [
        check_field("name", request.name.as_deref()),
        check_field("email", request.email.as_deref()),
        check_field("message", request.message.as_deref()),
    ]
    .into_iter()
    .flatten()
    .collect()
}

impl TryFrom<CreateMessageRequest> for NewMessage {
    type Error = ValidationError;

    fn try_from(request: CreateMessageRequest) -> Result<Self, Self::Error> {
        let violations = validate_create_request(&request);

        match (request.name, request.email, request.message) {
            (Some(name), Some(email), Some(message)) if violations.is_empty() => Ok(NewMessage {
                name,
                email,
                message,
            }),
            _ => Err(ValidationError(violations)),
        }
    }
}
