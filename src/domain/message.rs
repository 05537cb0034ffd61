/// お問い合わせメッセージのドメインモデル
///
/// 保存済みレコード（`Message`）、作成リクエスト（`CreateMessageRequest`）、
/// バリデーション済みの作成内容（`NewMessage`）を定義する。
use serde::{Deserialize, Serialize};

/// 保存済みのメッセージレコード
///
/// JSONとDynamoDB属性のどちらも同じフィールド名を使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 作成時にサーバー側で採番されるID（主キー）
    pub id: String,
    /// 送信者名
    pub name: String,
    /// 送信者メールアドレス
    pub email: String,
    /// 本文
    pub message: String,
}

impl Message {
    /// 採番済みIDとバリデーション済みの内容からレコードを構築
    pub fn new(id: String, new_message: NewMessage) -> Self {
        Self {
            id,
            name: new_message.name,
            email: new_message.email,
            message: new_message.message,
        }
    }
}

/// POSTリクエストボディ
///
/// フィールドの欠落や`null`はデシリアライズ段階ではエラーにせず、
/// バリデーションで400として扱うため`Option`で受ける。
/// 型が違う場合（数値など）はデシリアライズエラー（422）になる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// バリデーションを通過した作成内容
///
/// `validate_create_request`経由でのみ構築されるため、
/// 全フィールドが空でないことが保証される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) message: String,
}
