/// メッセージレコードの永続化
///
/// `Message`とDynamoDBアイテムの相互変換、ID採番、Scanのページネーションを担う。
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::message_table::{Item, MessageTable};
use crate::domain::{Message, NewMessage};

/// リポジトリ操作のエラー型
///
/// ルーター側ではすべて500として扱うため、これ以上の分類はしない。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// DynamoDBからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// DynamoDBへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// アイテムとレコード間の変換に失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_dynamo::Error> for RepositoryError {
    fn from(err: serde_dynamo::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// メッセージ永続化用トレイト
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// IDでメッセージを取得
    ///
    /// # 戻り値
    /// * 見つかった場合は`Ok(Some(Message))`
    /// * 見つからなかった場合は`Ok(None)`
    /// * 失敗時は`Err(RepositoryError)`
    async fn get(&self, id: &str) -> Result<Option<Message>, RepositoryError>;

    /// 新しいIDを採番してメッセージを保存
    ///
    /// 上書きチェックは行わない。戻り値は書き込んだレコードそのもの。
    async fn create(&self, new_message: NewMessage) -> Result<Message, RepositoryError>;

    /// IDでメッセージを削除し、削除前のレコードを返す
    ///
    /// 存在しなかった場合は`Ok(None)`。
    async fn delete(&self, id: &str) -> Result<Option<Message>, RepositoryError>;

    /// 全メッセージを取得
    ///
    /// 順序はScanの返却順のまま。1ページでも失敗すれば全体がエラーになる。
    async fn list(&self) -> Result<Vec<Message>, RepositoryError>;
}

/// MessageTable上に構築したMessageRepository実装
#[derive(Debug, Clone)]
pub struct TableMessageRepository<T>
where
    T: MessageTable,
{
    table: T,
}

impl<T> TableMessageRepository<T>
where
    T: MessageTable,
{
    /// 新しいTableMessageRepositoryを作成
    pub fn new(table: T) -> Self {
        Self { table }
    }

    /// 新しいメッセージIDを生成（UUID v4）
    fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn to_item(message: &Message) -> Result<Item, RepositoryError> {
        Ok(serde_dynamo::to_item(message)?)
    }

    fn from_item(item: Item) -> Result<Message, RepositoryError> {
        Ok(serde_dynamo::from_item(item)?)
    }
}

#[async_trait]
impl<T> MessageRepository for TableMessageRepository<T>
where
    T: MessageTable,
{
    async fn get(&self, id: &str) -> Result<Option<Message>, RepositoryError> {
        self.table
            .get_item(id)
            .await?
            .map(Self::from_item)
            .transpose()
    }

    async fn create(&self, new_message: NewMessage) -> Result<Message, RepositoryError> {
        let message = Message::new(Self::generate_id(), new_message);
        let item = Self::to_item(&message)?;

        self.table.put_item(item).await?;

        debug!(id = %message.id, "メッセージ保存完了");
        Ok(message)
    }

    async fn delete(&self, id: &str) -> Result<Option<Message>, RepositoryError> {
        self.table
            .delete_item(id)
            .await?
            .map(Self::from_item)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Message>, RepositoryError> {
        let mut messages = Vec::new();
        let mut last_evaluated_key = None;
        let mut pages = 0usize;

        // ページネーション: LastEvaluatedKeyがある限りスキャンを続ける
        loop {
            let page = self.table.scan_page(last_evaluated_key.take()).await?;
            pages += 1;

            for item in page.items {
                messages.push(Self::from_item(item)?);
            }

            match page.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        debug!(pages = pages, count = messages.len(), "メッセージ一覧取得完了");
        Ok(messages)
    }
}
