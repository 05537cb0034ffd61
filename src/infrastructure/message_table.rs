/// メッセージテーブルへのキーバリュー操作
///
/// DynamoDBのプリミティブ（GetItem / PutItem / DeleteItem / Scan 1ページ分）だけを扱い、
/// 構造体との変換やページネーションは`TableMessageRepository`側で行う。
use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing::debug;

use super::message_repository::RepositoryError;

/// DynamoDBの1アイテム（属性名 → 値）
pub type Item = HashMap<String, AttributeValue>;

/// 主キー属性名
pub const KEY_ATTRIBUTE: &str = "id";

/// Scan 1回分の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    /// このページのアイテム
    pub items: Vec<Item>,
    /// 続きがある場合の継続トークン（LastEvaluatedKey）
    pub last_evaluated_key: Option<Item>,
}

/// メッセージテーブルのキーバリュー操作トレイト
///
/// 実際のDynamoDBとテスト用のインメモリ実装を差し替えられるようにする。
#[async_trait]
pub trait MessageTable: Send + Sync {
    /// 主キーでアイテムを取得（存在しなければ`Ok(None)`）
    async fn get_item(&self, id: &str) -> Result<Option<Item>, RepositoryError>;

    /// アイテムを無条件に書き込む
    async fn put_item(&self, item: Item) -> Result<(), RepositoryError>;

    /// 主キーでアイテムを削除し、削除前の値を返す（存在しなければ`Ok(None)`）
    async fn delete_item(&self, id: &str) -> Result<Option<Item>, RepositoryError>;

    /// `exclusive_start_key`の続きから1ページ分スキャン
    async fn scan_page(&self, exclusive_start_key: Option<Item>)
    -> Result<ScanPage, RepositoryError>;
}

/// MessageTableのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoMessageTable {
    /// DynamoDBクライアント（プロセス全体で共有）
    client: DynamoDbClient,
    /// メッセージテーブル名
    table_name: String,
}

impl DynamoMessageTable {
    /// 新しいDynamoMessageTableを作成
    ///
    /// # 引数
    /// * `client` - DynamoDBクライアント
    /// * `table_name` - メッセージテーブルの名前
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl MessageTable for DynamoMessageTable {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, RepositoryError> {
        debug!(table = %self.table_name, id = id, "GetItem呼び出し");

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

        Ok(result.item)
    }

    async fn put_item(&self, item: Item) -> Result<(), RepositoryError> {
        debug!(table = %self.table_name, "PutItem呼び出し");

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<Option<Item>, RepositoryError> {
        debug!(table = %self.table_name, id = id, "DeleteItem呼び出し");

        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.into_service_error().to_string()))?;

        // 該当アイテムがない場合、Attributesは返らない
        Ok(result.attributes.filter(|attrs| !attrs.is_empty()))
    }

    async fn scan_page(
        &self,
        exclusive_start_key: Option<Item>,
    ) -> Result<ScanPage, RepositoryError> {
        debug!(
            table = %self.table_name,
            continued = exclusive_start_key.is_some(),
            "Scan呼び出し"
        );

        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

        Ok(ScanPage {
            items: result.items.unwrap_or_default(),
            last_evaluated_key: result.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// ユニットテスト用のインメモリMessageTable
    ///
    /// 主キー昇順でスキャンし、`page_size`件ごとにLastEvaluatedKeyを返す。
    #[derive(Debug, Clone)]
    pub struct InMemoryMessageTable {
        /// 保存されたアイテム: id -> Item
        items: Arc<Mutex<BTreeMap<String, Item>>>,
        /// 1回のScanで返す最大件数
        page_size: usize,
        /// 実行されたScan回数
        scan_calls: Arc<Mutex<usize>>,
        /// 次の操作で返すエラー（エラーパスのテスト用）
        next_error: Arc<Mutex<Option<RepositoryError>>>,
        /// 指定回数目のScanで返すエラー（ページ途中の失敗テスト用）
        fail_on_scan: Arc<Mutex<Option<(usize, RepositoryError)>>>,
    }

    impl InMemoryMessageTable {
        pub fn new() -> Self {
            Self::with_page_size(100)
        }

        pub fn with_page_size(page_size: usize) -> Self {
            Self {
                items: Arc::new(Mutex::new(BTreeMap::new())),
                page_size: page_size.max(1),
                scan_calls: Arc::new(Mutex::new(0)),
                next_error: Arc::new(Mutex::new(None)),
                fail_on_scan: Arc::new(Mutex::new(None)),
            }
        }

        pub fn set_next_error(&self, error: RepositoryError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        /// `call`回目（1始まり）のScanでエラーを返す
        pub fn fail_on_scan_call(&self, call: usize, error: RepositoryError) {
            *self.fail_on_scan.lock().unwrap() = Some((call, error));
        }

        pub fn item_count(&self) -> usize {
            self.items.lock().unwrap().len()
        }

        pub fn scan_calls(&self) -> usize {
            *self.scan_calls.lock().unwrap()
        }

        pub fn get_item_sync(&self, id: &str) -> Option<Item> {
            self.items.lock().unwrap().get(id).cloned()
        }

        /// 任意のアイテムを直接書き込む（不正データのテスト用）
        pub fn insert_raw(&self, id: &str, item: Item) {
            self.items.lock().unwrap().insert(id.to_string(), item);
        }

        fn take_error(&self) -> Option<RepositoryError> {
            self.next_error.lock().unwrap().take()
        }

        fn key_of(item: &Item) -> Result<String, RepositoryError> {
            item.get(KEY_ATTRIBUTE)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .ok_or_else(|| RepositoryError::WriteError("Missing id attribute".to_string()))
        }
    }

    #[async_trait]
    impl MessageTable for InMemoryMessageTable {
        async fn get_item(&self, id: &str) -> Result<Option<Item>, RepositoryError> {
            if let Some(err) = self.take_error() {
                return Err(err);
            }
            Ok(self.items.lock().unwrap().get(id).cloned())
        }

        async fn put_item(&self, item: Item) -> Result<(), RepositoryError> {
            if let Some(err) = self.take_error() {
                return Err(err);
            }
            let id = Self::key_of(&item)?;
            self.items.lock().unwrap().insert(id, item);
            Ok(())
        }

        async fn delete_item(&self, id: &str) -> Result<Option<Item>, RepositoryError> {
            if let Some(err) = self.take_error() {
                return Err(err);
            }
            Ok(self.items.lock().unwrap().remove(id))
        }

        async fn scan_page(
            &self,
            exclusive_start_key: Option<Item>,
        ) -> Result<ScanPage, RepositoryError> {
            let call = {
                let mut calls = self.scan_calls.lock().unwrap();
                *calls += 1;
                *calls
            };

            if let Some(err) = self.take_error() {
                return Err(err);
            }
            {
                let mut fail = self.fail_on_scan.lock().unwrap();
                if fail.as_ref().is_some_and(|(n, _)| *n == call) {
                    let (_, err) = fail.take().unwrap();
                    return Err(err);
                }
            }

            let start = match exclusive_start_key {
                Some(key) => Some(Self::key_of(&key)?),
                None => None,
            };

            let items = self.items.lock().unwrap();
            let mut remaining = items
                .iter()
                .filter(|(id, _)| start.as_ref().is_none_or(|s| id.as_str() > s.as_str()));

            let page: Vec<(String, Item)> = remaining
                .by_ref()
                .take(self.page_size)
                .map(|(id, item)| (id.clone(), item.clone()))
                .collect();
            let has_more = remaining.next().is_some();

            let last_evaluated_key = match (has_more, page.last()) {
                (true, Some((id, _))) => Some(HashMap::from([(
                    KEY_ATTRIBUTE.to_string(),
                    AttributeValue::S(id.clone()),
                )])),
                _ => None,
            };

            Ok(ScanPage {
                items: page.into_iter().map(|(_, item)| item).collect(),
                last_evaluated_key,
            })
        }
    }

    fn item(id: &str) -> Item {
        HashMap::from([
            (KEY_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string())),
            ("name".to_string(), AttributeValue::S("n".to_string())),
        ])
    }

    #[test]
    fn test_scan_page_default() {
        let page = ScanPage::default();
        assert!(page.items.is_empty());
        assert!(page.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_table_put_get_delete() {
        let table = InMemoryMessageTable::new();

        table.put_item(item("a")).await.unwrap();
        assert_eq!(table.item_count(), 1);
        assert_eq!(table.get_item("a").await.unwrap(), Some(item("a")));

        let deleted = table.delete_item("a").await.unwrap();
        assert_eq!(deleted, Some(item("a")));
        assert!(table.get_item("a").await.unwrap().is_none());
        assert!(table.delete_item("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_table_scan_pages() {
        let table = InMemoryMessageTable::with_page_size(2);
        for id in ["a", "b", "c", "d", "e"] {
            table.put_item(item(id)).await.unwrap();
        }

        let first = table.scan_page(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.last_evaluated_key.is_some());

        let second = table.scan_page(first.last_evaluated_key).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.last_evaluated_key.is_some());

        let third = table.scan_page(second.last_evaluated_key).await.unwrap();
        assert_eq!(third.items, vec![item("e")]);
        assert!(third.last_evaluated_key.is_none());

        assert_eq!(table.scan_calls(), 3);
    }

    #[tokio::test]
    async fn test_in_memory_table_exact_page_boundary_has_no_extra_key() {
        let table = InMemoryMessageTable::with_page_size(2);
        table.put_item(item("a")).await.unwrap();
        table.put_item(item("b")).await.unwrap();

        let page = table.scan_page(None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_table_error_injection() {
        let table = InMemoryMessageTable::new();
        table.set_next_error(RepositoryError::ReadError("unavailable".to_string()));

        assert!(table.get_item("a").await.is_err());
        // エラーは1回だけ
        assert!(table.get_item("a").await.is_ok());
    }
}
