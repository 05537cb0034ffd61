/// メッセージAPIの設定
///
/// プロセス起動時に一度だけ環境変数から読み込む。
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;

/// テーブル名の環境変数
pub const MESSAGES_TABLE_ENV: &str = "MESSAGES_TABLE";
/// リソースパスの環境変数
pub const MESSAGES_BASE_PATH_ENV: &str = "MESSAGES_BASE_PATH";

/// テーブル名のデフォルト値
pub const DEFAULT_TABLE_NAME: &str = "Msgs";
/// リソースパスのデフォルト値
pub const DEFAULT_BASE_PATH: &str = "/messages";

/// 設定のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// 環境変数が空文字列
    #[error("Empty environment variable: {0}")]
    EmptyEnvVar(String),

    /// パスが`/`で始まっていない
    #[error("Invalid base path (must start with '/'): {0}")]
    InvalidBasePath(String),
}

/// メッセージAPIの設定値
///
/// 環境変数:
/// - MESSAGES_TABLE: メッセージ保存用テーブル（デフォルト: Msgs）
/// - MESSAGES_BASE_PATH: Locationヘッダーに使うリソースパス（デフォルト: /messages）
#[derive(Debug, Clone, PartialEq)]
pub struct MessagesConfig {
    /// メッセージテーブル名
    table_name: String,
    /// リソースパス（末尾の`/`なし）
    base_path: String,
}

impl MessagesConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        let table_name = std::env::var(MESSAGES_TABLE_ENV).ok();
        let base_path = std::env::var(MESSAGES_BASE_PATH_ENV).ok();

        Self::from_values(table_name.as_deref(), base_path.as_deref())
    }

    /// 明示的な値から設定を作成（未設定ならデフォルト値）
    pub fn from_values(table_name: Option<&str>, base_path: Option<&str>) -> Result<Self, ConfigError> {
        let table_name = match table_name {
            None => DEFAULT_TABLE_NAME.to_string(),
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::EmptyEnvVar(MESSAGES_TABLE_ENV.to_string()));
            }
            Some(name) => name.trim().to_string(),
        };

        let base_path = match base_path {
            None => DEFAULT_BASE_PATH.to_string(),
            Some(path) => Self::normalize_base_path(path)?,
        };

        Ok(Self {
            table_name,
            base_path,
        })
    }

    fn normalize_base_path(path: &str) -> Result<String, ConfigError> {
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidBasePath(path.to_string()));
        }

        // "/" のみの場合はルート直下（空文字列）として扱う
        Ok(path.trim_end_matches('/').to_string())
    }

    /// テーブル名を取得
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// リソースパスを取得
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

/// 環境からAWS設定を読み込み、DynamoDBクライアントを作成
///
/// 認証情報・リージョン・エンドポイントはaws-configのデフォルトチェーンで解決する。
pub async fn load_dynamodb_client() -> DynamoDbClient {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    DynamoDbClient::new(&aws_config)
}
