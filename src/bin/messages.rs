/// メッセージAPI HTTP Lambdaエントリポイント
///
/// API Gateway経由のHTTPリクエストを受け取り、MessageHandlerで
/// 一覧・取得・作成・削除を処理する。
/// DynamoDBクライアントは起動時に一度だけ構築し、warm start間で再利用する。
use aws_sdk_dynamodb::Client as DynamoDbClient;
use lambda_http::{run, service_fn, Error, Request};
use messages::application::MessageHandler;
use messages::infrastructure::{
    init_logging, load_dynamodb_client, DynamoMessageTable, MessagesConfig, TableMessageRepository,
};
use tracing::info;

type Handler = MessageHandler<TableMessageRepository<DynamoMessageTable>>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    let config = MessagesConfig::from_env()?;
    let client = load_dynamodb_client().await;

    info!(
        table = config.table_name(),
        base_path = config.base_path(),
        "メッセージAPI Lambda関数を初期化"
    );

    let handler = build_handler(client, &config);
    let handler = &handler;

    run(service_fn(move |request: Request| async move {
        Ok::<_, Error>(handler.handle_request(request).await)
    }))
    .await
}

/// 設定とクライアントからハンドラーを構築
fn build_handler(client: DynamoDbClient, config: &MessagesConfig) -> Handler {
    let table = DynamoMessageTable::new(client, config.table_name().to_string());
    MessageHandler::new(TableMessageRepository::new(table), config.base_path())
}
