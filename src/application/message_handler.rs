/// メッセージAPIのリクエストルーター
///
/// HTTPメソッドとパスパラメータ`id`の有無で一覧・取得・作成・削除に振り分け、
/// 結果をステータスコードとJSONボディに変換する。
/// ストレージ層のエラー詳細はログにのみ出力し、クライアントには返さない。
use lambda_http::http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use lambda_http::http::{Method, StatusCode};
use lambda_http::{Body, Request, RequestExt, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::{CreateMessageRequest, NewMessage};
use crate::infrastructure::{MessageRepository, RepositoryError};

/// パスパラメータ名
pub const ID_PATH_PARAMETER: &str = "id";

/// URIパスからIDを取り出せない場合のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// `{base_path}/{id}`の後ろにセグメントが続く
    #[error("unknown resource path")]
    UnknownPath,
    /// パーセントエンコーディングがUTF-8として不正
    #[error("invalid percent-encoding in path")]
    InvalidEncoding,
}

impl PathError {
    /// 対応するレスポンスステータス
    pub fn status(&self) -> StatusCode {
        match self {
            PathError::UnknownPath => StatusCode::NOT_FOUND,
            PathError::InvalidEncoding => StatusCode::BAD_REQUEST,
        }
    }
}

/// メッセージAPIのハンドラー
pub struct MessageHandler<R>
where
    R: MessageRepository,
{
    /// メッセージリポジトリ
    repo: R,
    /// Locationヘッダーに使うリソースパス（末尾の`/`なし）
    base_path: String,
}

impl<R> MessageHandler<R>
where
    R: MessageRepository,
{
    /// 新しいMessageHandlerを作成
    ///
    /// # Arguments
    /// * `repo` - メッセージリポジトリ
    /// * `base_path` - リソースパス（例: `/messages`）
    pub fn new(repo: R, base_path: impl Into<String>) -> Self {
        Self {
            repo,
            base_path: base_path.into(),
        }
    }

    /// Lambda HTTPリクエストを処理
    ///
    /// パスパラメータ`id`とボディを取り出して`handle`に委譲する。
    pub async fn handle_request(&self, request: Request) -> Response<Body> {
        let id = match self.extract_message_id(&request) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, path = %request.uri().path(), "パスからIDを取得できません");
                return client_error(err.status());
            }
        };
        self.handle(request.method(), id.as_deref(), request.body().as_ref())
            .await
    }

    /// リクエストからメッセージIDを取り出す
    ///
    /// API Gatewayのパスパラメータ（デコード済み）を優先し、無い場合はURIパスの
    /// `{base_path}/{id}`部分をパーセントデコードして使う。
    /// base_pathの前にステージ名などのプレフィックスがあってもよい。
    /// 空文字列はID無しとして扱い、ID以降にセグメントが続くパスはエラーにする。
    pub fn extract_message_id(&self, request: &Request) -> Result<Option<String>, PathError> {
        let params = request.path_parameters();
        if let Some(id) = params.first(ID_PATH_PARAMETER) {
            return Ok((!id.is_empty()).then(|| id.to_string()));
        }

        let segments: Vec<&str> = request
            .uri()
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let base: Vec<&str> = self
            .base_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let Some(start) = (0..=segments.len().saturating_sub(base.len()))
            .find(|&i| segments[i..].starts_with(&base))
        else {
            // base_path外のパスはコレクションとして扱う
            return Ok(None);
        };

        match &segments[start + base.len()..] {
            [] => Ok(None),
            [id] => {
                let decoded = urlencoding::decode(id).map_err(|_| PathError::InvalidEncoding)?;
                Ok((!decoded.is_empty()).then(|| decoded.into_owned()))
            }
            _ => Err(PathError::UnknownPath),
        }
    }

    /// メソッド・ID・ボディからレスポンスを生成
    ///
    /// | メソッド | ID | 処理 |
    /// |---|---|---|
    /// | GET | なし | 一覧 |
    /// | GET | あり | 取得 |
    /// | POST | - | 作成 |
    /// | DELETE | あり | 削除 |
    /// | DELETE | なし | 400 |
    /// | その他 | - | 405 |
    pub async fn handle(&self, method: &Method, id: Option<&str>, body: &[u8]) -> Response<Body> {
        let span = info_span!("request", method = %method, message_id = id.unwrap_or(""));

        async move {
            match (method, id) {
                (&Method::GET, None) => self.list_messages().await,
                (&Method::GET, Some(id)) => self.get_message(id).await,
                (&Method::POST, _) => self.create_message(body).await,
                (&Method::DELETE, Some(id)) => self.delete_message(id).await,
                (&Method::DELETE, None) => {
                    warn!("DELETEリクエストにIDがありません");
                    client_error(StatusCode::BAD_REQUEST)
                }
                _ => {
                    warn!("未対応のメソッド");
                    client_error(StatusCode::METHOD_NOT_ALLOWED)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn list_messages(&self) -> Response<Body> {
        info!("メッセージ一覧リクエスト受信");

        match self.repo.list().await {
            Ok(messages) => {
                info!(count = messages.len(), "メッセージ一覧取得成功");
                json_response(StatusCode::OK, &messages)
            }
            Err(err) => server_error(&err),
        }
    }

    async fn get_message(&self, id: &str) -> Response<Body> {
        info!("メッセージ取得リクエスト受信");

        match self.repo.get(id).await {
            Ok(Some(message)) => {
                info!("メッセージ取得成功");
                json_response(StatusCode::OK, &message)
            }
            Ok(None) => {
                info!("メッセージが見つかりません");
                client_error(StatusCode::NOT_FOUND)
            }
            Err(err) => server_error(&err),
        }
    }

    async fn create_message(&self, body: &[u8]) -> Response<Body> {
        let request: CreateMessageRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "リクエストボディをデシリアライズできません");
                return client_error(StatusCode::UNPROCESSABLE_ENTITY);
            }
        };

        let new_message = match NewMessage::try_from(request) {
            Ok(new_message) => new_message,
            Err(err) => {
                warn!(
                    error = %err,
                    fields = ?err.fields(),
                    violation_count = err.violations().len(),
                    "リクエストボディのバリデーションエラー"
                );
                return client_error(StatusCode::BAD_REQUEST);
            }
        };
        info!("メッセージ作成リクエスト受信");

        let message = match self.repo.create(new_message).await {
            Ok(message) => message,
            Err(err) => return server_error(&err),
        };
        info!(created_id = %message.id, "メッセージ作成成功");

        let location = format!("{}/{}", self.base_path, message.id);
        let location = match HeaderValue::from_str(&location) {
            Ok(value) => value,
            Err(err) => {
                error!(error = %err, location = %location, "Locationヘッダーを構築できません");
                return internal_server_error();
            }
        };

        let mut response = json_response(StatusCode::CREATED, &message);
        if response.status() == StatusCode::CREATED {
            response.headers_mut().insert(LOCATION, location);
        }
        response
    }

    async fn delete_message(&self, id: &str) -> Response<Body> {
        info!("メッセージ削除リクエスト受信");

        match self.repo.delete(id).await {
            Ok(Some(message)) => {
                info!("メッセージ削除成功");
                json_response(StatusCode::OK, &message)
            }
            Ok(None) => {
                info!("削除対象のメッセージが見つかりません");
                client_error(StatusCode::NOT_FOUND)
            }
            Err(err) => server_error(&err),
        }
    }
}

/// JSONボディのレスポンスを構築
fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_string(value) {
        Ok(json) => {
            let mut response = Response::new(Body::Text(json));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            error!(error = %err, "レスポンスのシリアライズに失敗");
            internal_server_error()
        }
    }
}

/// ステータスの標準理由句をボディにしたレスポンスを構築
fn client_error(status: StatusCode) -> Response<Body> {
    let reason = status.canonical_reason().unwrap_or_default();
    let mut response = Response::new(Body::Text(reason.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// ストレージエラーをログに出力し、500を返す
fn server_error(err: &RepositoryError) -> Response<Body> {
    error!(error = %err, "ストレージ操作に失敗");
    internal_server_error()
}

fn internal_server_error() -> Response<Body> {
    client_error(StatusCode::INTERNAL_SERVER_ERROR)
}
