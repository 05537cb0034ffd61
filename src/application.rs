// アプリケーション層モジュール
pub mod message_handler;

// 再エクスポート
pub use message_handler::MessageHandler;
