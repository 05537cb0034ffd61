// Infrastructure layer modules
pub mod config;
pub mod logging;
pub mod message_repository;
pub mod message_table;

// Re-exports
pub use config::{load_dynamodb_client, ConfigError, MessagesConfig};
pub use logging::init_logging;
pub use message_repository::{MessageRepository, RepositoryError, TableMessageRepository};
pub use message_table::{DynamoMessageTable, Item, MessageTable, ScanPage};
