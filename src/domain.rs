// Domain layer modules
pub mod message;
pub mod message_validator;

// Re-exports
pub use message::{CreateMessageRequest, Message, NewMessage};
pub use message_validator::{validate_create_request, ValidationError, Violation, ViolationKind};
