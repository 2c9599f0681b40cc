pub mod echo;
pub mod traits;
pub mod types;

pub use echo::EchoClient;
pub use traits::{ChatClient, messages_to_text};
pub use types::{ChatMessage, ChatRequest, ChatResponse, ContentBlock, MessageRole};
