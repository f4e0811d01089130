pub mod conversation;
pub mod session;
pub mod traits;

pub use conversation::{Conversation, ConversationTurn};
pub use session::{ChatSession, TurnOutcome};
pub use traits::{CompletionGateway, ToolBackend};
