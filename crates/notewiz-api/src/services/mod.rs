//! Outbound services used by the handlers.

pub mod ai_chat;
pub mod redis_counter;

pub use ai_chat::{interaction_cost, ChatBackend, ChatPrompt, ChatReply, DeepSeekClient};
pub use redis_counter::RedisCounterStore;
