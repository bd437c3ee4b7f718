pub mod cache;
pub mod gate;
pub mod service;

pub use cache::ConversationCache;
pub use service::MessagingService;
