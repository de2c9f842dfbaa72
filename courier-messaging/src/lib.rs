pub mod channel;
pub mod thread;

pub use channel::ConversationChannel;
pub use thread::ConversationThread;
