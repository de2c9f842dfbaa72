use courier_core::types::{Message, MessageId};

/// Messages of one conversation in chronological order.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    conversation_id: i64,
    messages: Vec<Message>,
}

impl ConversationThread {
    pub fn new(conversation_id: i64) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    /// Replace the thread with fetched history. Entries from other
    /// conversations are dropped.
    pub fn load_history(&mut self, mut history: Vec<Message>) {
        history.retain(|m| m.conversation_id == self.conversation_id);
        history.sort_by_key(|m| m.created_at);
        self.messages = history;
    }

    /// Append a pushed message. Returns false when it belongs elsewhere.
    pub fn append(&mut self, message: Message) -> bool {
        if message.conversation_id != self.conversation_id {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn mark_read(&mut self, id: MessageId) -> bool {
        let mut changed = false;
        for message in self.messages.iter_mut().filter(|m| m.id == id && !m.read) {
            message.read = true;
            changed = true;
        }
        changed
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.read).count()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
