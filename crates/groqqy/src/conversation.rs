use crate::models::message::{Message, ToolCallRequest};

/// Ordered message history of a single conversation.
///
/// Messages are only ever appended; the history is what gets replayed to the
/// provider on every turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationManager {
    messages: Vec<Message>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user<S: Into<String>>(&mut self, text: S) {
        self.messages.push(Message::user(text));
    }

    pub fn add_assistant<S: Into<String>>(&mut self, text: S) {
        self.messages.push(Message::assistant(text));
    }

    /// Record an assistant turn that requested tool calls
    pub fn add_tool_calls<S: Into<String>>(&mut self, text: S, calls: Vec<ToolCallRequest>) {
        self.messages
            .push(Message::assistant_with_tool_calls(text, calls));
    }

    pub fn add_tool_result<I: Into<String>, S: Into<String>>(&mut self, tool_call_id: I, result: S) {
        self.messages.push(Message::tool_result(tool_call_id, result));
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    #[test]
    fn test_messages_keep_order() {
        let mut conversation = ConversationManager::new();
        conversation.add_user("what is 2 + 3?");
        conversation.add_tool_calls("", vec![ToolCallRequest::new("c1", "add", "{}")]);
        conversation.add_tool_result("c1", "5");
        conversation.add_assistant("The answer is 5");

        let roles: Vec<Role> = conversation.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert!(conversation.history()[1].has_tool_calls());
        assert_eq!(
            conversation.history()[2].tool_call_id.as_deref(),
            Some("c1")
        );
        assert_eq!(
            conversation.last().map(|m| m.content.as_str()),
            Some("The answer is 5")
        );
    }

    #[test]
    fn test_reset_clears_history() {
        let mut conversation = ConversationManager::new();
        conversation.add_user("hello");
        assert_eq!(conversation.len(), 1);

        conversation.reset();
        assert!(conversation.is_empty());
        assert!(conversation.history().is_empty());
    }
}
