use tracing::{debug, warn};

use crate::completion::Completer;
use crate::error::RemoteCallError;
use crate::model::{Conversation, Message};

/// Owns the conversation for one process and drives single turns through a [`Completer`].
pub struct ChatSession<C> {
    completer: C,
    conversation: Conversation,
    system_messages: Vec<Message>,
    context_window: Option<usize>,
}

impl<C: Completer> ChatSession<C> {
    pub fn new(completer: C) -> Self {
        Self {
            completer,
            conversation: Conversation::new(),
            system_messages: Vec::new(),
            context_window: None,
        }
    }

    /// Seeds the conversation with a system prompt that survives `/reset` and is always sent.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_messages.push(Message::system(prompt));
        self.reset();
        self
    }

    /// Limits how many non-system messages are sent with each request.
    pub fn with_context_window(mut self, window: Option<usize>) -> Self {
        self.context_window = window;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[cfg(test)]
    pub(crate) fn completer(&self) -> &C {
        &self.completer
    }

    pub fn reset(&mut self) {
        self.conversation = Conversation::new();
        for message in &self.system_messages {
            self.conversation.push(message.clone());
        }
    }

    /// Sends one user line and records the reply. On failure the conversation is left as it
    /// was before the call.
    pub async fn send(&mut self, user_input: &str) -> Result<String, RemoteCallError> {
        let checkpoint = self.conversation.len();
        self.conversation.push(Message::user(user_input));

        let context = self
            .conversation
            .context_window(self.system_messages.len(), self.context_window);
        debug!(
            history_len = self.conversation.len(),
            context_len = context.len(),
            "running chat turn"
        );

        match self.completer.complete(&context).await {
            Ok(reply) => {
                self.conversation.push(Message::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => {
                warn!(error = %err, "chat turn failed; discarding user message");
                self.conversation.truncate(checkpoint);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChatSession;
    use crate::completion::testing::ScriptedCompleter;
    use crate::error::RemoteCallError;
    use crate::model::{Message, MessageRole};

    #[tokio::test]
    async fn successful_turn_appends_user_and_assistant() {
        let mut session = ChatSession::new(ScriptedCompleter::new().reply("Hi! How can I help?"));

        let reply = session.send("Hello").await.expect("turn should succeed");

        assert_eq!(reply, "Hi! How can I help?");
        assert_eq!(
            session.conversation().messages(),
            &[
                Message::user("Hello"),
                Message::assistant("Hi! How can I help?")
            ]
        );
    }

    #[tokio::test]
    async fn each_turn_grows_history_by_two_and_sends_full_context() {
        let mut session = ChatSession::new(ScriptedCompleter::new());

        for (turn, input) in ["one", "two", "three"].into_iter().enumerate() {
            session.send(input).await.expect("turn should succeed");
            assert_eq!(session.conversation().len(), (turn + 1) * 2);
        }

        let calls = session.completer().calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].len(), 5);
        assert_eq!(calls[2][0].content, "one");
        assert_eq!(calls[2][4].content, "three");
    }

    #[tokio::test]
    async fn failed_turn_leaves_conversation_unchanged() {
        let mut session = ChatSession::new(
            ScriptedCompleter::new()
                .reply("first")
                .fail(RemoteCallError::EmptyReply),
        );
        session.send("a").await.expect("first turn should succeed");
        let before = session.conversation().clone();

        let err = session.send("b").await.expect_err("second turn fails");

        assert!(matches!(err, RemoteCallError::EmptyReply));
        assert_eq!(session.conversation(), &before);

        session.send("b").await.expect("retry should succeed");
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test]
    async fn system_prompt_is_pinned_and_survives_reset() {
        let mut session = ChatSession::new(ScriptedCompleter::new())
            .with_system_prompt("Be terse.")
            .with_context_window(Some(2));

        session.send("one").await.expect("turn");
        session.send("two").await.expect("turn");

        {
            let calls = session.completer().calls.borrow();
            let last = calls.last().expect("at least one call");
            let roles: Vec<MessageRole> = last.iter().map(|m| m.role).collect();
            assert_eq!(
                roles,
                vec![MessageRole::System, MessageRole::Assistant, MessageRole::User]
            );
            assert_eq!(last[2].content, "two");
        }
        assert_eq!(session.conversation().len(), 5);

        session.reset();
        assert_eq!(
            session.conversation().messages(),
            &[Message::system("Be terse.")]
        );
    }
}
