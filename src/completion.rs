use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::error::RemoteCallError;
use crate::model::Message;
use crate::providers;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, RemoteCallError>> + 'a>>;

/// Turns a conversation into the next assistant reply.
pub trait Completer {
    fn complete<'a>(&'a self, messages: &'a [Message]) -> CompletionFuture<'a>;
}

/// Completer backed by the configured chat-completions endpoint.
pub struct HttpCompleter<'a> {
    client: &'a Client,
    cfg: &'a Config,
}

impl<'a> HttpCompleter<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self { client, cfg }
    }
}

impl Completer for HttpCompleter<'_> {
    fn complete<'a>(&'a self, messages: &'a [Message]) -> CompletionFuture<'a> {
        Box::pin(providers::openai::chat(self.client, self.cfg, messages))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::{Completer, CompletionFuture};
    use crate::error::RemoteCallError;
    use crate::model::Message;

    /// Replays canned outcomes in order and records every context it was given.
    /// Once the script runs out it echoes the last user message.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedCompleter {
        pub(crate) calls: RefCell<Vec<Vec<Message>>>,
        script: RefCell<VecDeque<Result<String, RemoteCallError>>>,
    }

    impl ScriptedCompleter {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, content: impl Into<String>) -> Self {
            self.script.borrow_mut().push_back(Ok(content.into()));
            self
        }

        pub(crate) fn fail(self, err: RemoteCallError) -> Self {
            self.script.borrow_mut().push_back(Err(err));
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Completer for ScriptedCompleter {
        fn complete<'a>(&'a self, messages: &'a [Message]) -> CompletionFuture<'a> {
            self.calls.borrow_mut().push(messages.to_vec());
            let outcome = self.script.borrow_mut().pop_front().unwrap_or_else(|| {
                let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
                Ok(format!("echo: {last}"))
            });
            Box::pin(async move { outcome })
        }
    }
}
