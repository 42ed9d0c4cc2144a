//! Chat operations for the UI and CLI, scoped to the active tab.

use tracing::{info, warn};

use crate::error::{Result, TutorError};
use crate::models::{DeliveryStatus, Message, TabType};
use crate::reconciler::{self, ChatTransport, SendRequest};
use crate::store::Store;
use crate::validation::{rules, ValidationErrors};

pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const HISTORY_FAILED_MESSAGE: &str = "Failed to load chat history.";
pub const CLEAR_FAILED_MESSAGE: &str = "Failed to clear chat history.";

pub struct ChatManager<'a, T: ChatTransport + ?Sized> {
    store: &'a mut Store,
    transport: &'a T,
}

impl<'a, T: ChatTransport + ?Sized> ChatManager<'a, T> {
    pub fn new(store: &'a mut Store, transport: &'a T) -> Self {
        Self { store, transport }
    }

    pub fn active_tab(&self) -> TabType {
        self.store.active_tab()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.store.error(self.store.active_tab())
    }

    /// Messages of the active tab, pending and committed, in creation order.
    pub fn messages(&self) -> &[Message] {
        self.store.messages(self.store.active_tab())
    }

    pub fn switch_tab(&mut self, tab: TabType) {
        self.store.set_active_tab(tab);
    }

    pub fn clear_error(&mut self) {
        let tab = self.store.active_tab();
        self.store.clear_error(tab);
    }

    pub fn has_unread_messages(&self, tab: TabType) -> bool {
        self.store
            .messages(tab)
            .iter()
            .any(|m| m.status.is_unresolved())
    }

    pub fn get_message_count(&self, tab: TabType) -> usize {
        self.store.messages(tab).len()
    }

    /// Validates `text` and appends it to the active tab as pending. Nothing
    /// is sent yet.
    pub fn prepare_send(&mut self, text: &str) -> Result<SendRequest> {
        let text = text.trim();
        let mut errors = ValidationErrors::default();
        if let Some(msg) = rules::required(text, "message") {
            errors.push("message", msg);
        }
        if let Some(msg) = rules::max_length(text, MAX_MESSAGE_LENGTH, "message") {
            errors.push("message", msg);
        }
        errors.into_result()?;

        let tab = self.store.active_tab();
        self.store.set_loading(true);
        Ok(reconciler::begin_send(self.store, tab, text))
    }

    /// Sends a prepared request and folds the outcome into the store.
    pub async fn deliver(&mut self, request: &SendRequest) -> Result<DeliveryStatus> {
        let result = reconciler::dispatch(self.store, self.transport, request).await;
        self.store.set_loading(false);
        result
    }

    pub async fn send_message(&mut self, text: &str) -> Result<DeliveryStatus> {
        let request = self.prepare_send(text)?;
        self.deliver(&request).await
    }

    pub async fn retry_message(&mut self, client_id: &str) -> Result<DeliveryStatus> {
        let request = reconciler::retry(self.store, client_id)?;
        self.store.set_loading(true);
        self.deliver(&request).await
    }

    /// Replaces the tab's committed messages with the server's history.
    /// Returns the number of messages now in the tab.
    pub async fn load_history(&mut self, tab: TabType) -> Result<usize> {
        self.store.set_loading(true);
        let result = self.transport.history(tab).await;
        self.store.set_loading(false);

        match result {
            Ok(history) => {
                self.store.replace_history(tab, history);
                self.store.clear_error(tab);
                Ok(self.store.messages(tab).len())
            }
            Err(err) => {
                warn!(tab = tab.as_str(), error = %err, "failed to load chat history");
                self.store.set_error(tab, err.user_message(HISTORY_FAILED_MESSAGE));
                Err(TutorError::Api(err))
            }
        }
    }

    pub async fn clear_history(&mut self, tab: TabType) -> Result<bool> {
        match self.transport.clear_history(tab).await {
            Ok(true) => {
                self.store.clear_messages(tab);
                info!(tab = tab.as_str(), "chat history cleared");
                Ok(true)
            }
            Ok(false) => {
                self.store.set_error(tab, CLEAR_FAILED_MESSAGE);
                Ok(false)
            }
            Err(err) => {
                warn!(tab = tab.as_str(), error = %err, "failed to clear chat history");
                self.store.set_error(tab, err.user_message(CLEAR_FAILED_MESSAGE));
                Err(TutorError::Api(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::{ApiError, SERVER_ERROR_MESSAGE};
    use crate::models::MessageRole;
    use crate::reconciler::test_transport::ScriptedTransport;
    use crate::reconciler::SEND_FAILED_MESSAGE;
    use crate::store::SendReceipt;

    fn reply(content: &str) -> SendReceipt {
        SendReceipt {
            message_id: Some("srv-1".into()),
            timestamp: None,
            reply: Some(Message::committed(
                "r-1",
                MessageRole::Assistant,
                content,
                Utc::now(),
                TabType::Home,
            )),
        }
    }

    mod send_tests {
        use super::*;

        #[tokio::test]
        async fn send_appends_user_and_reply() {
            let mut store = Store::new();
            let transport = ScriptedTransport::with(vec![Ok(reply("Hello!"))]);
            let mut chat = ChatManager::new(&mut store, &transport);

            let status = chat.send_message("  hi  ").await.unwrap();
            assert_eq!(status, DeliveryStatus::Sent);
            assert!(!chat.is_loading());

            let messages = chat.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].content, "hi");
            assert_eq!(messages[0].id, "srv-1");
            assert_eq!(messages[1].content, "Hello!");
            assert_eq!(transport.sent.borrow()[0].message, "hi");
        }

        #[tokio::test]
        async fn empty_message_never_reaches_transport() {
            let mut store = Store::new();
            let transport = ScriptedTransport::default();
            let mut chat = ChatManager::new(&mut store, &transport);

            let err = chat.send_message("   ").await.unwrap_err();
            assert!(matches!(err, TutorError::Validation(_)));
            assert!(transport.sent.borrow().is_empty());
            assert_eq!(chat.get_message_count(TabType::Home), 0);
        }

        #[tokio::test]
        async fn overlong_message_is_rejected() {
            let mut store = Store::new();
            let transport = ScriptedTransport::default();
            let mut chat = ChatManager::new(&mut store, &transport);

            let text = "x".repeat(MAX_MESSAGE_LENGTH + 1);
            assert!(chat.send_message(&text).await.is_err());
            assert!(transport.sent.borrow().is_empty());

            let text = "x".repeat(MAX_MESSAGE_LENGTH);
            assert!(chat.send_message(&text).await.is_ok());
        }

        #[test]
        fn prepared_message_is_visible_before_delivery() {
            let mut store = Store::new();
            let transport = ScriptedTransport::default();
            let mut chat = ChatManager::new(&mut store, &transport);

            let request = chat.prepare_send("draft").unwrap();
            assert!(chat.is_loading());
            assert!(chat.has_unread_messages(TabType::Home));
            assert_eq!(chat.messages()[0].client_id, request.client_id);
            assert_eq!(chat.messages()[0].status, DeliveryStatus::Pending);
        }

        #[tokio::test]
        async fn failure_then_retry() {
            let mut store = Store::new();
            let transport = ScriptedTransport::with(vec![
                Err(ApiError::Server { status: 502 }),
                Ok(SendReceipt::default()),
            ]);
            let mut chat = ChatManager::new(&mut store, &transport);

            let status = chat.send_message("again").await.unwrap();
            assert_eq!(status, DeliveryStatus::Failed);
            assert_eq!(chat.error(), Some(SERVER_ERROR_MESSAGE));
            assert!(chat.has_unread_messages(TabType::Home));

            let client_id = chat.messages()[0].client_id.clone();
            let status = chat.retry_message(&client_id).await.unwrap();
            assert_eq!(status, DeliveryStatus::Sent);
            assert!(chat.error().is_none());
            assert!(!chat.has_unread_messages(TabType::Home));
            assert_eq!(chat.get_message_count(TabType::Home), 1);
        }
    }

    mod tab_tests {
        use super::*;

        #[tokio::test]
        async fn messages_and_errors_are_per_tab() {
            let mut store = Store::new();
            let transport =
                ScriptedTransport::with(vec![Err(ApiError::Network("offline".into()))]);
            let mut chat = ChatManager::new(&mut store, &transport);

            chat.switch_tab(TabType::Review);
            chat.send_message("quiz me").await.unwrap();
            assert_eq!(chat.error(), Some(SEND_FAILED_MESSAGE));

            chat.switch_tab(TabType::Home);
            assert!(chat.messages().is_empty());
            assert!(chat.error().is_none());
            assert_eq!(chat.get_message_count(TabType::Review), 1);

            chat.switch_tab(TabType::Review);
            chat.clear_error();
            assert!(chat.error().is_none());
            assert_eq!(chat.active_tab(), TabType::Review);
        }
    }

    mod history_tests {
        use super::*;

        #[tokio::test]
        async fn load_history_keeps_local_failures() {
            let mut store = Store::new();
            let transport = ScriptedTransport::with(vec![Err(ApiError::RateLimited)]);
            transport.history.borrow_mut().push(Message::committed(
                "h1",
                MessageRole::Assistant,
                "Welcome back",
                Utc::now(),
                TabType::Home,
            ));
            let mut chat = ChatManager::new(&mut store, &transport);

            chat.send_message("unsent").await.unwrap();
            let count = chat.load_history(TabType::Home).await.unwrap();

            assert_eq!(count, 2);
            assert_eq!(chat.messages()[0].content, "Welcome back");
            assert_eq!(chat.messages()[1].content, "unsent");
            assert_eq!(chat.messages()[1].status, DeliveryStatus::Failed);
        }

        #[tokio::test]
        async fn clear_history_empties_the_tab() {
            let mut store = Store::new();
            let transport = ScriptedTransport::default();
            let mut chat = ChatManager::new(&mut store, &transport);

            chat.send_message("one").await.unwrap();
            assert!(chat.clear_history(TabType::Home).await.unwrap());
            assert_eq!(chat.get_message_count(TabType::Home), 0);
        }
    }
}
