//! Optimistic delivery of chat messages.
//!
//! A message shows up in its tab as pending the moment it is submitted. The
//! transport call happens afterwards and its outcome is folded back into the
//! store: delivered messages become sent, the rest become failed and wait for
//! the user to retry. Nothing here retries on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::error::{Result, TutorError};
use crate::models::{DeliveryStatus, Message, TabType};
use crate::store::{Resolution, SendReceipt, Store};

pub const SEND_FAILED_MESSAGE: &str = "Failed to send message. Please try again.";

/// Remote side of the chat. Futures are not `Send`: everything runs on the
/// task that owns the store.
#[async_trait(?Send)]
pub trait ChatTransport {
    async fn send(&self, request: &SendRequest) -> std::result::Result<SendReceipt, ApiError>;

    async fn history(&self, tab: TabType) -> std::result::Result<Vec<Message>, ApiError>;

    async fn clear_history(&self, tab: TabType) -> std::result::Result<bool, ApiError>;
}

/// Body of `POST /chat/send`, plus the local id it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendRequest {
    #[serde(skip)]
    pub client_id: String,
    pub message: String,
    #[serde(rename = "tabType")]
    pub tab: TabType,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for SendRequest {
    fn from(message: &Message) -> Self {
        Self {
            client_id: message.client_id.clone(),
            message: message.content.clone(),
            tab: message.tab,
            timestamp: message.timestamp,
        }
    }
}

/// Inserts the pending message and returns the request to dispatch.
pub fn begin_send(store: &mut Store, tab: TabType, text: &str) -> SendRequest {
    let message = store.append_optimistic_message(tab, text);
    SendRequest::from(&message)
}

/// Re-enters the pending state for a failed message, same content.
pub fn retry(store: &mut Store, client_id: &str) -> Result<SendRequest> {
    let message = store.retry_message(client_id)?;
    store.clear_error(message.tab);
    debug!(client_id, "retrying message");
    Ok(SendRequest::from(&message))
}

/// Folds a transport outcome into the store and returns the message's status
/// afterwards. A result for a message that is no longer pending is dropped.
pub fn settle(
    store: &mut Store,
    request: &SendRequest,
    result: std::result::Result<SendReceipt, ApiError>,
) -> Result<DeliveryStatus> {
    let (resolution, error) = match result {
        Ok(receipt) => (Resolution::Delivered(receipt), None),
        Err(err) => {
            warn!(client_id = %request.client_id, error = %err, "message delivery failed");
            let shown = err.user_message(SEND_FAILED_MESSAGE);
            (Resolution::Failed(err.to_string()), Some(shown))
        }
    };

    match store.resolve_message(&request.client_id, resolution) {
        Ok(()) => {}
        Err(TutorError::InvalidTransition { from, to }) => {
            warn!(client_id = %request.client_id, %from, %to, "ignoring stale delivery result");
            return Ok(from);
        }
        Err(e) => return Err(e),
    }

    match error {
        Some(shown) => {
            store.set_error(request.tab, shown);
            Ok(DeliveryStatus::Failed)
        }
        None => {
            store.clear_error(request.tab);
            Ok(DeliveryStatus::Sent)
        }
    }
}

/// Sends `request` and settles the result.
pub async fn dispatch<T>(store: &mut Store, transport: &T, request: &SendRequest) -> Result<DeliveryStatus>
where
    T: ChatTransport + ?Sized,
{
    let result = transport.send(request).await;
    settle(store, request, result)
}

#[cfg(test)]
pub(crate) mod test_transport {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Hands out scripted results in order; records what was sent.
    #[derive(Default)]
    pub struct ScriptedTransport {
        pub replies: RefCell<VecDeque<std::result::Result<SendReceipt, ApiError>>>,
        pub history: RefCell<Vec<Message>>,
        pub sent: RefCell<Vec<SendRequest>>,
    }

    impl ScriptedTransport {
        pub fn with(replies: Vec<std::result::Result<SendReceipt, ApiError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait(?Send)]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: &SendRequest) -> std::result::Result<SendReceipt, ApiError> {
            self.sent.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(SendReceipt::default()))
        }

        async fn history(&self, _tab: TabType) -> std::result::Result<Vec<Message>, ApiError> {
            Ok(self.history.borrow().clone())
        }

        async fn clear_history(&self, _tab: TabType) -> std::result::Result<bool, ApiError> {
            self.history.borrow_mut().clear();
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_transport::ScriptedTransport;
    use super::*;
    use crate::api::{RATE_LIMIT_MESSAGE, SERVER_ERROR_MESSAGE};

    mod begin_tests {
        use super::*;

        #[test]
        fn message_is_pending_before_any_network_call() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "Explain borrowing");

            let msg = store.message(&request.client_id).unwrap();
            assert_eq!(msg.status, DeliveryStatus::Pending);
            assert_eq!(request.message, "Explain borrowing");
            assert_eq!(request.tab, TabType::Home);
        }

        #[test]
        fn request_serializes_wire_fields() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Explore, "hi");
            let json = serde_json::to_value(&request).unwrap();

            assert_eq!(json["message"], "hi");
            assert_eq!(json["tabType"], "explore");
            assert!(json.get("timestamp").is_some());
            assert!(json.get("client_id").is_none());
        }
    }

    mod settle_tests {
        use super::*;

        #[test]
        fn success_keeps_server_id() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "hi");

            let status = settle(
                &mut store,
                &request,
                Ok(SendReceipt {
                    message_id: Some("srv-42".into()),
                    ..Default::default()
                }),
            )
            .unwrap();

            assert_eq!(status, DeliveryStatus::Sent);
            let msg = store.message(&request.client_id).unwrap();
            assert_eq!(msg.id, "srv-42");
            assert_eq!(msg.status, DeliveryStatus::Sent);
        }

        #[test]
        fn server_error_sets_tab_error() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Review, "hi");

            let status = settle(&mut store, &request, Err(ApiError::Server { status: 500 })).unwrap();

            assert_eq!(status, DeliveryStatus::Failed);
            assert_eq!(store.error(TabType::Review), Some(SERVER_ERROR_MESSAGE));
            assert!(store.error(TabType::Home).is_none());
        }

        #[test]
        fn rate_limit_has_its_own_message() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "hi");
            settle(&mut store, &request, Err(ApiError::RateLimited)).unwrap();
            assert_eq!(store.error(TabType::Home), Some(RATE_LIMIT_MESSAGE));
        }

        #[test]
        fn network_failure_uses_generic_message() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "hi");
            settle(&mut store, &request, Err(ApiError::Network("refused".into()))).unwrap();
            assert_eq!(store.error(TabType::Home), Some(SEND_FAILED_MESSAGE));
        }

        #[test]
        fn stale_result_is_ignored() {
            crate::logging::init_test();
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "hi");
            settle(&mut store, &request, Ok(SendReceipt::default())).unwrap();

            let status = settle(&mut store, &request, Err(ApiError::RateLimited)).unwrap();
            assert_eq!(status, DeliveryStatus::Sent);
            assert!(store.error(TabType::Home).is_none());
        }

        #[test]
        fn out_of_order_resolution_keeps_creation_order() {
            let mut store = Store::new();
            let a = begin_send(&mut store, TabType::Home, "a");
            let b = begin_send(&mut store, TabType::Home, "b");
            let c = begin_send(&mut store, TabType::Home, "c");

            settle(&mut store, &c, Ok(SendReceipt::default())).unwrap();
            settle(&mut store, &a, Err(ApiError::Network("x".into()))).unwrap();
            settle(&mut store, &b, Ok(SendReceipt::default())).unwrap();

            let list = store.messages(TabType::Home);
            let contents: Vec<&str> = list.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["a", "b", "c"]);
            assert_eq!(list[0].status, DeliveryStatus::Failed);
            assert_eq!(list[1].status, DeliveryStatus::Sent);
        }
    }

    mod dispatch_tests {
        use super::*;

        #[tokio::test]
        async fn dispatch_then_retry() {
            crate::logging::init_test();
            let mut store = Store::new();
            let transport = ScriptedTransport::with(vec![
                Err(ApiError::Server { status: 503 }),
                Ok(SendReceipt {
                    message_id: Some("srv-1".into()),
                    ..Default::default()
                }),
            ]);

            let request = begin_send(&mut store, TabType::Home, "retry me");
            let status = dispatch(&mut store, &transport, &request).await.unwrap();
            assert_eq!(status, DeliveryStatus::Failed);

            let again = retry(&mut store, &request.client_id).unwrap();
            assert_eq!(again.message, "retry me");
            assert!(store.error(TabType::Home).is_none());
            assert_eq!(
                store.message(&request.client_id).unwrap().status,
                DeliveryStatus::Pending
            );

            let status = dispatch(&mut store, &transport, &again).await.unwrap();
            assert_eq!(status, DeliveryStatus::Sent);
            assert_eq!(store.messages(TabType::Home).len(), 1);
            assert_eq!(transport.sent.borrow().len(), 2);
        }

        #[test]
        fn retry_requires_failed_message() {
            let mut store = Store::new();
            let request = begin_send(&mut store, TabType::Home, "x");
            assert!(retry(&mut store, &request.client_id).is_err());
            assert!(retry(&mut store, "unknown").is_err());
        }
    }
}
