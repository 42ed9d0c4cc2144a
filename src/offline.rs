//! In-process tutor used when no API is configured.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::api::ApiError;
use crate::assessment;
use crate::models::{Message, MessageRole, TabType};
use crate::reconciler::{ChatTransport, SendRequest};
use crate::store::SendReceipt;

const HOME_PROMPTS: &[&str] = &[
    "Tell me what you'd like to learn and I'll put together a starting point.",
    "What topic has been on your mind lately? We can break it down together.",
    "Try explaining the idea back to me in your own words. Where do you get stuck?",
];

const PROGRESS_PROMPTS: &[&str] = &[
    "Check the dashboard for your track percentages. Which one do you want to push next?",
    "Small daily sessions keep your streak alive. How about fifteen minutes today?",
];

const REVIEW_PROMPTS: &[&str] = &[
    "Pick a lesson you finished last week and summarise its key idea in one sentence.",
    "What was the hardest question in your last assessment? Let's go over it.",
    "Try recalling the main points before rereading. What comes to mind?",
];

const EXPLORE_PROMPTS: &[&str] = &[
    "Curious about something adjacent to your current track? Name it and we'll explore.",
    "Pick a real project idea and we'll work out which skills it needs.",
];

fn prompts_for(tab: TabType) -> &'static [&'static str] {
    match tab {
        TabType::Home => HOME_PROMPTS,
        TabType::Progress => PROGRESS_PROMPTS,
        TabType::Review => REVIEW_PROMPTS,
        TabType::Explore => EXPLORE_PROMPTS,
    }
}

#[derive(Default)]
pub struct OfflineTutor {
    history: RefCell<HashMap<TabType, Vec<Message>>>,
}

impl OfflineTutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn reply_to(&self, request: &SendRequest) -> String {
        if assessment::is_learning_request(&request.message) {
            if let Ok(pre) = assessment::questions_for(&request.message) {
                let mut reply = String::from("Before we start, a few questions:\n");
                for (i, question) in pre.questions.iter().enumerate() {
                    reply.push_str(&format!("{}. {}\n", i + 1, question));
                }
                return reply.trim_end().to_string();
            }
        }
        prompts_for(request.tab)
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Tell me more.")
            .to_string()
    }
}

#[async_trait(?Send)]
impl ChatTransport for OfflineTutor {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, ApiError> {
        let now = Utc::now();
        let user = Message::committed(
            Uuid::new_v4().to_string(),
            MessageRole::User,
            request.message.clone(),
            now,
            request.tab,
        );
        let reply = Message::committed(
            Uuid::new_v4().to_string(),
            MessageRole::Assistant,
            self.reply_to(request),
            now,
            request.tab,
        );

        let receipt = SendReceipt {
            message_id: Some(user.id.clone()),
            timestamp: Some(now),
            reply: Some(reply.clone()),
        };

        let mut history = self.history.borrow_mut();
        let tab = history.entry(request.tab).or_default();
        tab.push(user);
        tab.push(reply);
        Ok(receipt)
    }

    async fn history(&self, tab: TabType) -> Result<Vec<Message>, ApiError> {
        Ok(self.history.borrow().get(&tab).cloned().unwrap_or_default())
    }

    async fn clear_history(&self, tab: TabType) -> Result<bool, ApiError> {
        self.history.borrow_mut().remove(&tab);
        Ok(true)
    }
}
