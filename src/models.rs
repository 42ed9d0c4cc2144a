use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Chat contexts, each with its own message list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    Home,
    Progress,
    Review,
    Explore,
}

impl TabType {
    pub const ALL: [TabType; 4] = [
        TabType::Home,
        TabType::Progress,
        TabType::Review,
        TabType::Explore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TabType::Home => "home",
            TabType::Progress => "progress",
            TabType::Review => "review",
            TabType::Explore => "explore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "home" | "h" => Some(TabType::Home),
            "progress" | "p" => Some(TabType::Progress),
            "review" | "r" => Some(TabType::Review),
            "explore" | "e" => Some(TabType::Explore),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TabType::Home => "Home",
            TabType::Progress => "Progress",
            TabType::Review => "Review",
            TabType::Explore => "Explore",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            TabType::Home => TabType::Progress,
            TabType::Progress => TabType::Review,
            TabType::Review => TabType::Explore,
            TabType::Explore => TabType::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(MessageRole::User),
            "assistant" | "tutor" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// Delivery state of a chat message.
///
/// Allowed moves: pending -> sent, pending -> failed, failed -> pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(DeliveryStatus::Pending),
            "sent" => Some(DeliveryStatus::Sent),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Pending, DeliveryStatus::Sent)
                | (DeliveryStatus::Pending, DeliveryStatus::Failed)
                | (DeliveryStatus::Failed, DeliveryStatus::Pending)
        )
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, DeliveryStatus::Pending | DeliveryStatus::Failed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server id once the message is acknowledged, the client id until then.
    pub id: String,
    pub client_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tab: TabType,
    pub status: DeliveryStatus,
}

impl Message {
    pub fn pending_user(tab: TabType, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        let client_id = uuid::Uuid::new_v4().to_string();
        Self {
            id: client_id.clone(),
            client_id,
            role: MessageRole::User,
            content: content.into(),
            timestamp: now,
            tab,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn committed(
        id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        tab: TabType,
    ) -> Self {
        let id = id.into();
        Self {
            client_id: id.clone(),
            id,
            role,
            content: content.into(),
            timestamp,
            tab,
            status: DeliveryStatus::Sent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::NotStarted => "not_started",
            TrackStatus::InProgress => "in_progress",
            TrackStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_started" | "not-started" => Some(TrackStatus::NotStarted),
            "in_progress" | "in-progress" => Some(TrackStatus::InProgress),
            "completed" => Some(TrackStatus::Completed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackStatus::NotStarted => "Not Started",
            TrackStatus::InProgress => "In Progress",
            TrackStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProgress {
    pub track_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub total_lessons: u32,
    pub overall_progress: u8,
    pub completed_lessons: Vec<String>,
    pub time_spent_ms: u64,
    pub status: TrackStatus,
}

impl TrackProgress {
    pub fn new(track_id: impl Into<String>, total_lessons: u32, now: DateTime<Utc>) -> Self {
        Self {
            track_id: track_id.into(),
            enrolled_at: now,
            last_accessed: now,
            total_lessons,
            overall_progress: 0,
            completed_lessons: Vec::new(),
            time_spent_ms: 0,
            status: TrackStatus::NotStarted,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.overall_progress == 100
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub lesson_id: String,
    pub track_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub percentage: u8,
    pub attempts: u32,
    pub scores: Vec<f64>,
    pub bookmarks: Vec<String>,
}

impl LessonProgress {
    pub fn new(track_id: impl Into<String>, lesson_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            track_id: track_id.into(),
            started_at: now,
            completed_at: None,
            percentage: 0,
            attempts: 0,
            scores: Vec::new(),
            bookmarks: Vec::new(),
        }
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Progress,
    Streak,
    Time,
    Mastery,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Progress => "progress",
            AchievementCategory::Streak => "streak",
            AchievementCategory::Time => "time",
            AchievementCategory::Mastery => "mastery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "progress" => Some(AchievementCategory::Progress),
            "streak" => Some(AchievementCategory::Streak),
            "time" => Some(AchievementCategory::Time),
            "mastery" => Some(AchievementCategory::Mastery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "common" => Some(Rarity::Common),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub category: AchievementCategory,
    pub title: String,
    pub description: String,
    pub points: u32,
    pub rarity: Rarity,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyEventKind {
    LessonCompleted,
    StudyTime,
    ProgressUpdated,
}

impl StudyEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyEventKind::LessonCompleted => "lesson_completed",
            StudyEventKind::StudyTime => "study_time",
            StudyEventKind::ProgressUpdated => "progress_updated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lesson_completed" => Some(StudyEventKind::LessonCompleted),
            "study_time" => Some(StudyEventKind::StudyTime),
            "progress_updated" => Some(StudyEventKind::ProgressUpdated),
            _ => None,
        }
    }
}

// One entry of the activity log behind weekly summaries and predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyEvent {
    pub kind: StudyEventKind,
    pub track_id: String,
    pub lesson_id: Option<String>,
    pub score: Option<f64>,
    pub duration_ms: Option<u64>,
    /// Track percentage after the event.
    pub percentage: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStreak {
    pub current: u32,
    pub last_active: Option<NaiveDate>,
}

impl LearningStreak {
    /// Counts `day` as active. Returns true when the streak grew.
    pub fn touch(&mut self, day: NaiveDate) -> bool {
        match self.last_active {
            Some(last) if last == day => false,
            Some(last) if last.succ_opt() == Some(day) => {
                self.current += 1;
                self.last_active = Some(day);
                true
            }
            // Clock skew into the past never shortens the streak
            Some(last) if day < last => false,
            _ => {
                self.current = 1;
                self.last_active = Some(day);
                true
            }
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
