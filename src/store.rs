//! In-process state container for chat and learning progress.
//!
//! A `Store` is built once at start-up, hydrated from the database, handed by
//! reference to whatever needs it and persisted again before exit. Every
//! mutation is synchronous; the application drives it from a single task.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Result, TutorError};
use crate::models::{
    Achievement, AchievementCategory, DeliveryStatus, LearningStreak, LessonProgress, Message,
    Rarity, StudyEvent, StudyEventKind, TabType, TrackProgress, TrackStatus,
};
use crate::validation::{rules, ValidationErrors};

pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

const STREAK_ACHIEVEMENT_DAYS: u32 = 7;
const STUDY_TIME_ACHIEVEMENT_MS: u64 = 10 * 60 * 60 * 1000;

/// What the server said about a message that was delivered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub reply: Option<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Delivered(SendReceipt),
    Failed(String),
}

pub struct Store {
    active_tab: TabType,
    messages: HashMap<TabType, Vec<Message>>,
    errors: HashMap<TabType, String>,
    loading: bool,
    tracks: BTreeMap<String, TrackProgress>,
    lessons: BTreeMap<(String, String), LessonProgress>,
    achievements: Vec<Achievement>,
    activity: Vec<StudyEvent>,
    streak: LearningStreak,
    total_time_ms: u64,
    clock: Clock,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_clock(Box::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            active_tab: TabType::Home,
            messages: HashMap::new(),
            errors: HashMap::new(),
            loading: false,
            tracks: BTreeMap::new(),
            lessons: BTreeMap::new(),
            achievements: Vec::new(),
            activity: Vec::new(),
            streak: LearningStreak::default(),
            total_time_ms: 0,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // Chat state

    pub fn active_tab(&self) -> TabType {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, tab: TabType) {
        debug!(tab = tab.as_str(), "switching active tab");
        self.active_tab = tab;
    }

    pub fn messages(&self, tab: TabType) -> &[Message] {
        self.messages.get(&tab).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn message(&self, client_id: &str) -> Option<&Message> {
        self.messages
            .values()
            .flat_map(|list| list.iter())
            .find(|m| m.client_id == client_id)
    }

    pub fn error(&self, tab: TabType) -> Option<&str> {
        self.errors.get(&tab).map(String::as_str)
    }

    pub fn set_error(&mut self, tab: TabType, message: impl Into<String>) {
        self.errors.insert(tab, message.into());
    }

    pub fn clear_error(&mut self, tab: TabType) {
        self.errors.remove(&tab);
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Appends a pending user message to the end of `tab` and returns a copy.
    pub fn append_optimistic_message(&mut self, tab: TabType, content: &str) -> Message {
        let message = Message::pending_user(tab, content, self.now());
        debug!(client_id = %message.client_id, tab = tab.as_str(), "optimistic message appended");
        self.messages.entry(tab).or_default().push(message.clone());
        message
    }

    /// Applies the outcome of a send. The message keeps its position; an
    /// assistant reply, when present, goes to the end of the same tab.
    pub fn resolve_message(&mut self, client_id: &str, resolution: Resolution) -> Result<()> {
        let message = self
            .find_message_mut(client_id)
            .ok_or_else(|| TutorError::MessageNotFound(client_id.to_string()))?;

        let tab = message.tab;
        let reply = match resolution {
            Resolution::Delivered(receipt) => {
                transition(message, DeliveryStatus::Sent)?;
                if let Some(id) = receipt.message_id {
                    message.id = id;
                }
                if let Some(timestamp) = receipt.timestamp {
                    message.timestamp = timestamp;
                }
                receipt.reply
            }
            Resolution::Failed(reason) => {
                transition(message, DeliveryStatus::Failed)?;
                debug!(client_id, %reason, "message failed");
                None
            }
        };

        if let Some(mut reply) = reply {
            reply.tab = tab;
            reply.status = DeliveryStatus::Sent;
            self.messages.entry(tab).or_default().push(reply);
        }

        Ok(())
    }

    /// Moves a failed message back to pending and returns a copy for resending.
    pub fn retry_message(&mut self, client_id: &str) -> Result<Message> {
        let message = self
            .find_message_mut(client_id)
            .ok_or_else(|| TutorError::MessageNotFound(client_id.to_string()))?;
        transition(message, DeliveryStatus::Pending)?;
        Ok(message.clone())
    }

    /// Replaces the committed history of `tab`. Local messages the server does
    /// not know about yet (pending or failed) stay, after the history.
    pub fn replace_history(&mut self, tab: TabType, history: Vec<Message>) {
        let previous = self.messages.remove(&tab).unwrap_or_default();
        let mut merged: Vec<Message> = history
            .into_iter()
            .map(|mut m| {
                m.tab = tab;
                m.status = DeliveryStatus::Sent;
                m
            })
            .collect();

        let unresolved: Vec<Message> = previous
            .into_iter()
            .filter(|m| m.status.is_unresolved())
            .filter(|m| !merged.iter().any(|h| h.client_id == m.client_id || h.id == m.id))
            .collect();
        merged.extend(unresolved);

        self.messages.insert(tab, merged);
    }

    pub fn clear_messages(&mut self, tab: TabType) {
        self.messages.remove(&tab);
        self.errors.remove(&tab);
    }

    fn find_message_mut(&mut self, client_id: &str) -> Option<&mut Message> {
        self.messages
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|m| m.client_id == client_id)
    }

    // Learning progress

    pub fn tracks(&self) -> impl Iterator<Item = &TrackProgress> {
        self.tracks.values()
    }

    pub fn track(&self, track_id: &str) -> Option<&TrackProgress> {
        self.tracks.get(track_id)
    }

    pub fn lessons_for<'a>(&'a self, track_id: &'a str) -> impl Iterator<Item = &'a LessonProgress> {
        self.lessons
            .values()
            .filter(move |lesson| lesson.track_id == track_id)
    }

    pub fn lesson(&self, track_id: &str, lesson_id: &str) -> Option<&LessonProgress> {
        self.lessons
            .get(&(track_id.to_string(), lesson_id.to_string()))
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn activity(&self) -> &[StudyEvent] {
        &self.activity
    }

    pub fn streak(&self) -> LearningStreak {
        self.streak
    }

    pub fn total_time_ms(&self) -> u64 {
        self.total_time_ms
    }

    /// Enrolls a track. Enrolling twice keeps the existing record.
    pub fn enroll_track(&mut self, track_id: &str, total_lessons: u32) -> Result<&TrackProgress> {
        let mut errors = ValidationErrors::default();
        if let Some(msg) = rules::required(track_id, "track_id") {
            errors.push("track_id", msg);
        }
        if total_lessons == 0 {
            errors.push("total_lessons", "total_lessons must be at least 1");
        }
        errors.into_result()?;

        let now = self.now();
        let track = self
            .tracks
            .entry(track_id.to_string())
            .or_insert_with(|| {
                info!(track_id, total_lessons, "track enrolled");
                TrackProgress::new(track_id, total_lessons, now)
            });
        Ok(track)
    }

    /// Records progress on a lesson. 100 completes it; progress never goes
    /// backwards.
    pub fn update_lesson_progress(
        &mut self,
        track_id: &str,
        lesson_id: &str,
        percentage: i64,
        score: Option<f64>,
    ) -> Result<()> {
        if !(0..=100).contains(&percentage) {
            return Err(TutorError::PercentageOutOfRange { value: percentage });
        }
        if let Some(score) = score {
            if let Some(msg) = rules::range(score, 0.0, 100.0, "score") {
                return Err(ValidationErrors::single("score", msg).into());
            }
        }
        if let Some(msg) = rules::required(lesson_id, "lesson_id") {
            return Err(ValidationErrors::single("lesson_id", msg).into());
        }
        if !self.tracks.contains_key(track_id) {
            return Err(TutorError::TrackNotFound(track_id.to_string()));
        }

        self.check_lesson_capacity(track_id, lesson_id)?;

        let now = self.now();
        let percentage = percentage as u8;

        let lesson = self
            .lessons
            .entry((track_id.to_string(), lesson_id.to_string()))
            .or_insert_with(|| LessonProgress::new(track_id, lesson_id, now));
        lesson.attempts += 1;
        lesson.percentage = lesson.percentage.max(percentage);
        if let Some(score) = score {
            lesson.scores.push(score);
        }
        let newly_completed = lesson.percentage == 100 && lesson.completed_at.is_none();
        if newly_completed {
            lesson.completed_at = Some(now);
        }

        let track_percentage = self.recalculate_track(track_id, now)?;
        if newly_completed {
            if let Some(track) = self.tracks.get_mut(track_id) {
                if !track.completed_lessons.iter().any(|l| l == lesson_id) {
                    track.completed_lessons.push(lesson_id.to_string());
                }
            }
            info!(track_id, lesson_id, track_percentage, "lesson completed");
        }

        self.activity.push(StudyEvent {
            kind: if newly_completed {
                StudyEventKind::LessonCompleted
            } else {
                StudyEventKind::ProgressUpdated
            },
            track_id: track_id.to_string(),
            lesson_id: Some(lesson_id.to_string()),
            score,
            duration_ms: None,
            percentage: Some(track_percentage),
            occurred_at: now,
        });

        self.streak.touch(now.date_naive());
        self.award_achievements(track_id, now);
        Ok(())
    }

    pub fn complete_lesson(&mut self, track_id: &str, lesson_id: &str, score: Option<f64>) -> Result<()> {
        self.update_lesson_progress(track_id, lesson_id, 100, score)
    }

    pub fn record_study_time(&mut self, track_id: &str, duration_ms: i64) -> Result<()> {
        if duration_ms < 0 {
            return Err(TutorError::NegativeDuration { duration_ms });
        }
        let now = self.now();
        let track = self
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| TutorError::TrackNotFound(track_id.to_string()))?;

        let duration = duration_ms as u64;
        track.time_spent_ms = track.time_spent_ms.saturating_add(duration);
        track.last_accessed = now;
        if duration > 0 && track.status == TrackStatus::NotStarted {
            track.status = TrackStatus::InProgress;
        }
        let percentage = track.overall_progress;
        self.total_time_ms = self.total_time_ms.saturating_add(duration);

        self.activity.push(StudyEvent {
            kind: StudyEventKind::StudyTime,
            track_id: track_id.to_string(),
            lesson_id: None,
            score: None,
            duration_ms: Some(duration),
            percentage: Some(percentage),
            occurred_at: now,
        });

        debug!(track_id, duration_ms, total_ms = self.total_time_ms, "study time recorded");
        if duration > 0 {
            self.streak.touch(now.date_naive());
        }
        self.award_achievements(track_id, now);
        Ok(())
    }

    pub fn add_bookmark(&mut self, track_id: &str, lesson_id: &str, marker: &str) -> Result<()> {
        if let Some(msg) = rules::required(marker, "bookmark") {
            return Err(ValidationErrors::single("bookmark", msg).into());
        }
        if !self.tracks.contains_key(track_id) {
            return Err(TutorError::TrackNotFound(track_id.to_string()));
        }
        self.check_lesson_capacity(track_id, lesson_id)?;
        let now = self.now();
        let lesson = self
            .lessons
            .entry((track_id.to_string(), lesson_id.to_string()))
            .or_insert_with(|| LessonProgress::new(track_id, lesson_id, now));
        if !lesson.bookmarks.iter().any(|b| b == marker) {
            lesson.bookmarks.push(marker.to_string());
        }
        Ok(())
    }

    /// A track holds at most `total_lessons` distinct lessons.
    fn check_lesson_capacity(&self, track_id: &str, lesson_id: &str) -> Result<()> {
        if self.lesson(track_id, lesson_id).is_some() {
            return Ok(());
        }
        let total = self
            .tracks
            .get(track_id)
            .map(|t| t.total_lessons)
            .ok_or_else(|| TutorError::TrackNotFound(track_id.to_string()))?;
        let known = self.lessons_for(track_id).count() as u32;
        if known >= total {
            return Err(ValidationErrors::single(
                "lesson_id",
                format!(
                    "track '{}' already has all {} of its lessons; '{}' is not one of them",
                    track_id, total, lesson_id
                ),
            )
            .into());
        }
        Ok(())
    }

    // Floor of the mean lesson percentage across the track's lessons.
    fn recalculate_track(&mut self, track_id: &str, now: DateTime<Utc>) -> Result<u8> {
        let sum: u64 = self
            .lessons_for(track_id)
            .map(|lesson| lesson.percentage as u64)
            .sum();
        let track = self
            .tracks
            .get_mut(track_id)
            .ok_or_else(|| TutorError::TrackNotFound(track_id.to_string()))?;

        let total = track.total_lessons.max(1) as u64;
        let percentage = (sum / total).min(100) as u8;
        track.overall_progress = percentage;
        track.last_accessed = now;
        track.status = if percentage == 100 {
            TrackStatus::Completed
        } else {
            TrackStatus::InProgress
        };
        Ok(percentage)
    }

    fn award_achievements(&mut self, track_id: &str, now: DateTime<Utc>) {
        let any_lesson_done = self.lessons.values().any(|l| l.completed_at.is_some());
        if any_lesson_done {
            self.award(
                "first-lesson".to_string(),
                AchievementCategory::Progress,
                "First Steps",
                "Completed your first lesson".to_string(),
                10,
                Rarity::Common,
                now,
            );
        }

        if let Some(percentage) = self.tracks.get(track_id).map(|t| t.overall_progress) {
            if percentage >= 50 {
                self.award(
                    format!("track-halfway:{}", track_id),
                    AchievementCategory::Progress,
                    "Halfway There",
                    format!("Reached 50% of {}", track_id),
                    25,
                    Rarity::Rare,
                    now,
                );
            }
            if percentage == 100 {
                self.award(
                    format!("track-complete:{}", track_id),
                    AchievementCategory::Mastery,
                    "Track Complete",
                    format!("Finished every lesson in {}", track_id),
                    100,
                    Rarity::Epic,
                    now,
                );
            }
        }

        if self.streak.current >= STREAK_ACHIEVEMENT_DAYS {
            self.award(
                "streak-7".to_string(),
                AchievementCategory::Streak,
                "Week Warrior",
                format!("Studied {} days in a row", STREAK_ACHIEVEMENT_DAYS),
                50,
                Rarity::Rare,
                now,
            );
        }

        if self.total_time_ms >= STUDY_TIME_ACHIEVEMENT_MS {
            self.award(
                "study-10h".to_string(),
                AchievementCategory::Time,
                "Dedicated Learner",
                "Spent ten hours studying".to_string(),
                50,
                Rarity::Rare,
                now,
            );
        }
    }

    // Achievements are append-only: an id is earned at most once.
    #[allow(clippy::too_many_arguments)]
    fn award(
        &mut self,
        id: String,
        category: AchievementCategory,
        title: &str,
        description: String,
        points: u32,
        rarity: Rarity,
        now: DateTime<Utc>,
    ) {
        if self.achievements.iter().any(|a| a.id == id) {
            return;
        }
        info!(achievement = %id, points, "achievement earned");
        self.achievements.push(Achievement {
            id,
            category,
            title: title.to_string(),
            description,
            points,
            rarity,
            earned_at: now,
        });
    }

    // Hydration from persisted state

    pub fn restore_track(&mut self, track: TrackProgress) {
        self.tracks.insert(track.track_id.clone(), track);
    }

    pub fn restore_lesson(&mut self, lesson: LessonProgress) {
        self.lessons
            .insert((lesson.track_id.clone(), lesson.lesson_id.clone()), lesson);
    }

    pub fn restore_achievement(&mut self, achievement: Achievement) {
        if !self.achievements.iter().any(|a| a.id == achievement.id) {
            self.achievements.push(achievement);
        }
    }

    pub fn restore_event(&mut self, event: StudyEvent) {
        self.activity.push(event);
    }

    /// Messages still pending from an earlier run never got an answer, so
    /// they come back as failed and can be retried.
    pub fn restore_messages(&mut self, tab: TabType, messages: Vec<Message>) {
        let restored = messages
            .into_iter()
            .map(|mut m| {
                if m.status == DeliveryStatus::Pending {
                    m.status = DeliveryStatus::Failed;
                }
                m
            })
            .collect();
        self.messages.insert(tab, restored);
    }

    pub fn restore_streak(&mut self, streak: LearningStreak) {
        self.streak = streak;
    }

    pub fn restore_total_time(&mut self, total_time_ms: u64) {
        self.total_time_ms = total_time_ms;
    }
}

fn transition(message: &mut Message, to: DeliveryStatus) -> Result<()> {
    if !message.status.can_transition_to(to) {
        return Err(TutorError::InvalidTransition {
            from: message.status,
            to,
        });
    }
    message.status = to;
    Ok(())
}
