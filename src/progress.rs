//! Read-only views computed from the store: aggregate percentages, weekly
//! activity, completion forecasts and recommendations.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;

use crate::config::ProgressConfig;
use crate::error::{Result, TutorError};
use crate::models::{StudyEventKind, TrackStatus};
use crate::store::Store;

pub const MILESTONES: [u8; 4] = [25, 50, 75, 100];

const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Mean of the track percentages, rounded half up. 0 with no tracks.
pub fn overall_progress(store: &Store) -> u8 {
    let (sum, count) = store
        .tracks()
        .fold((0u64, 0u64), |(sum, count), t| (sum + t.overall_progress as u64, count + 1));
    if count == 0 {
        return 0;
    }
    ((sum * 2 + count) / (count * 2)) as u8
}

pub fn track_progress(store: &Store) -> BTreeMap<String, u8> {
    store
        .tracks()
        .map(|t| (t.track_id.clone(), t.overall_progress))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub year: i32,
    pub week: u32,
    pub week_start: NaiveDate,
    pub lessons_completed: u32,
    pub time_spent_ms: u64,
    pub average_score: Option<f64>,
}

/// Activity grouped by ISO week, oldest first.
pub fn weekly_progress(store: &Store) -> Vec<WeeklySummary> {
    let mut weeks: BTreeMap<(i32, u32), (u32, u64, Vec<f64>)> = BTreeMap::new();
    for event in store.activity() {
        let iso = event.occurred_at.iso_week();
        let entry = weeks.entry((iso.year(), iso.week())).or_default();
        if event.kind == StudyEventKind::LessonCompleted {
            entry.0 += 1;
        }
        entry.1 = entry.1.saturating_add(event.duration_ms.unwrap_or(0));
        if let Some(score) = event.score {
            entry.2.push(score);
        }
    }

    weeks
        .into_iter()
        .filter_map(|((year, week), (lessons, time, scores))| {
            let week_start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
            let average_score = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };
            Some(WeeklySummary {
                year,
                week,
                week_start,
                lessons_completed: lessons,
                time_spent_ms: time,
                average_score,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub track_id: String,
    pub current_progress: u8,
    pub percent_per_day: f64,
    pub days_remaining: u32,
    pub estimated_completion: DateTime<Utc>,
    /// Extrapolated from study time per percent so far; None without
    /// recorded study time.
    pub study_time_remaining_ms: Option<u64>,
}

/// Forecasts when a track will be finished from its pace since enrollment.
pub fn predicted_completion(store: &Store, track_id: &str) -> Result<Prediction> {
    let track = store
        .track(track_id)
        .ok_or_else(|| TutorError::TrackNotFound(track_id.to_string()))?;

    if track.status == TrackStatus::Completed {
        return Ok(Prediction {
            track_id: track_id.to_string(),
            current_progress: 100,
            percent_per_day: 0.0,
            days_remaining: 0,
            estimated_completion: track.last_accessed,
            study_time_remaining_ms: Some(0),
        });
    }

    let has_history = store.activity().iter().any(|e| e.track_id == track_id);
    if !has_history {
        return Err(TutorError::InsufficientData(format!(
            "no study activity recorded for {}",
            track_id
        )));
    }
    if track.overall_progress == 0 {
        return Err(TutorError::InsufficientData(format!(
            "no progress made on {} yet",
            track_id
        )));
    }

    let now = store.now();
    // A track started today counts as one day of work
    let elapsed_days = ((now - track.enrolled_at).num_milliseconds() as f64 / MS_PER_DAY).max(1.0);
    let progress = track.overall_progress as f64;
    let per_day = progress / elapsed_days;
    let remaining = 100.0 - progress;
    let days_remaining = (remaining / per_day).ceil() as u32;

    let study_time_remaining_ms = if track.time_spent_ms > 0 {
        let per_percent = track.time_spent_ms as f64 / progress;
        Some((per_percent * remaining).round() as u64)
    } else {
        None
    };

    Ok(Prediction {
        track_id: track_id.to_string(),
        current_progress: track.overall_progress,
        percent_per_day: per_day,
        days_remaining,
        estimated_completion: now + Duration::days(days_remaining as i64),
        study_time_remaining_ms,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackScore {
    pub track_id: String,
    pub average_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub strengths: Vec<TrackScore>,
    pub weaknesses: Vec<TrackScore>,
    pub recommendations: Vec<String>,
}

fn track_average_score(store: &Store, track_id: &str) -> Option<f64> {
    let scores: Vec<f64> = store
        .lessons_for(track_id)
        .flat_map(|l| l.scores.iter().copied())
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Sorts scored tracks into strengths and weaknesses and suggests what to do
/// next. Tracks without scores are neither.
pub fn strengths_and_weaknesses(store: &Store, config: &ProgressConfig) -> Insights {
    let mut insights = Insights::default();

    for track in store.tracks() {
        let Some(average) = track_average_score(store, &track.track_id) else {
            continue;
        };
        let scored = TrackScore {
            track_id: track.track_id.clone(),
            average_score: average,
        };
        if average >= config.strength_threshold {
            insights.strengths.push(scored);
        } else if average < config.weakness_threshold {
            insights.recommendations.push(format!(
                "Review the completed lessons in {} (average score {:.0}).",
                track.track_id, average
            ));
            insights.weaknesses.push(scored);
        }
    }

    for track in store.tracks().filter(|t| t.status == TrackStatus::InProgress) {
        if insights.weaknesses.iter().all(|w| w.track_id != track.track_id) {
            insights.recommendations.push(format!(
                "Keep going with {}: {}% complete.",
                track.track_id, track.overall_progress
            ));
        }
    }

    if let Some(best) = insights
        .strengths
        .iter()
        .max_by(|a, b| a.average_score.total_cmp(&b.average_score))
    {
        insights.recommendations.push(format!(
            "You're strong in {}. Consider a more advanced track next.",
            best.track_id
        ));
    }

    if insights.recommendations.is_empty() {
        insights
            .recommendations
            .push("Enroll in a track to get personalised recommendations.".to_string());
    }
    insights
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Milestone {
    pub track_id: String,
    pub current: u8,
    pub target: u8,
    pub lessons_remaining: u32,
}

/// Next 25/50/75/100 threshold for every unfinished track.
pub fn next_milestones(store: &Store) -> Vec<Milestone> {
    store
        .tracks()
        .filter(|t| !t.is_complete())
        .filter_map(|track| {
            let target = MILESTONES
                .iter()
                .copied()
                .find(|m| *m > track.overall_progress)?;
            let needed = (target as u32 * track.total_lessons).div_ceil(100);
            let completed = track.completed_lessons.len() as u32;
            Some(Milestone {
                track_id: track.track_id.clone(),
                current: track.overall_progress,
                target,
                lessons_remaining: needed.saturating_sub(completed),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub overall_progress: u8,
    pub tracks_enrolled: usize,
    pub tracks_completed: usize,
    pub lessons_completed: usize,
    pub current_streak: u32,
    pub total_time_ms: u64,
    pub achievement_points: u32,
}

pub fn summary(store: &Store) -> ProgressSummary {
    ProgressSummary {
        overall_progress: overall_progress(store),
        tracks_enrolled: store.tracks().count(),
        tracks_completed: store.tracks().filter(|t| t.is_complete()).count(),
        lessons_completed: store.tracks().map(|t| t.completed_lessons.len()).sum(),
        current_streak: store.streak().current,
        total_time_ms: store.total_time_ms(),
        achievement_points: store.achievements().iter().map(|a| a.points).sum(),
    }
}
