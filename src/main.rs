mod api;
mod assessment;
mod chat;
mod config;
mod db;
mod display;
mod error;
mod logging;
mod models;
mod offline;
mod profile;
mod progress;
mod reconciler;
mod store;
mod tui;
mod validation;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use tracing::{info, warn};

use api::ApiClient;
use assessment::AssessmentSubmission;
use chat::ChatManager;
use config::Config;
use db::Database;
use display::{format_duration, progress_bar, truncate};
use error::TutorError;
use models::{DeliveryStatus, JsonOutput, MessageRole, TabType};
use offline::OfflineTutor;
use profile::LearnerProfile;
use reconciler::ChatTransport;
use store::Store;

const PROFILE_KEY: &str = "profile";

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "An AI tutor: chat, learning tracks and progress insights")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Chat with the tutor
    #[command(subcommand)]
    Chat(ChatCommands),

    /// Manage learning tracks
    #[command(subcommand)]
    Track(TrackCommands),

    /// Record lesson progress
    #[command(subcommand)]
    Lesson(LessonCommands),

    /// Log study time on a track
    Study {
        /// Track ID
        track: String,

        /// Minutes studied
        minutes: i64,
    },

    /// Show overall learning statistics
    Stats,

    /// Show activity grouped by week
    Weekly,

    /// Forecast when a track will be finished
    Predict {
        /// Track ID
        track: String,
    },

    /// Show strengths, weaknesses and recommendations
    Insights,

    /// Show the next milestone for each unfinished track
    Milestones,

    /// List earned achievements
    Achievements,

    /// Generate pre-assessment questions for a learning request
    Assess {
        /// What you want to learn
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,

        /// File with generated questions to use instead of the templates
        #[arg(long, short)]
        from: Option<std::path::PathBuf>,
    },

    /// Work with assessments from the tutor API
    #[command(subcommand)]
    Assessments(AssessmentCommands),

    /// Manage your learner profile
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Check the tutor API
    Health,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Send a message
    Send {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Chat tab: home/progress/review/explore
        #[arg(long, short, value_parser = parse_tab)]
        tab: Option<TabType>,
    },

    /// Show the messages of a tab
    History {
        #[arg(long, short, value_parser = parse_tab)]
        tab: Option<TabType>,

        /// Reload the history from the tutor first
        #[arg(long, short)]
        refresh: bool,
    },

    /// Clear the history of a tab
    Clear {
        #[arg(long, short, value_parser = parse_tab)]
        tab: Option<TabType>,
    },

    /// Resend a failed message
    Retry {
        /// Message ID (defaults to the latest failed message in the tab)
        id: Option<String>,

        #[arg(long, short, value_parser = parse_tab)]
        tab: Option<TabType>,
    },
}

#[derive(Subcommand)]
enum TrackCommands {
    /// Enroll in a track
    Enroll {
        /// Track ID
        id: String,

        /// Number of lessons (looked up in the catalog when omitted)
        #[arg(long, short)]
        lessons: Option<u32>,
    },

    /// List enrolled tracks
    List,

    /// List tracks offered by the tutor API
    Catalog,

    /// Push local track progress to the tutor API
    Sync,
}

#[derive(Subcommand)]
enum LessonCommands {
    /// Set lesson progress (0-100)
    Progress {
        track: String,
        lesson: String,
        percentage: i64,

        /// Quiz score for this attempt (0-100)
        #[arg(long, short)]
        score: Option<f64>,
    },

    /// Mark a lesson complete
    Complete {
        track: String,
        lesson: String,

        #[arg(long, short)]
        score: Option<f64>,
    },

    /// Bookmark a spot in a lesson
    Bookmark {
        track: String,
        lesson: String,
        marker: String,
    },
}

#[derive(Subcommand)]
enum AssessmentCommands {
    /// List available assessments
    List,

    /// Show the questions of an assessment
    Show { id: String },

    /// Submit answers as question=answer pairs
    Submit {
        id: String,

        #[arg(required = true, num_args = 1..)]
        answers: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Set the profile from key=value pairs, e.g. preferences.weekly_hours=5
    Set {
        #[arg(required = true, num_args = 1..)]
        fields: Vec<String>,
    },

    /// Show the saved profile
    Show,
}

fn parse_tab(s: &str) -> Result<TabType, String> {
    TabType::from_str(s).ok_or_else(|| {
        format!(
            "unknown tab '{}', expected one of: home, progress, review, explore",
            s
        )
    })
}

fn print_json<T: Serialize>(data: T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

/// The remote tutor when an API URL is configured, otherwise the offline one.
fn chat_transport(config: &Config) -> Result<Box<dyn ChatTransport>, TutorError> {
    if config.api.base_url.is_some() {
        Ok(Box::new(ApiClient::new(&config.api)?))
    } else {
        info!("no API URL configured, using the offline tutor");
        Ok(Box::new(OfflineTutor::new()))
    }
}

fn print_messages(store: &Store, tab: TabType) {
    let messages = store.messages(tab);
    if messages.is_empty() {
        println!("No messages in {}.", tab.label());
        return;
    }
    for message in messages {
        let who = match message.role {
            MessageRole::User => "You",
            MessageRole::Assistant => "Tutor",
        };
        let status = match message.status {
            DeliveryStatus::Sent => String::new(),
            other => format!(" [{}]", other),
        };
        println!(
            "{} {}{}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            who,
            status
        );
        for line in message.content.lines() {
            println!("  {}", line);
        }
        println!();
    }
}

fn print_new_achievements(store: &Store, before: usize) {
    for achievement in store.achievements().iter().skip(before) {
        println!(
            "Achievement unlocked: {} (+{} points)",
            achievement.title, achievement.points
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let _log_guard = logging::init(&config.logging)?;

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&db_path)?;
    db.init()?;

    let mut store = Store::new();
    db.load_into(&mut store)?;

    match cli.command {
        Commands::Init => {
            if cli.json {
                print_json(serde_json::json!({
                    "database": db_path,
                    "log": logging::log_file_path(),
                }))?;
            } else {
                println!("Database initialized at: {}", db_path.display());
                println!("Logs are written to: {}", logging::log_file_path().display());
            }
        }

        Commands::Chat(chat_cmd) => {
            let transport = chat_transport(&config)?;
            let mut chat = ChatManager::new(&mut store, transport.as_ref());

            match chat_cmd {
                ChatCommands::Send { message, tab } => {
                    if let Some(tab) = tab {
                        chat.switch_tab(tab);
                    }
                    let tab = chat.active_tab();
                    let status = chat.send_message(&message.join(" ")).await?;

                    if cli.json {
                        print_json(serde_json::json!({
                            "status": status,
                            "messages": chat.messages(),
                        }))?;
                    } else if status == DeliveryStatus::Failed {
                        let reason = chat.error().unwrap_or(reconciler::SEND_FAILED_MESSAGE);
                        println!("{} Retry with `tutor chat retry --tab {}`.", reason, tab.as_str());
                    } else if let Some(reply) = chat
                        .messages()
                        .iter()
                        .rev()
                        .find(|m| m.role == MessageRole::Assistant)
                    {
                        println!("{}", reply.content);
                    } else {
                        println!("Message sent.");
                    }
                }

                ChatCommands::History { tab, refresh } => {
                    let tab = tab.unwrap_or_else(|| chat.active_tab());
                    if refresh {
                        let count = chat.load_history(tab).await?;
                        info!(tab = tab.as_str(), count, "history refreshed");
                    }
                    if cli.json {
                        print_json(store.messages(tab))?;
                    } else {
                        print_messages(&store, tab);
                    }
                }

                ChatCommands::Clear { tab } => {
                    let tab = tab.unwrap_or_else(|| chat.active_tab());
                    let cleared = chat.clear_history(tab).await?;
                    if cli.json {
                        print_json(serde_json::json!({ "cleared": cleared }))?;
                    } else if cleared {
                        println!("Cleared {}.", tab.label());
                    } else {
                        println!("The tutor did not clear {}.", tab.label());
                    }
                }

                ChatCommands::Retry { id, tab } => {
                    if let Some(tab) = tab {
                        chat.switch_tab(tab);
                    }
                    let id = match id {
                        Some(id) => id,
                        None => chat
                            .messages()
                            .iter()
                            .rev()
                            .find(|m| m.status == DeliveryStatus::Failed)
                            .map(|m| m.client_id.clone())
                            .ok_or("no failed message to retry in this tab")?,
                    };
                    let status = chat.retry_message(&id).await?;
                    if cli.json {
                        print_json(serde_json::json!({ "id": id, "status": status }))?;
                    } else if status == DeliveryStatus::Sent {
                        println!("Message delivered.");
                    } else {
                        println!("{}", chat.error().unwrap_or(reconciler::SEND_FAILED_MESSAGE));
                    }
                }
            }
        }

        Commands::Track(track_cmd) => match track_cmd {
            TrackCommands::Enroll { id, lessons } => {
                let total_lessons = match lessons {
                    Some(n) => n,
                    None => {
                        let client = ApiClient::new(&config.api)?;
                        client
                            .learning_tracks()
                            .await?
                            .into_iter()
                            .find(|t| t.id == id)
                            .map(|t| t.total_lessons)
                            .ok_or_else(|| format!("track '{}' is not in the catalog; pass --lessons", id))?
                    }
                };
                let track = store.enroll_track(&id, total_lessons)?;
                if cli.json {
                    print_json(track)?;
                } else {
                    println!(
                        "Enrolled in '{}' ({} lessons)",
                        track.track_id, track.total_lessons
                    );
                }
            }

            TrackCommands::List => {
                let tracks: Vec<_> = store.tracks().collect();
                if cli.json {
                    print_json(&tracks)?;
                } else if tracks.is_empty() {
                    println!("No tracks enrolled. Use `tutor track enroll <id>`.");
                } else {
                    println!(
                        "{:<24} {:<12} {:>9} {:>8} STATUS",
                        "TRACK", "PROGRESS", "LESSONS", "TIME"
                    );
                    println!("{}", "-".repeat(70));
                    for track in tracks {
                        println!(
                            "{:<24} {} {:>3}% {:>4}/{:<4} {:>8} {}",
                            truncate(&track.track_id, 22),
                            progress_bar(track.overall_progress, 6),
                            track.overall_progress,
                            track.completed_lessons.len(),
                            track.total_lessons,
                            format_duration(track.time_spent_ms),
                            track.status.label()
                        );
                    }
                }
            }

            TrackCommands::Catalog => {
                let client = ApiClient::new(&config.api)?;
                let catalog = client.learning_tracks().await?;
                if cli.json {
                    print_json(&catalog)?;
                } else if catalog.is_empty() {
                    println!("The tutor offers no tracks yet.");
                } else {
                    println!("{:<20} {:<36} {:>7} DIFFICULTY", "ID", "TITLE", "LESSONS");
                    println!("{}", "-".repeat(78));
                    for track in catalog {
                        let enrolled = if store.track(&track.id).is_some() { "*" } else { " " };
                        println!(
                            "{}{:<19} {:<36} {:>7} {}",
                            enrolled,
                            truncate(&track.id, 18),
                            truncate(&track.title, 34),
                            track.total_lessons,
                            track.difficulty.as_deref().unwrap_or("-")
                        );
                    }
                }
            }

            TrackCommands::Sync => {
                let client = ApiClient::new(&config.api)?;
                let mut synced = Vec::new();
                let mut failed = Vec::new();
                for track in store.tracks() {
                    match client.update_track_progress(track).await {
                        Ok(ack) if ack.success => synced.push(track.track_id.clone()),
                        Ok(_) => failed.push(track.track_id.clone()),
                        Err(e) => {
                            warn!(track_id = %track.track_id, error = %e, "progress sync failed");
                            failed.push(track.track_id.clone());
                        }
                    }
                }
                if cli.json {
                    print_json(serde_json::json!({ "synced": synced, "failed": failed }))?;
                } else {
                    println!("Synced {} track(s).", synced.len());
                    if !failed.is_empty() {
                        println!("Failed: {}", failed.join(", "));
                    }
                }
            }
        },

        Commands::Lesson(lesson_cmd) => {
            let before = store.achievements().len();
            let (track, lesson) = match lesson_cmd {
                LessonCommands::Progress {
                    track,
                    lesson,
                    percentage,
                    score,
                } => {
                    store.update_lesson_progress(&track, &lesson, percentage, score)?;
                    (track, lesson)
                }
                LessonCommands::Complete { track, lesson, score } => {
                    store.complete_lesson(&track, &lesson, score)?;
                    (track, lesson)
                }
                LessonCommands::Bookmark {
                    track,
                    lesson,
                    marker,
                } => {
                    store.add_bookmark(&track, &lesson, &marker)?;
                    (track, lesson)
                }
            };

            if cli.json {
                print_json(serde_json::json!({
                    "lesson": store.lesson(&track, &lesson),
                    "track": store.track(&track),
                    "achievements": &store.achievements()[before..],
                }))?;
            } else {
                if let Some(l) = store.lesson(&track, &lesson) {
                    println!("{} / {}: {}%", track, lesson, l.percentage);
                }
                if let Some(t) = store.track(&track) {
                    println!(
                        "Track progress: {}% ({}/{} lessons)",
                        t.overall_progress,
                        t.completed_lessons.len(),
                        t.total_lessons
                    );
                }
                print_new_achievements(&store, before);
            }
        }

        Commands::Study { track, minutes } => {
            let before = store.achievements().len();
            store.record_study_time(&track, minutes.saturating_mul(60_000))?;
            if cli.json {
                print_json(serde_json::json!({
                    "track": store.track(&track),
                    "total_time_ms": store.total_time_ms(),
                }))?;
            } else {
                println!(
                    "Logged {} on '{}'. Total study time: {}",
                    format_duration((minutes.max(0) as u64).saturating_mul(60_000)),
                    track,
                    format_duration(store.total_time_ms())
                );
                print_new_achievements(&store, before);
            }
        }

        Commands::Stats => {
            let summary = progress::summary(&store);
            if cli.json {
                print_json(serde_json::json!({
                    "summary": summary,
                    "tracks": progress::track_progress(&store),
                }))?;
            } else {
                println!("Learning Statistics");
                println!("{}", "=".repeat(40));
                println!(
                    "Overall progress:  {} {}%",
                    progress_bar(summary.overall_progress, 20),
                    summary.overall_progress
                );
                println!(
                    "Tracks:            {} ({} completed)",
                    summary.tracks_enrolled, summary.tracks_completed
                );
                println!("Lessons completed: {}", summary.lessons_completed);
                println!("Current streak:    {} days", summary.current_streak);
                println!("Study time:        {}", format_duration(summary.total_time_ms));
                println!("Achievement points: {}", summary.achievement_points);
            }
        }

        Commands::Weekly => {
            let weeks = progress::weekly_progress(&store);
            if cli.json {
                print_json(&weeks)?;
            } else if weeks.is_empty() {
                println!("No study activity yet.");
            } else {
                println!("{:<12} {:>8} {:>9} {:>7}", "WEEK OF", "LESSONS", "TIME", "AVG");
                println!("{}", "-".repeat(40));
                for week in weeks {
                    println!(
                        "{:<12} {:>8} {:>9} {:>7}",
                        week.week_start.format("%Y-%m-%d"),
                        week.lessons_completed,
                        format_duration(week.time_spent_ms),
                        week.average_score
                            .map(|s| format!("{:.1}", s))
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }

        Commands::Predict { track } => {
            let prediction = progress::predicted_completion(&store, &track)?;
            if cli.json {
                print_json(&prediction)?;
            } else if prediction.days_remaining == 0 {
                println!(
                    "'{}' was completed on {}.",
                    track,
                    prediction.estimated_completion.format("%Y-%m-%d")
                );
            } else {
                println!(
                    "'{}' is {}% done at {:.1}% per day.",
                    track, prediction.current_progress, prediction.percent_per_day
                );
                println!(
                    "Estimated completion: {} ({} days)",
                    prediction.estimated_completion.format("%Y-%m-%d"),
                    prediction.days_remaining
                );
                if let Some(ms) = prediction.study_time_remaining_ms {
                    println!("Study time still needed: about {}", format_duration(ms));
                }
            }
        }

        Commands::Insights => {
            let insights = progress::strengths_and_weaknesses(&store, &config.progress);
            if cli.json {
                print_json(&insights)?;
            } else {
                println!("Strengths");
                if insights.strengths.is_empty() {
                    println!("  -");
                }
                for s in &insights.strengths {
                    println!("  {:<24} {:.1}", truncate(&s.track_id, 22), s.average_score);
                }
                println!("Needs review");
                if insights.weaknesses.is_empty() {
                    println!("  -");
                }
                for w in &insights.weaknesses {
                    println!("  {:<24} {:.1}", truncate(&w.track_id, 22), w.average_score);
                }
                if !insights.recommendations.is_empty() {
                    println!();
                    for r in &insights.recommendations {
                        println!("* {}", r);
                    }
                }
            }
        }

        Commands::Milestones => {
            let milestones = progress::next_milestones(&store);
            if cli.json {
                print_json(&milestones)?;
            } else if milestones.is_empty() {
                println!("No open milestones.");
            } else {
                for m in milestones {
                    println!(
                        "{:<24} {}% -> {}% ({} more lessons)",
                        truncate(&m.track_id, 22),
                        m.current,
                        m.target,
                        m.lessons_remaining
                    );
                }
            }
        }

        Commands::Achievements => {
            let achievements = store.achievements();
            if cli.json {
                print_json(achievements)?;
            } else if achievements.is_empty() {
                println!("No achievements yet.");
            } else {
                for a in achievements {
                    println!(
                        "{}  {:<28} {:<10} +{}",
                        a.earned_at.format("%Y-%m-%d"),
                        truncate(&a.title, 26),
                        a.rarity.as_str(),
                        a.points
                    );
                }
            }
        }

        Commands::Assess { request, from } => {
            let request = request.join(" ");
            let pre = match from {
                Some(path) => {
                    let generated = std::fs::read_to_string(&path)?;
                    assessment::questions_from_generated(&request, &generated)?
                }
                None => assessment::questions_for(&request)?,
            };
            if cli.json {
                print_json(&pre)?;
            } else {
                println!("Before we start on {}, a few questions:", pre.subject);
                for (i, q) in pre.questions.iter().enumerate() {
                    println!("{}. {}", i + 1, q);
                }
            }
        }

        Commands::Assessments(assessment_cmd) => {
            let client = ApiClient::new(&config.api)?;
            match assessment_cmd {
                AssessmentCommands::List => {
                    let available = client.available_assessments().await?;
                    if cli.json {
                        print_json(&available)?;
                    } else if available.is_empty() {
                        println!("No assessments available.");
                    } else {
                        println!("{:<20} {:<40} QUESTIONS", "ID", "TITLE");
                        println!("{}", "-".repeat(72));
                        for a in available {
                            println!(
                                "{:<20} {:<40} {}",
                                truncate(&a.id, 18),
                                truncate(&a.title, 38),
                                a.question_count
                            );
                        }
                    }
                }

                AssessmentCommands::Show { id } => {
                    let found = client.assessment(&id).await?;
                    if cli.json {
                        print_json(&found)?;
                    } else {
                        println!("{}", found.title);
                        println!("{}", "=".repeat(40));
                        for q in &found.questions {
                            println!("[{}] {}", q.id, q.prompt);
                            for option in &q.options {
                                println!("    - {}", option);
                            }
                        }
                    }
                }

                AssessmentCommands::Submit { id, answers } => {
                    let submission =
                        AssessmentSubmission::from_pairs(&id, answers.iter().map(String::as_str))?;
                    let result = client.submit_assessment(&submission).await?;
                    if cli.json {
                        print_json(&result)?;
                    } else {
                        let verdict = if result.passed { "passed" } else { "not passed" };
                        println!("Score: {:.1} ({})", result.score, verdict);
                        for line in &result.feedback {
                            println!("* {}", line);
                        }
                    }
                }
            }
        }

        Commands::Profile(profile_cmd) => match profile_cmd {
            ProfileCommands::Set { fields } => {
                let profile = profile::parse_profile(fields.iter().map(String::as_str))?;
                db.set_meta(PROFILE_KEY, &serde_json::to_string(&profile)?)?;
                if cli.json {
                    print_json(&profile)?;
                } else {
                    println!("Saved profile for {}.", profile.name);
                }
            }

            ProfileCommands::Show => {
                let profile: Option<LearnerProfile> = db
                    .get_meta(PROFILE_KEY)?
                    .map(|raw| serde_json::from_str(&raw))
                    .transpose()?;
                if cli.json {
                    match profile {
                        Some(p) => print_json(&p)?,
                        None => println!(
                            "{}",
                            serde_json::to_string(&JsonOutput::<()>::err("No profile saved"))?
                        ),
                    }
                } else if let Some(p) = profile {
                    println!("Name:    {}", p.name);
                    println!("Email:   {}", p.email);
                    if let Some(website) = &p.website {
                        println!("Website: {}", website);
                    }
                    if !p.goals.is_empty() {
                        println!("Goals:   {}", p.goals.join("; "));
                    }
                    if let Some(hours) = p.preferences.weekly_hours {
                        println!("Weekly:  {} hours", hours);
                    }
                    if let Some(style) = &p.preferences.learning_style {
                        println!("Style:   {}", style);
                    }
                    println!(
                        "Reminders: {}",
                        if p.preferences.reminders { "on" } else { "off" }
                    );
                } else {
                    println!("No profile yet. Use `tutor profile set name=... email=...`.");
                }
            }
        },

        Commands::Health => {
            let client = ApiClient::new(&config.api)?;
            let health = client.health().await?;
            if cli.json {
                print_json(serde_json::json!({ "status": health.status }))?;
            } else {
                println!("Tutor API: {}", health.status);
            }
        }

        Commands::Tui => {
            let transport = chat_transport(&config)?;
            tui::run(&mut store, transport.as_ref(), config.progress.clone()).await?;
        }
    }

    db.persist(&store)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_chat_send_joins_words() {
            let cli = Cli::try_parse_from(["tutor", "chat", "send", "teach", "me", "rust"]).unwrap();
            match cli.command {
                Commands::Chat(ChatCommands::Send { message, tab }) => {
                    assert_eq!(message.join(" "), "teach me rust");
                    assert!(tab.is_none());
                }
                _ => panic!("Expected Chat Send command"),
            }
        }

        #[test]
        fn parse_chat_send_with_tab() {
            let cli =
                Cli::try_parse_from(["tutor", "chat", "send", "hi", "--tab", "review"]).unwrap();
            match cli.command {
                Commands::Chat(ChatCommands::Send { tab, .. }) => {
                    assert_eq!(tab, Some(TabType::Review));
                }
                _ => panic!("Expected Chat Send command"),
            }
        }

        #[test]
        fn parse_unknown_tab_fails() {
            let result = Cli::try_parse_from(["tutor", "chat", "history", "--tab", "inbox"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_chat_send_requires_message() {
            let result = Cli::try_parse_from(["tutor", "chat", "send"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_enroll_with_lessons() {
            let cli =
                Cli::try_parse_from(["tutor", "track", "enroll", "rust-basics", "-l", "12"]).unwrap();
            match cli.command {
                Commands::Track(TrackCommands::Enroll { id, lessons }) => {
                    assert_eq!(id, "rust-basics");
                    assert_eq!(lessons, Some(12));
                }
                _ => panic!("Expected Track Enroll command"),
            }
        }

        #[test]
        fn parse_lesson_progress_with_score() {
            let cli = Cli::try_parse_from([
                "tutor", "lesson", "progress", "rust", "ownership", "60", "--score", "85.5",
            ])
            .unwrap();
            match cli.command {
                Commands::Lesson(LessonCommands::Progress {
                    percentage, score, ..
                }) => {
                    assert_eq!(percentage, 60);
                    assert_eq!(score, Some(85.5));
                }
                _ => panic!("Expected Lesson Progress command"),
            }
        }

        #[test]
        fn parse_negative_study_minutes_reaches_validation() {
            let cli = Cli::try_parse_from(["tutor", "study", "rust", "--", "-5"]).unwrap();
            match cli.command {
                Commands::Study { minutes, .. } => assert_eq!(minutes, -5),
                _ => panic!("Expected Study command"),
            }
        }

        #[test]
        fn parse_assess_from_file() {
            let cli = Cli::try_parse_from([
                "tutor", "assess", "learn", "python", "--from", "questions.txt",
            ])
            .unwrap();
            match cli.command {
                Commands::Assess { request, from } => {
                    assert_eq!(request, vec!["learn", "python"]);
                    assert_eq!(from, Some(std::path::PathBuf::from("questions.txt")));
                }
                _ => panic!("Expected Assess command"),
            }
        }

        #[test]
        fn parse_assessment_submit_pairs() {
            let cli =
                Cli::try_parse_from(["tutor", "assessments", "submit", "a1", "q1=b", "q2=c"]).unwrap();
            match cli.command {
                Commands::Assessments(AssessmentCommands::Submit { id, answers }) => {
                    assert_eq!(id, "a1");
                    assert_eq!(answers, vec!["q1=b", "q2=c"]);
                }
                _ => panic!("Expected Assessments Submit command"),
            }
        }

        #[test]
        fn parse_json_flag_is_global() {
            let cli = Cli::try_parse_from(["tutor", "stats", "--json"]).unwrap();
            assert!(cli.json);
        }
    }

    mod transport_tests {
        use super::*;

        #[test]
        fn offline_tutor_without_api_url() {
            let config = Config::default();
            assert!(chat_transport(&config).is_ok());
        }

        #[test]
        fn invalid_api_url_is_a_config_error() {
            let mut config = Config::default();
            config.api.base_url = Some("not a url".to_string());
            assert!(matches!(
                chat_transport(&config),
                Err(TutorError::Config(_))
            ));
        }
    }
}
