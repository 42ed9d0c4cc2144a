use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;

use crate::models::{
    Achievement, AchievementCategory, DeliveryStatus, LearningStreak, LessonProgress, Message,
    MessageRole, Rarity, StudyEvent, StudyEventKind, TabType, TrackProgress, TrackStatus,
};
use crate::store::Store;

pub struct Database {
    conn: Connection,
}

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn unknown_variant(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown value '{}'", value).into(),
    )
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                track_id TEXT PRIMARY KEY,
                enrolled_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL,
                total_lessons INTEGER NOT NULL CHECK(total_lessons > 0),
                overall_progress INTEGER NOT NULL DEFAULT 0 CHECK(overall_progress BETWEEN 0 AND 100),
                completed_lessons TEXT NOT NULL DEFAULT '[]',
                time_spent_ms INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'not_started' CHECK(status IN ('not_started', 'in_progress', 'completed'))
            );

            CREATE TABLE IF NOT EXISTS lessons (
                track_id TEXT NOT NULL,
                lesson_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                percentage INTEGER NOT NULL DEFAULT 0 CHECK(percentage BETWEEN 0 AND 100),
                attempts INTEGER NOT NULL DEFAULT 0,
                scores TEXT NOT NULL DEFAULT '[]',
                bookmarks TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (track_id, lesson_id),
                FOREIGN KEY (track_id) REFERENCES tracks(track_id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                points INTEGER NOT NULL,
                rarity TEXT NOT NULL,
                earned_at TEXT NOT NULL
            );

            -- Append-only study activity, replayed in seq order
            CREATE TABLE IF NOT EXISTS activity (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL CHECK(kind IN ('lesson_completed', 'study_time', 'progress_updated')),
                track_id TEXT NOT NULL,
                lesson_id TEXT,
                score REAL,
                duration_ms INTEGER,
                percentage INTEGER,
                occurred_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                tab TEXT NOT NULL CHECK(tab IN ('home', 'progress', 'review', 'explore')),
                position INTEGER NOT NULL,
                client_id TEXT NOT NULL,
                id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('pending', 'sent', 'failed')),
                PRIMARY KEY (tab, position)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_lessons_track ON lessons(track_id);
            CREATE INDEX IF NOT EXISTS idx_activity_track ON activity(track_id);
            CREATE INDEX IF NOT EXISTS idx_messages_tab ON messages(tab, position);
            "#,
        )?;

        Ok(())
    }

    // Track operations
    pub fn save_track(&self, track: &TrackProgress) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO tracks
                (track_id, enrolled_at, last_accessed, total_lessons, overall_progress,
                 completed_lessons, time_spent_ms, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                track.track_id,
                track.enrolled_at.to_rfc3339(),
                track.last_accessed.to_rfc3339(),
                track.total_lessons,
                track.overall_progress,
                to_json(&track.completed_lessons)?,
                i64::try_from(track.time_spent_ms).unwrap_or(i64::MAX),
                track.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn track_from_row(row: &Row) -> Result<TrackProgress> {
        let enrolled_at: String = row.get(1)?;
        let last_accessed: String = row.get(2)?;
        let completed: String = row.get(5)?;
        let time_spent: i64 = row.get(6)?;
        let status: String = row.get(7)?;
        Ok(TrackProgress {
            track_id: row.get(0)?,
            enrolled_at: parse_timestamp(1, &enrolled_at)?,
            last_accessed: parse_timestamp(2, &last_accessed)?,
            total_lessons: row.get(3)?,
            overall_progress: row.get(4)?,
            completed_lessons: parse_json(5, &completed)?,
            time_spent_ms: time_spent.max(0) as u64,
            status: TrackStatus::from_str(&status).ok_or_else(|| unknown_variant(7, &status))?,
        })
    }

    #[cfg(test)]
    pub fn get_track(&self, track_id: &str) -> Result<Option<TrackProgress>> {
        self.conn
            .query_row(
                r#"
                SELECT track_id, enrolled_at, last_accessed, total_lessons, overall_progress,
                       completed_lessons, time_spent_ms, status
                FROM tracks WHERE track_id = ?1
                "#,
                params![track_id],
                Self::track_from_row,
            )
            .optional()
    }

    pub fn list_tracks(&self) -> Result<Vec<TrackProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT track_id, enrolled_at, last_accessed, total_lessons, overall_progress,
                   completed_lessons, time_spent_ms, status
            FROM tracks ORDER BY track_id
            "#,
        )?;
        let rows = stmt.query_map([], Self::track_from_row)?;
        rows.collect::<Result<Vec<_>>>()
    }

    // Lesson operations
    pub fn save_lesson(&self, lesson: &LessonProgress) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO lessons
                (track_id, lesson_id, started_at, completed_at, percentage, attempts, scores, bookmarks)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                lesson.track_id,
                lesson.lesson_id,
                lesson.started_at.to_rfc3339(),
                lesson.completed_at.map(|t| t.to_rfc3339()),
                lesson.percentage,
                lesson.attempts,
                to_json(&lesson.scores)?,
                to_json(&lesson.bookmarks)?,
            ],
        )?;
        Ok(())
    }

    pub fn list_lessons(&self) -> Result<Vec<LessonProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT track_id, lesson_id, started_at, completed_at, percentage, attempts, scores, bookmarks
            FROM lessons ORDER BY track_id, lesson_id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let started_at: String = row.get(2)?;
            let completed_at: Option<String> = row.get(3)?;
            let scores: String = row.get(6)?;
            let bookmarks: String = row.get(7)?;
            Ok(LessonProgress {
                track_id: row.get(0)?,
                lesson_id: row.get(1)?,
                started_at: parse_timestamp(2, &started_at)?,
                completed_at: completed_at
                    .as_deref()
                    .map(|s| parse_timestamp(3, s))
                    .transpose()?,
                percentage: row.get(4)?,
                attempts: row.get(5)?,
                scores: parse_json(6, &scores)?,
                bookmarks: parse_json(7, &bookmarks)?,
            })
        })?;
        rows.collect::<Result<Vec<_>>>()
    }

    // Achievement operations

    /// Returns false when the achievement was already stored.
    pub fn save_achievement(&self, achievement: &Achievement) -> Result<bool> {
        let rows = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO achievements (id, category, title, description, points, rarity, earned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                achievement.id,
                achievement.category.as_str(),
                achievement.title,
                achievement.description,
                achievement.points,
                achievement.rarity.as_str(),
                achievement.earned_at.to_rfc3339(),
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, category, title, description, points, rarity, earned_at
            FROM achievements ORDER BY earned_at, id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let category: String = row.get(1)?;
            let rarity: String = row.get(5)?;
            let earned_at: String = row.get(6)?;
            Ok(Achievement {
                id: row.get(0)?,
                category: AchievementCategory::from_str(&category)
                    .ok_or_else(|| unknown_variant(1, &category))?,
                title: row.get(2)?,
                description: row.get(3)?,
                points: row.get(4)?,
                rarity: Rarity::from_str(&rarity).ok_or_else(|| unknown_variant(5, &rarity))?,
                earned_at: parse_timestamp(6, &earned_at)?,
            })
        })?;
        rows.collect::<Result<Vec<_>>>()
    }

    // Activity operations
    pub fn append_event(&self, event: &StudyEvent) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO activity (kind, track_id, lesson_id, score, duration_ms, percentage, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.kind.as_str(),
                event.track_id,
                event.lesson_id,
                event.score,
                event.duration_ms.map(|d| i64::try_from(d).unwrap_or(i64::MAX)),
                event.percentage,
                event.occurred_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_events(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn list_events(&self) -> Result<Vec<StudyEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT kind, track_id, lesson_id, score, duration_ms, percentage, occurred_at
            FROM activity ORDER BY seq
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(0)?;
            let duration: Option<i64> = row.get(4)?;
            let occurred_at: String = row.get(6)?;
            Ok(StudyEvent {
                kind: StudyEventKind::from_str(&kind).ok_or_else(|| unknown_variant(0, &kind))?,
                track_id: row.get(1)?,
                lesson_id: row.get(2)?,
                score: row.get(3)?,
                duration_ms: duration.map(|d| d.max(0) as u64),
                percentage: row.get(5)?,
                occurred_at: parse_timestamp(6, &occurred_at)?,
            })
        })?;
        rows.collect::<Result<Vec<_>>>()
    }

    // Message operations

    /// Replaces everything stored for `tab` with `messages`, keeping order.
    pub fn save_messages(&self, tab: TabType, messages: &[Message]) -> Result<()> {
        self.conn
            .execute("DELETE FROM messages WHERE tab = ?1", params![tab.as_str()])?;
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO messages (client_id, id, tab, position, role, content, timestamp, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;
        for (position, message) in messages.iter().enumerate() {
            stmt.execute(params![
                message.client_id,
                message.id,
                tab.as_str(),
                position as i64,
                message.role.as_str(),
                message.content,
                message.timestamp.to_rfc3339(),
                message.status.as_str(),
            ])?;
        }
        Ok(())
    }

    pub fn list_messages(&self, tab: TabType) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT client_id, id, role, content, timestamp, status
            FROM messages WHERE tab = ?1 ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map(params![tab.as_str()], |row| {
            let role: String = row.get(2)?;
            let timestamp: String = row.get(4)?;
            let status: String = row.get(5)?;
            Ok(Message {
                client_id: row.get(0)?,
                id: row.get(1)?,
                role: MessageRole::from_str(&role).ok_or_else(|| unknown_variant(2, &role))?,
                content: row.get(3)?,
                timestamp: parse_timestamp(4, &timestamp)?,
                tab,
                status: DeliveryStatus::from_str(&status)
                    .ok_or_else(|| unknown_variant(5, &status))?,
            })
        })?;
        rows.collect::<Result<Vec<_>>>()
    }

    // Key/value state
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // Whole-store sync

    /// Hydrates a fresh store from the database.
    pub fn load_into(&self, store: &mut Store) -> Result<()> {
        for track in self.list_tracks()? {
            store.restore_track(track);
        }
        for lesson in self.list_lessons()? {
            store.restore_lesson(lesson);
        }
        for achievement in self.list_achievements()? {
            store.restore_achievement(achievement);
        }
        for event in self.list_events()? {
            store.restore_event(event);
        }
        for tab in TabType::ALL {
            let messages = self.list_messages(tab)?;
            if !messages.is_empty() {
                store.restore_messages(tab, messages);
            }
        }

        let streak_days = self
            .get_meta("streak_current")?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let last_active = self
            .get_meta("streak_last_active")?
            .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok());
        store.restore_streak(LearningStreak {
            current: streak_days,
            last_active,
        });

        if let Some(total) = self
            .get_meta("total_time_ms")?
            .and_then(|v| v.parse::<u64>().ok())
        {
            store.restore_total_time(total);
        }
        if let Some(tab) = self
            .get_meta("active_tab")?
            .and_then(|v| TabType::from_str(&v))
        {
            store.set_active_tab(tab);
        }

        tracing::debug!(
            tracks = store.tracks().count(),
            events = store.activity().len(),
            "store loaded"
        );
        Ok(())
    }

    /// Writes the store back in one transaction. Activity rows already on
    /// disk are kept; only newer events are appended.
    pub fn persist(&self, store: &Store) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for track in store.tracks() {
            self.save_track(track)?;
            for lesson in store.lessons_for(&track.track_id) {
                self.save_lesson(lesson)?;
            }
        }
        for achievement in store.achievements() {
            self.save_achievement(achievement)?;
        }

        let stored = self.count_events()?;
        for event in store.activity().iter().skip(stored) {
            self.append_event(event)?;
        }

        for tab in TabType::ALL {
            self.save_messages(tab, store.messages(tab))?;
        }

        let streak = store.streak();
        self.set_meta("streak_current", &streak.current.to_string())?;
        if let Some(day) = streak.last_active {
            self.set_meta("streak_last_active", &day.format("%Y-%m-%d").to_string())?;
        }
        self.set_meta("total_time_ms", &store.total_time_ms().to_string())?;
        self.set_meta("active_tab", store.active_tab().as_str())?;

        tx.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_clock::TestClock;
    use crate::store::{Resolution, SendReceipt};

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn setup_store() -> (Store, TestClock) {
        let clock = TestClock::at(2024, 3, 4);
        (Store::with_clock(clock.clock()), clock)
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in ["tracks", "lessons", "achievements", "activity", "messages", "meta"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .unwrap();
                assert_eq!(count, 0, "{} should start empty", table);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.init().unwrap();
            db.init().unwrap();
        }
    }

    mod track_tests {
        use super::*;

        #[test]
        fn save_and_get_track() {
            let db = setup_db();
            let clock = TestClock::at(2024, 3, 4);
            let mut track = TrackProgress::new("rust", 8, clock.now());
            track.completed_lessons = vec!["l1".into(), "l2".into()];
            track.overall_progress = 25;
            track.status = TrackStatus::InProgress;
            track.time_spent_ms = 90_000;

            db.save_track(&track).unwrap();
            let loaded = db.get_track("rust").unwrap().unwrap();
            assert_eq!(loaded, track);
        }

        #[test]
        fn get_missing_track_is_none() {
            let db = setup_db();
            assert!(db.get_track("nope").unwrap().is_none());
        }

        #[test]
        fn save_track_replaces() {
            let db = setup_db();
            let mut track = TrackProgress::new("rust", 4, Utc::now());
            db.save_track(&track).unwrap();
            track.overall_progress = 50;
            db.save_track(&track).unwrap();

            let tracks = db.list_tracks().unwrap();
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].overall_progress, 50);
        }

        #[test]
        fn rejects_zero_lesson_track() {
            let db = setup_db();
            let track = TrackProgress::new("bad", 0, Utc::now());
            assert!(db.save_track(&track).is_err());
        }
    }

    mod achievement_tests {
        use super::*;

        #[test]
        fn achievements_are_stored_once() {
            let db = setup_db();
            let achievement = Achievement {
                id: "first-lesson".into(),
                category: AchievementCategory::Progress,
                title: "First Steps".into(),
                description: "Complete your first lesson".into(),
                points: 10,
                rarity: Rarity::Common,
                earned_at: Utc::now(),
            };
            assert!(db.save_achievement(&achievement).unwrap());
            assert!(!db.save_achievement(&achievement).unwrap());
            assert_eq!(db.list_achievements().unwrap().len(), 1);
        }
    }

    mod message_tests {
        use super::*;

        #[test]
        fn messages_keep_order_per_tab() {
            let db = setup_db();
            let now = Utc::now();
            let home = vec![
                Message::committed("a", MessageRole::User, "first", now, TabType::Home),
                Message::committed("b", MessageRole::Assistant, "second", now, TabType::Home),
            ];
            db.save_messages(TabType::Home, &home).unwrap();
            db.save_messages(
                TabType::Review,
                &[Message::committed("c", MessageRole::User, "other", now, TabType::Review)],
            )
            .unwrap();

            let loaded = db.list_messages(TabType::Home).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded[0].content, "first");
            assert_eq!(loaded[1].role, MessageRole::Assistant);
            assert_eq!(db.list_messages(TabType::Review).unwrap().len(), 1);
        }

        #[test]
        fn save_messages_replaces_tab() {
            let db = setup_db();
            let now = Utc::now();
            db.save_messages(
                TabType::Home,
                &[Message::committed("a", MessageRole::User, "old", now, TabType::Home)],
            )
            .unwrap();
            db.save_messages(TabType::Home, &[]).unwrap();
            assert!(db.list_messages(TabType::Home).unwrap().is_empty());
        }
    }

    mod sync_tests {
        use super::*;

        #[test]
        fn persist_then_load_restores_progress() {
            let db = setup_db();
            let (mut store, clock) = setup_store();
            store.enroll_track("rust", 2).unwrap();
            store.complete_lesson("rust", "l1", Some(88.0)).unwrap();
            store.add_bookmark("rust", "l1", "ownership").unwrap();
            store.record_study_time("rust", 1_800_000).unwrap();
            store.set_active_tab(TabType::Review);
            db.persist(&store).unwrap();

            let mut restored = Store::with_clock(clock.clock());
            db.load_into(&mut restored).unwrap();

            let track = restored.track("rust").unwrap();
            assert_eq!(track.overall_progress, 50);
            assert_eq!(track.completed_lessons, vec!["l1"]);
            let lesson = restored.lesson("rust", "l1").unwrap();
            assert_eq!(lesson.scores, vec![88.0]);
            assert_eq!(lesson.bookmarks, vec!["ownership"]);
            assert_eq!(restored.activity().len(), store.activity().len());
            assert_eq!(restored.achievements().len(), store.achievements().len());
            assert_eq!(restored.streak(), store.streak());
            assert_eq!(restored.total_time_ms(), 1_800_000);
            assert_eq!(restored.active_tab(), TabType::Review);
        }

        #[test]
        fn persist_twice_does_not_duplicate_activity() {
            let db = setup_db();
            let (mut store, _) = setup_store();
            store.enroll_track("rust", 2).unwrap();
            store.complete_lesson("rust", "l1", None).unwrap();
            db.persist(&store).unwrap();
            db.persist(&store).unwrap();
            assert_eq!(db.count_events().unwrap(), 1);

            store.complete_lesson("rust", "l2", None).unwrap();
            db.persist(&store).unwrap();
            assert_eq!(db.count_events().unwrap(), 2);
        }

        #[test]
        fn pending_messages_come_back_failed() {
            let db = setup_db();
            let (mut store, clock) = setup_store();
            let sent = store.append_optimistic_message(TabType::Home, "delivered");
            store
                .resolve_message(&sent.client_id, Resolution::Delivered(SendReceipt::default()))
                .unwrap();
            store.append_optimistic_message(TabType::Home, "in flight");
            db.persist(&store).unwrap();

            let mut restored = Store::with_clock(clock.clock());
            db.load_into(&mut restored).unwrap();

            let messages = restored.messages(TabType::Home);
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].status, DeliveryStatus::Sent);
            assert_eq!(messages[1].status, DeliveryStatus::Failed);
            assert_eq!(messages[1].content, "in flight");
        }

        #[test]
        fn same_server_id_in_two_tabs_survives_reload() {
            let db = setup_db();
            let (mut store, clock) = setup_store();
            let now = clock.now();
            store.replace_history(
                TabType::Home,
                vec![Message::committed("1", MessageRole::User, "home", now, TabType::Home)],
            );
            store.replace_history(
                TabType::Review,
                vec![Message::committed("1", MessageRole::User, "review", now, TabType::Review)],
            );
            db.persist(&store).unwrap();
            db.persist(&store).unwrap();

            let mut restored = Store::with_clock(clock.clock());
            db.load_into(&mut restored).unwrap();

            assert_eq!(restored.messages(TabType::Home).len(), 1);
            assert_eq!(restored.messages(TabType::Home)[0].content, "home");
            assert_eq!(restored.messages(TabType::Review).len(), 1);
            assert_eq!(restored.messages(TabType::Review)[0].content, "review");
        }

        #[test]
        fn saturated_study_time_round_trips_clamped() {
            let db = setup_db();
            let (mut store, clock) = setup_store();
            store.enroll_track("rust", 2).unwrap();
            store.record_study_time("rust", i64::MAX).unwrap();
            store.record_study_time("rust", i64::MAX).unwrap();
            db.persist(&store).unwrap();

            let mut restored = Store::with_clock(clock.clock());
            db.load_into(&mut restored).unwrap();
            assert_eq!(restored.track("rust").unwrap().time_spent_ms, i64::MAX as u64);
        }

        #[test]
        fn empty_database_loads_empty_store() {
            let db = setup_db();
            let (mut store, _) = setup_store();
            db.load_into(&mut store).unwrap();
            assert_eq!(store.tracks().count(), 0);
            assert_eq!(store.streak(), LearningStreak::default());
            assert_eq!(store.active_tab(), TabType::Home);
        }
    }
}
