use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::models::{
    FoodCatalogEntry, IntakeEvent, IntakeOutcome, NewIntakeEvent, NewProfile, PersonalProfile,
    format_timestamp, validate_catalog_food,
};

const PROFILE_COLUMNS: &str = "id, recorded_at, user_id, sex, birth_date, height_cm, weight_kg,
     bmi, bmr, tdee, activity_level, height_unit, weight_unit";

const INTAKE_COLUMNS: &str = "id, recorded_at, user_id, food_name, calories";

/// Append-only record store. Profile snapshots and intake events are only
/// ever inserted; the row id is the insertion order.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recorded_at TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    sex TEXT NOT NULL,
                    birth_date TEXT NOT NULL,
                    height_cm REAL NOT NULL,
                    weight_kg REAL NOT NULL,
                    bmi REAL NOT NULL,
                    bmr REAL NOT NULL,
                    tdee REAL NOT NULL,
                    activity_level TEXT NOT NULL,
                    height_unit TEXT NOT NULL DEFAULT 'cm',
                    weight_unit TEXT NOT NULL DEFAULT 'kg'
                );

                CREATE TABLE IF NOT EXISTS foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    food_name TEXT NOT NULL UNIQUE,
                    calories_per_unit REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS intake_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recorded_at TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    food_name TEXT NOT NULL,
                    calories REAL NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_profiles_user ON profiles(user_id);
                CREATE INDEX IF NOT EXISTS idx_intake_events_user ON intake_events(user_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn text_col<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw: String = row.get(idx)?;
        raw.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn timestamp_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
        let raw: String = row.get(idx)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn date_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let raw: String = row.get(idx)?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<PersonalProfile> {
        Ok(PersonalProfile {
            id: row.get(0)?,
            recorded_at: Self::timestamp_col(row, 1)?,
            user_id: row.get(2)?,
            sex: Self::text_col(row, 3)?,
            birth_date: Self::date_col(row, 4)?,
            height_cm: row.get(5)?,
            weight_kg: row.get(6)?,
            bmi: row.get(7)?,
            bmr: row.get(8)?,
            tdee: row.get(9)?,
            activity_level: Self::text_col(row, 10)?,
            height_unit: Self::text_col(row, 11)?,
            weight_unit: Self::text_col(row, 12)?,
        })
    }

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodCatalogEntry> {
        Ok(FoodCatalogEntry {
            id: row.get(0)?,
            food_name: row.get(1)?,
            calories_per_unit: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn intake_from_row(row: &rusqlite::Row) -> rusqlite::Result<IntakeEvent> {
        Ok(IntakeEvent {
            id: row.get(0)?,
            recorded_at: Self::timestamp_col(row, 1)?,
            user_id: row.get(2)?,
            food_name: row.get(3)?,
            calories: row.get(4)?,
        })
    }

    // --- Profiles ---

    pub fn append_profile(&self, profile: &NewProfile) -> Result<PersonalProfile> {
        self.conn
            .execute(
                "INSERT INTO profiles (recorded_at, user_id, sex, birth_date, height_cm, weight_kg,
                                       bmi, bmr, tdee, activity_level, height_unit, weight_unit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    format_timestamp(profile.recorded_at),
                    profile.user_id,
                    profile.sex.as_str(),
                    profile.birth_date.format("%Y-%m-%d").to_string(),
                    profile.height_cm,
                    profile.weight_kg,
                    profile.bmi,
                    profile.bmr,
                    profile.tdee,
                    profile.activity_level.as_str(),
                    profile.height_unit.as_str(),
                    profile.weight_unit.as_str(),
                ],
            )
            .context("Failed to append profile")?;
        let id = self.conn.last_insert_rowid();
        debug!(user = %profile.user_id, id, tdee = profile.tdee, "appended profile");
        self.get_profile(id)
    }

    pub fn get_profile(&self, id: i64) -> Result<PersonalProfile> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                Self::profile_from_row,
            )
            .context("Profile not found")
    }

    /// Every profile the user has saved, oldest first.
    pub fn profiles_for_user(&self, user_id: &str) -> Result<Vec<PersonalProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1 ORDER BY id"
        ))?;
        let profiles = stmt
            .query_map(params![user_id], Self::profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    // --- Food catalog ---

    /// Insert a catalog food, or change its calories if the name exists.
    /// Past intake events keep the calories they were written with.
    pub fn upsert_food(&self, food_name: &str, calories_per_unit: f64) -> Result<FoodCatalogEntry> {
        validate_catalog_food(food_name, calories_per_unit)?;
        let food_name = food_name.trim();
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO foods (food_name, calories_per_unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(food_name) DO UPDATE SET
                calories_per_unit = excluded.calories_per_unit,
                updated_at = excluded.updated_at",
            params![food_name, calories_per_unit, now, now],
        )?;
        self.get_food(food_name)?
            .context("Food not found after upsert")
    }

    pub fn get_food(&self, food_name: &str) -> Result<Option<FoodCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, food_name, calories_per_unit, created_at, updated_at
             FROM foods WHERE food_name = ?1",
        )?;
        let mut rows = stmt.query(params![food_name])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Catalog food names in insertion order.
    pub fn list_foods(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT food_name FROM foods ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn list_catalog(&self) -> Result<Vec<FoodCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, food_name, calories_per_unit, created_at, updated_at
             FROM foods ORDER BY id",
        )?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    // --- Intake events ---

    pub fn append_intake(&self, user_id: &str, food_name: &str) -> Result<IntakeOutcome> {
        self.append_intake_at(user_id, food_name, Local::now().naive_local())
    }

    /// Record one unit of a catalog food. An unknown food leaves the log
    /// untouched and comes back as an unsuccessful outcome.
    pub fn append_intake_at(
        &self,
        user_id: &str,
        food_name: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<IntakeOutcome> {
        let Some(food) = self.get_food(food_name)? else {
            warn!(user = %user_id, food = %food_name, "food not in catalog");
            return Ok(IntakeOutcome::unknown_food(food_name));
        };

        let event = self.insert_intake_event(&NewIntakeEvent {
            recorded_at,
            user_id: user_id.to_string(),
            food_name: food.food_name,
            calories: food.calories_per_unit,
        })?;
        Ok(IntakeOutcome::added(event))
    }

    /// Write an event as given, without consulting the catalog.
    pub fn insert_intake_event(&self, event: &NewIntakeEvent) -> Result<IntakeEvent> {
        self.conn
            .execute(
                "INSERT INTO intake_events (recorded_at, user_id, food_name, calories)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    format_timestamp(event.recorded_at),
                    event.user_id,
                    event.food_name,
                    event.calories,
                ],
            )
            .context("Failed to append intake event")?;
        let id = self.conn.last_insert_rowid();
        debug!(user = %event.user_id, food = %event.food_name, id, "appended intake event");
        self.get_intake_event(id)
    }

    pub fn get_intake_event(&self, id: i64) -> Result<IntakeEvent> {
        self.conn
            .query_row(
                &format!("SELECT {INTAKE_COLUMNS} FROM intake_events WHERE id = ?1"),
                params![id],
                Self::intake_from_row,
            )
            .context("Intake event not found")
    }

    /// Every intake event for the user, oldest first.
    pub fn intake_for_user(&self, user_id: &str) -> Result<Vec<IntakeEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INTAKE_COLUMNS} FROM intake_events WHERE user_id = ?1 ORDER BY id"
        ))?;
        let events = stmt
            .query_map(params![user_id], Self::intake_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn intake_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM intake_events", [], |row| row.get(0))?;
        Ok(count)
    }
}
