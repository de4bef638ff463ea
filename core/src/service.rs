use std::io::Read;
use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error};

use crate::calculators::{ActivityLevel, ProfileMetrics, Sex};
use crate::chart::{self, RollingChart};
use crate::db::Database;
use crate::flatfile::{self, ImportSummary};
use crate::models::{
    FoodCatalogEntry, IntakeOutcome, NewProfile, PersonalProfile, ProfileForm, ProfileView,
    latest_by_user, parse_birth_date, validate_measurement, validate_user_id,
};
use crate::units::{HeightUnit, WeightUnit};

/// Everything shown when a user signs in: their current profile (if any),
/// the prefilled entry form and the rolling chart.
#[derive(Debug, Clone, Serialize)]
pub struct LoginView {
    pub user: String,
    pub profile: Option<ProfileView>,
    pub form: ProfileForm,
    pub chart: RollingChart,
}

/// One outcome per requested unit. `success` is true only if every unit was
/// recorded.
#[derive(Debug, Clone, Serialize)]
pub struct AddFoodReport {
    pub outcomes: Vec<IntakeOutcome>,
    pub success: bool,
}

pub struct HealthService {
    db: Database,
}

impl HealthService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Profiles ---

    pub fn login(&self, user: &str) -> Result<LoginView> {
        self.login_at(user, Local::now().date_naive())
    }

    pub fn login_at(&self, user: &str, today: NaiveDate) -> Result<LoginView> {
        let user = validate_user_id(user)?;
        let profile = self.latest_profile(&user)?;
        let form = profile
            .as_ref()
            .map_or_else(|| ProfileForm::defaults(today), ProfileForm::from_view);
        let chart = self.build_rolling_chart_at(&user, today)?;
        Ok(LoginView {
            user,
            profile,
            form,
            chart,
        })
    }

    /// The newest snapshot in the user's log, if they have saved one.
    pub fn latest_profile(&self, user: &str) -> Result<Option<ProfileView>> {
        let user = validate_user_id(user)?;
        let profiles = self.db.profiles_for_user(&user)?;
        Ok(latest_by_user(&profiles, &user).cloned().map(ProfileView::from))
    }

    pub fn save_info(&self, user: &str, form: &ProfileForm) -> Result<PersonalProfile> {
        self.save_info_at(user, form, Local::now().naive_local())
    }

    /// Parse the form, normalize to metric, derive the metrics and append a
    /// new snapshot. Any unparseable field fails before anything is written.
    pub fn save_info_at(
        &self,
        user: &str,
        form: &ProfileForm,
        now: NaiveDateTime,
    ) -> Result<PersonalProfile> {
        let user_id = validate_user_id(user)?;
        let sex: Sex = form.sex.parse()?;
        let birth_date = parse_birth_date(&form.birth_date)?;
        let height_unit: HeightUnit = form.height_unit.parse()?;
        let weight_unit: WeightUnit = form.weight_unit.parse()?;
        let activity_level: ActivityLevel = form.activity_level.parse()?;
        let height = validate_measurement("height", form.height)?;
        let weight = validate_measurement("weight", form.weight)?;

        let height_cm = height_unit.to_cm(height);
        let weight_kg = weight_unit.to_kg(weight);
        let metrics = ProfileMetrics::compute(
            weight_kg,
            height_cm,
            birth_date,
            sex,
            activity_level,
            now.date(),
        );

        self.db.append_profile(&NewProfile {
            recorded_at: now,
            user_id,
            sex,
            birth_date,
            height_cm,
            weight_kg,
            bmi: metrics.bmi,
            bmr: metrics.bmr,
            tdee: metrics.tdee,
            activity_level,
            height_unit,
            weight_unit,
        })
    }

    // --- Intake ---

    /// Record `quantity` units of a catalog food. Each unit is attempted on
    /// its own, so a failure part way through keeps the earlier units.
    pub fn add_food(&self, user: &str, food_name: &str, quantity: u32) -> Result<AddFoodReport> {
        let user = validate_user_id(user)?;
        let mut outcomes = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let outcome = match self.db.append_intake(&user, food_name) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(user = %user, food = %food_name, "intake append failed: {e:#}");
                    IntakeOutcome::failed(food_name, &e)
                }
            };
            outcomes.push(outcome);
        }
        let success = outcomes.iter().all(|o| o.success);
        Ok(AddFoodReport { outcomes, success })
    }

    // --- Catalog ---

    pub fn list_foods(&self) -> Result<Vec<String>> {
        self.db.list_foods()
    }

    pub fn list_catalog(&self) -> Result<Vec<FoodCatalogEntry>> {
        self.db.list_catalog()
    }

    pub fn add_catalog_food(&self, food_name: &str, calories_per_unit: f64) -> Result<FoodCatalogEntry> {
        self.db.upsert_food(food_name, calories_per_unit)
    }

    // --- Chart ---

    pub fn build_rolling_chart(&self, user: &str) -> Result<RollingChart> {
        self.build_rolling_chart_at(user, Local::now().date_naive())
    }

    pub fn build_rolling_chart_at(&self, user: &str, today: NaiveDate) -> Result<RollingChart> {
        let user = validate_user_id(user)?;
        let profiles = self.db.profiles_for_user(&user)?;
        let events = self.db.intake_for_user(&user)?;
        debug!(
            user = %user,
            profiles = profiles.len(),
            events = events.len(),
            "building rolling chart"
        );
        Ok(chart::build_rolling_chart_at(&user, today, &profiles, &events))
    }

    // --- Import ---

    pub fn import_catalog_csv<R: Read>(&self, input: R, dry_run: bool) -> Result<ImportSummary> {
        let rows = flatfile::parse_catalog_csv(input)?;
        flatfile::import_catalog(&self.db, &rows, dry_run)
    }

    pub fn import_profiles_csv<R: Read>(&self, input: R, dry_run: bool) -> Result<ImportSummary> {
        let rows = flatfile::parse_profile_log_csv(input)?;
        flatfile::import_profiles(&self.db, &rows, dry_run)
    }

    pub fn import_intake_csv<R: Read>(&self, input: R, dry_run: bool) -> Result<ImportSummary> {
        let rows = flatfile::parse_intake_log_csv(input)?;
        flatfile::import_intake(&self.db, &rows, dry_run)
    }
}
