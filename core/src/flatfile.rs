//! Import of the CSV logs written by earlier versions of the tracker:
//! `food_data.csv` (catalog), `personal_info.csv` (profile snapshots) and
//! `cal_rec.csv` (intake events).

use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::StringRecord;

use crate::calculators::{ActivityLevel, Sex};
use crate::db::Database;
use crate::models::{NewIntakeEvent, NewProfile, parse_birth_date, parse_timestamp};
use crate::units::{HeightUnit, WeightUnit};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub food_name: String,
    pub calories_per_unit: f64,
}

/// Summary of what an import would do / did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub rows_parsed: usize,
    pub records_written: usize,
    pub users: usize,
}

struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn read<R: Read>(rdr: &mut csv::Reader<R>, required: &[&str]) -> Result<Self> {
        let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
        for name in required {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                bail!("Missing required column: {name}");
            }
        }
        Ok(Self { headers })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.find(name)
            .with_context(|| format!("Missing '{name}' column"))
    }
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn number(record: &StringRecord, idx: usize, column: &str, row: usize) -> Result<f64> {
    let raw = field(record, idx);
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>()
        .with_context(|| format!("Row {row}: invalid {column} value '{raw}'"))
}

/// Parse a catalog file with a `food,cal` header.
pub fn parse_catalog_csv<R: Read>(input: R) -> Result<Vec<CatalogRow>> {
    let mut rdr = reader(input);
    let cols = Columns::read(&mut rdr, &["food", "cal"])?;
    let idx_food = cols.require("food")?;
    let idx_cal = cols.require("cal")?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let row = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {row}"))?;

        let food_name = field(&record, idx_food);
        if food_name.is_empty() {
            continue;
        }
        let raw_cal = field(&record, idx_cal);
        let calories_per_unit = raw_cal
            .parse::<f64>()
            .with_context(|| format!("Row {row}: invalid cal value '{raw_cal}'"))?;

        rows.push(CatalogRow {
            food_name: food_name.to_string(),
            calories_per_unit,
        });
    }
    Ok(rows)
}

/// Parse a profile log. Height and weight are already metric; the unit
/// columns are optional and default to cm/kg.
pub fn parse_profile_log_csv<R: Read>(input: R) -> Result<Vec<NewProfile>> {
    let mut rdr = reader(input);
    let cols = Columns::read(
        &mut rdr,
        &["time", "name", "sex", "bd", "height", "weight", "activity_level"],
    )?;
    let idx_time = cols.require("time")?;
    let idx_name = cols.require("name")?;
    let idx_sex = cols.require("sex")?;
    let idx_bd = cols.require("bd")?;
    let idx_height = cols.require("height")?;
    let idx_weight = cols.require("weight")?;
    let idx_activity = cols.require("activity_level")?;
    let idx_bmi = cols.find("bmi");
    let idx_bmr = cols.find("bmr");
    let idx_tdee = cols.find("tdee");
    let idx_height_unit = cols.find("height_unit");
    let idx_weight_unit = cols.find("weight_unit");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let row = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {row}"))?;

        let user_id = field(&record, idx_name);
        if user_id.is_empty() {
            continue;
        }

        let optional_number = |idx: Option<usize>, column: &str| -> Result<f64> {
            idx.map_or(Ok(0.0), |i| number(&record, i, column, row))
        };
        let height_unit = match idx_height_unit.map(|i| field(&record, i)) {
            Some(s) if !s.is_empty() => s.parse::<HeightUnit>()?,
            _ => HeightUnit::default(),
        };
        let weight_unit = match idx_weight_unit.map(|i| field(&record, i)) {
            Some(s) if !s.is_empty() => s.parse::<WeightUnit>()?,
            _ => WeightUnit::default(),
        };

        rows.push(NewProfile {
            recorded_at: parse_timestamp(field(&record, idx_time))
                .with_context(|| format!("Row {row}"))?,
            user_id: user_id.to_string(),
            sex: field(&record, idx_sex)
                .parse::<Sex>()
                .with_context(|| format!("Row {row}"))?,
            birth_date: parse_birth_date(field(&record, idx_bd))
                .with_context(|| format!("Row {row}"))?,
            height_cm: number(&record, idx_height, "height", row)?,
            weight_kg: number(&record, idx_weight, "weight", row)?,
            bmi: optional_number(idx_bmi, "bmi")?,
            bmr: optional_number(idx_bmr, "bmr")?,
            tdee: optional_number(idx_tdee, "tdee")?,
            activity_level: field(&record, idx_activity)
                .parse::<ActivityLevel>()
                .with_context(|| format!("Row {row}"))?,
            height_unit,
            weight_unit,
        });
    }
    Ok(rows)
}

/// Parse an intake log with a `time,name,food,cal` header.
pub fn parse_intake_log_csv<R: Read>(input: R) -> Result<Vec<NewIntakeEvent>> {
    let mut rdr = reader(input);
    let cols = Columns::read(&mut rdr, &["time", "name", "food", "cal"])?;
    let idx_time = cols.require("time")?;
    let idx_name = cols.require("name")?;
    let idx_food = cols.require("food")?;
    let idx_cal = cols.require("cal")?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let row = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {row}"))?;

        let user_id = field(&record, idx_name);
        let food_name = field(&record, idx_food);
        if user_id.is_empty() || food_name.is_empty() {
            continue;
        }

        rows.push(NewIntakeEvent {
            recorded_at: parse_timestamp(field(&record, idx_time))
                .with_context(|| format!("Row {row}"))?,
            user_id: user_id.to_string(),
            food_name: food_name.to_string(),
            calories: number(&record, idx_cal, "cal", row)?,
        });
    }
    Ok(rows)
}

/// Upsert catalog rows. When `dry_run` is true, nothing is written.
pub fn import_catalog(db: &Database, rows: &[CatalogRow], dry_run: bool) -> Result<ImportSummary> {
    let mut records_written = 0;
    for row in rows {
        if !dry_run {
            db.upsert_food(&row.food_name, row.calories_per_unit)?;
        }
        records_written += 1;
    }
    Ok(ImportSummary {
        rows_parsed: rows.len(),
        records_written,
        users: 0,
    })
}

/// Append profile snapshots in file order, keeping their stored metrics.
pub fn import_profiles(db: &Database, rows: &[NewProfile], dry_run: bool) -> Result<ImportSummary> {
    let mut users = HashSet::new();
    let mut records_written = 0;
    for row in rows {
        users.insert(row.user_id.as_str());
        if !dry_run {
            db.append_profile(row)?;
        }
        records_written += 1;
    }
    Ok(ImportSummary {
        rows_parsed: rows.len(),
        records_written,
        users: users.len(),
    })
}

/// Append intake events in file order. The calories recorded in the file are
/// kept even when the catalog has since changed or lost the food.
pub fn import_intake(
    db: &Database,
    rows: &[NewIntakeEvent],
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut users = HashSet::new();
    let mut records_written = 0;
    for row in rows {
        users.insert(row.user_id.as_str());
        if !dry_run {
            db.insert_intake_event(row)?;
        }
        records_written += 1;
    }
    Ok(ImportSummary {
        rows_parsed: rows.len(),
        records_written,
        users: users.len(),
    })
}
