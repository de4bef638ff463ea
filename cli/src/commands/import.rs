use std::path::Path;

use anyhow::{Context, Result};

use bodyledger_core::service::HealthService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportKind {
    Catalog,
    Profiles,
    Intake,
}

impl ImportKind {
    fn noun(self) -> &'static str {
        match self {
            ImportKind::Catalog => "foods",
            ImportKind::Profiles => "profiles",
            ImportKind::Intake => "intake events",
        }
    }
}

pub(crate) fn cmd_import(
    svc: &HealthService,
    kind: ImportKind,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let summary = match kind {
        ImportKind::Catalog => svc.import_catalog_csv(file, dry_run)?,
        ImportKind::Profiles => svc.import_profiles_csv(file, dry_run)?,
        ImportKind::Intake => svc.import_intake_csv(file, dry_run)?,
    };

    if summary.rows_parsed == 0 {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "No rows found in CSV file" })
            );
        } else {
            eprintln!("No rows found in CSV file.");
        }
        return Ok(());
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dry_run": dry_run,
                "rows_parsed": summary.rows_parsed,
                "records_written": summary.records_written,
                "users": summary.users,
            })
        );
    } else {
        if dry_run {
            println!("Dry run, no changes made.\n");
        } else {
            println!("Import complete.\n");
        }
        println!("  Rows parsed:   {}", summary.rows_parsed);
        println!("  {:<14} {}", format!("{}:", capitalize(kind.noun())), summary.records_written);
        if kind != ImportKind::Catalog {
            println!("  Users:         {}", summary.users);
        }
    }

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().collect::<String>() + chars.as_str())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("intake events"), "Intake events");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_cmd_import_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food_data.csv");
        std::fs::write(&path, "food,cal\nApple,95\nPear,101\n").unwrap();

        let svc = HealthService::new_in_memory().unwrap();
        cmd_import(&svc, ImportKind::Catalog, &path, false, true).unwrap();
        assert_eq!(svc.list_foods().unwrap(), vec!["Apple", "Pear"]);
    }

    #[test]
    fn test_cmd_import_missing_file() {
        let svc = HealthService::new_in_memory().unwrap();
        let err = cmd_import(
            &svc,
            ImportKind::Intake,
            Path::new("/nonexistent/cal_rec.csv"),
            true,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to open file"));
    }
}
