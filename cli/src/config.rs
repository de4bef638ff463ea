use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "BODYLEDGER_DATA_DIR";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory (`--data-dir`, then `BODYLEDGER_DATA_DIR`,
    /// then the platform data dir) and make sure it exists.
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let env_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        let data_dir = match resolve_data_dir(data_dir_override, env_dir) {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "bodyledger")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::in_dir(&data_dir)
    }

    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("bodyledger.db"),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        tracing::info!(path = %path.display(), "generated new API key");
        Ok((key, true))
    }
}

fn resolve_data_dir(flag: Option<PathBuf>, env: Option<PathBuf>) -> Option<PathBuf> {
    flag.or(env.filter(|p| !p.as_os_str().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_beats_env() {
        let dir = resolve_data_dir(Some("/flag".into()), Some("/env".into()));
        assert_eq!(dir, Some(PathBuf::from("/flag")));
    }

    #[test]
    fn test_env_used_when_no_flag() {
        assert_eq!(
            resolve_data_dir(None, Some("/env".into())),
            Some(PathBuf::from("/env"))
        );
        assert_eq!(resolve_data_dir(None, Some(PathBuf::new())), None);
        assert_eq!(resolve_data_dir(None, None), None);
    }

    #[test]
    fn test_in_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let config = Config::in_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(config.db_path, nested.join("bodyledger.db"));
    }

    #[test]
    fn test_api_key_generated_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();

        let (key, created) = config.load_or_create_api_key().unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);

        let (again, created) = config.load_or_create_api_key().unwrap();
        assert!(!created);
        assert_eq!(again, key);
    }
}
