use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

const RC_ENV_VAR: &str = "HABITRC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HabitSort {
    Created,
    Alphabetical,
}

#[derive(Debug, Clone)]
pub struct Config {
    map: BTreeMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        for (key, value) in [
            ("data.location", "~/.habits"),
            ("default.command", "week"),
            ("color", "on"),
            ("show.streaks", "on"),
            ("habit.sort", "created"),
        ] {
            map.insert(key.to_string(), value.to_string());
        }

        Self {
            map,
            loaded_files: vec![],
        }
    }
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        if let Some(path) = resolve_rc_path(rc_override)? {
            info!(habitrc = %path.display(), "loading habitrc");
            cfg.load_file(&path)?;
        } else {
            debug!("no habitrc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    pub fn show_streaks(&self) -> bool {
        self.get_bool("show.streaks").unwrap_or(true)
    }

    pub fn habit_sort(&self) -> anyhow::Result<HabitSort> {
        let raw = self.get("habit.sort").unwrap_or_default();
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "created" | "datecreated" => Ok(HabitSort::Created),
            "alphabetical" | "name" => Ok(HabitSort::Alphabetical),
            other => Err(anyhow!("invalid habit.sort setting: {other}")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }
            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if self.loaded_files.contains(&include_path) {
                    warn!(include = %include_path.display(), "include cycle detected; skipping");
                } else if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var(RC_ENV_VAR) {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".habitrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".habits"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let expanded = expand_tilde(Path::new(include));
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{Config, HabitSort};

    #[test]
    fn loads_file_with_includes_and_overrides() {
        let temp = tempdir().expect("tempdir");
        let extra = temp.path().join("extra.rc");
        fs::write(&extra, "habit.sort = alphabetical\n").expect("write include");

        let rc = temp.path().join("habitrc");
        fs::write(
            &rc,
            "# habit settings\nshow.streaks = off # hidden\ninclude extra.rc\ntimezone=Europe/Berlin\n",
        )
        .expect("write rc");

        let mut cfg = Config::load(Some(&rc)).expect("load config");
        assert!(!cfg.show_streaks());
        assert_eq!(cfg.habit_sort().expect("sort"), HabitSort::Alphabetical);
        assert_eq!(cfg.get("timezone").as_deref(), Some("Europe/Berlin"));
        assert_eq!(cfg.loaded_files.len(), 2);

        cfg.apply_overrides([("rc.show.streaks".to_string(), "yes".to_string())]);
        assert!(cfg.show_streaks());
    }

    #[test]
    fn rejects_lines_without_equals() {
        let temp = tempdir().expect("tempdir");
        let rc = temp.path().join("habitrc");
        fs::write(&rc, "color on\n").expect("write rc");

        let err = Config::load(Some(&rc)).expect_err("invalid line should fail");
        assert!(err.to_string().contains("invalid config line"));
    }

    #[test]
    fn defaults_are_present() {
        let cfg = Config::default();
        assert_eq!(cfg.get("default.command").as_deref(), Some("week"));
        assert!(cfg.show_streaks());
        assert_eq!(cfg.habit_sort().expect("sort"), HabitSort::Created);
    }
}
