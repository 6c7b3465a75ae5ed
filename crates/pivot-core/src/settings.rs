use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::KeyLayout;
use crate::schema::SchemaKind;

/// File name of the exported pivot inside the output directory.
pub const OUTPUT_FILE_NAME: &str = "monthly_stats.xlsx";

/// Sub-directory of the output directory holding one CSV per stored month.
pub const RESULTS_DIR_NAME: &str = "results";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Monthly enrollment counts accumulated into an annual pivot table
#[derive(Parser, Debug, Clone)]
#[command(
    name = "enrollment-pivot",
    about = "Monthly enrollment counts accumulated into an annual pivot table",
    version
)]
pub struct Settings {
    /// Run mode
    #[arg(long, default_value = "batch", value_parser = ["batch", "session", "view"])]
    pub mode: String,

    /// Directory holding the dated input workbooks
    #[arg(long, default_value = "lists")]
    pub input_dir: PathBuf,

    /// Directory receiving stored months and the exported pivot
    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Input schema variant
    #[arg(long, value_enum, default_value_t = SchemaKind::Ledger)]
    pub schema: SchemaKind,

    /// Add school, department and gender to the group key
    #[arg(long)]
    pub extended_keys: bool,

    /// Viewer theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.enrollment-pivot/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_keys: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".enrollment-pivot").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; 'mode' is never loaded from last-used.
        if !is_arg_explicitly_set(&matches, "input_dir") {
            if let Some(v) = last.input_dir {
                settings.input_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "schema") {
            if let Some(v) = last.schema {
                settings.schema = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "extended_keys") {
            if let Some(v) = last.extended_keys {
                settings.extended_keys = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used params");
        }

        Self::apply_debug(settings)
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    pub fn key_layout(&self) -> KeyLayout {
        if self.extended_keys {
            KeyLayout::Extended
        } else {
            KeyLayout::Standard
        }
    }

    /// Directory of stored monthly snapshots.
    pub fn results_dir(&self) -> PathBuf {
        self.output_dir.join(RESULTS_DIR_NAME)
    }

    /// Path of the exported pivot workbook.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            input_dir: Some(s.input_dir.clone()),
            output_dir: Some(s.output_dir.clone()),
            schema: Some(s.schema),
            extended_keys: Some(s.extended_keys),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["enrollment-pivot"]);

        assert_eq!(settings.mode, "batch");
        assert_eq!(settings.input_dir, PathBuf::from("lists"));
        assert_eq!(settings.output_dir, PathBuf::from("outputs"));
        assert_eq!(settings.schema, SchemaKind::Ledger);
        assert!(!settings.extended_keys);
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_derived_paths() {
        let settings = Settings::parse_from(["enrollment-pivot", "--output-dir", "/tmp/out"]);
        assert_eq!(settings.results_dir(), PathBuf::from("/tmp/out/results"));
        assert_eq!(
            settings.output_file(),
            PathBuf::from("/tmp/out/monthly_stats.xlsx")
        );
        assert_eq!(settings.key_layout(), KeyLayout::Standard);
    }

    #[test]
    fn test_schema_flag_parses_kebab_case() {
        let settings = Settings::parse_from(["enrollment-pivot", "--schema", "event-log"]);
        assert_eq!(settings.schema, SchemaKind::EventLog);
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let params = LastUsedParams {
            input_dir: Some(PathBuf::from("/data/lists")),
            schema: Some(SchemaKind::EventLog),
            extended_keys: Some(true),
            ..Default::default()
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.input_dir, Some(PathBuf::from("/data/lists")));
        assert_eq!(loaded.schema, Some(SchemaKind::EventLog));
        assert_eq!(loaded.extended_keys, Some(true));
        assert!(loaded.output_dir.is_none());
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&LastUsedParams::config_path_in(tmp.path()));
        assert!(loaded.input_dir.is_none());
        assert!(loaded.schema.is_none());
    }

    #[test]
    fn test_last_used_fills_unset_args() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            input_dir: Some(PathBuf::from("/saved/lists")),
            output_dir: Some(PathBuf::from("/saved/out")),
            schema: Some(SchemaKind::EventLog),
            extended_keys: Some(true),
            theme: Some("dark".to_string()),
        }
        .save_to(&path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["enrollment-pivot", "--output-dir", "/cli/out"]),
            &path,
        );

        assert_eq!(settings.input_dir, PathBuf::from("/saved/lists"));
        assert_eq!(settings.output_dir, PathBuf::from("/cli/out"));
        assert_eq!(settings.schema, SchemaKind::EventLog);
        assert!(settings.extended_keys);
        assert_eq!(settings.theme, "dark");

        let persisted = LastUsedParams::load_from(&path);
        assert_eq!(persisted.output_dir, Some(PathBuf::from("/cli/out")));
    }

    #[test]
    fn test_clear_removes_file_and_ignores_saved_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            input_dir: Some(PathBuf::from("/saved/lists")),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["enrollment-pivot", "--clear"]), &path);

        assert!(!path.exists(), "file must be gone after --clear");
        assert_eq!(settings.input_dir, PathBuf::from("lists"));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let settings =
            Settings::load_with_last_used_impl(args(&["enrollment-pivot", "--debug"]), &path);
        assert_eq!(settings.log_level, "DEBUG");
    }
}
