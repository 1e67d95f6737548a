use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::settings::{
    CSS_SOURCE_COLORS, CSS_SOURCE_FILE, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND,
    MARKDOWN_SOURCE_FILE, SettingsStore, keys,
};
use crate::style::Rgba;

/// Flags that can be given on the command line or saved as defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub perf: bool,
    pub data_uri: bool,
    pub css: Option<PathBuf>,
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub font_family: Option<String>,
    pub font_style: Option<String>,
    pub font_size: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub interval: Option<u64>,
}

/// Flags that take a value, as `--flag value` or `--flag=value`.
const VALUE_FLAGS: &[&str] = &[
    "--css",
    "--background",
    "--foreground",
    "--font-family",
    "--font-style",
    "--font-size",
    "--width",
    "--height",
    "--interval",
];

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            perf: self.perf || other.perf,
            data_uri: self.data_uri || other.data_uri,
            css: other.css.clone().or_else(|| self.css.clone()),
            background: other.background.clone().or_else(|| self.background.clone()),
            foreground: other.foreground.clone().or_else(|| self.foreground.clone()),
            font_family: other.font_family.clone().or_else(|| self.font_family.clone()),
            font_style: other.font_style.clone().or_else(|| self.font_style.clone()),
            font_size: other.font_size.or(self.font_size),
            width: other.width.or(self.width),
            height: other.height.or(self.height),
            interval: other.interval.or(self.interval),
        }
    }

    /// Whether any colour or font flag asks for generated CSS.
    pub const fn wants_generated_css(&self) -> bool {
        self.background.is_some()
            || self.foreground.is_some()
            || self.font_family.is_some()
            || self.font_size.is_some()
    }

    /// Write these flags into a settings store for `markdown_path`.
    ///
    /// A CSS file wins over colour flags. Colours that don't parse are
    /// ignored in favour of the defaults.
    pub fn apply_to_store(&self, store: &mut dyn SettingsStore, markdown_path: &Path) {
        store.set(keys::MARKDOWN_SOURCE, Value::from(MARKDOWN_SOURCE_FILE));
        store.set(
            keys::MARKDOWN_PATH,
            Value::from(markdown_path.to_string_lossy().as_ref()),
        );

        if let Some(css) = &self.css {
            store.set(keys::CSS_SOURCE, Value::from(CSS_SOURCE_FILE));
            store.set(keys::CSS_PATH, Value::from(css.to_string_lossy().as_ref()));
        } else if self.wants_generated_css() {
            store.set(keys::CSS_SOURCE, Value::from(CSS_SOURCE_COLORS));
            store.set(
                keys::BACKGROUND_COLOR,
                Value::from(packed_or(self.background.as_deref(), DEFAULT_BACKGROUND)),
            );
            store.set(
                keys::FOREGROUND_COLOR,
                Value::from(packed_or(self.foreground.as_deref(), DEFAULT_FOREGROUND)),
            );
            if self.font_family.is_some() || self.font_size.is_some() {
                store.set(
                    keys::FONT,
                    json!({
                        "face": self.font_family.clone().unwrap_or_default(),
                        "style": self.font_style.clone().unwrap_or_else(|| "Regular".to_string()),
                        "size": self.font_size.unwrap_or(16),
                    }),
                );
            }
        }

        if let Some(width) = self.width {
            store.set(keys::WIDTH, Value::from(width));
        }
        if let Some(height) = self.height {
            store.set(keys::HEIGHT, Value::from(height));
        }
        if let Some(interval) = self.interval {
            store.set(keys::POLL_INTERVAL, Value::from(interval));
        }
    }

    fn set_value(&mut self, flag: &str, value: &str) {
        match flag {
            "--css" => self.css = Some(PathBuf::from(value)),
            "--background" => self.background = Some(value.to_string()),
            "--foreground" => self.foreground = Some(value.to_string()),
            "--font-family" => self.font_family = Some(value.to_string()),
            "--font-style" => self.font_style = Some(value.to_string()),
            "--font-size" => self.font_size = value.parse().ok(),
            "--width" => self.width = value.parse().ok(),
            "--height" => self.height = value.parse().ok(),
            "--interval" => self.interval = value.parse().ok(),
            _ => {}
        }
    }
}

fn packed_or(hex: Option<&str>, default: u32) -> u32 {
    let Some(hex) = hex else {
        return default;
    };
    Rgba::parse_hex(hex).map_or_else(
        || {
            tracing::warn!(color = hex, "ignoring unparseable colour");
            default
        },
        Rgba::to_packed,
    )
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("mdsource").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("mdsource")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("mdsource").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("mdsource")
                .join("config");
        }
    }

    PathBuf::from(".mdsourcerc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".mdsourcerc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(config_line_tokens)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// A value flag owns the rest of its line, so saved paths and font names
/// may contain spaces. Other lines are plain switches.
fn config_line_tokens(line: &str) -> Vec<String> {
    let end = line
        .find(|c: char| c == '=' || c.is_whitespace())
        .unwrap_or(line.len());
    let (flag, rest) = line.split_at(end);
    if !VALUE_FLAGS.contains(&flag) {
        return line.split_whitespace().map(ToOwned::to_owned).collect();
    }
    let value = rest.strip_prefix('=').unwrap_or(rest).trim();
    if value.is_empty() {
        return Vec::new();
    }
    vec![flag.to_string(), value.to_string()]
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# mdsource defaults (saved with --save)".to_string());
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if flags.data_uri {
        lines.push("--data-uri".to_string());
    }
    if let Some(css) = &flags.css {
        lines.push(format!("--css {}", css.display()));
    }
    let values = [
        ("--background", flags.background.clone()),
        ("--foreground", flags.foreground.clone()),
        ("--font-family", flags.font_family.clone()),
        ("--font-style", flags.font_style.clone()),
        ("--font-size", flags.font_size.map(|v| v.to_string())),
        ("--width", flags.width.map(|v| v.to_string())),
        ("--height", flags.height.map(|v| v.to_string())),
        ("--interval", flags.interval.map(|v| v.to_string())),
    ];
    for (flag, value) in values {
        if let Some(value) = value {
            lines.push(format!("{flag}={value}"));
        }
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--watch" | "-w" => flags.watch = true,
            "--perf" => flags.perf = true,
            "--data-uri" => flags.data_uri = true,
            _ => {
                if let Some((flag, value)) = token.split_once('=') {
                    if VALUE_FLAGS.contains(&flag) {
                        flags.set_value(flag, value);
                    }
                } else if VALUE_FLAGS.contains(&token)
                    && let Some(next) = tokens.get(i + 1)
                {
                    flags.set_value(token, next);
                    i += 1;
                }
            }
        }
        i += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryStore, RenderSettings, StyleInput};
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "mdsource".to_string(),
            "--watch".to_string(),
            "--css".to_string(),
            "theme.css".to_string(),
            "--width=1280".to_string(),
            "--interval".to_string(),
            "250".to_string(),
            "README.md".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert_eq!(flags.css, Some(PathBuf::from("theme.css")));
        assert_eq!(flags.width, Some(1280));
        assert_eq!(flags.interval, Some(250));
        assert_eq!(flags.height, None);
    }

    #[test]
    fn test_bad_numbers_are_dropped() {
        let args = vec!["--width=wide".to_string(), "--font-size".to_string(), "-3".to_string()];
        let flags = parse_flag_tokens(&args);
        assert_eq!(flags.width, None);
        assert_eq!(flags.font_size, None);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            background: Some("#000000".to_string()),
            width: Some(640),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            background: Some("#ffffff".to_string()),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.perf);
        assert_eq!(merged.background.as_deref(), Some("#ffffff"));
        assert_eq!(merged.width, Some(640));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config");
        let flags = ConfigFlags {
            watch: true,
            perf: true,
            data_uri: true,
            css: Some(PathBuf::from("style.css")),
            background: Some("#102030".to_string()),
            foreground: Some("#ffffffff".to_string()),
            font_family: Some("Inter".to_string()),
            font_style: Some("Italic".to_string()),
            font_size: Some(28),
            width: Some(1920),
            height: Some(1080),
            interval: Some(500),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_saved_values_with_spaces_load_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        let flags = ConfigFlags {
            watch: true,
            css: Some(PathBuf::from("my theme.css")),
            font_family: Some("Fira Sans".to_string()),
            font_style: Some("Bold Italic".to_string()),
            ..ConfigFlags::default()
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);
    }

    #[test]
    fn test_hand_written_config_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".mdsourcerc");
        std::fs::write(
            &path,
            "# defaults\n--watch --perf\n--css   dark mode.css  \n--font-family=Source Code Pro\n--width\n",
        )
        .unwrap();

        let flags = load_config_flags(&path).unwrap();
        assert!(flags.watch);
        assert!(flags.perf);
        assert_eq!(flags.css, Some(PathBuf::from("dark mode.css")));
        assert_eq!(flags.font_family.as_deref(), Some("Source Code Pro"));
        assert_eq!(flags.width, None);
    }

    #[test]
    fn test_apply_to_store_prefers_css_file() {
        let flags = ConfigFlags {
            css: Some(PathBuf::from("a.css")),
            background: Some("#ff0000".to_string()),
            ..ConfigFlags::default()
        };
        let mut store = MemoryStore::new();
        flags.apply_to_store(&mut store, Path::new("doc.md"));
        let settings = RenderSettings::from_store(&store);
        assert_eq!(
            settings.markdown.file_path(),
            Some(Path::new("doc.md"))
        );
        assert_eq!(settings.style.file_path(), Some(Path::new("a.css")));
    }

    #[test]
    fn test_apply_to_store_generates_colors() {
        let flags = ConfigFlags {
            background: Some("#0a141e".to_string()),
            foreground: Some("not-a-colour".to_string()),
            font_family: Some("Inter".to_string()),
            ..ConfigFlags::default()
        };
        let mut store = MemoryStore::new();
        flags.apply_to_store(&mut store, Path::new("doc.md"));
        let StyleInput::Colors {
            background,
            foreground,
            font,
        } = RenderSettings::from_store(&store).style
        else {
            panic!("expected generated css");
        };
        assert_eq!(background, Rgba::new(10, 20, 30, 255));
        assert_eq!(foreground, Rgba::from_packed(DEFAULT_FOREGROUND));
        let font = font.unwrap();
        assert_eq!(font.face, "Inter");
        assert_eq!(font.size, 16);
    }
}
