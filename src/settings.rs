//! Settings store boundary and the typed view the render path works from.
//!
//! The host owns the store. Every field is optional and anything absent or
//! malformed falls back to a default, so loading never fails.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::style::{FontDescriptor, Rgba};
use crate::watcher::{FileChange, WatchConfig, WatchTarget};

/// Field names used in the settings store.
pub mod keys {
    pub const TEXT: &str = "text";
    pub const CSS: &str = "css";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const MARKDOWN_SOURCE: &str = "markdown_source";
    pub const MARKDOWN_PATH: &str = "markdown_path";
    pub const CSS_SOURCE: &str = "css_source";
    pub const CSS_PATH: &str = "css_path";
    pub const BACKGROUND_COLOR: &str = "bg_color";
    pub const FOREGROUND_COLOR: &str = "fg_color";
    pub const FONT: &str = "font";
    pub const POLL_INTERVAL: &str = "poll_interval";
}

/// `markdown_source` value selecting inline text.
pub const MARKDOWN_SOURCE_TEXT: i64 = 0;
/// `markdown_source` value selecting a markdown file.
pub const MARKDOWN_SOURCE_FILE: i64 = 1;
/// `css_source` value selecting inline CSS.
pub const CSS_SOURCE_TEXT: i64 = 0;
/// `css_source` value selecting a CSS file.
pub const CSS_SOURCE_FILE: i64 = 1;
/// `css_source` value selecting CSS generated from colours and font.
pub const CSS_SOURCE_COLORS: i64 = 2;

pub const DEFAULT_CSS: &str = "body { \n\tbackground-color: rgba(0, 0, 0, 0); \n\tmargin: 0px 0px; \n\toverflow: hidden; \n}";
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
/// Largest width or height a surface may be asked for.
pub const MAX_DIMENSION: u32 = 8192;
pub const DEFAULT_BACKGROUND: u32 = 0x0000_0000;
pub const DEFAULT_FOREGROUND: u32 = 0xffff_ffff;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Key/value settings storage owned by the host.
///
/// Implementations are expected to serialise their own access; the crate
/// never shares a store between threads.
pub trait SettingsStore {
    /// Current value for `key`, falling back to its default if one was set.
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value);

    /// Register the value returned by [`SettingsStore::get`] when `key` has
    /// no explicit value.
    fn set_default(&mut self, key: &str, value: Value);

    fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_owned))
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }
}

/// In-memory store with a separate default layer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryStore {
    values: Map<String, Value>,
    defaults: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`SettingsStore::set`].
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .get(key)
            .or_else(|| self.defaults.get(key))
            .cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn set_default(&mut self, key: &str, value: Value) {
        self.defaults.insert(key.to_string(), value);
    }
}

/// Where the markdown comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownInput {
    Text(String),
    /// Content of a watched file; `text` holds the last delivered content.
    File { path: PathBuf, text: Option<String> },
}

impl MarkdownInput {
    /// Markdown to render right now. An unread file renders as empty.
    pub fn source(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::File { text, .. } => text.as_deref().unwrap_or_default(),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::Text(_) => None,
            Self::File { path, .. } => Some(path),
        }
    }
}

/// Where the stylesheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleInput {
    Css(String),
    /// Content of a watched file; `css` holds the last delivered content.
    CssFile { path: PathBuf, css: Option<String> },
    Colors {
        background: Rgba,
        foreground: Rgba,
        font: Option<FontDescriptor>,
    },
}

impl StyleInput {
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::CssFile { path, .. } => Some(path),
            Self::Css(_) | Self::Colors { .. } => None,
        }
    }
}

/// Typed snapshot of the settings a render needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub markdown: MarkdownInput,
    pub style: StyleInput,
    pub width: u32,
    pub height: u32,
    pub poll_interval: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            markdown: MarkdownInput::Text(String::new()),
            style: StyleInput::Css(DEFAULT_CSS.to_string()),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RenderSettings {
    /// Seed the store's default layer.
    pub fn write_defaults(store: &mut dyn SettingsStore) {
        store.set_default(keys::CSS, Value::from(DEFAULT_CSS));
        store.set_default(keys::WIDTH, Value::from(DEFAULT_WIDTH));
        store.set_default(keys::HEIGHT, Value::from(DEFAULT_HEIGHT));
        store.set_default(keys::MARKDOWN_SOURCE, Value::from(MARKDOWN_SOURCE_TEXT));
        store.set_default(keys::CSS_SOURCE, Value::from(CSS_SOURCE_TEXT));
        store.set_default(keys::BACKGROUND_COLOR, Value::from(DEFAULT_BACKGROUND));
        store.set_default(keys::FOREGROUND_COLOR, Value::from(DEFAULT_FOREGROUND));
        store.set_default(
            keys::POLL_INTERVAL,
            Value::from(u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(1000)),
        );
    }

    /// Read a snapshot from the store. File-backed inputs start unread.
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        let markdown = match store.get_int(keys::MARKDOWN_SOURCE) {
            Some(MARKDOWN_SOURCE_FILE) => MarkdownInput::File {
                path: PathBuf::from(store.get_str(keys::MARKDOWN_PATH).unwrap_or_default()),
                text: None,
            },
            _ => MarkdownInput::Text(store.get_str(keys::TEXT).unwrap_or_default()),
        };

        let style = match store.get_int(keys::CSS_SOURCE) {
            Some(CSS_SOURCE_FILE) => StyleInput::CssFile {
                path: PathBuf::from(store.get_str(keys::CSS_PATH).unwrap_or_default()),
                css: None,
            },
            Some(CSS_SOURCE_COLORS) => StyleInput::Colors {
                background: packed_color(store, keys::BACKGROUND_COLOR, DEFAULT_BACKGROUND),
                foreground: packed_color(store, keys::FOREGROUND_COLOR, DEFAULT_FOREGROUND),
                font: store
                    .get(keys::FONT)
                    .and_then(|value| serde_json::from_value(value).ok()),
            },
            _ => StyleInput::Css(store.get_str(keys::CSS).unwrap_or_default()),
        };

        Self {
            markdown,
            style,
            width: dimension(store, keys::WIDTH).unwrap_or(DEFAULT_WIDTH),
            height: dimension(store, keys::HEIGHT).unwrap_or(DEFAULT_HEIGHT),
            poll_interval: positive_u32(store, keys::POLL_INTERVAL)
                .map_or(DEFAULT_POLL_INTERVAL, |ms| Duration::from_millis(u64::from(ms))),
        }
    }

    /// Keep file content already delivered for paths that did not change.
    pub fn carry_file_contents(&mut self, previous: &Self) {
        if let (
            MarkdownInput::File { path, text },
            MarkdownInput::File {
                path: prev_path,
                text: prev_text,
            },
        ) = (&mut self.markdown, &previous.markdown)
            && *path == *prev_path
        {
            text.clone_from(prev_text);
        }

        if let (
            StyleInput::CssFile { path, css },
            StyleInput::CssFile {
                path: prev_path,
                css: prev_css,
            },
        ) = (&mut self.style, &previous.style)
            && *path == *prev_path
        {
            css.clone_from(prev_css);
        }
    }

    /// Files the watcher should poll for these settings.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            markdown_path: non_empty(self.markdown.file_path()),
            css_path: non_empty(self.style.file_path()),
            interval: self.poll_interval,
        }
    }

    /// Store content reported by the watcher.
    ///
    /// Returns false when the change no longer applies (the input moved off
    /// that file since the watcher saw it) or the content is already current.
    pub fn apply_change(&mut self, change: &FileChange) -> bool {
        let slot = match (change.target, &mut self.markdown, &mut self.style) {
            (WatchTarget::Markdown, MarkdownInput::File { path, text }, _)
            | (WatchTarget::Css, _, StyleInput::CssFile { path, css: text }) => {
                if *path != change.path {
                    return false;
                }
                text
            }
            _ => return false,
        };
        if slot.as_deref() == Some(change.content.as_str()) {
            return false;
        }
        *slot = Some(change.content.clone());
        true
    }
}

fn packed_color(store: &dyn SettingsStore, key: &str, default: u32) -> Rgba {
    let packed = store
        .get_int(key)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default);
    Rgba::from_packed(packed)
}

fn positive_u32(store: &dyn SettingsStore, key: &str) -> Option<u32> {
    store
        .get_int(key)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

fn dimension(store: &dyn SettingsStore, key: &str) -> Option<u32> {
    positive_u32(store, key).map(|v| v.min(MAX_DIMENSION))
}

fn non_empty(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
