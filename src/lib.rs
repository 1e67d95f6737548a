// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. watcher::WatchConfig)
    clippy::module_name_repetitions
)]

//! # mdsource
//!
//! A live markdown preview source for an embedded web surface.
//!
//! mdsource renders markdown (inline text or a watched file) to HTML, styles
//! it from inline CSS, a watched CSS file or generated colours, and keeps a
//! web surface in sync:
//! - Incremental updates through the surface's scripting bridge
//! - Full reloads with a base64 `data:` URI when patching is not possible
//! - Polling file watcher for live reload of markdown and CSS files
//!
//! ## Architecture
//!
//! Settings flow one way:
//! - **Settings**: typed snapshot read from the host's store
//! - **Watcher**: background thread reporting file content as messages
//! - **Source**: owns the settings and is the only update entry point
//! - **Dispatch**: patch or reload, exactly one per update
//!
//! ## Modules
//!
//! - [`source`]: Source instance and host lifecycle
//! - [`dispatch`]: Incremental-or-reload update
//! - [`document`]: Markdown conversion and page assembly
//! - [`style`]: CSS resolution
//! - [`encode`]: Base64 `data:` URIs
//! - [`settings`]: Settings store boundary
//! - [`surface`]: Rendering surface boundary
//! - [`watcher`]: File polling

pub mod config;
pub mod dispatch;
pub mod document;
pub mod encode;
pub mod error;
pub mod perf;
pub mod settings;
pub mod source;
pub mod style;
pub mod surface;
pub mod watcher;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispatch::{ReloadReason, UpdateOutcome};
    pub use crate::document::RenderedDocument;
    pub use crate::settings::{MemoryStore, RenderSettings, SettingsStore};
    pub use crate::source::Source;
    pub use crate::surface::{RenderingSurface, ScriptBridge, SurfaceConfig};
}
