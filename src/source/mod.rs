//! A live markdown source instance.
//!
//! [`Source`] is the single update entry point: host settings edits go
//! through [`Source::update`], watcher events through [`Source::pump`] or
//! [`Source::wait_for_changes`]. Both end in one dispatch against the
//! surface. The watcher thread only reports file content and asks the host
//! for an update pass through the callback given to [`Source::create`];
//! this type owns every settings mutation.

use std::time::Duration;

use tracing::{debug, info};

use crate::dispatch::{UpdateOutcome, dispatch, full_load_config};
use crate::document::RenderedDocument;
use crate::error::Result;
use crate::settings::{RenderSettings, SettingsStore};
use crate::surface::{RenderingSurface, SurfaceConfig};
use crate::watcher::{FileWatcher, WatchEvent};

pub struct Source<S: RenderingSurface> {
    // Declared first so it is stopped and joined before anything else drops.
    watcher: FileWatcher,
    settings: RenderSettings,
    surface: Option<S>,
}

impl<S: RenderingSurface> Source<S> {
    /// Seed defaults, build the surface with the initial document and start
    /// watching any configured files.
    ///
    /// `request_update` is called from the watcher thread each time a file
    /// change is queued. The host answers it by calling [`Source::pump`] on
    /// its own thread.
    ///
    /// # Errors
    /// Returns an error if the watcher thread cannot be started.
    pub fn create(
        store: &mut dyn SettingsStore,
        make_surface: impl FnOnce(SurfaceConfig) -> S,
        request_update: impl Fn() + Send + 'static,
    ) -> Result<Self> {
        RenderSettings::write_defaults(store);
        let settings = RenderSettings::from_store(store);
        let document = RenderedDocument::render(&settings);
        let surface = make_surface(full_load_config(&settings, &document));
        let watcher = FileWatcher::spawn(settings.watch_config(), request_update)?;
        info!(
            width = settings.width,
            height = settings.height,
            "markdown source created"
        );
        Ok(Self {
            watcher,
            settings,
            surface: Some(surface),
        })
    }

    /// Re-read the store and push the result.
    ///
    /// Returns `None` when there is no surface to update.
    pub fn update(&mut self, store: &dyn SettingsStore) -> Option<UpdateOutcome> {
        let mut next = RenderSettings::from_store(store);
        next.carry_file_contents(&self.settings);
        let watch = next.watch_config();
        if watch != self.settings.watch_config() {
            debug!(?watch, "reconfiguring file watcher");
            self.watcher.configure(watch);
        }
        self.settings = next;
        self.dispatch()
    }

    /// Apply any pending watcher events without blocking.
    pub fn pump(&mut self) -> Option<UpdateOutcome> {
        let mut changed = false;
        while let Some(event) = self.watcher.try_next() {
            changed |= self.apply_event(&event);
        }
        if changed { self.dispatch() } else { None }
    }

    /// Block up to `timeout` for a watcher event, then apply everything
    /// pending.
    pub fn wait_for_changes(&mut self, timeout: Duration) -> Option<UpdateOutcome> {
        let event = self.watcher.next_timeout(timeout)?;
        let mut changed = self.apply_event(&event);
        while let Some(event) = self.watcher.try_next() {
            changed |= self.apply_event(&event);
        }
        if changed { self.dispatch() } else { None }
    }

    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn width(&self) -> u32 {
        self.surface.as_ref().map_or(0, |s| s.dimensions().0)
    }

    pub fn height(&self) -> u32 {
        self.surface.as_ref().map_or(0, |s| s.dimensions().1)
    }

    /// The surface, for hosts enumerating active children.
    pub const fn active_child(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn active_child_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Release the surface after the host removed it.
    pub fn surface_removed(&mut self) -> Option<S> {
        debug!("surface removed");
        self.surface.take()
    }

    fn apply_event(&mut self, event: &WatchEvent) -> bool {
        let mut changed = false;
        for change in &event.changes {
            if self.settings.apply_change(change) {
                changed = true;
            } else {
                debug!(path = %change.path.display(), "ignoring stale file change");
            }
        }
        changed
    }

    fn dispatch(&mut self) -> Option<UpdateOutcome> {
        let Some(surface) = self.surface.as_mut() else {
            debug!("no surface, skipping update");
            return None;
        };
        Some(dispatch(surface, &self.settings))
    }
}
