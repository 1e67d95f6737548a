//! Incremental-or-reload update of the rendering surface.
//!
//! Each call does exactly one of two things: patch the loaded page through
//! the scripting bridge, or reload the surface with a freshly assembled
//! document. Geometry is applied first and independently of either path.

use tracing::{debug, info};

use crate::document::RenderedDocument;
use crate::settings::RenderSettings;
use crate::surface::{BridgeCall, RenderingSurface, SurfaceConfig};

/// How an update reached the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The loaded page was patched in place.
    Patched,
    /// The surface was reloaded with a new `data:` URI.
    Reloaded(ReloadReason),
}

/// Why the incremental path was not taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// The surface has no scripting bridge yet.
    NoBridge,
    /// The bridge rejected the named event.
    Rejected(String),
}

/// Push the current settings to `surface`.
pub fn dispatch<S>(surface: &mut S, settings: &RenderSettings) -> UpdateOutcome
where
    S: RenderingSurface + ?Sized,
{
    let _scope = crate::perf::scope("dispatch");
    apply_geometry(surface, settings);

    let document = RenderedDocument::render(settings);
    match push_incremental(surface, &document) {
        Ok(()) => {
            debug!(bytes = document.html_fragment.len(), "patched surface in place");
            UpdateOutcome::Patched
        }
        Err(reason) => {
            info!(?reason, "incremental update failed, reloading surface");
            reload(surface, settings, &document);
            UpdateOutcome::Reloaded(reason)
        }
    }
}

/// Surface configuration for a full load of `document`.
pub fn full_load_config(settings: &RenderSettings, document: &RenderedDocument) -> SurfaceConfig {
    SurfaceConfig {
        url: Some(document.assemble().data_uri),
        css: document.resolved_css.clone(),
        width: settings.width,
        height: settings.height,
    }
}

fn apply_geometry<S>(surface: &mut S, settings: &RenderSettings)
where
    S: RenderingSurface + ?Sized,
{
    let requested = (settings.width, settings.height);
    if surface.dimensions() != requested {
        debug!(?requested, current = ?surface.dimensions(), "resizing surface");
        surface.resize(settings.width, settings.height);
    }
}

fn push_incremental<S>(surface: &mut S, document: &RenderedDocument) -> Result<(), ReloadReason>
where
    S: RenderingSurface + ?Sized,
{
    let bridge = surface.bridge().ok_or(ReloadReason::NoBridge)?;
    // Every event is delivered; the first one refused decides the reload.
    let mut rejected = None;
    for call in [
        BridgeCall::set_html(&document.html_fragment),
        BridgeCall::set_css(&document.resolved_css),
    ] {
        if !bridge.call(&call) {
            debug!(event = %call.event_name, "bridge call rejected");
            rejected.get_or_insert(call.event_name);
        }
    }
    rejected.map_or(Ok(()), |event| Err(ReloadReason::Rejected(event)))
}

fn reload<S>(surface: &mut S, settings: &RenderSettings, document: &RenderedDocument)
where
    S: RenderingSurface + ?Sized,
{
    surface.reload(full_load_config(settings, document));
}
