//! Boundary to the embedded web surface that displays the preview.
//!
//! The surface itself lives outside this crate. It takes a configuration
//! payload for full loads and may expose a scripting bridge for patching an
//! already loaded page.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{SET_CSS_EVENT, SET_HTML_EVENT};
use crate::encode::decode_data_uri;
use crate::error::Result;

/// Creation/reload payload for a surface.
///
/// `url` is left unset when only geometry changes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub css: String,
    pub width: u32,
    pub height: u32,
}

/// A named event dispatched into the loaded page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCall {
    pub event_name: String,
    pub json_string: String,
}

impl BridgeCall {
    pub fn set_html(html: &str) -> Self {
        Self {
            event_name: SET_HTML_EVENT.to_string(),
            json_string: serde_json::json!({ "html": html }).to_string(),
        }
    }

    pub fn set_css(css: &str) -> Self {
        Self {
            event_name: SET_CSS_EVENT.to_string(),
            json_string: serde_json::json!({ "css": css }).to_string(),
        }
    }
}

/// Programmatic call path into the loaded page.
///
/// Implementations must fail fast rather than block.
pub trait ScriptBridge {
    /// Deliver `call`; returns false if the page did not accept it.
    fn call(&mut self, call: &BridgeCall) -> bool;
}

/// An embeddable web-content renderer.
pub trait RenderingSurface {
    /// Currently applied `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Apply new geometry without touching the loaded page.
    fn resize(&mut self, width: u32, height: u32);

    /// Discard the current page and load `config`.
    fn reload(&mut self, config: SurfaceConfig);

    /// The scripting bridge, once the page can accept calls.
    fn bridge(&mut self) -> Option<&mut dyn ScriptBridge>;
}

/// Where an [`HtmlFileSurface`] puts each loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutput {
    /// Write a standalone HTML file.
    File(PathBuf),
    /// Print the `data:` URI to stdout.
    DataUri,
}

/// Surface backed by a file on disk, used by the command-line front end.
///
/// It has no scripting bridge, so every update is a full reload.
#[derive(Debug)]
pub struct HtmlFileSurface {
    output: SurfaceOutput,
    config: SurfaceConfig,
    loads: usize,
}

impl HtmlFileSurface {
    /// An empty surface of the given size. Nothing is written until the
    /// first reload.
    pub fn new(output: SurfaceOutput, width: u32, height: u32) -> Self {
        Self {
            output,
            config: SurfaceConfig {
                width,
                height,
                ..SurfaceConfig::default()
            },
            loads: 0,
        }
    }

    /// Create the surface and perform the initial load.
    pub fn create(output: SurfaceOutput, config: SurfaceConfig) -> Self {
        let mut surface = Self::new(output, config.width, config.height);
        surface.reload(config);
        surface
    }

    /// Number of full loads performed, including the initial one.
    pub const fn loads(&self) -> usize {
        self.loads
    }

    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    fn publish(&self) -> Result<()> {
        let Some(url) = self.config.url.as_deref() else {
            return Ok(());
        };
        match &self.output {
            SurfaceOutput::DataUri => {
                println!("{url}");
                Ok(())
            }
            SurfaceOutput::File(path) => {
                let page = standalone_page(&self.config)?;
                fs::write(path, page)?;
                debug!(path = %path.display(), "wrote preview page");
                Ok(())
            }
        }
    }
}

impl RenderingSurface for HtmlFileSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        if matches!(self.output, SurfaceOutput::File(_))
            && let Err(err) = self.publish()
        {
            warn!(%err, "failed to rewrite preview after resize");
        }
    }

    fn reload(&mut self, config: SurfaceConfig) {
        self.config = config;
        self.loads += 1;
        if let Err(err) = self.publish() {
            warn!(%err, "failed to publish preview");
        }
    }

    fn bridge(&mut self) -> Option<&mut dyn ScriptBridge> {
        None
    }
}

/// Decode the page from `config.url` and inline the surface CSS the way a
/// browser surface injects its custom stylesheet.
///
/// # Errors
/// Fails if `config.url` is not a base64 data URI holding UTF-8.
pub fn standalone_page(config: &SurfaceConfig) -> Result<String> {
    let url = config.url.as_deref().unwrap_or_default();
    let html = String::from_utf8_lossy(&decode_data_uri(url)?).into_owned();

    let mut style = String::from("<style>");
    let _ = write!(
        style,
        "html {{ width: {}px; height: {}px; }}\n{}",
        config.width, config.height, config.css
    );
    style.push_str("</style>");

    Ok(match html.find("</head>") {
        Some(index) => {
            let mut page = html;
            page.insert_str(index, &style);
            page
        }
        None => format!("{style}{html}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::data_uri;
    use tempfile::tempdir;

    #[test]
    fn test_bridge_call_payload_shape() {
        let call = BridgeCall::set_html("<p>\"hi\"</p>");
        let wire = serde_json::to_value(&call).unwrap();
        assert_eq!(wire["eventName"], "setMarkdownHtml");
        let inner: serde_json::Value =
            serde_json::from_str(wire["jsonString"].as_str().unwrap()).unwrap();
        assert_eq!(inner["html"], "<p>\"hi\"</p>");

        let call = BridgeCall::set_css("body {}");
        assert_eq!(call.event_name, "setMarkdownCss");
        assert_eq!(call.json_string, r#"{"css":"body {}"}"#);
    }

    #[test]
    fn test_surface_config_omits_unset_url() {
        let config = SurfaceConfig {
            url: None,
            css: String::new(),
            width: 800,
            height: 600,
        };
        let wire = serde_json::to_value(&config).unwrap();
        assert!(wire.get("url").is_none());
        assert_eq!(wire["width"], 800);
    }

    #[test]
    fn test_standalone_page_injects_css_into_head() {
        let html = "<html><head></head><body><p>x</p></body></html>";
        let config = SurfaceConfig {
            url: Some(data_uri("text/html", html.as_bytes())),
            css: "p { color: red; }".to_string(),
            width: 320,
            height: 240,
        };
        let page = standalone_page(&config).unwrap();
        assert!(page.contains(
            "<head><style>html { width: 320px; height: 240px; }\np { color: red; }</style></head>"
        ));
    }

    #[test]
    fn test_new_surface_writes_nothing_until_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preview.html");
        let mut surface = HtmlFileSurface::new(SurfaceOutput::File(path.clone()), 640, 480);
        surface.resize(320, 240);
        assert!(!path.exists());
        assert_eq!(surface.loads(), 0);
    }

    #[test]
    fn test_file_surface_writes_on_every_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preview.html");
        let page = |body: &str| SurfaceConfig {
            url: Some(data_uri(
                "text/html",
                format!("<html><head></head><body>{body}</body></html>").as_bytes(),
            )),
            css: String::new(),
            width: 10,
            height: 10,
        };

        let mut surface = HtmlFileSurface::create(SurfaceOutput::File(path.clone()), page("one"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("one"));
        assert!(surface.bridge().is_none());

        surface.reload(page("two"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("two"));
        assert_eq!(surface.loads(), 2);
        assert_eq!(surface.config().width, 10);

        surface.resize(20, 30);
        assert_eq!(surface.dimensions(), (20, 30));
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .contains("width: 20px; height: 30px;")
        );
    }
}
