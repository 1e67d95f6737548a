//! HTML document assembly.
//!
//! This module handles:
//! - Converting markdown to an HTML fragment with comrak
//! - Resolving the stylesheet for the current settings
//! - Wrapping the fragment in a page that carries the update bootstrap script
//! - Packaging that page as a `data:` URI for full loads

mod markdown;

pub use markdown::to_html;

use crate::encode;
use crate::settings::RenderSettings;
use crate::style::resolve_css;

/// Event that replaces the page body with `detail.html`.
pub const SET_HTML_EVENT: &str = "setMarkdownHtml";
/// Event that upserts the preview stylesheet from `detail.css`.
pub const SET_CSS_EVENT: &str = "setMarkdownCss";
/// Id of the `<style>` element managed by the bootstrap script.
pub const STYLE_ELEMENT_ID: &str = "mdsourceStyle";

/// Listeners that let the update path patch a loaded page in place.
pub const BOOTSTRAP_SCRIPT: &str = "\
window.addEventListener('setMarkdownHtml', function (event) {
  document.body.innerHTML = event.detail.html;
});
window.addEventListener('setMarkdownCss', function (event) {
  let style = document.getElementById('mdsourceStyle');
  if (!style) {
    style = document.createElement('style');
    style.id = 'mdsourceStyle';
    document.head.appendChild(style);
  }
  style.textContent = event.detail.css;
});
";

const DATA_URI_MIME: &str = "text/html";

/// Fragment and stylesheet derived from one settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html_fragment: String,
    pub resolved_css: String,
}

/// A complete page ready for a full load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullDocument {
    pub html: String,
    pub data_uri: String,
}

impl RenderedDocument {
    pub fn render(settings: &RenderSettings) -> Self {
        let _scope = crate::perf::scope("document.render");
        Self {
            html_fragment: to_html(settings.markdown.source()),
            resolved_css: resolve_css(&settings.style),
        }
    }

    /// Build the full page and its `data:` URI.
    pub fn assemble(&self) -> FullDocument {
        let _scope = crate::perf::scope("document.assemble");
        let html = assemble_html(&self.html_fragment);
        let data_uri = encode::data_uri(DATA_URI_MIME, html.as_bytes());
        FullDocument { html, data_uri }
    }
}

/// Wrap a fragment in the bootstrap page.
pub fn assemble_html(fragment: &str) -> String {
    let mut html = String::with_capacity(BOOTSTRAP_SCRIPT.len() + fragment.len() + 96);
    html.push_str("<html><head><meta charset=\"UTF-8\"><script>\n");
    html.push_str(BOOTSTRAP_SCRIPT);
    html.push_str("</script></head><body>");
    html.push_str(fragment);
    html.push_str("</body></html>");
    html
}
