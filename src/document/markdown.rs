//! Markdown to HTML conversion with comrak.

use comrak::{Options, markdown_to_html};

/// Convert markdown to an HTML fragment.
///
/// Tables, strikethrough and task lists are enabled. Raw HTML is passed
/// through as-is: the output is only ever loaded into the preview surface.
///
/// # Example
///
/// ```
/// let html = mdsource::document::to_html("# Hi");
/// assert!(html.contains("<h1>Hi</h1>"));
/// ```
pub fn to_html(source: &str) -> String {
    markdown_to_html(source, &create_options())
}

fn create_options() -> Options {
    let mut options = Options::default();

    // GFM extensions the preview supports
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;

    options.render.unsafe_ = true;

    options
}
