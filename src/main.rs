//! mdsource - Live markdown preview pages.
//!
//! # Usage
//!
//! ```bash
//! mdsource README.md
//! mdsource --watch --css theme.css README.md
//! mdsource --data-uri --background '#00000000' --foreground '#ffffff' README.md
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Parser;

use mdsource::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use mdsource::dispatch::dispatch;
use mdsource::perf;
use mdsource::settings::{MemoryStore, RenderSettings};
use mdsource::source::Source;
use mdsource::surface::{HtmlFileSurface, SurfaceOutput};
use mdsource::watcher::{FileChange, WatchTarget};

/// Render a markdown file to a live-updating HTML preview
#[derive(Parser, Debug)]
#[command(name = "mdsource", version, about, long_about = None)]
struct Cli {
    /// Markdown file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Keep running and re-render when the markdown or CSS file changes
    #[arg(short, long)]
    watch: bool,

    /// Where to write the HTML page (defaults to FILE with an .html extension)
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Print the page as a data: URI instead of writing a file
    #[arg(long)]
    data_uri: bool,

    /// Style the page with a CSS file
    #[arg(long, value_name = "PATH")]
    css: Option<PathBuf>,

    /// Generate CSS with this background colour (#RRGGBB or #RRGGBBAA)
    #[arg(long, value_name = "HEX")]
    background: Option<String>,

    /// Generate CSS with this text colour (#RRGGBB or #RRGGBBAA)
    #[arg(long, value_name = "HEX")]
    foreground: Option<String>,

    /// Font family for generated CSS
    #[arg(long, value_name = "NAME")]
    font_family: Option<String>,

    /// Font style for generated CSS
    #[arg(long, value_name = "STYLE")]
    font_style: Option<String>,

    /// Font size in pixels for generated CSS
    #[arg(long, value_name = "PX")]
    font_size: Option<u32>,

    /// Surface width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Poll interval for watched files, in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Log render timings
    #[arg(long)]
    perf: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    perf::set_enabled(effective.perf);

    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }
    let output = surface_output(&cli, &effective)?;

    let mut store = MemoryStore::new();
    RenderSettings::write_defaults(&mut store);
    effective.apply_to_store(&mut store, &cli.file);

    if effective.watch {
        watch(&mut store, output)
    } else {
        render_once(&store, output)
    }
}

fn surface_output(cli: &Cli, flags: &ConfigFlags) -> Result<SurfaceOutput> {
    if flags.data_uri {
        return Ok(SurfaceOutput::DataUri);
    }
    let out = cli
        .out
        .clone()
        .unwrap_or_else(|| cli.file.with_extension("html"));
    if out == cli.file {
        anyhow::bail!(
            "Output would overwrite the input file {}; pass --out",
            cli.file.display()
        );
    }
    Ok(SurfaceOutput::File(out))
}

fn render_once(store: &MemoryStore, output: SurfaceOutput) -> Result<()> {
    let mut settings = RenderSettings::from_store(store);
    read_input(&mut settings, WatchTarget::Markdown)?;
    read_input(&mut settings, WatchTarget::Css)?;

    let mut surface = HtmlFileSurface::new(output, settings.width, settings.height);
    let outcome = dispatch(&mut surface, &settings);
    tracing::debug!(?outcome, "rendered");
    Ok(())
}

fn read_input(settings: &mut RenderSettings, target: WatchTarget) -> Result<()> {
    let path = match target {
        WatchTarget::Markdown => settings.markdown.file_path(),
        WatchTarget::Css => settings.style.file_path(),
    };
    let Some(path) = path.map(Path::to_path_buf) else {
        return Ok(());
    };
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    settings.apply_change(&FileChange {
        target,
        path,
        content,
    });
    Ok(())
}

fn watch(store: &mut MemoryStore, output: SurfaceOutput) -> Result<()> {
    let (update_tx, update_rx) = mpsc::channel();
    let mut source = Source::create(
        store,
        |config| HtmlFileSurface::create(output, config),
        move || {
            let _ = update_tx.send(());
        },
    )
    .context("Failed to start markdown source")?;
    eprintln!("Watching for changes (Ctrl-C to stop)");
    while update_rx.recv().is_ok() {
        if let Some(outcome) = source.pump() {
            tracing::info!(?outcome, "preview updated");
        }
    }
    Ok(())
}
