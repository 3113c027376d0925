//! # Couple CLI
//!
//! Headless tools for the regional prompt editor.
//!
//! ## Usage
//!
//! ```bash
//! couple layout 4
//! couple preview --mapping '[[0,0.5,0,1,1],[0.5,1,0,1,1]]' --resolution 1216x832 --out preview.png
//! couple paste --tab img2img < params.txt
//! couple normalize regions.json --prompts "a cat\na dog"
//! couple render regions.json --resolution 1024x1024 --out surface.png
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use couple_core::mapping::{mapping_to_text, MappingTuple};
use couple_core::prompts::split_prompts;
use couple_core::{infotext, layout, parse_import, EditorDocument, EditorMode, MappingSlot, RegionStore};
use couple_renderer::surface::parse_resolution;
use couple_renderer::{preview, BackendType, BackgroundImage, RendererConfig};
use couple_sync::{EditorSession, SessionOptions, SyncConfig, TextFieldStore};
use serde::Serialize;
use serde_json::Value;

/// Command-line arguments for `couple`.
#[derive(Debug, Clone, Parser)]
#[command(name = "couple")]
#[command(about = "Regional prompt editor tools")]
#[command(version)]
pub struct CliArgs {
    /// Separator between per-region prompts
    #[arg(long, global = true, env = "COUPLE_PROMPT_SEPARATOR")]
    pub separator: Option<String>,

    /// Longest edge of the editor surface in pixels
    #[arg(long, global = true, env = "COUPLE_MAX_SURFACE_EDGE", default_value = "1024")]
    pub max_edge: u32,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// `couple` subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the automatic layout for a number of prompts
    Layout {
        /// Number of prompts
        count: usize,
    },
    /// Render a mapping preview as PNG
    Preview {
        /// Mapping JSON, e.g. `[[0,0.5,0,1,1]]`
        #[arg(long)]
        mapping: String,
        /// Generation resolution as WIDTHxHEIGHT
        #[arg(long, default_value = "1024x1024")]
        resolution: String,
        /// Host mode; previews exist only in Advanced
        #[arg(long, default_value = "advanced")]
        mode: EditorMode,
        /// Output PNG path
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Extract the mapping from pasted generation parameters
    Paste {
        /// File holding the parameters (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Tab the parameters were pasted into
        #[arg(long, default_value = "txt2img")]
        tab: String,
    },
    /// Normalize an exported region document
    Normalize {
        /// Exported document
        input: PathBuf,
        /// Prompt text to assign to the regions
        #[arg(long)]
        prompts: Option<String>,
        /// Directory to write the result into (stdout when omitted)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Draw the editor surface for an exported document
    Render {
        /// Exported document
        input: PathBuf,
        /// Generation resolution as WIDTHxHEIGHT
        #[arg(long, default_value = "1024x1024")]
        resolution: String,
        /// Background image path or data URI
        #[arg(long)]
        background: Option<String>,
        /// Table row to select before drawing
        #[arg(long)]
        select: Option<usize>,
        /// Output PNG path
        #[arg(long, short)]
        out: PathBuf,
    },
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Sync layer settings.
    pub sync: SyncConfig,
    /// Renderer settings.
    pub renderer: RendererConfig,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        let mut sync = SyncConfig::from_env();
        if let Some(separator) = &args.separator {
            sync.prompt_separator = separator.replace("\\n", "\n").replace("\\t", "\t");
        }
        Self {
            sync,
            renderer: RendererConfig {
                backend: BackendType::Raster,
                max_surface_edge: args.max_edge,
                ..RendererConfig::default()
            },
        }
    }
}

/// Mapping recovered from pasted parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasteReport {
    /// Slot the mapping belongs to.
    pub slot: MappingSlot,
    /// The mapping tuples.
    pub mapping: Vec<MappingTuple>,
}

/// Run a parsed command and return what should be printed.
///
/// Must run inside a tokio runtime.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed, or an output cannot
/// be written.
pub fn run(args: &CliArgs) -> anyhow::Result<String> {
    let config = CliConfig::from(args);
    match &args.command {
        Command::Layout { count } => Ok(layout_text(*count)),
        Command::Preview {
            mapping,
            resolution,
            mode,
            out,
        } => {
            let resolution = resolution_arg(resolution)?;
            write_preview(*mode, resolution, mapping, out)?;
            Ok(format!("Preview written to {}", out.display()))
        }
        Command::Paste { file, tab } => {
            let params = match file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            let report = paste(&params, tab)?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Normalize {
            input,
            prompts,
            out_dir,
        } => {
            let json = read_input(input)?;
            let prompts = prompts
                .as_deref()
                .map(|text| split_prompts(text, &config.sync.prompt_separator))
                .unwrap_or_default();
            let document = normalize(&json, &prompts)?;
            match out_dir {
                Some(dir) => {
                    let path = document.write_to_dir(dir)?;
                    Ok(format!("Document written to {}", path.display()))
                }
                None => Ok(document.to_json()?),
            }
        }
        Command::Render {
            input,
            resolution,
            background,
            select,
            out,
        } => {
            let json = read_input(input)?;
            let resolution = resolution_arg(resolution)?;
            let background = background
                .as_deref()
                .map(BackgroundImage::load)
                .transpose()?;
            render(&config, &json, resolution, background, *select, out)
        }
    }
}

/// Layout for `count` prompts as mapping JSON.
#[must_use]
pub fn layout_text(count: usize) -> String {
    mapping_to_text(&layout(count))
}

/// Recover the mapping from pasted parameters.
///
/// # Errors
///
/// Returns an error for an unknown tab or text without a mapping entry.
pub fn paste(params: &str, tab: &str) -> anyhow::Result<PasteReport> {
    let slot = MappingSlot::from_tab(tab).ok_or_else(|| anyhow!("Unknown tab '{tab}'"))?;
    let mapping = infotext::extract_mapping(params)
        .ok_or_else(|| anyhow!("No {} entry found", infotext::MAPPING_KEY))?;
    tracing::info!(%slot, regions = mapping.len(), "Mapping recovered from parameters");
    Ok(PasteReport { slot, mapping })
}

/// Validate and clean an exported document, optionally assigning prompts.
///
/// # Errors
///
/// Returns an error if the text is not a region export.
pub fn normalize(json: &str, prompts: &[String]) -> anyhow::Result<EditorDocument> {
    let mut regions = parse_import(json).ok_or_else(|| anyhow!("Not a region export"))?;
    for (region, prompt) in regions.iter_mut().zip(prompts) {
        region.prompt.clone_from(prompt);
    }
    let mut store = RegionStore::new();
    store.replace_all(regions);
    Ok(EditorDocument::from_store(&store, EditorMode::Advanced))
}

/// Render the mapping preview PNG.
///
/// # Errors
///
/// Returns an error outside `Advanced` mode, for non-JSON mappings, or if
/// the file cannot be written.
pub fn write_preview(
    mode: EditorMode,
    resolution: (u32, u32),
    mapping: &str,
    out: &Path,
) -> anyhow::Result<()> {
    let value: Value = serde_json::from_str(mapping).context("Mapping is not JSON")?;
    let image = preview::visualize_mapping(mode, resolution, &value)
        .ok_or_else(|| anyhow!("Previews are only drawn in {} mode", EditorMode::Advanced))?;
    std::fs::write(out, preview::encode_png(&image)?)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!(width = image.width(), height = image.height(), "Preview rendered");
    Ok(())
}

/// Load a document into a headless editor session and save its surface.
///
/// Returns the synced mapping text. Must run inside a tokio runtime.
///
/// # Errors
///
/// Returns an error if the document is rejected, the row does not exist, or
/// the surface cannot be encoded or written.
pub fn render(
    config: &CliConfig,
    json: &str,
    resolution: (u32, u32),
    background: Option<BackgroundImage>,
    select: Option<usize>,
    out: &Path,
) -> anyhow::Result<String> {
    let target = TextFieldStore::new();
    let options = SessionOptions {
        sync: config.sync.clone(),
        renderer: config.renderer.clone(),
        slot: MappingSlot::Primary,
        resolution,
    };
    let session = EditorSession::new(
        options,
        Arc::new(target.clone()),
        Arc::new(|| Some(EditorMode::Advanced)),
    )?;

    if session.import_document(json).is_none() {
        bail!("Not a region export");
    }
    if background.is_some() {
        session.set_background(background);
    }
    if let Some(row) = select {
        session.click_row(row)?;
    }

    let surface = session
        .snapshot()
        .ok_or_else(|| anyhow!("Renderer produced no pixels"))?;
    std::fs::write(out, preview::encode_png(&surface)?)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    let outcome = session.force_sync();
    tracing::debug!(?outcome, "Mapping synced");
    let mapping = target
        .text(MappingSlot::Primary)
        .unwrap_or_else(|| session.mapping_text());
    session.shutdown();
    Ok(mapping)
}

fn resolution_arg(text: &str) -> anyhow::Result<(u32, u32)> {
    parse_resolution(text).ok_or_else(|| anyhow!("Invalid resolution '{text}', expected WIDTHxHEIGHT"))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
