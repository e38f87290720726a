//! # charsheet
//!
//! Fills a printed character sheet. A JSON character record goes in, the
//! blank sheet PDF is used as a template, and a copy of the template with
//! every field written in place comes out.
//!
//! All the interesting decisions are about *where* things go. The sheet has
//! fixed boxes, so every scalar field has a fixed spot and every list has an
//! anchor, a row step, and a row count after which it wraps into a second
//! column. Those rules live in data (the slot table), not in code paths.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON record)
//!       ↓
//!   [model]    Record, field and list identities
//!       ↓
//!   [layout]   Slot table → positions → draw commands per page
//!       ↓
//!   [pdf]      Stamp commands onto the template, save
//! ```

pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;

use std::path::{Path, PathBuf};

use tracing::info;

pub use error::SheetError;
pub use layout::{DrawCommand, OverlayEngine, PageOverlay, SheetLayout};
pub use model::Record;
pub use pdf::{DrawPolicy, StampReport, TemplateDocument};

/// Template used when none is given.
pub const DEFAULT_TEMPLATE: &str = "CharacterSheets.pdf";

/// Everything a run needs besides the record itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub template: PathBuf,
    /// Defaults to the input path with a `.pdf` extension.
    pub output: Option<PathBuf>,
    /// A slot table file to use instead of [`SheetLayout::standard`].
    pub layout: Option<PathBuf>,
    pub policy: DrawPolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output: None,
            layout: None,
            policy: DrawPolicy::default(),
        }
    }
}

impl RenderOptions {
    fn sheet_layout(&self) -> Result<SheetLayout, SheetError> {
        match &self.layout {
            Some(path) => layout::slots::load_layout(path),
            None => Ok(SheetLayout::standard()),
        }
    }
}

/// Render `record` onto an in-memory template and return the PDF bytes.
///
/// The slot table is validated before the template is parsed.
pub fn render(
    record: &Record,
    sheet: &SheetLayout,
    template: &[u8],
    options: &RenderOptions,
) -> Result<Vec<u8>, SheetError> {
    sheet.validate()?;
    let mut doc = TemplateDocument::from_bytes(template)?;
    stamp_record(&mut doc, record, sheet, options.policy)?;
    doc.to_bytes()
}

/// Render a record given as JSON with the built-in slot table.
pub fn render_json(json: &str, template: &[u8]) -> Result<Vec<u8>, SheetError> {
    let record = Record::from_json(json)?;
    render(
        &record,
        &SheetLayout::standard(),
        template,
        &RenderOptions::default(),
    )
}

/// Read the record at `input`, fill the template, and write the output file.
///
/// Returns the path written. On any failure nothing is left at that path.
pub fn render_file(input: &Path, options: &RenderOptions) -> Result<PathBuf, SheetError> {
    let sheet = options.sheet_layout()?;
    sheet.validate()?;
    let record = model::read_record(input)?;

    let mut doc = TemplateDocument::open(&options.template)?;
    let report = stamp_record(&mut doc, &record, &sheet, options.policy)?;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(input));
    doc.save_atomic(&output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        pages = report.pages_stamped,
        commands = report.commands,
        substituted = report.substituted,
        "rendered character sheet"
    );
    Ok(output)
}

/// `character.json` → `character.pdf`. A path without an extension gains one.
pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

fn stamp_record(
    doc: &mut TemplateDocument,
    record: &Record,
    sheet: &SheetLayout,
    policy: DrawPolicy,
) -> Result<StampReport, SheetError> {
    let overlays = OverlayEngine::new(sheet).overlay(record, doc.page_count())?;
    doc.stamp(&overlays, policy)
}
