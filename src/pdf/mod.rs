//! # Template Writer
//!
//! Opens the template, stamps overlay text onto its pages, and writes the
//! result. The template's own content is never edited: each stamped page
//! gets its original content wrapped in `q … Q` followed by one extra
//! content stream holding the overlay.
//!
//! ## Overlay stream
//!
//! ```text
//! Q q                          <- restore template state, start clean
//! BT 0 0 0 rg /CsFTimesBold 10.00 Tf 293.00 747.00 Td (Ysolde) Tj ET
//! ...
//! Q
//! ```
//!
//! Layout coordinates have a top-left origin with y growing down; PDF user
//! space is bottom-left with y up. The baseline of a string placed at
//! `(x, y)` with size `s` goes to `(llx + x, ury - y - s)`.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::{debug, warn};

use crate::error::SheetError;
use crate::font::StandardFont;
use crate::layout::{DrawCommand, PageOverlay};

/// US Letter, used when a page carries no MediaBox anywhere in its tree.
const FALLBACK_MEDIA_BOX: PageBox = PageBox {
    llx: 0.0,
    lly: 0.0,
    urx: 612.0,
    ury: 792.0,
};

/// What to do with a draw command whose text the font cannot encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawPolicy {
    /// Substitute `?` for unencodable characters, log a warning, keep going.
    #[default]
    Lenient,
    /// Abort the run with [`SheetError::Draw`].
    Strict,
}

/// A page's MediaBox in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Convert a top-left layout point to the PDF baseline origin.
    pub fn to_pdf(&self, x: f64, y: f64, font_size: f64) -> (f64, f64) {
        (self.llx + x, self.ury - y - font_size)
    }
}

/// Counts from one [`TemplateDocument::stamp`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampReport {
    pub pages_stamped: usize,
    pub commands: usize,
    /// Commands drawn with `?` substitutions under the lenient policy.
    pub substituted: usize,
}

/// An open template. Dropping it releases the parsed document.
pub struct TemplateDocument {
    doc: Document,
    path: PathBuf,
    page_ids: Vec<ObjectId>,
    font_ids: HashMap<StandardFont, ObjectId>,
}

impl TemplateDocument {
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SheetError::TemplateNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SheetError::TemplateRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;
        Self::parse(&bytes, path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SheetError> {
        Self::parse(bytes, Path::new("<memory>"))
    }

    fn parse(bytes: &[u8], path: &Path) -> Result<Self, SheetError> {
        let doc = Document::load_mem(bytes).map_err(|e| SheetError::TemplateRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(SheetError::TemplateRead {
                path: path.to_path_buf(),
                reason: "template has no pages".to_string(),
            });
        }
        debug!(path = %path.display(), pages = page_ids.len(), "opened template");
        Ok(Self {
            doc,
            path: path.to_path_buf(),
            page_ids,
            font_ids: HashMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// The MediaBox of page `index`, inherited through the page tree.
    pub fn page_size(&self, index: usize) -> Result<PageBox, SheetError> {
        let page_id = self.page_id(index)?;
        let media_box = self
            .inherited(page_id, b"MediaBox")
            .map(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|items| parse_box(items));
        Ok(media_box.unwrap_or_else(|| {
            warn!(page = index, "page has no usable MediaBox, assuming US Letter");
            FALLBACK_MEDIA_BOX
        }))
    }

    /// Draw every overlay onto its page. Pages with no commands are left as they are.
    pub fn stamp(&mut self, overlays: &[PageOverlay], policy: DrawPolicy) -> Result<StampReport, SheetError> {
        let mut report = StampReport::default();

        for overlay in overlays.iter().filter(|o| !o.is_empty()) {
            let page_id = self.page_id(overlay.page)?;
            let page_box = self.page_size(overlay.page)?;

            let mut fonts: Vec<StandardFont> = Vec::new();
            let mut stream = String::from("Q q\n");
            for command in &overlay.commands {
                let (text, rejected) = encode_literal(&command.text);
                if !rejected.is_empty() {
                    let reason = format!(
                        "{} not representable in WinAnsiEncoding",
                        describe_chars(&rejected)
                    );
                    match policy {
                        DrawPolicy::Strict => {
                            return Err(SheetError::Draw {
                                page: overlay.page,
                                field: command.field.clone(),
                                reason,
                            });
                        }
                        DrawPolicy::Lenient => {
                            warn!(page = overlay.page, field = %command.field, "{}, drawing with substitutes", reason);
                            report.substituted += 1;
                        }
                    }
                }
                if !fonts.contains(&command.font) {
                    fonts.push(command.font);
                }
                write_text(&mut stream, command, &page_box, &text);
            }
            stream.push_str("Q\n");

            self.register_fonts(page_id, &fonts)?;
            self.append_content(page_id, &stream)?;

            report.pages_stamped += 1;
            report.commands += overlay.commands.len();
            debug!(page = overlay.page, commands = overlay.commands.len(), "stamped page");
        }

        Ok(report)
    }

    /// Serialize the document.
    pub fn write_to<W: IoWrite>(&mut self, out: &mut W) -> io::Result<()> {
        self.doc
            .save_to(out)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, SheetError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes).map_err(|source| SheetError::OutputWrite {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        Ok(bytes)
    }

    /// Write to `path` all-or-nothing: the bytes go to a temporary file in
    /// the same directory, which is renamed over `path` only once complete.
    pub fn save_atomic(&mut self, path: &Path) -> Result<(), SheetError> {
        let fail = |source: io::Error| SheetError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
        {
            let mut writer = io::BufWriter::new(tmp.as_file_mut());
            self.write_to(&mut writer).map_err(fail)?;
            writer.flush().map_err(fail)?;
        }
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(path).map_err(|e| fail(e.error))?;
        debug!(template = %self.path.display(), output = %path.display(), "wrote output");
        Ok(())
    }

    // ─── Page tree helpers ──────────────────────────────────────

    fn page_id(&self, index: usize) -> Result<ObjectId, SheetError> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(SheetError::TemplateMismatch {
                page: index,
                page_count: self.page_ids.len(),
            })
    }

    /// Look `key` up on the page, then on its ancestors.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        // Bounded walk; a malformed tree may contain a Parent cycle.
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn template_error(&self, e: lopdf::Error) -> SheetError {
        SheetError::TemplateRead {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }

    fn font_object(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.font_ids.get(&font) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.pdf_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_ids.insert(font, id);
        id
    }

    /// Give the page its own Resources dictionary containing the overlay fonts.
    ///
    /// The effective resources (possibly inherited or indirect) are copied
    /// inline so shared dictionaries of other pages stay untouched.
    fn register_fonts(&mut self, page_id: ObjectId, fonts: &[StandardFont]) -> Result<(), SheetError> {
        let font_refs: Vec<(String, ObjectId)> = fonts
            .iter()
            .map(|font| (font.resource_name(), self.font_object(*font)))
            .collect();

        let mut resources = self
            .inherited(page_id, b"Resources")
            .and_then(|obj| self.resolve(obj).as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        let mut font_dict = resources
            .get(b"Font")
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);

        for (name, id) in font_refs {
            font_dict.set(name, Object::Reference(id));
        }
        resources.set("Font", Object::Dictionary(font_dict));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| self_error(&self.path, e))?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn append_content(&mut self, page_id: ObjectId, overlay: &str) -> Result<(), SheetError> {
        let existing: Vec<Object> = {
            let page = self
                .doc
                .get_dictionary(page_id)
                .map_err(|e| self.template_error(e))?;
            match page.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        };

        let save_id = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let compressed = compress_to_vec_zlib(overlay.as_bytes(), 6);
        let overlay_id = self.doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            compressed,
        ));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| self_error(&self.path, e))?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

/// `template_error` without borrowing all of `self` (used while `doc` is mutably borrowed).
fn self_error(path: &Path, e: lopdf::Error) -> SheetError {
    SheetError::TemplateRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn parse_box(items: &[Object]) -> Option<PageBox> {
    if items.len() != 4 {
        return None;
    }
    let values: Vec<f64> = items.iter().map(number).collect::<Option<_>>()?;
    Some(PageBox {
        llx: values[0].min(values[2]),
        lly: values[1].min(values[3]),
        urx: values[0].max(values[2]),
        ury: values[1].max(values[3]),
    })
}

fn write_text(stream: &mut String, command: &DrawCommand, page_box: &PageBox, text: &str) {
    let (x, y) = page_box.to_pdf(command.x, command.y, command.font_size);
    let _ = write!(
        stream,
        "BT\n0 0 0 rg\n/{} {:.2} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
        command.font.resource_name(),
        command.font_size,
        x,
        y,
        text
    );
}

/// Encode `text` as the body of a PDF literal string in WinAnsiEncoding.
///
/// Returns the encoded body and the characters that had no code (each
/// replaced by `?` in the body).
fn encode_literal(text: &str) -> (String, Vec<char>) {
    let mut body = String::with_capacity(text.len());
    let mut rejected = Vec::new();
    for ch in text.chars() {
        let b = match unicode_to_winansi(ch) {
            Some(b) => b,
            None => {
                rejected.push(ch);
                b'?'
            }
        };
        match b {
            b'\\' => body.push_str("\\\\"),
            b'(' => body.push_str("\\("),
            b')' => body.push_str("\\)"),
            0x20..=0x7E => body.push(b as char),
            _ => {
                let _ = write!(body, "\\{:03o}", b);
            }
        }
    }
    (body, rejected)
}

fn describe_chars(chars: &[char]) -> String {
    let listed: Vec<String> = chars.iter().map(|c| format!("{:?} (U+{:04X})", c, *c as u32)).collect();
    listed.join(", ")
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is Windows-1252: 0x20..=0x7E and 0xA0..=0xFF map
/// directly, 0x80..=0x9F hold smart quotes, dashes and the like.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A blank template with `pages` Letter-sized pages, MediaBox on the page tree root.
    pub(crate) fn blank_template(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for i in 0..pages {
            let content = format!("BT /F1 12 Tf 72 720 Td (Template page {}) Tj ET\n", i + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn command(field: &str, text: &str) -> DrawCommand {
        DrawCommand {
            field: field.to_string(),
            text: text.to_string(),
            x: 100.0,
            y: 50.0,
            font_size: 10.0,
            font: StandardFont::TimesBold,
        }
    }

    #[test]
    fn test_encode_literal_escapes() {
        let (body, rejected) = encode_literal("Hello (World) \\o/");
        assert_eq!(body, "Hello \\(World\\) \\\\o/");
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_encode_literal_winansi_octal() {
        let (body, rejected) = encode_literal("Café – 5€");
        assert_eq!(body, "Caf\\351 \\226 5\\200");
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_encode_literal_rejects_outside_winansi() {
        let (body, rejected) = encode_literal("Ωmega");
        assert_eq!(body, "?mega");
        assert_eq!(rejected, vec!['Ω']);
    }

    #[test]
    fn test_to_pdf_flips_y() {
        let page_box = FALLBACK_MEDIA_BOX;
        assert_eq!(page_box.to_pdf(293.0, 35.0, 10.0), (293.0, 747.0));
        let offset = PageBox {
            llx: 10.0,
            lly: 20.0,
            urx: 622.0,
            ury: 812.0,
        };
        assert_eq!(offset.to_pdf(0.0, 0.0, 8.0), (10.0, 804.0));
        assert_eq!(offset.width(), 612.0);
        assert_eq!(offset.height(), 792.0);
    }

    #[test]
    fn test_open_blank_template() {
        let template = TemplateDocument::from_bytes(&blank_template(2)).unwrap();
        assert_eq!(template.page_count(), 2);
        assert_eq!(template.page_size(1).unwrap(), FALLBACK_MEDIA_BOX);
        assert!(matches!(
            template.page_size(2),
            Err(SheetError::TemplateMismatch { page: 2, page_count: 2 })
        ));
    }

    #[test]
    fn test_garbage_is_template_read_error() {
        let err = TemplateDocument::from_bytes(b"not a pdf").err().unwrap();
        assert!(matches!(err, SheetError::TemplateRead { .. }));
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let err = TemplateDocument::open(Path::new("/definitely/not/here.pdf"))
            .err()
            .unwrap();
        assert!(matches!(err, SheetError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_stamp_skips_empty_pages() {
        let mut template = TemplateDocument::from_bytes(&blank_template(2)).unwrap();
        let overlays = vec![
            PageOverlay {
                page: 0,
                commands: vec![command("name", "Ysolde"), command("calling", "")],
            },
            PageOverlay {
                page: 1,
                commands: vec![],
            },
        ];
        let report = template.stamp(&overlays, DrawPolicy::Lenient).unwrap();
        assert_eq!(
            report,
            StampReport {
                pages_stamped: 1,
                commands: 2,
                substituted: 0,
            }
        );
    }

    #[test]
    fn test_strict_policy_rejects_unencodable_text() {
        let mut template = TemplateDocument::from_bytes(&blank_template(1)).unwrap();
        let overlays = vec![PageOverlay {
            page: 0,
            commands: vec![command("name", "Ωmega")],
        }];
        let err = template.stamp(&overlays, DrawPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            SheetError::Draw { page: 0, ref field, .. } if field == "name"
        ));
    }

    #[test]
    fn test_lenient_policy_counts_substitutions() {
        let mut template = TemplateDocument::from_bytes(&blank_template(1)).unwrap();
        let overlays = vec![PageOverlay {
            page: 0,
            commands: vec![command("name", "Ωmega"), command("player", "Ann")],
        }];
        let report = template.stamp(&overlays, DrawPolicy::Lenient).unwrap();
        assert_eq!(report.substituted, 1);
        assert_eq!(report.commands, 2);
    }

    #[test]
    fn test_write_text_operators() {
        let mut stream = String::new();
        write_text(&mut stream, &command("name", "x"), &FALLBACK_MEDIA_BOX, "Ysolde");
        assert_eq!(
            stream,
            "BT\n0 0 0 rg\n/CsFTimesBold 10.00 Tf\n100.00 732.00 Td\n(Ysolde) Tj\nET\n"
        );
    }
}
