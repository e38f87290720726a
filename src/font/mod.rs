//! # Fonts
//!
//! Overlay text uses the standard PDF Type1 fonts, which every reader ships
//! with, so nothing is embedded into the template. Symbol and ZapfDingbats
//! are left out: they do not use WinAnsiEncoding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    #[serde(rename = "Helvetica-Oblique")]
    HelveticaOblique,
    #[serde(rename = "Helvetica-BoldOblique")]
    HelveticaBoldOblique,
    #[serde(rename = "Times-Roman")]
    TimesRoman,
    #[default]
    #[serde(rename = "Times-Bold")]
    TimesBold,
    #[serde(rename = "Times-Italic")]
    TimesItalic,
    #[serde(rename = "Times-BoldItalic")]
    TimesBoldItalic,
    #[serde(rename = "Courier")]
    Courier,
    #[serde(rename = "Courier-Bold")]
    CourierBold,
    #[serde(rename = "Courier-Oblique")]
    CourierOblique,
    #[serde(rename = "Courier-BoldOblique")]
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF `/BaseFont` name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Resource name used for this font inside a page's `/Font` dictionary.
    ///
    /// Prefixed so it cannot collide with the template's own font names.
    pub fn resource_name(&self) -> String {
        format!("CsF{}", self.pdf_name().replace('-', ""))
    }
}
