//! # Layout Slot Table
//!
//! What goes where, as data. A [`SheetLayout`] lists, per template page, the
//! slots drawn on it: scalar fields, wrap-capable string lists, the skill
//! block and the weapon table. The engine reads this table and never
//! branches on page numbers or field names itself.
//!
//! Coordinates are in points with the origin at the page's top-left corner
//! and y growing downwards, matching how the sheet was measured.
//!
//! Field ids are kept as the strings the table was authored with and are
//! resolved against the record schema by [`SheetLayout::validate`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SheetError;
use crate::font::StandardFont;
use crate::model::{FieldId, ListId, Weapon};

/// Font size used when a slot does not set one.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn no_wrap() -> usize {
    usize::MAX
}

/// The complete slot table for one template version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLayout {
    /// Font used for every overlay string.
    #[serde(default)]
    pub font: StandardFont,

    /// Page index (0-based) → slots drawn on that page.
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub page: usize,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Slot {
    /// One value at one fixed point.
    Scalar(ScalarSlot),
    /// A string list laid out in up to two columns.
    List(ListSlot),
    /// The skill block: name, rating, and stacked specialisations.
    Skills(SkillsSlot),
    /// The weapon table: one row per weapon, fixed column offsets.
    Weapons(WeaponRows),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarSlot {
    pub field: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSlot {
    pub list: String,
    pub config: ListConfig,
}

/// Geometry of a two-column list.
///
/// Entries `0..=wrap_at` stack down from `(x, y)`; later entries restart at
/// `y` in a second column shifted right by `wrap_x_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    pub x: f64,
    pub y: f64,
    pub y_offset: f64,
    /// Last index drawn in the first column.
    #[serde(default = "no_wrap")]
    pub wrap_at: usize,
    #[serde(default)]
    pub wrap_x_offset: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Horizontal inset of the text from the row origin.
    #[serde(default)]
    pub indent: f64,
}

/// A displacement relative to a row position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

/// A single-column list hanging off a parent row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubList {
    pub dx: f64,
    pub dy: f64,
    pub step: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsSlot {
    /// Where each skill's name goes.
    pub rows: ListConfig,
    /// Rating position relative to the name.
    pub rating: Offset,
    /// Specialisations, stacked under the name.
    pub values: SubList,
}

/// The weapon table. Rows never wrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponRows {
    pub x: f64,
    pub y: f64,
    pub row_height: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    pub columns: Vec<WeaponColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponColumn {
    pub field: WeaponField,
    pub dx: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponField {
    Name,
    Rating,
    Damage,
    Range,
    Ammo,
    Cost,
    AmmoCost,
    Features,
}

impl WeaponField {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponField::Name => "name",
            WeaponField::Rating => "rating",
            WeaponField::Damage => "damage",
            WeaponField::Range => "range",
            WeaponField::Ammo => "ammo",
            WeaponField::Cost => "cost",
            WeaponField::AmmoCost => "ammo_cost",
            WeaponField::Features => "features",
        }
    }

    /// The text printed in this column for `weapon`.
    pub fn text(&self, weapon: &Weapon) -> String {
        match self {
            WeaponField::Name => weapon.name.clone(),
            WeaponField::Rating => weapon.rating.to_string(),
            WeaponField::Damage => format!("+ {}", weapon.damage),
            WeaponField::Range => format!("{} feet", weapon.range),
            WeaponField::Ammo => weapon.ammo.to_string(),
            WeaponField::Cost => weapon.cost.clone(),
            WeaponField::AmmoCost => weapon.ammo_cost.clone(),
            WeaponField::Features => weapon.features.clone(),
        }
    }
}

// ─── Constructors ───────────────────────────────────────────────

impl Slot {
    fn scalar(field: FieldId, x: f64, y: f64) -> Slot {
        Slot::Scalar(ScalarSlot {
            field: field.as_str().to_string(),
            x,
            y,
            font_size: DEFAULT_FONT_SIZE,
        })
    }

    fn list(list: ListId, config: ListConfig) -> Slot {
        Slot::List(ListSlot {
            list: list.as_str().to_string(),
            config,
        })
    }
}

impl ListConfig {
    /// Same geometry, different left edge.
    pub fn at_x(mut self, x: f64) -> ListConfig {
        self.x = x;
        self
    }
}

impl SheetLayout {
    /// The slot table for the shipped two-page character sheet.
    pub fn standard() -> SheetLayout {
        let narrative = ListConfig {
            x: 17.0,
            y: 628.0,
            y_offset: 10.0,
            wrap_at: 12,
            wrap_x_offset: 88.0,
            font_size: 8.0,
            indent: 25.0,
        };
        let injuries = ListConfig {
            x: 72.0,
            y: 308.0,
            ..narrative
        };

        let front = PageLayout {
            page: 0,
            slots: vec![
                Slot::scalar(FieldId::Name, 293.0, 35.0),
                Slot::scalar(FieldId::Player, 445.0, 35.0),
                Slot::scalar(FieldId::Calling, 302.0, 60.0),
                Slot::scalar(FieldId::Age, 287.0, 85.0),
                Slot::scalar(FieldId::WealthRating, 488.0, 85.0),
                Slot::scalar(FieldId::Vitality, 145.0, 155.0),
                Slot::scalar(FieldId::Coordination, 145.0, 183.0),
                Slot::scalar(FieldId::Wit, 145.0, 210.0),
                Slot::scalar(FieldId::Intellect, 145.0, 237.0),
                Slot::scalar(FieldId::Charm, 145.0, 264.0),
                Slot::scalar(FieldId::Will, 145.0, 292.0),
                Slot::scalar(FieldId::Prowess, 103.0, 330.0),
                Slot::scalar(FieldId::Actions, 190.0, 330.0),
                Slot::scalar(FieldId::PhysicalValue, 190.0, 393.0),
                Slot::scalar(FieldId::PhysicalAffliction, 106.0, 410.0),
                Slot::scalar(FieldId::DesireValue, 190.0, 413.0),
                Slot::scalar(FieldId::DesireAffliction, 106.0, 430.0),
                Slot::scalar(FieldId::DriveValue, 190.0, 433.0),
                Slot::scalar(FieldId::DriveAffliction, 106.0, 450.0),
                Slot::scalar(FieldId::Experience, 103.0, 571.0),
                Slot::Skills(SkillsSlot {
                    rows: ListConfig {
                        x: 230.0,
                        y: 147.0,
                        y_offset: 64.5,
                        wrap_at: 6,
                        wrap_x_offset: 185.0,
                        font_size: DEFAULT_FONT_SIZE,
                        indent: 0.0,
                    },
                    rating: Offset { dx: 136.0, dy: -2.5 },
                    values: SubList {
                        dx: 25.0,
                        dy: 12.0,
                        step: 9.0,
                        font_size: 8.0,
                    },
                }),
                Slot::list(ListId::Qualities, narrative),
                Slot::list(ListId::Impediments, narrative.at_x(198.0)),
                Slot::list(ListId::Features, narrative.at_x(382.0)),
            ],
        };

        let back = PageLayout {
            page: 1,
            slots: vec![
                Slot::list(ListId::Wounds, injuries),
                Slot::list(ListId::Armour, injuries.at_x(357.0)),
                Slot::Weapons(WeaponRows {
                    x: 38.0,
                    y: 411.0,
                    row_height: 11.0,
                    font_size: 9.0,
                    columns: vec![
                        WeaponColumn { field: WeaponField::Name, dx: 0.0 },
                        WeaponColumn { field: WeaponField::Rating, dx: 128.0 },
                        WeaponColumn { field: WeaponField::Damage, dx: 198.0 },
                        WeaponColumn { field: WeaponField::Range, dx: 241.0 },
                        WeaponColumn { field: WeaponField::Ammo, dx: 295.0 },
                        WeaponColumn { field: WeaponField::Cost, dx: 323.0 },
                        WeaponColumn { field: WeaponField::AmmoCost, dx: 363.0 },
                        WeaponColumn { field: WeaponField::Features, dx: 450.0 },
                    ],
                }),
                Slot::list(
                    ListId::Possessions,
                    ListConfig {
                        x: 10.0,
                        y: 604.0,
                        y_offset: 11.0,
                        font_size: 9.0,
                        ..narrative
                    },
                ),
            ],
        };

        SheetLayout {
            font: StandardFont::TimesBold,
            pages: vec![front, back],
        }
    }

    /// Decode a slot table from JSON text.
    pub fn from_json(json: &str) -> Result<SheetLayout, SheetError> {
        serde_json::from_str(json).map_err(|e| SheetError::layout_parse("<memory>", e))
    }

    pub fn to_json_pretty(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Highest page index the table refers to.
    pub fn max_page(&self) -> Option<usize> {
        self.pages.iter().map(|p| p.page).max()
    }

    /// Check the table against the record schema.
    ///
    /// Every id must resolve, every schema field must have exactly one slot,
    /// and every number must be usable by the coordinate policy.
    pub fn validate(&self) -> Result<(), SheetError> {
        let mut fields: HashMap<FieldId, usize> = HashMap::new();
        let mut lists: HashMap<ListId, usize> = HashMap::new();
        let mut skills: Option<usize> = None;
        let mut weapons: Option<usize> = None;

        for page in &self.pages {
            for slot in &page.slots {
                match slot {
                    Slot::Scalar(s) => {
                        let field = resolve_field(&s.field, page.page)?;
                        check_point(field.as_str(), s.x, s.y)?;
                        check_font_size(field.as_str(), s.font_size)?;
                        if fields.insert(field, page.page).is_some() {
                            return Err(duplicate(field.as_str(), page.page));
                        }
                    }
                    Slot::List(l) => {
                        let list = resolve_list(&l.list, page.page)?;
                        check_list(list.as_str(), &l.config)?;
                        if lists.insert(list, page.page).is_some() {
                            return Err(duplicate(list.as_str(), page.page));
                        }
                    }
                    Slot::Skills(s) => {
                        check_list("skills", &s.rows)?;
                        check_point("skills.rating", s.rating.dx, s.rating.dy)?;
                        check_point("skills.values", s.values.dx, s.values.dy)?;
                        check_number("skills.values", s.values.step)?;
                        check_font_size("skills.values", s.values.font_size)?;
                        if skills.replace(page.page).is_some() {
                            return Err(duplicate("skills", page.page));
                        }
                    }
                    Slot::Weapons(w) => {
                        check_point("weapons", w.x, w.y)?;
                        check_number("weapons", w.row_height)?;
                        check_font_size("weapons", w.font_size)?;
                        for column in &w.columns {
                            check_number("weapons", column.dx)?;
                        }
                        if weapons.replace(page.page).is_some() {
                            return Err(duplicate("weapons", page.page));
                        }
                    }
                }
            }
        }

        if let Some(field) = FieldId::ALL.iter().find(|f| !fields.contains_key(*f)) {
            return Err(incomplete(field.as_str()));
        }
        if let Some(list) = ListId::ALL.iter().find(|l| !lists.contains_key(*l)) {
            return Err(incomplete(list.as_str()));
        }
        if skills.is_none() {
            return Err(incomplete("skills"));
        }
        if weapons.is_none() {
            return Err(incomplete("weapons"));
        }
        Ok(())
    }
}

/// Read a slot table from a JSON file.
pub fn load_layout(path: &Path) -> Result<SheetLayout, SheetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SheetError::LayoutRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| SheetError::layout_parse(path, e))
}

// ─── Resolution & checks ────────────────────────────────────────

pub(crate) fn resolve_field(id: &str, page: usize) -> Result<FieldId, SheetError> {
    id.parse::<FieldId>().map_err(|_| SheetError::UnknownField {
        field: id.to_string(),
        page: Some(page),
    })
}

pub(crate) fn resolve_list(id: &str, page: usize) -> Result<ListId, SheetError> {
    id.parse::<ListId>().map_err(|_| SheetError::UnknownField {
        field: id.to_string(),
        page: Some(page),
    })
}

fn duplicate(field: &str, page: usize) -> SheetError {
    SheetError::DuplicateSlot {
        field: field.to_string(),
        page,
    }
}

fn incomplete(field: &str) -> SheetError {
    SheetError::IncompleteLayout {
        field: field.to_string(),
    }
}

fn check_number(what: &str, value: f64) -> Result<(), SheetError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SheetError::InvalidLayout(format!(
            "`{}` has a non-finite value {}",
            what, value
        )))
    }
}

fn check_point(what: &str, x: f64, y: f64) -> Result<(), SheetError> {
    check_number(what, x)?;
    check_number(what, y)
}

fn check_font_size(what: &str, size: f64) -> Result<(), SheetError> {
    check_number(what, size)?;
    if size > 0.0 {
        Ok(())
    } else {
        Err(SheetError::InvalidLayout(format!(
            "`{}` has font size {}, must be positive",
            what, size
        )))
    }
}

fn check_list(what: &str, config: &ListConfig) -> Result<(), SheetError> {
    check_point(what, config.x, config.y)?;
    check_number(what, config.y_offset)?;
    check_number(what, config.wrap_x_offset)?;
    check_number(what, config.indent)?;
    check_font_size(what, config.font_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_slot(layout: &mut SheetLayout, pred: impl Fn(&Slot) -> bool) {
        for page in &mut layout.pages {
            page.slots.retain(|s| !pred(s));
        }
    }

    #[test]
    fn test_standard_layout_is_valid() {
        SheetLayout::standard().validate().unwrap();
    }

    #[test]
    fn test_standard_layout_uses_two_pages() {
        let layout = SheetLayout::standard();
        assert_eq!(layout.max_page(), Some(1));
        assert_eq!(layout.font, StandardFont::TimesBold);
    }

    #[test]
    fn test_missing_scalar_slot_is_incomplete() {
        let mut layout = SheetLayout::standard();
        without_slot(&mut layout, |s| {
            matches!(s, Slot::Scalar(slot) if slot.field == "calling")
        });
        let err = layout.validate().unwrap_err();
        assert!(matches!(err, SheetError::IncompleteLayout { ref field } if field == "calling"));
    }

    #[test]
    fn test_missing_weapons_slot_is_incomplete() {
        let mut layout = SheetLayout::standard();
        without_slot(&mut layout, |s| matches!(s, Slot::Weapons(_)));
        let err = layout.validate().unwrap_err();
        assert!(matches!(err, SheetError::IncompleteLayout { ref field } if field == "weapons"));
    }

    #[test]
    fn test_unknown_field_reports_page() {
        let mut layout = SheetLayout::standard();
        layout.pages[1].slots.push(Slot::Scalar(ScalarSlot {
            field: "luck".to_string(),
            x: 1.0,
            y: 1.0,
            font_size: DEFAULT_FONT_SIZE,
        }));
        let err = layout.validate().unwrap_err();
        assert!(matches!(
            err,
            SheetError::UnknownField { ref field, page: Some(1) } if field == "luck"
        ));
    }

    #[test]
    fn test_unknown_list_reports_page() {
        let mut layout = SheetLayout::standard();
        let config = ListConfig {
            x: 0.0,
            y: 0.0,
            y_offset: 10.0,
            wrap_at: 3,
            wrap_x_offset: 50.0,
            font_size: 8.0,
            indent: 0.0,
        };
        layout.pages[0].slots.push(Slot::List(ListSlot {
            list: "spells".to_string(),
            config,
        }));
        assert!(matches!(
            layout.validate(),
            Err(SheetError::UnknownField { page: Some(0), .. })
        ));
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut layout = SheetLayout::standard();
        layout.pages[1].slots.push(Slot::scalar(FieldId::Name, 10.0, 10.0));
        let err = layout.validate().unwrap_err();
        assert!(matches!(
            err,
            SheetError::DuplicateSlot { ref field, page: 1 } if field == "name"
        ));
    }

    #[test]
    fn test_non_positive_font_size_rejected() {
        let mut layout = SheetLayout::standard();
        if let Slot::Scalar(slot) = &mut layout.pages[0].slots[0] {
            slot.font_size = 0.0;
        }
        assert!(matches!(layout.validate(), Err(SheetError::InvalidLayout(_))));
    }

    #[test]
    fn test_json_round_trip_keeps_table() {
        let layout = SheetLayout::standard();
        let json = layout.to_json_pretty();
        assert!(json.contains("\"kind\": \"scalar\""));
        assert!(json.contains("\"wrapAt\": 12"));
        assert_eq!(SheetLayout::from_json(&json).unwrap(), layout);
    }

    #[test]
    fn test_json_defaults() {
        let layout = SheetLayout::from_json(
            r#"{ "pages": [ { "page": 0, "slots": [
                { "kind": "scalar", "field": "name", "x": 5, "y": 6 },
                { "kind": "list", "list": "wounds",
                  "config": { "x": 1, "y": 2, "yOffset": 10 } }
            ] } ] }"#,
        )
        .unwrap();
        assert_eq!(layout.font, StandardFont::TimesBold);
        match &layout.pages[0].slots[0] {
            Slot::Scalar(s) => assert_eq!(s.font_size, DEFAULT_FONT_SIZE),
            other => panic!("expected scalar slot, got {:?}", other),
        }
        match &layout.pages[0].slots[1] {
            Slot::List(l) => {
                assert_eq!(l.config.wrap_at, usize::MAX);
                assert_eq!(l.config.indent, 0.0);
            }
            other => panic!("expected list slot, got {:?}", other),
        }
    }

    #[test]
    fn test_weapon_field_text() {
        let weapon = Weapon {
            name: "Crossbow".to_string(),
            damage: 3,
            range: 120,
            ..Default::default()
        };
        assert_eq!(WeaponField::Name.text(&weapon), "Crossbow");
        assert_eq!(WeaponField::Damage.text(&weapon), "+ 3");
        assert_eq!(WeaponField::Range.text(&weapon), "120 feet");
        assert_eq!(WeaponField::Cost.text(&weapon), "");
    }
}
