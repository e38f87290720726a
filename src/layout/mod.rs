//! # Page Overlay Driver
//!
//! Walks the slot table and turns a record into draw commands, grouped by
//! template page. This is where the coordinate policy and the list engine
//! meet the record; no file is touched here.
//!
//! The output has one [`PageOverlay`] per template page, in page order.
//! Pages the table does not mention come back with no commands and are
//! passed through untouched by the writer.

pub mod list;
pub mod position;
pub mod slots;

use tracing::debug;

use crate::error::SheetError;
use crate::font::StandardFont;
use crate::model::Record;

pub use list::{layout, layout_skills, layout_weapons, ListLayout};
pub use position::{list_item_position, Placement, Position};
pub use slots::{ListConfig, PageLayout, SheetLayout, Slot};

use slots::{resolve_field, resolve_list};

/// One string to draw at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Which record field this came from, e.g. `skills[2].values[0]`.
    pub field: String,
    pub text: String,
    /// Top-left origin, y down.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font: StandardFont,
}

/// Everything drawn on one template page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOverlay {
    pub page: usize,
    pub commands: Vec<DrawCommand>,
}

impl PageOverlay {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub struct OverlayEngine<'a> {
    layout: &'a SheetLayout,
}

impl<'a> OverlayEngine<'a> {
    pub fn new(layout: &'a SheetLayout) -> Self {
        Self { layout }
    }

    /// Build the draw commands for `record` on a template of `page_count` pages.
    ///
    /// A table that refers to a page the template lacks is rejected before
    /// any command is built.
    pub fn overlay(&self, record: &Record, page_count: usize) -> Result<Vec<PageOverlay>, SheetError> {
        if let Some(page) = self.layout.max_page() {
            if page >= page_count {
                return Err(SheetError::TemplateMismatch { page, page_count });
            }
        }

        let mut pages: Vec<PageOverlay> = (0..page_count)
            .map(|page| PageOverlay {
                page,
                commands: Vec::new(),
            })
            .collect();

        for page_layout in &self.layout.pages {
            let overlay = &mut pages[page_layout.page];
            let before = overlay.commands.len();
            for slot in &page_layout.slots {
                self.place_slot(record, page_layout.page, slot, &mut overlay.commands)?;
            }
            debug!(
                page = page_layout.page,
                slots = page_layout.slots.len(),
                commands = overlay.commands.len() - before,
                "laid out page"
            );
        }

        Ok(pages)
    }

    fn place_slot(
        &self,
        record: &Record,
        page: usize,
        slot: &Slot,
        out: &mut Vec<DrawCommand>,
    ) -> Result<(), SheetError> {
        match slot {
            Slot::Scalar(s) => {
                let field = resolve_field(&s.field, page)?;
                let at = s.placement(page);
                out.push(self.command(
                    field.as_str().to_string(),
                    record.scalar_text(field),
                    at.x,
                    at.y,
                    at.font_size,
                ));
            }

            Slot::List(l) => {
                let list = resolve_list(&l.list, page)?;
                for (index, (item, at)) in layout(record.list(list), &l.config).enumerate() {
                    out.push(self.command(
                        format!("{}[{}]", list, index),
                        item.clone(),
                        at.x + l.config.indent,
                        at.y,
                        at.font_size,
                    ));
                }
            }

            Slot::Skills(s) => {
                for (index, placed) in layout_skills(&record.skills, s).enumerate() {
                    let name = placed.name;
                    out.push(self.command(
                        format!("skills[{}].name", index),
                        placed.skill.name.clone(),
                        name.x + s.rows.indent,
                        name.y,
                        name.font_size,
                    ));
                    let rating = placed.rating;
                    out.push(self.command(
                        format!("skills[{}].rating", index),
                        placed.skill.rating.to_string(),
                        rating.x,
                        rating.y,
                        rating.font_size,
                    ));
                    for (value_index, (value, at)) in placed.values.enumerate() {
                        out.push(self.command(
                            format!("skills[{}].values[{}]", index, value_index),
                            value.clone(),
                            at.x,
                            at.y,
                            at.font_size,
                        ));
                    }
                }
            }

            Slot::Weapons(w) => {
                for (index, row) in layout_weapons(&record.weapons, w).enumerate() {
                    for (field, text, at) in row.cells() {
                        out.push(self.command(
                            format!("weapons[{}].{}", index, field.as_str()),
                            text,
                            at.x,
                            at.y,
                            at.font_size,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn command(&self, field: String, text: String, x: f64, y: f64, font_size: f64) -> DrawCommand {
        DrawCommand {
            field,
            text,
            x,
            y,
            font_size,
            font: self.layout.font,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Skill, Weapon};

    fn find<'a>(pages: &'a [PageOverlay], field: &str) -> &'a DrawCommand {
        pages
            .iter()
            .flat_map(|p| &p.commands)
            .find(|c| c.field == field)
            .unwrap_or_else(|| panic!("no command for {}", field))
    }

    fn page_of(pages: &[PageOverlay], field: &str) -> usize {
        pages
            .iter()
            .find(|p| p.commands.iter().any(|c| c.field == field))
            .map(|p| p.page)
            .unwrap()
    }

    #[test]
    fn test_empty_record_still_places_every_scalar() {
        let layout = SheetLayout::standard();
        let pages = OverlayEngine::new(&layout).overlay(&Record::default(), 2).unwrap();
        assert_eq!(pages.len(), 2);
        // 20 scalar slots, no list entries.
        assert_eq!(pages[0].commands.len(), 20);
        assert!(pages[1].is_empty());
        let calling = find(&pages, "calling");
        assert_eq!(calling.text, "");
        assert_eq!((calling.x, calling.y), (302.0, 60.0));
        assert_eq!(find(&pages, "age").text, "0");
    }

    #[test]
    fn test_fields_land_on_their_pages() {
        let mut record = Record::default();
        record.name = "Ysolde".to_string();
        record.wounds = vec!["Broken rib".to_string()];
        record.possessions = vec!["Rope".to_string()];
        record.weapons = vec![Weapon::default()];
        let layout = SheetLayout::standard();
        let pages = OverlayEngine::new(&layout).overlay(&record, 3).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(page_of(&pages, "name"), 0);
        assert_eq!(page_of(&pages, "wounds[0]"), 1);
        assert_eq!(page_of(&pages, "possessions[0]"), 1);
        assert_eq!(page_of(&pages, "weapons[0].name"), 1);
        assert!(pages[2].is_empty(), "pages without slots pass through");
    }

    #[test]
    fn test_qualities_get_list_indent() {
        let mut record = Record::default();
        record.qualities = vec!["Brave".into(), "Loyal".into(), "Curious".into()];
        let layout = SheetLayout::standard();
        let pages = OverlayEngine::new(&layout).overlay(&record, 2).unwrap();
        for (i, text) in ["Brave", "Loyal", "Curious"].iter().enumerate() {
            let cmd = find(&pages, &format!("qualities[{}]", i));
            assert_eq!(cmd.text, *text);
            assert_eq!(cmd.x, 17.0 + 25.0);
            assert_eq!(cmd.y, 628.0 + i as f64 * 10.0);
            assert_eq!(cmd.font_size, 8.0);
            assert_eq!(cmd.font, StandardFont::TimesBold);
        }
    }

    #[test]
    fn test_skill_commands() {
        let mut record = Record::default();
        record.skills = vec![Skill {
            name: "Stealth".to_string(),
            rating: 3,
            values: vec!["Shadows".to_string()],
        }];
        let layout = SheetLayout::standard();
        let pages = OverlayEngine::new(&layout).overlay(&record, 2).unwrap();
        let name = find(&pages, "skills[0].name");
        assert_eq!((name.x, name.y, name.font_size), (230.0, 147.0, 10.0));
        let rating = find(&pages, "skills[0].rating");
        assert_eq!(rating.text, "3");
        assert_eq!((rating.x, rating.y), (366.0, 144.5));
        let value = find(&pages, "skills[0].values[0]");
        assert_eq!(value.text, "Shadows");
        assert_eq!((value.x, value.y, value.font_size), (255.0, 159.0, 8.0));
    }

    #[test]
    fn test_weapon_commands() {
        let mut record = Record::default();
        record.weapons = vec![
            Weapon {
                name: "Sabre".to_string(),
                damage: 2,
                ..Default::default()
            },
            Weapon {
                name: "Musket".to_string(),
                range: 100,
                ammo: 12,
                cost: "30s".to_string(),
                ..Default::default()
            },
        ];
        let layout = SheetLayout::standard();
        let pages = OverlayEngine::new(&layout).overlay(&record, 2).unwrap();
        assert_eq!(find(&pages, "weapons[0].damage").text, "+ 2");
        let range = find(&pages, "weapons[1].range");
        assert_eq!(range.text, "100 feet");
        assert_eq!((range.x, range.y, range.font_size), (279.0, 422.0, 9.0));
        assert_eq!(find(&pages, "weapons[1].cost").x, 38.0 + 323.0);
        assert_eq!(pages[1].commands.len(), 16);
    }

    #[test]
    fn test_short_template_is_mismatch() {
        let mut record = Record::default();
        record.name = "Ysolde".to_string();
        let layout = SheetLayout::standard();
        let err = OverlayEngine::new(&layout).overlay(&record, 1).unwrap_err();
        assert!(matches!(
            err,
            SheetError::TemplateMismatch {
                page: 1,
                page_count: 1
            }
        ));
    }

    #[test]
    fn test_unknown_field_surfaces_with_page() {
        let mut layout = SheetLayout::standard();
        if let Slot::Scalar(s) = &mut layout.pages[0].slots[0] {
            s.field = "nickname".to_string();
        }
        let err = OverlayEngine::new(&layout)
            .overlay(&Record::default(), 2)
            .unwrap_err();
        assert!(matches!(
            err,
            SheetError::UnknownField { ref field, page: Some(0) } if field == "nickname"
        ));
    }

    #[test]
    fn test_moving_a_group_is_a_data_change() {
        let mut layout = SheetLayout::standard();
        let wounds = layout.pages[1].slots.remove(0);
        layout.pages[0].slots.push(wounds);
        let mut record = Record::default();
        record.wounds = vec!["Bruised".to_string()];
        let pages = OverlayEngine::new(&layout).overlay(&record, 2).unwrap();
        assert_eq!(page_of(&pages, "wounds[0]"), 0);
    }
}
