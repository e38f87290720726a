//! # Coordinate Policy
//!
//! Pure arithmetic from a slot plus an index to a point on the page. No
//! text metrics are involved: the sheet's printable areas are fixed, so a
//! list wraps after a fixed row count rather than when it runs out of room.

use crate::error::SheetError;
use crate::layout::slots::{
    resolve_field, ListConfig, Offset, ScalarSlot, SheetLayout, Slot, SubList, WeaponColumn,
    WeaponRows,
};

/// A point on a page plus the size to draw at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// A [`Position`] tied to a template page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

impl ScalarSlot {
    pub fn placement(&self, page: usize) -> Placement {
        Placement {
            page,
            x: self.x,
            y: self.y,
            font_size: self.font_size,
        }
    }
}

impl SheetLayout {
    /// Where a scalar field is drawn.
    ///
    /// Fails with `UnknownField` for an id outside the record schema, and
    /// with `IncompleteLayout` for a known field the table does not place.
    pub fn scalar_position(&self, field_id: &str) -> Result<Placement, SheetError> {
        let field = field_id.parse::<crate::model::FieldId>()?;
        for page in &self.pages {
            for slot in &page.slots {
                if let Slot::Scalar(s) = slot {
                    if resolve_field(&s.field, page.page).ok() == Some(field) {
                        return Ok(s.placement(page.page));
                    }
                }
            }
        }
        Err(SheetError::IncompleteLayout {
            field: field.as_str().to_string(),
        })
    }
}

/// Row origin of list entry `index`.
///
/// Entries up to and including `wrap_at` run down the first column. Later
/// entries move right by `wrap_x_offset` and restart at the top. There is
/// only one wrap: a list longer than two columns runs off the printable
/// area, which is the layout author's concern.
pub fn list_item_position(config: &ListConfig, index: usize) -> Position {
    let (x, row) = if index <= config.wrap_at {
        (config.x, index)
    } else {
        (config.x + config.wrap_x_offset, index - config.wrap_at - 1)
    };
    Position {
        x,
        y: config.y + row as f64 * config.y_offset,
        font_size: config.font_size,
    }
}

/// Row origin of weapon `index`. Weapon rows never wrap.
pub fn weapon_row_position(rows: &WeaponRows, index: usize) -> Position {
    Position {
        x: rows.x,
        y: rows.y + index as f64 * rows.row_height,
        font_size: rows.font_size,
    }
}

impl WeaponColumn {
    pub fn position(&self, row: Position) -> Position {
        Position {
            x: row.x + self.dx,
            ..row
        }
    }
}

impl Offset {
    pub fn apply(&self, at: Position) -> Position {
        Position {
            x: at.x + self.dx,
            y: at.y + self.dy,
            font_size: at.font_size,
        }
    }
}

impl SubList {
    /// A single-column list config anchored to `row`.
    pub fn config_at(&self, row: Position) -> ListConfig {
        ListConfig {
            x: row.x + self.dx,
            y: row.y + self.dy,
            y_offset: self.step,
            wrap_at: usize::MAX,
            wrap_x_offset: 0.0,
            font_size: self.font_size,
            indent: 0.0,
        }
    }
}
