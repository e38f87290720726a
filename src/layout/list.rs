//! # List Layout Engine
//!
//! Lazy, restartable sequences of `(item, position)` pairs. Nothing here
//! allocates per item or touches the items themselves; cloning a layout
//! starts the walk over.

use std::iter::Enumerate;
use std::slice;

use crate::layout::position::{list_item_position, weapon_row_position, Position};
use crate::layout::slots::{ListConfig, SkillsSlot, WeaponColumn, WeaponField, WeaponRows};
use crate::model::{Skill, Weapon};

/// Positions for a list under a [`ListConfig`], in input order.
#[derive(Debug)]
pub struct ListLayout<'a, T> {
    items: Enumerate<slice::Iter<'a, T>>,
    config: ListConfig,
}

/// Lay out `items` under `config`. The empty list yields nothing.
pub fn layout<'a, T>(items: &'a [T], config: &ListConfig) -> ListLayout<'a, T> {
    ListLayout {
        items: items.iter().enumerate(),
        config: *config,
    }
}

impl<T> Clone for ListLayout<'_, T> {
    fn clone(&self) -> Self {
        ListLayout {
            items: self.items.clone(),
            config: self.config,
        }
    }
}

impl<'a, T> Iterator for ListLayout<'a, T> {
    type Item = (&'a T, Position);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, item) = self.items.next()?;
        Some((item, list_item_position(&self.config, index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for ListLayout<'_, T> {}

// ─── Skills ─────────────────────────────────────────────────────

/// Where each part of one skill is drawn.
#[derive(Debug, Clone)]
pub struct SkillPlacement<'a> {
    pub skill: &'a Skill,
    pub name: Position,
    pub rating: Position,
    /// Specialisations, numbered from 0 for every skill.
    pub values: ListLayout<'a, String>,
}

#[derive(Debug, Clone)]
pub struct SkillLayout<'a> {
    rows: ListLayout<'a, Skill>,
    slot: &'a SkillsSlot,
}

pub fn layout_skills<'a>(skills: &'a [Skill], slot: &'a SkillsSlot) -> SkillLayout<'a> {
    SkillLayout {
        rows: layout(skills, &slot.rows),
        slot,
    }
}

impl<'a> Iterator for SkillLayout<'a> {
    type Item = SkillPlacement<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (skill, row) = self.rows.next()?;
        Some(SkillPlacement {
            skill,
            name: row,
            rating: self.slot.rating.apply(row),
            values: layout(&skill.values, &self.slot.values.config_at(row)),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for SkillLayout<'_> {}

// ─── Weapons ────────────────────────────────────────────────────

/// One weapon's row in the weapon table.
#[derive(Debug, Clone)]
pub struct WeaponRow<'a> {
    pub weapon: &'a Weapon,
    pub origin: Position,
    columns: &'a [WeaponColumn],
}

impl<'a> WeaponRow<'a> {
    /// Every column of this row: which field, its text, and where it goes.
    pub fn cells(&self) -> impl Iterator<Item = (WeaponField, String, Position)> + 'a {
        let weapon = self.weapon;
        let origin = self.origin;
        self.columns
            .iter()
            .map(move |column| (column.field, column.field.text(weapon), column.position(origin)))
    }
}

#[derive(Debug, Clone)]
pub struct WeaponLayout<'a> {
    weapons: Enumerate<slice::Iter<'a, Weapon>>,
    rows: &'a WeaponRows,
}

pub fn layout_weapons<'a>(weapons: &'a [Weapon], rows: &'a WeaponRows) -> WeaponLayout<'a> {
    WeaponLayout {
        weapons: weapons.iter().enumerate(),
        rows,
    }
}

impl<'a> Iterator for WeaponLayout<'a> {
    type Item = WeaponRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, weapon) = self.weapons.next()?;
        Some(WeaponRow {
            weapon,
            origin: weapon_row_position(self.rows, index),
            columns: &self.rows.columns,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.weapons.size_hint()
    }
}

impl ExactSizeIterator for WeaponLayout<'_> {}
