//! # Record Model
//!
//! The input representation: one character, decoded from JSON. Pure data.
//!
//! Every field is optional. An absent key or an explicit `null` decodes to
//! the zero value (empty string, `0`, empty list), so a half-filled record
//! still renders. List order is significant and is never changed: it decides
//! where each entry lands on the sheet.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SheetError;

/// A complete character record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub player: String,
    #[serde(default, deserialize_with = "nullable")]
    pub calling: String,
    #[serde(default, deserialize_with = "nullable")]
    pub age: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub wealth_rating: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub vitality: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub coordination: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub wit: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub intellect: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub charm: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub will: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub prowess: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub actions: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub experience: i64,

    #[serde(default, deserialize_with = "nullable")]
    pub corruption: Corruption,

    #[serde(default, deserialize_with = "nullable")]
    pub skills: Vec<Skill>,
    #[serde(default, deserialize_with = "nullable")]
    pub qualities: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub impediments: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub wounds: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub armour: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub weapons: Vec<Weapon>,
    #[serde(default, deserialize_with = "nullable")]
    pub possessions: Vec<String>,
}

/// The three corruption tracks. Keys are matched in lowercase; the
/// capitalised spellings are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corruption {
    #[serde(default, alias = "Physical", deserialize_with = "nullable")]
    pub physical: Affliction,
    #[serde(default, alias = "Desire", deserialize_with = "nullable")]
    pub desire: Affliction,
    #[serde(default, alias = "Drive", deserialize_with = "nullable")]
    pub drive: Affliction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affliction {
    #[serde(default, deserialize_with = "nullable")]
    pub affliction: String,
    #[serde(default, deserialize_with = "nullable")]
    pub value: i64,
}

/// A skill line plus the free-text specialisations stacked beneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub damage: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub range: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub ammo: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub cost: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ammo_cost: String,
    #[serde(default, deserialize_with = "nullable")]
    pub features: String,
}

/// Treat an explicit `null` the same as a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Decode a record from JSON text. Errors are reported against `<memory>`.
    pub fn from_json(json: &str) -> Result<Record, SheetError> {
        serde_json::from_str(json).map_err(|e| SheetError::input_parse("<memory>", e))
    }

    /// The text drawn for a scalar field. Integers print in decimal.
    pub fn scalar_text(&self, field: FieldId) -> String {
        match field {
            FieldId::Name => self.name.clone(),
            FieldId::Player => self.player.clone(),
            FieldId::Calling => self.calling.clone(),
            FieldId::Age => self.age.to_string(),
            FieldId::WealthRating => self.wealth_rating.to_string(),
            FieldId::Vitality => self.vitality.to_string(),
            FieldId::Coordination => self.coordination.to_string(),
            FieldId::Wit => self.wit.to_string(),
            FieldId::Intellect => self.intellect.to_string(),
            FieldId::Charm => self.charm.to_string(),
            FieldId::Will => self.will.to_string(),
            FieldId::Prowess => self.prowess.to_string(),
            FieldId::Actions => self.actions.to_string(),
            FieldId::Experience => self.experience.to_string(),
            FieldId::PhysicalAffliction => self.corruption.physical.affliction.clone(),
            FieldId::PhysicalValue => self.corruption.physical.value.to_string(),
            FieldId::DesireAffliction => self.corruption.desire.affliction.clone(),
            FieldId::DesireValue => self.corruption.desire.value.to_string(),
            FieldId::DriveAffliction => self.corruption.drive.affliction.clone(),
            FieldId::DriveValue => self.corruption.drive.value.to_string(),
        }
    }

    pub fn list(&self, list: ListId) -> &[String] {
        match list {
            ListId::Qualities => &self.qualities,
            ListId::Impediments => &self.impediments,
            ListId::Features => &self.features,
            ListId::Wounds => &self.wounds,
            ListId::Armour => &self.armour,
            ListId::Possessions => &self.possessions,
        }
    }
}

/// Read and decode a record file.
pub fn read_record(path: &Path) -> Result<Record, SheetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SheetError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| SheetError::input_parse(path, e))
}

// ─── Field identities ───────────────────────────────────────────

/// Every scalar field the sheet can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Name,
    Player,
    Calling,
    Age,
    WealthRating,
    Vitality,
    Coordination,
    Wit,
    Intellect,
    Charm,
    Will,
    Prowess,
    Actions,
    Experience,
    PhysicalAffliction,
    PhysicalValue,
    DesireAffliction,
    DesireValue,
    DriveAffliction,
    DriveValue,
}

impl FieldId {
    pub const ALL: [FieldId; 20] = [
        FieldId::Name,
        FieldId::Player,
        FieldId::Calling,
        FieldId::Age,
        FieldId::WealthRating,
        FieldId::Vitality,
        FieldId::Coordination,
        FieldId::Wit,
        FieldId::Intellect,
        FieldId::Charm,
        FieldId::Will,
        FieldId::Prowess,
        FieldId::Actions,
        FieldId::Experience,
        FieldId::PhysicalAffliction,
        FieldId::PhysicalValue,
        FieldId::DesireAffliction,
        FieldId::DesireValue,
        FieldId::DriveAffliction,
        FieldId::DriveValue,
    ];

    /// The identity as written in layout tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::Player => "player",
            FieldId::Calling => "calling",
            FieldId::Age => "age",
            FieldId::WealthRating => "wealth_rating",
            FieldId::Vitality => "vitality",
            FieldId::Coordination => "coordination",
            FieldId::Wit => "wit",
            FieldId::Intellect => "intellect",
            FieldId::Charm => "charm",
            FieldId::Will => "will",
            FieldId::Prowess => "prowess",
            FieldId::Actions => "actions",
            FieldId::Experience => "experience",
            FieldId::PhysicalAffliction => "corruption.physical.affliction",
            FieldId::PhysicalValue => "corruption.physical.value",
            FieldId::DesireAffliction => "corruption.desire.affliction",
            FieldId::DesireValue => "corruption.desire.value",
            FieldId::DriveAffliction => "corruption.drive.affliction",
            FieldId::DriveValue => "corruption.drive.value",
        }
    }
}

impl FromStr for FieldId {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SheetError::UnknownField {
                field: s.to_string(),
                page: None,
            })
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The plain string lists. Skills and weapons have their own slot kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListId {
    Qualities,
    Impediments,
    Features,
    Wounds,
    Armour,
    Possessions,
}

impl ListId {
    pub const ALL: [ListId; 6] = [
        ListId::Qualities,
        ListId::Impediments,
        ListId::Features,
        ListId::Wounds,
        ListId::Armour,
        ListId::Possessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListId::Qualities => "qualities",
            ListId::Impediments => "impediments",
            ListId::Features => "features",
            ListId::Wounds => "wounds",
            ListId::Armour => "armour",
            ListId::Possessions => "possessions",
        }
    }
}

impl FromStr for ListId {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListId::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| SheetError::UnknownField {
                field: s.to_string(),
                page: None,
            })
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
