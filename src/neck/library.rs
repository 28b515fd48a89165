//! Theory reference data: keys, scales, modes and positions.
//!
//! Diagrams and projects refer to library items by id. Lookups of unknown
//! ids resolve to nothing rather than failing.

use serde::{Deserialize, Serialize};

/// Category of a library item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryItemType {
    Scale,
    Mode,
    Shape,
    Position,
    Key,
}

impl LibraryItemType {
    /// Returns the wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryItemType::Scale => "scale",
            LibraryItemType::Mode => "mode",
            LibraryItemType::Shape => "shape",
            LibraryItemType::Position => "position",
            LibraryItemType::Key => "key",
        }
    }
}

/// One entry of the theory library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: LibraryItemType,
    pub name: String,
    /// Semitone offsets from the root, for scales and modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LibraryItem {
    fn seeded(item_type: LibraryItemType, name: &str, intervals: &[i32]) -> Self {
        // Sharps are spelled out so C and C# get distinct ids
        let slug = slugify(&name.replace('#', "-sharp"));
        Self {
            id: format!("default:{}:{}", item_type.as_str(), slug),
            item_type,
            name: name.to_string(),
            intervals: Some(intervals.to_vec()),
            description: None,
        }
    }
}

/// Lower-cases and collapses every run of non-alphanumerics to `-`.
///
/// # Examples
///
/// ```
/// use neckstudio::neck::slugify;
///
/// assert_eq!(slugify("  Major (Ionian) "), "major-ionian");
/// ```
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Builds the library shipped with the studio.
pub fn default_library() -> Vec<LibraryItem> {
    use LibraryItemType::{Key, Mode, Position, Scale};

    let mut items = vec![
        LibraryItem::seeded(Scale, "Major (Ionian)", &[0, 2, 4, 5, 7, 9, 11]),
        LibraryItem::seeded(Scale, "Natural Minor", &[0, 2, 3, 5, 7, 8, 10]),
        LibraryItem::seeded(Scale, "Harmonic Minor", &[0, 2, 3, 5, 7, 8, 11]),
        LibraryItem::seeded(Scale, "Melodic Minor", &[0, 2, 3, 5, 7, 9, 11]),
        LibraryItem::seeded(Scale, "Major Pentatonic", &[0, 2, 4, 7, 9]),
        LibraryItem::seeded(Scale, "Minor Pentatonic", &[0, 3, 5, 7, 10]),
        LibraryItem::seeded(Scale, "Blues", &[0, 3, 5, 6, 7, 10]),
        LibraryItem::seeded(Mode, "Dorian", &[0, 2, 3, 5, 7, 9, 10]),
        LibraryItem::seeded(Mode, "Phrygian", &[0, 1, 3, 5, 7, 8, 10]),
        LibraryItem::seeded(Mode, "Lydian", &[0, 2, 4, 6, 7, 9, 11]),
        LibraryItem::seeded(Mode, "Mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
        LibraryItem::seeded(Mode, "Locrian", &[0, 1, 3, 5, 6, 8, 10]),
    ];
    for name in [
        "Position 1",
        "Position 2",
        "Position 3",
        "Position 4",
        "Position 5",
        "1-12",
        "12-24",
        "Whole Neck",
    ] {
        items.push(LibraryItem::seeded(Position, name, &[]));
    }
    for name in super::NOTE_NAMES {
        items.push(LibraryItem::seeded(Key, name, &[]));
    }
    items
}

/// Names resolved from a (key, scale, position) selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TheorySelection<'a> {
    pub key_name: Option<&'a str>,
    pub intervals: Option<&'a [i32]>,
    pub position_name: Option<&'a str>,
}

/// An in-memory, searchable set of library items.
#[derive(Debug, Clone)]
pub struct Library {
    items: Vec<LibraryItem>,
}

impl Library {
    /// Creates a library from items.
    pub fn new(items: Vec<LibraryItem>) -> Self {
        Self { items }
    }

    /// Returns all items.
    pub fn items(&self) -> &[LibraryItem] {
        &self.items
    }

    /// Looks up an item by id.
    pub fn get(&self, id: &str) -> Option<&LibraryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Returns the name of an item, if the id resolves.
    pub fn name_of(&self, id: Option<&str>) -> Option<&str> {
        self.get(id?).map(|item| item.name.as_str())
    }

    /// Adds an item, replacing any item with the same id.
    pub fn upsert(&mut self, item: LibraryItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Finds items whose name contains `query` (case-insensitive), optionally
    /// restricted to one type, sorted by name.
    pub fn search(&self, query: &str, item_type: Option<LibraryItemType>) -> Vec<&LibraryItem> {
        let needle = query.trim().to_lowercase();
        let mut found: Vec<&LibraryItem> = self
            .items
            .iter()
            .filter(|item| item_type.is_none_or(|t| item.item_type == t))
            .filter(|item| needle.is_empty() || item.name.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Resolves a key/scale/position selection into names and intervals.
    pub fn resolve(
        &self,
        key_id: Option<&str>,
        scale_id: Option<&str>,
        position_id: Option<&str>,
    ) -> TheorySelection<'_> {
        TheorySelection {
            key_name: self.name_of(key_id),
            intervals: scale_id
                .and_then(|id| self.get(id))
                .and_then(|item| item.intervals.as_deref()),
            position_name: self.name_of(position_id),
        }
    }

    /// Joins the resolved names of a selection with " - ".
    pub fn theory_name(
        &self,
        key_id: Option<&str>,
        scale_id: Option<&str>,
        position_id: Option<&str>,
    ) -> String {
        [key_id, scale_id, position_id]
            .into_iter()
            .filter_map(|id| self.name_of(id))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(default_library())
    }
}
