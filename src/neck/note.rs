//! Toggled fretboard cells.
//!
//! A note marks one (string, fret) cell of a diagram, optionally carrying a
//! label-mode override and a picking direction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a note, stored as a UUID string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generates a new unique note ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a note's text label is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Note name (C, F#, ...).
    #[default]
    Key,
    /// Interval relative to the root (1, b3, 5, ...).
    Interval,
    /// Picking direction symbol.
    Picking,
}

/// Picking direction for a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Picking {
    #[serde(rename = "D")]
    Down,
    #[serde(rename = "U")]
    Up,
}

impl Picking {
    /// Returns the symbol shown on the fretboard.
    pub fn symbol(self) -> &'static str {
        match self {
            Picking::Down => "D",
            Picking::Up => "U",
        }
    }
}

/// A toggled cell on a neck diagram.
///
/// `fret == -1` is the open string; `0..frets` are fretted cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for this note instance.
    #[serde(default)]
    pub id: NoteId,

    /// Index into the diagram's tuning.
    pub string_index: usize,

    /// Fret cell, -1 for open.
    pub fret: i32,

    /// Free-text label carried through from imported documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Per-note override of the diagram label mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_mode: Option<LabelMode>,

    /// Picking direction, only meaningful in picking mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picking: Option<Picking>,
}

impl Note {
    /// Creates a new note at the given cell with a fresh ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use neckstudio::neck::Note;
    ///
    /// let open_low = Note::new(0, -1);
    /// assert!(open_low.is_open());
    /// ```
    pub fn new(string_index: usize, fret: i32) -> Self {
        Self {
            id: NoteId::new(),
            string_index,
            fret,
            label: None,
            label_mode: None,
            picking: None,
        }
    }

    /// Creates a note with an initial picking direction.
    pub fn with_picking(string_index: usize, fret: i32, picking: Picking) -> Self {
        Self {
            picking: Some(picking),
            ..Self::new(string_index, fret)
        }
    }

    /// Returns the (string, fret) key used for de-duplication.
    pub fn cell(&self) -> (usize, i32) {
        (self.string_index, self.fret)
    }

    /// Returns true if this note is on the open string.
    pub fn is_open(&self) -> bool {
        self.fret < 0
    }

    /// Creates a copy of this note with a new unique ID.
    pub fn duplicate(&self) -> Self {
        Self {
            id: NoteId::new(),
            ..self.clone()
        }
    }
}
