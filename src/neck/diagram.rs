//! Neck diagram tiles.
//!
//! A diagram is one fretboard drawn on the canvas. It owns its instrument
//! config and its toggled notes, and carries weak references (by id) into
//! the theory library.

use super::config::{apply_config_patch, ConfigPatch, NeckConfig};
use super::get_note_index;
use super::note::{LabelMode, Note, Picking};
use super::project::TabId;
use super::serde_helpers::{lenient_f64, lenient_option, lenient_vec};
use super::theory::{classify_note, resolve_label, NoteView, ScaleSet};
use crate::tiling::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default diagram box, also the tiler's column width.
pub const DEFAULT_DIAGRAM_SIZE: Size = Size {
    width: 520.0,
    height: 160.0,
};

/// Unique identifier for a diagram within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(String);

impl DiagramId {
    /// Generates a new unique diagram ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DiagramId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for DiagramId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for DiagramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a diagram participates in canvas layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Auto-tiled into the column grid.
    #[default]
    Grid,
    /// Positioned freely by the user.
    Float,
}

/// One fretboard tile on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeckDiagram {
    pub id: DiagramId,
    pub name: String,

    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub width: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub height: f64,

    /// Kept for format compatibility, always 0.
    #[serde(deserialize_with = "lenient_f64")]
    pub rotation: f64,

    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub layout_mode: Option<LayoutMode>,

    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tab_id: Option<TabId>,

    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_id: Option<String>,
    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scale_id: Option<String>,
    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub position_id: Option<String>,

    pub config: NeckConfig,

    #[serde(deserialize_with = "lenient_vec")]
    pub notes: Vec<Note>,

    #[serde(deserialize_with = "lenient_option_label")]
    pub label_mode: LabelMode,
}

fn lenient_option_label<'de, D>(deserializer: D) -> Result<LabelMode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_option(deserializer)?.unwrap_or_default())
}

impl Default for NeckDiagram {
    fn default() -> Self {
        Self {
            id: DiagramId::new(),
            name: "Neck".to_string(),
            x: 60.0,
            y: 80.0,
            width: DEFAULT_DIAGRAM_SIZE.width,
            height: DEFAULT_DIAGRAM_SIZE.height,
            rotation: 0.0,
            layout_mode: Some(LayoutMode::Grid),
            tab_id: None,
            key_id: None,
            scale_id: None,
            position_id: None,
            config: NeckConfig::default(),
            notes: Vec::new(),
            label_mode: LabelMode::Key,
        }
    }
}

impl NeckDiagram {
    /// Creates a diagram with default size and config.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the layout mode, treating a missing mode as grid.
    pub fn layout(&self) -> LayoutMode {
        self.layout_mode.unwrap_or_default()
    }

    /// Returns true if the diagram is auto-tiled.
    pub fn is_grid(&self) -> bool {
        self.layout() == LayoutMode::Grid
    }

    /// Returns the diagram's bounding box on the canvas.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Returns the note stored at a cell, if any.
    pub fn note_at(&self, string_index: usize, fret: i32) -> Option<&Note> {
        self.notes
            .iter()
            .find(|n| n.string_index == string_index && n.fret == fret)
    }

    /// Toggles the note at a cell.
    ///
    /// In picking mode a cell cycles absent → D → U → absent; in every
    /// other mode it cycles absent → present → absent. Notes are
    /// de-duplicated by cell afterwards.
    pub fn toggle_note(&mut self, string_index: usize, fret: i32) {
        let picking_mode = self.label_mode == LabelMode::Picking;
        let existing = self
            .note_at(string_index, fret)
            .map(|n| (n.id.clone(), n.picking));

        match existing {
            Some((id, Some(Picking::Down))) if picking_mode => {
                for note in self.notes.iter_mut().filter(|n| n.id == id) {
                    note.picking = Some(Picking::Up);
                }
            }
            Some((id, _)) => self.notes.retain(|n| n.id != id),
            None => {
                let note = if picking_mode {
                    Note::with_picking(string_index, fret, Picking::Down)
                } else {
                    Note::new(string_index, fret)
                };
                self.notes.push(note);
            }
        }

        self.notes = normalize_notes(&self.notes);
    }

    /// Applies a config patch.
    pub fn patch_config(&mut self, patch: &ConfigPatch) {
        self.config = apply_config_patch(&self.config, patch);
    }

    /// Computes the pitch class at a cell using the display tuning.
    pub fn note_index_at(&self, string_index: usize, fret: i32) -> Option<u8> {
        get_note_index(
            &self.config.display_tuning(),
            string_index,
            fret,
            self.config.capo,
        )
    }

    /// Computes label and highlight for every stored note.
    ///
    /// # Arguments
    ///
    /// * `root` - Root pitch class of the active key, if any
    /// * `scale` - Active scale set, or None to treat all notes as in-scale
    pub fn note_views(&self, root: Option<u8>, scale: Option<&ScaleSet>) -> Vec<NoteView> {
        let tuning = self.config.display_tuning();
        self.notes
            .iter()
            .map(|note| {
                let note_index =
                    get_note_index(&tuning, note.string_index, note.fret, self.config.capo);
                let mode = note.label_mode.unwrap_or(self.label_mode);
                NoteView {
                    id: note.id.clone(),
                    string_index: note.string_index,
                    fret: note.fret,
                    label: resolve_label(mode, note_index, root, note.picking),
                    highlight: classify_note(&self.config, note_index, root, scale),
                }
            })
            .collect()
    }
}

/// De-duplicates notes by (string, fret).
///
/// The most recently added note for each cell wins. Each cell keeps the
/// position of its first occurrence, so the result is stable under repeated
/// application.
pub fn normalize_notes(notes: &[Note]) -> Vec<Note> {
    let mut slots: HashMap<(usize, i32), usize> = HashMap::with_capacity(notes.len());
    let mut deduped: Vec<Note> = Vec::with_capacity(notes.len());
    for note in notes {
        match slots.get(&note.cell()) {
            Some(&slot) => deduped[slot] = note.clone(),
            None => {
                slots.insert(note.cell(), deduped.len());
                deduped.push(note.clone());
            }
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neck::theory::{build_scale_set, NoteHighlight};
    use crate::neck::NoteId;

    fn six_string(label_mode: LabelMode) -> NeckDiagram {
        NeckDiagram {
            config: NeckConfig::for_strings(6, 15),
            label_mode,
            ..NeckDiagram::new("Test")
        }
    }

    #[test]
    fn test_toggle_two_state() {
        let mut diagram = six_string(LabelMode::Key);
        diagram.toggle_note(1, 3);
        assert_eq!(diagram.notes.len(), 1);
        assert_eq!(diagram.notes[0].picking, None);
        diagram.toggle_note(1, 3);
        assert!(diagram.notes.is_empty());
    }

    #[test]
    fn test_toggle_picking_cycle() {
        let mut diagram = six_string(LabelMode::Picking);
        diagram.toggle_note(0, -1);
        assert_eq!(diagram.notes[0].picking, Some(Picking::Down));
        let id = diagram.notes[0].id.clone();

        diagram.toggle_note(0, -1);
        assert_eq!(diagram.notes.len(), 1);
        assert_eq!(diagram.notes[0].picking, Some(Picking::Up));
        assert_eq!(diagram.notes[0].id, id);

        diagram.toggle_note(0, -1);
        assert!(diagram.notes.is_empty());
    }

    #[test]
    fn test_toggle_removes_unpicked_note_in_picking_mode() {
        let mut diagram = six_string(LabelMode::Picking);
        diagram.notes.push(Note::new(2, 2));
        diagram.toggle_note(2, 2);
        assert!(diagram.notes.is_empty());
    }

    #[test]
    fn test_normalize_notes_last_wins() {
        let mut first = Note::new(0, 1);
        first.id = NoteId::from("a");
        let other = Note::new(1, 1);
        let mut second = Note::new(0, 1);
        second.id = NoteId::from("b");

        let notes = normalize_notes(&[first, other.clone(), second]);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id.as_str(), "b");
        assert_eq!(notes[1], other);
    }

    #[test]
    fn test_normalize_notes_idempotent() {
        let notes: Vec<Note> = (0..20)
            .map(|i| Note::new(i % 3, (i % 4) as i32 - 1))
            .collect();
        let once = normalize_notes(&notes);
        let twice = normalize_notes(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 12);
    }

    #[test]
    fn test_note_views() {
        let mut diagram = six_string(LabelMode::Interval);
        // Open low E and fret value 2 (G) on low E
        diagram.toggle_note(0, -1);
        diagram.toggle_note(0, 2);
        diagram.notes[1].label_mode = Some(LabelMode::Key);

        let scale = build_scale_set(4, &[0, 3, 5, 7, 10]);
        let views = diagram.note_views(Some(4), Some(&scale));
        assert_eq!(views[0].label, "1");
        assert_eq!(views[0].highlight, NoteHighlight::Root);
        assert_eq!(views[1].label, "G");
        assert_eq!(views[1].highlight, NoteHighlight::InScale);
    }

    #[test]
    fn test_lenient_diagram_parse() {
        let diagram: NeckDiagram = serde_json::from_str(
            r#"{"id":"d1","name":"Imported","x":"bad","notes":"nope","layoutMode":"sideways"}"#,
        )
        .unwrap();
        assert_eq!(diagram.id.as_str(), "d1");
        assert_eq!(diagram.x, 0.0);
        assert!(diagram.notes.is_empty());
        assert_eq!(diagram.layout_mode, None);
        assert_eq!(diagram.label_mode, LabelMode::Key);
        assert_eq!(diagram.width, DEFAULT_DIAGRAM_SIZE.width);
    }
}
