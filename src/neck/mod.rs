//! Fretboard data structures and the pitch arithmetic behind them.
//!
//! This module provides the core types for representing neck diagrams,
//! their notes and instrument configuration, and the projects that group
//! diagrams into tabs. Pitch classes are plain `u8` values in `0..12`
//! where 0 is C.

mod config;
mod diagram;
mod geometry;
mod library;
mod normalize;
mod note;
mod project;
mod serde_helpers;
mod theory;
mod transfer;

pub use config::{
    apply_config_patch, migrate_config, normalize_tuning, standard_tuning, ConfigPatch,
    FretNumberStyle, NeckConfig, TuningPreset, DEFAULT_TUNING_6, DEFAULT_TUNING_7,
    DEFAULT_TUNING_8, DEPRECATED_CONFIG_FIELDS, EIGHT_STRING_PRESETS, FRET_RANGE, STRING_RANGE,
};
pub use diagram::{
    normalize_notes, DiagramId, LayoutMode, NeckDiagram, DEFAULT_DIAGRAM_SIZE,
};
pub use geometry::{
    find_fret_at_x, get_fret_positions, get_string_positions, BoardLayout, Cell,
};
pub use library::{
    default_library, slugify, Library, LibraryItem, LibraryItemType, TheorySelection,
};
pub use normalize::{normalize_imported_diagram, normalize_project_data};
pub use note::{LabelMode, Note, NoteId, Picking};
pub use project::{
    now_timestamp, ProjectData, ProjectRecord, ProjectTab, TabId, DEFAULT_PROJECT_TITLE,
};
pub use theory::{
    build_scale_notes, build_scale_set, get_position_range, position_preset, resolve_label,
    NoteHighlight, NoteView, PositionPreset, PositionRange, ScaleSet,
};
pub use transfer::{
    build_diagram_export, build_page_export, export_file_name, format_export_date,
    import_diagrams, import_pages, parse_project_payload, title_from_file_name, DiagramExport,
    ExportError, ExportMetadata, ImportError, PageExport, PageImport, ParsedPayload,
    EXPORT_VERSION,
};

/// Canonical note names, indexed by pitch class.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Interval labels relative to a root, indexed by semitone distance.
pub const INTERVAL_LABELS: [&str; 12] = [
    "1", "b2", "2", "b3", "3", "4", "#4", "5", "b6", "6", "b7", "7",
];

/// Converts a note name to its pitch class.
///
/// Accepts a letter A-G (either case) optionally followed by `#` or `b`.
/// Surrounding whitespace is ignored.
///
/// # Returns
///
/// Pitch class 0-11, or None for empty or unrecognized input
///
/// # Examples
///
/// ```
/// use neckstudio::neck::note_name_to_index;
///
/// assert_eq!(note_name_to_index("E"), Some(4));
/// assert_eq!(note_name_to_index("Bb"), Some(10));
/// assert_eq!(note_name_to_index("H"), None);
/// ```
pub fn note_name_to_index(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let base: i8 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let offset: i8 = match (chars.next(), chars.next()) {
        (None, _) => 0,
        (Some('#'), None) => 1,
        (Some('b') | Some('B'), None) => -1,
        _ => return None,
    };
    Some((base + offset).rem_euclid(12) as u8)
}

/// Returns the canonical (sharp) name for a pitch class.
pub fn pitch_class_name(index: u8) -> &'static str {
    NOTE_NAMES[(index % 12) as usize]
}

/// Canonicalizes user-entered note text.
///
/// The letter is upper-cased, a `#` is kept, and a `b`/`B` accidental
/// becomes `b`. Anything that does not start with A-G is upper-cased as-is.
pub fn normalize_note_name(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let letter = first.to_ascii_uppercase();
    if !('A'..='G').contains(&letter) {
        return trimmed.to_uppercase();
    }
    match chars.next() {
        Some('#') => format!("{letter}#"),
        Some('b') | Some('B') => format!("{letter}b"),
        _ => letter.to_string(),
    }
}

/// Returns the interval label of `note_index` measured from `root_index`.
///
/// # Examples
///
/// ```
/// use neckstudio::neck::get_interval_label;
///
/// assert_eq!(get_interval_label(4, 7), "b3");
/// assert_eq!(get_interval_label(0, 7), "5");
/// ```
pub fn get_interval_label(root_index: u8, note_index: u8) -> &'static str {
    let interval = (note_index as i16 - root_index as i16).rem_euclid(12);
    INTERVAL_LABELS[interval as usize]
}

/// Computes the pitch class sounding at a cell.
///
/// Fret `-1` is the open string. Fret `0` is the first fretted semitone
/// above the open string, so a fretted cell sounds `fret + 1` semitones
/// above open, plus the capo.
///
/// # Returns
///
/// Pitch class 0-11, or None if the string has no recognizable tuning
pub fn get_note_index(tuning: &[String], string_index: usize, fret: i32, capo: u32) -> Option<u8> {
    let open = note_name_to_index(tuning.get(string_index)?)?;
    let fret_offset = if fret < 0 { 0 } else { fret as i64 + 1 };
    Some((open as i64 + fret_offset + capo as i64).rem_euclid(12) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_note_name_to_index() {
        assert_eq!(note_name_to_index("C"), Some(0));
        assert_eq!(note_name_to_index("F#"), Some(6));
        assert_eq!(note_name_to_index("Gb"), Some(6));
        assert_eq!(note_name_to_index(" a "), Some(9));
        assert_eq!(note_name_to_index("Cb"), Some(11));
        assert_eq!(note_name_to_index(""), None);
        assert_eq!(note_name_to_index("X"), None);
        assert_eq!(note_name_to_index("C##"), None);
    }

    #[test]
    fn test_note_name_uppercase_flat() {
        assert_eq!(note_name_to_index("BB"), Some(10));
        assert_eq!(note_name_to_index("EB"), Some(3));
        assert_eq!(note_name_to_index("bb"), Some(10));
        // Agrees with what the normalizer produces
        for raw in ["BB", "eB", "Ab"] {
            assert_eq!(
                note_name_to_index(raw),
                note_name_to_index(&normalize_note_name(raw))
            );
        }
    }

    #[test]
    fn test_canonical_names_are_stable() {
        for (i, name) in NOTE_NAMES.iter().enumerate() {
            assert_eq!(note_name_to_index(name), Some(i as u8));
            assert_eq!(pitch_class_name(i as u8), *name);
        }
    }

    #[test]
    fn test_unison_interval() {
        for i in 0..12 {
            assert_eq!(get_interval_label(i, i), "1");
        }
        assert_eq!(get_interval_label(9, 4), "5");
        assert_eq!(get_interval_label(4, 3), "7");
    }

    #[test]
    fn test_normalize_note_name() {
        assert_eq!(normalize_note_name(" f# "), "F#");
        assert_eq!(normalize_note_name("bB"), "Bb");
        assert_eq!(normalize_note_name("e"), "E");
        assert_eq!(normalize_note_name("x1"), "X1");
        assert_eq!(normalize_note_name("  "), "");
    }

    #[test]
    fn test_fret_offset_encoding() {
        let standard = tuning(&["E", "A", "D", "G", "B", "E"]);
        // Open low E
        assert_eq!(get_note_index(&standard, 0, -1, 0), Some(4));
        // Fret value 2 sounds three semitones above open: G
        assert_eq!(get_note_index(&standard, 0, 2, 0), Some(7));
        // Capo shifts every cell
        assert_eq!(get_note_index(&standard, 1, -1, 2), Some(11));
        assert_eq!(get_note_index(&standard, 9, 0, 0), None);
        assert_eq!(get_note_index(&tuning(&["?"]), 0, 0, 0), None);
    }
}
