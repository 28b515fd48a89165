//! Scale membership and note labeling.
//!
//! Given a root pitch class and a set of interval offsets, decides which
//! cells are in the scale, which one is the root, and what text each note
//! shows under the active label mode.

use super::config::NeckConfig;
use super::diagram::NeckDiagram;
use super::note::{LabelMode, Note, NoteId, Picking};
use super::{get_interval_label, get_note_index, note_name_to_index, pitch_class_name};

/// Set of pitch classes, indexed 0-11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleSet([bool; 12]);

impl ScaleSet {
    /// Returns true if the pitch class is a member.
    pub fn contains(&self, pitch_class: u8) -> bool {
        self.0[(pitch_class % 12) as usize]
    }

    /// Returns the member pitch classes in ascending order.
    pub fn pitch_classes(&self) -> Vec<u8> {
        (0..12u8).filter(|&pc| self.contains(pc)).collect()
    }

    /// Returns the number of member pitch classes.
    pub fn len(&self) -> usize {
        self.0.iter().filter(|&&member| member).count()
    }

    /// Returns true if no pitch class is a member.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the set `{(root + offset) mod 12}`.
///
/// # Examples
///
/// ```
/// use neckstudio::neck::build_scale_set;
///
/// let a_minor_pentatonic = build_scale_set(9, &[0, 3, 5, 7, 10]);
/// assert_eq!(a_minor_pentatonic.pitch_classes(), vec![0, 2, 4, 7, 9]);
/// ```
pub fn build_scale_set(root: u8, offsets: &[i32]) -> ScaleSet {
    let mut members = [false; 12];
    for offset in offsets {
        members[(root as i32 + offset).rem_euclid(12) as usize] = true;
    }
    ScaleSet(members)
}

/// Computes the text shown on a note.
///
/// Picking mode shows the picking symbol (D when unset). Key mode shows the
/// note name, interval mode the interval from the root; either is empty
/// when the pitch it needs is unknown.
pub fn resolve_label(
    mode: LabelMode,
    note_index: Option<u8>,
    root_index: Option<u8>,
    picking: Option<Picking>,
) -> String {
    match mode {
        LabelMode::Picking => picking.unwrap_or(Picking::Down).symbol().to_string(),
        LabelMode::Key => note_index
            .map(|n| pitch_class_name(n).to_string())
            .unwrap_or_default(),
        LabelMode::Interval => match (root_index, note_index) {
            (Some(root), Some(note)) => get_interval_label(root, note).to_string(),
            _ => String::new(),
        },
    }
}

/// Highlight class of a rendered note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteHighlight {
    Root,
    InScale,
    OutOfScale,
}

/// Decides how a note is highlighted.
///
/// A note is the root iff `highlight_root` is set and its pitch class equals
/// the root. Without a scale every note counts as in-scale.
pub fn classify_note(
    config: &NeckConfig,
    note_index: Option<u8>,
    root: Option<u8>,
    scale: Option<&ScaleSet>,
) -> NoteHighlight {
    if config.highlight_root && root.is_some() && note_index == root {
        return NoteHighlight::Root;
    }
    let in_scale = match scale {
        Some(set) => note_index.is_some_and(|n| set.contains(n)),
        None => true,
    };
    if in_scale {
        NoteHighlight::InScale
    } else {
        NoteHighlight::OutOfScale
    }
}

/// Render-ready data for a single note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteView {
    pub id: NoteId,
    pub string_index: usize,
    pub fret: i32,
    pub label: String,
    pub highlight: NoteHighlight,
}

/// A named fret window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPreset {
    pub name: &'static str,
    pub min_fret: usize,
    pub max_fret: usize,
    /// Fret count a diagram created for this position should have.
    pub min_frets: usize,
}

const POSITION_PRESETS: [PositionPreset; 8] = [
    PositionPreset { name: "position 1", min_fret: 0, max_fret: 4, min_frets: 24 },
    PositionPreset { name: "position 2", min_fret: 5, max_fret: 9, min_frets: 24 },
    PositionPreset { name: "position 3", min_fret: 10, max_fret: 14, min_frets: 24 },
    PositionPreset { name: "position 4", min_fret: 15, max_fret: 19, min_frets: 24 },
    PositionPreset { name: "position 5", min_fret: 20, max_fret: 23, min_frets: 24 },
    PositionPreset { name: "1-12", min_fret: 0, max_fret: 11, min_frets: 12 },
    PositionPreset { name: "12-24", min_fret: 12, max_fret: 23, min_frets: 24 },
    PositionPreset { name: "whole neck", min_fret: 0, max_fret: 23, min_frets: 24 },
];

/// Looks up a position preset by name, ignoring case and surrounding space.
pub fn position_preset(name: &str) -> Option<&'static PositionPreset> {
    let normalized = name.trim().to_lowercase();
    POSITION_PRESETS.iter().find(|p| p.name == normalized)
}

/// Inclusive fret window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub min_fret: usize,
    pub max_fret: usize,
}

impl PositionRange {
    /// Returns true if a cell falls inside the window. Open strings count
    /// as fret 0.
    pub fn contains(&self, fret: i32) -> bool {
        let fret = fret.max(0) as usize;
        fret >= self.min_fret && fret <= self.max_fret
    }
}

/// Resolves a position name to a fret window clamped to the fret count.
pub fn get_position_range(position_name: Option<&str>, frets: usize) -> Option<PositionRange> {
    let preset = position_preset(position_name?)?;
    if frets == 0 {
        return None;
    }
    let max_fret = preset.max_fret.min(frets - 1);
    let min_fret = preset.min_fret.min(max_fret);
    Some(PositionRange { min_fret, max_fret })
}

/// Generates one note for every cell whose pitch is in the scale.
///
/// Cells run from the open string through the last fret, restricted to the
/// position window when `position_name` names a known preset. Pitches use
/// the display tuning. Returns no notes when the root or intervals are
/// missing or unrecognized.
pub fn build_scale_notes(
    diagram: &NeckDiagram,
    root_key: Option<&str>,
    intervals: Option<&[i32]>,
    position_name: Option<&str>,
) -> Vec<Note> {
    let Some(root) = root_key.and_then(note_name_to_index) else {
        return Vec::new();
    };
    let intervals = match intervals {
        Some(list) if !list.is_empty() => list,
        _ => return Vec::new(),
    };

    let scale = build_scale_set(root, intervals);
    let tuning = diagram.config.display_tuning();
    let range = get_position_range(position_name, diagram.config.frets);

    let mut notes = Vec::new();
    for string_index in 0..diagram.config.strings {
        for fret in -1..diagram.config.frets as i32 {
            if range.is_some_and(|r| !r.contains(fret)) {
                continue;
            }
            let Some(pitch) = get_note_index(&tuning, string_index, fret, diagram.config.capo)
            else {
                continue;
            };
            if scale.contains(pitch) {
                notes.push(Note::new(string_index, fret));
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_string(frets: usize) -> NeckDiagram {
        NeckDiagram {
            config: NeckConfig::for_strings(6, frets),
            ..NeckDiagram::new("Scale")
        }
    }

    #[test]
    fn test_build_scale_set_wraps() {
        let set = build_scale_set(11, &[0, 1, 13, -1]);
        assert_eq!(set.pitch_classes(), vec![0, 10, 11]);
        assert_eq!(set.len(), 3);
        assert!(build_scale_set(0, &[]).is_empty());
    }

    #[test]
    fn test_resolve_label() {
        assert_eq!(resolve_label(LabelMode::Picking, Some(3), None, None), "D");
        assert_eq!(
            resolve_label(LabelMode::Picking, None, None, Some(Picking::Up)),
            "U"
        );
        assert_eq!(resolve_label(LabelMode::Key, Some(6), None, None), "F#");
        assert_eq!(resolve_label(LabelMode::Key, None, Some(0), None), "");
        assert_eq!(resolve_label(LabelMode::Interval, Some(7), Some(0), None), "5");
        assert_eq!(resolve_label(LabelMode::Interval, Some(7), None, None), "");
    }

    #[test]
    fn test_classify_note() {
        let mut config = NeckConfig::default();
        let scale = build_scale_set(0, &[0, 4, 7]);
        assert_eq!(
            classify_note(&config, Some(0), Some(0), Some(&scale)),
            NoteHighlight::Root
        );
        assert_eq!(
            classify_note(&config, Some(4), Some(0), Some(&scale)),
            NoteHighlight::InScale
        );
        assert_eq!(
            classify_note(&config, Some(5), Some(0), Some(&scale)),
            NoteHighlight::OutOfScale
        );
        assert_eq!(classify_note(&config, None, None, None), NoteHighlight::InScale);

        config.highlight_root = false;
        assert_eq!(
            classify_note(&config, Some(0), Some(0), Some(&scale)),
            NoteHighlight::InScale
        );
    }

    #[test]
    fn test_position_range_clamps() {
        assert_eq!(
            get_position_range(Some(" Position 2 "), 24),
            Some(PositionRange { min_fret: 5, max_fret: 9 })
        );
        assert_eq!(
            get_position_range(Some("Position 5"), 12),
            Some(PositionRange { min_fret: 11, max_fret: 11 })
        );
        assert_eq!(get_position_range(Some("Position 9"), 12), None);
        assert_eq!(get_position_range(None, 12), None);
    }

    #[test]
    fn test_build_scale_notes_whole_board() {
        let diagram = six_string(12);
        let notes = build_scale_notes(&diagram, Some("E"), Some(&[0, 3, 5, 7, 10]), None);
        // Five of twelve pitch classes over 13 cells per string
        assert!(!notes.is_empty());
        let scale = build_scale_set(4, &[0, 3, 5, 7, 10]);
        for note in &notes {
            let pitch = diagram.note_index_at(note.string_index, note.fret).unwrap();
            assert!(scale.contains(pitch));
            assert_eq!(note.picking, None);
        }
        // Open low E is the root
        assert!(notes.iter().any(|n| n.string_index == 0 && n.fret == -1));
    }

    #[test]
    fn test_build_scale_notes_position_window() {
        let diagram = six_string(24);
        let notes = build_scale_notes(
            &diagram,
            Some("A"),
            Some(&[0, 3, 5, 7, 10]),
            Some("Position 2"),
        );
        assert!(!notes.is_empty());
        assert!(notes.iter().all(|n| (5..=9).contains(&n.fret)));
    }

    #[test]
    fn test_build_scale_notes_missing_inputs() {
        let diagram = six_string(12);
        assert!(build_scale_notes(&diagram, None, Some(&[0]), None).is_empty());
        assert!(build_scale_notes(&diagram, Some("E"), Some(&[]), None).is_empty());
        assert!(build_scale_notes(&diagram, Some("Q"), Some(&[0]), None).is_empty());
    }

    #[test]
    fn test_build_scale_notes_uses_display_tuning() {
        let mut diagram = six_string(12);
        diagram.config.tuning = vec!["C".to_string(); 6];
        diagram.config.display_standard_tuning = true;
        let notes = build_scale_notes(&diagram, Some("E"), Some(&[0]), None);
        assert!(notes.iter().any(|n| n.string_index == 0 && n.fret == -1));
    }
}
