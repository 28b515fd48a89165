//! Per-diagram instrument configuration.
//!
//! Holds string count, fret count, capo and tuning together with the
//! display flags. Persisted configs are migrated on read: values are merged
//! over the defaults and fields the current schema does not know are dropped.

use super::normalize_note_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_TUNING_6: [&str; 6] = ["E", "A", "D", "G", "B", "E"];
pub const DEFAULT_TUNING_7: [&str; 7] = ["B", "E", "A", "D", "G", "B", "E"];
pub const DEFAULT_TUNING_8: [&str; 8] = ["F#", "B", "E", "A", "D", "G", "B", "E"];

/// Fields written by older versions that are no longer part of the config.
pub const DEPRECATED_CONFIG_FIELDS: [&str; 2] = ["scaleLength", "multiscaleAngle"];

const KNOWN_CONFIG_FIELDS: [&str; 10] = [
    "strings",
    "frets",
    "capo",
    "tuning",
    "displayStandardTuning",
    "fretNumberStyle",
    "showFretNumbers",
    "highlightRoot",
    "snapToGrid",
    "showInlays",
];

/// Valid string counts.
pub const STRING_RANGE: std::ops::RangeInclusive<usize> = 1..=12;

/// Valid fret counts.
pub const FRET_RANGE: std::ops::RangeInclusive<usize> = 1..=36;

const INLAY_FRETS: [usize; 10] = [3, 5, 7, 9, 12, 15, 17, 19, 21, 24];
const DOUBLE_INLAY_FRETS: [usize; 2] = [12, 24];

/// A named tuning offered for 8-string instruments.
#[derive(Debug, Clone, Copy)]
pub struct TuningPreset {
    pub label: &'static str,
    pub tuning: [&'static str; 8],
}

pub const EIGHT_STRING_PRESETS: [TuningPreset; 4] = [
    TuningPreset {
        label: "F# Standard",
        tuning: DEFAULT_TUNING_8,
    },
    TuningPreset {
        label: "Half Step Down",
        tuning: ["F", "A#", "D#", "G#", "C#", "F#", "A#", "D#"],
    },
    TuningPreset {
        label: "Drop E",
        tuning: ["E", "B", "E", "A", "D", "G", "B", "E"],
    },
    TuningPreset {
        label: "E Standard",
        tuning: ["E", "A", "D", "G", "C", "F", "A", "D"],
    },
];

impl TuningPreset {
    /// Returns the preset tuning as owned strings.
    pub fn to_tuning(&self) -> Vec<String> {
        self.tuning.iter().map(|n| n.to_string()).collect()
    }
}

/// Numbering style for fret markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FretNumberStyle {
    #[default]
    Arabic,
    Roman,
}

impl FretNumberStyle {
    /// Formats a fret number for display. Zero renders as empty.
    pub fn format(self, value: usize) -> String {
        if value == 0 {
            return String::new();
        }
        match self {
            FretNumberStyle::Arabic => value.to_string(),
            FretNumberStyle::Roman => to_roman(value),
        }
    }
}

fn to_roman(value: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut remaining = value;
    let mut result = String::new();
    for (amount, label) in NUMERALS {
        while remaining >= amount {
            result.push_str(label);
            remaining -= amount;
        }
    }
    result
}

/// Instrument parameters and display flags for one diagram.
///
/// `tuning.len() == strings` holds for every value produced by this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct NeckConfig {
    /// Number of strings, within `STRING_RANGE`.
    pub strings: usize,

    /// Number of fretted cells per string, within `FRET_RANGE`.
    pub frets: usize,

    /// Capo position in semitones, always below `frets`.
    pub capo: u32,

    /// Open-string note names, one per string.
    pub tuning: Vec<String>,

    pub display_standard_tuning: bool,
    pub fret_number_style: FretNumberStyle,
    pub show_fret_numbers: bool,
    pub highlight_root: bool,
    pub snap_to_grid: bool,
    pub show_inlays: bool,
}

impl Default for NeckConfig {
    fn default() -> Self {
        Self {
            strings: 8,
            frets: 12,
            capo: 0,
            tuning: DEFAULT_TUNING_8.iter().map(|n| n.to_string()).collect(),
            display_standard_tuning: false,
            fret_number_style: FretNumberStyle::Arabic,
            show_fret_numbers: false,
            highlight_root: true,
            snap_to_grid: false,
            show_inlays: true,
        }
    }
}

impl NeckConfig {
    /// Creates a config for the given string and fret counts with standard tuning.
    pub fn for_strings(strings: usize, frets: usize) -> Self {
        let strings = strings.clamp(*STRING_RANGE.start(), *STRING_RANGE.end());
        Self {
            strings,
            frets: frets.clamp(*FRET_RANGE.start(), *FRET_RANGE.end()),
            tuning: standard_tuning(strings),
            ..Self::default()
        }
    }

    /// Returns the tuning used for pitch display.
    ///
    /// When `display_standard_tuning` is set the standard tuning for the
    /// string count is shown instead of the configured one.
    pub fn display_tuning(&self) -> Vec<String> {
        if self.display_standard_tuning {
            standard_tuning(self.strings)
        } else {
            self.tuning.clone()
        }
    }

    /// Returns true if the fret carries an inlay marker.
    pub fn is_inlay_fret(&self, fret: usize) -> bool {
        self.show_inlays && INLAY_FRETS.contains(&fret)
    }

    /// Returns true if the fret carries a double inlay.
    pub fn is_double_inlay_fret(&self, fret: usize) -> bool {
        self.show_inlays && DOUBLE_INLAY_FRETS.contains(&fret)
    }

    /// Re-establishes the config invariants in place.
    fn clamp(&mut self) {
        self.strings = self
            .strings
            .clamp(*STRING_RANGE.start(), *STRING_RANGE.end());
        self.frets = self.frets.clamp(*FRET_RANGE.start(), *FRET_RANGE.end());
        let max_capo = u32::try_from(self.frets).unwrap_or(u32::MAX).saturating_sub(1);
        self.capo = self.capo.min(max_capo);
        self.tuning = normalize_tuning(self.strings, &self.tuning);
    }
}

/// Returns the standard tuning for a string count.
///
/// Counts without a dedicated table reuse the nearest one, truncating or
/// repeating its last entry.
pub fn standard_tuning(strings: usize) -> Vec<String> {
    let base: &[&str] = if strings >= 8 {
        &DEFAULT_TUNING_8
    } else if strings == 7 {
        &DEFAULT_TUNING_7
    } else {
        &DEFAULT_TUNING_6
    };
    let mut tuning: Vec<String> = base.iter().take(strings).map(|n| n.to_string()).collect();
    while tuning.len() < strings {
        let last = tuning.last().cloned().unwrap_or_else(|| "E".to_string());
        tuning.push(last);
    }
    tuning
}

/// Fits a tuning to a string count.
///
/// Names are canonicalized and blanks dropped. An empty result falls back to
/// the standard tuning; otherwise the list is truncated or its last entry
/// repeated until it has exactly `strings` entries.
///
/// # Examples
///
/// ```
/// use neckstudio::neck::normalize_tuning;
///
/// let tuning = normalize_tuning(4, &["e".to_string(), "a".to_string()]);
/// assert_eq!(tuning, vec!["E", "A", "A", "A"]);
/// ```
pub fn normalize_tuning(strings: usize, tuning: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tuning
        .iter()
        .map(|n| normalize_note_name(n))
        .filter(|n| !n.is_empty())
        .collect();
    if normalized.is_empty() {
        normalized = standard_tuning(strings);
    }
    normalized.truncate(strings);
    while normalized.len() < strings {
        let last = normalized.last().cloned().unwrap_or_else(|| "E".to_string());
        normalized.push(last);
    }
    normalized
}

/// A partial config update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub strings: Option<usize>,
    pub frets: Option<usize>,
    pub capo: Option<u32>,
    pub tuning: Option<Vec<String>>,
    pub display_standard_tuning: Option<bool>,
    pub fret_number_style: Option<FretNumberStyle>,
    pub show_fret_numbers: Option<bool>,
    pub highlight_root: Option<bool>,
    pub snap_to_grid: Option<bool>,
    pub show_inlays: Option<bool>,
}

/// Applies a patch, keeping the tuning sized to the resulting string count.
pub fn apply_config_patch(config: &NeckConfig, patch: &ConfigPatch) -> NeckConfig {
    let mut next = config.clone();
    if let Some(strings) = patch.strings {
        next.strings = strings;
    }
    if let Some(frets) = patch.frets {
        next.frets = frets;
    }
    if let Some(capo) = patch.capo {
        next.capo = capo;
    }
    if let Some(tuning) = &patch.tuning {
        next.tuning = tuning.clone();
    }
    if let Some(value) = patch.display_standard_tuning {
        next.display_standard_tuning = value;
    }
    if let Some(value) = patch.fret_number_style {
        next.fret_number_style = value;
    }
    if let Some(value) = patch.show_fret_numbers {
        next.show_fret_numbers = value;
    }
    if let Some(value) = patch.highlight_root {
        next.highlight_root = value;
    }
    if let Some(value) = patch.snap_to_grid {
        next.snap_to_grid = value;
    }
    if let Some(value) = patch.show_inlays {
        next.show_inlays = value;
    }
    next.clamp();
    next
}

/// Reads a persisted config, merging it over the defaults.
///
/// Anything that is not a JSON object yields the default config. Fields
/// with the wrong type fall back to their default individually. Deprecated
/// and unknown fields are dropped.
pub fn migrate_config(value: &Value) -> NeckConfig {
    let Some(map) = value.as_object() else {
        return NeckConfig::default();
    };

    for key in map.keys() {
        if DEPRECATED_CONFIG_FIELDS.contains(&key.as_str()) {
            tracing::debug!("Dropping deprecated config field {}", key);
        } else if !KNOWN_CONFIG_FIELDS.contains(&key.as_str()) {
            tracing::debug!("Dropping unknown config field {}", key);
        }
    }

    let defaults = NeckConfig::default();
    let mut config = NeckConfig {
        strings: read_count(map, "strings").unwrap_or(defaults.strings),
        frets: read_count(map, "frets").unwrap_or(defaults.frets),
        capo: read_count(map, "capo")
            .map(|c| u32::try_from(c).unwrap_or(u32::MAX))
            .unwrap_or(defaults.capo),
        tuning: map
            .get("tuning")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.tuning),
        display_standard_tuning: read_flag(map, "displayStandardTuning")
            .unwrap_or(defaults.display_standard_tuning),
        fret_number_style: map
            .get("fretNumberStyle")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(defaults.fret_number_style),
        show_fret_numbers: read_flag(map, "showFretNumbers").unwrap_or(defaults.show_fret_numbers),
        highlight_root: read_flag(map, "highlightRoot").unwrap_or(defaults.highlight_root),
        snap_to_grid: read_flag(map, "snapToGrid").unwrap_or(defaults.snap_to_grid),
        show_inlays: read_flag(map, "showInlays").unwrap_or(defaults.show_inlays),
    };
    config.clamp();
    config
}

fn read_count(map: &Map<String, Value>, key: &str) -> Option<usize> {
    let value = map.get(key)?;
    if let Some(n) = value.as_u64() {
        return Some(usize::try_from(n).unwrap_or(usize::MAX));
    }
    // Whole-valued floats come from JS number serialization
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.floor() as usize)
}

fn read_flag(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(Value::as_bool)
}

impl From<Value> for NeckConfig {
    fn from(value: Value) -> Self {
        migrate_config(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_standard_tuning_lengths() {
        assert_eq!(standard_tuning(6), names(&DEFAULT_TUNING_6));
        assert_eq!(standard_tuning(7), names(&DEFAULT_TUNING_7));
        assert_eq!(standard_tuning(4), names(&["E", "A", "D", "G"]));
        assert_eq!(standard_tuning(10).len(), 10);
        assert_eq!(standard_tuning(10)[9], "E");
    }

    #[test]
    fn test_normalize_tuning_length_invariant() {
        let inputs = [
            vec![],
            names(&["D"]),
            names(&["e", "", "g#", "bb"]),
            names(&DEFAULT_TUNING_8),
        ];
        for strings in 1..=12 {
            for input in &inputs {
                let tuning = normalize_tuning(strings, input);
                assert_eq!(tuning.len(), strings);
            }
        }
    }

    #[test]
    fn test_normalize_tuning_repeats_last() {
        let tuning = normalize_tuning(5, &names(&["d", "", "g#"]));
        assert_eq!(tuning, names(&["D", "G#", "G#", "G#", "G#"]));
        assert_eq!(normalize_tuning(6, &[]), names(&DEFAULT_TUNING_6));
    }

    #[test]
    fn test_patch_resizes_tuning() {
        let config = NeckConfig::for_strings(6, 12);
        let patched = apply_config_patch(
            &config,
            &ConfigPatch {
                strings: Some(7),
                ..ConfigPatch::default()
            },
        );
        assert_eq!(patched.strings, 7);
        assert_eq!(patched.tuning.len(), 7);
        assert_eq!(patched.tuning[6], "E");

        let capo = apply_config_patch(
            &config,
            &ConfigPatch {
                frets: Some(4),
                capo: Some(9),
                ..ConfigPatch::default()
            },
        );
        assert_eq!(capo.capo, 3);
    }

    #[test]
    fn test_migrate_strips_and_fills() {
        let config = migrate_config(&json!({
            "strings": 6,
            "frets": 15,
            "tuning": ["E", "A", "D", "G", "B", "E"],
            "scaleLength": 25.5,
            "multiscaleAngle": 4,
            "mystery": true,
            "showInlays": "yes"
        }));
        assert_eq!(config.strings, 6);
        assert_eq!(config.frets, 15);
        assert!(config.show_inlays);
        assert!(config.highlight_root);

        let serialized = serde_json::to_value(&config).unwrap();
        assert!(serialized.get("scaleLength").is_none());
        assert!(serialized.get("mystery").is_none());
        assert_eq!(serialized["displayStandardTuning"], false);

        assert_eq!(migrate_config(&json!("nope")), NeckConfig::default());
    }

    #[test]
    fn test_migrate_fixes_tuning_length() {
        let config: NeckConfig = serde_json::from_value(json!({ "strings": 4 })).unwrap();
        assert_eq!(config.tuning.len(), 4);
        assert_eq!(config.tuning, names(&["F#", "B", "E", "A"]));
    }

    #[test]
    fn test_fret_number_style() {
        assert_eq!(FretNumberStyle::Arabic.format(12), "12");
        assert_eq!(FretNumberStyle::Roman.format(12), "XII");
        assert_eq!(FretNumberStyle::Roman.format(19), "XIX");
        assert_eq!(FretNumberStyle::Roman.format(0), "");
        assert_eq!(FretNumberStyle::Arabic.format(0), "");
    }

    #[test]
    fn test_migrate_bounds_counts() {
        let config = migrate_config(&json!({ "frets": 4294967296u64, "capo": 4294967296u64 }));
        assert_eq!(config.frets, *FRET_RANGE.end());
        assert_eq!(config.capo, 35);

        let config = migrate_config(&json!({ "strings": 5_000_000, "frets": 0 }));
        assert_eq!(config.strings, *STRING_RANGE.end());
        assert_eq!(config.tuning.len(), 12);
        assert_eq!(config.frets, 1);
        assert_eq!(config.capo, 0);

        let config = migrate_config(&json!({ "strings": 1e300 }));
        assert_eq!(config.strings, 12);
    }

    #[test]
    fn test_patch_bounds_counts() {
        let patched = apply_config_patch(
            &NeckConfig::default(),
            &ConfigPatch {
                strings: Some(usize::MAX),
                frets: Some(usize::MAX),
                capo: Some(u32::MAX),
                ..ConfigPatch::default()
            },
        );
        assert_eq!((patched.strings, patched.frets, patched.capo), (12, 36, 35));
        assert_eq!(NeckConfig::for_strings(40, 100).strings, 12);
    }

    #[test]
    fn test_eight_string_presets() {
        for preset in EIGHT_STRING_PRESETS {
            assert_eq!(preset.to_tuning().len(), 8);
        }
    }
}
