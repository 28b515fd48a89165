//! Fretboard geometry.
//!
//! Frets follow equal-tempered spacing, strings are evenly spaced. The
//! inverse mapping resolves a pointer position on a rendered diagram to a
//! (string, fret) cell.

use super::config::NeckConfig;

const MIN_NOTE_RADIUS: f64 = 8.0;
const NOTE_STROKE_WIDTH: f64 = 2.0;

/// Computes the x position of the nut and every fret.
///
/// Returns `frets + 1` positions starting at 0. Raw positions follow
/// `1 - 2^(-n/12)` and are rescaled so the last fret lands exactly on
/// `width`.
///
/// # Examples
///
/// ```
/// use neckstudio::neck::get_fret_positions;
///
/// let positions = get_fret_positions(12, 600.0);
/// assert_eq!(positions.len(), 13);
/// assert_eq!(positions[0], 0.0);
/// assert_eq!(positions[12], 600.0);
/// ```
pub fn get_fret_positions(frets: usize, width: f64) -> Vec<f64> {
    let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
    let mut positions = Vec::with_capacity(frets + 1);
    positions.push(0.0);
    for fret in 1..=frets {
        let ratio = 1.0 - 1.0 / 2f64.powf(fret as f64 / 12.0);
        positions.push(ratio * width);
    }

    let last = positions.last().copied().unwrap_or(0.0);
    if last <= 0.0 {
        return positions;
    }
    let scale = width / last;
    let mut scaled: Vec<f64> = positions.into_iter().map(|p| p * scale).collect();
    // Pin the edge against floating-point drift
    if let Some(edge) = scaled.last_mut() {
        *edge = width;
    }
    scaled
}

/// Computes the y offset of every string, evenly spaced over `height`.
///
/// A single string is centered.
pub fn get_string_positions(strings: usize, height: f64) -> Vec<f64> {
    let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
    if strings <= 1 {
        return vec![height / 2.0];
    }
    let spacing = height / (strings - 1) as f64;
    (0..strings).map(|i| i as f64 * spacing).collect()
}

/// Returns the fret span containing `x`.
///
/// The result is the index `i` with `positions[i] <= x <= positions[i + 1]`.
/// Positions before the first span resolve to 0, positions past the last
/// span resolve to the last span.
pub fn find_fret_at_x(positions: &[f64], x: f64) -> usize {
    if positions.len() < 2 {
        return 0;
    }
    let last_span = positions.len() - 2;
    if x < positions[0] {
        return 0;
    }
    positions
        .windows(2)
        .position(|span| x >= span[0] && x <= span[1])
        .unwrap_or(last_span)
}

/// A resolved fretboard cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub string_index: usize,
    /// -1 for the open string.
    pub fret: i32,
}

/// Pixel layout of a rendered diagram.
///
/// The area left of the nut is reserved for open-string notes. Strings are
/// drawn in reverse index order, so string 0 sits on the bottom row.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardLayout {
    pub width: f64,
    pub height: f64,
    pub note_radius: f64,
    pub open_string_pad: f64,
    pub right_pad: f64,
    pub vertical_pad: f64,
    pub fretboard_width: f64,
    pub string_height: f64,
    strings: usize,
    frets: usize,
    fret_positions: Vec<f64>,
    string_positions: Vec<f64>,
}

impl BoardLayout {
    /// Computes the layout for a diagram box of the given size.
    pub fn new(width: f64, height: f64, config: &NeckConfig) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let note_radius = MIN_NOTE_RADIUS.max(height / 18.0);
        let note_edge_pad = note_radius + NOTE_STROKE_WIDTH;
        let open_string_pad = 24f64.max(note_radius * 2.8);
        let right_pad = 12f64.max(note_edge_pad);
        let vertical_pad = 8f64.max(note_edge_pad);
        let fretboard_width = (width - open_string_pad - right_pad).max(1.0);
        let string_height = (height - vertical_pad * 2.0).max(1.0);
        let strings = config.strings.max(1);
        let frets = config.frets.max(1);

        let fret_positions = get_fret_positions(frets, fretboard_width)
            .into_iter()
            .map(|x| x + open_string_pad)
            .collect();
        let string_positions = get_string_positions(strings, string_height)
            .into_iter()
            .map(|y| y + vertical_pad)
            .collect();

        Self {
            width,
            height,
            note_radius,
            open_string_pad,
            right_pad,
            vertical_pad,
            fretboard_width,
            string_height,
            strings,
            frets,
            fret_positions,
            string_positions,
        }
    }

    /// Absolute x positions of the nut and frets.
    pub fn fret_positions(&self) -> &[f64] {
        &self.fret_positions
    }

    /// Returns the y coordinate at which a string is drawn.
    pub fn string_y(&self, string_index: usize) -> Option<f64> {
        let row = self.strings.checked_sub(1)?.checked_sub(string_index)?;
        self.string_positions.get(row).copied()
    }

    /// Returns the x coordinate at which a note on `fret` is centered.
    pub fn note_x(&self, fret: i32) -> Option<f64> {
        if fret < 0 {
            return Some(self.open_string_pad / 2.0);
        }
        let fret = fret as usize;
        let left = self.fret_positions.get(fret)?;
        let right = self.fret_positions.get(fret + 1)?;
        Some((left + right) / 2.0)
    }

    /// Resolves a pointer position to a cell.
    ///
    /// # Examples
    ///
    /// ```
    /// use neckstudio::neck::{BoardLayout, NeckConfig};
    ///
    /// let config = NeckConfig::for_strings(6, 12);
    /// let layout = BoardLayout::new(520.0, 160.0, &config);
    /// let cell = layout.cell_at(5.0, 150.0);
    /// assert_eq!(cell.fret, -1);
    /// assert_eq!(cell.string_index, 0);
    /// ```
    pub fn cell_at(&self, x: f64, y: f64) -> Cell {
        let fret = if x < self.open_string_pad {
            -1
        } else {
            find_fret_at_x(&self.fret_positions, x).min(self.frets - 1) as i32
        };

        let row = if self.strings <= 1 {
            0
        } else {
            let spacing = self.string_height / (self.strings - 1) as f64;
            let raw = ((y - self.vertical_pad) / spacing).round();
            raw.clamp(0.0, (self.strings - 1) as f64) as usize
        };

        Cell {
            string_index: self.strings - 1 - row,
            fret,
        }
    }
}
