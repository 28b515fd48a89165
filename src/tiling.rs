//! Canvas auto-tiling.
//!
//! New diagrams are placed into a column grid by scanning rows top to
//! bottom and taking the first slot that keeps a gap margin to every box
//! already on the canvas.

use serde::{Deserialize, Serialize};

/// Width of one grid column, equal to the default diagram width.
pub const STANDARD_COLUMN_WIDTH: f64 = 520.0;

/// Default margin between tiles.
pub const TILE_GAP: f64 = 24.0;

/// Rows scanned before giving up.
const MAX_ROWS: usize = 100;

/// Minimum and maximum number of columns once the canvas fits more than one.
const MIN_COLUMNS: usize = 2;
const MAX_COLUMNS: usize = 4;

/// Boxes wider than this factor of a column are centered across the grid.
const WIDE_FACTOR: f64 = 1.05;

/// A point on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Width and height of a box or canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the box size.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns the same box moved to `origin`.
    pub fn at(&self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// Returns true if the two boxes, each grown by `gap`, intersect.
    ///
    /// Boxes that are exactly `gap` apart do not overlap.
    pub fn overlaps(&self, other: &Rect, gap: f64) -> bool {
        !(self.x + self.width + gap <= other.x
            || self.x >= other.x + other.width + gap
            || self.y + self.height + gap <= other.y
            || self.y >= other.y + other.height + gap)
    }
}

/// Number of grid columns that fit on a canvas.
fn column_count(canvas_width: f64, gap: f64) -> usize {
    let fit = ((canvas_width + gap) / (STANDARD_COLUMN_WIDTH + gap)).floor();
    if !fit.is_finite() || fit <= 1.0 {
        return 1;
    }
    (fit as usize).clamp(MIN_COLUMNS, MAX_COLUMNS)
}

/// Finds a free position for a box of `size`.
///
/// Rows are `size.height + gap` tall. Normal boxes try one slot per column
/// left to right; wide boxes try a single slot centered over the grid.
/// Falls back to `(gap, gap)` when nothing fits within the row bound.
///
/// # Examples
///
/// ```
/// use neckstudio::tiling::{suggest_tile, Point, Rect, Size, TILE_GAP};
///
/// let placed = [Rect::new(24.0, 24.0, 520.0, 160.0)];
/// let spot = suggest_tile(&placed, Size::new(1200.0, 800.0), Size::new(520.0, 160.0), TILE_GAP);
/// assert_eq!(spot, Point { x: 568.0, y: 24.0 });
/// ```
pub fn suggest_tile(existing: &[Rect], canvas: Size, size: Size, gap: f64) -> Point {
    let columns = column_count(canvas.width, gap);
    let grid_width = columns as f64 * STANDARD_COLUMN_WIDTH + gap * (columns as f64 - 1.0);
    let wide = size.width > STANDARD_COLUMN_WIDTH * WIDE_FACTOR;

    for row in 0..MAX_ROWS {
        let y = gap + row as f64 * (size.height + gap);
        let candidates: Vec<f64> = if wide {
            vec![gap.max(gap + (grid_width - size.width) / 2.0)]
        } else {
            (0..columns)
                .map(|col| gap + col as f64 * (STANDARD_COLUMN_WIDTH + gap))
                .collect()
        };

        for x in candidates {
            let candidate = Rect::new(x, y, size.width, size.height);
            if !existing.iter().any(|placed| candidate.overlaps(placed, gap)) {
                return Point { x, y };
            }
        }
    }

    Point { x: gap, y: gap }
}

/// Returns true if grid boxes overlap each other or a floating box overlaps
/// a grid box.
pub fn needs_relayout(grid: &[Rect], floating: &[Rect], gap: f64) -> bool {
    let grid_collision = grid.iter().enumerate().any(|(i, a)| {
        grid[i + 1..].iter().any(|b| a.overlaps(b, gap))
    });
    grid_collision
        || floating
            .iter()
            .any(|f| grid.iter().any(|g| f.overlaps(g, gap)))
}

/// Re-places every grid box.
///
/// Boxes are visited by (y, x) and each is tiled against the boxes already
/// re-placed plus all floating boxes. The returned positions are in the
/// same order as `grid`.
pub fn relayout(grid: &[Rect], floating: &[Rect], canvas: Size, gap: f64) -> Vec<Point> {
    let mut order: Vec<usize> = (0..grid.len()).collect();
    order.sort_by(|&a, &b| {
        grid[a]
            .y
            .total_cmp(&grid[b].y)
            .then(grid[a].x.total_cmp(&grid[b].x))
    });

    let mut obstacles: Vec<Rect> = floating.to_vec();
    let mut positions = vec![Point { x: 0.0, y: 0.0 }; grid.len()];
    for index in order {
        let rect = grid[index];
        let spot = suggest_tile(&obstacles, canvas, rect.size(), gap);
        obstacles.push(rect.at(spot));
        positions[index] = spot;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: Size = Size::new(520.0, 160.0);

    #[test]
    fn test_overlap_respects_gap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(a.overlaps(&Rect::new(110.0, 0.0, 50.0, 50.0), 24.0));
        assert!(!a.overlaps(&Rect::new(124.0, 0.0, 50.0, 50.0), 24.0));
        assert!(!a.overlaps(&Rect::new(0.0, 130.0, 50.0, 50.0), 24.0));
    }

    #[test]
    fn test_column_count() {
        assert_eq!(column_count(400.0, 24.0), 1);
        assert_eq!(column_count(520.0, 24.0), 1);
        assert_eq!(column_count(1200.0, 24.0), 2);
        assert_eq!(column_count(1700.0, 24.0), 3);
        assert_eq!(column_count(5000.0, 24.0), 4);
    }

    #[test]
    fn test_fourth_box_takes_next_slot() {
        let canvas = Size::new(1200.0, 800.0);
        let placed = vec![
            Rect::new(24.0, 24.0, 520.0, 160.0),
            Rect::new(568.0, 24.0, 520.0, 160.0),
            Rect::new(24.0, 208.0, 520.0, 160.0),
        ];
        let spot = suggest_tile(&placed, canvas, BOX, TILE_GAP);
        assert_eq!(spot, Point { x: 568.0, y: 208.0 });
        let candidate = Rect::new(spot.x, spot.y, BOX.width, BOX.height);
        assert!(placed.iter().all(|r| !candidate.overlaps(r, TILE_GAP)));
    }

    #[test]
    fn test_wide_box_is_centered() {
        let canvas = Size::new(1200.0, 800.0);
        let spot = suggest_tile(&[], canvas, Size::new(720.0, 190.0), TILE_GAP);
        // Grid is 2 * 520 + 24 wide
        assert_eq!(spot, Point { x: 24.0 + (1064.0 - 720.0) / 2.0, y: 24.0 });

        let huge = suggest_tile(&[], canvas, Size::new(1200.0, 190.0), TILE_GAP);
        assert_eq!(huge.x, TILE_GAP);
    }

    #[test]
    fn test_suggestions_never_overlap() {
        let canvas = Size::new(1700.0, 900.0);
        let mut placed: Vec<Rect> = Vec::new();
        let sizes = [BOX, Size::new(300.0, 90.0), Size::new(900.0, 200.0), BOX];
        for i in 0..24 {
            let size = sizes[i % sizes.len()];
            let spot = suggest_tile(&placed, canvas, size, TILE_GAP);
            let rect = Rect::new(spot.x, spot.y, size.width, size.height);
            assert!(placed.iter().all(|r| !rect.overlaps(r, TILE_GAP)));
            placed.push(rect);
        }
    }

    #[test]
    fn test_fallback_when_full() {
        let blocker = Rect::new(0.0, 0.0, 10_000.0, 100_000.0);
        let spot = suggest_tile(&[blocker], Size::new(1200.0, 800.0), BOX, TILE_GAP);
        assert_eq!(spot, Point { x: TILE_GAP, y: TILE_GAP });
    }

    #[test]
    fn test_relayout_separates_stacked_boxes() {
        let canvas = Size::new(1200.0, 800.0);
        let grid = vec![
            Rect::new(30.0, 30.0, 520.0, 160.0),
            Rect::new(24.0, 24.0, 520.0, 160.0),
        ];
        let floating = vec![Rect::new(600.0, 24.0, 400.0, 100.0)];
        assert!(needs_relayout(&grid, &floating, TILE_GAP));

        let positions = relayout(&grid, &floating, canvas, TILE_GAP);
        // The upper-left box is placed first
        assert_eq!(positions[1], Point { x: 24.0, y: 24.0 });
        assert_eq!(positions[0], Point { x: 24.0, y: 208.0 });

        let placed: Vec<Rect> = grid
            .iter()
            .zip(&positions)
            .map(|(r, p)| r.at(*p))
            .collect();
        assert!(!needs_relayout(&placed, &floating, TILE_GAP));
    }
}
