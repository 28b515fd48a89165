//! Pointer interactions on the canvas.
//!
//! A drag session captures the diagram box and pointer position when the
//! pointer goes down; every move derives the new box from the displacement
//! alone, so updates can be applied to any later snapshot.

use crate::neck::{BoardLayout, Cell, DiagramId, LayoutMode, ProjectData, TabId};
use crate::tiling::{Point, Rect, Size};

/// Smallest box a diagram can be resized to.
pub const MIN_DIAGRAM_SIZE: Size = Size::new(260.0, 90.0);

/// Largest box a diagram can be resized to.
pub const MAX_DIAGRAM_SIZE: Size = Size::new(1200.0, 400.0);

/// Canvas snapping grid in pixels.
pub const GRID_SIZE: f64 = 32.0;

/// Pointer travel beyond which a press on a fretboard is no longer a tap.
pub const NOTE_TAP_THRESHOLD: f64 = 4.0;

const MIN_SCALE_FACTOR: f64 = 0.2;

/// What a drag does to the diagram box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
    /// Resize keeping the aspect ratio.
    Scale,
}

/// Where a move ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DropTarget {
    #[default]
    Canvas,
    Trash,
    Tab(TabId),
}

/// Rounds a coordinate to the nearest grid line.
pub fn snap_to_grid(value: f64) -> f64 {
    (value / GRID_SIZE).round() * GRID_SIZE
}

fn clamp_size(width: f64, height: f64) -> (f64, f64) {
    (
        width.clamp(MIN_DIAGRAM_SIZE.width, MAX_DIAGRAM_SIZE.width),
        height.clamp(MIN_DIAGRAM_SIZE.height, MAX_DIAGRAM_SIZE.height),
    )
}

/// An in-progress drag of one diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub diagram_id: DiagramId,
    pub mode: DragMode,
    start: Point,
    origin: Rect,
}

impl DragSession {
    /// Starts a drag on a diagram.
    ///
    /// Moving a grid diagram takes it out of the grid, so the returned
    /// snapshot may differ from `project`.
    ///
    /// # Returns
    ///
    /// The session and the updated snapshot, or None if the diagram does
    /// not exist
    pub fn begin(
        project: &ProjectData,
        diagram_id: &DiagramId,
        mode: DragMode,
        pointer: Point,
    ) -> Option<(Self, ProjectData)> {
        let diagram = project.diagram(diagram_id)?;
        let session = Self {
            diagram_id: diagram_id.clone(),
            mode,
            start: pointer,
            origin: diagram.bounds(),
        };
        let next = if mode == DragMode::Move && diagram.is_grid() {
            project.update_diagram(diagram_id, |d| d.layout_mode = Some(LayoutMode::Float))
        } else {
            project.clone()
        };
        Some((session, next))
    }

    /// Computes the diagram box for a pointer position.
    ///
    /// # Arguments
    ///
    /// * `pointer` - Current pointer position in screen pixels
    /// * `zoom` - Canvas zoom; displacement is divided by it
    /// * `snap` - Round moved positions to the grid
    pub fn box_at(&self, pointer: Point, zoom: f64, snap: bool) -> Rect {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        let dx = (pointer.x - self.start.x) / zoom;
        let dy = (pointer.y - self.start.y) / zoom;
        let origin = self.origin;

        match self.mode {
            DragMode::Move => {
                let (x, y) = (origin.x + dx, origin.y + dy);
                let (x, y) = if snap {
                    (snap_to_grid(x), snap_to_grid(y))
                } else {
                    (x, y)
                };
                Rect::new(x, y, origin.width, origin.height)
            }
            DragMode::Resize => {
                let (width, height) = clamp_size(origin.width + dx, origin.height + dy);
                Rect::new(origin.x, origin.y, width, height)
            }
            DragMode::Scale => {
                let ratio = |size: f64, delta: f64| {
                    (size.is_finite() && size > 0.0).then(|| (size + delta) / size)
                };
                let (width, height) = match (ratio(origin.width, dx), ratio(origin.height, dy)) {
                    (Some(w), Some(h)) => {
                        let factor = w.max(h).max(MIN_SCALE_FACTOR);
                        clamp_size(origin.width * factor, origin.height * factor)
                    }
                    // Degenerate box: no aspect to keep
                    _ => clamp_size(origin.width.max(0.0) + dx, origin.height.max(0.0) + dy),
                };
                Rect::new(origin.x, origin.y, width, height)
            }
        }
    }

    /// Applies a pointer move to a snapshot.
    ///
    /// Snapping follows the dragged diagram's own config.
    pub fn update(&self, project: &ProjectData, pointer: Point, zoom: f64) -> ProjectData {
        let Some(diagram) = project.diagram(&self.diagram_id) else {
            return project.clone();
        };
        let rect = self.box_at(pointer, zoom, diagram.config.snap_to_grid);
        project.update_diagram(&self.diagram_id, |d| {
            d.x = rect.x;
            d.y = rect.y;
            d.width = rect.width;
            d.height = rect.height;
        })
    }

    /// Finishes the drag.
    ///
    /// A move dropped on the trash deletes the diagram; dropped on a tab
    /// other than the active one it moves the diagram there. Anything else
    /// keeps the snapshot as is.
    pub fn end(self, project: &ProjectData, target: DropTarget) -> ProjectData {
        if self.mode != DragMode::Move {
            return project.clone();
        }
        match target {
            DropTarget::Trash => {
                tracing::debug!(diagram = %self.diagram_id, "Diagram dropped on trash");
                project.delete_diagram(&self.diagram_id)
            }
            DropTarget::Tab(tab) if project.active_tab() != Some(&tab) => {
                project.move_diagram_to_tab(&self.diagram_id, &tab)
            }
            _ => project.clone(),
        }
    }
}

/// Tracks a press on a fretboard to tell taps from drags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTap {
    start: Point,
    moved: bool,
}

impl NoteTap {
    /// Records the pointer-down position in diagram coordinates.
    pub fn press(at: Point) -> Self {
        Self {
            start: at,
            moved: false,
        }
    }

    /// Records pointer movement. Once the pointer has travelled the
    /// threshold the press can no longer become a tap.
    pub fn track(&mut self, at: Point) {
        let distance = (at.x - self.start.x).hypot(at.y - self.start.y);
        if distance >= NOTE_TAP_THRESHOLD {
            self.moved = true;
        }
    }

    /// Finishes the press and resolves the cell under the release point.
    ///
    /// # Returns
    ///
    /// The tapped cell, or None if the press turned into a drag
    pub fn release(self, at: Point, layout: &BoardLayout) -> Option<Cell> {
        if self.moved {
            return None;
        }
        Some(layout.cell_at(at.x, at.y))
    }
}
