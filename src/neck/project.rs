//! Project document.
//!
//! A project groups diagrams into tabs and carries the project-level theory
//! selection. Editing operations never mutate in place: each returns a new
//! snapshot so a pending save always sees a consistent document.

use super::config::{standard_tuning, ConfigPatch, FretNumberStyle, NeckConfig};
use super::diagram::{DiagramId, LayoutMode, NeckDiagram, DEFAULT_DIAGRAM_SIZE};
use super::library::{Library, LibraryItem, LibraryItemType};
use super::note::{LabelMode, Note, Picking};
use super::serde_helpers::{lenient_option, lenient_vec, non_blank_string};
use super::theory::{build_scale_notes, position_preset};
use crate::tiling::{relayout, needs_relayout, suggest_tile, Point, Rect, Size, TILE_GAP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Title given to projects the user has not named.
pub const DEFAULT_PROJECT_TITLE: &str = "Untitled Neck Diagram";

/// Current time as an RFC 3339 timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Unique identifier for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Generates a new unique tab ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named page of diagrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTab {
    pub id: TabId,
    #[serde(default)]
    pub name: String,
}

impl ProjectTab {
    /// Creates a tab with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TabId::new(),
            name: name.into(),
        }
    }

    /// Returns the name shown for the tab at `index`.
    ///
    /// Blank names and automatic names like "Tab 3" are renumbered by
    /// position so they stay sequential after deletions.
    pub fn display_name(&self, index: usize) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() || is_auto_tab_name(trimmed) {
            format!("Tab {}", index + 1)
        } else {
            trimmed.to_string()
        }
    }
}

/// Matches "Tab" + whitespace + digits, ignoring case.
fn is_auto_tab_name(name: &str) -> bool {
    let Some(prefix) = name.get(..3) else {
        return false;
    };
    if !prefix.eq_ignore_ascii_case("tab") {
        return false;
    }
    let rest = &name[3..];
    let digits = rest.trim_start();
    digits.len() < rest.len() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// The full project document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectData {
    #[serde(deserialize_with = "lenient_vec")]
    pub diagrams: Vec<NeckDiagram>,

    #[serde(deserialize_with = "lenient_vec")]
    pub tabs: Vec<ProjectTab>,

    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_tab_id: Option<TabId>,

    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_diagram_id: Option<DiagramId>,

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
    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub search_query: Option<String>,

    #[serde(
        deserialize_with = "non_blank_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        deserialize_with = "non_blank_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
}

impl ProjectData {
    /// Creates an empty project with a single "Tab 1".
    pub fn blank() -> Self {
        let tab = ProjectTab::new("Tab 1");
        let now = now_timestamp();
        Self {
            active_tab_id: Some(tab.id.clone()),
            tabs: vec![tab],
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Creates the sample project shown to first-time users.
    pub fn demo() -> Self {
        let tab = ProjectTab::new("Demo");
        let now = now_timestamp();

        fn cells(cells: &[(usize, i32)]) -> Vec<Note> {
            cells.iter().map(|&(s, f)| Note::new(s, f)).collect()
        }
        fn picked(cells: &[(usize, i32, Picking)]) -> Vec<Note> {
            cells
                .iter()
                .map(|&(s, f, p)| Note::with_picking(s, f, p))
                .collect()
        }

        let pentatonic = NeckDiagram {
            tab_id: Some(tab.id.clone()),
            x: 120.0,
            y: 120.0,
            label_mode: LabelMode::Interval,
            config: NeckConfig {
                strings: 6,
                frets: 15,
                tuning: standard_tuning(6),
                show_fret_numbers: true,
                ..NeckConfig::default()
            },
            notes: cells(&[
                (0, 3), (0, 5), (1, 3), (1, 5), (2, 2), (2, 5),
                (3, 2), (3, 4), (4, 3), (4, 5), (5, 3), (5, 5),
            ]),
            ..NeckDiagram::new("E Minor Pentatonic")
        };

        let dorian = NeckDiagram {
            tab_id: Some(tab.id.clone()),
            x: 680.0,
            y: 120.0,
            label_mode: LabelMode::Key,
            config: NeckConfig {
                strings: 7,
                frets: 17,
                tuning: standard_tuning(7),
                display_standard_tuning: true,
                show_fret_numbers: true,
                fret_number_style: FretNumberStyle::Roman,
                ..NeckConfig::default()
            },
            notes: cells(&[
                (0, -1), (1, -1), (2, 2), (2, 4), (3, 2), (3, 5),
                (4, 2), (4, 4), (5, 3), (5, 5), (6, 3), (6, 6),
            ]),
            ..NeckDiagram::new("Dorian Flow")
        };

        use Picking::{Down as D, Up as U};
        let drill = NeckDiagram {
            tab_id: Some(tab.id.clone()),
            x: 120.0,
            y: 360.0,
            width: 720.0,
            height: 190.0,
            label_mode: LabelMode::Picking,
            config: NeckConfig {
                tuning: standard_tuning(8),
                highlight_root: false,
                ..NeckConfig::default()
            },
            notes: picked(&[
                (0, 0, D), (0, 2, U), (1, 0, D), (1, 3, U), (2, 2, D), (2, 4, U),
                (3, 2, D), (3, 5, U), (4, 3, D), (4, 5, U), (5, 3, D), (5, 6, U),
            ]),
            ..NeckDiagram::new("Picking Drill")
        };

        Self {
            diagrams: vec![pentatonic, dorian, drill],
            active_tab_id: Some(tab.id.clone()),
            tabs: vec![tab],
            key_id: Some("default:key:e".to_string()),
            scale_id: Some("default:scale:minor-pentatonic".to_string()),
            position_id: Some("default:position:position-1".to_string()),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Serializes the project to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a project from JSON without normalizing it.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns a tab by id.
    pub fn tab(&self, id: &TabId) -> Option<&ProjectTab> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    /// Returns the position of a tab.
    pub fn tab_index(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == id)
    }

    /// Returns a diagram by id.
    pub fn diagram(&self, id: &DiagramId) -> Option<&NeckDiagram> {
        self.diagrams.iter().find(|d| &d.id == id)
    }

    /// Returns the active tab id, falling back to the first tab.
    pub fn active_tab(&self) -> Option<&TabId> {
        self.active_tab_id
            .as_ref()
            .or_else(|| self.tabs.first().map(|t| &t.id))
    }

    /// Iterates over the diagrams owned by a tab.
    pub fn diagrams_in_tab<'a>(&'a self, tab: &'a TabId) -> impl Iterator<Item = &'a NeckDiagram> {
        self.diagrams
            .iter()
            .filter(move |d| d.tab_id.as_ref() == Some(tab))
    }

    /// Returns the diagrams of the active tab.
    pub fn active_diagrams(&self) -> Vec<&NeckDiagram> {
        match self.active_tab() {
            Some(tab) => self.diagrams_in_tab(tab).collect(),
            None => Vec::new(),
        }
    }

    /// Returns the selected diagram if it belongs to the active tab.
    pub fn selected_diagram(&self) -> Option<&NeckDiagram> {
        let diagram = self.diagram(self.selected_diagram_id.as_ref()?)?;
        (diagram.tab_id.as_ref() == self.active_tab()).then_some(diagram)
    }

    /// Returns the tab new diagrams go into, creating a default one if the
    /// project has no tabs.
    fn target_tab(&self) -> (Vec<ProjectTab>, TabId) {
        match self.active_tab() {
            Some(id) => (self.tabs.clone(), id.clone()),
            None => {
                let tab = ProjectTab::new("Tab 1");
                let id = tab.id.clone();
                (vec![tab], id)
            }
        }
    }

    /// Placement for a new default-sized diagram in `tab`.
    ///
    /// The first diagram in a tab floats centered at the top of the canvas,
    /// later ones are tiled around the tab's grid diagrams.
    fn placement(&self, tab: &TabId, canvas: Size) -> (Point, LayoutMode) {
        let mut in_tab = self.diagrams_in_tab(tab).peekable();
        if in_tab.peek().is_none() {
            let x = TILE_GAP.max(canvas.width / 2.0 - DEFAULT_DIAGRAM_SIZE.width / 2.0);
            return (Point { x, y: TILE_GAP }, LayoutMode::Float);
        }
        let grid: Vec<Rect> = in_tab.filter(|d| d.is_grid()).map(|d| d.bounds()).collect();
        (
            suggest_tile(&grid, canvas, DEFAULT_DIAGRAM_SIZE, TILE_GAP),
            LayoutMode::Grid,
        )
    }

    /// Adds a default diagram to the active tab and selects it.
    ///
    /// # Returns
    ///
    /// The new snapshot and the id of the added diagram
    pub fn add_diagram(&self, canvas: Size, label_mode: LabelMode) -> (Self, DiagramId) {
        let (tabs, tab_id) = self.target_tab();
        let (position, layout) = self.placement(&tab_id, canvas);
        let diagram = NeckDiagram {
            x: position.x,
            y: position.y,
            label_mode,
            tab_id: Some(tab_id.clone()),
            layout_mode: Some(layout),
            ..NeckDiagram::new(format!("Neck {}", self.diagrams.len() + 1))
        };
        let id = diagram.id.clone();

        let mut next = self.clone();
        next.tabs = tabs;
        next.diagrams.push(diagram);
        next.selected_diagram_id = Some(id.clone());
        next.active_tab_id = Some(tab_id);
        (next, id)
    }

    /// Adds a diagram populated from the project's theory selection.
    ///
    /// The name is the resolved theory name, the fret count grows to the
    /// selected position's minimum and the notes are every in-scale cell.
    /// With `replace` the existing diagram keeps its id, box, layout mode
    /// and tab and takes everything else from the generated one.
    pub fn add_diagram_from_theory(
        &self,
        library: &Library,
        canvas: Size,
        label_mode: LabelMode,
        replace: Option<&DiagramId>,
    ) -> (Self, DiagramId) {
        let (tabs, mut tab_id) = self.target_tab();
        let replaced = replace.and_then(|id| self.diagram(id));
        if let Some(tab) = replaced.and_then(|d| d.tab_id.clone()) {
            tab_id = tab;
        }
        let (position, layout) = self.placement(&tab_id, canvas);

        let key_id = self.key_id.as_deref();
        let scale_id = self.scale_id.as_deref();
        let position_id = self.position_id.as_deref();
        let selection = library.resolve(key_id, scale_id, position_id);
        let theory_name = library.theory_name(key_id, scale_id, position_id);
        let defaults = NeckConfig::default();
        let frets = selection
            .position_name
            .and_then(position_preset)
            .map_or(defaults.frets, |preset| defaults.frets.max(preset.min_frets));

        let mut diagram = NeckDiagram {
            x: position.x,
            y: position.y,
            label_mode,
            tab_id: Some(tab_id.clone()),
            layout_mode: Some(layout),
            config: NeckConfig { frets, ..defaults },
            key_id: self.key_id.clone(),
            scale_id: self.scale_id.clone(),
            position_id: self.position_id.clone(),
            ..NeckDiagram::new(if theory_name.is_empty() {
                format!("Neck {}", self.diagrams.len() + 1)
            } else {
                theory_name
            })
        };
        diagram.notes = build_scale_notes(
            &diagram,
            selection.key_name,
            selection.intervals,
            selection.position_name,
        );

        let mut next = self.clone();
        next.tabs = tabs;
        let id = match replaced {
            Some(old) => {
                let merged = NeckDiagram {
                    id: old.id.clone(),
                    x: old.x,
                    y: old.y,
                    width: old.width,
                    height: old.height,
                    layout_mode: old.layout_mode.or(diagram.layout_mode),
                    tab_id: old.tab_id.clone(),
                    ..diagram
                };
                let id = merged.id.clone();
                for slot in next.diagrams.iter_mut().filter(|d| d.id == id) {
                    *slot = merged.clone();
                }
                id
            }
            None => {
                let id = diagram.id.clone();
                next.diagrams.push(diagram);
                id
            }
        };
        next.selected_diagram_id = Some(id.clone());
        next.active_tab_id = Some(tab_id);
        (next, id)
    }

    /// Returns a copy with one diagram transformed.
    pub fn update_diagram(&self, id: &DiagramId, update: impl FnOnce(&mut NeckDiagram)) -> Self {
        let mut next = self.clone();
        if let Some(diagram) = next.diagrams.iter_mut().find(|d| &d.id == id) {
            update(diagram);
        }
        next
    }

    pub fn select_diagram(&self, id: &DiagramId) -> Self {
        Self {
            selected_diagram_id: Some(id.clone()),
            ..self.clone()
        }
    }

    pub fn deselect(&self) -> Self {
        Self {
            selected_diagram_id: None,
            ..self.clone()
        }
    }

    /// Renames a diagram. Blank names are ignored.
    pub fn rename_diagram(&self, id: &DiagramId, name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return self.clone();
        }
        self.update_diagram(id, |d| d.name = trimmed.to_string())
    }

    /// Removes a diagram. If it was selected, the first remaining diagram
    /// becomes the selection.
    pub fn delete_diagram(&self, id: &DiagramId) -> Self {
        let mut next = self.clone();
        next.diagrams.retain(|d| &d.id != id);
        if next.selected_diagram_id.as_ref() == Some(id) {
            next.selected_diagram_id = next.diagrams.first().map(|d| d.id.clone());
        }
        next
    }

    /// Appends a tab named "Tab N" and activates it.
    pub fn add_tab(&self) -> (Self, TabId) {
        let tab = ProjectTab::new(format!("Tab {}", self.tabs.len() + 1));
        let id = tab.id.clone();
        let mut next = self.clone();
        next.tabs.push(tab);
        next.active_tab_id = Some(id.clone());
        (next, id)
    }

    pub fn select_tab(&self, id: &TabId) -> Self {
        Self {
            active_tab_id: Some(id.clone()),
            ..self.clone()
        }
    }

    /// Removes a tab and its diagrams.
    ///
    /// The last remaining tab is never removed. When the active tab goes
    /// away the tab before it becomes active; an invalidated selection moves
    /// to the first diagram of the new active tab, else the first diagram.
    pub fn delete_tab(&self, id: &TabId) -> Self {
        if self.tabs.len() <= 1 {
            return self.clone();
        }
        let Some(removed_index) = self.tab_index(id) else {
            return self.clone();
        };

        let mut next = self.clone();
        next.tabs.remove(removed_index);
        let still_valid = next
            .active_tab_id
            .as_ref()
            .is_some_and(|active| next.tab(active).is_some());
        if !still_valid {
            let fallback = &next.tabs[removed_index.saturating_sub(1).min(next.tabs.len() - 1)];
            next.active_tab_id = Some(fallback.id.clone());
        }

        next.diagrams.retain(|d| d.tab_id.as_ref() != Some(id));
        let selection_valid = next
            .selected_diagram_id
            .as_ref()
            .is_some_and(|sel| next.diagram(sel).is_some());
        if !selection_valid {
            let active = next.active_tab_id.clone();
            next.selected_diagram_id = next
                .diagrams
                .iter()
                .find(|d| d.tab_id == active)
                .or_else(|| next.diagrams.first())
                .map(|d| d.id.clone());
        }
        next
    }

    /// Moves a diagram to another tab, activating the tab and selecting
    /// the diagram. Unknown tabs are ignored.
    pub fn move_diagram_to_tab(&self, id: &DiagramId, tab: &TabId) -> Self {
        if self.tab(tab).is_none() {
            return self.clone();
        }
        let mut next = self.update_diagram(id, |d| d.tab_id = Some(tab.clone()));
        next.active_tab_id = Some(tab.clone());
        next.selected_diagram_id = Some(id.clone());
        next
    }

    pub fn toggle_note(&self, id: &DiagramId, string_index: usize, fret: i32) -> Self {
        self.update_diagram(id, |d| d.toggle_note(string_index, fret))
    }

    pub fn patch_config(&self, id: &DiagramId, patch: &ConfigPatch) -> Self {
        self.update_diagram(id, |d| d.patch_config(patch))
    }

    pub fn set_label_mode(&self, id: &DiagramId, mode: LabelMode) -> Self {
        self.update_diagram(id, |d| d.label_mode = mode)
    }

    /// Switches a diagram between grid and float.
    ///
    /// Returning to grid re-tiles the diagram around the other grid
    /// diagrams of the active tab.
    pub fn set_layout_mode(&self, id: &DiagramId, mode: LayoutMode, canvas: Size) -> Self {
        let Some(diagram) = self.diagram(id) else {
            return self.clone();
        };
        if mode == LayoutMode::Float {
            return self.update_diagram(id, |d| d.layout_mode = Some(LayoutMode::Float));
        }
        let others: Vec<Rect> = self
            .active_diagrams()
            .into_iter()
            .filter(|d| &d.id != id && d.is_grid())
            .map(|d| d.bounds())
            .collect();
        let spot = suggest_tile(&others, canvas, diagram.bounds().size(), TILE_GAP);
        self.update_diagram(id, |d| {
            d.layout_mode = Some(LayoutMode::Grid);
            d.x = spot.x;
            d.y = spot.y;
        })
    }

    /// Applies a library item to the project's theory selection.
    pub fn apply_library_selection(&self, item: &LibraryItem) -> Self {
        let mut next = self.clone();
        match item.item_type {
            LibraryItemType::Key => next.key_id = Some(item.id.clone()),
            LibraryItemType::Scale | LibraryItemType::Mode => {
                next.scale_id = Some(item.id.clone())
            }
            LibraryItemType::Position => next.position_id = Some(item.id.clone()),
            LibraryItemType::Shape => {}
        }
        next
    }

    /// Returns the display names of all tabs in order.
    pub fn tab_display_names(&self) -> Vec<String> {
        self.tabs
            .iter()
            .enumerate()
            .map(|(i, tab)| tab.display_name(i))
            .collect()
    }

    /// Re-tiles the active tab's grid diagrams if any of them collide.
    ///
    /// Returns None when the layout is already free of overlaps or nothing
    /// would move.
    pub fn repair_layout(&self, canvas: Size) -> Option<Self> {
        let tab = self.active_tab()?.clone();
        let (grid, floating): (Vec<&NeckDiagram>, Vec<&NeckDiagram>) =
            self.diagrams_in_tab(&tab).partition(|d| d.is_grid());
        if grid.is_empty() {
            return None;
        }
        let grid_boxes: Vec<Rect> = grid.iter().map(|d| d.bounds()).collect();
        let floating_boxes: Vec<Rect> = floating.iter().map(|d| d.bounds()).collect();
        if !needs_relayout(&grid_boxes, &floating_boxes, TILE_GAP) {
            return None;
        }

        let positions = relayout(&grid_boxes, &floating_boxes, canvas, TILE_GAP);
        let moves: Vec<(DiagramId, Point)> = grid
            .iter()
            .zip(positions)
            .filter(|(d, p)| d.x != p.x || d.y != p.y)
            .map(|(d, p)| (d.id.clone(), p))
            .collect();
        if moves.is_empty() {
            return None;
        }

        let mut next = self.clone();
        for (id, spot) in moves {
            if let Some(d) = next.diagrams.iter_mut().find(|d| d.id == id) {
                d.x = spot.x;
                d.y = spot.y;
            }
        }
        Some(next)
    }

    /// Stamps `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = Some(now_timestamp());
    }
}

/// A persisted project with its bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub data: ProjectData,
    pub created_at: String,
    pub updated_at: String,
    pub last_opened_at: String,
}

impl ProjectRecord {
    /// Wraps project data in a new record.
    pub fn new(id: impl Into<String>, title: impl Into<String>, data: ProjectData) -> Self {
        let now = now_timestamp();
        Self {
            id: id.into(),
            title: title.into(),
            data,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_opened_at: now,
        }
    }

    /// Creates a blank record that only exists locally.
    pub fn local_blank() -> Self {
        Self::new(
            format!("local-{}", Uuid::new_v4()),
            DEFAULT_PROJECT_TITLE,
            ProjectData::blank(),
        )
    }

    /// Sets the title, falling back to the default title when blank.
    pub fn set_title(&mut self, title: &str) {
        self.title = if title.trim().is_empty() {
            DEFAULT_PROJECT_TITLE.to_string()
        } else {
            title.to_string()
        };
        self.updated_at = now_timestamp();
    }

    /// Saves the record to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Loads a record from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
