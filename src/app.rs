//! Studio state.
//!
//! The studio owns the open project record, the theory library and the two
//! persistence ports. Every edit replaces the project snapshot and marks it
//! modified; saving is debounced through [`Studio::check_autosave`].

use crate::drag::{DragMode, DragSession, DropTarget};
use crate::neck::{
    build_diagram_export, build_page_export, import_diagrams, import_pages,
    normalize_project_data, now_timestamp, ConfigPatch, DiagramExport, DiagramId, ExportError,
    ImportError, LabelMode, LayoutMode, Library, LibraryItem, PageExport, ProjectData,
    ProjectRecord, TabId, DEFAULT_PROJECT_TITLE,
};
use crate::store::ProjectStore;
use crate::tiling::{Point, Size};
use chrono::Utc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Quiet period after the last edit before the project is saved.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(800);

/// Canvas size assumed until the host reports its own.
pub const DEFAULT_CANVAS: Size = Size::new(1200.0, 800.0);

/// The open project and everything needed to edit and persist it.
pub struct Studio {
    record: ProjectRecord,
    remote: Box<dyn ProjectStore>,
    local: Box<dyn ProjectStore>,
    /// Cleared after the first failed remote save; from then on only the
    /// local cache is written.
    remote_healthy: bool,
    library: Library,
    /// Canvas size used for tiling.
    pub canvas: Size,
    /// Label mode given to new diagrams.
    pub label_mode: LabelMode,
    drag: Option<DragSession>,
    last_modified: Option<Instant>,
    last_save: Option<Instant>,
}

impl Studio {
    /// Opens the most recent project.
    ///
    /// The remote store is asked first; when it has nothing a blank project
    /// is created there. If the remote store fails the local cache is used,
    /// and if that is empty too a blank local-only project is started.
    ///
    /// # Arguments
    ///
    /// * `remote` - Primary store
    /// * `local` - Local cache, written on every save
    pub fn open(mut remote: Box<dyn ProjectStore>, local: Box<dyn ProjectStore>) -> Self {
        let (mut record, remote_healthy) = match remote.load_last() {
            Ok(Some(record)) => (record, true),
            Ok(None) => {
                let record = ProjectRecord::new(
                    Uuid::new_v4().to_string(),
                    DEFAULT_PROJECT_TITLE,
                    ProjectData::blank(),
                );
                match remote.save(&record) {
                    Ok(()) => {
                        tracing::info!(id = %record.id, "Created new project");
                        (record, true)
                    }
                    Err(e) => {
                        tracing::warn!("Could not create project remotely: {}", e);
                        (Self::recover(local.as_ref()), false)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Could not load project, using local cache: {}", e);
                (Self::recover(local.as_ref()), false)
            }
        };

        record.data = normalize_project_data(record.data);
        record.last_opened_at = now_timestamp();

        Self {
            record,
            remote,
            local,
            remote_healthy,
            library: Library::default(),
            canvas: DEFAULT_CANVAS,
            label_mode: LabelMode::default(),
            drag: None,
            last_modified: None,
            last_save: None,
        }
    }

    fn recover(local: &dyn ProjectStore) -> ProjectRecord {
        match local.load_last() {
            Ok(Some(record)) => {
                tracing::info!(id = %record.id, "Recovered project from local cache");
                record
            }
            Ok(None) => ProjectRecord::local_blank(),
            Err(e) => {
                tracing::warn!("Local cache unreadable: {}", e);
                ProjectRecord::local_blank()
            }
        }
    }

    // ==================== Accessors ====================

    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }

    /// Returns the current project snapshot.
    pub fn data(&self) -> &ProjectData {
        &self.record.data
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Returns true while saves still go to the remote store.
    pub fn is_remote_healthy(&self) -> bool {
        self.remote_healthy
    }

    /// Returns true if there are edits not yet saved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.last_modified
            .is_some_and(|modified| self.last_save.is_none_or(|saved| saved < modified))
    }

    // ==================== Editing ====================

    /// Replaces the snapshot with the result of `edit`.
    ///
    /// Overlapping grid diagrams in the active tab are re-tiled before the
    /// snapshot is stored.
    pub fn update(&mut self, edit: impl FnOnce(&ProjectData) -> ProjectData) {
        let next = edit(&self.record.data);
        let mut next = next.repair_layout(self.canvas).unwrap_or(next);
        next.touch();
        self.record.data = next;
        self.mark_modified();
    }

    /// Marks the project as modified, triggering autosave after delay.
    pub fn mark_modified(&mut self) {
        self.last_modified = Some(Instant::now());
    }

    /// Starts over with a new project, seeded with the demo diagrams if
    /// `demo` is set.
    pub fn new_project(&mut self, demo: bool) {
        let data = if demo {
            ProjectData::demo()
        } else {
            ProjectData::blank()
        };
        let id = if self.remote_healthy {
            Uuid::new_v4().to_string()
        } else {
            format!("local-{}", Uuid::new_v4())
        };
        self.record = ProjectRecord::new(id, DEFAULT_PROJECT_TITLE, data);
        self.drag = None;
        self.mark_modified();
    }

    pub fn set_title(&mut self, title: &str) {
        self.record.set_title(title);
        self.mark_modified();
    }

    pub fn add_diagram(&mut self) -> DiagramId {
        let (canvas, mode) = (self.canvas, self.label_mode);
        let mut added = None;
        self.update(|data| {
            let (next, id) = data.add_diagram(canvas, mode);
            added = Some(id);
            next
        });
        added.unwrap_or_default()
    }

    /// Adds a diagram built from the project's key, scale and position, or
    /// regenerates `replace` in place.
    pub fn add_diagram_from_theory(&mut self, replace: Option<&DiagramId>) -> DiagramId {
        let (canvas, mode) = (self.canvas, self.label_mode);
        let library = &self.library;
        let (next, id) =
            self.record
                .data
                .add_diagram_from_theory(library, canvas, mode, replace);
        self.update(|_| next);
        id
    }

    pub fn select_diagram(&mut self, id: &DiagramId) {
        self.update(|data| data.select_diagram(id));
    }

    pub fn deselect(&mut self) {
        self.update(ProjectData::deselect);
    }

    pub fn rename_diagram(&mut self, id: &DiagramId, name: &str) {
        self.update(|data| data.rename_diagram(id, name));
    }

    pub fn delete_diagram(&mut self, id: &DiagramId) {
        self.update(|data| data.delete_diagram(id));
    }

    pub fn add_tab(&mut self) -> TabId {
        let mut added = None;
        self.update(|data| {
            let (next, id) = data.add_tab();
            added = Some(id);
            next
        });
        added.unwrap_or_default()
    }

    pub fn select_tab(&mut self, id: &TabId) {
        self.update(|data| data.select_tab(id));
    }

    pub fn delete_tab(&mut self, id: &TabId) {
        self.update(|data| data.delete_tab(id));
    }

    pub fn move_diagram_to_tab(&mut self, id: &DiagramId, tab: &TabId) {
        self.update(|data| data.move_diagram_to_tab(id, tab));
    }

    pub fn toggle_note(&mut self, id: &DiagramId, string_index: usize, fret: i32) {
        self.update(|data| data.toggle_note(id, string_index, fret));
    }

    pub fn patch_config(&mut self, id: &DiagramId, patch: &ConfigPatch) {
        self.update(|data| data.patch_config(id, patch));
    }

    pub fn set_label_mode(&mut self, id: &DiagramId, mode: LabelMode) {
        self.update(|data| data.set_label_mode(id, mode));
    }

    pub fn set_layout_mode(&mut self, id: &DiagramId, mode: LayoutMode) {
        let canvas = self.canvas;
        self.update(|data| data.set_layout_mode(id, mode, canvas));
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.update(|data| ProjectData {
            search_query: Some(query.to_string()).filter(|q| !q.is_empty()),
            ..data.clone()
        });
    }

    /// Applies a library item to the theory selection.
    ///
    /// # Returns
    ///
    /// false if no item has that id
    pub fn select_library_item(&mut self, id: &str) -> bool {
        let Some(item) = self.library.get(id).cloned() else {
            tracing::debug!(id, "Unknown library item");
            return false;
        };
        self.update(|data| data.apply_library_selection(&item));
        true
    }

    /// Adds or replaces a library item and selects it.
    pub fn save_library_item(&mut self, item: LibraryItem) {
        self.library.upsert(item.clone());
        self.update(|data| data.apply_library_selection(&item));
    }

    // ==================== Dragging ====================

    /// Starts dragging a diagram. Any drag already in progress is dropped.
    ///
    /// # Returns
    ///
    /// false if the diagram does not exist
    pub fn begin_drag(&mut self, id: &DiagramId, mode: DragMode, pointer: Point) -> bool {
        match DragSession::begin(&self.record.data, id, mode, pointer) {
            Some((session, next)) => {
                self.drag = Some(session);
                self.update(|_| next);
                true
            }
            None => {
                self.drag = None;
                false
            }
        }
    }

    /// Follows the pointer with the dragged diagram.
    pub fn drag_to(&mut self, pointer: Point, zoom: f64) {
        let Some(session) = self.drag.take() else {
            return;
        };
        self.update(|data| session.update(data, pointer, zoom));
        self.drag = Some(session);
    }

    /// Finishes the current drag over `target`.
    pub fn end_drag(&mut self, target: DropTarget) {
        if let Some(session) = self.drag.take() {
            self.update(|data| session.end(data, target));
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ==================== Import / export ====================

    /// Imports pages from JSON text.
    ///
    /// An empty project is replaced, otherwise the pages are merged in.
    /// Either way the project takes the imported title.
    ///
    /// # Errors
    ///
    /// Returns the import rejection; the project is left untouched
    pub fn import_pages(&mut self, text: &str, fallback_title: &str) -> Result<(), ImportError> {
        let imported = import_pages(&self.record.data, text, fallback_title)?;
        self.record.set_title(&imported.title);
        let data = normalize_project_data(imported.data);
        self.update(|_| data);
        Ok(())
    }

    /// Imports diagrams from JSON text into the active tab.
    ///
    /// # Errors
    ///
    /// Returns the import rejection; the project is left untouched
    pub fn import_diagrams(&mut self, text: &str) -> Result<(), ImportError> {
        let data = import_diagrams(&self.record.data, text)?;
        self.update(|_| data);
        Ok(())
    }

    /// Exports the active tab under the project title.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::EmptyPage` if the active tab has no diagrams
    pub fn export_page(&self) -> Result<PageExport, ExportError> {
        build_page_export(&self.record.data, &self.record.title, Utc::now())
    }

    pub fn export_diagram(&self, id: &DiagramId) -> Option<DiagramExport> {
        self.record
            .data
            .diagram(id)
            .map(|diagram| build_diagram_export(diagram, Utc::now()))
    }

    // ==================== Saving ====================

    /// Saves if the debounce window since the last edit has passed and the
    /// edit has not been saved yet.
    ///
    /// # Returns
    ///
    /// true if a save was performed
    pub fn check_autosave(&mut self, now: Instant) -> bool {
        let Some(modified) = self.last_modified else {
            return false;
        };
        let due = now.saturating_duration_since(modified) >= AUTOSAVE_DELAY
            && self.last_save.is_none_or(|saved| saved < modified);
        if due {
            self.save_at(now);
        }
        due
    }

    /// Saves immediately, bypassing the debounce window.
    pub fn force_save(&mut self) {
        self.save_at(Instant::now());
    }

    fn save_at(&mut self, now: Instant) {
        self.record.updated_at = now_timestamp();

        if let Err(e) = self.local.save(&self.record) {
            tracing::warn!("Local cache save failed: {}", e);
        }
        if self.remote_healthy {
            if let Err(e) = self.remote.save(&self.record) {
                tracing::warn!("Remote save failed, continuing offline: {}", e);
                self.remote_healthy = false;
            }
        }
        self.last_save = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn open(remote: &MemoryStore, local: &MemoryStore) -> Studio {
        Studio::open(Box::new(remote.clone()), Box::new(local.clone()))
    }

    #[test]
    fn test_open_existing_remote_project() {
        let mut stored = ProjectRecord::new("p1", "Scales", ProjectData::demo());
        stored.data.tabs.clear();
        let remote = MemoryStore::with_record(stored);
        let studio = open(&remote, &MemoryStore::new());

        assert!(studio.is_remote_healthy());
        assert_eq!(studio.record().id, "p1");
        // Normalized on load
        assert_eq!(studio.data().tabs.len(), 1);
        assert!(!studio.has_unsaved_changes());
    }

    #[test]
    fn test_open_creates_project_remotely() {
        let remote = MemoryStore::new();
        let studio = open(&remote, &MemoryStore::new());
        assert!(studio.is_remote_healthy());
        assert_eq!(remote.save_count(), 1);
        assert_eq!(remote.last().map(|r| r.id), Some(studio.record().id.clone()));
        assert_eq!(studio.record().title, DEFAULT_PROJECT_TITLE);
    }

    #[test]
    fn test_open_recovers_from_local_cache() {
        let local = MemoryStore::with_record(ProjectRecord::new("cached", "Offline", ProjectData::demo()));
        let studio = open(&MemoryStore::failing(), &local);
        assert!(!studio.is_remote_healthy());
        assert_eq!(studio.record().id, "cached");
        assert_eq!(studio.data().diagrams.len(), 3);
    }

    #[test]
    fn test_open_without_any_store() {
        let studio = open(&MemoryStore::failing(), &MemoryStore::failing());
        assert!(studio.record().id.starts_with("local-"));
        assert!(studio.data().diagrams.is_empty());
    }

    #[test]
    fn test_autosave_is_debounced() {
        let remote = MemoryStore::new();
        let local = MemoryStore::new();
        let mut studio = open(&remote, &local);
        assert!(!studio.check_autosave(Instant::now()));

        let id = studio.add_diagram();
        studio.toggle_note(&id, 0, 3);
        assert!(studio.has_unsaved_changes());
        let edited = Instant::now();
        assert!(!studio.check_autosave(edited));

        assert!(studio.check_autosave(edited + AUTOSAVE_DELAY));
        assert!(!studio.check_autosave(edited + AUTOSAVE_DELAY * 2));
        assert!(!studio.has_unsaved_changes());

        assert_eq!(remote.save_count(), 2);
        assert_eq!(local.save_count(), 1);
        let saved = remote.last().unwrap();
        assert_eq!(saved.data.diagram(&id).unwrap().notes.len(), 1);
    }

    #[test]
    fn test_remote_failure_switches_to_local_only() {
        let remote = MemoryStore::new();
        let local = MemoryStore::new();
        let mut studio = open(&remote, &local);

        remote.set_failing(true);
        studio.add_diagram();
        studio.force_save();
        assert!(!studio.is_remote_healthy());
        assert_eq!(local.save_count(), 1);

        // Editing continues and the remote store is left alone
        remote.set_failing(false);
        studio.add_diagram();
        studio.force_save();
        assert_eq!(remote.save_count(), 1);
        assert_eq!(local.save_count(), 2);
        assert_eq!(local.last().unwrap().data.diagrams.len(), 2);
    }

    #[test]
    fn test_theory_selection_from_library() {
        let mut studio = open(&MemoryStore::new(), &MemoryStore::new());
        assert!(studio.select_library_item("default:key:a"));
        assert!(studio.select_library_item("default:scale:minor-pentatonic"));
        assert!(!studio.select_library_item("default:scale:nope"));

        let id = studio.add_diagram_from_theory(None);
        let diagram = studio.data().diagram(&id).unwrap();
        assert_eq!(diagram.name, "A - Minor Pentatonic");
        assert!(!diagram.notes.is_empty());
        assert_eq!(studio.data().selected_diagram_id.as_ref(), Some(&id));
    }

    #[test]
    fn test_custom_library_item() {
        let mut studio = open(&MemoryStore::new(), &MemoryStore::new());
        let item = LibraryItem {
            id: "user:scale:hirajoshi".into(),
            name: "Hirajoshi".into(),
            intervals: Some(vec![0, 2, 3, 7, 8]),
            ..studio.library().get("default:scale:blues").unwrap().clone()
        };
        studio.save_library_item(item);
        assert_eq!(studio.data().scale_id.as_deref(), Some("user:scale:hirajoshi"));
        assert!(studio.library().get("user:scale:hirajoshi").is_some());
    }

    #[test]
    fn test_drag_to_trash() {
        let mut studio = open(&MemoryStore::new(), &MemoryStore::new());
        let id = studio.add_diagram();
        assert!(studio.begin_drag(&id, DragMode::Move, Point { x: 0.0, y: 0.0 }));
        studio.drag_to(Point { x: 40.0, y: 40.0 }, 1.0);
        assert!(studio.is_dragging());
        studio.end_drag(DropTarget::Trash);
        assert!(!studio.is_dragging());
        assert!(studio.data().diagrams.is_empty());

        assert!(!studio.begin_drag(&id, DragMode::Move, Point { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn test_import_pages_takes_title() {
        let page_text = |title: &str| {
            let mut source = open(&MemoryStore::new(), &MemoryStore::new());
            source.set_title(title);
            source.add_diagram();
            serde_json::to_string(&source.export_page().unwrap()).unwrap()
        };

        let mut studio = open(&MemoryStore::new(), &MemoryStore::new());
        assert_eq!(studio.import_pages("{", "file"), Err(ImportError::InvalidJson));
        studio.import_pages(&page_text("Warmups"), "file").unwrap();
        assert_eq!(studio.record().title, "Warmups");
        assert_eq!(studio.data().diagrams.len(), 1);

        // Merging into a non-empty project also takes the title
        studio.import_pages(&page_text("Arpeggios"), "file").unwrap();
        assert_eq!(studio.record().title, "Arpeggios");
        assert_eq!(studio.data().diagrams.len(), 2);
        assert_eq!(studio.data().tabs.len(), 2);
    }

    #[test]
    fn test_export_empty_page() {
        let studio = open(&MemoryStore::new(), &MemoryStore::new());
        assert_eq!(studio.export_page().unwrap_err(), ExportError::EmptyPage);
    }

    #[test]
    fn test_new_project_offline_is_local() {
        let mut studio = open(&MemoryStore::failing(), &MemoryStore::new());
        studio.new_project(true);
        assert!(studio.record().id.starts_with("local-"));
        assert_eq!(studio.data().diagrams.len(), 3);
        assert!(studio.has_unsaved_changes());
    }
}
