//! Structural repair of project documents.
//!
//! Documents coming from storage or imports may reference tabs and
//! diagrams that no longer exist. Normalization fixes those references
//! instead of rejecting the document.

use super::config::{apply_config_patch, ConfigPatch};
use super::diagram::{normalize_notes, DiagramId, LayoutMode, NeckDiagram};
use super::project::{now_timestamp, ProjectData, ProjectTab, TabId};
use std::collections::HashSet;

/// Re-establishes the config invariants and note uniqueness of a diagram.
fn repair_diagram(diagram: &mut NeckDiagram) {
    diagram.config = apply_config_patch(&diagram.config, &ConfigPatch::default());
    diagram.notes = normalize_notes(&diagram.notes);
    if diagram.layout_mode.is_none() {
        diagram.layout_mode = Some(LayoutMode::Grid);
    }
}

/// Repairs the references of a project document.
///
/// Guarantees at least one tab, a valid active tab, a valid tab for every
/// diagram and a selection that resolves or is cleared. `created_at` is
/// kept when present and `updated_at` is stamped with the current time.
/// Applying it twice yields the same document apart from `updated_at`.
pub fn normalize_project_data(data: ProjectData) -> ProjectData {
    let now = now_timestamp();
    let mut data = data;

    data.tabs.retain(|tab| !tab.id.is_empty());
    if data.tabs.is_empty() {
        tracing::debug!("Project has no tabs, creating a default tab");
        data.tabs.push(ProjectTab::new("Tab 1"));
    }

    let active = match &data.active_tab_id {
        Some(id) if data.tabs.iter().any(|t| &t.id == id) => id.clone(),
        _ => data.tabs[0].id.clone(),
    };

    let known: HashSet<&TabId> = data.tabs.iter().map(|t| &t.id).collect();
    let mut reassigned = 0usize;
    let diagrams: Vec<NeckDiagram> = data
        .diagrams
        .iter()
        .cloned()
        .map(|mut diagram| {
            if !diagram.tab_id.as_ref().is_some_and(|id| known.contains(id)) {
                diagram.tab_id = Some(active.clone());
                reassigned += 1;
            }
            repair_diagram(&mut diagram);
            diagram
        })
        .collect();
    if reassigned > 0 {
        tracing::debug!(count = reassigned, "Reassigned diagrams to the active tab");
    }
    data.diagrams = diagrams;
    data.active_tab_id = Some(active);

    let selection_valid = data
        .selected_diagram_id
        .as_ref()
        .is_some_and(|id| data.diagrams.iter().any(|d| &d.id == id));
    if !selection_valid {
        data.selected_diagram_id = None;
    }

    if data.created_at.is_none() {
        data.created_at = Some(now.clone());
    }
    data.updated_at = Some(now);
    data
}

/// Prepares a diagram from an import for insertion into a project.
///
/// The id is kept unless it is blank or already in `existing_ids`, in which
/// case a fresh one is generated. The resulting id is added to
/// `existing_ids` so a batch of imports cannot collide with itself.
pub fn normalize_imported_diagram(
    diagram: NeckDiagram,
    tab_id: &TabId,
    existing_ids: &mut HashSet<DiagramId>,
) -> NeckDiagram {
    let mut diagram = diagram;
    if diagram.id.as_str().trim().is_empty() || existing_ids.contains(&diagram.id) {
        let fresh = DiagramId::new();
        tracing::debug!(old = %diagram.id, new = %fresh, "Imported diagram id collides");
        diagram.id = fresh;
    }
    existing_ids.insert(diagram.id.clone());
    diagram.tab_id = Some(tab_id.clone());
    repair_diagram(&mut diagram);
    diagram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neck::{LabelMode, NeckConfig, Note};

    fn diagram_in(tab: &str) -> NeckDiagram {
        NeckDiagram {
            tab_id: Some(TabId::from(tab)),
            ..NeckDiagram::new("Neck")
        }
    }

    #[test]
    fn test_empty_project_gets_a_tab() {
        let data = normalize_project_data(ProjectData::default());
        assert_eq!(data.tabs.len(), 1);
        assert_eq!(data.tabs[0].name, "Tab 1");
        assert_eq!(data.active_tab_id.as_ref(), Some(&data.tabs[0].id));
        assert!(data.created_at.is_some());
        assert!(data.updated_at.is_some());
    }

    #[test]
    fn test_dangling_references_are_repaired() {
        let mut data = ProjectData::blank();
        let tab = data.tabs[0].id.clone();
        data.active_tab_id = Some(TabId::from("gone"));
        data.diagrams = vec![diagram_in("gone"), diagram_in(tab.as_str())];
        data.diagrams[0].layout_mode = None;
        data.selected_diagram_id = Some(DiagramId::from("missing"));

        let data = normalize_project_data(data);
        assert_eq!(data.active_tab_id.as_ref(), Some(&tab));
        assert!(data.diagrams.iter().all(|d| d.tab_id.as_ref() == Some(&tab)));
        assert_eq!(data.diagrams[0].layout_mode, Some(LayoutMode::Grid));
        assert_eq!(data.selected_diagram_id, None);
    }

    #[test]
    fn test_blank_tab_ids_are_dropped() {
        let mut data = ProjectData::blank();
        data.tabs.insert(0, ProjectTab { id: TabId::from(""), name: "Ghost".into() });
        let data = normalize_project_data(data);
        assert_eq!(data.tabs.len(), 1);
        assert_eq!(data.tabs[0].name, "Tab 1");
    }

    #[test]
    fn test_created_at_is_preserved() {
        let mut data = ProjectData::blank();
        data.created_at = Some("2024-01-01T00:00:00.000Z".to_string());
        let data = normalize_project_data(data);
        assert_eq!(data.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_normalization_converges() {
        let mut data = ProjectData::demo();
        data.tabs.clear();
        data.diagrams[0].notes.push(Note::new(0, 3));
        data.diagrams[1].config.tuning.truncate(2);
        data.selected_diagram_id = Some(data.diagrams[2].id.clone());

        let once = normalize_project_data(data);
        let mut twice = normalize_project_data(once.clone());
        twice.updated_at = once.updated_at.clone();
        assert_eq!(once, twice);
        assert_eq!(once.diagrams[0].notes.len(), 12);
        assert_eq!(once.diagrams[1].config.tuning.len(), 7);
        assert!(once.selected_diagram_id.is_some());
    }

    #[test]
    fn test_parse_then_normalize_strips_deprecated_config() {
        let json = r#"{
            "diagrams": [{"id": "d1", "tabId": "t1", "config": {"strings": 4, "scaleLength": 25.5}}],
            "tabs": [{"id": "t1", "name": "Bass"}],
            "activeTabId": "t1",
            "createdAt": "   "
        }"#;
        let data = normalize_project_data(ProjectData::from_json(json).unwrap());
        let config = &data.diagrams[0].config;
        assert_eq!(config.strings, 4);
        assert_eq!(config.tuning.len(), 4);
        let value = serde_json::to_value(config).unwrap();
        assert!(value.get("scaleLength").is_none());
        assert_ne!(data.created_at.as_deref(), Some("   "));
    }

    #[test]
    fn test_imported_id_collision() {
        let tab = TabId::from("target");
        let mut existing: HashSet<DiagramId> = [DiagramId::from("d1")].into_iter().collect();

        let first = normalize_imported_diagram(
            NeckDiagram { id: DiagramId::from("d1"), ..NeckDiagram::new("A") },
            &tab,
            &mut existing,
        );
        let second = normalize_imported_diagram(
            NeckDiagram { id: DiagramId::from("d2"), ..NeckDiagram::new("B") },
            &tab,
            &mut existing,
        );
        let third = normalize_imported_diagram(
            NeckDiagram { id: DiagramId::from("d2"), ..NeckDiagram::new("C") },
            &tab,
            &mut existing,
        );

        assert_ne!(first.id.as_str(), "d1");
        assert_eq!(second.id.as_str(), "d2");
        assert_ne!(third.id.as_str(), "d2");
        assert_eq!(existing.len(), 4);
        assert!([&first, &second, &third]
            .iter()
            .all(|d| d.tab_id.as_ref() == Some(&tab)));
    }

    #[test]
    fn test_imported_defaults() {
        let diagram: NeckDiagram =
            serde_json::from_str(r#"{"id": "", "notes": null, "config": {"frets": 5}}"#).unwrap();
        let mut existing = HashSet::new();
        let diagram = normalize_imported_diagram(diagram, &TabId::from("t"), &mut existing);
        assert!(!diagram.id.as_str().is_empty());
        assert!(diagram.notes.is_empty());
        assert_eq!(diagram.label_mode, LabelMode::Key);
        assert_eq!(diagram.layout_mode, Some(LayoutMode::Grid));
        assert_eq!(
            diagram.config,
            NeckConfig {
                frets: 5,
                ..NeckConfig::default()
            }
        );
    }
}
