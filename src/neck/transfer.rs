//! JSON import and export envelopes.
//!
//! Two envelope shapes are produced: a single diagram and a page (one tab
//! of diagrams wrapped as a project). Imports accept both shapes as well
//! as bare project documents and bare diagrams.

use super::diagram::{DiagramId, NeckDiagram};
use super::library::slugify;
use super::normalize::{normalize_imported_diagram, normalize_project_data};
use super::project::{ProjectData, ProjectTab, TabId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Version stamped on every export envelope.
pub const EXPORT_VERSION: u32 = 1;

/// Title used for page imports that carry none and come from an unnamed file.
const IMPORTED_PROJECT_TITLE: &str = "Imported Project";

/// Errors that reject an import outright.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Invalid JSON file.")]
    InvalidJson,

    #[error("JSON does not contain a valid neck diagram project.")]
    NoProject,

    #[error("JSON does not contain a valid diagram.")]
    NoDiagram,
}

/// Errors that prevent an export.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Add a neck diagram before exporting.")]
    EmptyPage,
}

/// Envelope for a single exported diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramExport {
    pub diagram: NeckDiagram,
    pub exported_at: String,
    pub version: u32,
}

/// When a page export was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: String,
    /// Human-readable date, e.g. "Friday, Feb 6, 2026".
    pub exported_on: String,
}

/// Envelope for an exported page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExport {
    pub title: String,
    pub data: ProjectData,
    pub metadata: ExportMetadata,
    pub version: u32,
}

/// The title and project found in an imported document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPayload {
    pub title: Option<String>,
    pub data: Option<ProjectData>,
}

/// Result of a page import.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImport {
    pub title: String,
    pub data: ProjectData,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a date the way page exports label it.
pub fn format_export_date(at: DateTime<Utc>) -> String {
    at.format("%A, %b %-d, %Y").to_string()
}

/// Builds a `.json` file name from a slug of `base`, or of `fallback` when
/// the slug is empty.
pub fn export_file_name(base: &str, fallback: &str) -> String {
    let slug = slugify(base);
    if slug.is_empty() {
        format!("{fallback}.json")
    } else {
        format!("{slug}.json")
    }
}

/// Derives an import title from a file name.
pub fn title_from_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    let stem = match trimmed.len().checked_sub(5) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".json") => {
            &trimmed[..cut]
        }
        _ => trimmed,
    };
    let stem = stem.trim();
    if stem.is_empty() {
        IMPORTED_PROJECT_TITLE.to_string()
    } else {
        stem.to_string()
    }
}

/// Wraps a diagram for export.
pub fn build_diagram_export(diagram: &NeckDiagram, exported_at: DateTime<Utc>) -> DiagramExport {
    DiagramExport {
        diagram: diagram.clone(),
        exported_at: timestamp(exported_at),
        version: EXPORT_VERSION,
    }
}

/// Exports the active tab of a project as a standalone page.
///
/// The page gets a fresh tab named after the active tab's display name.
/// Every diagram is moved into that tab and the first one is selected.
///
/// # Errors
///
/// Returns `ExportError::EmptyPage` if the active tab has no diagrams
pub fn build_page_export(
    project: &ProjectData,
    title: &str,
    exported_at: DateTime<Utc>,
) -> Result<PageExport, ExportError> {
    let diagrams = project.active_diagrams();
    if diagrams.is_empty() {
        return Err(ExportError::EmptyPage);
    }
    let tab_name = project
        .active_tab()
        .and_then(|id| project.tab_index(id))
        .map(|index| project.tabs[index].display_name(index))
        .unwrap_or_else(|| "Page".to_string());

    let tab = ProjectTab::new(tab_name);
    let stamp = timestamp(exported_at);
    let data = ProjectData {
        diagrams: diagrams
            .iter()
            .map(|d| NeckDiagram {
                tab_id: Some(tab.id.clone()),
                ..(*d).clone()
            })
            .collect(),
        active_tab_id: Some(tab.id.clone()),
        selected_diagram_id: diagrams.first().map(|d| d.id.clone()),
        tabs: vec![tab],
        key_id: project.key_id.clone(),
        scale_id: project.scale_id.clone(),
        position_id: project.position_id.clone(),
        search_query: project.search_query.clone(),
        created_at: project.created_at.clone(),
        updated_at: Some(stamp.clone()),
    };

    Ok(PageExport {
        title: title.trim().to_string(),
        data,
        metadata: ExportMetadata {
            exported_at: stamp,
            exported_on: format_export_date(exported_at),
        },
        version: EXPORT_VERSION,
    })
}

fn has_diagram_array(value: &Value) -> bool {
    value.get("diagrams").is_some_and(Value::is_array)
}

/// Extracts a project from a page envelope or a bare project document.
///
/// A document qualifies only if it (or its `data` field) has a `diagrams`
/// array. The project found is normalized.
pub fn parse_project_payload(value: &Value) -> ParsedPayload {
    let Some(record) = value.as_object() else {
        return ParsedPayload::default();
    };
    let title = record
        .get("title")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_string());

    let source = match record.get("data") {
        Some(data) if data.is_object() && has_diagram_array(data) => data,
        _ if has_diagram_array(value) => value,
        _ => return ParsedPayload::default(),
    };
    let data = serde_json::from_value::<ProjectData>(source.clone())
        .ok()
        .map(normalize_project_data);
    ParsedPayload { title, data }
}

/// Picks a tab name that does not collide, ignoring case, with `taken`.
fn unique_tab_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 2;
    while taken.contains(&name.to_lowercase()) {
        name = format!("{base} {suffix}");
        suffix += 1;
    }
    taken.insert(name.to_lowercase());
    name
}

/// Imports pages from JSON text into `current`.
///
/// An empty project is replaced by the imported one. Otherwise the
/// imported tabs are appended with fresh ids and de-duplicated names, the
/// imported diagrams follow their tabs with colliding ids regenerated, and
/// the first imported tab and diagram become active and selected.
///
/// # Errors
///
/// Returns `ImportError::InvalidJson` for unparseable text and
/// `ImportError::NoProject` when no `diagrams` array is present
pub fn import_pages(
    current: &ProjectData,
    text: &str,
    fallback_title: &str,
) -> Result<PageImport, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ImportError::InvalidJson)?;
    let parsed = parse_project_payload(&value);
    let title = parsed
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());
    let imported = parsed.data.ok_or(ImportError::NoProject)?;

    if current.diagrams.is_empty() {
        return Ok(PageImport {
            title,
            data: imported,
        });
    }

    // Normalization leaves at least one tab
    let source_tabs = &imported.tabs;

    let mut taken: HashSet<String> = current.tabs.iter().map(|t| t.name.to_lowercase()).collect();
    let mut tab_map: HashMap<TabId, TabId> = HashMap::new();
    let merged_tabs: Vec<ProjectTab> = source_tabs
        .iter()
        .enumerate()
        .map(|(index, tab)| {
            let trimmed = tab.name.trim();
            let base = if trimmed.is_empty() {
                format!("Imported {}", index + 1)
            } else {
                trimmed.to_string()
            };
            let merged = ProjectTab::new(unique_tab_name(&base, &mut taken));
            tab_map.insert(tab.id.clone(), merged.id.clone());
            merged
        })
        .collect();
    let first_tab = merged_tabs[0].id.clone();

    let mut existing_ids: HashSet<DiagramId> = current.diagrams.iter().map(|d| d.id.clone()).collect();
    let imported_diagrams: Vec<NeckDiagram> = imported
        .diagrams
        .iter()
        .map(|diagram| {
            let source = diagram
                .tab_id
                .as_ref()
                .or(imported.active_tab_id.as_ref())
                .unwrap_or(&source_tabs[0].id);
            let target = tab_map.get(source).unwrap_or(&first_tab);
            normalize_imported_diagram(diagram.clone(), target, &mut existing_ids)
        })
        .collect();

    tracing::info!(
        tabs = merged_tabs.len(),
        diagrams = imported_diagrams.len(),
        "Merged imported pages"
    );

    let mut data = current.clone();
    data.tabs.extend(merged_tabs);
    if let Some(first) = imported_diagrams.first() {
        data.selected_diagram_id = Some(first.id.clone());
    }
    data.diagrams.extend(imported_diagrams);
    data.active_tab_id = Some(first_tab);
    Ok(PageImport { title, data })
}

fn parse_diagram(value: &Value) -> Option<NeckDiagram> {
    serde_json::from_value(value.clone()).ok()
}

/// Collects the diagrams carried by an import document.
fn extract_diagrams(value: &Value) -> Vec<NeckDiagram> {
    let Some(record) = value.as_object() else {
        return Vec::new();
    };
    if let Some(diagram) = record.get("diagram").filter(|d| d.is_object()) {
        return parse_diagram(diagram).into_iter().collect();
    }
    if let Some(items) = record.get("diagrams").and_then(Value::as_array) {
        return items.iter().filter_map(parse_diagram).collect();
    }
    if record.get("data").is_some_and(Value::is_object) {
        return parse_project_payload(value)
            .data
            .map(|data| data.diagrams)
            .unwrap_or_default();
    }
    if record.get("config").is_some_and(|c| !c.is_null()) {
        return parse_diagram(value).into_iter().collect();
    }
    Vec::new()
}

/// Imports one or more diagrams from JSON text into the active tab.
///
/// The first imported diagram becomes the selection.
///
/// # Errors
///
/// Returns `ImportError::InvalidJson` for unparseable text and
/// `ImportError::NoDiagram` when no diagram could be found
pub fn import_diagrams(current: &ProjectData, text: &str) -> Result<ProjectData, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ImportError::InvalidJson)?;
    let diagrams = extract_diagrams(&value);
    if diagrams.is_empty() {
        return Err(ImportError::NoDiagram);
    }

    let mut data = current.clone();
    let active = match data.active_tab().cloned() {
        Some(id) => id,
        None => {
            let tab = ProjectTab::new("Tab 1");
            let id = tab.id.clone();
            data.tabs.push(tab);
            id
        }
    };
    let mut existing_ids: HashSet<DiagramId> = data.diagrams.iter().map(|d| d.id.clone()).collect();
    let normalized: Vec<NeckDiagram> = diagrams
        .into_iter()
        .map(|d| normalize_imported_diagram(d, &active, &mut existing_ids))
        .collect();

    if let Some(first) = normalized.first() {
        data.selected_diagram_id = Some(first.id.clone());
    }
    data.active_tab_id = Some(active);
    data.diagrams.extend(normalized);
    Ok(data)
}
