//! Plain-text rendering of diagrams.
//!
//! Each string is one row, highest string index on top, with the open-string
//! cell left of the nut. Cells are four columns wide:
//!
//! - `-E--` in-scale note
//! - `<E >` root
//! - `(E )` out-of-scale note
//! - `----` empty

use crate::neck::{
    build_scale_set, note_name_to_index, Library, NeckDiagram, NoteHighlight, ProjectData,
    ScaleSet,
};
use std::collections::HashMap;

const CELL_WIDTH: usize = 4;

/// Root and scale used to label a diagram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewContext {
    pub root: Option<u8>,
    pub scale: Option<ScaleSet>,
}

impl ViewContext {
    /// Resolves the diagram's own key and scale against the library.
    ///
    /// A scale only applies when the key resolves to a pitch class and the
    /// scale has intervals.
    pub fn for_diagram(library: &Library, diagram: &NeckDiagram) -> Self {
        let root = library
            .name_of(diagram.key_id.as_deref())
            .and_then(note_name_to_index);
        let intervals = diagram
            .scale_id
            .as_deref()
            .and_then(|id| library.get(id))
            .and_then(|item| item.intervals.as_deref())
            .filter(|intervals| !intervals.is_empty());
        let scale = match (root, intervals) {
            (Some(root), Some(intervals)) => Some(build_scale_set(root, intervals)),
            _ => None,
        };
        Self { root, scale }
    }
}

fn cell_text(label: &str, highlight: NoteHighlight) -> String {
    let label = if label.is_empty() { "o" } else { label };
    match highlight {
        NoteHighlight::Root => format!("<{label:<2}>"),
        NoteHighlight::OutOfScale => format!("({label:<2})"),
        NoteHighlight::InScale => format!("-{label:-<2}-"),
    }
}

/// Renders one diagram as lines of text.
pub fn render_diagram(diagram: &NeckDiagram, context: &ViewContext) -> Vec<String> {
    let config = &diagram.config;
    let tuning = config.display_tuning();
    let name_width = tuning.iter().map(|n| n.len()).max().unwrap_or(1);
    let empty = "-".repeat(CELL_WIDTH);

    let cells: HashMap<(usize, i32), String> = diagram
        .note_views(context.root, context.scale.as_ref())
        .into_iter()
        .map(|view| {
            (
                (view.string_index, view.fret),
                cell_text(&view.label, view.highlight),
            )
        })
        .collect();

    let mut lines = Vec::with_capacity(config.strings + 2);
    let gutter = " ".repeat(name_width + 1 + CELL_WIDTH);

    if config.show_fret_numbers {
        let numbers: String = (1..=config.frets)
            .map(|fret| {
                let number = config.fret_number_style.format(fret);
                format!(" {number:^width$}", width = CELL_WIDTH)
            })
            .collect();
        lines.push(format!("{gutter}{numbers}").trim_end().to_string());
    }

    for string_index in (0..config.strings).rev() {
        let name = tuning.get(string_index).map(String::as_str).unwrap_or("?");
        let mut row = format!("{name:>name_width$} ");
        row.push_str(cells.get(&(string_index, -1)).unwrap_or(&empty));
        for fret in 0..config.frets as i32 {
            row.push('|');
            row.push_str(cells.get(&(string_index, fret)).unwrap_or(&empty));
        }
        row.push('|');
        lines.push(row);
    }

    if config.show_inlays {
        let marks: String = (1..=config.frets)
            .map(|fret| {
                let mark = if config.is_double_inlay_fret(fret) {
                    "**"
                } else if config.is_inlay_fret(fret) {
                    "*"
                } else {
                    ""
                };
                format!(" {mark:^width$}", width = CELL_WIDTH)
            })
            .collect();
        let marks = format!("{gutter}{marks}");
        if !marks.trim().is_empty() {
            lines.push(marks.trim_end().to_string());
        }
    }

    lines
}

/// Renders the active tab: a tab bar followed by every diagram.
pub fn render_active_tab(project: &ProjectData, library: &Library) -> String {
    let active = project.active_tab();
    let bar: Vec<String> = project
        .tabs
        .iter()
        .zip(project.tab_display_names())
        .map(|(tab, name)| {
            if Some(&tab.id) == active {
                format!("[{name}]")
            } else {
                name
            }
        })
        .collect();

    let mut out = bar.join(" | ");
    out.push('\n');

    let diagrams = project.active_diagrams();
    if diagrams.is_empty() {
        out.push_str("\n(no diagrams)\n");
        return out;
    }

    for diagram in diagrams {
        let selected = project.selected_diagram_id.as_ref() == Some(&diagram.id);
        out.push('\n');
        out.push_str(&format!(
            "{}{} ({}) {:?} at {:.0},{:.0} {:.0}x{:.0}\n",
            if selected { "> " } else { "" },
            diagram.name,
            diagram.id,
            diagram.layout(),
            diagram.x,
            diagram.y,
            diagram.width,
            diagram.height,
        ));
        let context = ViewContext::for_diagram(library, diagram);
        for line in render_diagram(diagram, &context) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}
