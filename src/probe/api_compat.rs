//! API-compatibility probe: walk the whole engine operation set and
//! report which pieces behave, mirroring the checklist a migration off a
//! different terminal library would run.

use serde::Serialize;

use crate::engine::TerminalEngine;

/// API-compatibility probe results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCompatibilityResults {
    /// Operations that behaved as specified.
    pub core_apis_present: Vec<String>,
    /// Operations that did not.
    pub missing_apis: Vec<String>,
    /// Detailed buffer read-back worked.
    pub buffer_access_works: bool,
    /// Select/read/clear selection worked.
    pub selection_apis_work: bool,
    /// Resize round-tripped through the reported dimensions.
    pub resize_works: bool,
}

/// Exercise every engine operation and tally the outcome.
pub fn probe_api_compatibility(engine: &mut dyn TerminalEngine) -> ApiCompatibilityResults {
    engine.reset();

    let mut present = Vec::new();
    let mut missing = Vec::new();
    let mut check = |name: &str, ok: bool| {
        if ok {
            present.push(name.to_string());
        } else {
            log::warn!("api check failed: {name}");
            missing.push(name.to_string());
        }
    };

    engine.write(b"api-probe");
    let buffer_access_works = engine.line_text(0).unwrap_or_default().starts_with("api-probe");
    check("write", buffer_access_works);
    check("line_text", buffer_access_works);
    check("buffer_line_count", engine.buffer_line_count() > 0);
    check("cursor_position", engine.cursor_position() == (0, 9));
    check("cell_fg", engine.cell_fg(0, 0).is_some());

    let (cols, rows) = (engine.cols(), engine.rows());
    engine.resize(cols + 2, rows + 1);
    let resize_works = engine.cols() == cols + 2 && engine.rows() == rows + 1;
    engine.resize(cols, rows);
    check("resize", resize_works);
    check("cols/rows", engine.cols() == cols && engine.rows() == rows);

    engine.select(0, 0, 3);
    let selection_apis_work = engine.has_selection()
        && engine.selection_text().as_deref() == Some("api");
    engine.clear_selection();
    check("select", selection_apis_work);
    check("clear_selection", !engine.has_selection());

    let before_bells = engine.bell_count();
    engine.write(b"\x07");
    check("bell_count", engine.bell_count() == before_bells + 1);

    engine.write(b"\r\n");
    for i in 0..(rows as usize * 2) {
        engine.write(format!("fill {i}\r\n").as_bytes());
    }
    engine.scroll_to_row(0);
    check("scroll_to_row", engine.viewport_top() == 0);
    engine.scroll_to_row(usize::MAX);

    engine.clear();
    check("clear", engine.line_text(0).unwrap_or_default().is_empty());

    let total = present.len() + missing.len();
    log::info!("api coverage: {}/{}", present.len(), total);

    ApiCompatibilityResults {
        core_apis_present: present,
        missing_apis: missing,
        buffer_access_works,
        selection_apis_work,
        resize_works,
    }
}
