//! Serializable heap dump for external tooling.

use serde::Serialize;

use crate::gc::GcStats;

/// One cell in a [`HeapSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct CellSnapshot {
    /// Handle index; edges refer to cells by this id.
    pub id: u32,
    pub generation: u32,
    pub kind: String,
    /// `"young"` or `"old"`.
    pub space: String,
    pub size: usize,
    pub edges: Vec<u32>,
}

/// Every cell in the heap plus collector statistics.
#[derive(Debug, Clone, Serialize)]
pub struct HeapSnapshot {
    pub cells: Vec<CellSnapshot>,
    pub stats: GcStats,
}

impl HeapSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Total bytes per kind label, largest first.
    pub fn bytes_by_kind(&self) -> Vec<(String, usize)> {
        let mut totals: Vec<(String, usize)> = Vec::new();
        for cell in &self.cells {
            match totals.iter_mut().find(|(k, _)| *k == cell.kind) {
                Some((_, total)) => *total += cell.size,
                None => totals.push((cell.kind.clone(), cell.size)),
            }
        }
        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        totals
    }
}
