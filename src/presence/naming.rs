//! Display names for newly created cells.

use crate::compute::grid::CellId;
use crate::storage::Landmark;

/// Name given to a cell when it is first created.
///
/// The most prominent landmark (the first one added) wins; otherwise the
/// name reflects how large the cell is.
pub fn display_name(resolution: u8, landmarks: &[Landmark]) -> String {
    if let Some(landmark) = landmarks.first() {
        return format!("{} Area", landmark.name);
    }

    match resolution {
        0..=7 => "District Chat".to_string(),
        8 => "Neighborhood Chat".to_string(),
        _ => "Local Chat".to_string(),
    }
}

/// Fallback label for a cell without a stored name.
pub fn fallback_name(cell: CellId) -> String {
    let id = cell.to_string();
    format!("Hex {}", &id[..id.len().min(8)])
}
