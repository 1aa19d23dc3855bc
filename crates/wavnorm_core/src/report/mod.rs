//! Read-only peak check and silent take sorting.

mod peak_check;
mod silent_sort;

pub use peak_check::{format_db, PeakChecker, PeakEntry, PeakReport};
pub use silent_sort::{is_silent, SilentEntry, SilentReport, SilentSorter};
