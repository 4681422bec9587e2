//! Merges stored notifications and the broadcast log into one filtered list.

use serde::Serialize;

use crate::models::notification::{CenterEntry, CenterFilter, CENTER_PER_PAGE};

#[derive(Debug, Clone, Serialize)]
pub struct CenterPage {
    pub items: Vec<CenterEntry>,
    pub total: usize,
    pub unread: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub filter: CenterFilter,
}

/// Stored notifications already filtered by the database.
///
/// `entries` holds only the newest matches, while `total` and `unread`
/// count every match.
#[derive(Debug, Clone, Default)]
pub struct StoredMatches {
    pub entries: Vec<CenterEntry>,
    pub total: usize,
    pub unread: usize,
}

impl From<Vec<CenterEntry>> for StoredMatches {
    fn from(entries: Vec<CenterEntry>) -> Self {
        Self {
            total: entries.len(),
            unread: entries.iter().filter(|e| !e.is_read).count(),
            entries,
        }
    }
}

/// Requested page clamped into `1..=total_pages`, with `total_pages`.
fn clamp_page(requested: u32, total: usize) -> (u32, u32) {
    let total_pages = shared::pagination::total_pages(total as i64, CENTER_PER_PAGE).max(1);
    (requested.clamp(1, total_pages), total_pages)
}

/// Number of newest stored matches the requested page can reach once the
/// broadcast log is merged in.
pub fn stored_rows_needed(filter: &CenterFilter, stored_total: usize, queue: &[CenterEntry]) -> usize {
    let queue_total = queue.iter().filter(|e| filter.matches(e)).count();
    let (page, _) = clamp_page(filter.page, stored_total + queue_total);
    (page * CENTER_PER_PAGE) as usize
}

/// Filters the broadcast log, merges it with the stored matches newest first
/// and cuts out the requested page.
///
/// A page past the end is clamped to the last page.
pub fn build_page(stored: StoredMatches, queue: Vec<CenterEntry>, filter: CenterFilter) -> CenterPage {
    let queue: Vec<CenterEntry> = queue.into_iter().filter(|e| filter.matches(e)).collect();
    let total = stored.total + queue.len();
    let unread = stored.unread + queue.iter().filter(|e| !e.is_read).count();

    let mut entries = stored.entries;
    entries.extend(queue);
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let per_page = CENTER_PER_PAGE;
    let (page, total_pages) = clamp_page(filter.page, total);

    let items = entries
        .into_iter()
        .skip(((page - 1) * per_page) as usize)
        .take(per_page as usize)
        .collect();

    CenterPage {
        items,
        total,
        unread,
        page,
        per_page,
        total_pages,
        filter,
    }
}
