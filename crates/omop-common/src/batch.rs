//! Size-bounded batching for remote lookups.
//!
//! Batch endpoints reject over-long requests, so collections of
//! identifiers or entries are split before dispatch. Two related
//! primitives:
//!
//! - [`paginate`] splits a flat sequence into pages whose JSON-serialized
//!   size stays under a character budget (GET-style batch filters);
//! - [`chunk`] additionally groups pages into fixed-size super-batches
//!   (POST-style bulk submission under both a per-call size budget and a
//!   calls-per-burst budget).
//!
//! Both are greedy single-pass packers. Guarantees: every input item lands
//! in exactly one page, page order preserves input order, and no page
//! exceeds the budget unless a single item alone does (such an item
//! becomes its own singleton page).

use serde::Serialize;

/// Default per-page character budget.
pub const DEFAULT_MAX_CHARS: usize = 10_000;

/// Default number of pages per chunk.
pub const DEFAULT_PAGES_PER_CHUNK: usize = 6;

/// Split `entries` into pages whose serialized size stays under
/// `max_chars`.
///
/// The size measure is the length of the page as a JSON array, matching
/// what a batch filter endpoint would receive.
pub fn paginate<T: Serialize>(
    entries: Vec<T>,
    max_chars: usize,
) -> Result<Vec<Vec<T>>, serde_json::Error> {
    let mut pages: Vec<Vec<T>> = Vec::new();
    let mut page: Vec<T> = Vec::new();
    // Serialized length of `page` as a JSON array, starting from "[]".
    let mut page_chars = 2usize;

    for entry in entries {
        let entry_chars = serde_json::to_string(&entry)?.len();
        let separator = if page.is_empty() { 0 } else { 1 };
        let projected = page_chars + separator + entry_chars;
        if page.is_empty() || projected <= max_chars {
            page.push(entry);
            page_chars = projected;
        } else {
            pages.push(std::mem::take(&mut page));
            page.push(entry);
            page_chars = 2 + entry_chars;
        }
    }
    if !page.is_empty() {
        pages.push(page);
    }
    Ok(pages)
}

/// Split `entries` into chunks of at most `pages_per_chunk` pages, each
/// page bounded by `max_chars` as in [`paginate`].
pub fn chunk<T: Serialize>(
    entries: Vec<T>,
    max_chars: usize,
    pages_per_chunk: usize,
) -> Result<Vec<Vec<Vec<T>>>, serde_json::Error> {
    let pages_per_chunk = pages_per_chunk.max(1);
    let mut chunks: Vec<Vec<Vec<T>>> = Vec::new();
    let mut current: Vec<Vec<T>> = Vec::new();
    for page in paginate(entries, max_chars)? {
        current.push(page);
        if current.len() == pages_per_chunk {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(pages: Vec<Vec<String>>) -> Vec<String> {
        pages.into_iter().flatten().collect()
    }

    fn page_chars(page: &[String]) -> usize {
        serde_json::to_string(page).unwrap().len()
    }

    #[test]
    fn empty_input_yields_no_pages() {
        let pages = paginate(Vec::<String>::new(), 100).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn small_input_fits_one_page() {
        let entries: Vec<String> = (0..5).map(|n| n.to_string()).collect();
        let pages = paginate(entries.clone(), 1_000).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(flatten(pages), entries);
    }

    #[test]
    fn pages_stay_under_budget() {
        let entries: Vec<String> = (0..50).map(|n| format!("code-{n:04}")).collect();
        let pages = paginate(entries.clone(), 60).unwrap();
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page_chars(page) <= 60, "page over budget: {page:?}");
        }
        assert_eq!(flatten(pages), entries);
    }

    #[test]
    fn oversized_item_becomes_singleton_page() {
        let entries = vec![
            "a".to_string(),
            "x".repeat(200),
            "b".to_string(),
        ];
        let pages = paginate(entries, 30).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].len(), 1);
        assert_eq!(pages[1][0].len(), 200);
    }

    #[test]
    fn chunks_cap_pages_per_chunk() {
        let entries: Vec<String> = (0..40).map(|n| format!("entry-{n:03}")).collect();
        let chunks = chunk(entries.clone(), 40, 3).unwrap();
        assert!(chunks.len() > 1);
        for group in &chunks {
            assert!(group.len() <= 3);
        }
        let rebuilt: Vec<String> = chunks.into_iter().flatten().flatten().collect();
        assert_eq!(rebuilt, entries);
    }

    #[test]
    fn numeric_ids_paginate_too() {
        let ids: Vec<i64> = (1..=100).collect();
        let pages = paginate(ids.clone(), 50).unwrap();
        let rebuilt: Vec<i64> = pages.into_iter().flatten().collect();
        assert_eq!(rebuilt, ids);
    }
}
