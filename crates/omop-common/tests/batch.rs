use omop_common::{chunk, paginate};
use proptest::prelude::*;

fn serialized_len(page: &[String]) -> usize {
    serde_json::to_string(page).unwrap().len()
}

proptest! {
    /// Every input item appears in exactly one page, in input order.
    #[test]
    fn pagination_covers_input(
        entries in proptest::collection::vec("[a-z0-9]{0,40}", 0..120),
        budget in 4usize..200,
    ) {
        let pages = paginate(entries.clone(), budget).unwrap();
        let rebuilt: Vec<String> = pages.into_iter().flatten().collect();
        prop_assert_eq!(rebuilt, entries);
    }

    /// No page exceeds the budget unless it is a singleton whose lone
    /// item alone exceeds it.
    #[test]
    fn pages_respect_budget_or_are_singletons(
        entries in proptest::collection::vec("[a-z0-9]{0,40}", 0..120),
        budget in 4usize..200,
    ) {
        let pages = paginate(entries, budget).unwrap();
        for page in &pages {
            prop_assert!(!page.is_empty());
            if serialized_len(page) > budget {
                prop_assert_eq!(page.len(), 1);
            }
        }
    }

    /// Chunking preserves coverage and never exceeds the pages-per-chunk
    /// cap.
    #[test]
    fn chunking_covers_input_and_caps_chunks(
        entries in proptest::collection::vec("[a-z0-9]{0,40}", 0..120),
        budget in 4usize..200,
        pages_per_chunk in 1usize..8,
    ) {
        let chunks = chunk(entries.clone(), budget, pages_per_chunk).unwrap();
        for group in &chunks {
            prop_assert!(!group.is_empty());
            prop_assert!(group.len() <= pages_per_chunk);
        }
        let rebuilt: Vec<String> = chunks.into_iter().flatten().flatten().collect();
        prop_assert_eq!(rebuilt, entries);
    }
}
