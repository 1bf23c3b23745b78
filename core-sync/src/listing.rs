//! Listing order: folders before files, each group ordered by name.
//!
//! Names are compared with the Unicode root collation at tertiary strength:
//! punctuation and symbols before digits, digits before letters, accents
//! secondary to the base letter, lowercase before uppercase on a case tie.

use bridge_traits::FileObject;
use icu_collator::{Collator, CollatorOptions, Strength};
use std::cmp::Ordering;
use tracing::warn;

fn root_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    match Collator::try_new(&Default::default(), options) {
        Ok(collator) => Some(collator),
        Err(err) => {
            warn!(error = %err, "Root collation unavailable, falling back to case-folded order");
            None
        }
    }
}

/// Sort a listing in place.
///
/// The sort is stable, so entries with identical names keep the order the
/// server sent them in.
pub fn sort_listing(entries: &mut [FileObject]) {
    let collator = root_collator();
    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| collate(collator.as_ref(), a.name(), b.name()))
    });
}

/// Locale-aware name order (root collation).
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collate(root_collator().as_ref(), a, b)
}

fn collate(collator: Option<&Collator>, a: &str, b: &str) -> Ordering {
    match collator {
        Some(collator) => collator.compare(a, b),
        None => case_folded(a, b),
    }
}

fn case_folded(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| {
        a.chars()
            .zip(b.chars())
            .find(|(x, y)| x != y)
            .map(|(x, y)| y.is_lowercase().cmp(&x.is_lowercase()))
            .unwrap_or(Ordering::Equal)
    })
}
