//! Artist grouping and display ordering.
//!
//! Everything here is a pure function of a resolved item list and is simply
//! re-run whenever that list changes.

use jukebox_catalog::models::ResolvedItem;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// One artist as shown in the artist view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    /// May be empty: items without an artist form their own group.
    pub name: String,
    pub album_count: usize,
    pub cover: Option<String>,
    /// The item the cover was taken from.
    pub cover_media: ResolvedItem,
}

/// Group items by artist.
///
/// Each artist's representative is its first item by title in plain string
/// order; the artists themselves are returned in [natural order](natural_cmp).
pub fn group_by_artist(items: &[ResolvedItem]) -> Vec<Artist> {
    let mut groups: HashMap<&str, Vec<&ResolvedItem>> = HashMap::new();
    for item in items {
        groups.entry(item.artist.as_str()).or_default().push(item);
    }
    let mut artists: Vec<Artist> = groups
        .into_iter()
        .filter_map(|(name, members)| {
            let representative = members.iter().min_by(|a, b| a.title.cmp(&b.title))?;
            Some(Artist {
                name: name.to_string(),
                album_count: members.len(),
                cover: representative.cover.clone(),
                cover_media: (*representative).clone(),
            })
        })
        .collect();
    artists.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    artists
}

/// Flat media view order: by title, then artist, both natural.
pub fn sort_media(mut items: Vec<ResolvedItem>) -> Vec<ResolvedItem> {
    items.sort_by(|a, b| natural_cmp(&a.title, &b.title).then_with(|| natural_cmp(&a.artist, &b.artist)));
    items
}

/// The flat media view restricted to one artist.
pub fn media_for_artist(items: &[ResolvedItem], artist: &str) -> Vec<ResolvedItem> {
    sort_media(items.iter().filter(|item| item.artist == artist).cloned().collect())
}

/// Human ordering for display strings.
///
/// Case-insensitive, with runs of digits compared by numeric value so that
/// "Folge 2" sorts before "Folge 10". Strings that only differ in case or in
/// leading zeros fall back to plain string order to keep the result total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        let ordering = match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                compare_numbers(&take_digits(&mut left), &take_digits(&mut right))
            },
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                l.to_lowercase().cmp(r.to_lowercase())
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
