//! Deterministic citation parser.
//!
//! Runs after [`crate::normalizer::normalize`] and extracts explicit
//! citations ("john 3:16-18", "1 corinthians 13") with regexes built
//! from the catalog's book names and aliases. Chapter-only mentions are
//! kept but never allowed to shadow a full chapter:verse citation at
//! the same spot.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog;
use crate::normalizer;
use crate::types::ScriptureReference;

/// One parser hit, with the span it came from for cooldown keys and UI
/// highlighting.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReference {
    pub reference: ScriptureReference,
    pub matched_text: String,
    pub position: usize,
}

/// Alternation over every book name and alias of three or more
/// characters, longest first so "1 corinthians" wins over "corinthians".
static BOOK_ALTERNATION: Lazy<String> = Lazy::new(|| {
    let mut names: Vec<String> = Vec::new();
    for book in catalog::BOOKS {
        names.push(book.name.to_lowercase());
        for alias in book.aliases {
            if alias.len() >= 3 {
                names.push(alias.to_string());
            }
        }
    }
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|")
});

static FULL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b({})\s*(\d{{1,3}}):(\d{{1,3}})(?:\s*-\s*(\d{{1,3}}))?",
        &*BOOK_ALTERNATION
    ))
    .unwrap()
});

static CHAPTER_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b({})\s+(\d{{1,3}})\b", &*BOOK_ALTERNATION)).unwrap()
});

/// Extracts every explicit citation in the transcript, normalized,
/// bounds-checked, deduplicated, and ordered by position.
pub fn parse(raw: &str) -> Vec<ParsedReference> {
    let text = normalizer::normalize(raw);
    let mut results: Vec<ParsedReference> = Vec::new();
    let mut claimed: Vec<(usize, usize)> = Vec::new();

    for caps in FULL_REF.captures_iter(&text) {
        let whole = caps.get(0).map(|m| (m.start(), m.end(), m.as_str()));
        let Some((start, end, matched)) = whole else {
            continue;
        };
        let verse_start = caps[3].parse::<u16>().ok();
        let verse_end = caps.get(4).and_then(|m| m.as_str().parse::<u16>().ok());
        if let Some(reference) =
            try_build(&caps[1], &caps[2], verse_start, verse_end)
        {
            claimed.push((start, end));
            results.push(ParsedReference {
                reference,
                matched_text: matched.to_string(),
                position: start,
            });
        }
    }

    for caps in CHAPTER_REF.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        let (start, end) = (whole.start(), whole.end());
        // A chapter-only match inside or touching a full citation is
        // the same citation seen twice.
        if claimed.iter().any(|&(s, e)| start < e && s < end) {
            continue;
        }
        // "john 3:16" also matches "john 3"; the colon check keeps the
        // shorter reading from firing when a verse follows.
        if text[end..].starts_with(':') {
            continue;
        }
        if let Some(reference) = try_build(&caps[1], &caps[2], None, None) {
            results.push(ParsedReference {
                reference,
                matched_text: whole.as_str().to_string(),
                position: start,
            });
        }
    }

    results.sort_by_key(|r| r.position);
    let mut seen = std::collections::HashSet::new();
    results.retain(|r| seen.insert(r.reference.reference.clone()));
    results
}

fn try_build(
    book_text: &str,
    chapter_text: &str,
    verse_start: Option<u16>,
    verse_end: Option<u16>,
) -> Option<ScriptureReference> {
    let book = catalog::find_book(book_text)?;
    let chapter = chapter_text.parse::<u16>().ok()?;
    if !catalog::validate_reference(book, chapter, verse_start) {
        return None;
    }
    if let Some(ve) = verse_end {
        if ve > catalog::MAX_VERSE {
            return None;
        }
        if let Some(vs) = verse_start {
            if ve < vs {
                return None;
            }
        }
    }
    Some(ScriptureReference::new(
        book.name, chapter, verse_start, verse_end,
    ))
}
