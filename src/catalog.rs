//! Reference catalog for the Protestant 66-book canon.
//!
//! Provides book lookup (exact, alias, prefix, and fuzzy/phonetic),
//! chapter/verse bounds validation, and the two cheap pre-filters that
//! gate the detection stages.

use natural::phonetics::soundex;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use strsim::levenshtein;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Testament {
    Old,
    New,
}

/// Static metadata for one canon book.
#[derive(Debug, Clone, Copy)]
pub struct Book {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub chapters: u16,
    pub testament: Testament,
}

/// The original data carries no per-chapter verse counts; verse numbers
/// are sanity-capped instead (longest chapter in the canon is Psalm 119
/// with 176 verses).
pub const MAX_VERSE: u16 = 200;

macro_rules! book {
    ($name:literal, [$($alias:literal),*], $chapters:literal, $testament:ident) => {
        Book {
            name: $name,
            aliases: &[$($alias),*],
            chapters: $chapters,
            testament: Testament::$testament,
        }
    };
}

pub const BOOKS: &[Book] = &[
    // Old Testament
    book!("Genesis", ["gen", "ge", "gn"], 50, Old),
    book!("Exodus", ["exod", "exo", "ex"], 40, Old),
    book!("Leviticus", ["lev", "le", "lv"], 27, Old),
    book!("Numbers", ["num", "nu", "nm", "nb"], 36, Old),
    book!("Deuteronomy", ["deut", "de", "dt"], 34, Old),
    book!("Joshua", ["josh", "jos", "jsh"], 24, Old),
    book!("Judges", ["judg", "jdg", "jg", "jdgs"], 21, Old),
    book!("Ruth", ["rth", "ru"], 4, Old),
    book!(
        "1 Samuel",
        ["1 sam", "1sam", "1st samuel", "first samuel", "i samuel", "1 sa", "1sa"],
        31,
        Old
    ),
    book!(
        "2 Samuel",
        ["2 sam", "2sam", "2nd samuel", "second samuel", "ii samuel", "2 sa", "2sa"],
        24,
        Old
    ),
    book!(
        "1 Kings",
        ["1 kgs", "1kgs", "1st kings", "first kings", "i kings", "1 ki", "1ki"],
        22,
        Old
    ),
    book!(
        "2 Kings",
        ["2 kgs", "2kgs", "2nd kings", "second kings", "ii kings", "2 ki", "2ki"],
        25,
        Old
    ),
    book!(
        "1 Chronicles",
        ["1 chr", "1chr", "1st chronicles", "first chronicles", "i chronicles", "1 ch", "1ch"],
        29,
        Old
    ),
    book!(
        "2 Chronicles",
        ["2 chr", "2chr", "2nd chronicles", "second chronicles", "ii chronicles", "2 ch", "2ch"],
        36,
        Old
    ),
    book!("Ezra", ["ezr", "ez"], 10, Old),
    book!("Nehemiah", ["neh", "ne"], 13, Old),
    book!("Esther", ["esth", "est", "es"], 10, Old),
    book!("Job", ["jb"], 42, Old),
    book!("Psalms", ["psalm", "psa", "ps", "pss", "psm"], 150, Old),
    book!("Proverbs", ["prov", "pro", "prv", "pr"], 31, Old),
    book!("Ecclesiastes", ["eccl", "ecc", "ec", "qoh"], 12, Old),
    book!(
        "Song of Solomon",
        ["song", "song of songs", "sos", "so", "canticles", "canticle"],
        8,
        Old
    ),
    book!("Isaiah", ["isa", "is"], 66, Old),
    book!("Jeremiah", ["jer", "je", "jr"], 52, Old),
    book!("Lamentations", ["lam", "la"], 5, Old),
    book!("Ezekiel", ["ezek", "eze", "ezk"], 48, Old),
    book!("Daniel", ["dan", "da", "dn"], 12, Old),
    book!("Hosea", ["hos", "ho"], 14, Old),
    book!("Joel", ["joe", "jl"], 3, Old),
    book!("Amos", ["amo", "am"], 9, Old),
    book!("Obadiah", ["obad", "ob"], 1, Old),
    book!("Jonah", ["jon", "jnh"], 4, Old),
    book!("Micah", ["mic", "mc"], 7, Old),
    book!("Nahum", ["nah", "na"], 3, Old),
    book!("Habakkuk", ["hab", "hb"], 3, Old),
    book!("Zephaniah", ["zeph", "zep", "zp"], 3, Old),
    book!("Haggai", ["hag", "hg"], 2, Old),
    book!("Zechariah", ["zech", "zec", "zc"], 14, Old),
    book!("Malachi", ["mal", "ml"], 4, Old),
    // New Testament
    book!("Matthew", ["matt", "mat", "mt"], 28, New),
    book!("Mark", ["mrk", "mk", "mr"], 16, New),
    book!("Luke", ["luk", "lk"], 24, New),
    book!("John", ["joh", "jhn", "jn"], 21, New),
    book!("Acts", ["act", "ac"], 28, New),
    book!("Romans", ["rom", "ro", "rm"], 16, New),
    book!(
        "1 Corinthians",
        ["1 cor", "1cor", "1st corinthians", "first corinthians", "i corinthians", "1 co", "1co"],
        16,
        New
    ),
    book!(
        "2 Corinthians",
        ["2 cor", "2cor", "2nd corinthians", "second corinthians", "ii corinthians", "2 co", "2co"],
        13,
        New
    ),
    book!("Galatians", ["gal", "ga"], 6, New),
    book!("Ephesians", ["eph", "ephes"], 6, New),
    book!("Philippians", ["phil", "php", "pp"], 4, New),
    book!("Colossians", ["col", "co"], 4, New),
    book!(
        "1 Thessalonians",
        ["1 thess", "1thess", "1st thessalonians", "first thessalonians", "i thessalonians", "1 th", "1th"],
        5,
        New
    ),
    book!(
        "2 Thessalonians",
        ["2 thess", "2thess", "2nd thessalonians", "second thessalonians", "ii thessalonians", "2 th", "2th"],
        3,
        New
    ),
    book!(
        "1 Timothy",
        ["1 tim", "1tim", "1st timothy", "first timothy", "i timothy", "1 ti", "1ti"],
        6,
        New
    ),
    book!(
        "2 Timothy",
        ["2 tim", "2tim", "2nd timothy", "second timothy", "ii timothy", "2 ti", "2ti"],
        4,
        New
    ),
    book!("Titus", ["tit", "ti"], 3, New),
    book!("Philemon", ["philem", "phm", "pm"], 1, New),
    book!("Hebrews", ["heb", "he"], 13, New),
    book!("James", ["jam", "jas", "jm"], 5, New),
    book!(
        "1 Peter",
        ["1 pet", "1pet", "1st peter", "first peter", "i peter", "1 pe", "1pe"],
        5,
        New
    ),
    book!(
        "2 Peter",
        ["2 pet", "2pet", "2nd peter", "second peter", "ii peter", "2 pe", "2pe"],
        3,
        New
    ),
    book!(
        "1 John",
        ["1 jn", "1jn", "1st john", "first john", "i john", "1 jo", "1jo"],
        5,
        New
    ),
    book!(
        "2 John",
        ["2 jn", "2jn", "2nd john", "second john", "ii john", "2 jo", "2jo"],
        1,
        New
    ),
    book!(
        "3 John",
        ["3 jn", "3jn", "3rd john", "third john", "iii john", "3 jo", "3jo"],
        1,
        New
    ),
    book!("Jude", ["jud", "jd"], 1, New),
    book!("Revelation", ["rev", "re", "revelations", "apocalypse"], 22, New),
];

/// Lowercased name and alias lookup maps, built once.
static BOOK_INDEX: Lazy<HashMap<String, &'static Book>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for book in BOOKS {
        index.insert(book.name.to_lowercase(), book);
        for alias in book.aliases {
            index.insert(alias.to_string(), book);
        }
    }
    index
});

/// Keywords whose presence makes the fallback classifier stage worth
/// invoking. Deliberately over-inclusive: this is a strict superset
/// filter, so false positives are fine but a miss would silence the
/// fallback stage entirely.
pub const TRIGGER_KEYWORDS: &[&str] = &[
    "paul",
    "jesus",
    "moses",
    "david",
    "abraham",
    "peter",
    "john",
    "prophet",
    "apostle",
    "disciples",
    "gospel",
    "psalm",
    "proverb",
    "parable",
    "sermon on the mount",
    "beatitudes",
    "lord's prayer",
    "old testament",
    "new testament",
    "wrote",
    "said",
    "taught",
    "preached",
    "spoke",
    "remember when",
    "remember that",
    "that passage",
    "that verse",
    "as it is written",
    "scripture tells us",
    "the word says",
    "letter to",
    "wrote to",
    "epistle",
    "corinth",
    "rome",
    "ephesus",
    "galatia",
    "philippi",
    "colossae",
    "thessalonica",
    "love is patient",
    "faith hope love",
    "armor of god",
    "fruit of the spirit",
    "the lord is my shepherd",
    "in the beginning",
    "for god so loved",
];

static QUICK_CITE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)chapter\s+\d").unwrap(),
        Regex::new(r"(?i)verse\s+\d").unwrap(),
        Regex::new(r"\d+:\d+").unwrap(),
    ]
});

/// Finds a book by canonical name, alias, prefix, or fuzzy match.
/// Matching is case-insensitive and tolerant of speech-to-text mangling.
pub fn find_book(input: &str) -> Option<&'static Book> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(book) = BOOK_INDEX.get(&normalized) {
        return Some(book);
    }

    // Prefix match for truncated names ("corinth" never reaches here,
    // but "galat" should resolve).
    if normalized.len() >= 3 {
        for book in BOOKS {
            if book.name.to_lowercase().starts_with(&normalized) {
                return Some(book);
            }
        }
    }

    fuzzy_find(&normalized)
}

/// Last-resort fuzzy lookup combining edit distance with Soundex, the
/// same pairing used for custom-word correction of transcripts.
fn fuzzy_find(normalized: &str) -> Option<&'static Book> {
    if normalized.len() < 4 {
        return None;
    }

    let mut best: Option<(&'static Book, usize)> = None;
    for book in BOOKS {
        let candidate = book.name.to_lowercase();
        let distance = levenshtein(normalized, &candidate);
        if distance == 0 || distance > 2 {
            continue;
        }
        if !soundex(normalized, &candidate) {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((book, distance));
        }
    }
    best.map(|(book, _)| book)
}

/// Checks chapter (and verse, when given) against catalog bounds.
pub fn validate_reference(book: &Book, chapter: u16, verse: Option<u16>) -> bool {
    if chapter < 1 || chapter > book.chapters {
        return false;
    }
    if let Some(v) = verse {
        if v < 1 || v > MAX_VERSE {
            return false;
        }
    }
    true
}

/// Fast pre-filter gating the fallback classifier stage.
pub fn contains_trigger_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Fast pre-filter gating the deterministic parser: book-name tokens or
/// citation-shaped cues ("chapter 3", "verse 16", "3:16").
pub fn might_contain_scripture(text: &str) -> bool {
    let lower = text.to_lowercase();

    for book in BOOKS {
        if lower.contains(&book.name.to_lowercase()) {
            return true;
        }
        for alias in book.aliases {
            // Short aliases ("is", "so") would fire on ordinary prose.
            if alias.len() >= 3 && lower.contains(alias) {
                return true;
            }
        }
    }

    QUICK_CITE_PATTERNS.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canon_is_complete() {
        assert_eq!(BOOKS.len(), 66);
        assert_eq!(
            BOOKS.iter().filter(|b| b.testament == Testament::Old).count(),
            39
        );
    }

    #[test]
    fn test_find_book_by_name_and_alias() {
        assert_eq!(find_book("John").unwrap().name, "John");
        assert_eq!(find_book("psalm").unwrap().name, "Psalms");
        assert_eq!(find_book("1 Cor").unwrap().name, "1 Corinthians");
        assert_eq!(find_book("first corinthians").unwrap().name, "1 Corinthians");
        assert_eq!(find_book("REV").unwrap().name, "Revelation");
        assert!(find_book("narnia").is_none());
        assert!(find_book("").is_none());
    }

    #[test]
    fn test_find_book_by_prefix() {
        assert_eq!(find_book("galat").unwrap().name, "Galatians");
        assert_eq!(find_book("deuter").unwrap().name, "Deuteronomy");
    }

    #[test]
    fn test_find_book_fuzzy() {
        // Common transcription slips: one or two edits plus a matching
        // phonetic code still resolve.
        assert_eq!(find_book("galations").unwrap().name, "Galatians");
        assert_eq!(find_book("habbakuk").unwrap().name, "Habakkuk");
    }

    #[test]
    fn test_validate_reference_bounds() {
        let john = find_book("john").unwrap();
        assert!(validate_reference(john, 1, None));
        assert!(validate_reference(john, 21, Some(25)));
        assert!(!validate_reference(john, 0, None));
        assert!(!validate_reference(john, 22, None));
        assert!(!validate_reference(john, 3, Some(0)));
        assert!(!validate_reference(john, 3, Some(201)));

        let psalms = find_book("psalms").unwrap();
        assert!(validate_reference(psalms, 150, None));
        assert!(!validate_reference(psalms, 151, None));
    }

    #[test]
    fn test_trigger_keyword_filter() {
        assert!(contains_trigger_keywords("as Paul wrote to the church"));
        assert!(contains_trigger_keywords("For God so loved the world"));
        assert!(!contains_trigger_keywords(
            "we will now take up the morning offering"
        ));
    }

    #[test]
    fn test_might_contain_scripture() {
        assert!(might_contain_scripture("turn to John 3:16"));
        assert!(might_contain_scripture("in chapter 8 we read"));
        assert!(might_contain_scripture("verse 28 says"));
        assert!(!might_contain_scripture("good morning everyone"));
    }
}
