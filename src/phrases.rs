//! Well-known verse openings quoted verbatim from memory.
//!
//! When a preacher quotes "for God so loved the world" without naming
//! the citation, the parser has nothing to match. This table maps the
//! most commonly quoted phrases straight to their references.

use crate::types::ScriptureReference;

/// Table entry pairing a memorized phrase with its source.
#[derive(Debug, Clone, Copy)]
pub struct QuotedPhrase {
    pub phrase: &'static str,
    pub book: &'static str,
    pub chapter: u16,
    pub verse_start: u16,
    pub verse_end: Option<u16>,
}

/// At most this many phrase hits per transcript; a long verbatim
/// reading should not flood the queue.
pub const MAX_PHRASE_MATCHES: usize = 2;

const fn p(
    phrase: &'static str,
    book: &'static str,
    chapter: u16,
    verse_start: u16,
) -> QuotedPhrase {
    QuotedPhrase {
        phrase,
        book,
        chapter,
        verse_start,
        verse_end: None,
    }
}

const fn pr(
    phrase: &'static str,
    book: &'static str,
    chapter: u16,
    verse_start: u16,
    verse_end: u16,
) -> QuotedPhrase {
    QuotedPhrase {
        phrase,
        book,
        chapter,
        verse_start,
        verse_end: Some(verse_end),
    }
}

pub const COMMON_PHRASES: &[QuotedPhrase] = &[
    p("in the beginning god created", "Genesis", 1, 1),
    p("let there be light", "Genesis", 1, 3),
    p("be strong and courageous", "Joshua", 1, 9),
    p("the lord is my shepherd", "Psalms", 23, 1),
    p("i shall not want", "Psalms", 23, 1),
    p("valley of the shadow of death", "Psalms", 23, 4),
    p("be still and know that i am god", "Psalms", 46, 10),
    p("create in me a clean heart", "Psalms", 51, 10),
    p("this is the day the lord has made", "Psalms", 118, 24),
    p("thy word is a lamp unto my feet", "Psalms", 119, 105),
    p("your word is a lamp to my feet", "Psalms", 119, 105),
    p("i am fearfully and wonderfully made", "Psalms", 139, 14),
    pr("trust in the lord with all your heart", "Proverbs", 3, 5, 6),
    p("train up a child in the way he should go", "Proverbs", 22, 6),
    p("iron sharpens iron", "Proverbs", 27, 17),
    p("they that wait upon the lord", "Isaiah", 40, 31),
    p("those who wait on the lord", "Isaiah", 40, 31),
    p("fear not for i am with you", "Isaiah", 41, 10),
    p("by his stripes we are healed", "Isaiah", 53, 5),
    p("by his wounds we are healed", "Isaiah", 53, 5),
    p("for i know the plans i have for you", "Jeremiah", 29, 11),
    p("plans to prosper you and not to harm you", "Jeremiah", 29, 11),
    p("do justly and to love mercy", "Micah", 6, 8),
    p("act justly and to love mercy", "Micah", 6, 8),
    p("blessed are the poor in spirit", "Matthew", 5, 3),
    p("blessed are the peacemakers", "Matthew", 5, 9),
    p("you are the salt of the earth", "Matthew", 5, 13),
    p("you are the light of the world", "Matthew", 5, 14),
    p("seek first the kingdom of god", "Matthew", 6, 33),
    p("seek ye first the kingdom", "Matthew", 6, 33),
    p("ask and it shall be given", "Matthew", 7, 7),
    p("ask and it will be given", "Matthew", 7, 7),
    p("come to me all you who are weary", "Matthew", 11, 28),
    p("come unto me all ye that labor", "Matthew", 11, 28),
    pr("go therefore and make disciples", "Matthew", 28, 19, 20),
    p("in the beginning was the word", "John", 1, 1),
    p("for god so loved the world", "John", 3, 16),
    p("whoever believes in him shall not perish", "John", 3, 16),
    p("the truth shall set you free", "John", 8, 32),
    p("the truth will set you free", "John", 8, 32),
    p("i have come that they may have life", "John", 10, 10),
    p("life and have it more abundantly", "John", 10, 10),
    p("i am the resurrection and the life", "John", 11, 25),
    p("i am the way the truth and the life", "John", 14, 6),
    p("greater love has no one than this", "John", 15, 13),
    p("you will receive power when the holy spirit", "Acts", 1, 8),
    p("all have sinned and fall short", "Romans", 3, 23),
    p("while we were still sinners", "Romans", 5, 8),
    p("the wages of sin is death", "Romans", 6, 23),
    p("all things work together for good", "Romans", 8, 28),
    p("if god is for us who can be against us", "Romans", 8, 31),
    p("confess with your mouth", "Romans", 10, 9),
    p("be transformed by the renewing of your mind", "Romans", 12, 2),
    p("love is patient love is kind", "1 Corinthians", 13, 4),
    p("faith hope and love", "1 Corinthians", 13, 13),
    p("the greatest of these is love", "1 Corinthians", 13, 13),
    p("if anyone is in christ he is a new creation", "2 Corinthians", 5, 17),
    p("the old has gone the new has come", "2 Corinthians", 5, 17),
    p("my grace is sufficient for you", "2 Corinthians", 12, 9),
    p("i have been crucified with christ", "Galatians", 2, 20),
    pr("the fruit of the spirit is love joy peace", "Galatians", 5, 22, 23),
    p("by grace you have been saved through faith", "Ephesians", 2, 8),
    p("put on the full armor of god", "Ephesians", 6, 11),
    p("do not be anxious about anything", "Philippians", 4, 6),
    p("i can do all things through christ", "Philippians", 4, 13),
    p("all scripture is god breathed", "2 Timothy", 3, 16),
    p("all scripture is given by inspiration", "2 Timothy", 3, 16),
    p("the word of god is living and active", "Hebrews", 4, 12),
    p("faith is the substance of things hoped for", "Hebrews", 11, 1),
    p("the assurance of things hoped for", "Hebrews", 11, 1),
    p("run with endurance the race", "Hebrews", 12, 1),
    p("the same yesterday today and forever", "Hebrews", 13, 8),
    p("every good and perfect gift", "James", 1, 17),
    p("faith without works is dead", "James", 2, 26),
    p("resist the devil and he will flee", "James", 4, 7),
    p("cast all your anxiety on him", "1 Peter", 5, 7),
    p("casting all your care upon him", "1 Peter", 5, 7),
    p("if we confess our sins he is faithful", "1 John", 1, 9),
    p("faithful and just to forgive us", "1 John", 1, 9),
    p("god is love", "1 John", 4, 8),
    p("i stand at the door and knock", "Revelation", 3, 20),
    p("the alpha and the omega", "Revelation", 22, 13),
];

fn strip_punctuation(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One phrase hit with its span start in the cleaned transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub reference: ScriptureReference,
    pub matched_text: String,
    pub position: usize,
}

/// Scans the transcript for memorized verse phrases. Matches are
/// position-ordered, deduplicated by reference, and capped at
/// [`MAX_PHRASE_MATCHES`].
pub fn find_phrase_matches(text: &str) -> Vec<PhraseMatch> {
    let cleaned = strip_punctuation(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<PhraseMatch> = Vec::new();
    for entry in COMMON_PHRASES {
        if let Some(pos) = find_word_bounded(&cleaned, entry.phrase) {
            matches.push(PhraseMatch {
                reference: ScriptureReference::new(
                    entry.book,
                    entry.chapter,
                    Some(entry.verse_start),
                    entry.verse_end,
                ),
                matched_text: entry.phrase.to_string(),
                position: pos,
            });
        }
    }

    matches.sort_by_key(|m| m.position);
    let mut seen = std::collections::HashSet::new();
    matches.retain(|m| seen.insert(m.reference.reference.clone()));
    matches.truncate(MAX_PHRASE_MATCHES);
    matches
}

/// Substring search that refuses matches glued to surrounding word
/// characters ("god is love" must not fire inside "god is lovely").
fn find_word_bounded(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let start = from + rel;
        let end = start + needle.len();
        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = start + 1;
    }
    None
}
