//! Transcript normalization ahead of deterministic parsing.
//!
//! Spoken-style citations ("First Corinthians chapter thirteen verse four")
//! are rewritten into the compact written form ("1 corinthians 13:4") through
//! a fixed pipeline: casefold, speech-to-text corrections, ordinal book
//! prefixes, number words, chapter/verse keywords, range keywords, filler
//! removal, whitespace tightening. Output is always lowercase.

use once_cell::sync::Lazy;
use regex::Regex;

/// Frequent speech-to-text mistranscriptions of book names.
static STT_CORRECTIONS: &[(&str, &str)] = &[
    ("revelations", "revelation"),
    ("songs of solomon", "song of solomon"),
    ("salms", "psalms"),
    ("sams", "psalms"),
    ("palms", "psalms"),
    ("proverb ", "proverbs "),
    ("collisions", "colossians"),
    ("collosians", "colossians"),
    ("philipians", "philippians"),
    ("filipians", "philippians"),
    ("ecclesiastees", "ecclesiastes"),
    ("duetoronomy", "deuteronomy"),
    ("dueteronomy", "deuteronomy"),
];

static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Ones, teens, and tens. Longest names first so "seventeen" is not
/// clobbered by "seven".
static NUMBER_WORDS: &[(&str, u16)] = &[
    ("seventeen", 17),
    ("thirteen", 13),
    ("fourteen", 14),
    ("eighteen", 18),
    ("nineteen", 19),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventy", 70),
    ("hundred", 100),
    ("eleven", 11),
    ("twelve", 12),
    ("twenty", 20),
    ("thirty", 30),
    ("eighty", 80),
    ("ninety", 90),
    ("three", 3),
    ("seven", 7),
    ("eight", 8),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("four", 4),
    ("five", 5),
    ("nine", 9),
    ("one", 1),
    ("two", 2),
    ("six", 6),
    ("ten", 10),
];

static TENS: &str = "twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety";
static ONES: &str = "one|two|three|four|five|six|seven|eight|nine";

/// Compound numbers ("twenty eight", "twenty-eight") before singles.
static COMPOUND_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({TENS})[\s-]({ONES})\b")).unwrap());

/// "one hundred (and) fifty", "one hundred three".
static HUNDRED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(one|two|three)\s+hundred(?:\s+(?:and\s+)?((?:{TENS})(?:[\s-](?:{ONES}))?|{ONES}|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen))?\b"
    ))
    .unwrap()
});

/// Books that take a roman-numeral prefix when spoken. Restricting to
/// these keeps the standalone pronoun "I" intact elsewhere.
static ROMAN_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(i{1,3})\s+(samuel|kings|chronicles|corinthians|thessalonians|timothy|peter|john)\b",
    )
    .unwrap()
});

static ORDINAL_PREFIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bfirst\s+", "1 "),
        (r"\bsecond\s+", "2 "),
        (r"\bthird\s+", "3 "),
        (r"\b1st\s+", "1 "),
        (r"\b2nd\s+", "2 "),
        (r"\b3rd\s+", "3 "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static CHAPTER_VERSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bchapter\s+(\d+)\s*,?\s*verses?\s+(\d+)").unwrap());
static CHAPTER_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bchapter\s+(\d+)").unwrap());
static VERSE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bverses?\s+(\d+)").unwrap());
static RANGE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s*(?:through|thru|to)\s*(\d)").unwrap());
static RANGE_AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+and\s+(\d+)").unwrap());
static STARTING_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstarting\s+(?:at|in|with)\s+verse\s+(\d+)").unwrap());

/// Filler people put between the book name and the numbers. Longest
/// first so subphrases do not leave stragglers behind.
static FILLER_PHRASES: &[&str] = &[
    "if you would turn with me to",
    "let's turn in our bibles to",
    "i want you to turn to",
    "turn with me to",
    "turn in your bibles to",
    "turn in your bible to",
    "let's look at",
    "let's turn to",
    "let us turn to",
    "if you look at",
    "looking at",
    "let's read",
    "let us read",
    "we read in",
    "reading from",
    "we find in",
    "open your bibles to",
    "open your bible to",
    "go to",
    "turn to",
    "over in",
    "back in",
    "here in",
    "the book of",
];

static FILLERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let mut phrases: Vec<&str> = FILLER_PHRASES.to_vec();
    phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));
    phrases
        .iter()
        .map(|p| Regex::new(&format!(r"\b{}\b", regex::escape(p))).unwrap())
        .collect()
});

static SINGLE_NUMBERS: Lazy<Vec<(Regex, u16)>> = Lazy::new(|| {
    NUMBER_WORDS
        .iter()
        .map(|(word, value)| (Regex::new(&format!(r"\b{word}\b")).unwrap(), *value))
        .collect()
});

fn word_value(word: &str) -> u16 {
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, v)| *v)
        .unwrap_or(0)
}

fn replace_number_words(text: &str) -> String {
    // "one/two/three hundred ..." first, then compound tens, then singles.
    let text = HUNDRED_NUMBER.replace_all(text, |caps: &regex::Captures| {
        let hundreds = word_value(&caps[1]) * 100;
        let remainder = caps.get(2).map_or(0, |m| {
            let part = m.as_str();
            if let Some(c) = COMPOUND_NUMBER.captures(&format!(" {part} ")) {
                word_value(&c[1]) + word_value(&c[2])
            } else if let Some((tens, ones)) = part.split_once([' ', '-']) {
                word_value(tens) + word_value(ones)
            } else {
                word_value(part)
            }
        });
        (hundreds + remainder).to_string()
    });
    let text = COMPOUND_NUMBER.replace_all(&text, |caps: &regex::Captures| {
        (word_value(&caps[1]) + word_value(&caps[2])).to_string()
    });
    let mut text = text.into_owned();
    for (re, value) in SINGLE_NUMBERS.iter() {
        text = re.replace_all(&text, value.to_string()).into_owned();
    }
    text
}

/// Rewrites a raw transcript into the compact lowercase citation form
/// the deterministic parser matches against.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_lowercase();

    for (wrong, right) in STT_CORRECTIONS {
        text = text.replace(wrong, right);
    }

    text = ROMAN_PREFIX
        .replace_all(&text, |caps: &regex::Captures| {
            format!("{} {}", caps[1].len(), &caps[2])
        })
        .into_owned();
    for (re, replacement) in ORDINAL_PREFIXES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    text = replace_number_words(&text);

    text = CHAPTER_VERSE.replace_all(&text, "$1:$2").into_owned();
    text = CHAPTER_ONLY.replace_all(&text, "$1").into_owned();
    text = STARTING_AT.replace_all(&text, ":$1").into_owned();
    text = VERSE_ONLY.replace_all(&text, ":$1").into_owned();

    text = RANGE_WORD.replace_all(&text, "$1-$2").into_owned();
    text = RANGE_AND.replace_all(&text, "$1-$2").into_owned();

    for filler in FILLERS.iter() {
        text = filler.replace_all(&text, " ").into_owned();
    }

    tighten(&text)
}

/// Collapses runs of whitespace and closes gaps around ':' and '-'.
fn tighten(text: &str) -> String {
    let text = WS.replace_all(text, " ");
    let text = text.replace(" :", ":").replace(": ", ":");
    let text = text.replace(" -", "-").replace("- ", "-");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spoken_chapter_and_verse() {
        let out = normalize("Turn to John chapter three verse sixteen");
        assert!(out.contains("john 3:16"), "got: {out}");
    }

    #[test]
    fn test_ordinal_book_prefix() {
        let out = normalize("First Corinthians chapter thirteen");
        assert!(out.contains("1 corinthians 13"), "got: {out}");
    }

    #[test]
    fn test_verse_range_with_compound_numbers() {
        let out = normalize("Romans chapter eight verses twenty eight through thirty");
        assert!(out.contains("romans 8:28-30"), "got: {out}");
    }

    #[test]
    fn test_roman_numeral_prefix() {
        let out = normalize("II Peter chapter one verse three");
        assert!(out.contains("2 peter 1:3"), "got: {out}");
    }

    #[test]
    fn test_roman_prefix_leaves_pronoun_alone() {
        let out = normalize("I want you to know this");
        assert!(!out.starts_with("1 "), "got: {out}");
    }

    #[test]
    fn test_stt_correction() {
        let out = normalize("Revelations twenty two");
        assert!(out.contains("revelation 22"), "got: {out}");
    }

    #[test]
    fn test_hundred_numbers() {
        let out = normalize("Psalm one hundred and nineteen");
        assert!(out.contains("psalm 119"), "got: {out}");
        let out = normalize("Psalm one hundred nineteen");
        assert!(out.contains("psalm 119"), "got: {out}");
        let out = normalize("Psalm one hundred fifty");
        assert!(out.contains("psalm 150"), "got: {out}");
    }

    #[test]
    fn test_filler_removal() {
        let out = normalize("If you would turn with me to the book of Acts chapter two");
        assert!(out.contains("acts 2"), "got: {out}");
    }

    #[test]
    fn test_verses_and_becomes_range() {
        let out = normalize("Matthew five verses three and four");
        assert!(out.contains("matthew 5:3-4"), "got: {out}");
    }
}
