//! Commodity name cleaning and Sinhala→English translation.

use std::sync::LazyLock;

use regex::Regex;

/// Longest plausible commodity name; longer cells are merged paragraphs.
const MAX_NAME_CHARS: usize = 45;

/// Shortest plausible name; shorter cells are broken glyphs.
const MIN_NAME_CHARS: usize = 3;

/// Placeholders that never name a commodity.
const NO_VALUE: &[&str] = &["-", "N/A", "None"];

/// Boilerplate that marks a cell as a heading or note, not a commodity.
pub const JUNK_WORDS: &[&str] = &[
    "vegetable",
    "variety",
    "up country",
    "low country",
    "wholesale",
    "retail",
    "price",
    "market",
    "bulletin",
    "commodity",
];

/// Sinhala names and their English display form, in match order.
pub const LEXICON: &[(&str, &str)] = &[
    ("තක්කාලි", "Tomato"),
    ("කැරට්", "Carrot"),
    ("බෝංචි", "Beans"),
    ("දිග බෝංචි", "Long Beans"),
    ("ගෝවා", "Cabbage"),
    ("වට්ටක්කා", "Pumpkin"),
    ("වම්බටු", "Brinjal"),
    ("බීට්", "Beetroot"),
    ("බීට්රූට්", "Beetroot"),
    ("ලීක්", "Leeks"),
    ("ලීක්ස්", "Leeks"),
    ("පිපිඤ්ඤා", "Cucumber"),
    ("දෙහි", "Lime"),
    ("මිරිස්", "Green Chillies"),
    ("අමු මිරිස්", "Green Chillies"),
    ("බණ්ඩක්කා", "Ladies Fingers"),
    ("රාබු", "Radish"),
    ("කරවිල", "Bitter Gourd"),
    ("පතෝල", "Snake Gourd"),
    ("ලූනු", "Big Onion"),
    ("ලොකු ලූනු", "Big Onion"),
    ("අල", "Potato"),
];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[•|/\\]+").expect("separator regex"));

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("digit regex"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[-./]\d{2}[-./]\d{2}").expect("date regex"));

static LATIN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s()\-/.,]+$").expect("latin name regex"));

/// Collapse whitespace and replace bullet/pipe/slash separators with spaces.
///
/// Idempotent: normalizing a normalized name returns it unchanged.
pub fn normalize_name(raw: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(raw, " ");
    let separated = SEPARATOR_RE.replace_all(collapsed.trim(), " ");
    WHITESPACE_RE.replace_all(&separated, " ").trim().to_string()
}

/// Whether a normalized name is clearly not a commodity.
pub fn is_junk_name(name: &str) -> bool {
    if name.is_empty() || NO_VALUE.contains(&name) {
        return true;
    }
    let chars = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&chars) {
        return true;
    }
    if DIGIT_RE.is_match(name) || DATE_RE.is_match(name) {
        return true;
    }
    let lower = name.to_lowercase();
    JUNK_WORDS.iter().any(|w| lower.contains(w))
}

/// Strip punctuation and whitespace from both ends of a name.
///
/// Interior characters are kept, so `Ash-Plantain` is unchanged.
fn trim_edge_punctuation(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
}

/// Translate a normalized name to its English display form.
///
/// Exact lexicon keys first (ignoring edge punctuation), then the first key
/// (in lexicon order) contained in the name, then Latin-script names
/// title-cased. Returns `None` for anything else.
pub fn translate_name(name: &str) -> Option<String> {
    let core = trim_edge_punctuation(name);
    if let Some((_, english)) = LEXICON.iter().find(|(key, _)| *key == core) {
        return Some((*english).to_string());
    }
    if let Some((_, english)) = LEXICON.iter().find(|(key, _)| name.contains(key)) {
        return Some((*english).to_string());
    }
    if LATIN_NAME_RE.is_match(name) {
        return Some(title_case(name));
    }
    None
}

/// Normalize, reject junk, and translate in one step.
pub fn clean_commodity_name(raw: &str) -> Option<String> {
    let name = normalize_name(raw);
    if is_junk_name(&name) {
        return None;
    }
    translate_name(&name)
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_separates() {
        assert_eq!(normalize_name("  Big\nOnion  "), "Big Onion");
        assert_eq!(normalize_name("Beans • | Green"), "Beans Green");
        assert_eq!(normalize_name(r"Leeks/Local\Imported"), "Leeks Local Imported");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "  Big\nOnion  ",
            "Beans • | Green",
            "තක්කාලි / Tomato",
            "/ / Carrot //",
            "",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "{raw:?}");
        }
    }

    #[test]
    fn exact_lexicon_keys_translate_through_noise() {
        for (key, english) in LEXICON {
            for noisy in [
                format!("  • {key} | \n"),
                format!("{key}."),
                format!("({key})"),
                format!("- {key}"),
                format!("* {key}:"),
                format!("{key} -"),
            ] {
                let name = normalize_name(&noisy);
                assert_eq!(translate_name(&name).as_deref(), Some(*english), "{noisy:?}");
            }
        }
        assert_eq!(clean_commodity_name("| ගෝවා |").as_deref(), Some("Cabbage"));
        assert_eq!(clean_commodity_name("දිග බෝංචි.").as_deref(), Some("Long Beans"));
        assert_eq!(clean_commodity_name("(දිග බෝංචි)").as_deref(), Some("Long Beans"));
    }

    #[test]
    fn containment_follows_lexicon_order() {
        // Contains both "බෝංචි" and "දිග බෝංචි"; the earlier entry wins.
        assert_eq!(translate_name("දිග බෝංචි (දේශීය)").as_deref(), Some("Beans"));
        assert_eq!(translate_name("අල (ආනයනික)").as_deref(), Some("Potato"));
    }

    #[test]
    fn latin_names_title_cased() {
        assert_eq!(translate_name("cabbage (imported)").as_deref(), Some("Cabbage (Imported)"));
        assert_eq!(translate_name("LADIES FINGERS").as_deref(), Some("Ladies Fingers"));
        assert_eq!(translate_name("Ash-plantain").as_deref(), Some("Ash-Plantain"));
        assert_eq!(translate_name("(Imported) Leeks").as_deref(), Some("(Imported) Leeks"));
    }

    #[test]
    fn unknown_script_dropped() {
        assert_eq!(translate_name("කොස්"), None);
        assert_eq!(translate_name("Tomato ✓"), None);
    }

    #[test]
    fn junk_names() {
        for name in [
            "",
            "-",
            "N/A",
            "None",
            "ab",
            "Tomato 2",
            "2025.01.06",
            "Vegetables",
            "UP COUNTRY",
            "Wholesale Prices",
            "Commodity",
            "Average retail prices in the main markets as reported",
        ] {
            assert!(is_junk_name(name), "{name:?}");
        }
        assert!(!is_junk_name("Tomato"));
        // Two code points: too short on its own, matched only inside longer cells.
        assert!(is_junk_name("අල"));
    }

    #[test]
    fn length_counts_characters() {
        // Three Sinhala code points, nine UTF-8 bytes.
        assert!(!is_junk_name("අලා"));
        let long = "අ".repeat(MAX_NAME_CHARS);
        assert!(!is_junk_name(&long));
        assert!(is_junk_name(&format!("{long}අ")));
    }
}
