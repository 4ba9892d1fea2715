use super::{DetectLanguage, Lang};

/// Script-range and function-word language detector.
///
/// Non-Latin scripts are classified by Unicode block; Latin-script text is
/// scored against high-frequency function words per language. No signal at
/// all yields [`Lang::Unknown`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDetector;

/// High-frequency function words per Latin-script language. Checked in
/// order; the first language with the strictly highest score wins.
const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "a", "an", "is", "are", "was", "do", "does", "can", "how", "what", "where",
            "when", "why", "you", "your", "my", "i", "it", "to", "of", "in", "and",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "es", "son", "una", "uno", "que", "como", "donde", "cuando",
            "por", "para", "con", "mi", "su", "y", "de", "hay",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "est", "sont", "une", "que", "quoi", "comment", "ou", "quand",
            "pour", "avec", "mon", "votre", "et", "je", "vous", "des", "du",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "ist", "sind", "ein", "eine", "wie", "wo", "wann", "warum",
            "und", "ich", "sie", "mein", "ihre", "mit", "für", "kann", "nicht",
        ],
    ),
];

impl DetectLanguage for HeuristicDetector {
    fn detect(&self, text: &str) -> Lang {
        if let Some(code) = script_code(text) {
            return Lang::other(code);
        }
        latin_code(text)
    }
}

/// Map a non-Latin script to a language code. Kana is checked before Han:
/// Japanese text mixes both, Chinese text has no kana.
fn script_code(text: &str) -> Option<&'static str> {
    for c in text.chars() {
        let code = match c {
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => "ja",
            '\u{AC00}'..='\u{D7AF}' => "ko",
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => "zh",
            '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => "ar",
            '\u{0590}'..='\u{05FF}' => "he",
            '\u{0400}'..='\u{04FF}' => "ru",
            '\u{0370}'..='\u{03FF}' => "el",
            '\u{0900}'..='\u{097F}' => "hi",
            '\u{0E00}'..='\u{0E7F}' => "th",
            _ => continue,
        };
        return Some(code);
    }
    None
}

fn latin_code(text: &str) -> Lang {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return Lang::Unknown;
    }

    let mut best: Option<(&str, usize)> = None;
    for (code, stopwords) in STOPWORDS {
        let score = words.iter().filter(|w| stopwords.contains(w)).count();
        if score > 0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((code, score));
        }
    }

    match best {
        Some(("en", _)) => Lang::En,
        Some((code, _)) => Lang::other(code),
        None => Lang::Unknown,
    }
}
