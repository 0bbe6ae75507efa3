//! Keyword heuristics for document and concept domains
//!
//! Everything here is a pure function of its input text.

use lectern_domain::{ConceptDomain, DocumentDomain};
use regex::Regex;
use std::sync::LazyLock;

/// Characters of the document inspected by `detect_document_domain`
pub const DOMAIN_SAMPLE_CHARS: usize = 4_000;

/// Keyword hits a category needs before it can win
pub const MIN_DOMAIN_HITS: usize = 3;

const TECHNICAL_WORDS: &[&str] = &[
    "equation", "theorem", "algorithm", "formula", "derivative", "integral", "matrix",
    "vector", "proof", "lemma", "calculate", "compute", "function", "variable", "velocity",
    "energy", "force", "voltage", "circuit", "molecule", "reaction", "probability",
    "complexity", "data structure", "polynomial",
];

const SOCIAL_WORDS: &[&str] = &[
    "history", "historical", "war", "government", "society", "social", "culture", "political",
    "politics", "court", "treaty", "revolution", "economy", "religion", "century", "empire",
    "rights", "policy", "constitution", "legislation", "novel", "author", "movement",
];

const PROCEDURAL_WORDS: &[&str] = &[
    "step", "procedure", "install", "configure", "click", "instructions", "guide", "manual",
    "checklist", "setup", "press", "select", "navigate", "troubleshoot", "prerequisite",
];

fn keyword_regex(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    // Prefix match so plurals and inflections count ("equations", "computed").
    Regex::new(&format!(r"(?i)\b(?:{})\w*", alternation)).expect("keyword list is escaped")
}

static TECHNICAL: LazyLock<Regex> = LazyLock::new(|| keyword_regex(TECHNICAL_WORDS));
static SOCIAL: LazyLock<Regex> = LazyLock::new(|| keyword_regex(SOCIAL_WORDS));
static PROCEDURAL: LazyLock<Regex> = LazyLock::new(|| keyword_regex(PROCEDURAL_WORDS));

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("hardcoded regex pattern is valid"));
    };
}

pattern!(DIGIT_OPERATOR, r"\d\s*[-+*/^=×÷<>]\s*[\d(a-zA-Z]|[a-zA-Z)]\s*[-+*/^=×÷]\s*\d");
pattern!(PERCENT, r"\d\s*%");
pattern!(EQUALS, r"=");
pattern!(GREEK, r"[α-ωΑ-Ω]");
pattern!(UNIT, r"\b\d+(?:\.\d+)?\s?(?:kg|mg|km|cm|mm|m/s|ms|mol|Hz|kHz|MHz|GHz|kW|W|J|kJ|N|V|mA|A|K|°C|°F|s|m|g|L|ml)\b");
pattern!(MATH_WORD, r"(?i)\b(?:equation|formula|calculate|compute|derivative|integral|sum|ratio|probability|average|mean|variance|percent|rate|coefficient)\w*");
pattern!(YEAR, r"\b(?:1[0-9]{3}|20[0-9]{2})s?\b");
pattern!(PROPER_NAME, r"\b[A-Z][a-z]+(?:\s+(?:of\s+|the\s+|de\s+)?[A-Z][a-z]+)+\b");
pattern!(QUAL_WORD, r"(?i)\b(?:case|court|treaty|act|ruling|king|queen|emperor|war|revolution|movement|dynasty|parliament|decision|verdict)s?\b");
pattern!(ANY_DIGIT, r"\d");

fn sample(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Label a document by keyword vote over its first 4,000 characters
///
/// A category needs at least three hits and a strict lead to win; anything
/// else is `General`.
pub fn detect_document_domain(text: &str) -> DocumentDomain {
    let sample = sample(text, DOMAIN_SAMPLE_CHARS);
    let votes = [
        (DocumentDomain::Technical, TECHNICAL.find_iter(sample).count()),
        (DocumentDomain::Social, SOCIAL.find_iter(sample).count()),
        (DocumentDomain::Procedural, PROCEDURAL.find_iter(sample).count()),
    ];

    let top = votes.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if top < MIN_DOMAIN_HITS {
        return DocumentDomain::General;
    }
    let mut leaders = votes.iter().filter(|(_, n)| *n == top);
    match (leaders.next(), leaders.next()) {
        (Some((domain, _)), None) => *domain,
        _ => DocumentDomain::General,
    }
}

/// Count quantitative signals (operators next to digits, %, =, Greek, units, math words)
pub fn quantitative_signals(text: &str) -> usize {
    DIGIT_OPERATOR.find_iter(text).count()
        + PERCENT.find_iter(text).count()
        + EQUALS.find_iter(text).count()
        + GREEK.find_iter(text).count()
        + UNIT.find_iter(text).count()
        + MATH_WORD.find_iter(text).count()
}

/// Count qualitative signals (years, multi-word proper names, case/court/treaty words)
pub fn qualitative_signals(text: &str) -> usize {
    YEAR.find_iter(text).count() + PROPER_NAME.find_iter(text).count() + QUAL_WORD.find_iter(text).count()
}

/// Label a concept's text as quantitative, qualitative or mixed
///
/// A side wins with at least two hits and more than twice the other's count.
pub fn detect_concept_domain(text: &str) -> ConceptDomain {
    let quant = quantitative_signals(text);
    let qual = qualitative_signals(text);
    if quant >= 2 && quant > 2 * qual {
        ConceptDomain::Quant
    } else if qual >= 2 && qual > 2 * quant {
        ConceptDomain::Qual
    } else {
        ConceptDomain::Semi
    }
}

/// Whether the text contains any number
pub fn has_numeric_signal(text: &str) -> bool {
    ANY_DIGIT.is_match(text)
}

/// Whether the text is anchored to a date, a named entity or a concrete case
pub fn has_anchored_signal(text: &str) -> bool {
    YEAR.is_match(text) || PROPER_NAME.is_match(text) || QUAL_WORD.is_match(text)
}
