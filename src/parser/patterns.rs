//! Text-pattern fallbacks used when no structured markup is found.

use std::sync::LazyLock;

use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

static OBJECTIVES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)You'll learn to[^.]*\.?",
        r"(?i)In this lesson[^.]*\.?",
        r"(?i)Learning objectives[^.]*\.?",
        r"(?i)By the end of this[^.]*\.?",
    ])
});

static INSTRUCTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b\d+\.\s+[^.]*\.?",
        r"Step\s+\d+[^.]*\.?",
        r"\(\d+\)[^.]*\.?",
    ])
});

/// Hours (optionally followed by minutes) before bare minutes, so
/// "1 hr 20 mins" is not reported as "20 mins".
static TIME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)~?\s*\d+\s*(?:hours?|hrs?)\b(?:\s*\d+\s*(?:minutes?|mins?)\b)?",
        r"(?i)~?\s*\d+\s*(?:minutes?|mins?)\b",
    ])
});

static DIFFICULTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(beginner|intermediate|advanced|expert)\b").expect("valid regex"));

fn all_matches(patterns: &[Regex], text: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|p| p.find_iter(text))
        .map(|m| collapse(m.as_str()))
        .filter(|m| !m.is_empty())
        .collect()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Objective-like sentences ("You'll learn to ...", "By the end of this ...").
pub fn objectives_in(text: &str) -> Vec<String> {
    all_matches(&OBJECTIVES, text)
}

/// Numbered steps ("1. ...", "Step 2 ...", "(3) ...").
pub fn instructions_in(text: &str) -> Vec<String> {
    all_matches(&INSTRUCTIONS, text)
}

pub fn time_estimate_in(text: &str) -> Option<String> {
    TIME.iter()
        .find_map(|p| p.find(text))
        .map(|m| collapse(m.as_str()))
}

/// The first difficulty word, in its canonical capitalisation.
pub fn difficulty_in(text: &str) -> Option<String> {
    let word = DIFFICULTY.captures(text)?.get(1)?.as_str().to_lowercase();
    let mut chars = word.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}
