//! Abstract text normalization before classification

/// Punctuation kept by [`normalize`]: brackets for chemical notation,
/// dashes for isotopes (`tc-99m`), percent signs for doses and yields.
pub const KEPT_PUNCTUATION: [char; 8] = ['(', ')', '[', ']', '{', '}', '-', '%'];

/// Texts of this many characters or fewer are never classified
pub const MIN_TEXT_CHARS: usize = 10;

/// Lowercase, turn `\n`/`\t` into spaces, drop ASCII punctuation other than
/// [`KEPT_PUNCTUATION`], then trim.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            '\n' | '\t' => out.push(' '),
            c if c.is_ascii_punctuation() && !KEPT_PUNCTUATION.contains(&c) => {}
            c => out.push(c),
        }
    }

    // Trimming last keeps whitespace exposed by removed punctuation out
    let trimmed = out.trim();
    if trimmed.len() == out.len() {
        out
    } else {
        trimmed.to_string()
    }
}

/// Whether a raw text field is long enough to be worth scoring
pub fn is_classifiable(text: &str) -> bool {
    text.chars().count() > MIN_TEXT_CHARS
}
