//! Cheap "is this not English?" heuristic deciding whether to translate.

const MARKER_CHARS: &[char] = &['á', 'é', 'í', 'ó', 'ú', 'ñ', '¿', '¡'];

const STOP_WORDS: &[&str] = &["el", "la", "los", "las", "de", "en", "que", "por", "para"];

/// True if `text` has a diacritic/marker character, or a common Spanish
/// stop-word appearing as a space-delimited token.
pub fn needs_translation(text: &str) -> bool {
    if text.chars().any(|c| MARKER_CHARS.contains(&c)) {
        return true;
    }
    let lowered = text.to_lowercase();
    STOP_WORDS
        .iter()
        .any(|w| lowered.contains(&format!(" {w} ")))
}
