/// The matcher module normalizes track identities into comparable keys and
/// decides whether a file on disk belongs to a ledger entry. Matching is
/// binary after normalization: there is no distance threshold, and anything
/// ambiguous is a non-match. We would much rather leave a file orphaned than
/// claim a match that later gets a file wrongly deleted.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    // Characters that are illegal or ambiguous in filenames. The first set is
    // replaced with a dash (they typically separate words), the second set is
    // dropped outright.
    static ref DASHED_CHARS_REGEX: Regex = Regex::new(r"[:/\\|]+").unwrap();
    static ref DROPPED_CHARS_REGEX: Regex = Regex::new(r#"[?*"<>]+"#).unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
    static ref PUNCTUATION_REGEX: Regex = Regex::new(r"[^\w\s]+").unwrap();
}

/// Strip or replace filename-hostile characters and collapse whitespace. The
/// result is safe to use as a file or ledger name on every filesystem we care
/// about.
pub fn sanitize_name(name: &str) -> String {
    let name: String = name.nfc().collect();
    let name = DASHED_CHARS_REGEX.replace_all(&name, "-");
    let name = DROPPED_CHARS_REGEX.replace_all(&name, "");
    WHITESPACE_REGEX.replace_all(&name, " ").trim().to_string()
}

/// Clean up spacing artifacts that past download tools left in filenames:
/// ` _ ` substitutions, runs of spaces, and a stray space before the
/// extension.
pub fn clean_spacing_artifacts(filename: &str) -> String {
    let cleaned = filename.replace(" _ ", " ");
    let cleaned = WHITESPACE_REGEX.replace_all(&cleaned, " ").to_string();
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}", stem.trim(), ext).trim().to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Reduce a name to its comparable core: sanitized, lowercased, punctuation
/// removed, whitespace collapsed. Two names with equal fingerprints are
/// considered the same track.
pub fn fingerprint(name: &str) -> String {
    let name = sanitize_name(name).to_lowercase();
    let name = PUNCTUATION_REGEX.replace_all(&name, "");
    WHITESPACE_REGEX.replace_all(&name, " ").trim().to_string()
}

/// Binary fuzzy equality between a ledger-derived name and a filename-derived
/// name. Symmetric and deterministic; empty fingerprints never match.
pub fn fuzzy_equal(a: &str, b: &str) -> bool {
    let fa = fingerprint(a);
    if fa.is_empty() {
        return false;
    }
    fa == fingerprint(b)
}

/// The canonical "Artist - Title" display/file stem for a track.
pub fn track_stem(artist: &str, title: &str) -> String {
    sanitize_name(&format!("{} - {}", artist, title))
}
