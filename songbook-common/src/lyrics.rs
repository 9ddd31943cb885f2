//! Lyrics verse splitting
//!
//! Verses are separated by one or more blank lines. CRLF line endings are
//! treated like LF. Verse numbers are 1-based.

use thiserror::Error;

/// Verse lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerseError {
    #[error("invalid verse number {requested}: song has {available} verse(s)")]
    OutOfRange { requested: i64, available: usize },
}

/// Split lyrics into verses
///
/// Leading and trailing newlines are trimmed from each verse and empty
/// verses (runs of blank lines) are dropped.
///
/// # Examples
/// ```
/// use songbook_common::lyrics::split_verses;
///
/// let verses = split_verses("first line\nsecond\n\nchorus\n\n\nlast");
/// assert_eq!(verses, vec!["first line\nsecond", "chorus", "last"]);
/// ```
pub fn split_verses(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");

    normalized
        .split("\n\n")
        .map(|verse| verse.trim_matches('\n'))
        .filter(|verse| !verse.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Return verse `number` (1-based)
pub fn verse(text: &str, number: i64) -> Result<String, VerseError> {
    let mut verses = split_verses(text);
    let available = verses.len();

    if number < 1 || number as usize > available {
        return Err(VerseError::OutOfRange {
            requested: number,
            available,
        });
    }

    Ok(verses.swap_remove(number as usize - 1))
}
