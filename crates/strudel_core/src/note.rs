//! Note token validation.
//!
//! A note token is either the rest marker `~` or a note name followed by a
//! single octave digit, e.g. `C3`, `Eb4`, `F#5`.

use thiserror::Error;

/// Marks a silent step in the melody.
pub const REST: &str = "~";

/// Note spellings accepted by the player.
pub const NOTE_NAMES: [&str; 17] = [
    "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#", "Ab", "A", "A#", "Bb", "B",
];

pub const MAX_OCTAVE: u8 = 8;

/// Why a note token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    /// The token is not shaped like `Letter[#/b]Digit`.
    #[error(
        "Invalid note format '{0}'. Use format: Note[#/b]Octave (e.g., C3, Eb4, F#5) or '~' for silence"
    )]
    Format(String),

    /// Shaped like a note, but the name is not one of [`NOTE_NAMES`].
    #[error("Invalid note name '{0}'. Valid notes: {names}", names = NOTE_NAMES.join(", "))]
    Name(String),

    /// Shaped like a note, but the octave digit is above [`MAX_OCTAVE`].
    #[error("Invalid octave '{0}'. Valid octaves: 0-{max}", max = MAX_OCTAVE)]
    Octave(String),
}

/// Split a token into its name and octave digit without checking either
/// against the legal sets.
fn split(token: &str) -> Option<(&str, u8)> {
    let bytes = token.as_bytes();
    let name_len = match bytes {
        [letter, digit] if letter.is_ascii_uppercase() && digit.is_ascii_digit() => 1,
        [letter, b'#' | b'b', digit] if letter.is_ascii_uppercase() && digit.is_ascii_digit() => 2,
        _ => return None,
    };
    Some((&token[..name_len], bytes[name_len] - b'0'))
}

/// Check a single note token.
pub fn validate_note(token: &str) -> Result<(), NoteError> {
    if token == REST {
        return Ok(());
    }

    let (name, octave) = split(token).ok_or_else(|| NoteError::Format(token.to_string()))?;

    if !NOTE_NAMES.contains(&name) {
        return Err(NoteError::Name(name.to_string()));
    }

    if octave > MAX_OCTAVE {
        return Err(NoteError::Octave(octave.to_string()));
    }

    Ok(())
}

pub fn is_rest(token: &str) -> bool {
    token == REST
}

/// Ordering key used when listing notes: octave first, then spelling.
pub fn sort_key(token: &str) -> (Option<char>, &str) {
    let mut chars = token.chars();
    let octave = chars.next_back();
    (octave, chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_legal_spelling_and_octave() {
        for name in NOTE_NAMES {
            for octave in 0..=MAX_OCTAVE {
                let token = format!("{name}{octave}");
                assert_eq!(validate_note(&token), Ok(()), "{token}");
            }
        }
    }

    #[test]
    fn test_rest_is_valid() {
        assert!(validate_note(REST).is_ok());
    }

    #[test]
    fn test_rejections_are_distinguishable() {
        assert_eq!(validate_note("H3"), Err(NoteError::Name("H".into())));
        assert_eq!(validate_note("C"), Err(NoteError::Format("C".into())));
        assert_eq!(validate_note("C#"), Err(NoteError::Format("C#".into())));
        assert_eq!(validate_note("C9"), Err(NoteError::Octave("9".into())));
    }

    #[test]
    fn test_bad_shapes() {
        for token in ["", "C10", "c3", "C#b3", "3C", "C 3", "Cx3", "~~"] {
            assert!(
                matches!(validate_note(token), Err(NoteError::Format(_))),
                "{token:?} should be a format error"
            );
        }
    }

    #[test]
    fn test_enharmonic_spellings_outside_list() {
        assert_eq!(validate_note("E#3"), Err(NoteError::Name("E#".into())));
        assert_eq!(validate_note("Cb4"), Err(NoteError::Name("Cb".into())));
    }

    #[test]
    fn test_messages_show_alternatives() {
        let msg = validate_note("H3").unwrap_err().to_string();
        assert!(msg.contains("Valid notes: C, C#, Db"));
        let msg = validate_note("C9").unwrap_err().to_string();
        assert!(msg.contains("0-8"));
    }

    #[test]
    fn test_sort_key() {
        let mut notes = vec!["G5", "C3", "Eb3", "A2"];
        notes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        assert_eq!(notes, vec!["A2", "C3", "Eb3", "G5"]);
    }
}
