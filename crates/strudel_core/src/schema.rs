//! Validation of a decoded record against the pattern schema.
//!
//! Checks run in a fixed order and stop at the first problem:
//! 1) top-level keys `bpm`, `chords`, `melody` are present
//! 2) `bpm` range
//! 3) chord section fields, then melody fields, then drums (if any)
//! 4) every note token in the chords, then in the melody
//!
//! Keys the schema does not know about are ignored.

use std::ops::RangeInclusive;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::note::validate_note;
use crate::pattern::{
    BPM_RANGE, ChordSection, DELAY_RANGE, DrumSection, FILTER_RANGE, MelodySection, Pattern,
    TimeInterval, Waveform,
};

/// First schema problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct SchemaViolation {
    /// Dotted path to the offending value, e.g. `chords.progression[1][0]`.
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

type Check<T> = Result<T, SchemaViolation>;

/// Validate a decoded record and convert it to a [`Pattern`].
pub fn validate(record: &Value) -> Check<Pattern> {
    let root = object(record, "pattern")?;
    for key in ["bpm", "chords", "melody"] {
        if !root.contains_key(key) {
            return Err(SchemaViolation::new(key, "Field required"));
        }
    }

    let bpm = integer_in(&root["bpm"], "bpm", BPM_RANGE)?;
    let chords = chord_section(&root["chords"])?;
    let melody = melody_section(&root["melody"])?;
    let drums = match root.get("drums") {
        None | Some(Value::Null) => None,
        Some(value) => Some(drum_section(value)?),
    };

    for (i, chord) in chords.progression.iter().enumerate() {
        for (j, note) in chord.iter().enumerate() {
            validate_note(note).map_err(|err| {
                SchemaViolation::new(
                    format!("chords.progression[{i}][{j}]"),
                    format!("Invalid note in chord: {err}"),
                )
            })?;
        }
    }
    for (i, note) in melody.notes.iter().enumerate() {
        validate_note(note).map_err(|err| {
            SchemaViolation::new(
                format!("melody.notes[{i}]"),
                format!("Invalid note in melody: {err}"),
            )
        })?;
    }

    Ok(Pattern {
        bpm: bpm as u32,
        chords,
        melody,
        drums,
    })
}

fn chord_section(value: &Value) -> Check<ChordSection> {
    let obj = object(value, "chords")?;

    let progression_value = required(obj, "chords", "progression")?;
    let chords = non_empty_array(progression_value, "chords.progression")?;
    let progression = chords
        .iter()
        .enumerate()
        .map(|(i, chord)| string_list(chord, &format!("chords.progression[{i}]")))
        .collect::<Check<Vec<_>>>()?;

    Ok(ChordSection {
        progression,
        interval: interval(required(obj, "chords", "interval")?, "chords.interval")?,
        duration: interval(required(obj, "chords", "duration")?, "chords.duration")?,
        filter: integer_in(required(obj, "chords", "filter")?, "chords.filter", FILTER_RANGE)?
            as u32,
    })
}

fn melody_section(value: &Value) -> Check<MelodySection> {
    let obj = object(value, "melody")?;

    Ok(MelodySection {
        notes: string_list(required(obj, "melody", "notes")?, "melody.notes")?,
        interval: interval(required(obj, "melody", "interval")?, "melody.interval")?,
        duration: interval(required(obj, "melody", "duration")?, "melody.duration")?,
        waveform: waveform(required(obj, "melody", "waveform")?, "melody.waveform")?,
        delay: number_in(required(obj, "melody", "delay")?, "melody.delay", DELAY_RANGE)?,
    })
}

fn drum_section(value: &Value) -> Check<DrumSection> {
    let obj = object(value, "drums")?;

    Ok(DrumSection {
        kick: hit_list(required(obj, "drums", "kick")?, "drums.kick")?,
        snare: hit_list(required(obj, "drums", "snare")?, "drums.snare")?,
        interval: interval(required(obj, "drums", "interval")?, "drums.interval")?,
    })
}

fn object<'a>(value: &'a Value, field: &str) -> Check<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(field, format!("Expected an object, got {value}")))
}

fn required<'a>(obj: &'a Map<String, Value>, section: &str, key: &str) -> Check<&'a Value> {
    obj.get(key)
        .ok_or_else(|| SchemaViolation::new(format!("{section}.{key}"), "Field required"))
}

fn non_empty_array<'a>(value: &'a Value, field: &str) -> Check<&'a Vec<Value>> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(field, format!("Expected a list, got {value}")))?;
    if items.is_empty() {
        return Err(SchemaViolation::new(field, "List should have at least 1 item"));
    }
    Ok(items)
}

fn string_list(value: &Value, field: &str) -> Check<Vec<String>> {
    non_empty_array(value, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                SchemaViolation::new(
                    format!("{field}[{i}]"),
                    format!("Expected a note string, got {item}"),
                )
            })
        })
        .collect()
}

fn hit_list(value: &Value, field: &str) -> Check<Vec<u8>> {
    non_empty_array(value, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| match item.as_u64() {
            Some(hit @ (0 | 1)) => Ok(hit as u8),
            _ => Err(SchemaViolation::new(
                format!("{field}[{i}]"),
                format!("Drum patterns must only contain 0 (silence) or 1 (hit), got {item}"),
            )),
        })
        .collect()
}

fn integer_in(value: &Value, field: &str, range: RangeInclusive<i64>) -> Check<i64> {
    let n = value
        .as_i64()
        .ok_or_else(|| SchemaViolation::new(field, format!("Expected an integer, got {value}")))?;
    if !range.contains(&n) {
        return Err(SchemaViolation::new(
            field,
            format!(
                "{n} is out of range; must be between {} and {}",
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(n)
}

fn number_in(value: &Value, field: &str, range: RangeInclusive<f64>) -> Check<f64> {
    let n = value
        .as_f64()
        .ok_or_else(|| SchemaViolation::new(field, format!("Expected a number, got {value}")))?;
    if !range.contains(&n) {
        return Err(SchemaViolation::new(
            field,
            format!(
                "{n} is out of range; must be between {:?} and {:?}",
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(n)
}

fn interval(value: &Value, field: &str) -> Check<TimeInterval> {
    value
        .as_str()
        .and_then(TimeInterval::from_token)
        .ok_or_else(|| {
            let allowed: Vec<&str> = TimeInterval::ALL.iter().map(|t| t.as_str()).collect();
            SchemaViolation::new(
                field,
                format!("{value} is not a valid interval; use one of {}", allowed.join(", ")),
            )
        })
}

fn waveform(value: &Value, field: &str) -> Check<Waveform> {
    value.as_str().and_then(Waveform::from_token).ok_or_else(|| {
        let allowed: Vec<&str> = Waveform::ALL.iter().map(|w| w.as_str()).collect();
        SchemaViolation::new(
            field,
            format!("{value} is not a valid waveform; use one of {}", allowed.join(", ")),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "bpm": 30,
            "chords": {
                "progression": [["C3", "Eb3", "G3"], ["Ab2", "C3", "Eb3"]],
                "interval": "4m",
                "duration": "2m",
                "filter": 600
            },
            "melody": {
                "notes": ["C5", "~", "G5", "Eb5"],
                "interval": "2m",
                "duration": "1m",
                "waveform": "triangle",
                "delay": 0.5
            }
        })
    }

    fn field_of(record: &Value) -> String {
        validate(record).unwrap_err().field
    }

    #[test]
    fn test_valid_record() {
        let pattern = validate(&record()).unwrap();
        assert_eq!(pattern.bpm, 30);
        assert_eq!(pattern.chords.progression.len(), 2);
        assert_eq!(pattern.melody.waveform, Waveform::Triangle);
        assert!(pattern.drums.is_none());
    }

    #[test]
    fn test_bpm_bounds() {
        for bpm in 20..=120 {
            let mut r = record();
            r["bpm"] = json!(bpm);
            assert!(validate(&r).is_ok(), "bpm {bpm}");
        }
        for bpm in [19, 121, -5] {
            let mut r = record();
            r["bpm"] = json!(bpm);
            let err = validate(&r).unwrap_err();
            assert_eq!(err.field, "bpm");
            assert!(err.message.contains("between 20 and 120"));
        }
    }

    #[test]
    fn test_bpm_must_be_integer() {
        let mut r = record();
        r["bpm"] = json!(30.5);
        assert_eq!(field_of(&r), "bpm");
        r["bpm"] = json!("30");
        assert_eq!(field_of(&r), "bpm");
    }

    #[test]
    fn test_missing_top_level_keys_reported_first() {
        let mut r = record();
        r.as_object_mut().unwrap().remove("melody");
        r["bpm"] = json!(500);
        let err = validate(&r).unwrap_err();
        assert_eq!(err.field, "melody");
        assert_eq!(err.message, "Field required");
    }

    #[test]
    fn test_root_must_be_object() {
        assert_eq!(field_of(&json!([1, 2])), "pattern");
    }

    #[test]
    fn test_filter_range() {
        let mut r = record();
        r["chords"]["filter"] = json!(99);
        assert_eq!(field_of(&r), "chords.filter");
        r["chords"]["filter"] = json!(2000);
        assert!(validate(&r).is_ok());
        r["chords"]["filter"] = json!(2001);
        assert_eq!(field_of(&r), "chords.filter");
    }

    #[test]
    fn test_empty_progression_and_empty_chord() {
        let mut r = record();
        r["chords"]["progression"] = json!([]);
        assert_eq!(field_of(&r), "chords.progression");
        r["chords"]["progression"] = json!([["C3"], []]);
        assert_eq!(field_of(&r), "chords.progression[1]");
    }

    #[test]
    fn test_interval_lists_alternatives() {
        let mut r = record();
        r["melody"]["interval"] = json!("16n");
        let err = validate(&r).unwrap_err();
        assert_eq!(err.field, "melody.interval");
        assert!(err.message.contains("1m, 2m, 4m, 8m, 8n"));
    }

    #[test]
    fn test_waveform_lists_alternatives() {
        let mut r = record();
        r["melody"]["waveform"] = json!("noise");
        let err = validate(&r).unwrap_err();
        assert_eq!(err.field, "melody.waveform");
        assert!(err.message.contains("sine, triangle, sawtooth, square"));
    }

    #[test]
    fn test_delay_range() {
        let mut r = record();
        r["melody"]["delay"] = json!(1.5);
        assert_eq!(field_of(&r), "melody.delay");
        r["melody"]["delay"] = json!(0);
        assert!(validate(&r).is_ok());
    }

    #[test]
    fn test_empty_melody() {
        let mut r = record();
        r["melody"]["notes"] = json!([]);
        assert_eq!(field_of(&r), "melody.notes");
    }

    #[test]
    fn test_drums_only_zero_or_one() {
        for bad in [json!([2]), json!([1, 0, 0, 0, 0, 0, 0, -1]), json!([0, 1, 0.5]), json!([true])]
        {
            let mut r = record();
            r["drums"] = json!({ "kick": [1, 0], "snare": bad, "interval": "1m" });
            assert!(field_of(&r).starts_with("drums.snare["));
        }
    }

    #[test]
    fn test_drums_null_means_absent() {
        let mut r = record();
        r["drums"] = Value::Null;
        assert!(validate(&r).unwrap().drums.is_none());
    }

    #[test]
    fn test_drums_lengths_are_independent() {
        let mut r = record();
        r["drums"] = json!({ "kick": [1, 0, 0, 0, 1, 0, 0, 0], "snare": [0, 1], "interval": "4m" });
        let drums = validate(&r).unwrap().drums.unwrap();
        assert_eq!(drums.kick.len(), 8);
        assert_eq!(drums.snare.len(), 2);
    }

    #[test]
    fn test_partial_drums_rejected() {
        let mut r = record();
        r["drums"] = json!({ "kick": [1, 0] });
        assert_eq!(field_of(&r), "drums.snare");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut r = record();
        r["drums"] = json!({ "kick": [1], "snare": [0], "hihat": [1, 1], "interval": "1m" });
        r["swing"] = json!(0.2);
        assert!(validate(&r).is_ok());
    }

    #[test]
    fn test_bad_notes_named_by_position() {
        let mut r = record();
        r["chords"]["progression"][1][2] = json!("H3");
        let err = validate(&r).unwrap_err();
        assert_eq!(err.field, "chords.progression[1][2]");
        assert!(err.message.starts_with("Invalid note in chord: Invalid note name 'H'"));

        let mut r = record();
        r["melody"]["notes"][3] = json!("C9");
        let err = validate(&r).unwrap_err();
        assert_eq!(err.field, "melody.notes[3]");
        assert!(err.message.contains("Invalid octave"));
    }

    #[test]
    fn test_field_checks_run_before_note_checks() {
        let mut r = record();
        r["chords"]["progression"][0][0] = json!("nope");
        r["melody"]["delay"] = json!(3.0);
        assert_eq!(field_of(&r), "melody.delay");
    }
}
