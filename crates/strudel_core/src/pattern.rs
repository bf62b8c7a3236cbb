use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const BPM_RANGE: RangeInclusive<i64> = 20..=120;
pub const FILTER_RANGE: RangeInclusive<i64> = 100..=2000;
pub const DELAY_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Timing codes understood by the player (Tone.js notation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInterval {
    #[serde(rename = "1m")]
    OneMeasure,
    #[serde(rename = "2m")]
    TwoMeasures,
    #[serde(rename = "4m")]
    FourMeasures,
    #[serde(rename = "8m")]
    EightMeasures,
    #[serde(rename = "8n")]
    EighthNote,
}

impl TimeInterval {
    pub const ALL: [TimeInterval; 5] = [
        TimeInterval::OneMeasure,
        TimeInterval::TwoMeasures,
        TimeInterval::FourMeasures,
        TimeInterval::EightMeasures,
        TimeInterval::EighthNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInterval::OneMeasure => "1m",
            TimeInterval::TwoMeasures => "2m",
            TimeInterval::FourMeasures => "4m",
            TimeInterval::EightMeasures => "8m",
            TimeInterval::EighthNote => "8n",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::Square,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == token)
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full loop description written to the pattern file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub bpm: u32,
    pub chords: ChordSection,
    pub melody: MelodySection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drums: Option<DrumSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSection {
    /// Each chord is a list of note tokens played together.
    pub progression: Vec<Vec<String>>,
    /// How often the chord changes.
    pub interval: TimeInterval,
    /// How long each chord sustains.
    pub duration: TimeInterval,
    /// Low-pass cutoff in Hz.
    pub filter: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodySection {
    /// Note tokens or [`crate::REST`].
    pub notes: Vec<String>,
    pub interval: TimeInterval,
    pub duration: TimeInterval,
    pub waveform: Waveform,
    /// Echo amount, 0.0 to 1.0.
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumSection {
    /// 1 = hit, 0 = silence.
    pub kick: Vec<u8>,
    pub snare: Vec<u8>,
    /// Loop length.
    pub interval: TimeInterval,
}

impl Pattern {
    /// All note tokens in chord order, then melody order. Rests included.
    pub fn note_tokens(&self) -> impl Iterator<Item = &str> {
        self.chords
            .progression
            .iter()
            .flatten()
            .chain(self.melody.notes.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_tokens() {
        for interval in TimeInterval::ALL {
            assert_eq!(TimeInterval::from_token(interval.as_str()), Some(interval));
        }
        assert_eq!(TimeInterval::from_token("16n"), None);
    }

    #[test]
    fn test_interval_serde_names() {
        let json = serde_json::to_string(&TimeInterval::EighthNote).unwrap();
        assert_eq!(json, "\"8n\"");
        let parsed: TimeInterval = serde_json::from_str("\"4m\"").unwrap();
        assert_eq!(parsed, TimeInterval::FourMeasures);
    }

    #[test]
    fn test_waveform_tokens() {
        assert_eq!(Waveform::from_token("sawtooth"), Some(Waveform::Sawtooth));
        assert_eq!(Waveform::from_token("Sine"), None);
        assert_eq!(Waveform::Square.to_string(), "square");
    }
}
