//! Advisory tuning suggestions for a target mood.
//!
//! Nothing here mutates a pattern; the output is text for a human (or an
//! agent) to act on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pattern::{BPM_RANGE, FILTER_RANGE, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Darker,
    Brighter,
    Spacious,
    Dense,
    Minimal,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Darker,
        Mood::Brighter,
        Mood::Spacious,
        Mood::Dense,
        Mood::Minimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Darker => "darker",
            Mood::Brighter => "brighter",
            Mood::Spacious => "spacious",
            Mood::Dense => "dense",
            Mood::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                let names: Vec<&str> = Mood::ALL.iter().map(Mood::as_str).collect();
                format!("Unknown mood '{}'. Expected one of: {}", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodSuggestions {
    pub mood: Mood,
    pub current_bpm: u32,
    pub current_filter: u32,
    pub changes: Vec<String>,
}

fn shift_bpm(bpm: u32, delta: i64) -> i64 {
    (i64::from(bpm) + delta).clamp(*BPM_RANGE.start(), *BPM_RANGE.end())
}

fn shift_filter(hz: u32, delta: i64) -> i64 {
    (i64::from(hz) + delta).clamp(*FILTER_RANGE.start(), *FILTER_RANGE.end())
}

/// Suggested edits that move `pattern` toward `mood`, most impactful first.
pub fn suggest(pattern: &Pattern, mood: Mood) -> MoodSuggestions {
    let bpm = pattern.bpm;
    let filter = pattern.chords.filter;

    let changes: Vec<String> = match mood {
        Mood::Darker => vec![
            format!(
                "Lower BPM from {} to {} for a heavier feel",
                bpm,
                shift_bpm(bpm, -10)
            ),
            format!(
                "Reduce filter cutoff from {} to {} Hz for warmer, darker tones",
                filter,
                shift_filter(filter, -200)
            ),
            "Consider lowering chord notes by an octave (e.g., C3 → C2)".into(),
            "Use 'sawtooth' waveform for grittier, darker melody".into(),
            "Add more '~' rests in melody for sparse, contemplative feel".into(),
        ],
        Mood::Brighter => vec![
            format!(
                "Raise filter cutoff from {} to {} Hz for brighter, airier tones",
                filter,
                shift_filter(filter, 300)
            ),
            "Consider raising chord notes by an octave (e.g., C3 → C4)".into(),
            "Use 'triangle' or 'sine' waveform for softer, brighter melody".into(),
            "Increase delay amount for more shimmer (try 0.7-0.8)".into(),
            "Use major chords and higher notes".into(),
        ],
        Mood::Spacious => vec![
            format!(
                "Lower BPM from {} to {} for more space between events",
                bpm,
                shift_bpm(bpm, -10)
            ),
            "Increase chord interval to '8m' (8 measures) for slower evolution".into(),
            "Increase melody interval to '4m' for more silence".into(),
            "Add many more '~' rests in melody (aim for 70-80% silence)".into(),
            "Reduce or remove drums entirely for pure ambient texture".into(),
            "Increase delay to 0.6-0.8 for longer trails".into(),
        ],
        Mood::Dense => vec![
            format!(
                "Increase BPM from {} to {} for more activity",
                bpm,
                shift_bpm(bpm, 15)
            ),
            "Reduce melody interval to '1m' or '8n' for faster note changes".into(),
            "Remove most '~' rests from melody - fill with notes".into(),
            "Add more drum hits to kick and snare patterns".into(),
            "Shorten chord interval to '2m' for faster harmonic movement".into(),
            "Reduce delay to 0.2-0.3 to avoid muddy mix".into(),
        ],
        Mood::Minimal => vec![
            format!("Lower BPM to {} for extreme minimalism", shift_bpm(bpm, -15)),
            "Use only 2-3 notes total in melody".into(),
            "Use 80-90% '~' rests in melody".into(),
            "Increase all intervals to maximum ('8m')".into(),
            "Remove drums entirely".into(),
            "Use simple, sparse chord progression (2 chords maximum)".into(),
            "Lower filter to 400-500 Hz for subdued sound".into(),
        ],
    };

    MoodSuggestions {
        mood,
        current_bpm: bpm,
        current_filter: filter,
        changes,
    }
}
