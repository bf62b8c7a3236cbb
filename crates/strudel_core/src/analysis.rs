//! Descriptive statistics derived from a pattern.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::note::{is_rest, sort_key};
use crate::pattern::{Pattern, Waveform};

/// Qualitative tempo band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoFeel {
    ExtremelyMeditative,
    Meditative,
    Ambient,
    Relaxed,
    Steady,
    Energetic,
}

impl TempoFeel {
    pub fn from_bpm(bpm: u32) -> Self {
        match bpm {
            0..30 => TempoFeel::ExtremelyMeditative,
            30..40 => TempoFeel::Meditative,
            40..60 => TempoFeel::Ambient,
            60..80 => TempoFeel::Relaxed,
            80..100 => TempoFeel::Steady,
            _ => TempoFeel::Energetic,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TempoFeel::ExtremelyMeditative => "Very Slow - Extremely Meditative",
            TempoFeel::Meditative => "Very Slow - Meditative",
            TempoFeel::Ambient => "Slow - Ambient",
            TempoFeel::Relaxed => "Moderate - Relaxed",
            TempoFeel::Steady => "Moderate - Steady",
            TempoFeel::Energetic => "Faster - Energetic",
        }
    }
}

/// How the low-pass cutoff colors the chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterCharacter {
    WarmAndDark,
    WarmAndMellow,
    Balanced,
    BrightAndOpen,
    BrightAndAiry,
}

impl FilterCharacter {
    pub fn from_cutoff(hz: u32) -> Self {
        match hz {
            0..500 => FilterCharacter::WarmAndDark,
            500..800 => FilterCharacter::WarmAndMellow,
            800..1200 => FilterCharacter::Balanced,
            1200..1600 => FilterCharacter::BrightAndOpen,
            _ => FilterCharacter::BrightAndAiry,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterCharacter::WarmAndDark => "Very warm and dark",
            FilterCharacter::WarmAndMellow => "Warm and mellow",
            FilterCharacter::Balanced => "Balanced",
            FilterCharacter::BrightAndOpen => "Bright and open",
            FilterCharacter::BrightAndAiry => "Very bright and airy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrumAnalysis {
    pub kick_hits: usize,
    pub snare_hits: usize,
    pub kick_steps: usize,
    pub snare_steps: usize,
    pub kick_density: f64,
    pub snare_density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub bpm: u32,
    pub tempo: TempoFeel,
    pub tempo_description: &'static str,
    /// Distinct non-rest notes, ordered by octave then name.
    pub notes_used: Vec<String>,
    pub note_count: usize,
    pub chord_count: usize,
    pub melody_steps: usize,
    /// Share of melody steps that sound, rounded to two decimals.
    pub melody_density: f64,
    pub filter_cutoff: u32,
    pub filter_character: FilterCharacter,
    pub waveform: Waveform,
    pub delay: f64,
    pub drums: Option<DrumAnalysis>,
}

fn density(hits: usize, steps: usize) -> f64 {
    if steps == 0 {
        0.0
    } else {
        hits as f64 / steps as f64
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn analyze(pattern: &Pattern) -> PatternAnalysis {
    let distinct: BTreeSet<&str> = pattern.note_tokens().filter(|n| !is_rest(n)).collect();
    let mut notes_used: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    notes_used.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let melody = &pattern.melody;
    let sounding = melody.notes.iter().filter(|n| !is_rest(n)).count();

    let drums = pattern.drums.as_ref().map(|drums| {
        let kick_hits = drums.kick.iter().filter(|&&h| h == 1).count();
        let snare_hits = drums.snare.iter().filter(|&&h| h == 1).count();
        DrumAnalysis {
            kick_hits,
            snare_hits,
            kick_steps: drums.kick.len(),
            snare_steps: drums.snare.len(),
            kick_density: density(kick_hits, drums.kick.len()),
            snare_density: density(snare_hits, drums.snare.len()),
        }
    });

    let tempo = TempoFeel::from_bpm(pattern.bpm);
    let filter_cutoff = pattern.chords.filter;

    PatternAnalysis {
        bpm: pattern.bpm,
        tempo,
        tempo_description: tempo.label(),
        note_count: notes_used.len(),
        notes_used,
        chord_count: pattern.chords.progression.len(),
        melody_steps: melody.notes.len(),
        melody_density: round2(density(sounding, melody.notes.len())),
        filter_cutoff,
        filter_character: FilterCharacter::from_cutoff(filter_cutoff),
        waveform: melody.waveform,
        delay: melody.delay,
        drums,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ChordSection, DrumSection, MelodySection, TimeInterval};

    fn pattern(notes: &[&str]) -> Pattern {
        Pattern {
            bpm: 30,
            chords: ChordSection {
                progression: vec![
                    vec!["C3".into(), "Eb3".into(), "G3".into()],
                    vec!["Ab2".into(), "C3".into(), "Eb3".into()],
                ],
                interval: TimeInterval::FourMeasures,
                duration: TimeInterval::TwoMeasures,
                filter: 600,
            },
            melody: MelodySection {
                notes: notes.iter().map(|n| n.to_string()).collect(),
                interval: TimeInterval::TwoMeasures,
                duration: TimeInterval::OneMeasure,
                waveform: Waveform::Sine,
                delay: 0.4,
            },
            drums: None,
        }
    }

    #[test]
    fn test_notes_used_sorted_and_distinct() {
        let a = analyze(&pattern(&["G5", "~", "C3", "Eb5"]));
        assert_eq!(a.notes_used, vec!["Ab2", "C3", "Eb3", "G3", "Eb5", "G5"]);
        assert_eq!(a.note_count, 6);
        assert_eq!(a.chord_count, 2);
    }

    #[test]
    fn test_melody_density() {
        assert_eq!(analyze(&pattern(&["C5", "~"])).melody_density, 0.5);
        assert_eq!(analyze(&pattern(&["~", "~", "~"])).melody_density, 0.0);
        assert_eq!(analyze(&pattern(&["C5", "~", "~"])).melody_density, 0.33);
        assert_eq!(analyze(&pattern(&[])).melody_density, 0.0);
    }

    #[test]
    fn test_tempo_bands() {
        let cases = [
            (20, TempoFeel::ExtremelyMeditative),
            (29, TempoFeel::ExtremelyMeditative),
            (30, TempoFeel::Meditative),
            (39, TempoFeel::Meditative),
            (40, TempoFeel::Ambient),
            (59, TempoFeel::Ambient),
            (60, TempoFeel::Relaxed),
            (80, TempoFeel::Steady),
            (99, TempoFeel::Steady),
            (100, TempoFeel::Energetic),
            (120, TempoFeel::Energetic),
        ];
        for (bpm, feel) in cases {
            assert_eq!(TempoFeel::from_bpm(bpm), feel, "bpm {bpm}");
        }
        assert_eq!(TempoFeel::Ambient.label(), "Slow - Ambient");
    }

    #[test]
    fn test_filter_character() {
        assert_eq!(FilterCharacter::from_cutoff(450), FilterCharacter::WarmAndDark);
        assert_eq!(FilterCharacter::from_cutoff(600), FilterCharacter::WarmAndMellow);
        assert_eq!(FilterCharacter::from_cutoff(1200), FilterCharacter::BrightAndOpen);
        assert_eq!(FilterCharacter::from_cutoff(2000), FilterCharacter::BrightAndAiry);
    }

    #[test]
    fn test_drum_counts_per_channel() {
        let mut p = pattern(&["C5"]);
        p.drums = Some(DrumSection {
            kick: vec![1, 0, 0, 0, 1, 0, 0, 0],
            snare: vec![0, 1],
            interval: TimeInterval::OneMeasure,
        });
        let drums = analyze(&p).drums.unwrap();
        assert_eq!(drums.kick_hits, 2);
        assert_eq!(drums.snare_hits, 1);
        assert_eq!(drums.kick_density, 0.25);
        assert_eq!(drums.snare_density, 0.5);
    }

    #[test]
    fn test_no_drums() {
        assert!(analyze(&pattern(&["C5"])).drums.is_none());
    }
}
