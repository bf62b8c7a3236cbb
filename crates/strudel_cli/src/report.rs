//! Text reports for the terminal.
//!
//! Every function returns the report as a `String` so the layout can be
//! tested; `main` decides where it goes.

use std::fmt::Write;

use colored::Colorize;
use strudel_core::{Error, MoodSuggestions, Pattern, PatternAnalysis, REST};

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title.bold().cyan());
}

fn item(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<12} {}", format!("{}:", label).dimmed(), value);
}

fn hits(row: &[u8]) -> String {
    row.iter()
        .map(|&h| if h == 1 { "x" } else { "." })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The current pattern, optionally with analysis and the last-edited stamp.
pub fn pattern_report(
    pattern: &Pattern,
    analysis: Option<&PatternAnalysis>,
    last_edited: Option<&str>,
) -> String {
    let mut out = String::new();

    heading(&mut out, "Tempo");
    match analysis {
        Some(a) => item(
            &mut out,
            "BPM",
            format!("{} ({})", pattern.bpm.to_string().yellow(), a.tempo_description.italic()),
        ),
        None => item(&mut out, "BPM", pattern.bpm.to_string().yellow()),
    }
    out.push('\n');

    let chords = &pattern.chords;
    heading(&mut out, "Chords");
    let progression: Vec<String> = chords.progression.iter().map(|c| c.join(", ")).collect();
    item(&mut out, "Progression", progression.join(" → ").green());
    item(&mut out, "Interval", format!("{} (chord change)", chords.interval));
    item(&mut out, "Duration", format!("{} (note sustain)", chords.duration));
    item(&mut out, "Filter", format!("{} Hz", chords.filter));
    out.push('\n');

    let melody = &pattern.melody;
    heading(&mut out, "Melody");
    let notes: Vec<String> = melody
        .notes
        .iter()
        .map(|n| {
            if n == REST {
                "[rest]".dimmed().to_string()
            } else {
                n.green().to_string()
            }
        })
        .collect();
    item(&mut out, "Notes", notes.join(", "));
    item(&mut out, "Waveform", melody.waveform);
    item(&mut out, "Interval", melody.interval);
    item(&mut out, "Delay", format!("{:?}", melody.delay));
    if let Some(a) = analysis {
        item(
            &mut out,
            "Density",
            format!("{}% notes", (a.melody_density * 100.0).round() as u32),
        );
    }

    if let Some(drums) = &pattern.drums {
        out.push('\n');
        heading(&mut out, "Drums");
        item(&mut out, "Kick", hits(&drums.kick));
        item(&mut out, "Snare", hits(&drums.snare));
        item(&mut out, "Interval", drums.interval);
        if let Some(d) = analysis.and_then(|a| a.drums.as_ref()) {
            item(
                &mut out,
                "Hits",
                format!("kick {}, snare {}", d.kick_hits, d.snare_hits),
            );
        }
    }

    if let Some(a) = analysis {
        out.push('\n');
        heading(&mut out, "Pattern Info");
        item(&mut out, "Unique notes", a.note_count);
        item(&mut out, "Notes used", a.notes_used.join(", "));
    }

    if let Some(stamp) = last_edited {
        out.push('\n');
        let _ = writeln!(out, "{}", format!("Last edited: {}", stamp).dimmed());
    }

    out
}

/// Analysis only.
pub fn info_report(analysis: &PatternAnalysis) -> String {
    let mut out = String::new();
    heading(&mut out, "Pattern Info");
    item(&mut out, "BPM", format!("{} ({})", analysis.bpm, analysis.tempo_description));
    item(&mut out, "Chords", analysis.chord_count);
    item(
        &mut out,
        "Melody",
        format!(
            "{} steps, {}% notes",
            analysis.melody_steps,
            (analysis.melody_density * 100.0).round() as u32
        ),
    );
    item(
        &mut out,
        "Filter",
        format!(
            "{} Hz ({})",
            analysis.filter_cutoff,
            analysis.filter_character.label()
        ),
    );
    item(&mut out, "Waveform", analysis.waveform);
    item(&mut out, "Delay", format!("{:?}", analysis.delay));
    if let Some(d) = &analysis.drums {
        item(
            &mut out,
            "Drums",
            format!(
                "kick {}/{} steps, snare {}/{} steps",
                d.kick_hits, d.kick_steps, d.snare_hits, d.snare_steps
            ),
        );
    }
    item(&mut out, "Notes used", analysis.notes_used.join(", "));
    out
}

pub fn suggestions_report(suggestions: &MoodSuggestions) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("Suggestions for '{}' mood", suggestions.mood));
    item(&mut out, "BPM", suggestions.current_bpm);
    item(&mut out, "Filter", format!("{} Hz", suggestions.current_filter));
    out.push('\n');
    for (i, change) in suggestions.changes.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, change);
    }
    out
}

pub fn validation_report(name: &str, result: &Result<Pattern, Error>) -> String {
    match result {
        Ok(pattern) => format!(
            "{} {} is a valid pattern ({} bpm, {} chords, {} melody steps)\n",
            "✓".green(),
            name,
            pattern.bpm,
            pattern.chords.progression.len(),
            pattern.melody.notes.len()
        ),
        Err(err) => format!(
            "{} {} is not valid [{}]\n  {}\n",
            "✗".red(),
            name,
            err.kind(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strudel_core::{DrumSection, analyze, parse, validate};

    const TEXT: &str = "({bpm: 30, chords:{progression:[['C3','Eb3','G3'],['Ab2','C3','Eb3']],interval:'4m',duration:'2m',filter:600}, melody:{notes:['C5','~'],interval:'2m',duration:'1m',waveform:'triangle',delay:0.5}})";

    fn pattern() -> Pattern {
        validate(&parse(TEXT).unwrap()).unwrap()
    }

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_pattern_report_sections() {
        plain();
        let p = pattern();
        let a = analyze(&p);
        let text = pattern_report(&p, Some(&a), Some("2025-11-24 @ 05:56:30"));

        assert!(text.contains("Very Slow - Meditative"));
        assert!(text.contains("C3, Eb3, G3 → Ab2, C3, Eb3"));
        assert!(text.contains("C5, [rest]"));
        assert!(text.contains("50% notes"));
        assert!(text.contains("Ab2, C3, Eb3, G3, C5"));
        assert!(text.ends_with("Last edited: 2025-11-24 @ 05:56:30\n"));
        assert!(!text.contains("Drums"));
    }

    #[test]
    fn test_pattern_report_without_metadata() {
        plain();
        let mut p = pattern();
        p.drums = Some(DrumSection {
            kick: vec![1, 0, 1, 0],
            snare: vec![0, 1, 0, 1],
            interval: strudel_core::TimeInterval::OneMeasure,
        });
        let text = pattern_report(&p, None, None);
        assert!(text.contains("x . x ."));
        assert!(!text.contains("Pattern Info"));
        assert!(!text.contains("Last edited"));
    }

    #[test]
    fn test_info_report() {
        plain();
        let text = info_report(&analyze(&pattern()));
        assert!(text.contains("600 Hz (Warm and mellow)"));
        assert!(text.contains("2 steps, 50% notes"));
    }

    #[test]
    fn test_suggestions_report_numbers_changes() {
        plain();
        let s = strudel_core::suggest(&pattern(), strudel_core::Mood::Minimal);
        let text = suggestions_report(&s);
        assert!(text.starts_with("Suggestions for 'minimal' mood"));
        assert!(text.contains("  1. Lower BPM to 20 for extreme minimalism"));
        assert!(text.contains("  7. "));
    }

    #[test]
    fn test_validation_report() {
        plain();
        let ok = validation_report("candidate.js", &Ok(pattern()));
        assert!(ok.contains("candidate.js is a valid pattern (30 bpm, 2 chords, 2 melody steps)"));

        let bad = parse("({bpm: 5})").map_err(Error::from).and_then(|r| Ok(validate(&r)?));
        let text = validation_report("candidate.js", &bad);
        assert!(text.contains("is not valid [schema violation]"));
    }
}
