//! Writes a [`Pattern`] back out in the file dialect.

use std::fmt::Write;

use chrono::Local;

use crate::pattern::Pattern;

pub const HEADER: &str = "// 🎵 STRUDEL-MCP - Ambient Pattern (Tone.js format)";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d @ %H:%M:%S";

/// Render the full file, stamped with the current local time.
pub fn render(pattern: &Pattern, description: &str) -> String {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    render_at(pattern, description, &timestamp)
}

/// Render the full file with an explicit timestamp.
pub fn render_at(pattern: &Pattern, description: &str, timestamp: &str) -> String {
    // A line break in the description would end the comment early.
    let description = description.replace(['\r', '\n'], " ");

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    let _ = writeln!(out, "// {}", description.trim());
    let _ = writeln!(out, "// TIMESTAMP: {}", timestamp);
    out.push('\n');
    out.push_str(&render_body(pattern));
    out
}

fn quoted_list<T: AsRef<str>>(items: &[T]) -> String {
    let items: Vec<String> = items.iter().map(|s| format!("'{}'", s.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

fn hit_list(hits: &[u8]) -> String {
    let items: Vec<String> = hits.iter().map(u8::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Render only the `({ ... })` literal. Deterministic: equal patterns give
/// equal text.
pub fn render_body(pattern: &Pattern) -> String {
    let chords = &pattern.chords;
    let melody = &pattern.melody;

    let mut lines: Vec<String> = vec![
        "({".into(),
        format!("    bpm: {},", pattern.bpm),
        String::new(),
        "    chords: {".into(),
        "        progression: [".into(),
    ];
    for chord in &chords.progression {
        lines.push(format!("            {},", quoted_list(chord)));
    }
    lines.extend([
        "        ],".into(),
        format!("        interval: '{}',", chords.interval),
        format!("        duration: '{}',", chords.duration),
        format!("        filter: {}", chords.filter),
        "    },".into(),
        String::new(),
        "    melody: {".into(),
        format!("        notes: {},", quoted_list(&melody.notes)),
        format!("        interval: '{}',", melody.interval),
        format!("        duration: '{}',", melody.duration),
        format!("        waveform: '{}',", melody.waveform),
        // `{:?}` keeps the decimal point on whole numbers (0.0, 1.0)
        format!("        delay: {:?}", melody.delay),
    ]);

    match &pattern.drums {
        Some(drums) => lines.extend([
            "    },".into(),
            String::new(),
            "    drums: {".into(),
            format!("        kick: {},", hit_list(&drums.kick)),
            format!("        snare: {},", hit_list(&drums.snare)),
            format!("        interval: '{}'", drums.interval),
            "    }".into(),
        ]),
        None => lines.push("    }".into()),
    }

    lines.push("})".into());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ChordSection, DrumSection, MelodySection, TimeInterval, Waveform};

    fn pattern() -> Pattern {
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
                notes: vec!["C5".into(), "~".into()],
                interval: TimeInterval::TwoMeasures,
                duration: TimeInterval::OneMeasure,
                waveform: Waveform::Triangle,
                delay: 1.0,
            },
            drums: None,
        }
    }

    #[test]
    fn test_render_without_drums() {
        let text = render_at(&pattern(), "Evening drift", "2025-11-24 @ 05:56:30");
        let expected = "// 🎵 STRUDEL-MCP - Ambient Pattern (Tone.js format)
// Evening drift
// TIMESTAMP: 2025-11-24 @ 05:56:30

({
    bpm: 30,

    chords: {
        progression: [
            ['C3', 'Eb3', 'G3'],
            ['Ab2', 'C3', 'Eb3'],
        ],
        interval: '4m',
        duration: '2m',
        filter: 600
    },

    melody: {
        notes: ['C5', '~'],
        interval: '2m',
        duration: '1m',
        waveform: 'triangle',
        delay: 1.0
    }
})
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_with_drums() {
        let mut p = pattern();
        p.drums = Some(DrumSection {
            kick: vec![1, 0, 0, 0],
            snare: vec![0, 0, 1, 0],
            interval: TimeInterval::OneMeasure,
        });
        let body = render_body(&p);
        assert!(body.contains(
            "        delay: 1.0\n    },\n\n    drums: {\n        kick: [1, 0, 0, 0],\n        snare: [0, 0, 1, 0],\n        interval: '1m'\n    }\n})\n"
        ));
    }

    #[test]
    fn test_description_is_kept_on_one_line() {
        let text = render_at(&pattern(), "line one\nline two", "now");
        assert!(text.contains("// line one line two\n// TIMESTAMP: now\n"));
    }

    #[test]
    fn test_render_stamps_current_time() {
        let text = render(&pattern(), "stamp");
        let line = text.lines().nth(2).unwrap();
        assert!(line.starts_with("// TIMESTAMP: "));
        assert!(line.contains(" @ "));
    }
}
