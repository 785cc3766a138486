//! Script preparation before synthesis.

use crate::script::ScriptLine;

/// Sequences stripped from every line before synthesis.
///
/// The mojibake form of the em dash is listed first so it is removed whole.
const STRIP: &[&str] = &["\u{e2}\u{20ac}\u{201d}", "*", "_", "\u{2014}"];

/// Remove markup and dash characters that TTS engines read aloud or choke on.
///
/// Speakers and line order are preserved; whitespace is left untouched.
pub fn clean_text_for_tts(lines: &[ScriptLine]) -> Vec<ScriptLine> {
    lines
        .iter()
        .map(|line| {
            let text = STRIP
                .iter()
                .fold(line.text.clone(), |text, pattern| text.replace(pattern, ""));
            ScriptLine::new(line.speaker, text)
        })
        .collect()
}

/// Merge runs of lines by the same speaker into one line each.
///
/// Texts are joined with a single space.
pub fn combine_consecutive_speaker_lines(lines: &[ScriptLine]) -> Vec<ScriptLine> {
    let mut combined: Vec<ScriptLine> = Vec::with_capacity(lines.len());

    for line in lines {
        match combined.last_mut() {
            Some(last) if last.speaker == line.speaker => {
                last.text.push(' ');
                last.text.push_str(&line.text);
            }
            _ => combined.push(line.clone()),
        }
    }

    combined
}
