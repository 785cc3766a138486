//! Text renderings of episode content.

use super::{DialogueTurn, PodcastOutline, ScriptLine};

/// Render a discussion as `Speaker: text` lines, for prompts.
pub fn format_conversation_history(turns: &[DialogueTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}\n", turn.speaker(), turn.text()))
        .collect()
}

/// Render the outline and final script as a Markdown document.
pub fn generate_markdown_script(topic: &str, outline: &PodcastOutline, script: &[ScriptLine]) -> String {
    let mut markdown = format!("# {}\n\n", topic);

    markdown.push_str("## Outline\n\n");
    for (i, section) in outline.sections.iter().enumerate() {
        markdown.push_str(&format!("### Section {}: {}\n", i + 1, section.title));
        for subsection in &section.subsections {
            markdown.push_str(&format!("- {}\n", subsection.render()));
        }
        markdown.push('\n');
    }

    markdown.push_str("## Script\n\n");
    for line in script {
        markdown.push_str(&format!("**{}**: {}\n\n", line.speaker, line.text));
    }

    markdown
}
