//! Episode content: research documents, outlines, dialogue and script lines.

mod format;
mod models;

pub use format::{format_conversation_history, generate_markdown_script};
pub use models::{
    Answer, ContextDocument, DialogueTurn, PodcastOutline, PodcastSection, PodcastSubsection,
    Question, Script, ScriptLine, SearchQueries, SearchQuery, Speaker, WikipediaPage,
    WikipediaPages,
};
