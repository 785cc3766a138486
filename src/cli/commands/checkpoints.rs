//! Checkpoints command implementation.

use crate::checkpoint::{run_key, Checkpointer};
use crate::cli::{CheckpointAction, Output};
use crate::config::Settings;
use anyhow::Result;

fn checkpointer(settings: &Settings, topic: &str, qa_rounds: u32) -> Checkpointer {
    Checkpointer::new(settings.checkpoint_dir(), run_key(topic, qa_rounds), true)
}

/// Run the checkpoints command.
pub fn run_checkpoints(action: &CheckpointAction, settings: &Settings) -> Result<()> {
    match action {
        CheckpointAction::List { topic, qa_rounds } => {
            let checkpointer = checkpointer(settings, topic, *qa_rounds);
            let files = checkpointer.list()?;

            if files.is_empty() {
                Output::info(&format!(
                    "No checkpoints for run key '{}' in {}",
                    checkpointer.run_key(),
                    checkpointer.dir().display()
                ));
                return Ok(());
            }

            Output::header(&format!("Checkpoints for {} ({})", checkpointer.run_key(), files.len()));
            println!();
            for file in &files {
                Output::file_entry(file);
            }
        }

        CheckpointAction::Clear { topic, qa_rounds } => {
            let checkpointer = checkpointer(settings, topic, *qa_rounds);
            let removed = checkpointer.clear()?;

            if removed == 0 {
                Output::info(&format!("No checkpoints for run key '{}'", checkpointer.run_key()));
            } else {
                Output::success(&format!(
                    "Removed {} checkpoint(s) for '{}'",
                    removed,
                    checkpointer.run_key()
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_removes_only_the_topic() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.checkpoint.dir = dir.path().to_string_lossy().to_string();

        std::fs::write(dir.path().join("ocean_tides_qa_2_outline.json"), "{}").unwrap();
        std::fs::write(dir.path().join("ocean_tides_qa_3_outline.json"), "{}").unwrap();

        let action = CheckpointAction::Clear {
            topic: "Ocean Tides".to_string(),
            qa_rounds: 2,
        };
        run_checkpoints(&action, &settings).unwrap();

        assert!(!dir.path().join("ocean_tides_qa_2_outline.json").exists());
        assert!(dir.path().join("ocean_tides_qa_3_outline.json").exists());
    }

    #[test]
    fn test_list_with_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.checkpoint.dir = dir.path().join("absent").to_string_lossy().to_string();

        let action = CheckpointAction::List {
            topic: "Tides".to_string(),
            qa_rounds: 2,
        };
        assert!(run_checkpoints(&action, &settings).is_ok());
    }
}
