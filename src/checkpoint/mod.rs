//! Stage checkpointing for resumable generation runs.
//!
//! Each completed pipeline stage is written to
//! `<checkpoint_dir>/<run_key>_<stage>.json` inside a versioned envelope. When
//! the file already exists the stage is skipped and the stored result is
//! returned, so a run that failed halfway resumes from the last completed
//! stage instead of paying for every API call again.
//!
//! Only successful results are persisted. Unreadable or incompatible files are
//! reported as errors rather than silently recomputed; delete the file to
//! re-run that stage.

mod naming;

pub use naming::{run_key, to_snake_case};

use crate::error::{PodgenError, Result};
use crate::script::{ContextDocument, DialogueTurn, PodcastOutline, ScriptLine};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version of the on-disk envelope layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Checkpointed pipeline stage names.
pub mod stage {
    pub const BACKGROUND_INFO: &str = "background_info";
    pub const OUTLINE: &str = "outline";
    pub const DEEP_INFO: &str = "deep_info";
    pub const DRAFT_SCRIPT: &str = "draft_script";
    pub const FINAL_SCRIPT: &str = "final_script";

    /// Every stage, in pipeline order.
    pub const ALL: [&str; 5] = [BACKGROUND_INFO, OUTLINE, DEEP_INFO, DRAFT_SCRIPT, FINAL_SCRIPT];
}

/// A stage result that can be checkpointed.
///
/// `KIND` is stored in the envelope and checked on load, so a file written
/// for one result type is never decoded as another.
pub trait StageOutput: Serialize + DeserializeOwned + Send {
    const KIND: &'static str;
}

impl StageOutput for Vec<ContextDocument> {
    const KIND: &'static str = "documents";
}

impl StageOutput for PodcastOutline {
    const KIND: &'static str = "outline";
}

impl StageOutput for Vec<DialogueTurn> {
    const KIND: &'static str = "dialogue";
}

impl StageOutput for Vec<ScriptLine> {
    const KIND: &'static str = "script";
}

/// On-disk checkpoint layout.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub schema_version: u32,
    pub kind: String,
    pub stage: String,
    pub run_key: String,
    pub created_at: DateTime<Utc>,
    pub payload: P,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    schema_version: u32,
    kind: String,
}

/// Persists and restores stage results for one run key.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
    run_key: String,
    enabled: bool,
}

impl Checkpointer {
    pub fn new(dir: impl Into<PathBuf>, run_key: impl Into<String>, enabled: bool) -> Self {
        let run_key = run_key.into();
        info!("Initializing checkpointer with key: {}", run_key);
        Self {
            dir: dir.into(),
            run_key,
            enabled,
        }
    }

    pub fn run_key(&self) -> &str {
        &self.run_key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkpoint file for `stage`.
    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", self.run_key, stage))
    }

    /// Return the stored result for `stage`, or run `stage_fn` and store its result.
    ///
    /// When checkpointing is disabled `stage_fn` always runs and nothing is read
    /// or written. A failing `stage_fn` leaves no file behind.
    pub async fn checkpoint<T, F, Fut>(&self, stage: &str, stage_fn: F) -> Result<T>
    where
        T: StageOutput,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.enabled {
            return stage_fn().await;
        }

        let path = self.path_for(stage);

        if path.exists() {
            info!("Loading checkpoint from {}", path.display());
            return self.load(&path);
        }

        let result = stage_fn().await?;

        info!("Saving checkpoint to {}", path.display());
        self.save(stage, &path, &result)?;

        Ok(result)
    }

    /// Decode a checkpoint file.
    pub fn load<T: StageOutput>(&self, path: &Path) -> Result<T> {
        load_envelope::<T>(path).map(|envelope| envelope.payload)
    }

    fn save<T: StageOutput>(&self, stage: &str, path: &Path, result: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            kind: T::KIND.to_string(),
            stage: stage.to_string(),
            run_key: self.run_key.clone(),
            created_at: Utc::now(),
            payload: result,
        };

        // Write beside the target and rename, so a crash never leaves a
        // truncated file that looks like a completed stage.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, &envelope)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| PodgenError::Io(e.error))?;

        debug!("Wrote {} checkpoint for stage {}", T::KIND, stage);
        Ok(())
    }

    /// Existing pipeline-stage checkpoint files for this run key, in stage
    /// order.
    ///
    /// Files are matched by exact name, so `ocean_qa_2` never picks up the
    /// files of `ocean_qa_2_tides_qa_2`.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        Ok(stage::ALL
            .iter()
            .map(|stage| self.path_for(stage))
            .filter(|path| path.is_file())
            .collect())
    }

    /// Delete every pipeline-stage checkpoint for this run key. Returns the
    /// number removed.
    pub fn clear(&self) -> Result<usize> {
        let files = self.list()?;
        for file in &files {
            std::fs::remove_file(file)?;
        }
        Ok(files.len())
    }
}

/// Read and validate an envelope of payload type `T`.
pub fn load_envelope<T: StageOutput>(path: &Path) -> Result<Envelope<T>> {
    let content = std::fs::read_to_string(path)?;

    let header: EnvelopeHeader =
        serde_json::from_str(&content).map_err(|e| PodgenError::CheckpointCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if header.schema_version != SCHEMA_VERSION {
        return Err(PodgenError::CheckpointFormat {
            path: path.to_path_buf(),
            reason: format!(
                "schema version {} (expected {})",
                header.schema_version, SCHEMA_VERSION
            ),
        });
    }

    if header.kind != T::KIND {
        return Err(PodgenError::CheckpointFormat {
            path: path.to_path_buf(),
            reason: format!("holds {} (expected {})", header.kind, T::KIND),
        });
    }

    serde_json::from_str(&content).map_err(|e| PodgenError::CheckpointCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
