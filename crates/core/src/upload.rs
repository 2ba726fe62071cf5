//! Upload lifecycle: status state machine, processing steps, multipart
//! planning.
//!
//! ```text
//! pending ──► processing ──► completed
//!                  │
//!                  └──────► failed ──(reprocess)──► processing
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Uploads larger than this use multipart (100 MiB).
pub const MULTIPART_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Size of each multipart part (10 MiB).
pub const MULTIPART_PART_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Upper bound on parts imposed by object storage.
pub const MAX_MULTIPART_PARTS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown upload status '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How a status change was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    /// Ordinary progress reported by the pipeline.
    Progress,
    /// Explicit reprocess request from the owner.
    Reprocess,
}

/// Validate a status change.
///
/// `failed -> processing` is only allowed through [`TransitionTrigger::Reprocess`],
/// and reprocess is only allowed from `failed`.
pub fn validate_transition(
    current: UploadStatus,
    next: UploadStatus,
    trigger: TransitionTrigger,
) -> Result<(), CoreError> {
    use UploadStatus::*;

    let allowed = match trigger {
        TransitionTrigger::Progress => matches!(
            (current, next),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed)
        ),
        TransitionTrigger::Reprocess => matches!((current, next), (Failed, Processing)),
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot move upload from '{}' to '{}' (current status: {})",
            current.name(),
            next.name(),
            current.name()
        )))
    }
}

// ---------------------------------------------------------------------------
// Processing steps
// ---------------------------------------------------------------------------

/// Pipeline steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStep {
    ExtractMetadata,
    ExtractCover,
    CreateTrack,
    Index,
    MoveFile,
}

impl ProcessingStep {
    pub const ALL: [ProcessingStep; 5] = [
        Self::ExtractMetadata,
        Self::ExtractCover,
        Self::CreateTrack,
        Self::Index,
        Self::MoveFile,
    ];

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "extract_metadata" => Ok(Self::ExtractMetadata),
            "extract_cover" => Ok(Self::ExtractCover),
            "create_track" => Ok(Self::CreateTrack),
            "index" => Ok(Self::Index),
            "move_file" => Ok(Self::MoveFile),
            other => Err(CoreError::Validation(format!(
                "Unknown processing step '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ExtractMetadata => "extract_metadata",
            Self::ExtractCover => "extract_cover",
            Self::CreateTrack => "create_track",
            Self::Index => "index",
            Self::MoveFile => "move_file",
        }
    }
}

/// Completion flags for each processing step, used to resume after partial
/// failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSteps {
    pub metadata_extracted: bool,
    pub cover_art_extracted: bool,
    pub track_created: bool,
    pub indexed: bool,
    pub file_moved: bool,
}

impl UploadSteps {
    fn flag_mut(&mut self, step: ProcessingStep) -> &mut bool {
        match step {
            ProcessingStep::ExtractMetadata => &mut self.metadata_extracted,
            ProcessingStep::ExtractCover => &mut self.cover_art_extracted,
            ProcessingStep::CreateTrack => &mut self.track_created,
            ProcessingStep::Index => &mut self.indexed,
            ProcessingStep::MoveFile => &mut self.file_moved,
        }
    }

    pub fn is_done(&self, step: ProcessingStep) -> bool {
        match step {
            ProcessingStep::ExtractMetadata => self.metadata_extracted,
            ProcessingStep::ExtractCover => self.cover_art_extracted,
            ProcessingStep::CreateTrack => self.track_created,
            ProcessingStep::Index => self.indexed,
            ProcessingStep::MoveFile => self.file_moved,
        }
    }

    pub fn mark(&mut self, step: ProcessingStep) {
        *self.flag_mut(step) = true;
    }

    /// Clear `from` and every later step so they run again.
    pub fn reset_from(&mut self, from: ProcessingStep) {
        for step in ProcessingStep::ALL.into_iter().filter(|s| *s >= from) {
            *self.flag_mut(step) = false;
        }
    }

    /// First step not yet completed, if any.
    pub fn next_pending(&self) -> Option<ProcessingStep> {
        ProcessingStep::ALL.into_iter().find(|s| !self.is_done(*s))
    }
}

// ---------------------------------------------------------------------------
// Multipart planning
// ---------------------------------------------------------------------------

pub fn requires_multipart(file_size: u64) -> bool {
    file_size > MULTIPART_THRESHOLD_BYTES
}

/// Number of parts needed for `file_size` at `part_size`.
pub fn part_count(file_size: u64, part_size: u64) -> Result<u32, CoreError> {
    if part_size == 0 {
        return Err(CoreError::Validation("Part size must be positive".into()));
    }
    let parts = file_size.div_ceil(part_size).max(1);
    if parts > MAX_MULTIPART_PARTS {
        return Err(CoreError::Validation(format!(
            "File needs {parts} parts; at most {MAX_MULTIPART_PARTS} are allowed"
        )));
    }
    u32::try_from(parts).map_err(|_| CoreError::Internal("part count overflow".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
