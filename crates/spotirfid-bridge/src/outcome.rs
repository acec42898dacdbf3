//! Per-event results of the control loop.

use std::fmt;

use spotirfid_core::{ResourceId, TagUid, TargetId};

/// Result of one scan event or write-mode timeout.
///
/// The [`Display`](fmt::Display) form is the status line shown to the
/// operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Playback started.
    Played {
        uid: TagUid,
        resource: ResourceId,
        target: TargetId,
        attempts: u32,
    },

    /// Playback could not be started.
    PlaybackFailed {
        uid: TagUid,
        resource: ResourceId,
        details: String,
        attempts: u32,
    },

    /// Master tag scanned with something playing.
    WriteModeEntered { resource: ResourceId, name: String },

    /// Master tag scanned with nothing to capture.
    CannotEnterWriteMode {
        reason: String,
        /// Resource still waiting when the bridge was already pending
        still_pending: Option<ResourceId>,
    },

    TagWritten {
        uid: TagUid,
        resource: ResourceId,
        start_page: u8,
        attempt: u32,
    },

    /// Write-mode recorded a mapping instead of writing tag memory.
    TagMapped {
        uid: TagUid,
        resource: ResourceId,
        previous: Option<ResourceId>,
    },

    WriteFailed {
        uid: TagUid,
        resource: ResourceId,
        reason: String,
    },

    /// No tag was presented before the write-mode deadline.
    WriteModeExpired { resource: ResourceId },

    UnknownTag {
        uid: TagUid,
        /// Text found on the tag, if any
        payload: Option<String>,
    },
}

impl Outcome {
    /// Returns `true` for outcomes the indicator acknowledges with a flash.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Played { .. } | Self::TagWritten { .. } | Self::TagMapped { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Played {
                uid,
                resource,
                target,
                attempts,
            } => {
                write!(f, "tag {uid}: playing {resource} on {target}")?;
                if *attempts > 1 {
                    write!(f, " (after {attempts} attempts)")?;
                }
                Ok(())
            }
            Self::PlaybackFailed {
                uid,
                resource,
                details,
                ..
            } => write!(f, "tag {uid}: failed to play {resource}: {details}"),
            Self::WriteModeEntered { resource, name } => {
                write!(f, "write mode: present a tag to record {name} ({resource})")
            }
            Self::CannotEnterWriteMode {
                reason,
                still_pending,
            } => {
                write!(f, "cannot enter write mode: {reason}")?;
                if let Some(resource) = still_pending {
                    write!(f, " (still waiting to record {resource})")?;
                }
                Ok(())
            }
            Self::TagWritten {
                uid,
                resource,
                start_page,
                ..
            } => write!(f, "tag {uid}: wrote {resource} from page {start_page}"),
            Self::TagMapped {
                uid,
                resource,
                previous,
            } => {
                write!(f, "tag {uid}: mapped to {resource}")?;
                if let Some(previous) = previous {
                    write!(f, " (was {previous})")?;
                }
                Ok(())
            }
            Self::WriteFailed {
                uid,
                resource,
                reason,
            } => write!(f, "tag {uid}: could not record {resource}: {reason}"),
            Self::WriteModeExpired { resource } => {
                write!(f, "write mode timed out, {resource} not recorded")
            }
            Self::UnknownTag { uid, payload } => match payload {
                Some(text) => write!(f, "unknown tag {uid}: {text:?}"),
                None => write!(f, "unknown tag {uid}"),
            },
        }
    }
}
