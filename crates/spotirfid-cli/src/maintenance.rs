//! One-shot tag maintenance: write the master marker, dump, wipe.

use std::time::Duration;

use anyhow::{Context, Result};
use spotirfid_core::MasterMarker;
use spotirfid_hardware::{TagHandle, TagReader};
use spotirfid_rfid::TagMemoryAccessor;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A maintenance operation on a single tag.
#[derive(Debug, Clone)]
pub enum Task {
    WriteMaster(MasterMarker),
    Dump,
    Wipe,
}

impl Task {
    /// Run the task against `tag` and describe the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag operation fails.
    pub async fn execute<R: TagReader>(
        &self,
        accessor: &TagMemoryAccessor,
        reader: &mut R,
        tag: &TagHandle,
    ) -> Result<String> {
        match self {
            Self::WriteMaster(marker) => {
                let receipt = accessor
                    .write(reader, tag, marker.as_str())
                    .await
                    .with_context(|| format!("writing master marker to {}", tag.uid()))?;
                Ok(format!(
                    "master marker written to tag {} from page {}",
                    receipt.uid, receipt.start_page
                ))
            }
            Self::Dump => Ok(accessor.dump(reader, tag).await.to_string()),
            Self::Wipe => {
                let cleared = accessor
                    .wipe(reader, tag)
                    .await
                    .with_context(|| format!("wiping tag {}", tag.uid()))?;
                Ok(format!("cleared {cleared} pages on tag {}", tag.uid()))
            }
        }
    }
}

/// Poll until a tag enters the field.
///
/// Returns `None` if `wait` elapses or `shutdown` fires first.
///
/// # Errors
///
/// Returns an error if the reader fails.
pub async fn wait_for_tag<R: TagReader>(
    reader: &mut R,
    shutdown: &CancellationToken,
    poll_interval: Duration,
    wait: Duration,
) -> Result<Option<TagHandle>> {
    let deadline = Instant::now() + wait;

    loop {
        if let Some(tag) = reader.detect_tag().await? {
            return Ok(Some(tag));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }

        tokio::select! {
            _ = shutdown.cancelled() => return Ok(None),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
