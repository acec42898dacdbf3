//! Page-level read, write and verify over a tag's user memory.
//!
//! A write is a whole sequence: inspect locks, choose the start page, write
//! every page, read everything back and compare. Any failure abandons the
//! sequence and the next attempt starts over from a fresh presence poll,
//! because the tag may have been lifted in between.

use std::fmt;

use spotirfid_core::TagUid;
use spotirfid_core::constants::LOCK_PAGE;
use spotirfid_hardware::{HardwareError, LockState, PageData, TagHandle, TagReader, ZERO_PAGE};
use tracing::{debug, info, warn};

use crate::error::{Result, TagError};
use crate::layout::{StartPagePolicy, TagLayout, WritePolicy};
use crate::payload::{decode_payload, encode_payload, needs_terminator};

/// Result of a verified write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub uid: TagUid,
    pub start_page: u8,

    /// Pages written, including a terminator page if one was needed
    pub pages_written: usize,

    /// Attempt that succeeded (1-based)
    pub attempt: u32,
}

/// One page of a memory dump.
#[derive(Debug)]
pub struct PageDump {
    pub page: u8,
    pub data: std::result::Result<PageData, HardwareError>,
}

/// Contents of a tag's memory from page 0 through the last user page.
#[derive(Debug)]
pub struct TagDump {
    pub uid: TagUid,
    pub pages: Vec<PageDump>,
}

impl TagDump {
    /// Lock state, if the lock page was readable.
    pub fn lock_state(&self) -> Option<LockState> {
        self.pages
            .iter()
            .find(|p| p.page == LOCK_PAGE)
            .and_then(|p| p.data.as_ref().ok())
            .map(LockState::from_lock_page)
    }
}

impl fmt::Display for TagDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tag UID: {}", self.uid)?;
        let locks = self.lock_state().unwrap_or_default();

        for entry in &self.pages {
            match &entry.data {
                Ok(data) => {
                    write!(
                        f,
                        "Page {:02}: {:02X} {:02X} {:02X} {:02X}  |",
                        entry.page, data[0], data[1], data[2], data[3]
                    )?;
                    for byte in data {
                        let c = if byte.is_ascii_graphic() || *byte == b' ' {
                            *byte as char
                        } else {
                            '.'
                        };
                        write!(f, "{c}")?;
                    }
                    write!(f, "|")?;
                    match entry.page {
                        2 => write!(f, " lock bytes {:02X} {:02X}", data[2], data[3])?,
                        3 => write!(f, " capability container")?,
                        page if locks.is_locked(page) => write!(f, " locked")?,
                        _ => {}
                    }
                    writeln!(f)?;
                }
                Err(e) => writeln!(f, "Page {:02}: read failed ({e})", entry.page)?,
            }
        }
        Ok(())
    }
}

/// Reads and writes payloads in tag user memory.
///
/// The accessor holds no reader; every operation borrows one, so the
/// control loop keeps sole ownership of the reader session.
///
/// # Examples
///
/// ```
/// use spotirfid_hardware::mock::MockTagReader;
/// use spotirfid_hardware::TagReader;
/// use spotirfid_rfid::TagMemoryAccessor;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (mut reader, handle) = MockTagReader::new();
///     handle.tap(&"04A1B2C3".parse()?).await;
///
///     let accessor = TagMemoryAccessor::default();
///     let tag = reader.detect_tag().await?.ok_or("no tag")?;
///     accessor.write(&mut reader, &tag, "spotify:album:6jbtHi5R0jMXoliU2OS0lo").await?;
///
///     let text = accessor.read_payload(&mut reader, &tag).await?;
///     assert_eq!(text.as_deref(), Some("spotify:album:6jbtHi5R0jMXoliU2OS0lo"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagMemoryAccessor {
    layout: TagLayout,
    policy: WritePolicy,
}

impl TagMemoryAccessor {
    pub fn new(layout: TagLayout, policy: WritePolicy) -> Self {
        Self { layout, policy }
    }

    pub fn layout(&self) -> &TagLayout {
        &self.layout
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    /// Write `text` to the tag identified by `tag`, retrying the whole
    /// sequence up to the policy's attempt bound.
    ///
    /// Every attempt polls the field again. A missing tag or a tag with a
    /// different UID counts as a failed attempt.
    ///
    /// # Errors
    ///
    /// - [`TagError::InvalidPayload`], [`TagError::PayloadTooLarge`] and
    ///   [`TagError::NoWritablePageFound`] immediately, since no retry can
    ///   change them
    /// - [`TagError::Hardware`] immediately if the reader disconnects
    /// - [`TagError::AllRetriesExhausted`] once every attempt failed
    pub async fn write<R: TagReader>(
        &self,
        reader: &mut R,
        tag: &TagHandle,
        text: &str,
    ) -> Result<WriteReceipt> {
        let pages = encode_payload(text)?;
        let expected_uid = tag.uid();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }

            let result = match reader.detect_tag().await {
                Ok(Some(current)) if current.uid() == expected_uid => {
                    self.write_once(reader, &current, text, &pages).await
                }
                Ok(Some(current)) => Err(TagError::TagChanged {
                    expected: expected_uid.to_string(),
                    found: current.uid().to_string(),
                }),
                Ok(None) => Err(TagError::NoTagPresent),
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(mut receipt) => {
                    receipt.attempt = attempt;
                    info!(
                        "Wrote {} pages to tag {} from page {} (attempt {attempt}/{max_attempts})",
                        receipt.pages_written, receipt.uid, receipt.start_page
                    );
                    return Ok(receipt);
                }
                Err(e) if !e.is_retryable() => {
                    warn!("Write to tag {expected_uid} failed: {e}");
                    return Err(e);
                }
                Err(e) => {
                    warn!("Write attempt {attempt}/{max_attempts} failed: {e}");
                    last = Some(e);
                }
            }
        }

        Err(TagError::AllRetriesExhausted {
            attempts: max_attempts,
            last: Box::new(last.unwrap_or(TagError::NoTagPresent)),
        })
    }

    /// One complete write sequence without retry.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the sequence.
    pub async fn write_once<R: TagReader>(
        &self,
        reader: &mut R,
        tag: &TagHandle,
        text: &str,
        pages: &[PageData],
    ) -> Result<WriteReceipt> {
        let locks = self.inspect_locks(reader, tag).await?;
        let start_page = match self.policy.start_page {
            StartPagePolicy::Fixed(page) => self.layout.clamp(page),
            StartPagePolicy::Discover => self
                .discover_start(reader, tag, &locks)
                .await?
                .ok_or(TagError::NoWritablePageFound)?,
        };

        let available = self.layout.pages_from(start_page);
        if pages.len() > available {
            return Err(TagError::PayloadTooLarge {
                bytes: text.len(),
                available: self.layout.capacity_from(start_page),
                start_page,
            });
        }

        let mut sequence = pages.to_vec();
        if needs_terminator(pages) && pages.len() < available {
            sequence.push(ZERO_PAGE);
        }

        let locked: Vec<u8> = (0..sequence.len())
            .map(|i| start_page + i as u8)
            .filter(|page| locks.is_locked(*page))
            .collect();
        if !locked.is_empty() {
            warn!("Target pages {locked:?} on tag {} are locked; writing anyway", tag.uid());
        }

        for (i, data) in sequence.iter().enumerate() {
            let page = start_page + i as u8;
            reader
                .write_page(tag, page, data)
                .await
                .map_err(|source| TagError::WriteFailed { page, source })?;
        }
        debug!("Wrote pages {start_page}..{}", start_page as usize + sequence.len());

        // The terminator is checked too: a stale page there would extend the
        // payload on the next read.
        let mut readback = Vec::with_capacity(sequence.len());
        for i in 0..sequence.len() {
            readback.push(reader.read_page(tag, start_page + i as u8).await?);
        }
        if readback != sequence {
            return Err(TagError::VerificationMismatch {
                expected: text.to_string(),
                actual: String::from_utf8_lossy(readback.as_flattened()).into_owned(),
            });
        }

        Ok(WriteReceipt {
            uid: tag.uid().clone(),
            start_page,
            pages_written: sequence.len(),
            attempt: 1,
        })
    }

    /// Read the payload from the page a write under the current policy
    /// would have started at.
    ///
    /// Reading stops at the first page holding a zero byte or at the last
    /// user page. Returns `None` for a tag with no payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a page read fails.
    pub async fn read_payload<R: TagReader>(
        &self,
        reader: &mut R,
        tag: &TagHandle,
    ) -> Result<Option<String>> {
        let start_page = match self.policy.start_page {
            StartPagePolicy::Fixed(page) => self.layout.clamp(page),
            StartPagePolicy::Discover => {
                let locks = self.inspect_locks(reader, tag).await?;
                match self.discover_start(reader, tag, &locks).await? {
                    Some(page) => page,
                    None => return Ok(None),
                }
            }
        };

        let mut pages = Vec::new();
        for page in start_page..=self.layout.last_user_page() {
            let data = reader.read_page(tag, page).await?;
            pages.push(data);
            if data.contains(&0) {
                break;
            }
        }

        let text = decode_payload(&pages);
        debug!(
            "Read {} pages from tag {} at page {start_page}: {text:?}",
            pages.len(),
            tag.uid()
        );
        Ok((!text.is_empty()).then_some(text))
    }

    /// Read the static lock bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock page cannot be read.
    pub async fn inspect_locks<R: TagReader>(
        &self,
        reader: &mut R,
        tag: &TagHandle,
    ) -> Result<LockState> {
        let page = reader.read_page(tag, LOCK_PAGE).await?;
        Ok(LockState::from_lock_page(&page))
    }

    /// Read every page from 0 through the last user page.
    ///
    /// Individual page failures are recorded, not propagated.
    pub async fn dump<R: TagReader>(&self, reader: &mut R, tag: &TagHandle) -> TagDump {
        let mut pages = Vec::with_capacity(self.layout.last_user_page() as usize + 1);
        for page in 0..=self.layout.last_user_page() {
            let data = reader.read_page(tag, page).await;
            if let Err(e) = &data {
                debug!("Page {page} unreadable: {e}");
            }
            pages.push(PageDump { page, data });
        }

        TagDump {
            uid: tag.uid().clone(),
            pages,
        }
    }

    /// Zero every unlocked user page. Returns the number of pages cleared.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::WriteFailed`] on the first rejected write.
    pub async fn wipe<R: TagReader>(&self, reader: &mut R, tag: &TagHandle) -> Result<usize> {
        let locks = self.inspect_locks(reader, tag).await?;
        let mut cleared = 0;

        for page in self.layout.user_pages() {
            if locks.is_locked(page) {
                debug!("Skipping locked page {page}");
                continue;
            }
            reader
                .write_page(tag, page, &ZERO_PAGE)
                .await
                .map_err(|source| TagError::WriteFailed { page, source })?;
            cleared += 1;
        }

        info!("Wiped {cleared} pages on tag {}", tag.uid());
        Ok(cleared)
    }

    /// First unlocked user page whose content is not all zeros.
    ///
    /// A payload never begins with a zero byte, so after a write this is
    /// the page the payload starts at.
    async fn discover_start<R: TagReader>(
        &self,
        reader: &mut R,
        tag: &TagHandle,
        locks: &LockState,
    ) -> Result<Option<u8>> {
        for page in self.layout.user_pages() {
            if locks.is_locked(page) {
                continue;
            }
            if reader.read_page(tag, page).await? != ZERO_PAGE {
                debug!("Discovered start page {page}");
                return Ok(Some(page));
            }
        }
        Ok(None)
    }
}
