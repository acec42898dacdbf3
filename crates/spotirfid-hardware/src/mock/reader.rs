//! Mock tag reader implementation for testing and development.
//!
//! This module provides a simulated reader with an in-memory field that can
//! be controlled programmatically for testing without requiring physical
//! hardware. Simulated tags keep their memory between presentations, so a
//! tag written in one test step reads back in the next.

use std::collections::HashMap;
use std::sync::Arc;

use spotirfid_core::TagUid;
use spotirfid_core::constants::{FIRST_USER_PAGE, LOCK_PAGE, NTAG213_LAST_USER_PAGE, PAGE_SIZE};
use tokio::sync::Mutex;

use crate::{
    HardwareError, Result,
    traits::TagReader,
    types::{LockState, PageData, ReaderInfo, TagHandle, ZERO_PAGE},
};

/// Total page count of a simulated NTAG213 (user memory plus the trailing
/// configuration pages).
const NTAG213_TOTAL_PAGES: usize = 45;

/// Capability container of an NTAG213 with an NDEF area of 144 bytes.
const NTAG213_CC: PageData = [0xE1, 0x10, 0x12, 0x00];

/// A simulated tag: a UID and its page memory.
///
/// # Examples
///
/// ```
/// use spotirfid_core::TagUid;
/// use spotirfid_hardware::mock::SimulatedTag;
///
/// let uid: TagUid = "04A1B2C3".parse().unwrap();
/// let tag = SimulatedTag::ntag213(uid).with_text("MASTER_TAG");
/// assert_eq!(tag.page(4), Some(*b"MAST"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedTag {
    uid: TagUid,
    pages: Vec<PageData>,
}

impl SimulatedTag {
    /// A blank NTAG213 with the given UID.
    pub fn ntag213(uid: TagUid) -> Self {
        let mut pages = vec![ZERO_PAGE; NTAG213_TOTAL_PAGES];

        let uid_bytes = uid.as_bytes();
        for (i, byte) in uid_bytes.iter().take(2 * PAGE_SIZE).enumerate() {
            pages[i / PAGE_SIZE][i % PAGE_SIZE] = *byte;
        }
        pages[3] = NTAG213_CC;

        Self { uid, pages }
    }

    /// Store `text` at the first user page, zero padded to a page boundary.
    pub fn with_text(mut self, text: &str) -> Self {
        for (i, chunk) in text.as_bytes().chunks(PAGE_SIZE).enumerate() {
            let mut page = ZERO_PAGE;
            page[..chunk.len()].copy_from_slice(chunk);
            let index = FIRST_USER_PAGE as usize + i;
            if index < self.pages.len() {
                self.pages[index] = page;
            }
        }
        self
    }

    /// Overwrite one page.
    pub fn with_page(mut self, page: u8, data: PageData) -> Self {
        if let Some(slot) = self.pages.get_mut(page as usize) {
            *slot = data;
        }
        self
    }

    /// Set the static lock bit of `page`.
    pub fn with_locked_page(mut self, page: u8) -> Self {
        let lock_page = LOCK_PAGE as usize;
        let state = LockState::from_lock_page(&self.pages[lock_page]).with_locked(page);
        let [b0, b1] = state.bytes();
        self.pages[lock_page][2] = b0;
        self.pages[lock_page][3] = b1;
        self
    }

    pub fn uid(&self) -> &TagUid {
        &self.uid
    }

    /// Contents of one page, if it exists.
    pub fn page(&self, page: u8) -> Option<PageData> {
        self.pages.get(page as usize).copied()
    }

    /// Number of pages in the tag.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Last page usable for user data.
    pub fn last_user_page(&self) -> u8 {
        NTAG213_LAST_USER_PAGE
    }

    fn lock_state(&self) -> LockState {
        LockState::from_lock_page(&self.pages[LOCK_PAGE as usize])
    }
}

/// One page write observed by the mock reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub uid: TagUid,
    pub page: u8,
    pub data: PageData,
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct FieldState {
    /// Tag database (UID -> tag)
    tags: HashMap<TagUid, SimulatedTag>,

    /// Tag currently in the field and its session number
    present: Option<(TagUid, u64)>,

    next_session: u64,
    fail_next_writes: u32,
    writes_before_failure: Option<u32>,
    corrupt_next_user_reads: u32,

    /// Pages whose writes are acknowledged but never stored
    lost_pages: Vec<u8>,
    write_log: Vec<WriteRecord>,
    detect_count: usize,
    closed: bool,
}

impl FieldState {
    fn check_handle(&self, tag: &TagHandle) -> Result<&TagUid> {
        match &self.present {
            Some((uid, session)) if uid == tag.uid() && *session == tag.session() => Ok(uid),
            _ => Err(HardwareError::tag_lost(tag.uid().to_string())),
        }
    }
}

/// Mock tag reader for testing and development.
///
/// # Examples
///
/// ```
/// use spotirfid_hardware::mock::{MockTagReader, SimulatedTag};
/// use spotirfid_hardware::traits::TagReader;
///
/// #[tokio::main]
/// async fn main() -> spotirfid_hardware::Result<()> {
///     let (mut reader, handle) = MockTagReader::new();
///     let uid = "04A1B2C3".parse().unwrap();
///
///     handle.add_tag(SimulatedTag::ntag213(uid).with_text("hi")).await;
///     assert!(reader.detect_tag().await?.is_none());
///
///     handle.present(&"04A1B2C3".parse().unwrap()).await?;
///     let tag = reader.detect_tag().await?.unwrap();
///     assert_eq!(&reader.read_page(&tag, 4).await?, b"hi\0\0");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTagReader {
    state: Arc<Mutex<FieldState>>,

    /// Device name
    name: String,
}

impl MockTagReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockTagReader, MockTagReaderHandle) where the
    /// handle controls the simulated field.
    pub fn new() -> (Self, MockTagReaderHandle) {
        Self::with_name("Mock Tag Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockTagReaderHandle) {
        let state = Arc::new(Mutex::new(FieldState::default()));

        let reader = Self {
            state: state.clone(),
            name,
        };

        (reader, MockTagReaderHandle { state })
    }
}

impl TagReader for MockTagReader {
    async fn detect_tag(&mut self) -> Result<Option<TagHandle>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        state.detect_count += 1;

        Ok(state
            .present
            .as_ref()
            .map(|(uid, session)| TagHandle::new(uid.clone(), *session)))
    }

    async fn read_page(&mut self, tag: &TagHandle, page: u8) -> Result<PageData> {
        let mut state = self.state.lock().await;
        let uid = state.check_handle(tag)?.clone();

        let mut data = state
            .tags
            .get(&uid)
            .and_then(|t| t.page(page))
            .ok_or(HardwareError::PageOutOfRange { page })?;

        if page >= FIRST_USER_PAGE && state.corrupt_next_user_reads > 0 {
            state.corrupt_next_user_reads -= 1;
            data[0] ^= 0xFF;
        }

        Ok(data)
    }

    async fn write_page(&mut self, tag: &TagHandle, page: u8, data: &PageData) -> Result<()> {
        let mut state = self.state.lock().await;
        let uid = state.check_handle(tag)?.clone();

        let Some(simulated) = state.tags.get(&uid) else {
            return Err(HardwareError::tag_lost(uid.to_string()));
        };
        if page as usize >= simulated.page_count() {
            return Err(HardwareError::PageOutOfRange { page });
        }
        let locked = simulated.lock_state().is_locked(page) || page < LOCK_PAGE;

        let rejection = if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            Some("injected failure")
        } else if state.writes_before_failure == Some(0) {
            Some("injected failure")
        } else if locked {
            Some("page locked")
        } else {
            None
        };
        if rejection.is_none()
            && let Some(remaining) = state.writes_before_failure.as_mut()
        {
            *remaining -= 1;
        }

        state.write_log.push(WriteRecord {
            uid: uid.clone(),
            page,
            data: *data,
            accepted: rejection.is_none(),
        });

        if let Some(reason) = rejection {
            return Err(HardwareError::write_rejected(page, reason));
        }

        if state.lost_pages.contains(&page) {
            return Ok(());
        }
        if let Some(simulated) = state.tags.get_mut(&uid) {
            simulated.pages[page as usize] = *data;
        }
        Ok(())
    }

    async fn reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone(), vec!["ISO14443A".to_string()])
            .with_max_baud_rate(106_000))
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.present = None;
        Ok(())
    }
}

/// Handle for controlling a mock tag reader.
///
/// Clones share the same simulated field.
#[derive(Debug, Clone)]
pub struct MockTagReaderHandle {
    state: Arc<Mutex<FieldState>>,
}

impl MockTagReaderHandle {
    /// Add (or replace) a tag in the reader's database.
    pub async fn add_tag(&self, tag: SimulatedTag) {
        let mut state = self.state.lock().await;
        state.tags.insert(tag.uid().clone(), tag);
    }

    /// Bring a known tag into the field.
    ///
    /// Every presentation starts a new session, invalidating handles from
    /// earlier presentations.
    ///
    /// # Errors
    ///
    /// Returns an error if the UID is not in the database.
    pub async fn present(&self, uid: &TagUid) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.tags.contains_key(uid) {
            return Err(HardwareError::unknown_tag(uid.to_string()));
        }

        state.next_session += 1;
        let session = state.next_session;
        state.present = Some((uid.clone(), session));
        Ok(())
    }

    /// Bring a tag into the field, registering a blank NTAG213 if unknown.
    pub async fn tap(&self, uid: &TagUid) {
        let mut state = self.state.lock().await;
        state
            .tags
            .entry(uid.clone())
            .or_insert_with(|| SimulatedTag::ntag213(uid.clone()));

        state.next_session += 1;
        let session = state.next_session;
        state.present = Some((uid.clone(), session));
    }

    /// Remove the current tag from the field.
    pub async fn lift(&self) {
        self.state.lock().await.present = None;
    }

    /// UID of the tag currently in the field.
    pub async fn present_uid(&self) -> Option<TagUid> {
        self.state
            .lock()
            .await
            .present
            .as_ref()
            .map(|(uid, _)| uid.clone())
    }

    /// Snapshot of a tag in the database.
    pub async fn tag(&self, uid: &TagUid) -> Option<SimulatedTag> {
        self.state.lock().await.tags.get(uid).cloned()
    }

    /// Reject the next `count` page writes.
    pub async fn fail_next_writes(&self, count: u32) {
        self.state.lock().await.fail_next_writes = count;
    }

    /// Accept the next `count` writes, then reject every write after them.
    pub async fn fail_writes_after(&self, count: u32) {
        self.state.lock().await.writes_before_failure = Some(count);
    }

    /// Stop rejecting writes.
    pub async fn clear_write_failures(&self) {
        let mut state = self.state.lock().await;
        state.fail_next_writes = 0;
        state.writes_before_failure = None;
    }

    /// Corrupt the next `count` reads of user pages.
    pub async fn corrupt_next_user_reads(&self, count: u32) {
        self.state.lock().await.corrupt_next_user_reads = count;
    }

    /// Acknowledge writes to `page` without storing them.
    pub async fn lose_writes_to(&self, page: u8) {
        self.state.lock().await.lost_pages.push(page);
    }

    /// Every page write seen so far, accepted or not.
    pub async fn write_log(&self) -> Vec<WriteRecord> {
        self.state.lock().await.write_log.clone()
    }

    /// Number of presence polls seen so far.
    pub async fn detect_count(&self) -> usize {
        self.state.lock().await.detect_count
    }

    /// Returns `true` once the reader has been closed.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(hex: &str) -> TagUid {
        hex.parse().unwrap()
    }

    #[tokio::test]
    async fn test_empty_field_detects_nothing() {
        let (mut reader, _handle) = MockTagReader::new();
        assert!(reader.detect_tag().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_present_and_read() {
        let (mut reader, handle) = MockTagReader::new();
        handle
            .add_tag(SimulatedTag::ntag213(uid("04A1B2C3")).with_text("spotify"))
            .await;
        handle.present(&uid("04A1B2C3")).await.unwrap();

        let tag = reader.detect_tag().await.unwrap().unwrap();
        assert_eq!(tag.uid(), &uid("04A1B2C3"));
        assert_eq!(&reader.read_page(&tag, 4).await.unwrap(), b"spot");
        assert_eq!(&reader.read_page(&tag, 5).await.unwrap(), b"ify\0");
        assert_eq!(reader.read_page(&tag, 3).await.unwrap(), NTAG213_CC);
    }

    #[tokio::test]
    async fn test_unknown_tag_cannot_be_presented() {
        let (_reader, handle) = MockTagReader::new();
        assert!(handle.present(&uid("FFFFFFFF")).await.is_err());
    }

    #[tokio::test]
    async fn test_same_presentation_keeps_session() {
        let (mut reader, handle) = MockTagReader::new();
        handle.tap(&uid("01020304")).await;

        let first = reader.detect_tag().await.unwrap().unwrap();
        let second = reader.detect_tag().await.unwrap().unwrap();
        assert_eq!(first.session(), second.session());

        handle.lift().await;
        handle.tap(&uid("01020304")).await;
        let third = reader.detect_tag().await.unwrap().unwrap();
        assert_ne!(first.session(), third.session());
    }

    #[tokio::test]
    async fn test_stale_handle_reports_tag_lost() {
        let (mut reader, handle) = MockTagReader::new();
        handle.tap(&uid("01020304")).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();

        handle.lift().await;
        let err = reader.read_page(&tag, 4).await.unwrap_err();
        assert!(matches!(err, HardwareError::TagLost { .. }));

        handle.tap(&uid("01020304")).await;
        let err = reader.write_page(&tag, 4, &ZERO_PAGE).await.unwrap_err();
        assert!(matches!(err, HardwareError::TagLost { .. }));
    }

    #[tokio::test]
    async fn test_write_persists_across_presentations() {
        let (mut reader, handle) = MockTagReader::new();
        handle.tap(&uid("01020304")).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();
        reader.write_page(&tag, 4, b"abcd").await.unwrap();

        handle.lift().await;
        handle.tap(&uid("01020304")).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();
        assert_eq!(&reader.read_page(&tag, 4).await.unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_injected_write_failures_are_logged() {
        let (mut reader, handle) = MockTagReader::new();
        handle.tap(&uid("01020304")).await;
        handle.fail_next_writes(1).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();

        let err = reader.write_page(&tag, 4, b"abcd").await.unwrap_err();
        assert!(matches!(err, HardwareError::WriteRejected { page: 4, .. }));
        reader.write_page(&tag, 4, b"abcd").await.unwrap();

        let log = handle.write_log().await;
        assert_eq!(log.len(), 2);
        assert!(!log[0].accepted);
        assert!(log[1].accepted);
    }

    #[tokio::test]
    async fn test_locked_page_rejects_writes() {
        let (mut reader, handle) = MockTagReader::new();
        handle
            .add_tag(SimulatedTag::ntag213(uid("01020304")).with_locked_page(6))
            .await;
        handle.present(&uid("01020304")).await.unwrap();
        let tag = reader.detect_tag().await.unwrap().unwrap();

        let lock_page = reader.read_page(&tag, LOCK_PAGE).await.unwrap();
        assert!(LockState::from_lock_page(&lock_page).is_locked(6));

        assert!(reader.write_page(&tag, 5, b"abcd").await.is_ok());
        let err = reader.write_page(&tag, 6, b"abcd").await.unwrap_err();
        assert!(matches!(err, HardwareError::WriteRejected { page: 6, .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_page() {
        let (mut reader, handle) = MockTagReader::new();
        handle.tap(&uid("01020304")).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();

        let err = reader.read_page(&tag, 200).await.unwrap_err();
        assert!(matches!(err, HardwareError::PageOutOfRange { page: 200 }));
    }

    #[tokio::test]
    async fn test_corrupted_reads_affect_user_pages_only() {
        let (mut reader, handle) = MockTagReader::new();
        handle
            .add_tag(SimulatedTag::ntag213(uid("01020304")).with_text("abcd"))
            .await;
        handle.present(&uid("01020304")).await.unwrap();
        handle.corrupt_next_user_reads(1).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();

        assert_eq!(reader.read_page(&tag, 3).await.unwrap(), NTAG213_CC);
        assert_ne!(&reader.read_page(&tag, 4).await.unwrap(), b"abcd");
        assert_eq!(&reader.read_page(&tag, 4).await.unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_lost_write_is_acknowledged_but_not_stored() {
        let (mut reader, handle) = MockTagReader::new();
        handle
            .add_tag(SimulatedTag::ntag213(uid("01020304")).with_text("abcdefgh"))
            .await;
        handle.present(&uid("01020304")).await.unwrap();
        handle.lose_writes_to(5).await;
        let tag = reader.detect_tag().await.unwrap().unwrap();

        reader.write_page(&tag, 4, &ZERO_PAGE).await.unwrap();
        reader.write_page(&tag, 5, &ZERO_PAGE).await.unwrap();

        assert_eq!(reader.read_page(&tag, 4).await.unwrap(), ZERO_PAGE);
        assert_eq!(&reader.read_page(&tag, 5).await.unwrap(), b"efgh");
        assert!(handle.write_log().await.iter().all(|w| w.accepted));
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let (mut reader, handle) = MockTagReader::new();
        reader.close().await.unwrap();
        assert!(handle.is_closed().await);

        let err = reader.detect_tag().await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_reader_info() {
        let (reader, _handle) = MockTagReader::with_name("Test Reader".to_string());
        let info = reader.reader_info().await.unwrap();
        assert_eq!(info.name, "Test Reader");
        assert!(info.protocols.contains(&"ISO14443A".to_string()));
    }
}
