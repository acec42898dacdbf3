//! Hardware device trait definitions.
//!
//! These traits are the contract between the bridge and its physical
//! collaborators: the contactless tag reader and the status indicator.
//! Everything above this layer is written against the traits, so mock and
//! real devices are interchangeable.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::future::Future;

use crate::error::Result;
use crate::types::{PageData, ReaderInfo, TagHandle};

/// Page-addressed contactless tag reader.
///
/// The reader exposes the tag family's memory as fixed-size pages. It does
/// not interpret page contents; payload encoding, retry and verification
/// live in the layers above.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`, which is an opaque type that cannot be used in trait objects
/// (Edition 2024 RPITIT). Use generic type parameters instead:
///
/// ```no_run
/// use spotirfid_hardware::traits::TagReader;
/// use spotirfid_hardware::error::Result;
///
/// async fn first_user_page<R: TagReader>(reader: &mut R) -> Result<Option<[u8; 4]>> {
///     let Some(tag) = reader.detect_tag().await? else {
///         return Ok(None);
///     };
///     Ok(Some(reader.read_page(&tag, 4).await?))
/// }
/// ```
pub trait TagReader: Send + Sync {
    /// Poll the field for a tag.
    ///
    /// Returns immediately with `None` when no tag is present. Repeated
    /// calls while the same tag stays in the field return handles with the
    /// same session number.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader cannot be reached.
    async fn detect_tag(&mut self) -> Result<Option<TagHandle>>;

    /// Read one page.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tag has left the field
    /// - The page index is beyond the tag's memory
    /// - The transceiver reports a failure
    async fn read_page(&mut self, tag: &TagHandle, page: u8) -> Result<PageData>;

    /// Write one page.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tag has left the field
    /// - The tag rejects the write (for example a locked page)
    /// - The transceiver reports a failure
    async fn write_page(&mut self, tag: &TagHandle, page: u8, data: &PageData) -> Result<()>;

    /// Get reader information.
    ///
    /// # Errors
    ///
    /// Returns an error if a communication error occurs while querying
    /// reader information.
    async fn reader_info(&self) -> Result<ReaderInfo>;

    /// Release the reader session.
    ///
    /// Called exactly once on every exit path of the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource fails to close cleanly.
    async fn close(&mut self) -> Result<()>;
}

/// Binary status indicator (a single LED).
///
/// Purely observational: no bridge decision depends on its state.
///
/// The methods spell out `Send` futures rather than using `async fn` so an
/// indicator can be driven from a spawned pulser task.
pub trait Indicator: Send + 'static {
    /// Switch the indicator on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the output line cannot be driven.
    fn set(&mut self, on: bool) -> impl Future<Output = Result<()>> + Send;

    /// Release the output line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line fails to close cleanly.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
