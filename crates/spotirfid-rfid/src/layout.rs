//! Tag memory layout and write policies.

use std::time::Duration;

use spotirfid_core::constants::{
    DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_RETRY_DELAY_MS, FIRST_USER_PAGE, NTAG213_LAST_USER_PAGE,
    PAGE_SIZE, RESERVED_PAGES,
};

use crate::error::{Result, TagError};

/// User memory bounds of a tag family.
///
/// # Examples
///
/// ```
/// use spotirfid_rfid::TagLayout;
///
/// let layout = TagLayout::ntag213();
/// assert_eq!(layout.first_user_page(), 4);
/// assert_eq!(layout.capacity_from(4), 144);
///
/// // Reserved pages can never become user memory
/// assert_eq!(TagLayout::new(1, 39).unwrap().first_user_page(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLayout {
    first_user_page: u8,
    last_user_page: u8,
}

impl TagLayout {
    /// Create a layout. `first_user_page` is raised to the first page after
    /// the reserved area.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::InvalidLayout`] if the range is empty.
    pub fn new(first_user_page: u8, last_user_page: u8) -> Result<Self> {
        let first_user_page = first_user_page.max(RESERVED_PAGES);
        if last_user_page < first_user_page {
            return Err(TagError::InvalidLayout(format!(
                "last user page {last_user_page} is before first user page {first_user_page}"
            )));
        }
        Ok(Self {
            first_user_page,
            last_user_page,
        })
    }

    /// NTAG213: user pages 4..=39.
    pub const fn ntag213() -> Self {
        Self {
            first_user_page: FIRST_USER_PAGE,
            last_user_page: NTAG213_LAST_USER_PAGE,
        }
    }

    pub fn first_user_page(&self) -> u8 {
        self.first_user_page
    }

    pub fn last_user_page(&self) -> u8 {
        self.last_user_page
    }

    /// Clamp a page into the user range.
    pub fn clamp(&self, page: u8) -> u8 {
        page.clamp(self.first_user_page, self.last_user_page)
    }

    /// Pages available from `start` through the last user page.
    pub fn pages_from(&self, start: u8) -> usize {
        if start > self.last_user_page {
            0
        } else {
            (self.last_user_page - start) as usize + 1
        }
    }

    /// Bytes available from `start` through the last user page.
    pub fn capacity_from(&self, start: u8) -> usize {
        self.pages_from(start) * PAGE_SIZE
    }

    /// Iterate the user pages.
    pub fn user_pages(&self) -> impl Iterator<Item = u8> + use<> {
        self.first_user_page..=self.last_user_page
    }
}

impl Default for TagLayout {
    fn default() -> Self {
        Self::ntag213()
    }
}

/// How the first data page of a write is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPagePolicy {
    /// Always start at this page (clamped into user memory).
    Fixed(u8),

    /// Start at the first user page whose content is not all zeros and
    /// which is not lock-protected.
    Discover,
}

impl Default for StartPagePolicy {
    fn default() -> Self {
        Self::Fixed(FIRST_USER_PAGE)
    }
}

/// Retry bounds of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePolicy {
    /// Whole-sequence attempts before giving up
    pub max_attempts: u32,

    /// Pause between attempts
    pub retry_delay: Duration,

    pub start_page: StartPagePolicy,
}

impl WritePolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_start_page(mut self, start_page: StartPagePolicy) -> Self {
        self.start_page = start_page;
        self
    }
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_WRITE_RETRY_DELAY_MS),
            start_page: StartPagePolicy::default(),
        }
    }
}
