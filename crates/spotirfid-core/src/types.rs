use crate::{
    Result,
    constants::{MAX_UID_LENGTH, MIN_UID_LENGTH, RESOURCE_SCHEME},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Unique identifier of a physical tag (4-10 bytes).
///
/// Rendered as upper-case hex without separators, which is also the key
/// format of the persisted tag map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagUid(Vec<u8>);

impl TagUid {
    /// Create a tag UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagUid` if the length is not between
    /// `MIN_UID_LENGTH` and `MAX_UID_LENGTH` bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let len = bytes.len();
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidTagUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }
        Ok(TagUid(bytes))
    }

    /// Raw UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Upper-case hex representation (`04A1B2C3`).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for TagUid {
    type Err = Error;

    /// Parse a hex UID. `:`, `-` and whitespace separators are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-') && !c.is_whitespace())
            .collect();

        if digits.is_empty() || digits.len() % 2 != 0 || !digits.is_ascii() {
            return Err(Error::InvalidTagUid(format!("Not a hex UID: {s}")));
        }

        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidTagUid(format!("Not a hex UID: {s}")))?;

        TagUid::new(bytes)
    }
}

impl TryFrom<String> for TagUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TagUid> for String {
    fn from(uid: TagUid) -> Self {
        uid.to_hex()
    }
}

/// Kind of playable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Album,
    Playlist,
    Artist,
    Show,
    Track,
    Episode,
}

impl ResourceKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "album" => Some(Self::Album),
            "playlist" => Some(Self::Playlist),
            "artist" => Some(Self::Artist),
            "show" => Some(Self::Show),
            "track" => Some(Self::Track),
            "episode" => Some(Self::Episode),
            _ => None,
        }
    }

    /// URI path segment for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Artist => "artist",
            Self::Show => "show",
            Self::Track => "track",
            Self::Episode => "episode",
        }
    }

    /// Returns `true` if the resource is started as a playback context
    /// rather than as an explicit list of items.
    #[inline]
    #[must_use]
    pub fn is_context(self) -> bool {
        matches!(self, Self::Album | Self::Playlist | Self::Artist | Self::Show)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a playable resource (`spotify:<kind>:<base62 id>`).
///
/// # Examples
///
/// ```
/// use spotirfid_core::{ResourceId, ResourceKind};
///
/// let id: ResourceId = "spotify:album:6jbtHi5R0jMXoliU2OS0lo".parse().unwrap();
/// assert_eq!(id.kind(), ResourceKind::Album);
/// assert!(id.kind().is_context());
///
/// assert!("MASTER_TAG".parse::<ResourceId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    uri: String,
    kind: ResourceKind,
}

impl ResourceId {
    /// Parse and validate a resource URI.
    ///
    /// # Errors
    /// Returns `Error::InvalidResourceId` if the scheme, kind or id segment
    /// is malformed.
    pub fn new(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let mut parts = uri.split(':');

        let (Some(scheme), Some(kind), Some(id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidResourceId(format!(
                "Expected {RESOURCE_SCHEME}:<kind>:<id>, got {uri:?}"
            )));
        };

        if scheme != RESOURCE_SCHEME {
            return Err(Error::InvalidResourceId(format!(
                "Unsupported scheme {scheme:?}"
            )));
        }

        let kind = ResourceKind::from_segment(kind)
            .ok_or_else(|| Error::InvalidResourceId(format!("Unsupported kind {kind:?}")))?;

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidResourceId(format!(
                "Resource id must be base-62, got {id:?}"
            )));
        }

        Ok(ResourceId {
            uri: uri.to_string(),
            kind,
        })
    }

    /// The full URI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceId::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ResourceId::new(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.uri
    }
}

/// Identifier the playback service assigned to a playback endpoint.
///
/// Short-lived: it is re-resolved whenever the service stops recognizing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    /// # Errors
    /// Returns `Error::InvalidTargetId` for an empty identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidTargetId(
                "Target id cannot be empty".to_string(),
            ));
        }
        Ok(TargetId(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reserved payload identifying the master tag.
///
/// # Security
/// Comparison against scanned payloads is constant-time so the marker cannot
/// be probed byte by byte.
#[derive(Clone)]
pub struct MasterMarker(String);

impl MasterMarker {
    /// # Errors
    /// Returns `Error::Config` if the marker is empty or contains a NUL byte,
    /// since neither can be stored on a tag and read back.
    pub fn new(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.is_empty() || marker.contains('\0') {
            return Err(Error::Config(
                "Master marker must be non-empty and free of NUL bytes".to_string(),
            ));
        }
        Ok(MasterMarker(marker))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `payload` is exactly the marker.
    #[must_use]
    pub fn matches(&self, payload: &str) -> bool {
        self.0.as_bytes().ct_eq(payload.as_bytes()).into()
    }
}

impl fmt::Debug for MasterMarker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("MasterMarker(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("04A1B2C3", vec![0x04, 0xA1, 0xB2, 0xC3])]
    #[case("04:a1:b2:c3", vec![0x04, 0xA1, 0xB2, 0xC3])]
    #[case("04 A1 B2 C3 5D 6E 80", vec![0x04, 0xA1, 0xB2, 0xC3, 0x5D, 0x6E, 0x80])]
    fn test_tag_uid_parse(#[case] input: &str, #[case] expected: Vec<u8>) {
        let uid: TagUid = input.parse().unwrap();
        assert_eq!(uid.as_bytes(), expected.as_slice());
    }

    #[rstest]
    #[case("")]
    #[case("04A1B2")] // too short
    #[case("04A1B2C")] // odd length
    #[case("ZZA1B2C3")] // not hex
    #[case("0102030405060708090A0B")] // too long
    fn test_tag_uid_invalid(#[case] input: &str) {
        assert!(input.parse::<TagUid>().is_err());
    }

    #[test]
    fn test_tag_uid_display_is_upper_hex() {
        let uid = TagUid::new(vec![0x04, 0xab, 0x0c, 0xef]).unwrap();
        assert_eq!(uid.to_string(), "04AB0CEF");
    }

    #[test]
    fn test_tag_uid_serde_as_string() {
        let uid = TagUid::new(vec![0x01, 0x02, 0x03, 0x04]).unwrap();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"01020304\"");
        let back: TagUid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uid);
    }

    #[rstest]
    #[case("spotify:album:6jbtHi5R0jMXoliU2OS0lo", ResourceKind::Album, true)]
    #[case("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M", ResourceKind::Playlist, true)]
    #[case("spotify:track:4uLU6hMCjMI75M1A2tKUQC", ResourceKind::Track, false)]
    #[case("spotify:episode:512ojhOuo1ktJprKbVcKyQ", ResourceKind::Episode, false)]
    fn test_resource_id_valid(
        #[case] input: &str,
        #[case] kind: ResourceKind,
        #[case] context: bool,
    ) {
        let id = ResourceId::new(input).unwrap();
        assert_eq!(id.kind(), kind);
        assert_eq!(id.kind().is_context(), context);
        assert_eq!(id.as_str(), input);
    }

    #[rstest]
    #[case("MASTER_TAG")]
    #[case("spotify:album:")]
    #[case("spotify:movie:abc123")]
    #[case("youtube:album:abc123")]
    #[case("spotify:album:abc-123")]
    #[case("spotify:album:abc:extra")]
    fn test_resource_id_invalid(#[case] input: &str) {
        assert!(ResourceId::new(input).is_err());
    }

    #[test]
    fn test_target_id_rejects_empty() {
        assert!(TargetId::new("").is_err());
        assert!(TargetId::new("  ").is_err());
        assert_eq!(TargetId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_master_marker_matches_exactly() {
        let marker = MasterMarker::new("MASTER_TAG").unwrap();
        assert!(marker.matches("MASTER_TAG"));
        assert!(!marker.matches("MASTER_TA"));
        assert!(!marker.matches("master_tag"));
        assert!(!marker.matches(""));
    }

    #[test]
    fn test_master_marker_debug_hides_value() {
        let marker = MasterMarker::new("secret").unwrap();
        assert!(!format!("{marker:?}").contains("secret"));
    }

    #[test]
    fn test_master_marker_invalid() {
        assert!(MasterMarker::new("").is_err());
        assert!(MasterMarker::new("A\0B").is_err());
    }
}
