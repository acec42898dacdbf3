//! Interpretation of a scanned tag.
//!
//! Tag content is polymorphic: the master marker, a resource URI written
//! into memory, a UID known to the tag map, or something else entirely.
//! [`classify`] turns every scan into one [`ScanOutcome`] so the control
//! loop handles all of them uniformly.

use spotirfid_core::{MasterMarker, ResourceId, TagUid};
use spotirfid_storage::TagMap;
use tracing::trace;

/// Where a resource reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Decoded from tag memory.
    Payload,

    /// Looked up by UID in the tag map.
    TagMap,
}

/// Classified scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    MasterMarker,
    ResourceReference {
        resource: ResourceId,
        source: ReferenceSource,
    },
    /// Non-empty payload that is neither the marker nor a resource.
    RawPayload(String),
    Unrecognized,
}

/// Classify a scan.
///
/// Checks run in order: master marker, resource payload, tag map entry,
/// any other payload. The first match wins.
///
/// # Examples
///
/// ```
/// use spotirfid_bridge::scan::{ScanOutcome, classify};
/// use spotirfid_core::{MasterMarker, TagUid};
///
/// let marker = MasterMarker::new("MASTER_TAG").unwrap();
/// let uid: TagUid = "04A1B2C3".parse().unwrap();
///
/// assert_eq!(classify(&uid, Some("MASTER_TAG"), &marker, None), ScanOutcome::MasterMarker);
/// assert_eq!(classify(&uid, None, &marker, None), ScanOutcome::Unrecognized);
/// ```
pub fn classify(
    uid: &TagUid,
    payload: Option<&str>,
    master_marker: &MasterMarker,
    tag_map: Option<&TagMap>,
) -> ScanOutcome {
    let payload = payload.map(str::trim).filter(|p| !p.is_empty());

    if let Some(text) = payload {
        if master_marker.matches(text) {
            return ScanOutcome::MasterMarker;
        }
        if let Ok(resource) = ResourceId::new(text) {
            return ScanOutcome::ResourceReference {
                resource,
                source: ReferenceSource::Payload,
            };
        }
    }

    if let Some(resource) = tag_map.and_then(|map| map.get(uid)) {
        trace!("Tag {uid} found in tag map");
        return ScanOutcome::ResourceReference {
            resource: resource.clone(),
            source: ReferenceSource::TagMap,
        };
    }

    match payload {
        Some(text) => ScanOutcome::RawPayload(text.to_string()),
        None => ScanOutcome::Unrecognized,
    }
}
