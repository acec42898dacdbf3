//! Resolution of the configured target name to a live target id.

use spotirfid_core::TargetId;
use spotirfid_network::{AccessToken, PlaybackService, Result};
use tracing::{debug, warn};

/// Resolves a human-readable target name against the advertised targets.
#[derive(Debug, Clone)]
pub struct ActionTargetResolver {
    name: String,
    folded: String,
}

impl ActionTargetResolver {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let folded = name.to_lowercase();
        Self { name, folded }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the target whose name matches, ignoring case.
    ///
    /// Returns `Ok(None)` when no advertised target matches. If several
    /// match, the first in enumeration order wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumeration itself fails.
    pub async fn resolve<S: PlaybackService>(
        &self,
        service: &S,
        token: &AccessToken,
    ) -> Result<Option<TargetId>> {
        let targets = service.list_targets(token).await?;

        let found = targets
            .into_iter()
            .find(|target| target.name.to_lowercase() == self.folded)
            .map(|target| target.id);

        match &found {
            Some(id) => debug!("Target {:?} resolved to {id}", self.name),
            None => warn!("Target {:?} is not advertised", self.name),
        }
        Ok(found)
    }
}
