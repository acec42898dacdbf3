//! Playback invocation with bounded two-tier retry.
//!
//! ```text
//! attempt 1 ──ok──> done
//!    │ TargetStale
//!    ├──> re-resolve ──found──> attempt 2 ──ok──> done
//!    │                             │
//!    │ other / not found / failed  │
//!    └──────────────┬──────────────┘
//!                   └──> re-authorize ──> attempt 3 ──ok──> done
//!                                             └──> ActionFailed
//! ```
//!
//! At most [`MAX_INVOKE_ATTEMPTS`] invocation calls per scan event, no
//! backoff. Token and target are cached across scan events and refreshed
//! only when the service rejects them.

use std::fmt;

use spotirfid_core::constants::MAX_INVOKE_ATTEMPTS;
use spotirfid_core::{ResourceId, TargetId};
use spotirfid_network::{AccessToken, FailureClass, NowPlaying, PlaybackService, ServiceError};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::resolver::ActionTargetResolver;

/// Why an invocation was given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFailure {
    /// The configured target is not advertised.
    TargetMissing,

    /// Authorization failed before or during the retry sequence.
    Authorization(ServiceError),

    /// The final attempt failed.
    Service(ServiceError),
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMissing => f.write_str("playback target not available"),
            Self::Authorization(e) => write!(f, "authorization failed: {e}"),
            Self::Service(e) => write!(f, "{e}"),
        }
    }
}

/// Report of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutcome {
    /// Target the playback started on, or the failure.
    pub result: std::result::Result<TargetId, ActionFailure>,

    /// Invocation calls issued (0..=3)
    pub attempts: u32,

    /// Whether the target was re-resolved
    pub re_resolved: bool,

    /// Whether the token was refreshed
    pub reauthorized: bool,
}

impl InvokeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns `true` if the failure left the bridge without a usable target.
    pub fn target_missing(&self) -> bool {
        matches!(self.result, Err(ActionFailure::TargetMissing))
    }
}

/// Drives the playback service for scan events.
///
/// Owns the cached token and target; nothing else reads or writes them.
#[derive(Debug)]
pub struct ActionInvoker<S> {
    service: S,
    resolver: ActionTargetResolver,
    token: Option<AccessToken>,
    target: Option<TargetId>,

    /// Set when the last re-resolution found nothing.
    target_lost: bool,
}

impl<S: PlaybackService> ActionInvoker<S> {
    pub fn new(service: S, resolver: ActionTargetResolver) -> Self {
        Self {
            service,
            resolver,
            token: None,
            target: None,
            target_lost: false,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn target(&self) -> Option<&TargetId> {
        self.target.as_ref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Startup authorization and target resolution.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TargetNotFound`] if the target is not
    /// advertised, or the service error if authorization or enumeration
    /// fails. Both are fatal at startup.
    pub async fn connect(&mut self) -> Result<()> {
        let token = self.service.authorize().await?;
        let target = self
            .resolver
            .resolve(&self.service, &token)
            .await?
            .ok_or_else(|| BridgeError::TargetNotFound {
                name: self.resolver.name().to_string(),
            })?;

        info!("Connected to target {:?} ({target})", self.resolver.name());
        self.token = Some(token);
        self.target = Some(target);
        self.target_lost = false;
        Ok(())
    }

    /// Start playback of `resource` on the cached target.
    ///
    /// Never fails outright; failures are reported in the outcome.
    pub async fn invoke(&mut self, resource: &ResourceId) -> InvokeOutcome {
        let mut outcome = InvokeOutcome {
            result: Err(ActionFailure::TargetMissing),
            attempts: 0,
            re_resolved: false,
            reauthorized: false,
        };

        // Acquiring missing state is not an invocation attempt
        let token = match self.ensure_token().await {
            Ok(token) => token,
            Err(e) => {
                outcome.result = Err(ActionFailure::Authorization(e));
                return outcome;
            }
        };
        let target = match self.ensure_target(&token).await {
            Some(target) => target,
            None => return outcome,
        };

        // 1. Direct call
        let mut last = match self.attempt(&mut outcome, &token, resource, &target).await {
            Ok(()) => return self.succeeded(outcome, target),
            Err(e) => e,
        };
        let mut target = target;

        // 2. Target stale: re-resolve once and retry with the new target
        if last.class() == FailureClass::TargetStale {
            outcome.re_resolved = true;
            match self.resolver.resolve(&self.service, &token).await {
                Ok(Some(resolved)) => {
                    self.target = Some(resolved.clone());
                    self.target_lost = false;
                    target = resolved;
                    match self.attempt(&mut outcome, &token, resource, &target).await {
                        Ok(()) => return self.succeeded(outcome, target),
                        Err(e) => last = e,
                    }
                }
                Ok(None) => self.target_lost = true,
                Err(e) => warn!("Re-resolution failed: {e}"),
            }
        }

        // 3. Anything left: re-authorize once and retry
        debug!("Re-authorizing after: {last}");
        outcome.reauthorized = true;
        let token = match self.service.authorize().await {
            Ok(token) => {
                self.token = Some(token.clone());
                token
            }
            Err(e) => {
                outcome.result = Err(ActionFailure::Authorization(e));
                return outcome;
            }
        };

        match self.attempt(&mut outcome, &token, resource, &target).await {
            Ok(()) => self.succeeded(outcome, target),
            Err(e) => {
                warn!(
                    "Playback of {resource} failed after {} attempts: {e}",
                    outcome.attempts
                );
                outcome.result = if self.target_lost && e.class() == FailureClass::TargetStale {
                    Err(ActionFailure::TargetMissing)
                } else {
                    Err(ActionFailure::Service(e))
                };
                outcome
            }
        }
    }

    /// Query the resource currently playing, re-authorizing once if the
    /// token is rejected.
    ///
    /// # Errors
    ///
    /// Returns the service error if the query fails.
    pub async fn current_resource(&mut self) -> std::result::Result<Option<NowPlaying>, ServiceError> {
        let token = self.ensure_token().await?;

        match self.service.currently_playing(&token).await {
            Err(e) if e.class() == FailureClass::AuthorizationStale => {
                debug!("Token rejected, re-authorizing");
                let token = self.service.authorize().await?;
                self.token = Some(token.clone());
                self.service.currently_playing(&token).await
            }
            result => result,
        }
    }

    async fn attempt(
        &self,
        outcome: &mut InvokeOutcome,
        token: &AccessToken,
        resource: &ResourceId,
        target: &TargetId,
    ) -> std::result::Result<(), ServiceError> {
        debug_assert!(outcome.attempts < MAX_INVOKE_ATTEMPTS);
        outcome.attempts += 1;

        let result = self.service.start_playback(token, resource, target).await;
        if let Err(e) = &result {
            debug!("Attempt {} for {resource} on {target} failed: {e}", outcome.attempts);
        }
        result
    }

    fn succeeded(&mut self, mut outcome: InvokeOutcome, target: TargetId) -> InvokeOutcome {
        self.target_lost = false;
        outcome.result = Ok(target);
        outcome
    }

    async fn ensure_token(&mut self) -> std::result::Result<AccessToken, ServiceError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.service.authorize().await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    async fn ensure_target(&mut self, token: &AccessToken) -> Option<TargetId> {
        if let Some(target) = &self.target {
            return Some(target.clone());
        }

        match self.resolver.resolve(&self.service, token).await {
            Ok(Some(target)) => {
                self.target = Some(target.clone());
                self.target_lost = false;
                Some(target)
            }
            Ok(None) => {
                self.target_lost = true;
                None
            }
            Err(e) => {
                warn!("Target resolution failed: {e}");
                None
            }
        }
    }
}
