//! Scripted playback service for testing and development.
//!
//! Each operation pops its next response from a queue; when the queue is
//! empty the configured default answers. Every call is logged so tests can
//! assert on the exact order and number of calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use spotirfid_core::{ResourceId, TargetId};
use tokio::sync::Mutex;

use crate::error::{Result, ServiceError};
use crate::service::PlaybackService;
use crate::types::{AccessToken, NowPlaying, PlaybackTarget};

/// One call observed by the mock service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Authorize,
    ListTargets { token: String },
    StartPlayback {
        token: String,
        resource: ResourceId,
        target: TargetId,
    },
    CurrentlyPlaying { token: String },
}

#[derive(Debug, Default)]
struct ServiceState {
    authorize: VecDeque<Result<AccessToken>>,
    list_targets: VecDeque<Result<Vec<PlaybackTarget>>>,
    start_playback: VecDeque<Result<()>>,
    currently_playing: VecDeque<Result<Option<NowPlaying>>>,

    targets: Vec<PlaybackTarget>,
    now_playing: Option<NowPlaying>,
    tokens_issued: u32,
    calls: Vec<ServiceCall>,
}

/// Mock playback service.
///
/// # Examples
///
/// ```
/// use spotirfid_core::TargetId;
/// use spotirfid_network::mock::{MockPlaybackService, ServiceCall};
/// use spotirfid_network::{PlaybackService, PlaybackTarget};
///
/// #[tokio::main]
/// async fn main() -> spotirfid_network::Result<()> {
///     let (mut service, handle) = MockPlaybackService::new();
///     handle
///         .set_targets(vec![PlaybackTarget::new(TargetId::new("dev-1").unwrap(), "Kitchen")])
///         .await;
///
///     let token = service.authorize().await?;
///     let targets = service.list_targets(&token).await?;
///     assert_eq!(targets[0].name, "Kitchen");
///     assert_eq!(handle.calls().await[0], ServiceCall::Authorize);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockPlaybackService {
    state: Arc<Mutex<ServiceState>>,
}

impl MockPlaybackService {
    /// Create a mock service with no targets and nothing playing.
    ///
    /// Returns a tuple of (MockPlaybackService, MockPlaybackHandle) where
    /// the handle scripts responses and inspects the call log.
    pub fn new() -> (Self, MockPlaybackHandle) {
        let state = Arc::new(Mutex::new(ServiceState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockPlaybackHandle { state },
        )
    }
}

impl PlaybackService for MockPlaybackService {
    async fn authorize(&mut self) -> Result<AccessToken> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::Authorize);

        match state.authorize.pop_front() {
            Some(response) => response,
            None => {
                state.tokens_issued += 1;
                Ok(AccessToken::new(
                    format!("mock-token-{}", state.tokens_issued),
                    Duration::from_secs(3600),
                ))
            }
        }
    }

    async fn list_targets(&self, token: &AccessToken) -> Result<Vec<PlaybackTarget>> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::ListTargets {
            token: token.secret().to_string(),
        });

        state
            .list_targets
            .pop_front()
            .unwrap_or_else(|| Ok(state.targets.clone()))
    }

    async fn start_playback(
        &self,
        token: &AccessToken,
        resource: &ResourceId,
        target: &TargetId,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::StartPlayback {
            token: token.secret().to_string(),
            resource: resource.clone(),
            target: target.clone(),
        });

        state.start_playback.pop_front().unwrap_or(Ok(()))
    }

    async fn currently_playing(&self, token: &AccessToken) -> Result<Option<NowPlaying>> {
        let mut state = self.state.lock().await;
        state.calls.push(ServiceCall::CurrentlyPlaying {
            token: token.secret().to_string(),
        });

        state
            .currently_playing
            .pop_front()
            .unwrap_or_else(|| Ok(state.now_playing.clone()))
    }
}

/// Handle for scripting a mock playback service.
#[derive(Debug, Clone)]
pub struct MockPlaybackHandle {
    state: Arc<Mutex<ServiceState>>,
}

impl MockPlaybackHandle {
    /// Targets returned when no scripted response is queued.
    pub async fn set_targets(&self, targets: Vec<PlaybackTarget>) {
        self.state.lock().await.targets = targets;
    }

    /// Now-playing value returned when no scripted response is queued.
    pub async fn set_now_playing(&self, now_playing: Option<NowPlaying>) {
        self.state.lock().await.now_playing = now_playing;
    }

    pub async fn push_authorize(&self, response: Result<AccessToken>) {
        self.state.lock().await.authorize.push_back(response);
    }

    pub async fn push_list_targets(&self, response: Result<Vec<PlaybackTarget>>) {
        self.state.lock().await.list_targets.push_back(response);
    }

    pub async fn push_start_playback(&self, response: Result<()>) {
        self.state.lock().await.start_playback.push_back(response);
    }

    pub async fn push_currently_playing(&self, response: Result<Option<NowPlaying>>) {
        self.state.lock().await.currently_playing.push_back(response);
    }

    /// Queue the same error `count` times for playback starts.
    pub async fn fail_start_playback(&self, error: ServiceError, count: usize) {
        let mut state = self.state.lock().await;
        for _ in 0..count {
            state.start_playback.push_back(Err(error.clone()));
        }
    }

    /// Every call so far, in order.
    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn authorize_count(&self) -> usize {
        self.count(|c| matches!(c, ServiceCall::Authorize)).await
    }

    pub async fn list_targets_count(&self) -> usize {
        self.count(|c| matches!(c, ServiceCall::ListTargets { .. }))
            .await
    }

    pub async fn start_playback_count(&self) -> usize {
        self.count(|c| matches!(c, ServiceCall::StartPlayback { .. }))
            .await
    }

    async fn count(&self, predicate: impl Fn(&ServiceCall) -> bool) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| predicate(c))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, name: &str) -> PlaybackTarget {
        PlaybackTarget::new(TargetId::new(id).unwrap(), name)
    }

    #[tokio::test]
    async fn test_default_tokens_are_distinct() {
        let (mut service, handle) = MockPlaybackService::new();
        let first = service.authorize().await.unwrap();
        let second = service.authorize().await.unwrap();

        assert_ne!(first.secret(), second.secret());
        assert_eq!(handle.authorize_count().await, 2);
    }

    #[tokio::test]
    async fn test_scripted_responses_take_precedence() {
        let (mut service, handle) = MockPlaybackService::new();
        handle.set_targets(vec![target("a", "Kitchen")]).await;
        handle.push_list_targets(Ok(vec![target("b", "Den")])).await;

        let token = service.authorize().await.unwrap();
        assert_eq!(service.list_targets(&token).await.unwrap()[0].name, "Den");
        assert_eq!(service.list_targets(&token).await.unwrap()[0].name, "Kitchen");
    }

    #[tokio::test]
    async fn test_start_playback_logs_arguments() {
        let (mut service, handle) = MockPlaybackService::new();
        handle
            .fail_start_playback(
                ServiceError::TargetNotFound {
                    target: "a".into(),
                },
                1,
            )
            .await;

        let token = service.authorize().await.unwrap();
        let resource = ResourceId::new("spotify:album:abc").unwrap();
        let target = TargetId::new("a").unwrap();

        assert!(service.start_playback(&token, &resource, &target).await.is_err());
        assert!(service.start_playback(&token, &resource, &target).await.is_ok());

        let calls = handle.calls().await;
        assert_eq!(
            calls[1],
            ServiceCall::StartPlayback {
                token: "mock-token-1".into(),
                resource,
                target
            }
        );
        assert_eq!(handle.start_playback_count().await, 2);
    }

    #[tokio::test]
    async fn test_now_playing_default() {
        let (mut service, handle) = MockPlaybackService::new();
        let token = service.authorize().await.unwrap();
        assert_eq!(service.currently_playing(&token).await.unwrap(), None);

        let playing = NowPlaying {
            resource: ResourceId::new("spotify:album:abc").unwrap(),
            name: "Abc".into(),
        };
        handle.set_now_playing(Some(playing.clone())).await;
        assert_eq!(
            service.currently_playing(&token).await.unwrap(),
            Some(playing)
        );
    }
}
