//! The control loop.
//!
//! One task polls the reader, classifies each new presentation and drives
//! the playback service or the tag writer. The only other task is the
//! indicator pulser, which exists for the duration of a write attempt and
//! is joined before the loop moves on.
//!
//! ```text
//!             ┌──────────── poll_once ────────────┐
//!  detect ──► │ same session? ──yes──► skip       │
//!             │ read payload ─► classify          │
//!             │   Idle:    master ─► capture      │
//!             │            resource ─► invoke     │
//!             │            other ─► unknown tag   │
//!             │   Pending: master ─► re-capture   │
//!             │            other ─► write/map     │
//!             └───────────────────────────────────┘
//! ```

use spotirfid_core::{ResourceId, TagUid};
use spotirfid_hardware::{
    HardwareError, Indicator, IndicatorPulser, SharedIndicator, TagHandle, TagReader, flash,
    shared,
};
use spotirfid_network::{NowPlaying, PlaybackService};
use spotirfid_rfid::{TagError, TagMemoryAccessor};
use spotirfid_storage::TagMapStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, PersistenceMode};
use crate::error::{BridgeError, Result};
use crate::invoker::ActionInvoker;
use crate::mode::ModeMachine;
use crate::outcome::Outcome;
use crate::resolver::ActionTargetResolver;
use crate::scan::{ScanOutcome, classify};

/// The tag-to-playback bridge.
///
/// Owns every device and all mutable state. Call [`start`](Self::start)
/// once, then [`run`](Self::run) or [`poll_once`](Self::poll_once), and
/// always finish with [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct Bridge<R, I, S> {
    reader: R,
    indicator: SharedIndicator<I>,
    invoker: ActionInvoker<S>,
    accessor: TagMemoryAccessor,
    store: Option<TagMapStore>,
    mode: ModeMachine,
    config: BridgeConfig,

    /// Session of the presentation handled last; cleared when the field is empty
    last_session: Option<u64>,

    /// Last invocation failed for lack of a target
    target_missing: bool,
}

impl<R, I, S> Bridge<R, I, S>
where
    R: TagReader,
    I: Indicator,
    S: PlaybackService,
{
    /// Assemble a bridge.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if tag-map persistence is selected
    /// without a store.
    pub fn new(
        reader: R,
        indicator: I,
        service: S,
        accessor: TagMemoryAccessor,
        store: Option<TagMapStore>,
        config: BridgeConfig,
    ) -> Result<Self> {
        if config.persistence == PersistenceMode::TagMap && store.is_none() {
            return Err(BridgeError::Config(
                "tag-map persistence needs a tag map file".to_string(),
            ));
        }

        let resolver = ActionTargetResolver::new(config.target_name.clone());
        Ok(Self {
            reader,
            indicator: shared(indicator),
            invoker: ActionInvoker::new(service, resolver),
            accessor,
            store,
            mode: ModeMachine::new(config.write_mode_timeout),
            config,
            last_session: None,
            target_missing: false,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn mode(&self) -> &ModeMachine {
        &self.mode
    }

    pub fn invoker(&self) -> &ActionInvoker<S> {
        &self.invoker
    }

    pub fn store(&self) -> Option<&TagMapStore> {
        self.store.as_ref()
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Returns `true` while the last invocation left the bridge without a target.
    pub fn target_missing(&self) -> bool {
        self.target_missing
    }

    /// Authorize and resolve the configured target.
    ///
    /// The indicator is solid while this runs.
    ///
    /// # Errors
    ///
    /// Any error is fatal: the credentials were rejected, the service could
    /// not be reached or the target is not advertised.
    pub async fn start(&mut self) -> Result<()> {
        match self.reader.reader_info().await {
            Ok(info) => info!("Reader: {} ({})", info.name, info.protocols.join(", ")),
            Err(e) => warn!("Reader info unavailable: {e}"),
        }

        self.set_indicator(true).await;
        let result = self.invoker.connect().await;
        self.target_missing = matches!(result, Err(BridgeError::TargetNotFound { .. }));
        self.settle_indicator().await;

        result
    }

    /// Run one iteration of the control loop.
    ///
    /// Returns `None` when nothing happened: no tag, the same tag still in
    /// the field, or a read that will be retried on the next poll.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Hardware`] if the reader fails. Only a
    /// disconnect is fatal; see [`BridgeError::is_transient`].
    pub async fn poll_once(&mut self) -> Result<Option<Outcome>> {
        if let Some(expired) = self.mode.expire_if_timed_out() {
            self.settle_indicator().await;
            let outcome = Outcome::WriteModeExpired {
                resource: expired.resource,
            };
            info!("{outcome}");
            return Ok(Some(outcome));
        }

        let Some(tag) = self.reader.detect_tag().await? else {
            self.last_session = None;
            return Ok(None);
        };
        if self.last_session == Some(tag.session()) {
            return Ok(None);
        }

        let payload = match self.accessor.read_payload(&mut self.reader, &tag).await {
            Ok(payload) => payload,
            Err(TagError::Hardware(e)) if !e.is_transient() => return Err(e.into()),
            Err(e) => {
                warn!("Could not read tag {}: {e}", tag.uid());
                return Ok(None);
            }
        };
        self.last_session = Some(tag.session());

        let scan = classify(
            tag.uid(),
            payload.as_deref(),
            &self.config.master_marker,
            self.store.as_ref().map(TagMapStore::map),
        );
        debug!("Tag {} classified as {scan:?}", tag.uid());

        let outcome = match (scan, self.mode.is_pending()) {
            (ScanOutcome::MasterMarker, _) => self.capture_now_playing().await,
            (_, true) => self.record_pending(&tag).await?,
            (ScanOutcome::ResourceReference { resource, .. }, false) => {
                self.play(tag.uid(), resource).await
            }
            (ScanOutcome::RawPayload(text), false) => Outcome::UnknownTag {
                uid: tag.uid().clone(),
                payload: Some(text),
            },
            (ScanOutcome::Unrecognized, false) => Outcome::UnknownTag {
                uid: tag.uid().clone(),
                payload: None,
            },
        };

        if outcome.is_success() {
            self.flash_success().await;
        }
        self.settle_indicator().await;

        info!("{outcome}");
        Ok(Some(outcome))
    }

    /// Poll until `shutdown` is cancelled, reporting every outcome.
    ///
    /// Cancellation is observed between events; an event in flight runs to
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error. The caller still owns the
    /// bridge and must call [`shutdown`](Self::shutdown).
    pub async fn run<F>(&mut self, shutdown: CancellationToken, mut on_outcome: F) -> Result<()>
    where
        F: FnMut(&Outcome),
    {
        info!(
            "Bridge running (target {:?}, {} persistence)",
            self.config.target_name, self.config.persistence
        );

        while !shutdown.is_cancelled() {
            match self.poll_once().await {
                Ok(Some(outcome)) => on_outcome(&outcome),
                Ok(None) => {}
                Err(e) if e.is_transient() => warn!("Poll failed: {e}"),
                Err(e) => {
                    error!("Bridge stopped: {e}");
                    return Err(e);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Shutdown requested");
        Ok(())
    }

    /// Switch the indicator off and release both devices.
    ///
    /// Every step is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub async fn shutdown(mut self) -> Result<()> {
        let mut first: Option<HardwareError> = None;

        {
            let mut indicator = self.indicator.lock().await;
            if let Err(e) = indicator.set(false).await {
                warn!("Indicator did not switch off: {e}");
                first.get_or_insert(e);
            }
            if let Err(e) = indicator.close().await {
                warn!("Indicator did not close: {e}");
                first.get_or_insert(e);
            }
        }

        if let Err(e) = self.reader.close().await {
            warn!("Reader did not close: {e}");
            first.get_or_insert(e);
        }

        info!("Devices released");
        match first {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Master tag: capture what is playing and wait for a tag.
    async fn capture_now_playing(&mut self) -> Outcome {
        let still_pending = self.mode.pending_resource().map(|p| p.resource.clone());

        match self.invoker.current_resource().await {
            Ok(Some(NowPlaying { resource, name })) => {
                self.mode.enter_write_mode(NowPlaying {
                    resource: resource.clone(),
                    name: name.clone(),
                });
                Outcome::WriteModeEntered { resource, name }
            }
            Ok(None) => Outcome::CannotEnterWriteMode {
                reason: "nothing playing".to_string(),
                still_pending,
            },
            Err(e) => Outcome::CannotEnterWriteMode {
                reason: e.to_string(),
                still_pending,
            },
        }
    }

    async fn play(&mut self, uid: &TagUid, resource: ResourceId) -> Outcome {
        let outcome = self.invoker.invoke(&resource).await;

        if outcome.is_success() {
            self.target_missing = false;
        } else if outcome.target_missing() {
            self.target_missing = true;
        }

        match outcome.result {
            Ok(target) => Outcome::Played {
                uid: uid.clone(),
                resource,
                target,
                attempts: outcome.attempts,
            },
            Err(failure) => Outcome::PlaybackFailed {
                uid: uid.clone(),
                resource,
                details: failure.to_string(),
                attempts: outcome.attempts,
            },
        }
    }

    /// Write-mode: record the captured resource for `tag`, then return to idle.
    async fn record_pending(&mut self, tag: &TagHandle) -> Result<Outcome> {
        let Some(pending) = self.mode.finish_write() else {
            return Err(BridgeError::Config("no resource captured".to_string()));
        };
        let uid = tag.uid().clone();
        let resource = pending.resource;

        let outcome = match self.config.persistence {
            PersistenceMode::TagMemory => {
                let pulser = IndicatorPulser::start(self.indicator.clone(), self.config.pulse_period);
                let result = self
                    .accessor
                    .write(&mut self.reader, tag, resource.as_str())
                    .await;
                if let Err(e) = pulser.stop().await {
                    warn!("Indicator pulser failed: {e}");
                }

                match result {
                    Ok(receipt) => Outcome::TagWritten {
                        uid,
                        resource,
                        start_page: receipt.start_page,
                        attempt: receipt.attempt,
                    },
                    Err(TagError::Hardware(e) | TagError::WriteFailed { source: e, .. })
                        if !e.is_transient() =>
                    {
                        return Err(e.into());
                    }
                    Err(e) => Outcome::WriteFailed {
                        uid,
                        resource,
                        reason: e.to_string(),
                    },
                }
            }
            PersistenceMode::TagMap => match self.store.as_mut() {
                Some(store) => match store.insert_and_save(uid.clone(), resource.clone()).await {
                    Ok(previous) => Outcome::TagMapped {
                        uid,
                        resource,
                        previous,
                    },
                    Err(e) => Outcome::WriteFailed {
                        uid,
                        resource,
                        reason: e.to_string(),
                    },
                },
                None => Outcome::WriteFailed {
                    uid,
                    resource,
                    reason: "no tag map configured".to_string(),
                },
            },
        };

        Ok(outcome)
    }

    async fn flash_success(&self) {
        if let Err(e) = flash(
            &self.indicator,
            self.config.flash_count,
            self.config.flash_period,
        )
        .await
        {
            warn!("Indicator flash failed: {e}");
        }
    }

    /// Solid while waiting for a tag or without a target, off otherwise.
    async fn settle_indicator(&self) {
        self.set_indicator(self.mode.is_pending() || self.target_missing)
            .await;
    }

    async fn set_indicator(&self, on: bool) {
        if let Err(e) = self.indicator.lock().await.set(on).await {
            warn!("Indicator failed: {e}");
        }
    }
}
