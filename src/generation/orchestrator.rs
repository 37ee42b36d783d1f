//! # Synthesis Orchestrator
//!
//! Drives one synthesis request through the generate, validate and repair
//! cycle:
//!
//! ```text
//! Requesting -> Hydrating -> Validating -> (Repairing -> Validating)* -> Done
//!      ^            |             |
//!      +------------+-------------+   (attempt failed, back off and retry)
//!
//! quota exhausted / attempts exhausted -> FallbackDone
//! ```
//!
//! The orchestrator never narrates anything itself. Every transition is
//! recorded as a [`SynthesisEvent`] that the caller can replay or stream.

use crate::{
    config, fallback_level, repair_connectivity, validate_connectivity, ConnectivityReport,
    ContentProvider, DifficultyHint, EntityHydrator, Level, LevelforgeError, LevelforgeResult,
    Position, ProviderError, QuotaFlag, SynthesisConfig,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

/// States of a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisState {
    Requesting { attempt: u32 },
    Hydrating { attempt: u32 },
    Validating { attempt: u32, pass: u32 },
    Repairing { attempt: u32, pass: u32 },
    Done,
    FallbackDone,
}

/// Tells the consumer whether it got fresh content or the substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisOutcome {
    Generated,
    Fallback,
}

/// Observable record of what happened during a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisEvent {
    StateChanged(SynthesisState),
    ProviderFailed { attempt: u32, reason: String },
    HydrationFailed { attempt: u32, reason: String },
    ValidationFailed { attempt: u32, pass: u32, unreachable: Vec<Position> },
    Repaired { attempt: u32, pass: u32, opened: usize },
    RepairExhausted { attempt: u32 },
    BackoffScheduled { attempt: u32, delay_ms: u64 },
    QuotaExhausted,
    Finished { outcome: SynthesisOutcome },
}

/// Final result of a synthesis request.
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub level: Level,
    pub outcome: SynthesisOutcome,
    /// Number of provider requests made for this level
    pub provider_calls: u32,
    pub events: Vec<SynthesisEvent>,
}

/// Caller side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Orchestrator side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    fn check(&self) -> LevelforgeResult<()> {
        if self.is_cancelled() {
            Err(LevelforgeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Creates a connected cancellation handle and signal.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

/// Collects events for the report and forwards them to a live sink.
struct EventLog<'a> {
    events: Vec<SynthesisEvent>,
    sink: Option<&'a mpsc::UnboundedSender<SynthesisEvent>>,
}

impl<'a> EventLog<'a> {
    fn new(sink: Option<&'a mpsc::UnboundedSender<SynthesisEvent>>) -> Self {
        Self {
            events: Vec::new(),
            sink,
        }
    }

    fn record(&mut self, event: SynthesisEvent) {
        debug!("Synthesis event: {:?}", event);
        if let Some(sink) = self.sink {
            // A listener that went away is not our problem
            let _ = sink.send(event.clone());
        }
        self.events.push(event);
    }
}

/// Produces connected levels from an unreliable content provider.
pub struct LevelSynthesizer<P> {
    provider: P,
    hydrator: EntityHydrator,
    config: SynthesisConfig,
    quota: QuotaFlag,
    fallback: Level,
    event_sink: Option<mpsc::UnboundedSender<SynthesisEvent>>,
}

impl<P: ContentProvider> LevelSynthesizer<P> {
    /// Creates a synthesizer sharing the session's quota flag.
    pub fn new(provider: P, quota: QuotaFlag) -> Self {
        let config = SynthesisConfig::default();
        Self {
            provider,
            hydrator: EntityHydrator::new(config.tile_size),
            config,
            quota,
            fallback: fallback_level(1),
            event_sink: None,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.hydrator = EntityHydrator::new(config.tile_size);
        self.config = config;
        self
    }

    /// Streams every event to `sink` as it happens.
    pub fn with_event_sink(mut self, sink: mpsc::UnboundedSender<SynthesisEvent>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Replaces the canonical fallback level. The level must be connected.
    pub fn with_fallback(mut self, level: Level) -> LevelforgeResult<Self> {
        validate_connectivity(&level).ensure_valid()?;
        self.fallback = level;
        Ok(self)
    }

    /// The session quota flag this synthesizer consults.
    pub fn quota_flag(&self) -> &QuotaFlag {
        &self.quota
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Synthesizes a level. Always yields a playable level.
    pub async fn synthesize(&self, ordinal: u32) -> SynthesisReport {
        let (_handle, mut signal) = cancellation();
        let mut log = EventLog::new(self.event_sink.as_ref());
        let mut provider_calls = 0;
        match self.run(ordinal, &mut signal, &mut log, &mut provider_calls).await {
            Ok(report) => report,
            Err(e) => {
                // Only cancellation fails a run and `_handle` never cancels
                error!("Synthesis of level {} aborted: {}", ordinal, e);
                self.finish_with_fallback(ordinal, provider_calls, &mut log)
            }
        }
    }

    /// Synthesizes a level, stopping early if `signal` fires.
    ///
    /// Returns `Cancelled` when stopped; the candidate level is dropped.
    pub async fn synthesize_with_cancel(
        &self,
        ordinal: u32,
        signal: &mut CancelSignal,
    ) -> LevelforgeResult<SynthesisReport> {
        let mut log = EventLog::new(self.event_sink.as_ref());
        let mut provider_calls = 0;
        self.run(ordinal, signal, &mut log, &mut provider_calls).await
    }

    async fn run(
        &self,
        ordinal: u32,
        signal: &mut CancelSignal,
        log: &mut EventLog<'_>,
        provider_calls: &mut u32,
    ) -> LevelforgeResult<SynthesisReport> {
        let hint = DifficultyHint::for_ordinal(ordinal);

        for attempt in 1..=config::MAX_GENERATION_ATTEMPTS {
            signal.check()?;
            // Another request of the session may have spent the quota meanwhile
            if self.quota.is_exhausted() {
                warn!("Provider quota exhausted; serving fallback for level {}", ordinal);
                log.record(SynthesisEvent::QuotaExhausted);
                return Ok(self.finish_with_fallback(ordinal, *provider_calls, log));
            }
            log.record(SynthesisEvent::StateChanged(SynthesisState::Requesting { attempt }));
            *provider_calls += 1;

            let response = tokio::select! {
                biased;
                _ = signal.cancelled() => return Err(LevelforgeError::Cancelled),
                response = self.provider.request_level(ordinal, &hint) => response,
            };

            match response {
                Err(ProviderError::QuotaExhausted(reason)) => {
                    error!(
                        "{} provider quota exhausted during level {}: {}",
                        self.provider.provider_name(),
                        ordinal,
                        reason
                    );
                    self.quota.mark_exhausted();
                    log.record(SynthesisEvent::QuotaExhausted);
                    return Ok(self.finish_with_fallback(ordinal, *provider_calls, log));
                }
                Err(ProviderError::Recoverable(reason)) => {
                    warn!("Provider failed on attempt {}: {}", attempt, reason);
                    log.record(SynthesisEvent::ProviderFailed { attempt, reason });
                }
                Ok(payload) => {
                    signal.check()?;
                    log.record(SynthesisEvent::StateChanged(SynthesisState::Hydrating { attempt }));

                    match self.hydrator.hydrate(payload) {
                        Err(e) => {
                            warn!("Hydration failed on attempt {}: {}", attempt, e);
                            log.record(SynthesisEvent::HydrationFailed {
                                attempt,
                                reason: e.to_string(),
                            });
                        }
                        Ok(level) => match self.stabilize(level, attempt, signal, log) {
                            Ok(level) => {
                                log.record(SynthesisEvent::StateChanged(SynthesisState::Done));
                                log.record(SynthesisEvent::Finished {
                                    outcome: SynthesisOutcome::Generated,
                                });
                                return Ok(SynthesisReport {
                                    level,
                                    outcome: SynthesisOutcome::Generated,
                                    provider_calls: *provider_calls,
                                    events: std::mem::take(&mut log.events),
                                });
                            }
                            Err(LevelforgeError::Cancelled) => return Err(LevelforgeError::Cancelled),
                            Err(e) => warn!("Discarding candidate from attempt {}: {}", attempt, e),
                        },
                    }
                }
            }

            if attempt < config::MAX_GENERATION_ATTEMPTS && !self.quota.is_exhausted() {
                let delay = self.config.backoff_for(attempt);
                log.record(SynthesisEvent::BackoffScheduled {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => return Err(LevelforgeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        error!(
            "Failed to synthesize level {} after {} attempts; loading fallback",
            ordinal,
            config::MAX_GENERATION_ATTEMPTS
        );
        Ok(self.finish_with_fallback(ordinal, *provider_calls, log))
    }

    /// Validates and repairs a candidate until it is connected.
    fn stabilize(
        &self,
        mut level: Level,
        attempt: u32,
        signal: &CancelSignal,
        log: &mut EventLog<'_>,
    ) -> LevelforgeResult<Level> {
        for pass in 1..=config::MAX_REPAIR_ITERATIONS {
            signal.check()?;
            log.record(SynthesisEvent::StateChanged(SynthesisState::Validating {
                attempt,
                pass,
            }));

            let reachability = match validate_connectivity(&level) {
                ConnectivityReport::Valid => {
                    info!(
                        "Level {} validated on attempt {} after {} repair(s)",
                        level.ordinal,
                        attempt,
                        pass - 1
                    );
                    return Ok(level);
                }
                ConnectivityReport::Invalid(reachability) => reachability,
            };
            log.record(SynthesisEvent::ValidationFailed {
                attempt,
                pass,
                unreachable: reachability.unreachable.iter().copied().collect(),
            });

            if pass == config::MAX_REPAIR_ITERATIONS {
                break;
            }

            signal.check()?;
            log.record(SynthesisEvent::StateChanged(SynthesisState::Repairing {
                attempt,
                pass,
            }));
            let repaired = repair_connectivity(&level, &reachability);
            let opened = repaired.open_count() - level.grid().open_count();

            signal.check()?;
            level.apply_repair(repaired)?;
            log.record(SynthesisEvent::Repaired {
                attempt,
                pass,
                opened,
            });
        }

        log.record(SynthesisEvent::RepairExhausted { attempt });
        Err(LevelforgeError::RepairExhausted {
            iterations: config::MAX_REPAIR_ITERATIONS,
        })
    }

    fn finish_with_fallback(
        &self,
        ordinal: u32,
        provider_calls: u32,
        log: &mut EventLog<'_>,
    ) -> SynthesisReport {
        info!("Using fallback level for level {}", ordinal);
        log.record(SynthesisEvent::StateChanged(SynthesisState::FallbackDone));
        log.record(SynthesisEvent::Finished {
            outcome: SynthesisOutcome::Fallback,
        });
        SynthesisReport {
            level: self.fallback.relabeled(ordinal),
            outcome: SynthesisOutcome::Fallback,
            provider_calls,
            events: std::mem::take(&mut log.events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawPayload, ThemeContent};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider that replays a fixed script of responses.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<RawPayload, ProviderError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<RawPayload, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ContentProvider for ScriptedProvider {
        async fn request_level(
            &self,
            _ordinal: u32,
            _hint: &DifficultyHint,
        ) -> Result<RawPayload, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Recoverable("script ended".to_string())))
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Provider whose first failure coincides with another request of the
    /// session spending the quota.
    struct QuotaSpendingProvider {
        session_quota: QuotaFlag,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl ContentProvider for QuotaSpendingProvider {
        async fn request_level(
            &self,
            _ordinal: u32,
            _hint: &DifficultyHint,
        ) -> Result<RawPayload, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.session_quota.mark_exhausted();
            Err(ProviderError::Recoverable("connection reset".to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "quota-spending"
        }
    }

    /// Provider that never answers within a test's lifetime.
    struct StalledProvider;

    #[async_trait]
    impl ContentProvider for StalledProvider {
        async fn request_level(
            &self,
            _ordinal: u32,
            _hint: &DifficultyHint,
        ) -> Result<RawPayload, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Recoverable("timed out".to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "stalled"
        }
    }

    fn payload(layout: Vec<Vec<u8>>) -> RawPayload {
        let content: &ThemeContent = DifficultyHint::for_ordinal(1).content();
        RawPayload::from_json(&format!(
            r#"{{"levelNumber":1,"theme":"meadows","layout":{},
            "playerSpawn":{{"x":0,"y":0}},"exitPosition":{{"x":2,"y":2}},
            "npc":{{"name":"{}","position":{{"x":1,"y":0}},"quest":"{}"}},
            "guidingStone":{{"lessonId":"{}","position":{{"x":0,"y":1}}}},
            "questItems":[],"enemies":[]}}"#,
            serde_json::to_string(&layout).unwrap(),
            content.npc_name,
            content.quest,
            content.lesson_id
        ))
        .unwrap()
    }

    fn open_payload() -> RawPayload {
        payload(vec![vec![0, 0, 0], vec![0, 0, 0], vec![0, 0, 0]])
    }

    fn sealed_exit_payload() -> RawPayload {
        payload(vec![vec![0, 0, 0], vec![0, 1, 1], vec![0, 1, 0]])
    }

    fn synthesizer(provider: ScriptedProvider) -> LevelSynthesizer<ScriptedProvider> {
        LevelSynthesizer::new(provider, QuotaFlag::new()).with_config(SynthesisConfig::for_testing())
    }

    #[tokio::test]
    async fn test_valid_payload_is_generated() {
        let synth = synthesizer(ScriptedProvider::new(vec![Ok(open_payload())]));
        let report = synth.synthesize(1).await;

        assert_eq!(report.outcome, SynthesisOutcome::Generated);
        assert_eq!(report.provider_calls, 1);
        assert_eq!(
            report.events.last(),
            Some(&SynthesisEvent::Finished {
                outcome: SynthesisOutcome::Generated
            })
        );
        assert!(!report
            .events
            .iter()
            .any(|event| matches!(event, SynthesisEvent::Repaired { .. })));
    }

    #[tokio::test]
    async fn test_disconnected_payload_is_repaired() {
        let synth = synthesizer(ScriptedProvider::new(vec![Ok(sealed_exit_payload())]));
        let report = synth.synthesize(1).await;

        assert_eq!(report.outcome, SynthesisOutcome::Generated);
        assert_eq!(validate_connectivity(&report.level), ConnectivityReport::Valid);
        assert!(report.events.contains(&SynthesisEvent::ValidationFailed {
            attempt: 1,
            pass: 1,
            unreachable: vec![Position::new(2, 2)],
        }));
        assert!(report
            .events
            .contains(&SynthesisEvent::StateChanged(SynthesisState::Validating {
                attempt: 1,
                pass: 2
            })));
    }

    #[tokio::test]
    async fn test_malformed_payload_consumes_an_attempt() {
        let mut broken = open_payload();
        broken.exit_position.x = 40;
        let synth = synthesizer(ScriptedProvider::new(vec![Ok(broken), Ok(open_payload())]));
        let report = synth.synthesize(1).await;

        assert_eq!(report.outcome, SynthesisOutcome::Generated);
        assert_eq!(report.provider_calls, 2);
        assert!(report
            .events
            .iter()
            .any(|event| matches!(event, SynthesisEvent::HydrationFailed { attempt: 1, .. })));
    }

    #[tokio::test]
    async fn test_recoverable_failures_exhaust_to_fallback() {
        let synth = synthesizer(ScriptedProvider::new(Vec::new()));
        let report = synth.synthesize(4).await;

        assert_eq!(report.outcome, SynthesisOutcome::Fallback);
        assert_eq!(report.level.ordinal, 4);
        assert_eq!(report.provider_calls, config::MAX_GENERATION_ATTEMPTS);
        assert_eq!(synth.provider().calls(), config::MAX_GENERATION_ATTEMPTS);

        let backoffs = report
            .events
            .iter()
            .filter(|event| matches!(event, SynthesisEvent::BackoffScheduled { .. }))
            .count();
        assert_eq!(backoffs, config::MAX_GENERATION_ATTEMPTS as usize - 1);
        assert!(!synth.quota_flag().is_exhausted());
    }

    #[tokio::test]
    async fn test_quota_exhaustion_short_circuits() {
        let quota = QuotaFlag::new();
        let synth = LevelSynthesizer::new(
            ScriptedProvider::new(vec![
                Err(ProviderError::QuotaExhausted("429".to_string())),
                Ok(open_payload()),
            ]),
            quota.clone(),
        );
        let report = synth.synthesize(2).await;

        assert_eq!(report.outcome, SynthesisOutcome::Fallback);
        assert_eq!(synth.provider().calls(), 1);
        assert!(quota.is_exhausted());
        assert!(!report
            .events
            .iter()
            .any(|event| matches!(event, SynthesisEvent::BackoffScheduled { .. })));

        // Sticky for the session: no further provider traffic
        let again = synth.synthesize(3).await;
        assert_eq!(again.outcome, SynthesisOutcome::Fallback);
        assert_eq!(again.provider_calls, 0);
        assert_eq!(synth.provider().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let synth = LevelSynthesizer::new(ScriptedProvider::new(Vec::new()), QuotaFlag::new())
            .with_config(SynthesisConfig::new(Duration::from_millis(100)));
        let started = tokio::time::Instant::now();
        let report = synth.synthesize(1).await;

        let delays: Vec<u64> = report
            .events
            .iter()
            .filter_map(|event| match event {
                SynthesisEvent::BackoffScheduled { delay_ms, .. } => Some(*delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![100, 200]);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let synth = synthesizer(ScriptedProvider::new(vec![Ok(open_payload())]));
        let (handle, mut signal) = cancellation();
        handle.cancel();

        let result = synth.synthesize_with_cancel(1, &mut signal).await;
        assert!(matches!(result, Err(LevelforgeError::Cancelled)));
        assert_eq!(synth.provider().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_spent_by_another_request_stops_retries() {
        let quota = QuotaFlag::new();
        let provider = QuotaSpendingProvider {
            session_quota: quota.clone(),
            calls: Mutex::new(0),
        };
        let synth = LevelSynthesizer::new(provider, quota.clone())
            .with_config(SynthesisConfig::new(Duration::from_millis(100)));
        let started = tokio::time::Instant::now();

        let report = synth.synthesize(2).await;

        assert_eq!(report.outcome, SynthesisOutcome::Fallback);
        assert_eq!(report.provider_calls, 1);
        assert_eq!(*synth.provider().calls.lock().unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(report.events.contains(&SynthesisEvent::QuotaExhausted));
        assert!(!report
            .events
            .iter()
            .any(|event| matches!(event, SynthesisEvent::BackoffScheduled { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_provider_call() {
        let synth = LevelSynthesizer::new(StalledProvider, QuotaFlag::new());
        let (handle, mut signal) = cancellation();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        let started = tokio::time::Instant::now();

        let result = synth.synthesize_with_cancel(1, &mut signal).await;

        assert!(matches!(result, Err(LevelforgeError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(1));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let synth = LevelSynthesizer::new(ScriptedProvider::new(Vec::new()), QuotaFlag::new())
            .with_config(SynthesisConfig::new(Duration::from_secs(10)));
        let (handle, mut signal) = cancellation();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });
        let started = tokio::time::Instant::now();

        let result = synth.synthesize_with_cancel(1, &mut signal).await;

        assert!(matches!(result, Err(LevelforgeError::Cancelled)));
        assert_eq!(synth.provider().calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_event_sink_receives_transitions() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let synth = synthesizer(ScriptedProvider::new(vec![Ok(open_payload())])).with_event_sink(sender);
        let report = synth.synthesize(1).await;

        let mut streamed = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            streamed.push(event);
        }
        assert_eq!(streamed, report.events);
        assert_eq!(
            streamed.first(),
            Some(&SynthesisEvent::StateChanged(SynthesisState::Requesting { attempt: 1 }))
        );
    }

    #[test]
    fn test_custom_fallback_must_be_connected() {
        let disconnected = EntityHydrator::default()
            .hydrate(sealed_exit_payload())
            .unwrap();
        let result = LevelSynthesizer::new(ScriptedProvider::new(Vec::new()), QuotaFlag::new())
            .with_fallback(disconnected);
        assert!(matches!(result, Err(LevelforgeError::Unreachable(_))));
    }
}
