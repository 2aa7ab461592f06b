//! Tiered fallback resolution engine.

use std::collections::HashMap;
use std::sync::Arc;

use cadenza_core::{
    Error, Locator, ProviderAttempt, ProviderError, QualityTier, Resolution, ResolutionRequest,
    ResolvedAudio, Result,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::provider::AudioProvider;
use crate::registry::ProviderRegistry;
use crate::retry::{Retried, RetryPolicy};

/// How providers within one quality tier are visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One provider at a time, in registry order.
    #[default]
    Sequential,
    /// All providers of a tier at once; the first valid payload wins and the
    /// rest of the tier is aborted.
    Parallel,
}

/// Resolves locators against an ordered set of providers.
///
/// Stateless between calls; share it behind an `Arc`.
pub struct ResolutionEngine {
    registry: ProviderRegistry,
    retry: RetryPolicy,
    strategy: Strategy,
}

impl ResolutionEngine {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            retry: RetryPolicy::default(),
            strategy: Strategy::default(),
        }
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Resolve a request.
    ///
    /// Returns [`Error::InvalidInput`] before any provider call if the locator
    /// is empty or malformed, and [`Error::Exhausted`] with one diagnostic per
    /// (tier, provider) slot, in attempt order, if nothing succeeds.
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<Resolution> {
        let locator = Locator::parse(&request.locator)?;
        let tiers = QualityTier::search_order(request.preferred_quality);

        if self.registry.is_empty() {
            warn!("No providers available, cannot resolve {locator}");
            return Err(Error::Exhausted(Vec::new()));
        }

        debug!(
            "Resolving {locator}: tiers {:?}, providers {:?}, {:?}",
            tiers.iter().map(|t| t.kbps()).collect::<Vec<_>>(),
            self.registry.names(),
            self.strategy
        );

        let mut failures = Vec::new();
        for tier in tiers {
            let resolution = match self.strategy {
                Strategy::Sequential => self.resolve_tier(&locator, tier, &mut failures).await,
                Strategy::Parallel => {
                    self.resolve_tier_parallel(&locator, tier, &mut failures)
                        .await
                }
            };

            if let Some(resolution) = resolution {
                info!(
                    "Resolved {locator} via {} at {tier} in {} tries after {} failed attempts",
                    resolution.provider(),
                    resolution.attempt.tries,
                    failures.len()
                );
                return Ok(resolution);
            }
        }

        warn!(
            "Resolution exhausted for {locator}: {} attempts failed",
            failures.len()
        );
        Err(Error::Exhausted(failures))
    }

    async fn resolve_tier(
        &self,
        locator: &Locator,
        tier: QualityTier,
        failures: &mut Vec<ProviderAttempt>,
    ) -> Option<Resolution> {
        for provider in self.registry.providers() {
            let name = provider.name();
            debug!("Trying {name} at {tier}");

            let Retried { result, tries } =
                attempt(self.retry, provider.as_ref(), locator, tier).await;

            match result {
                Ok(audio) => return Some(Resolution::new(audio, name, tier, tries)),
                Err(err) => {
                    warn!("{name} failed at {tier} after {tries} tries: {err}");
                    failures.push(ProviderAttempt::failed(name, tier, tries, &err));
                }
            }
        }
        None
    }

    async fn resolve_tier_parallel(
        &self,
        locator: &Locator,
        tier: QualityTier,
        failures: &mut Vec<ProviderAttempt>,
    ) -> Option<Resolution> {
        let providers = self.registry.providers();
        let mut set = JoinSet::new();
        let mut slots = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            let provider = Arc::clone(provider);
            let locator = locator.clone();
            let retry = self.retry;
            let handle = set.spawn(async move {
                attempt(retry, provider.as_ref(), &locator, tier).await
            });
            slots.insert(handle.id(), index);
        }

        let mut tier_failures: Vec<(usize, ProviderAttempt)> = Vec::new();

        while let Some(joined) = set.join_next_with_id().await {
            let (id, retried) = match joined {
                Ok((id, retried)) => (id, retried),
                Err(join_err) => {
                    let err =
                        ProviderError::transient(format!("provider task failed: {join_err}"));
                    (
                        join_err.id(),
                        Retried {
                            result: Err(err),
                            tries: 1,
                        },
                    )
                }
            };
            let Some(&index) = slots.get(&id) else {
                continue;
            };
            let name = providers[index].name();

            match retried.result {
                Ok(audio) => {
                    set.abort_all();
                    return Some(Resolution::new(audio, name, tier, retried.tries));
                }
                Err(err) => {
                    warn!(
                        "{name} failed at {tier} after {} tries: {err}",
                        retried.tries
                    );
                    tier_failures.push((
                        index,
                        ProviderAttempt::failed(name, tier, retried.tries, &err),
                    ));
                }
            }
        }

        tier_failures.sort_by_key(|(index, _)| *index);
        failures.extend(tier_failures.into_iter().map(|(_, attempt)| attempt));
        None
    }
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("providers", &self.registry.names())
            .field("retry", &self.retry)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// One (tier, provider) slot through the retry wrapper, with payload validation.
async fn attempt(
    retry: RetryPolicy,
    provider: &dyn AudioProvider,
    locator: &Locator,
    tier: QualityTier,
) -> Retried<ResolvedAudio> {
    retry
        .run(provider.name(), move || async move {
            provider.resolve(locator, tier).await?.validate()
        })
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadenza_core::{AttemptOutcome, FailureKind};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    const URL: &str = "https://www.youtube.com/watch?v=abc";

    /// Invocation log shared by scripted providers, plus the names of calls
    /// that ran to completion.
    #[derive(Clone, Default)]
    struct Calls {
        started: Arc<Mutex<Vec<(String, u32)>>>,
        finished: Arc<Mutex<Vec<String>>>,
    }

    impl Calls {
        fn push(&self, provider: &str, kbps: u32) {
            self.started
                .lock()
                .unwrap()
                .push((provider.to_string(), kbps));
        }

        fn finish(&self, provider: &str) {
            self.finished.lock().unwrap().push(provider.to_string());
        }

        fn snapshot(&self) -> Vec<(String, u32)> {
            self.started.lock().unwrap().clone()
        }

        fn finished(&self, provider: &str) -> usize {
            self.finished
                .lock()
                .unwrap()
                .iter()
                .filter(|p| *p == provider)
                .count()
        }

        fn count(&self, provider: &str) -> usize {
            self.snapshot().iter().filter(|(p, _)| p == provider).count()
        }
    }

    #[derive(Clone, Copy)]
    enum Script {
        AlwaysFail,
        SucceedAt(QualityTier),
        FailOnceThenSucceed,
        InvalidPayload,
        SlowSuccess(Duration),
        SlowFail(Duration),
    }

    struct Scripted {
        name: &'static str,
        script: Script,
        calls: Calls,
    }

    impl Scripted {
        fn audio(&self, quality: QualityTier) -> ResolvedAudio {
            ResolvedAudio::new(format!(
                "https://cdn.example/{}/{}.mp3",
                self.name,
                quality.kbps()
            ))
            .with_filename("song.mp3")
        }
    }

    #[async_trait]
    impl AudioProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn resolve(
            &self,
            _locator: &Locator,
            quality: QualityTier,
        ) -> std::result::Result<ResolvedAudio, ProviderError> {
            let previous = self.calls.count(self.name);
            self.calls.push(self.name, quality.kbps());

            match self.script {
                Script::AlwaysFail => Err(ProviderError::Transient {
                    status: Some(503),
                    message: format!("{} is down", self.name),
                }),
                Script::SucceedAt(tier) if tier == quality => Ok(self.audio(quality)),
                Script::SucceedAt(_) => Err(ProviderError::invalid("quality not offered")),
                Script::FailOnceThenSucceed if previous == 0 => {
                    Err(ProviderError::transient("connection reset"))
                }
                Script::FailOnceThenSucceed => Ok(self.audio(quality)),
                Script::InvalidPayload => Ok(ResolvedAudio::new("")),
                Script::SlowSuccess(delay) => {
                    tokio::time::sleep(delay).await;
                    self.calls.finish(self.name);
                    Ok(self.audio(quality))
                }
                Script::SlowFail(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ProviderError::transient("slow failure"))
                }
            }
        }
    }

    fn engine(calls: &Calls, scripts: &[(&'static str, Script)]) -> ResolutionEngine {
        let providers = scripts
            .iter()
            .map(|&(name, script)| {
                Arc::new(Scripted {
                    name,
                    script,
                    calls: calls.clone(),
                }) as Arc<dyn AudioProvider>
            })
            .collect();
        ResolutionEngine::new(ProviderRegistry::from_providers(providers))
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_locator_makes_no_calls() {
        let calls = Calls::default();
        let engine = engine(&calls, &[("A", Script::AlwaysFail), ("B", Script::AlwaysFail)]);

        for locator in ["", "   ", "ftp://example.com/a"] {
            let err = engine
                .resolve(&ResolutionRequest::new(locator))
                .await
                .unwrap_err();
            assert!(err.is_input_error());
        }
        assert!(calls.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preferred_tier_failover_to_second_provider() {
        let calls = Calls::default();
        let engine = engine(
            &calls,
            &[
                ("A", Script::AlwaysFail),
                ("B", Script::SucceedAt(QualityTier::Kbps256)),
            ],
        );

        let request = ResolutionRequest::new(URL).with_preferred_quality(QualityTier::Kbps256);
        let resolution = engine.resolve(&request).await.unwrap();

        assert_eq!(resolution.quality(), QualityTier::Kbps256);
        assert_eq!(resolution.provider(), "B");
        assert_eq!(resolution.audio.url, "https://cdn.example/B/256.mp3");
        assert_eq!(
            calls.snapshot(),
            vec![
                ("A".to_string(), 256),
                ("A".to_string(), 256),
                ("B".to_string(), 256)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_circuit_on_first_success() {
        let calls = Calls::default();
        let engine = engine(
            &calls,
            &[
                ("A", Script::SucceedAt(QualityTier::Kbps128)),
                ("B", Script::SucceedAt(QualityTier::Kbps128)),
                ("C", Script::AlwaysFail),
            ],
        );

        let resolution = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap();
        assert_eq!(resolution.quality(), QualityTier::Kbps128);
        assert_eq!(resolution.provider(), "A");

        let log = calls.snapshot();
        assert_eq!(log.last().unwrap(), &("A".to_string(), 128));
        assert!(log.iter().all(|(_, kbps)| *kbps != 92));
        assert!(!log.contains(&("B".to_string(), 128)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_every_slot_in_order() {
        let calls = Calls::default();
        let engine = engine(&calls, &[("A", Script::AlwaysFail), ("B", Script::AlwaysFail)]);

        let err = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap_err();
        let attempts = err.attempts();

        assert_eq!(attempts.len(), 8);
        let order: Vec<(&str, u32)> = attempts
            .iter()
            .map(|a| (a.provider.as_str(), a.quality.kbps()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", 320),
                ("B", 320),
                ("A", 256),
                ("B", 256),
                ("A", 128),
                ("B", 128),
                ("A", 92),
                ("B", 92)
            ]
        );
        for attempt in attempts {
            assert_eq!(attempt.outcome, AttemptOutcome::Failure);
            assert_eq!(attempt.tries, 2);
            let error = attempt.error.as_ref().unwrap();
            assert_eq!(error.kind, FailureKind::Transient);
            assert_eq!(error.status, Some(503));
        }
        assert_eq!(calls.snapshot().len(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_leaves_no_diagnostic() {
        let calls = Calls::default();
        let engine = engine(&calls, &[("flaky", Script::FailOnceThenSucceed)]);

        let start = Instant::now();
        let resolution = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap();

        assert_eq!(resolution.quality(), QualityTier::Kbps320);
        assert_eq!(resolution.provider(), "flaky");
        assert_eq!(resolution.attempt.tries, 2);
        assert_eq!(calls.count("flaky"), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_payload_is_recorded_and_skipped() {
        let calls = Calls::default();
        let engine = engine(
            &calls,
            &[
                ("broken", Script::InvalidPayload),
                ("good", Script::SucceedAt(QualityTier::Kbps320)),
            ],
        )
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO));

        let resolution = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap();
        assert_eq!(resolution.provider(), "good");
        assert_eq!(calls.count("broken"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_exhausts_immediately() {
        let engine = ResolutionEngine::new(ProviderRegistry::new());
        let err = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap_err();
        assert!(matches!(err, Error::Exhausted(ref a) if a.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_first_success_aborts_slow_provider() {
        let calls = Calls::default();
        let engine = engine(
            &calls,
            &[
                ("slow", Script::SlowSuccess(Duration::from_secs(30))),
                ("fast", Script::SucceedAt(QualityTier::Kbps320)),
            ],
        )
        .with_strategy(Strategy::Parallel);

        let start = Instant::now();
        let resolution = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap();

        assert_eq!(resolution.provider(), "fast");
        assert_eq!(resolution.quality(), QualityTier::Kbps320);
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(calls.count("slow"), 1);

        // Let the slow call's deadline pass; an aborted task never finishes.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.finished("slow"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_failures_keep_provider_order() {
        let calls = Calls::default();
        let engine = engine(
            &calls,
            &[
                ("A", Script::SlowFail(Duration::from_secs(5))),
                ("B", Script::AlwaysFail),
            ],
        )
        .with_strategy(Strategy::Parallel)
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO));

        let err = engine.resolve(&ResolutionRequest::new(URL)).await.unwrap_err();
        let order: Vec<(&str, u32)> = err
            .attempts()
            .iter()
            .map(|a| (a.provider.as_str(), a.quality.kbps()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", 320),
                ("B", 320),
                ("A", 256),
                ("B", 256),
                ("A", 128),
                ("B", 128),
                ("A", 92),
                ("B", 92)
            ]
        );
    }

    #[test]
    fn test_strategy_deserializes_lowercase() {
        let strategy: Strategy = serde_json::from_str("\"parallel\"").unwrap();
        assert_eq!(strategy, Strategy::Parallel);
        assert_eq!(Strategy::default(), Strategy::Sequential);
    }
}
