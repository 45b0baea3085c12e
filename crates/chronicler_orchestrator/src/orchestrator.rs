//! The tick-driven request orchestrator.

use crate::{
    ChainFailure, ChroniclerConfig, FailoverChain, PriorityRequestQueue, ProviderHealth,
    ProviderSuccess, QueueDepths,
};
use chronicler_cache::{CacheStats, ResponseCache};
use chronicler_core::{
    CallType, Clock, ContentKey, GenerationResponse, ManualClock, Priority, RandomSource, Request,
    RequestId, ResponseSource, SeededRandom, TokenUsage,
};
use chronicler_error::{
    ChroniclerResult, ConfigError, QueueError, QueueErrorKind, ReplayError, ReplayErrorKind,
};
use chronicler_interface::LlmProvider;
use chronicler_models::{OFFLINE_MODEL_NAME, build_provider};
use chronicler_rate_limit::{ErrorRecoveryManager, ProviderQuota, RecoveryAction, TokenBucket};
use chronicler_replay::{
    CallRecord, ReplayComparison, ReplayLog, ReplayLogger, ReplayMode, ReplayPlayer,
    ReplayValidator,
};
use chronicler_usage::{LlmMetrics, ModelPricing, UsageReport, UsageTracker};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, instrument, warn};

/// Purpose recorded for backoff jitter draws.
pub const JITTER_PURPOSE: &str = "backoff_jitter";

/// Purpose recorded for offline template draws.
pub const OFFLINE_TEMPLATE_PURPOSE: &str = "offline_template";

/// A resolved submission, delivered on the completion channel.
#[derive(Debug)]
pub struct Completion {
    /// Id returned by [`Orchestrator::submit`]
    pub request_id: RequestId,
    /// Tick the request resolved on
    pub tick: u64,
    /// Purpose of the request
    pub call_type: CallType,
    /// The response, or why there is none
    pub result: ChroniclerResult<GenerationResponse>,
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Last tick processed
    pub tick: u64,
    /// Requests waiting per lane
    pub queue: QueueDepths,
    /// Tokens left in the provider-wide bucket
    pub tokens_available: f64,
    /// Whether calls are routed straight to the offline fallback
    pub degraded: bool,
    /// Recent error rate
    pub error_rate: f64,
    /// Health of every network provider
    pub providers: Vec<ProviderHealth>,
    /// Cache counters
    pub cache: CacheStats,
    /// Cumulative cost in USD
    pub total_cost_usd: f64,
    /// Whether the budget ceiling has been passed
    pub budget_exceeded: bool,
    /// Session mode
    pub replay_mode: ReplayMode,
    /// Divergences seen while replaying
    pub divergences: usize,
}

/// What happened to one network attempt.
enum Step {
    Resolved(ChroniclerResult<GenerationResponse>),
    RetryImmediately,
    RetryLater(Duration),
}

/// Random values for one decision, drawn live or from the replay log.
struct DecisionSource<'a> {
    live: &'a mut SeededRandom,
    player: Option<&'a mut ReplayPlayer>,
    tick: u64,
    purpose: &'static str,
    drawn: Vec<u64>,
    error: Option<ReplayError>,
}

impl RandomSource for DecisionSource<'_> {
    fn next_u64(&mut self) -> u64 {
        let value = match self.player.as_deref_mut() {
            None => self.live.next_u64(),
            Some(player) => match player.next_random(self.tick, self.purpose) {
                Ok(value) => value,
                Err(e) => {
                    self.error.get_or_insert(e);
                    return 0;
                }
            },
        };
        self.drawn.push(value);
        value
    }
}

/// Coordinates queueing, rate limiting, caching, failover, accounting and
/// replay for one simulation session.
///
/// The simulation drives it once per tick with
/// [`process_queue`](Self::process_queue); resolved submissions arrive on the
/// completion channel returned by the constructor, in resolution order, on
/// the caller's task. Each component owns its own state and is only mutated
/// through its methods.
///
/// Time is read from a manual clock set to `tick * tick_duration_ms` at the
/// start of every tick, so a session behaves identically however fast the
/// simulation runs.
#[derive(Debug)]
pub struct Orchestrator {
    config: ChroniclerConfig,
    clock: ManualClock,
    queue: PriorityRequestQueue,
    bucket: TokenBucket,
    recovery: ErrorRecoveryManager,
    chain: FailoverChain,
    cache: ResponseCache,
    usage: UsageTracker,
    metrics: LlmMetrics,
    random: SeededRandom,
    logger: Option<ReplayLogger>,
    player: Option<ReplayPlayer>,
    divergences: Vec<ReplayError>,
    completions: UnboundedSender<Completion>,
    next_request_id: u64,
    current_tick: u64,
    budget_fallback_logged: bool,
}

impl Orchestrator {
    /// Build an orchestrator over the providers described by the config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid or a provider
    /// cannot be constructed, and a replay error if replay mode is set and
    /// the log cannot be read.
    pub fn from_config(
        config: ChroniclerConfig,
    ) -> ChroniclerResult<(Self, UnboundedReceiver<Completion>)> {
        config.validate()?;
        let providers = config
            .providers()
            .iter()
            .map(build_provider)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(config, providers)
    }

    /// Build an orchestrator over explicit providers, in failover order.
    ///
    /// Tier limits are taken from `[[providers]]` entries with a matching
    /// name. In replay mode the log is read from `replay.log_path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no providers are given, or a replay
    /// error if the replay log cannot be read.
    pub fn new(
        config: ChroniclerConfig,
        providers: Vec<Arc<dyn LlmProvider>>,
    ) -> ChroniclerResult<(Self, UnboundedReceiver<Completion>)> {
        let log = match config.replay().mode() {
            ReplayMode::Replay => {
                let path = config
                    .replay()
                    .log_path()
                    .as_ref()
                    .ok_or_else(|| ConfigError::new("Replay mode requires replay.log_path"))?;
                Some(ReplayLog::load(path)?)
            }
            ReplayMode::Off | ReplayMode::Record => None,
        };
        Self::build(config, providers, log)
    }

    /// Build an orchestrator that answers every call from `log`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no providers are given.
    pub fn replaying(
        config: ChroniclerConfig,
        providers: Vec<Arc<dyn LlmProvider>>,
        log: ReplayLog,
    ) -> ChroniclerResult<(Self, UnboundedReceiver<Completion>)> {
        let replay = config.replay().clone().with_mode(ReplayMode::Replay);
        Self::build(config.with_replay(replay), providers, Some(log))
    }

    #[instrument(skip_all, fields(providers = providers.len(), mode = %config.replay().mode()))]
    fn build(
        config: ChroniclerConfig,
        providers: Vec<Arc<dyn LlmProvider>>,
        log: Option<ReplayLog>,
    ) -> ChroniclerResult<(Self, UnboundedReceiver<Completion>)> {
        if providers.is_empty() {
            return Err(ConfigError::new("No providers configured").into());
        }

        let clock = ManualClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());

        let metrics = LlmMetrics::get().clone();
        let mut usage = UsageTracker::new(config.budget().clone()).with_metrics(metrics.clone());
        usage.register_pricing(OFFLINE_MODEL_NAME, ModelPricing::free());
        let mut chain = FailoverChain::new(config.failover().clone(), shared.clone());
        for provider in providers {
            let model = provider.model_name().to_string();
            match config.pricing_for(&model) {
                Some(pricing) => usage.register_pricing(&model, pricing),
                None if !usage.has_pricing(&model) => {
                    warn!(model = %model, "No pricing configured, accounting at zero cost");
                    usage.register_pricing(&model, ModelPricing::free());
                }
                None => {}
            }
            let quota = ProviderQuota::per_minute(config.provider_rpm(provider.provider_name()));
            chain.add_provider(provider, quota);
        }

        let player = log.map(ReplayPlayer::new);
        let seed = player
            .as_ref()
            .map_or(*config.replay().seed(), ReplayPlayer::seed);
        let logger = match config.replay().mode() {
            ReplayMode::Off => None,
            ReplayMode::Replay => Some(ReplayLogger::new(seed)),
            ReplayMode::Record => {
                let mut logger = ReplayLogger::new(seed);
                if let Some(path) = config.replay().log_path() {
                    logger = logger.with_path(path.clone());
                }
                if let Some(every) = config.replay().flush_every_ticks() {
                    logger = logger.with_flush_every_ticks(*every);
                }
                Some(logger)
            }
        };

        let (completions, receiver) = unbounded_channel();
        info!(seed, "Orchestrator ready");
        let orchestrator = Self {
            queue: PriorityRequestQueue::new(config.queue().clone()),
            bucket: TokenBucket::from_config(config.rate_limit(), shared.clone()),
            recovery: ErrorRecoveryManager::new(
                config.recovery().clone(),
                config.backoff().clone(),
                shared.clone(),
            ),
            cache: ResponseCache::new(config.cache().clone(), shared),
            chain,
            usage,
            metrics,
            random: SeededRandom::new(seed),
            logger,
            player,
            divergences: Vec::new(),
            completions,
            next_request_id: 1,
            current_tick: 0,
            budget_fallback_logged: false,
            clock,
            config,
        };
        Ok((orchestrator, receiver))
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = RequestId::from(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    fn advance_to(&mut self, tick: u64) {
        self.current_tick = self.current_tick.max(tick);
        self.clock.set(self.config.timing().clock_at(tick));
    }

    /// Queue a request for dispatch on a later tick.
    ///
    /// An identical prompt and call-type already pending is not queued
    /// twice; its id is returned and the caller should wait on that
    /// completion instead.
    ///
    /// # Errors
    ///
    /// Returns a queue error if the target lane or the whole queue is full.
    #[instrument(skip(self, prompt), fields(call_type = %call_type, priority = %priority, tick = self.current_tick))]
    pub fn submit(
        &mut self,
        prompt: impl Into<String>,
        call_type: CallType,
        priority: Priority,
    ) -> ChroniclerResult<RequestId> {
        let prompt = prompt.into();
        if let Some(existing) = self
            .queue
            .pending_for(&ContentKey::new(&prompt, call_type))
        {
            debug!(existing = %existing, "Identical request already pending");
            return Ok(existing);
        }

        let id = self.allocate_id();
        let request = Request::new(
            id,
            priority,
            prompt,
            call_type,
            self.current_tick,
            self.config.queue().timeout_ticks(priority),
            self.config.recovery().max_retries() + 1,
        );
        match self.queue.enqueue(request) {
            Ok(()) => Ok(id),
            Err(e) => match e.kind() {
                QueueErrorKind::Duplicate { existing } => Ok(RequestId::from(*existing)),
                _ => Err(e.into()),
            },
        }
    }

    /// Resolve one request immediately, bypassing the queue.
    ///
    /// Waits for the rate limiter and for retry delays, then returns the
    /// response. Provider failures are absorbed by the failover chain and the
    /// offline fallback.
    ///
    /// # Errors
    ///
    /// Returns an error only when every provider failed and offline fallback
    /// is disabled, or when a replayed session has diverged.
    #[instrument(skip(self, prompt), fields(call_type = %call_type, tick = self.current_tick))]
    pub async fn call(
        &mut self,
        prompt: impl Into<String>,
        call_type: CallType,
    ) -> ChroniclerResult<GenerationResponse> {
        let tick = self.current_tick;
        let id = self.allocate_id();
        let mut request = Request::new(
            id,
            Priority::Urgent,
            prompt,
            call_type,
            tick,
            self.config.queue().timeout_ticks(Priority::Urgent),
            self.config.recovery().max_retries() + 1,
        );

        if let Some(result) = self.serve_without_network(&request, tick) {
            return result;
        }

        loop {
            while !self.bucket.can_make_request() {
                let wait = self.bucket.wait_time().max(Duration::from_millis(1));
                debug!(wait_ms = wait.as_millis() as u64, "Waiting for rate limiter");
                self.wait(wait).await;
            }
            match self.network_step(&mut request, tick).await {
                Step::Resolved(result) => return result,
                Step::RetryImmediately => continue,
                Step::RetryLater(delay) => self.wait(delay).await,
            }
        }
    }

    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
        self.clock.advance(delay);
    }

    /// Run one tick: expire timed-out requests, then dispatch up to
    /// `dispatch_per_tick` ready requests per lane in priority order.
    ///
    /// Returns the number of completions delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if a periodic replay log flush fails.
    #[instrument(skip(self), fields(queued = self.queue.len()))]
    pub async fn process_queue(&mut self, tick: u64) -> ChroniclerResult<usize> {
        self.advance_to(tick);
        let mut delivered = 0;

        for expired in self.queue.process_timeouts(tick) {
            // Requests that already reached a provider are never dropped
            let result = if *expired.attempt_count() > 0 {
                self.resolve_exhausted(&expired, tick)
            } else {
                Err(Self::timed_out(&expired).into())
            };
            self.deliver(&expired, tick, result);
            delivered += 1;
        }

        let per_lane = *self.config.queue().dispatch_per_tick();
        'lanes: for priority in Priority::DISPATCH_ORDER {
            for _ in 0..per_lane {
                if !self.bucket.has_capacity() {
                    debug!("Rate limit reached, deferring remaining requests");
                    break 'lanes;
                }
                let Some(mut request) = self.queue.dequeue_from(priority, tick) else {
                    break;
                };

                if let Some(result) = self.serve_without_network(&request, tick) {
                    self.deliver(&request, tick, result);
                    delivered += 1;
                    continue;
                }

                loop {
                    if !self.bucket.can_make_request() {
                        request.schedule_retry(tick);
                        self.queue.requeue(request);
                        break;
                    }
                    match self.network_step(&mut request, tick).await {
                        Step::Resolved(result) => {
                            self.deliver(&request, tick, result);
                            delivered += 1;
                            break;
                        }
                        Step::RetryImmediately => continue,
                        Step::RetryLater(delay) => {
                            let retry_tick = tick + self.config.timing().ticks_for(delay).max(1);
                            if retry_tick > request.deadline_tick() {
                                debug!(
                                    id = %request.id(),
                                    retry_tick,
                                    deadline_tick = request.deadline_tick(),
                                    "Retry would land past the deadline"
                                );
                                let result = self.resolve_exhausted(&request, tick);
                                self.deliver(&request, tick, result);
                                delivered += 1;
                                break;
                            }
                            request.schedule_retry(retry_tick);
                            self.queue.requeue(request);
                            break;
                        }
                    }
                }
            }
        }

        if let Some(logger) = self.logger.as_mut() {
            logger.maybe_flush(tick)?;
        }
        Ok(delivered)
    }

    fn deliver(
        &mut self,
        request: &Request,
        tick: u64,
        result: ChroniclerResult<GenerationResponse>,
    ) {
        self.queue.release(&request.content_key());
        let completion = Completion {
            request_id: *request.id(),
            tick,
            call_type: *request.call_type(),
            result,
        };
        if self.completions.send(completion).is_err() {
            debug!(id = %request.id(), "Completion receiver dropped");
        }
    }

    /// Answer from the cache, or from the offline fallback when the network
    /// is off limits. `None` means a provider call is needed.
    fn serve_without_network(
        &mut self,
        request: &Request,
        tick: u64,
    ) -> Option<ChroniclerResult<GenerationResponse>> {
        if let Some(entry) = self.cache.get(&request.content_key()) {
            let mut response = entry.response().clone();
            response.source = ResponseSource::Cache;
            return Some(Ok(response));
        }
        if self.recovery.is_degraded() {
            debug!(id = %request.id(), "Degraded mode, serving offline response");
            return Some(self.offline(request, tick));
        }
        if self.usage.is_budget_exceeded() {
            if !self.budget_fallback_logged {
                warn!(
                    total_cost = self.usage.total_cost(),
                    "Budget exceeded, serving offline responses"
                );
                self.budget_fallback_logged = true;
            }
            return Some(self.offline(request, tick));
        }
        None
    }

    /// One pass through the failover chain followed by the recovery decision.
    async fn network_step(&mut self, request: &mut Request, tick: u64) -> Step {
        let attempt = request.begin_attempt();
        let call_type = *request.call_type();
        let prompt = request.prompt().clone();

        let outcome = match self.attempt_providers(tick, call_type, &prompt, attempt).await {
            Ok(outcome) => outcome,
            Err(e) => return Step::Resolved(Err(e.into())),
        };

        let failure = match outcome {
            Ok(success) => {
                self.recovery.record_success();
                let source = if self.player.is_some() {
                    ResponseSource::Replay
                } else {
                    ResponseSource::Provider
                };
                let response = self.account_success(success, call_type, source);
                self.cache.put(
                    request.content_key(),
                    call_type,
                    response.clone(),
                    tick,
                );
                return Step::Resolved(Ok(response));
            }
            Err(failure) => failure,
        };

        self.account_failure(&failure, call_type);
        let mut source = DecisionSource {
            live: &mut self.random,
            player: self.player.as_mut(),
            tick,
            purpose: JITTER_PURPOSE,
            drawn: Vec::new(),
            error: None,
        };
        let action = self
            .recovery
            .handle_error(&failure.error, attempt, &mut source);
        let DecisionSource { drawn, error, .. } = source;
        if let Some(logger) = self.logger.as_mut() {
            for value in drawn {
                logger.record_decision(tick, JITTER_PURPOSE, value);
            }
        }
        if let Some(e) = error {
            return Step::Resolved(Err(self.note_divergence(e).into()));
        }

        match action {
            RecoveryAction::RetryImmediately => {
                debug!(id = %request.id(), attempt, "Retrying immediately");
                Step::RetryImmediately
            }
            RecoveryAction::RetryLater(delay) => {
                warn!(
                    id = %request.id(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure.error.kind,
                    "Attempt failed, retry scheduled"
                );
                Step::RetryLater(delay)
            }
            RecoveryAction::UseFallback => Step::Resolved(self.fallback(request, tick)),
            RecoveryAction::Fail if *self.config.recovery().fallback_to_offline() => {
                Step::Resolved(self.offline(request, tick))
            }
            RecoveryAction::Fail => Step::Resolved(Err(failure.error.into())),
        }
    }

    /// Resolve a dispatched request that has no retry left before its
    /// deadline.
    fn resolve_exhausted(
        &mut self,
        request: &Request,
        tick: u64,
    ) -> ChroniclerResult<GenerationResponse> {
        match self.recovery.exhausted_action() {
            RecoveryAction::UseFallback => self.fallback(request, tick),
            _ => Err(Self::timed_out(request).into()),
        }
    }

    /// Serve a stale cache entry, or the offline template when there is none.
    fn fallback(&mut self, request: &Request, tick: u64) -> ChroniclerResult<GenerationResponse> {
        if let Some(entry) = self.cache.get_stale(&request.content_key()) {
            let mut response = entry.response().clone();
            response.source = ResponseSource::StaleCache;
            return Ok(response);
        }
        self.offline(request, tick)
    }

    fn timed_out(request: &Request) -> QueueError {
        QueueError::new(QueueErrorKind::TimedOut {
            request_id: request.id().value(),
            deadline_tick: request.deadline_tick(),
        })
    }

    /// Try the providers, or read the recorded outcome back, and log it.
    async fn attempt_providers(
        &mut self,
        tick: u64,
        call_type: CallType,
        prompt: &str,
        attempt: u32,
    ) -> Result<Result<ProviderSuccess, ChainFailure>, ReplayError> {
        let outcome = match self.player.as_mut() {
            Some(player) => match player.next_replay_response(tick, call_type, prompt) {
                Ok(record) => Ok(self.recorded_outcome(record)),
                Err(e) => Err(e),
            },
            None => Ok(self.chain.try_providers(prompt, 0).await),
        };
        let outcome = outcome.map_err(|e| self.note_divergence(e))?;

        if let Some(logger) = self.logger.as_mut() {
            let record = match &outcome {
                Ok(success) => CallRecord::success(
                    tick,
                    call_type,
                    prompt,
                    attempt,
                    &success.provider,
                    &success.response,
                    success.latency_ms,
                ),
                Err(failure) => CallRecord::failure(
                    tick,
                    call_type,
                    prompt,
                    attempt,
                    &failure.provider,
                    &failure.error,
                    failure.latency_ms,
                ),
            };
            logger.record_call(record);
        }
        Ok(outcome)
    }

    fn recorded_outcome(&self, record: CallRecord) -> Result<ProviderSuccess, ChainFailure> {
        let model = self
            .chain
            .model_of(&record.provider)
            .map_or_else(|| record.provider.clone(), str::to_string);
        match record.outcome() {
            Ok(response) => Ok(ProviderSuccess {
                provider: record.provider,
                model,
                response,
                latency_ms: record.latency_ms,
            }),
            Err(error) => Err(ChainFailure {
                provider: record.provider,
                error,
                latency_ms: record.latency_ms,
            }),
        }
    }

    /// Produce the offline response for a request and account for it.
    fn offline(&mut self, request: &Request, tick: u64) -> ChroniclerResult<GenerationResponse> {
        let call_type = *request.call_type();
        let prompt = request.prompt();
        let draw = self.draw(tick, OFFLINE_TEMPLATE_PURPOSE)?;

        let success = match self.player.as_mut() {
            Some(player) => match player.next_replay_response(tick, call_type, prompt) {
                Ok(record) => Ok(self.recorded_outcome(record)),
                Err(e) => Err(e),
            },
            None => Ok(Ok(self.chain.offline_response(prompt, call_type, draw))),
        };
        let success = match success.map_err(|e| self.note_divergence(e))? {
            Ok(success) => success,
            Err(failure) => return Err(failure.error.into()),
        };

        if let Some(logger) = self.logger.as_mut() {
            logger.record_call(
                CallRecord::success(
                    tick,
                    call_type,
                    prompt.as_str(),
                    *request.attempt_count(),
                    &success.provider,
                    &success.response,
                    success.latency_ms,
                )
                .with_random_seed(draw),
            );
        }
        Ok(self.account_success(success, call_type, ResponseSource::Offline))
    }

    fn draw(&mut self, tick: u64, purpose: &'static str) -> Result<u64, ReplayError> {
        let mut source = DecisionSource {
            live: &mut self.random,
            player: self.player.as_mut(),
            tick,
            purpose,
            drawn: Vec::new(),
            error: None,
        };
        let value = source.next_u64();
        if let Some(e) = source.error {
            return Err(self.note_divergence(e));
        }
        if let Some(logger) = self.logger.as_mut() {
            logger.record_decision(tick, purpose, value);
        }
        Ok(value)
    }

    fn note_divergence(&mut self, error: ReplayError) -> ReplayError {
        warn!(error = %error.kind(), "Replay divergence");
        self.divergences.push(error.clone());
        error
    }

    fn account_success(
        &mut self,
        success: ProviderSuccess,
        call_type: CallType,
        source: ResponseSource,
    ) -> GenerationResponse {
        let usage = success.response.usage;
        let cost_usd = self.record_usage(&success.model, call_type, usage, true);
        self.metrics.record_request(
            &success.provider,
            call_type.as_ref(),
            success.latency_ms as f64 / 1000.0,
        );
        GenerationResponse {
            text: success.response.text,
            usage,
            cost_usd,
            provider: success.provider,
            latency_ms: success.latency_ms,
            source,
        }
    }

    fn account_failure(&mut self, failure: &ChainFailure, call_type: CallType) {
        self.metrics.record_error(
            &failure.provider,
            call_type.as_ref(),
            &failure.error.category().to_string(),
        );
        if let Some(model) = self.chain.model_of(&failure.provider).map(str::to_string) {
            self.record_usage(&model, call_type, TokenUsage::default(), false);
        }
    }

    fn record_usage(
        &mut self,
        model: &str,
        call_type: CallType,
        usage: TokenUsage,
        was_successful: bool,
    ) -> f64 {
        let cost = match self.usage.record_usage(
            model,
            call_type,
            usage.input_tokens,
            usage.completion_tokens,
            was_successful,
        ) {
            Ok(cost) => cost,
            Err(e) => {
                warn!(model, error = %e, "Usage not recorded");
                0.0
            }
        };
        cost
    }

    /// Last tick processed.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Active configuration.
    pub fn config(&self) -> &ChroniclerConfig {
        &self.config
    }

    /// Requests waiting per lane.
    pub fn queue_depths(&self) -> QueueDepths {
        self.queue.depths()
    }

    /// The response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Mutable access to the cache, for invalidation.
    pub fn cache_mut(&mut self) -> &mut ResponseCache {
        &mut self.cache
    }

    /// The usage ledger.
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// The failover chain.
    pub fn chain(&self) -> &FailoverChain {
        &self.chain
    }

    /// The recovery manager.
    pub fn recovery(&self) -> &ErrorRecoveryManager {
        &self.recovery
    }

    /// Divergences seen while replaying, in the order they occurred.
    pub fn divergences(&self) -> &[ReplayError] {
        &self.divergences
    }

    /// The log recorded this session, if recording.
    pub fn replay_log(&self) -> Option<&ReplayLog> {
        self.logger.as_ref().map(ReplayLogger::log)
    }

    /// Compare this replay session with the log it plays back.
    ///
    /// Returns `None` unless replaying.
    pub fn replay_comparison(&self) -> Option<ReplayComparison> {
        let player = self.player.as_ref()?;
        let logger = self.logger.as_ref()?;
        Some(ReplayValidator::compare(player.log(), logger.log()))
    }

    /// Calls in the replay log not yet consumed.
    pub fn replay_remaining(&self) -> Option<usize> {
        self.player.as_ref().map(ReplayPlayer::remaining_calls)
    }

    /// Save the replay log to its configured path.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    pub fn save_replay(&self) -> ChroniclerResult<()> {
        if let Some(logger) = &self.logger {
            logger.save()?;
        }
        Ok(())
    }

    /// Save the replay log to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns a replay error if nothing is being recorded or the write fails.
    pub fn save_replay_to(&self, path: impl AsRef<Path>) -> ChroniclerResult<()> {
        let logger = self.logger.as_ref().ok_or_else(|| {
            ReplayError::new(ReplayErrorKind::Io("Replay recording is off".to_string()))
        })?;
        logger.save_to(path)?;
        Ok(())
    }

    /// Aggregated usage for export.
    pub fn usage_report(&self) -> UsageReport {
        self.usage.report()
    }

    /// Snapshot of queue, limiter, provider, cache and budget state.
    pub fn status(&mut self) -> OrchestratorStatus {
        OrchestratorStatus {
            tick: self.current_tick,
            queue: self.queue.depths(),
            tokens_available: self.bucket.tokens_available(),
            degraded: self.recovery.degraded_remaining().is_some(),
            error_rate: self.recovery.error_rate(),
            providers: self.chain.health(),
            cache: self.cache.stats(),
            total_cost_usd: self.usage.total_cost(),
            budget_exceeded: self.usage.is_budget_exceeded(),
            replay_mode: *self.config.replay().mode(),
            divergences: self.divergences.len(),
        }
    }
}
