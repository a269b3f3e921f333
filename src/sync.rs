//! Client sync engine: optimistic local mutations reconciled with a server.
//!
//! The engine keeps two views of the record map: `confirmed` is the last
//! state the server acknowledged, `speculative` is what the user currently
//! sees. A toggle mutates `speculative` at once; persistence follows the
//! configured strategy. Immediate posts every toggle on its own and adopts
//! the server's echo. Debounced accumulates toggles and writes the whole map
//! after a quiet window, restarting the window on every new toggle.
//!
//! Rollback is all or nothing: `speculative := confirmed`. A debounced burst
//! coalesces into one write, so on failure there is no way to tell which
//! pieces would have landed; everything since the last acknowledgment
//! reverts together.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::RecordCache;
use crate::error::{Error, Result};
use crate::records::{is_valid_date_key, next_records, DayRecord, RecordMap, TaskKey};

/// When a toggle reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Every toggle is posted on its own, serialized in order.
    Immediate,
    /// Toggles accumulate; one whole-map write goes out after a quiet window.
    #[default]
    Debounced,
}

impl FromStr for SyncStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "immediate" => Ok(SyncStrategy::Immediate),
            "debounced" => Ok(SyncStrategy::Debounced),
            other => Err(Error::InvalidArgument(format!(
                "unknown strategy '{other}': expected immediate or debounced"
            ))),
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Immediate => write!(f, "immediate"),
            SyncStrategy::Debounced => write!(f, "debounced"),
        }
    }
}

/// Server's authoritative answer to a single-task toggle.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// The affected day after the server applied the toggle.
    pub record: DayRecord,
    /// The full map after the write.
    pub records: RecordMap,
}

/// Transport the engine talks through. Production uses `HttpApi`; tests use
/// an in-memory fake.
#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn fetch_records(&self) -> Result<RecordMap>;
    async fn put_records(&self, records: &RecordMap) -> Result<RecordMap>;
    async fn toggle_record(
        &self,
        date: &str,
        task: TaskKey,
        value: Option<bool>,
    ) -> Result<ToggleOutcome>;
}

#[derive(Default)]
struct EngineState {
    /// Last state the server acknowledged.
    confirmed: RecordMap,
    /// What the user sees; includes unsynced toggles.
    speculative: RecordMap,
    /// Payload awaiting a debounced write.
    pending: Option<RecordMap>,
    /// Bumped on every debounced toggle. A timer only sends if the
    /// generation it was scheduled for is still current, and a completed
    /// write only clears `pending` if no newer toggle arrived while the
    /// request was in flight.
    generation: u64,
    /// Live debounce timer, if any.
    timer: Option<JoinHandle<()>>,
    syncing: bool,
    needs_auth: bool,
    last_error: Option<String>,
}

struct EngineInner {
    api: Arc<dyn RecordsApi>,
    cache: Option<RecordCache>,
    strategy: SyncStrategy,
    delay: Duration,
    /// Serializes network operations. A timer that fires while another
    /// request is outbound waits its turn instead of racing it.
    op_lock: tokio::sync::Mutex<()>,
    state: Mutex<EngineState>,
}

/// Optimistic sync engine. One instance per client session; requires a tokio
/// runtime for the debounce timer.
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Build an engine. A cache, when given, pre-populates both views so the
    /// caller has data before the first fetch completes.
    pub fn new(
        api: Arc<dyn RecordsApi>,
        cache: Option<RecordCache>,
        strategy: SyncStrategy,
        delay: Duration,
    ) -> Self {
        let mut state = EngineState::default();
        if let Some(cache) = &cache {
            if let Some(records) = cache.load() {
                debug!(dates = records.len(), "pre-populated from cache");
                state.confirmed = records.clone();
                state.speculative = records;
            }
        }
        SyncEngine {
            inner: Arc::new(EngineInner {
                api,
                cache,
                strategy,
                delay,
                op_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(state),
            }),
        }
    }

    /// Current view, unsynced toggles included.
    pub fn records(&self) -> RecordMap {
        self.inner.state().speculative.clone()
    }

    pub fn syncing(&self) -> bool {
        self.inner.state().syncing
    }

    pub fn needs_auth(&self) -> bool {
        self.inner.state().needs_auth
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state().last_error.clone()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.state().pending.is_some()
    }

    /// Fetch the server's copy and adopt it as both views.
    pub async fn refresh(&self) -> Result<RecordMap> {
        let _op = self.inner.op_lock.lock().await;
        match self.inner.api.fetch_records().await {
            Ok(records) => {
                {
                    let mut st = self.inner.state();
                    st.confirmed = records.clone();
                    st.speculative = records.clone();
                    st.needs_auth = false;
                    st.last_error = None;
                }
                if let Some(cache) = &self.inner.cache {
                    cache.save(&records);
                }
                Ok(records)
            }
            Err(err) => {
                self.inner.note_failure(&err);
                Err(err)
            }
        }
    }

    /// Flip one task. Returns the new local flag.
    pub async fn toggle(&self, date: &str, task: TaskKey) -> Result<bool> {
        self.set_task(date, task, None).await
    }

    /// Flip or explicitly set one task. Returns the new local flag.
    pub async fn set_task(&self, date: &str, task: TaskKey, value: Option<bool>) -> Result<bool> {
        if !is_valid_date_key(date) {
            return Err(Error::InvalidArgument(format!(
                "invalid date '{date}': expected YYYY-MM-DD"
            )));
        }
        match self.inner.strategy {
            SyncStrategy::Immediate => self.toggle_immediate(date, task, value).await,
            SyncStrategy::Debounced => Ok(self.toggle_debounced(date, task, value)),
        }
    }

    async fn toggle_immediate(
        &self,
        date: &str,
        task: TaskKey,
        value: Option<bool>,
    ) -> Result<bool> {
        let _op = self.inner.op_lock.lock().await;
        {
            let mut st = self.inner.state();
            let (next, _) = next_records(&st.speculative, date, task, value);
            st.speculative = next;
            st.syncing = true;
        }
        let result = self.inner.api.toggle_record(date, task, value).await;
        let mut st = self.inner.state();
        st.syncing = false;
        match result {
            Ok(outcome) => {
                // The server reconciled against its own copy; adopt its
                // answer verbatim.
                st.confirmed = outcome.records.clone();
                st.speculative = outcome.records.clone();
                let flag = outcome.record.get(&task).copied().unwrap_or(false);
                drop(st);
                if let Some(cache) = &self.inner.cache {
                    cache.save(&outcome.records);
                }
                Ok(flag)
            }
            Err(err) => {
                st.speculative = st.confirmed.clone();
                st.record_failure(&err);
                Err(err)
            }
        }
    }

    fn toggle_debounced(&self, date: &str, task: TaskKey, value: Option<bool>) -> bool {
        let mut st = self.inner.state();
        let (next, day) = next_records(&st.speculative, date, task, value);
        let flag = day.get(&task).copied().unwrap_or(false);
        st.speculative = next.clone();
        st.pending = Some(next);
        st.generation += 1;
        EngineInner::schedule_flush(&self.inner, &mut st);
        flag
    }

    /// Cancel any pending timer and write the accumulated payload now.
    /// Returns whether a write went out.
    pub async fn flush(&self) -> Result<bool> {
        self.inner.flush_pending(None).await
    }

    /// Cancel the debounce timer without writing. Unsynced toggles stay in
    /// the speculative view but will not reach the server.
    pub fn shutdown(&self) {
        let mut st = self.inner.state();
        if let Some(timer) = st.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EngineState {
    fn record_failure(&mut self, err: &Error) {
        match err {
            Error::Unauthorized => self.needs_auth = true,
            other => self.last_error = Some(other.to_string()),
        }
    }
}

impl EngineInner {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_failure(&self, err: &Error) {
        let mut st = self.state();
        st.record_failure(err);
    }

    /// Restart the debounce window: kill the previous timer and arm a new
    /// one for the current generation. The deadline is fixed here, at
    /// schedule time, so the window measures from the toggle rather than
    /// from whenever the runtime first polls the task. The task holds only
    /// a weak handle so a dropped engine cannot be kept alive by its own
    /// timer.
    fn schedule_flush(inner: &Arc<EngineInner>, st: &mut EngineState) {
        if let Some(timer) = st.timer.take() {
            timer.abort();
        }
        let generation = st.generation;
        let deadline = tokio::time::Instant::now() + inner.delay;
        let weak = Arc::downgrade(inner);
        st.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                // Failures are recorded in engine state, not surfaced here.
                let _ = inner.flush_pending(Some(generation)).await;
            }
        }));
    }

    /// Send the pending payload. `fired` carries the generation a timer was
    /// armed for; `None` marks an explicit flush. Holding the op lock before
    /// touching state means an in-flight request is never raced and never
    /// cancelled, only waited out.
    async fn flush_pending(&self, fired: Option<u64>) -> Result<bool> {
        let _op = self.op_lock.lock().await;

        let (payload, generation) = {
            let mut st = self.state();
            match fired {
                Some(generation) => {
                    // A newer toggle re-armed the window; its timer owns the
                    // fresher payload.
                    if st.generation != generation {
                        return Ok(false);
                    }
                    st.timer = None;
                }
                None => {
                    if let Some(timer) = st.timer.take() {
                        timer.abort();
                    }
                }
            }
            let Some(payload) = st.pending.clone() else {
                return Ok(false);
            };
            st.syncing = true;
            (payload, st.generation)
        };

        debug!(dates = payload.len(), "syncing records");
        let result = self.api.put_records(&payload).await;

        let mut st = self.state();
        st.syncing = false;
        match result {
            Ok(written) => {
                st.confirmed = written.clone();
                if st.generation == generation {
                    st.pending = None;
                }
                // A toggle that landed while the request was in flight keeps
                // its own pending payload and timer; it flushes next.
                drop(st);
                if let Some(cache) = &self.cache {
                    cache.save(&written);
                }
                Ok(true)
            }
            Err(err) => {
                debug!(error = %err, "sync failed, rolling back");
                st.speculative = st.confirmed.clone();
                st.pending = None;
                if let Some(timer) = st.timer.take() {
                    timer.abort();
                }
                st.record_failure(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[derive(Clone, Copy)]
    enum Failure {
        Unauthorized,
        Storage,
    }

    impl Failure {
        fn to_error(self) -> Error {
            match self {
                Failure::Unauthorized => Error::Unauthorized,
                Failure::Storage => Error::Storage("blob write: status 500".to_string()),
            }
        }
    }

    /// In-memory server double. `fail_with` makes every call fail until
    /// cleared; `put_delay` holds PUTs open to model in-flight requests.
    #[derive(Default)]
    struct FakeApi {
        server: tokio::sync::Mutex<RecordMap>,
        puts: StdMutex<Vec<RecordMap>>,
        fetch_calls: AtomicU64,
        toggle_calls: AtomicU64,
        fail_with: StdMutex<Option<Failure>>,
        put_delay: StdMutex<Option<Duration>>,
    }

    impl FakeApi {
        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        fn last_put(&self) -> Option<RecordMap> {
            self.puts.lock().unwrap().last().cloned()
        }

        fn fail_with(&self, failure: Option<Failure>) {
            *self.fail_with.lock().unwrap() = failure;
        }

        fn delay_puts(&self, delay: Duration) {
            *self.put_delay.lock().unwrap() = Some(delay);
        }

        async fn seed(&self, records: RecordMap) {
            *self.server.lock().await = records;
        }

        fn failure(&self) -> Option<Failure> {
            *self.fail_with.lock().unwrap()
        }
    }

    #[async_trait]
    impl RecordsApi for FakeApi {
        async fn fetch_records(&self) -> Result<RecordMap> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = self.failure() {
                return Err(failure.to_error());
            }
            Ok(self.server.lock().await.clone())
        }

        async fn put_records(&self, records: &RecordMap) -> Result<RecordMap> {
            let delay = *self.put_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(failure) = self.failure() {
                return Err(failure.to_error());
            }
            self.puts.lock().unwrap().push(records.clone());
            *self.server.lock().await = records.clone();
            Ok(records.clone())
        }

        async fn toggle_record(
            &self,
            date: &str,
            task: TaskKey,
            value: Option<bool>,
        ) -> Result<ToggleOutcome> {
            self.toggle_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = self.failure() {
                return Err(failure.to_error());
            }
            let mut server = self.server.lock().await;
            let (next, day) = next_records(&server, date, task, value);
            *server = next.clone();
            Ok(ToggleOutcome {
                record: day,
                records: next,
            })
        }
    }

    fn debounced_engine(api: Arc<FakeApi>) -> SyncEngine {
        SyncEngine::new(api, None, SyncStrategy::Debounced, Duration::from_millis(3000))
    }

    fn base_records() -> RecordMap {
        let mut day = DayRecord::new();
        day.insert(TaskKey::EarlySleep, true);
        let mut records = RecordMap::new();
        records.insert("2025-02-28".to_string(), day);
        records
    }

    /// Let spawned tasks run to their next await point.
    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(millis: u64) {
        tokio::time::advance(Duration::from_millis(millis)).await;
        settle().await;
    }

    #[test]
    fn strategy_parses_and_prints() {
        assert_eq!("immediate".parse::<SyncStrategy>().unwrap(), SyncStrategy::Immediate);
        assert_eq!("debounced".parse::<SyncStrategy>().unwrap(), SyncStrategy::Debounced);
        assert!("eventually".parse::<SyncStrategy>().is_err());
        assert_eq!(SyncStrategy::Debounced.to_string(), "debounced");
        assert_eq!(SyncStrategy::default(), SyncStrategy::Debounced);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_burst_coalesces_into_one_put() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        advance(500).await;
        engine.toggle("2025-03-01", TaskKey::EarlySleep).await.unwrap();
        advance(500).await;
        engine.toggle("2025-03-02", TaskKey::Takeout).await.unwrap();

        // The window restarts on every toggle: due 3000ms after the last
        // one, so nothing has gone out just before that.
        advance(2999).await;
        assert_eq!(api.put_count(), 0);
        assert!(engine.has_pending());

        advance(1).await;
        assert_eq!(api.put_count(), 1);
        assert!(!engine.has_pending());

        let sent = api.last_put().unwrap();
        assert_eq!(sent, engine.records());
        assert_eq!(sent["2025-03-01"][&TaskKey::EarlyWake], true);
        assert_eq!(sent["2025-03-01"][&TaskKey::EarlySleep], true);
        assert_eq!(sent["2025-03-02"][&TaskKey::Takeout], true);
    }

    #[tokio::test(start_paused = true)]
    async fn each_toggle_restarts_the_quiet_window() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        advance(2900).await;
        assert_eq!(api.put_count(), 0);

        engine.toggle("2025-03-01", TaskKey::EatOut).await.unwrap();
        advance(2900).await;
        assert_eq!(api.put_count(), 0);

        advance(100).await;
        assert_eq!(api.put_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_toggle_nets_to_false_but_still_writes() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        assert!(engine.toggle("2025-03-01", TaskKey::Takeout).await.unwrap());
        assert!(!engine.toggle("2025-03-01", TaskKey::Takeout).await.unwrap());

        advance(3000).await;
        assert_eq!(api.put_count(), 1);
        let sent = api.last_put().unwrap();
        assert_eq!(sent["2025-03-01"][&TaskKey::Takeout], false);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_malformed_dates_locally() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        let err = engine.toggle("2025-3-1", TaskKey::EarlyWake).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(engine.records().is_empty());
        advance(10_000).await;
        assert_eq!(api.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sync_rolls_back_the_whole_burst() {
        let api = Arc::new(FakeApi::default());
        api.seed(base_records()).await;
        let engine = debounced_engine(api.clone());
        engine.refresh().await.unwrap();

        api.fail_with(Some(Failure::Storage));
        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        engine.toggle("2025-03-01", TaskKey::EarlySleep).await.unwrap();
        engine.toggle("2025-03-02", TaskKey::EatOut).await.unwrap();

        let err = engine.flush().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        // Everything since the last acknowledged state reverts together.
        assert_eq!(engine.records(), base_records());
        assert!(!engine.has_pending());
        assert!(engine.last_error().is_some());
        assert!(!engine.needs_auth());

        advance(10_000).await;
        assert_eq!(api.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_sync_flags_needs_auth() {
        let api = Arc::new(FakeApi::default());
        api.seed(base_records()).await;
        let engine = debounced_engine(api.clone());
        engine.refresh().await.unwrap();

        api.fail_with(Some(Failure::Unauthorized));
        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();

        advance(3000).await;
        assert!(engine.needs_auth());
        assert_eq!(engine.records(), base_records());
        assert!(!engine.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_during_inflight_put_is_not_lost() {
        let api = Arc::new(FakeApi::default());
        api.delay_puts(Duration::from_millis(1000));
        let engine = debounced_engine(api.clone());

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        // Timer fires at 3000 and the PUT stays open until 4000.
        advance(3000).await;
        assert!(engine.syncing());

        // Lands mid-flight; must survive the first request completing.
        advance(500).await;
        engine.toggle("2025-03-01", TaskKey::EarlySleep).await.unwrap();

        advance(500).await;
        assert_eq!(api.put_count(), 1);
        assert!(engine.has_pending());
        assert_eq!(engine.records()["2025-03-01"][&TaskKey::EarlySleep], true);

        // Second window was armed at 3500 and fires at 6500; that request
        // holds open for another 1000 before landing.
        advance(2500).await;
        assert!(engine.syncing());
        advance(1000).await;
        assert_eq!(api.put_count(), 2);
        assert!(!engine.has_pending());
        let sent = api.last_put().unwrap();
        assert_eq!(sent["2025-03-01"][&TaskKey::EarlyWake], true);
        assert_eq!(sent["2025-03-01"][&TaskKey::EarlySleep], true);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_flush_writes_now_and_disarms_the_timer() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        assert!(engine.flush().await.unwrap());
        assert_eq!(api.put_count(), 1);

        advance(10_000).await;
        assert_eq!(api.put_count(), 1);
        assert!(!engine.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_without_pending_is_a_no_op() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());
        assert!(!engine.flush().await.unwrap());
        assert_eq!(api.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_engine_cancels_the_timer() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        drop(engine);

        advance(10_000).await;
        assert_eq!(api.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_strategy_posts_every_toggle() {
        let api = Arc::new(FakeApi::default());
        let engine = SyncEngine::new(
            api.clone(),
            None,
            SyncStrategy::Immediate,
            Duration::from_millis(3000),
        );

        assert!(engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap());
        assert!(engine.toggle("2025-03-01", TaskKey::Takeout).await.unwrap());
        assert!(!engine.toggle("2025-03-01", TaskKey::Takeout).await.unwrap());

        assert_eq!(api.toggle_calls.load(Ordering::SeqCst), 3);
        assert_eq!(api.put_count(), 0);
        assert_eq!(engine.records(), api.server.lock().await.clone());
        assert!(!engine.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_failure_reverts_the_single_toggle() {
        let api = Arc::new(FakeApi::default());
        api.seed(base_records()).await;
        let engine = SyncEngine::new(
            api.clone(),
            None,
            SyncStrategy::Immediate,
            Duration::from_millis(3000),
        );
        engine.refresh().await.unwrap();

        api.fail_with(Some(Failure::Unauthorized));
        let err = engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(engine.records(), base_records());
        assert!(engine.needs_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_adopts_server_copy_and_clears_flags() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());

        api.fail_with(Some(Failure::Storage));
        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        assert!(engine.flush().await.is_err());
        assert!(engine.last_error().is_some());

        api.fail_with(None);
        api.seed(base_records()).await;
        let fetched = engine.refresh().await.unwrap();
        assert_eq!(fetched, base_records());
        assert_eq!(engine.records(), base_records());
        assert!(engine.last_error().is_none());
        assert!(!engine.needs_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_leaves_local_view_alone() {
        let api = Arc::new(FakeApi::default());
        let engine = debounced_engine(api.clone());
        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        let before = engine.records();

        api.fail_with(Some(Failure::Unauthorized));
        assert!(engine.refresh().await.is_err());
        assert_eq!(engine.records(), before);
        assert!(engine.needs_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn cache_prepopulates_before_first_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = RecordCache::new(dir.path().join("records.json"));
        cache.save(&base_records());

        let api = Arc::new(FakeApi::default());
        let engine = SyncEngine::new(
            api.clone(),
            Some(cache),
            SyncStrategy::Debounced,
            Duration::from_millis(3000),
        );

        assert_eq!(engine.records(), base_records());
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_flush_updates_the_cache() {
        let dir = TempDir::new().unwrap();
        let cache = RecordCache::new(dir.path().join("records.json"));

        let api = Arc::new(FakeApi::default());
        let engine = SyncEngine::new(
            api.clone(),
            Some(cache.clone()),
            SyncStrategy::Debounced,
            Duration::from_millis(3000),
        );

        engine.toggle("2025-03-01", TaskKey::EarlyWake).await.unwrap();
        engine.flush().await.unwrap();

        assert_eq!(cache.load(), Some(engine.records()));
    }
}
