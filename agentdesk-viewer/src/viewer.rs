//! Live structured log viewer
//!
//! A `LogViewer` keeps a capped, arrival-ordered view of the backend's log
//! output. Each `start()` spawns one session task that loads the latest
//! history page, opens the event stream and then `select!`s between the
//! stream and the flush ticker. Transport errors are recovered inside the
//! task by the reconnect loop; they only ever show up as phase changes.

use std::sync::Arc;
use std::time::Duration;

use agentdesk_client::ClientError;
use agentdesk_core::domain::connection::ConnectionState;
use agentdesk_core::domain::log::LogEntry;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ViewerConfig;
use crate::reconnect::ReconnectPolicy;
use crate::repository::{LogRepository, PayloadStream};
use crate::state::{StreamPhase, ViewerEvent};
use crate::view::{SessionContext, ViewHandle};

/// Live view over the structured log stream
pub struct LogViewer {
    repository: Arc<dyn LogRepository>,
    config: ViewerConfig,
    handle: ViewHandle<LogEntry>,
    source: Option<String>,
}

impl LogViewer {
    /// Creates a stopped viewer
    ///
    /// # Arguments
    /// * `repository` - Where streams and history pages come from
    /// * `config` - Buffer, flush and reconnect settings
    pub fn new(repository: Arc<dyn LogRepository>, mut config: ViewerConfig) -> Self {
        config.flush_interval = config.effective_flush_interval();
        let handle = ViewHandle::new(config.buffer_capacity);
        Self {
            repository,
            config,
            handle,
            source: None,
        }
    }

    /// Starts streaming, replacing any running session
    ///
    /// The buffer is cleared before this returns, so entries of a previous
    /// source filter never reach a later flush. Must be called from within
    /// a tokio runtime.
    ///
    /// # Arguments
    /// * `source` - Only stream entries of this log source
    pub fn start(&mut self, source: Option<String>) {
        let context = self.handle.begin();
        self.source = source.clone();

        let span = info_span!(
            "log_viewer",
            viewer = %self.config.viewer_id,
            source = source.as_deref().unwrap_or("*")
        );

        let session = Session {
            context,
            repository: Arc::clone(&self.repository),
            source,
            flush_interval: self.config.flush_interval,
            page_size: self.config.backfill_page_size,
            policy: self.config.reconnect_policy(),
        };

        self.handle
            .attach(tokio::spawn(session.run().instrument(span)));
    }

    /// Tears down the stream and any pending reconnect
    ///
    /// Safe to call when already stopped. Once this returns no further
    /// flush reaches the buffer.
    pub fn stop(&mut self) {
        if self.handle.stop() {
            info!(viewer = %self.config.viewer_id, "Log viewer stopped");
        }
    }

    /// Subscribes to buffer and connection changes
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent<LogEntry>> {
        self.handle.subscribe()
    }

    /// Copy of the rendered buffer, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.handle.snapshot()
    }

    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn phase(&self) -> StreamPhase {
        self.handle.phase()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.phase().connection_state()
    }

    /// Source filter of the current session
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl Drop for LogViewer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Words a failed history fetch for the user
fn history_notice(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ClientError>() {
        Some(e) if e.is_not_found() => "No log history available for this source".to_string(),
        Some(e) if e.is_client_error() => format!("Log history request rejected: {:#}", error),
        Some(e) if e.is_server_error() => format!("Log history unavailable, backend error: {:#}", error),
        _ => format!("Failed to load log history: {:#}", error),
    }
}

/// Parses one stream payload, logging and dropping anything malformed
fn parse_payload(raw: &str) -> Option<LogEntry> {
    match LogEntry::from_json(raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            let preview: String = raw.chars().take(120).collect();
            warn!("Discarding malformed log payload ({}): {}", e, preview);
            None
        }
    }
}

struct Session {
    context: SessionContext<LogEntry>,
    repository: Arc<dyn LogRepository>,
    source: Option<String>,
    flush_interval: Duration,
    page_size: usize,
    policy: ReconnectPolicy,
}

impl Session {
    async fn run(self) {
        let mut failures: u32 = 0;

        loop {
            self.backfill().await;

            match self.repository.open_stream(self.source.as_deref()).await {
                Ok(stream) => {
                    if !self.context.set_phase(StreamPhase::Streaming) {
                        return;
                    }
                    info!("Log stream connected");
                    self.pump(stream, &mut failures).await;
                }
                Err(e) => warn!("{:#}", e),
            }

            failures = failures.saturating_add(1);
            if !self.context.set_phase(StreamPhase::ErrorPending) {
                return;
            }

            let delay = self.policy.delay_for(failures);
            if !delay.is_zero() {
                warn!("Reconnecting in {:?} (attempt {})", delay, failures);
                time::sleep(delay).await;
            }

            if !self.context.set_phase(StreamPhase::Reconnecting) {
                return;
            }
        }
    }

    /// Loads the latest history page into the buffer
    ///
    /// Used for the initial load and for the gap-fill after a dropped
    /// connection. A failure is reported to the user but never stops the
    /// session.
    async fn backfill(&self) {
        match self
            .repository
            .fetch_recent(self.source.as_deref(), self.page_size)
            .await
        {
            Ok(page) => {
                debug!("Loaded {} recent entries", page.len());
                self.context.replace(page);
            }
            Err(e) => {
                warn!("{:#}", e);
                self.context.notify(history_notice(&e));
            }
        }
    }

    /// Consumes one connection until it fails or the session is superseded
    async fn pump(&self, mut stream: PayloadStream, failures: &mut u32) {
        let mut ticker = time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.context.flush() {
                        return;
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(raw)) => {
                        let current = match parse_payload(&raw) {
                            Some(entry) => {
                                *failures = 0;
                                self.context.push(entry)
                            }
                            None => self.context.is_current(),
                        };
                        if !current {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Log stream error: {:#}", e);
                        return;
                    }
                    None => {
                        warn!("Log stream closed by server");
                        return;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// One scripted connection handed out by the fake repository
    pub(crate) enum Script {
        /// Opening the stream fails
        Refuse,
        /// Yields the payloads, then fails
        Drop(Vec<String>),
        /// Yields the payloads, then stays open
        Hold(Vec<String>),
        /// Forwards payloads from a channel, then stays open
        Channel(mpsc::UnboundedReceiver<String>),
    }

    impl Script {
        pub(crate) fn into_stream(self) -> anyhow::Result<PayloadStream> {
            match self {
                Script::Refuse => Err(anyhow::anyhow!("connection refused")),
                Script::Drop(items) => Ok(Box::pin(
                    stream::iter(items.into_iter().map(Ok::<_, anyhow::Error>))
                        .chain(stream::once(async { Err(anyhow::anyhow!("connection reset")) })),
                )),
                Script::Hold(items) => Ok(Box::pin(
                    stream::iter(items.into_iter().map(Ok::<_, anyhow::Error>))
                        .chain(stream::pending()),
                )),
                Script::Channel(rx) => Ok(Box::pin(
                    stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|raw| (Ok::<_, anyhow::Error>(raw), rx))
                    })
                    .chain(stream::pending()),
                )),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Fetch(Option<String>),
        Open(Option<String>),
    }

    #[derive(Default)]
    struct FakeRepository {
        calls: Mutex<Vec<Call>>,
        scripts: Mutex<VecDeque<Script>>,
        page: Mutex<Vec<LogEntry>>,
        fail_fetch: Mutex<bool>,
    }

    impl FakeRepository {
        fn with_scripts(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn opens(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Open(_)))
                .count()
        }
    }

    #[async_trait]
    impl LogRepository for FakeRepository {
        async fn open_stream(&self, source: Option<&str>) -> anyhow::Result<PayloadStream> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Open(source.map(str::to_string)));
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Hold(Vec::new()));
            script.into_stream()
        }

        async fn fetch_recent(
            &self,
            source: Option<&str>,
            _page_size: usize,
        ) -> anyhow::Result<Vec<LogEntry>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Fetch(source.map(str::to_string)));
            if *self.fail_fetch.lock().unwrap() {
                anyhow::bail!("API error (status 503): unavailable");
            }
            Ok(self.page.lock().unwrap().clone())
        }
    }

    fn entry(source: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            level: agentdesk_core::domain::log::LogLevel::Info,
            source: source.to_string(),
            message: message.to_string(),
            function: None,
            line: None,
        }
    }

    fn raw(source: &str, message: &str) -> String {
        serde_json::to_string(&entry(source, message)).unwrap()
    }

    fn messages(viewer: &LogViewer) -> Vec<String> {
        viewer.snapshot().into_iter().map(|e| e.message).collect()
    }

    fn config(capacity: usize) -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.buffer_capacity = capacity;
        config
    }

    fn phases(events: &mut broadcast::Receiver<ViewerEvent<LogEntry>>) -> Vec<StreamPhase> {
        let mut phases = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ViewerEvent::Phase(phase) = event {
                phases.push(phase);
            }
        }
        phases
    }

    async fn settle() {
        time::sleep(Duration::from_millis(300)).await;
    }

    #[test]
    fn test_parse_payload_drops_garbage() {
        assert!(parse_payload("{not json").is_none());
        assert!(parse_payload("").is_none());
        assert_eq!(parse_payload(&raw("a", "ok")).unwrap().message, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_is_truncated_to_capacity() {
        let repo = FakeRepository::with_scripts(vec![Script::Hold(vec![
            raw("s", "A"),
            raw("s", "B"),
            raw("s", "C"),
            raw("s", "D"),
        ])]);
        let mut viewer = LogViewer::new(repo, config(3));

        viewer.start(None);
        settle().await;

        assert_eq!(messages(&viewer), vec!["B", "C", "D"]);
        assert_eq!(viewer.connection_state(), ConnectionState::Connected);
        viewer.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_skipped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let repo = FakeRepository::with_scripts(vec![Script::Channel(rx)]);
        let mut viewer = LogViewer::new(repo, config(10));
        viewer.start(None);

        tx.send(raw("s", "A")).unwrap();
        settle().await;
        assert_eq!(messages(&viewer), vec!["A"]);

        tx.send("{\"level\": oops".to_string()).unwrap();
        settle().await;
        assert_eq!(viewer.len(), 1);

        tx.send(raw("s", "B")).unwrap();
        settle().await;
        assert_eq!(messages(&viewer), vec!["A", "B"]);
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_after_stop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let repo = FakeRepository::with_scripts(vec![Script::Channel(rx)]);
        let mut viewer = LogViewer::new(repo, config(10));
        viewer.start(None);

        tx.send(raw("s", "A")).unwrap();
        settle().await;
        assert_eq!(viewer.len(), 1);

        let mut events = viewer.subscribe();
        viewer.stop();
        viewer.stop();
        assert!(!viewer.is_running());
        assert_eq!(viewer.phase(), StreamPhase::Idle);

        let _ = tx.send(raw("s", "stale"));
        settle().await;

        assert_eq!(messages(&viewer), vec!["A"]);
        assert_eq!(phases(&mut events), vec![StreamPhase::Idle]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_fills_gap_before_reopening() {
        let repo = FakeRepository::with_scripts(vec![
            Script::Drop(vec![raw("s", "live")]),
            Script::Hold(Vec::new()),
        ]);
        *repo.page.lock().unwrap() = vec![entry("s", "history")];

        let mut viewer = LogViewer::new(repo.clone(), config(10));
        let mut events = viewer.subscribe();
        viewer.start(None);
        settle().await;

        assert_eq!(
            repo.calls(),
            vec![
                Call::Fetch(None),
                Call::Open(None),
                Call::Fetch(None),
                Call::Open(None),
            ]
        );
        assert_eq!(
            phases(&mut events),
            vec![
                StreamPhase::Streaming,
                StreamPhase::ErrorPending,
                StreamPhase::Reconnecting,
                StreamPhase::Streaming,
            ]
        );
        assert_eq!(messages(&viewer), vec!["history"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_wait_fixed_delay() {
        let repo = FakeRepository::with_scripts(vec![
            Script::Refuse,
            Script::Refuse,
            Script::Hold(Vec::new()),
        ]);
        let mut viewer = LogViewer::new(repo.clone(), config(10));
        viewer.start(None);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(repo.opens(), 2);
        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.opens(), 3);
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_clears_buffer() {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let repo = FakeRepository::with_scripts(vec![Script::Channel(rx_a), Script::Channel(rx_b)]);
        let mut viewer = LogViewer::new(repo.clone(), config(10));

        viewer.start(Some("alpha".to_string()));
        tx_a.send(raw("alpha", "a1")).unwrap();
        settle().await;
        assert_eq!(messages(&viewer), vec!["a1"]);

        tx_a.send(raw("alpha", "a2")).unwrap();
        viewer.start(Some("beta".to_string()));
        assert!(viewer.is_empty());
        assert_eq!(viewer.source(), Some("beta"));

        tx_b.send(raw("beta", "b1")).unwrap();
        settle().await;

        assert_eq!(messages(&viewer), vec!["b1"]);
        assert!(repo.calls().contains(&Call::Open(Some("beta".to_string()))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_history_fetch_is_a_notice() {
        let repo = FakeRepository::with_scripts(vec![Script::Hold(vec![raw("s", "A")])]);
        *repo.fail_fetch.lock().unwrap() = true;

        let mut viewer = LogViewer::new(repo, config(10));
        let mut events = viewer.subscribe();
        viewer.start(None);
        settle().await;

        let mut notices = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ViewerEvent::Notice(message) = event {
                notices.push(message);
            }
        }
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("503"));
        assert_eq!(messages(&viewer), vec!["A"]);
    }

    #[test]
    fn test_history_notice_wording() {
        let wrap = |status| {
            anyhow::Error::from(ClientError::api_error(status, "nope"))
                .context("Failed to fetch recent logs")
        };

        assert_eq!(
            history_notice(&wrap(404)),
            "No log history available for this source"
        );
        assert!(history_notice(&wrap(403)).starts_with("Log history request rejected"));
        assert!(history_notice(&wrap(502)).starts_with("Log history unavailable, backend error"));
        assert!(history_notice(&wrap(502)).contains("status 502"));
        assert!(
            history_notice(&anyhow::anyhow!("timed out")).starts_with("Failed to load log history")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_flush_interval_still_flushes() {
        let repo = FakeRepository::with_scripts(vec![Script::Hold(vec![raw("s", "A")])]);
        let mut cfg = config(10);
        cfg.flush_interval = Duration::ZERO;

        let mut viewer = LogViewer::new(repo, cfg);
        assert_eq!(viewer.config().flush_interval, crate::config::MIN_FLUSH_INTERVAL);
        viewer.start(None);
        settle().await;

        assert_eq!(messages(&viewer), vec!["A"]);
        assert!(viewer.is_running());
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
        viewer.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_does_not_reset_backoff() {
        let repo = FakeRepository::with_scripts(vec![
            Script::Drop(vec!["garbage".to_string()]),
            Script::Drop(vec!["garbage".to_string()]),
            Script::Hold(Vec::new()),
        ]);
        let mut viewer = LogViewer::new(repo.clone(), config(10));
        viewer.start(None);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(repo.opens(), 2);
        assert_eq!(viewer.phase(), StreamPhase::ErrorPending);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.opens(), 3);
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_session() {
        let repo = FakeRepository::with_scripts((0..20).map(|_| Script::Refuse).collect());
        let mut viewer = LogViewer::new(repo.clone(), config(10));
        viewer.start(None);
        settle().await;
        assert_eq!(repo.opens(), 2);
        drop(viewer);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(repo.opens(), 2);
    }
}
