//! Live container log viewer
//!
//! The container stream carries preformatted text rather than structured
//! entries, and has no history endpoint to gap-fill from. It shares the
//! buffer and the reconnect policy with `LogViewer` but is otherwise its
//! own, smaller client.

use std::sync::Arc;
use std::time::Duration;

use agentdesk_core::domain::connection::ConnectionState;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, info, info_span, warn};

use crate::config::ViewerConfig;
use crate::reconnect::ReconnectPolicy;
use crate::repository::{ContainerLogRepository, PayloadStream};
use crate::state::{StreamPhase, ViewerEvent};
use crate::view::{SessionContext, ViewHandle};

/// Live view over the container log stream
pub struct ContainerLogViewer {
    repository: Arc<dyn ContainerLogRepository>,
    config: ViewerConfig,
    handle: ViewHandle<String>,
}

impl ContainerLogViewer {
    pub fn new(repository: Arc<dyn ContainerLogRepository>, mut config: ViewerConfig) -> Self {
        config.flush_interval = config.effective_flush_interval();
        let handle = ViewHandle::new(config.buffer_capacity);
        Self {
            repository,
            config,
            handle,
        }
    }

    /// Starts streaming, replacing any running session
    ///
    /// # Arguments
    /// * `granularity` - Server-side batching window in seconds
    pub fn start(&mut self, granularity: Option<u64>) {
        let context = self.handle.begin();
        let span = info_span!("container_log_viewer", viewer = %self.config.viewer_id);

        let session = ContainerSession {
            context,
            repository: Arc::clone(&self.repository),
            granularity,
            flush_interval: self.config.flush_interval,
            policy: self.config.reconnect_policy(),
        };

        self.handle
            .attach(tokio::spawn(session.run().instrument(span)));
    }

    /// Tears down the stream and any pending reconnect; idempotent
    pub fn stop(&mut self) {
        if self.handle.stop() {
            info!(viewer = %self.config.viewer_id, "Container log viewer stopped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent<String>> {
        self.handle.subscribe()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.handle.snapshot()
    }

    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn phase(&self) -> StreamPhase {
        self.handle.phase()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.phase().connection_state()
    }
}

impl Drop for ContainerLogViewer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Splits one payload into display lines, dropping blank ones
fn split_payload(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
}

struct ContainerSession {
    context: SessionContext<String>,
    repository: Arc<dyn ContainerLogRepository>,
    granularity: Option<u64>,
    flush_interval: Duration,
    policy: ReconnectPolicy,
}

impl ContainerSession {
    async fn run(self) {
        let mut failures: u32 = 0;

        loop {
            match self.repository.open_stream(self.granularity).await {
                Ok(stream) => {
                    if !self.context.set_phase(StreamPhase::Streaming) {
                        return;
                    }
                    info!("Container log stream connected");
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
                time::sleep(delay).await;
            }

            if !self.context.set_phase(StreamPhase::Reconnecting) {
                return;
            }
        }
    }

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
                        for line in split_payload(&raw) {
                            *failures = 0;
                            if !self.context.push(line) {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Container log stream error: {:#}", e);
                        return;
                    }
                    None => {
                        warn!("Container log stream closed by server");
                        return;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::tests::Script;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeContainerRepository {
        granularities: Mutex<Vec<Option<u64>>>,
        scripts: Mutex<VecDeque<Script>>,
    }

    #[async_trait]
    impl ContainerLogRepository for FakeContainerRepository {
        async fn open_stream(&self, granularity: Option<u64>) -> anyhow::Result<PayloadStream> {
            self.granularities.lock().unwrap().push(granularity);
            self.scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Hold(Vec::new()))
                .into_stream()
        }
    }

    fn repository(scripts: Vec<Script>) -> Arc<FakeContainerRepository> {
        Arc::new(FakeContainerRepository {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        })
    }

    fn config(capacity: usize) -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.buffer_capacity = capacity;
        config
    }

    #[test]
    fn test_split_payload() {
        let lines: Vec<_> = split_payload("first\r\n\n  \nsecond\n").collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lines_are_buffered_in_order() {
        let repo = repository(vec![Script::Hold(vec![
            "boot\nready".to_string(),
            "step 1".to_string(),
            "step 2".to_string(),
        ])]);
        let mut viewer = ContainerLogViewer::new(repo.clone(), config(3));

        viewer.start(Some(2));
        time::sleep(Duration::from_millis(300)).await;

        assert_eq!(viewer.snapshot(), vec!["ready", "step 1", "step 2"]);
        assert_eq!(viewer.connection_state(), ConnectionState::Connected);
        assert_eq!(*repo.granularities.lock().unwrap(), vec![Some(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_flush_interval_still_flushes() {
        let repo = repository(vec![Script::Hold(vec!["up".to_string()])]);
        let mut cfg = config(10);
        cfg.flush_interval = Duration::ZERO;

        let mut viewer = ContainerLogViewer::new(repo, cfg);
        viewer.start(None);
        time::sleep(Duration::from_millis(300)).await;

        assert_eq!(viewer.snapshot(), vec!["up"]);
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_payload_does_not_reset_backoff() {
        let repo = repository(vec![
            Script::Drop(vec!["\n\n".to_string()]),
            Script::Drop(vec!["  ".to_string()]),
            Script::Hold(Vec::new()),
        ]);
        let mut viewer = ContainerLogViewer::new(repo.clone(), config(10));
        viewer.start(None);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(repo.granularities.lock().unwrap().len(), 2);
        assert_eq!(viewer.phase(), StreamPhase::ErrorPending);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.granularities.lock().unwrap().len(), 3);
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_keeps_buffer() {
        let repo = repository(vec![
            Script::Drop(vec!["before".to_string()]),
            Script::Refuse,
            Script::Hold(vec!["after".to_string()]),
        ]);
        let mut viewer = ContainerLogViewer::new(repo.clone(), config(10));
        let mut events = viewer.subscribe();
        viewer.start(None);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(viewer.phase(), StreamPhase::ErrorPending);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(viewer.phase(), StreamPhase::Streaming);
        assert_eq!(repo.granularities.lock().unwrap().len(), 3);
        assert_eq!(viewer.snapshot(), vec!["before", "after"]);

        let mut phases = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ViewerEvent::Phase(phase) = event {
                phases.push(phase);
            }
        }
        assert_eq!(
            phases,
            vec![
                StreamPhase::Streaming,
                StreamPhase::ErrorPending,
                StreamPhase::Reconnecting,
                StreamPhase::ErrorPending,
                StreamPhase::Reconnecting,
                StreamPhase::Streaming,
            ]
        );

        viewer.stop();
        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);
    }
}
