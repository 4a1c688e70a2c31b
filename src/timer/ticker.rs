//! Shared one-second refresh loop for the live timer display.
//!
//! A single tick drives every visible timer. The loop re-renders while at least
//! one timer is running, or after the board changed; a board holding only paused
//! timers stays quiet between syncs. When a [`TimerSource`] is attached the loop
//! also refetches the authoritative list every `poll_every`.

use crate::clock::Clock;
use crate::timer::board::{TimerBoard, TimerRow};
use crate::timer::record::TimerRecord;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Blocking fetch of the authoritative timer list.
pub trait TimerSource: Send + Sync + 'static {
    fn fetch(&self) -> anyhow::Result<Vec<TimerRecord>>;
}

#[derive(Debug, Clone, Copy)]
pub struct TickerConfig {
    pub tick: Duration,
    pub poll_every: Option<Duration>,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            poll_every: Some(Duration::from_secs(30)),
        }
    }
}

pub type SharedBoard = Arc<Mutex<TimerBoard>>;

pub fn lock_board(board: &SharedBoard) -> MutexGuard<'_, TimerBoard> {
    board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cancellation handle for a running ticker. Dropping it also cancels.
pub struct TickerHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Ticker task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct Ticker {
    board: SharedBoard,
    clock: Arc<dyn Clock>,
    source: Option<Arc<dyn TimerSource>>,
    config: TickerConfig,
}

impl Ticker {
    pub fn new(board: SharedBoard, clock: Arc<dyn Clock>, config: TickerConfig) -> Self {
        Self {
            board,
            clock,
            source: None,
            config,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn TimerSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Start the loop on the current tokio runtime. `render` receives the rows
    /// computed at each refreshing tick.
    pub fn spawn<R>(self, render: R) -> TickerHandle
    where
        R: FnMut(&[TimerRow]) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(self.run(rx, render));
        TickerHandle {
            cancel: Some(tx),
            task: Some(task),
        }
    }

    async fn run<R>(self, mut cancel: oneshot::Receiver<()>, mut render: R)
    where
        R: FnMut(&[TimerRow]),
    {
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_poll: Option<Instant> = None;
        let mut in_flight: Option<PollTask> = None;
        let mut rendered_revision: Option<u64> = None;

        loop {
            tokio::select! {
                _ = &mut cancel => break,
                joined = join_poll(&mut in_flight) => {
                    in_flight = None;
                    self.apply_poll(joined);
                }
                _ = interval.tick() => {
                    if in_flight.is_none() {
                        if let (Some(source), Some(every)) = (&self.source, self.config.poll_every) {
                            if last_poll.is_none_or(|at| at.elapsed() >= every) {
                                last_poll = Some(Instant::now());
                                let source = source.clone();
                                in_flight = Some(tokio::task::spawn_blocking(move || source.fetch()));
                            }
                        }
                    }
                }
            }

            let rows = {
                let board = lock_board(&self.board);
                let changed = rendered_revision != Some(board.revision());
                if !changed && !board.has_running() {
                    continue;
                }
                rendered_revision = Some(board.revision());
                board.rows(self.clock.now())
            };
            render(&rows);
        }

        // an outstanding fetch is detached; its result is discarded
        debug!(poll_in_flight = in_flight.is_some(), "Ticker cancelled");
    }

    fn apply_poll(&self, joined: Result<anyhow::Result<Vec<TimerRecord>>, JoinError>) {
        match joined {
            Ok(Ok(records)) => {
                debug!(count = records.len(), "Refetched timers");
                lock_board(&self.board).replace_all(records, self.clock.now());
            }
            // keep showing the last known records; the next poll retries
            Ok(Err(e)) => warn!("Failed to refresh timers: {:#}", e),
            Err(e) => warn!("Timer refresh task failed: {}", e),
        }
    }
}

type PollTask = JoinHandle<anyhow::Result<Vec<TimerRecord>>>;

/// Resolves when the outstanding fetch finishes; pends forever when idle.
async fn join_poll(
    in_flight: &mut Option<PollTask>,
) -> Result<anyhow::Result<Vec<TimerRecord>>, JoinError> {
    match in_flight {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::record::TimerStatus;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::mpsc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 7, 9, 0, 0).unwrap()
    }

    fn record(id: u64, status: TimerStatus, accumulated: u64) -> TimerRecord {
        TimerRecord {
            id,
            project: 1,
            project_name: "Website revamp".to_string(),
            user: Some(1),
            user_email: "ana@example.com".to_string(),
            status,
            started_at: t0(),
            last_resumed_at: (status == TimerStatus::Running).then(t0),
            accumulated_seconds: accumulated,
            elapsed_seconds: None,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn board_with(records: Vec<TimerRecord>) -> SharedBoard {
        let mut board = TimerBoard::new();
        board.replace_all(records, t0());
        Arc::new(Mutex::new(board))
    }

    struct FixedSource(Vec<TimerRecord>);

    impl TimerSource for FixedSource {
        fn fetch(&self) -> anyhow::Result<Vec<TimerRecord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl TimerSource for FailingSource {
        fn fetch(&self) -> anyhow::Result<Vec<TimerRecord>> {
            anyhow::bail!("connection refused")
        }
    }

    fn no_poll() -> TickerConfig {
        TickerConfig {
            tick: Duration::from_secs(1),
            poll_every: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_timer_rerenders_every_tick() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Running, 0)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board, clock.clone(), no_poll()).spawn(move |rows| {
            let _ = tx.send(rows[0].elapsed_seconds);
        });

        assert_eq!(rx.recv().await, Some(0));
        clock.advance(1);
        assert_eq!(rx.recv().await, Some(1));
        clock.advance(1);
        assert_eq!(rx.recv().await, Some(2));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_board_renders_once() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Paused, 90)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _handle = Ticker::new(board.clone(), clock, no_poll()).spawn(move |rows| {
            let _ = tx.send(rows[0].elapsed.clone());
        });

        assert_eq!(rx.recv().await.as_deref(), Some("00:01:30"));
        let quiet = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(quiet.is_err(), "paused timers should not re-render");

        // a server update to the board triggers one more render
        lock_board(&board).apply(record(1, TimerStatus::Paused, 120));
        assert_eq!(rx.recv().await.as_deref(), Some("00:02:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Running, 0)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handle = Ticker::new(board, clock, no_poll()).spawn(move |rows| {
            let _ = tx.send(rows.len());
        });

        assert_eq!(rx.recv().await, Some(1));
        handle.cancel();
        // render closure (and its sender) is dropped when the loop exits
        while rx.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Running, 0)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board, clock, no_poll()).spawn(move |rows| {
            let _ = tx.send(rows.len());
        });
        assert_eq!(rx.recv().await, Some(1));

        drop(handle);
        while rx.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_replaces_board() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![]);
        let source = Arc::new(FixedSource(vec![record(7, TimerStatus::Paused, 30)]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board.clone(), clock, TickerConfig::default())
            .with_source(source)
            .spawn(move |rows| {
                let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
                let _ = tx.send(ids);
            });

        // the cached (empty) board renders first, then the fetched one
        assert_eq!(rx.recv().await, Some(vec![]));
        assert_eq!(rx.recv().await, Some(vec![7]));
        assert!(lock_board(&board).get(7).is_some());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_last_records() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(3, TimerStatus::Running, 10)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board, clock, TickerConfig::default())
            .with_source(Arc::new(FailingSource))
            .spawn(move |rows| {
                let _ = tx.send(rows[0].elapsed_seconds);
            });

        assert_eq!(rx.recv().await, Some(10));
        handle.shutdown().await;
    }

    /// Blocks until the test releases it, like a fetch against a slow server.
    struct GatedSource {
        release: Mutex<std::sync::mpsc::Receiver<()>>,
        records: Vec<TimerRecord>,
    }

    impl TimerSource for GatedSource {
        fn fetch(&self) -> anyhow::Result<Vec<TimerRecord>> {
            let release = self.release.lock().unwrap_or_else(|p| p.into_inner());
            let _ = release.recv();
            Ok(self.records.clone())
        }
    }

    #[tokio::test]
    async fn test_ticks_continue_while_fetch_is_outstanding() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Running, 0)]);
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let source = Arc::new(GatedSource {
            release: Mutex::new(release_rx),
            records: vec![record(9, TimerStatus::Paused, 5)],
        });
        let config = TickerConfig {
            tick: Duration::from_millis(20),
            poll_every: Some(Duration::from_secs(30)),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board.clone(), clock, config)
            .with_source(source)
            .spawn(move |rows| {
                let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
                let _ = tx.send(ids);
            });

        // the fetch never returns here, yet the running timer keeps rendering
        for _ in 0..5 {
            let ids = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("tick stalled behind the outstanding fetch");
            assert_eq!(ids, Some(vec![1]));
        }

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("cancel waited for the outstanding fetch");
        assert!(lock_board(&board).get(9).is_none());

        // let the detached blocking fetch finish so the runtime can shut down
        drop(release_tx);
    }

    #[tokio::test]
    async fn test_fetch_result_applied_when_it_lands() {
        let clock = Arc::new(ManualClock::new(t0()));
        let board = board_with(vec![record(1, TimerStatus::Running, 0)]);
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let source = Arc::new(GatedSource {
            release: Mutex::new(release_rx),
            records: vec![record(9, TimerStatus::Paused, 5)],
        });
        let config = TickerConfig {
            tick: Duration::from_millis(20),
            poll_every: Some(Duration::from_secs(30)),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = Ticker::new(board, clock, config)
            .with_source(source)
            .spawn(move |rows| {
                let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
                let _ = tx.send(ids);
            });

        assert_eq!(rx.recv().await, Some(vec![1]));
        release_tx.send(()).unwrap();

        let landed = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(ids) = rx.recv().await {
                if ids == vec![9] {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(landed);
        handle.shutdown().await;
    }
}
