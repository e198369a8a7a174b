#![forbid(unsafe_code)]

use crate::check::{CycleReport, NofileCheck};
use crate::discovery::{ProcessTable, ProcfsTable};
use crate::error::Error;
use crate::event::EventSink;
use crate::probe::{LimitProbe, ProcfsLimitProbe};
use config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs every configured check once per interval. Checks run one after
/// another and cycles never overlap.
pub struct Scheduler {
    interval: Duration,
    checks: Vec<NofileCheck>,
}

impl Scheduler {
    pub fn new(interval: Duration, checks: Vec<NofileCheck>) -> Self {
        Self { interval, checks }
    }

    /// Build procfs-backed checks for every configured instance.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let table: Arc<dyn ProcessTable> = Arc::new(ProcfsTable::default());
        let probe: Arc<dyn LimitProbe> = Arc::new(ProcfsLimitProbe::default());
        let checks = config
            .instances
            .iter()
            .map(|instance| NofileCheck::new(instance, Arc::clone(&table), Arc::clone(&probe)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(config.interval, checks))
    }

    pub fn checks(&self) -> &[NofileCheck] {
        &self.checks
    }

    /// Run all checks once.
    pub async fn run_once(&self, sink: &dyn EventSink) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            reports.push(check.gather(sink).await);
        }
        reports
    }

    /// Run cycles until the token is cancelled. A cycle that overruns the
    /// interval is followed by the next one right away.
    pub async fn run_until(&self, cancel: CancellationToken, sink: &dyn EventSink) {
        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("scheduler stopped");
                    break;
                }
                reports = async {
                    ticker.tick().await;
                    self.run_once(sink).await
                } => {
                    debug!(checks = reports.len(), "cycle finished");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProcessHandle;
    use crate::domain::{LimitSnapshot, Measurement, ProbeOutcome};
    use crate::event::{ChannelSink, Event, Severity};
    use crate::probe::ProbeError;
    use async_trait::async_trait;
    use config::{Instance, Thresholds};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct Daemon {
        pid: i32,
    }

    impl ProcessHandle for Daemon {
        fn pid(&self) -> i32 {
            self.pid
        }

        fn exec_name(&self) -> Result<String, ProbeError> {
            Ok("redis-server".into())
        }

        fn cmdline(&self) -> Result<String, ProbeError> {
            Ok("redis-server *:6379".into())
        }

        fn user(&self) -> Result<String, ProbeError> {
            Ok("redis".into())
        }
    }

    /// One process; every walk is one cycle of the owning check.
    struct CountingTable {
        pid: i32,
        walks: AtomicUsize,
    }

    impl CountingTable {
        fn new(pid: i32) -> Arc<Self> {
            Arc::new(Self {
                pid,
                walks: AtomicUsize::new(0),
            })
        }

        fn walks(&self) -> usize {
            self.walks.load(Ordering::SeqCst)
        }
    }

    impl ProcessTable for CountingTable {
        fn visit(&self, visitor: &mut dyn FnMut(&dyn ProcessHandle)) -> Result<(), Error> {
            self.walks.fetch_add(1, Ordering::SeqCst);
            visitor(&Daemon { pid: self.pid });
            Ok(())
        }

        fn is_alive(&self, pid: i32) -> bool {
            pid == self.pid
        }
    }

    struct FixedProbe;

    impl LimitProbe for FixedProbe {
        fn probe(&self, pid: i32) -> ProbeOutcome {
            ProbeOutcome::Measured(Measurement::new(
                pid,
                10,
                LimitSnapshot {
                    soft: 100,
                    hard: 100,
                },
                Some("redis-server".into()),
            ))
        }
    }

    /// Holds every push for `delay` and records when each one started.
    struct SlowSink {
        delay: Duration,
        started: Instant,
        pushes: Mutex<Vec<Duration>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for SlowSink {
        async fn push(&self, _event: Event) {
            self.pushes.lock().unwrap().push(self.started.elapsed());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn redis_instance() -> Instance {
        let mut instance = Instance {
            search_exec_name: "redis".into(),
            open_files: Thresholds::new(80.0, 90.0),
            ..Default::default()
        };
        instance.normalize().unwrap();
        instance
    }

    fn check_over(table: &Arc<CountingTable>) -> NofileCheck {
        let table: Arc<dyn ProcessTable> = table.clone();
        NofileCheck::new(&redis_instance(), table, Arc::new(FixedProbe)).unwrap()
    }

    fn cancel_after(after: Duration) -> CancellationToken {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            time::sleep(after).await;
            stop.cancel();
        });
        cancel
    }

    #[tokio::test(start_paused = true)]
    async fn one_cycle_per_interval_until_cancelled() {
        let table = CountingTable::new(7);
        let scheduler = Scheduler::new(Duration::from_secs(10), vec![check_over(&table)]);
        let (sink, _rx) = ChannelSink::new();

        let started = Instant::now();
        scheduler
            .run_until(cancel_after(Duration::from_secs(35)), &sink)
            .await;

        // t = 0, 10, 20, 30
        assert_eq!(table.walks(), 4);
        assert!(started.elapsed() < Duration::from_secs(36));
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_cycle_is_followed_immediately() {
        let table = CountingTable::new(7);
        let scheduler = Scheduler::new(Duration::from_secs(10), vec![check_over(&table)]);
        let sink = SlowSink {
            delay: Duration::from_secs(25),
            started: Instant::now(),
            pushes: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        scheduler
            .run_until(cancel_after(Duration::from_secs(60)), &sink)
            .await;

        let pushes = sink.pushes.lock().unwrap().clone();
        assert_eq!(
            pushes,
            vec![
                Duration::ZERO,
                Duration::from_secs(25),
                Duration::from_secs(50)
            ]
        );
        assert_eq!(sink.peak.load(Ordering::SeqCst), 1, "cycles overlapped");
        assert!(sink.started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test]
    async fn run_once_reports_every_check_in_order() {
        let first = CountingTable::new(1);
        let second = CountingTable::new(2);
        let scheduler = Scheduler::new(
            Duration::from_secs(10),
            vec![check_over(&first), check_over(&second)],
        );
        let (sink, mut rx) = ChannelSink::new();

        let reports = scheduler.run_once(&sink).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|report| report.matched == 1));
        assert!(
            reports
                .iter()
                .all(|report| report.emitted == Some(Severity::Ok))
        );
        assert_eq!((first.walks(), second.walks()), (1, 1));

        assert_eq!(rx.recv().await.unwrap().labels["pid"], "1");
        assert_eq!(rx.recv().await.unwrap().labels["pid"], "2");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn from_config_builds_one_check_per_instance() {
        let nginx = Instance {
            search_exec_name: "nginx".into(),
            open_files: Thresholds::new(80.0, 90.0),
            ..Default::default()
        };
        let config = Config {
            interval: Duration::from_secs(5),
            instances: vec![redis_instance(), nginx],
        };

        let scheduler = Scheduler::from_config(&config).unwrap();
        let targets = scheduler
            .checks()
            .iter()
            .map(NofileCheck::target)
            .collect::<Vec<_>>();
        assert_eq!(targets, ["redis", "nginx"]);

        let broken = Config {
            interval: Duration::from_secs(5),
            instances: vec![Instance::default()],
        };
        assert!(matches!(
            Scheduler::from_config(&broken),
            Err(Error::InvalidCriterion(_))
        ));
    }
}
