use std::time::Duration;

use futures_util::future::join_all;
use ragchat_logging::{rag_debug, rag_info, rag_warn};
use tokio::time::MissedTickBehavior;

use crate::{Backend, EngineEvent, PollOutcome, PollTick, ProbeStatus, ProgressSink, StatusReport};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    /// Upper bound on poll rounds before giving up.
    pub max_ticks: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_ticks: 900,
        }
    }
}

/// One poll round folded into counts. Missing files are not in `total`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Aggregate {
    pub total: usize,
    pub completed: usize,
    pub failed: Vec<String>,
    pub missing: Vec<String>,
}

impl Aggregate {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            (self.completed * 100 / self.total) as u8
        }
    }

    /// Terminal outcome for this round, if any. A failure wins over completion.
    pub fn outcome(&self) -> Option<PollOutcome> {
        if !self.failed.is_empty() {
            Some(PollOutcome::SomeFailed {
                failed: self.failed.clone(),
            })
        } else if self.total == 0 {
            Some(PollOutcome::NothingTracked)
        } else if self.completed == self.total {
            Some(PollOutcome::AllCompleted)
        } else {
            None
        }
    }
}

pub fn aggregate(reports: &[StatusReport]) -> Aggregate {
    let mut agg = Aggregate::default();
    for report in reports {
        match report.status {
            ProbeStatus::Missing => agg.missing.push(report.name.clone()),
            ProbeStatus::Completed => {
                agg.total += 1;
                agg.completed += 1;
            }
            ProbeStatus::Failed => {
                agg.total += 1;
                agg.failed.push(report.name.clone());
            }
            ProbeStatus::Processing { .. } => agg.total += 1,
        }
    }
    agg
}

/// Probes every name each interval until a terminal aggregate or the tick bound.
///
/// All probes of a round run concurrently and are joined before aggregating.
/// The first probe error ends the loop; nothing is retried.
pub async fn poll_until_terminal(
    backend: &dyn Backend,
    names: Vec<String>,
    settings: &PollSettings,
    sink: &dyn ProgressSink,
) -> PollOutcome {
    let mut names = names;
    let mut interval = tokio::time::interval(settings.interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for tick in 1..=settings.max_ticks {
        interval.tick().await;

        let probes = names.iter().map(|name| async move {
            let result = backend.probe_status(name).await;
            (name.clone(), result)
        });
        let mut reports = Vec::with_capacity(names.len());
        for (name, result) in join_all(probes).await {
            match result {
                Ok(status) => reports.push(StatusReport { name, status }),
                Err(err) => {
                    rag_warn!("status probe for {} failed: {}", name, err);
                    return PollOutcome::TransportError(err);
                }
            }
        }

        let agg = aggregate(&reports);
        rag_debug!(
            "poll tick {}: {}/{} completed, {} missing",
            tick,
            agg.completed,
            agg.total,
            agg.missing.len()
        );
        sink.emit(EngineEvent::PollTick(PollTick {
            tick,
            percent: agg.percent(),
            reports,
        }));

        if let Some(outcome) = agg.outcome() {
            rag_info!("polling finished after {} ticks: {:?}", tick, outcome);
            return outcome;
        }
        names.retain(|name| !agg.missing.contains(name));
    }

    rag_warn!("polling gave up after {} ticks", settings.max_ticks);
    PollOutcome::GaveUp {
        ticks: settings.max_ticks,
    }
}

/// Probes each name once and returns the ones the backend no longer knows.
///
/// Names whose probe fails are kept; a flaky backend should not erase them.
pub async fn revalidate(backend: &dyn Backend, names: &[String]) -> Vec<String> {
    let probes = names.iter().map(|name| async move {
        let result = backend.probe_status(name).await;
        (name, result)
    });

    let mut missing = Vec::new();
    for (name, result) in join_all(probes).await {
        match result {
            Ok(ProbeStatus::Missing) => missing.push(name.clone()),
            Ok(_) => {}
            Err(err) => rag_warn!("could not revalidate {}: {}", name, err),
        }
    }
    missing
}
