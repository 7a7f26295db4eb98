//! Daily scheduling and graph execution.
//!
//! The scheduler binds the task graph to a recurring daily trigger. Each
//! trigger executes the previous calendar day: independent steps fan out on
//! a `JoinSet`, dependent steps start only after all their producers
//! succeeded, and every step runs under the uniform timeout and retry
//! policy. A step that exhausts its retries is reported to the notifier and
//! its transitive dependents are skipped for that date.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::StepError;
use crate::graph::TaskGraph;
use crate::steps::{StepContext, StepId, run_step};

/// Bounded retries with a fixed delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Fixed delay before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_secs(5 * 60),
        }
    }
}

/// Receives failure reports once a step exhausts its retries.
pub trait Notifier: Send + Sync {
    fn notify_failure(&self, step: StepId, date: NaiveDate, error: &StepError);
}

/// Notifier that records failures in the log, tagged with the configured
/// recipients. Delivery transports are an integration concern.
#[derive(Debug, Default)]
pub struct LogNotifier {
    pub recipients: Vec<String>,
}

impl Notifier for LogNotifier {
    fn notify_failure(&self, step: StepId, date: NaiveDate, error: &StepError) {
        warn!(
            step = %step,
            %date,
            recipients = %self.recipients.join(","),
            error = %error,
            "Step failed after exhausting retries"
        );
    }
}

/// Scheduling policy for the daily run.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// UTC time of day the trigger fires.
    pub daily_at: NaiveTime,
    /// Maximum random delay added after each trigger.
    pub trigger_jitter_secs: u64,
    /// Override for the per-step timeout; each node's own when unset.
    pub step_timeout: Option<Duration>,
    /// Retry policy applied uniformly to every step.
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_at: NaiveTime::from_hms_opt(1, 0, 0).expect("valid trigger time"),
            trigger_jitter_secs: 0,
            step_timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one step for one logical date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not run because an upstream step failed.
    Skipped,
}

/// Per-date execution summary.
#[derive(Debug)]
pub struct RunReport {
    pub date: NaiveDate,
    pub statuses: HashMap<StepId, StepStatus>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.statuses
            .values()
            .all(|status| *status == StepStatus::Succeeded)
    }

    pub fn status(&self, step: StepId) -> Option<StepStatus> {
        self.statuses.get(&step).copied()
    }
}

/// Executes a task graph on a fixed daily schedule.
pub struct Scheduler {
    graph: TaskGraph,
    context: StepContext,
    config: SchedulerConfig,
    notifier: Arc<dyn Notifier>,
}

impl Scheduler {
    pub fn new(
        graph: TaskGraph,
        context: StepContext,
        config: SchedulerConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            graph,
            context,
            config,
            notifier,
        }
    }

    /// The graph this scheduler was registered with.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Execute the graph for one logical date.
    pub async fn run_date(&self, date: NaiveDate) -> RunReport {
        let mut statuses: HashMap<StepId, StepStatus> = HashMap::new();
        let mut waiting: HashMap<StepId, usize> = self
            .graph
            .nodes()
            .iter()
            .map(|&step| (step, self.graph.predecessors(step).count()))
            .collect();

        let mut running: JoinSet<(StepId, Result<(), StepError>)> = JoinSet::new();
        let ready: Vec<StepId> = waiting
            .iter()
            .filter(|(_, pending)| **pending == 0)
            .map(|(step, _)| *step)
            .collect();
        for step in ready {
            waiting.remove(&step);
            self.spawn_step(&mut running, step, date);
        }

        while let Some(joined) = running.join_next().await {
            let (step, result) = match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    error!(error = %join_error, "Step task aborted");
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    statuses.insert(step, StepStatus::Succeeded);
                    let unblocked: Vec<StepId> = self
                        .graph
                        .dependents(step)
                        .filter(|dependent| {
                            match waiting.get_mut(dependent) {
                                Some(pending) => {
                                    *pending -= 1;
                                    *pending == 0
                                }
                                // Already skipped via another failed path.
                                None => false,
                            }
                        })
                        .collect();
                    for dependent in unblocked {
                        waiting.remove(&dependent);
                        self.spawn_step(&mut running, dependent, date);
                    }
                }
                Err(ref step_error) => {
                    self.notifier.notify_failure(step, date, step_error);
                    statuses.insert(step, StepStatus::Failed);
                    for dependent in self.graph.transitive_dependents(step) {
                        if waiting.remove(&dependent).is_some() {
                            info!(step = %dependent, %date, "Skipping step: upstream failure");
                            statuses.insert(dependent, StepStatus::Skipped);
                        }
                    }
                }
            }
        }

        // Anything still waiting never became runnable (e.g. its producer's
        // task aborted); report it as skipped rather than dropping it.
        for (step, _) in waiting {
            statuses.insert(step, StepStatus::Skipped);
        }

        RunReport { date, statuses }
    }

    fn spawn_step(
        &self,
        running: &mut JoinSet<(StepId, Result<(), StepError>)>,
        step: StepId,
        date: NaiveDate,
    ) {
        let context = self.context.clone();
        let retry = self.config.retry;
        let timeout = self.config.step_timeout.unwrap_or(step.node().timeout);
        running.spawn(async move {
            let result = execute_with_policy(step, date, &context, timeout, retry).await;
            (step, result)
        });
    }

    /// Run the daily trigger loop until shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let now = Utc::now();
            let trigger = next_trigger_after(now, self.config.daily_at);
            let jitter = random_jitter(self.config.trigger_jitter_secs);
            let wait = (trigger - now).to_std().unwrap_or(Duration::ZERO) + jitter;
            info!(
                trigger = %trigger,
                wait_secs = wait.as_secs(),
                "Waiting for next daily trigger"
            );

            if shutdown
                .run_until_cancelled(tokio::time::sleep(wait))
                .await
                .is_none()
            {
                info!("Shutdown requested, stopping scheduler");
                break;
            }

            let date = logical_date(trigger);
            let report = self.run_date(date).await;
            if report.all_succeeded() {
                info!(%date, "Daily run complete");
            } else {
                warn!(%date, statuses = ?report.statuses, "Daily run finished with failures");
            }
        }
    }
}

/// One step invocation under the timeout and retry policy.
async fn execute_with_policy(
    step: StepId,
    date: NaiveDate,
    context: &StepContext,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<(), StepError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let error = match tokio::time::timeout(timeout, run_step(step, context, date)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(error)) => error,
            Err(_) => StepError::Timeout {
                seconds: timeout.as_secs(),
            },
        };
        if attempt > retry.retries {
            return Err(error);
        }
        warn!(
            step = %step,
            %date,
            attempt,
            delay_secs = retry.delay.as_secs(),
            error = %error,
            "Step attempt failed, retrying"
        );
        tokio::time::sleep(retry.delay).await;
    }
}

/// Next trigger instant strictly after `now`.
fn next_trigger_after(now: DateTime<Utc>, daily_at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(daily_at).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// The logical date a trigger executes: the previous calendar day.
fn logical_date(trigger: DateTime<Utc>) -> NaiveDate {
    let day = trigger.date_naive();
    day.pred_opt().unwrap_or(day)
}

/// Generate a random jitter duration up to the specified maximum seconds.
pub fn random_jitter(max_secs: u64) -> Duration {
    if max_secs > 0 {
        Duration::from_millis(rand::rng().random_range(0..max_secs * 1000))
    } else {
        Duration::ZERO
    }
}
