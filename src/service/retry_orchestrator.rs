use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a single attempt, decided by the caller.
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    Success(T),
    /// Transient; try again if budget remains.
    Retry(E),
    /// Terminal; stop regardless of budget.
    Bail(E),
}

#[derive(Debug)]
pub enum RetryError<E> {
    NoRetry { attempt: u32, error: E },
    Exhausted { attempts: u32, error: E },
    /// The latency budget ran out while an attempt was still in flight.
    BudgetSpent { attempts: u32, last_error: Option<E> },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: u32,
    pub jitter: bool,
    /// Wall-clock bound on the whole loop, backoff included.
    pub latency_budget_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
            factor: 2,
            jitter: true,
            latency_budget_ms: 10_000,
        }
    }
}

pub fn attempt_limit(policy: &RetryPolicy) -> u32 {
    policy.max_attempts.max(1)
}

pub fn latency_budget(policy: &RetryPolicy) -> Duration {
    Duration::from_millis(policy.latency_budget_ms)
}

pub fn should_stop_for_budget(start: Instant, policy: &RetryPolicy) -> bool {
    start.elapsed() >= latency_budget(policy)
}

/// Delay slept after failed attempt `attempt` (1-based), before jitter.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let multiplier = policy
        .factor
        .max(1)
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    let delay = policy.base_delay_ms.saturating_mul(u64::from(multiplier));
    Duration::from_millis(delay.min(policy.max_delay_ms))
}

/// Longest total time the loop can spend sleeping, jitter included.
pub fn worst_case_backoff(policy: &RetryPolicy) -> Duration {
    (1..attempt_limit(policy))
        .map(|attempt| {
            let delay = backoff_delay(policy, attempt);
            if policy.jitter {
                (delay + delay / 2).min(Duration::from_millis(policy.max_delay_ms).max(delay))
            } else {
                delay
            }
        })
        .sum()
}

fn with_jitter(policy: &RetryPolicy, delay: Duration) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let spread = delay_ms / 2;
    if !policy.jitter || spread == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=spread);
    Duration::from_millis((delay_ms + extra).min(policy.max_delay_ms.max(delay_ms)))
}

/// Runs `operation` until it succeeds, bails, or the attempt or latency
/// budget is spent. The operation receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T, E>>,
{
    let limit = attempt_limit(policy);
    let start = Instant::now();
    let deadline = start + latency_budget(policy);
    let mut last_error = None;
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout_at(deadline, operation(attempt)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(attempt, "latency budget spent mid-attempt");
                return Err(RetryError::BudgetSpent {
                    attempts: attempt,
                    last_error,
                });
            }
        };

        match outcome {
            AttemptOutcome::Success(value) => return Ok(value),
            AttemptOutcome::Bail(error) => return Err(RetryError::NoRetry { attempt, error }),
            AttemptOutcome::Retry(error) if attempt >= limit => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    error,
                })
            }
            AttemptOutcome::Retry(error) => {
                let delay = with_jitter(policy, backoff_delay(policy, attempt));
                if should_stop_for_budget(start, policy) || Instant::now() + delay >= deadline {
                    tracing::debug!(attempt, "no latency budget left for another attempt");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed ({}), backing off",
                    error
                );
                last_error = Some(error);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64, max: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay_ms: base,
            max_delay_ms: max,
            factor: 2,
            jitter: false,
            latency_budget_ms: 60_000,
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let p = policy(100, 500);
        assert_eq!(backoff_delay(&p, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(&p, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(&p, 3), Duration::from_millis(400));
        assert_eq!(backoff_delay(&p, 4), Duration::from_millis(500));
        assert_eq!(backoff_delay(&p, 40), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_cap() {
        let mut p = policy(400, 500);
        p.jitter = true;
        for _ in 0..50 {
            let d = with_jitter(&p, backoff_delay(&p, 1));
            assert!(d >= Duration::from_millis(400) && d <= Duration::from_millis(500));
        }
    }

    #[test]
    fn zero_attempts_means_one() {
        let mut p = policy(0, 0);
        p.max_attempts = 0;
        assert_eq!(attempt_limit(&p), 1);
    }

    #[test]
    fn worst_case_backoff_sums_capped_delays() {
        let p = policy(100, 500);
        // attempts 1..=4 sleep 100 + 200 + 400 + 500
        assert_eq!(worst_case_backoff(&p), Duration::from_millis(1_200));

        let defaults = RetryPolicy::default();
        assert_eq!(worst_case_backoff(&defaults), Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_between_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            factor: 2,
            jitter: false,
            latency_budget_ms: 60_000,
        };
        let start = Instant::now();
        let mut stamps = Vec::new();
        let result: Result<(), RetryError<&str>> = with_retry(&p, |_| {
            stamps.push(start.elapsed());
            async { AttemptOutcome::Retry("reset") }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        let ms: Vec<u128> = stamps.iter().map(Duration::as_millis).collect();
        assert_eq!(ms.len(), 3);
        assert_eq!(ms[0], 0);
        assert!((100..=101).contains(&ms[1]), "{ms:?}");
        assert!((300..=302).contains(&ms[2]), "{ms:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn budget_stops_retries_before_attempt_limit() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 100,
            factor: 1,
            jitter: false,
            latency_budget_ms: 450,
        };
        let mut calls = 0;
        let result: Result<(), RetryError<String>> = with_retry(&p, |attempt| {
            calls += 1;
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                AttemptOutcome::Retry(format!("slow {attempt}"))
            }
        })
        .await;

        // 50ms call + 100ms backoff per round; the third backoff would end at 450ms
        assert_eq!(calls, 3);
        match result {
            Err(RetryError::Exhausted { attempts, error }) => {
                assert_eq!(attempts, 3);
                assert_eq!(error, "slow 3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_is_cut_at_budget() {
        let p = RetryPolicy {
            latency_budget_ms: 250,
            ..policy(0, 0)
        };
        let start = Instant::now();
        let result: Result<(), RetryError<String>> = with_retry(&p, |attempt| async move {
            if attempt == 1 {
                AttemptOutcome::Retry("first".to_string())
            } else {
                tokio::time::sleep(Duration::from_secs(60)).await;
                AttemptOutcome::Success(())
            }
        })
        .await;

        let waited = start.elapsed().as_millis();
        assert!((250..=251).contains(&waited), "{waited}");
        match result {
            Err(RetryError::BudgetSpent { attempts, last_error }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error.as_deref(), Some("first"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
