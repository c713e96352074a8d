//! Deadline for the whole action.
//!
//! The watchdog is armed once at startup. Work run through [`Watchdog::guard`]
//! either finishes first or is abandoned with
//! [`TransferError::DeadlineExceeded`]; the caller then exits the process, so
//! a thread stuck in a blocking dial or copy is never waited for.

use crate::utils::error::TransferError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct Watchdog {
    limit: Duration,
    fired: oneshot::Receiver<()>,
    timer: JoinHandle<()>,
}

impl Watchdog {
    /// Starts the timer. Must be called inside a tokio runtime.
    pub fn arm(limit: Duration) -> Self {
        let deadline = Instant::now() + limit;
        let (tx, fired) = oneshot::channel();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(());
        });
        log::debug!("Watchdog armed for {:?}", limit);

        Self {
            limit,
            fired,
            timer,
        }
    }

    /// Runs `work` unless the deadline passes first. Consumes the watchdog;
    /// the timer is cancelled either way.
    pub async fn guard<T, F>(mut self, work: F) -> Result<T, TransferError>
    where
        F: Future<Output = Result<T, TransferError>>,
    {
        tokio::select! {
            result = work => result,
            _ = &mut self.fired => {
                log::error!("Action did not finish within {:?}", self.limit);
                Err(TransferError::DeadlineExceeded(self.limit))
            }
        }
    }

    pub fn cancel(self) {
        self.timer.abort();
        log::debug!("Watchdog cancelled");
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn finished_work_wins() {
        let watchdog = Watchdog::arm(Duration::from_secs(60));
        let result = watchdog
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, TransferError>(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_work_hits_the_deadline() {
        let watchdog = Watchdog::arm(Duration::from_secs(3));
        let result = watchdog
            .guard(std::future::pending::<Result<(), TransferError>>())
            .await;
        match result {
            Err(TransferError::DeadlineExceeded(limit)) => {
                assert_eq!(limit, Duration::from_secs(3))
            }
            other => panic!("expected deadline error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn work_errors_pass_through() {
        let watchdog = Watchdog::arm(Duration::from_secs(3));
        let result: Result<(), _> = watchdog
            .guard(async { Err(TransferError::Config("bad".into())) })
            .await;
        assert!(matches!(result, Err(TransferError::Config(_))));
    }

    // 等待被中止的计时任务结束
    async fn settled(timer: &tokio::task::AbortHandle) -> bool {
        for _ in 0..16 {
            if timer.is_finished() {
                return true;
            }
            tokio::task::yield_now().await;
        }
        timer.is_finished()
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_watchdog_stops_the_timer() {
        let watchdog = Watchdog::arm(Duration::from_secs(60));
        let timer = watchdog.timer.abort_handle();
        assert!(!timer.is_finished());

        drop(watchdog);
        assert!(settled(&timer).await);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_guard_stops_the_timer() {
        let watchdog = Watchdog::arm(Duration::from_secs(60));
        let timer = watchdog.timer.abort_handle();

        let result = watchdog.guard(async { Ok::<_, TransferError>("done") }).await;
        assert_eq!(result.unwrap(), "done");
        assert!(settled(&timer).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_timer() {
        let watchdog = Watchdog::arm(Duration::from_secs(60));
        let timer = watchdog.timer.abort_handle();
        watchdog.cancel();
        assert!(settled(&timer).await);
    }
}
