use std::{fmt::Display, future::Future, sync::Arc};
use tokio::{sync::Semaphore, task::JoinSet};

/// Fan a unit of work out over `items` with at most `concurrency` units
/// in flight, and wait for all of them.
///
/// Unit failures are logged and swallowed: one bad package or page must
/// not take down the rest of the run. The permit is acquired before the
/// task is spawned, so a slow sink backpressures the dispatch loop
/// instead of queueing unbounded work.
pub async fn run_all<T, F, Fut, E>(label: &str, concurrency: usize, items: Vec<T>, op: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for item in items {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            // closed semaphore means we are shutting down
            break;
        };

        let unit = op(item);
        tasks.spawn(async move {
            let _permit = permit;
            unit.await
        });
    }

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("{label}: unit failed: {err}"),
            Err(err) => log::error!("{label}: worker panicked: {err}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test_log::test(tokio::test)]
    async fn bounds_parallelism_and_drains_all_units() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..32).collect();

        run_all("test", 4, items, |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            let done = done.clone();
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
                if i % 7 == 0 {
                    // failures must not stop the pool
                    return Err("synthetic failure".to_string());
                }
                Ok(())
            }
        })
        .await;

        assert_eq!(done.load(Ordering::SeqCst), 32);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }
}
