//! Bounded pool of threads for independent per party tasks
//!
//! Tasks are indexed `0..count` and distributed to the workers through a `crossbeam_channel` queue.
//! Every task runs to completion even if some of its siblings fail, and the results are returned in the index order.

use crossbeam_channel::unbounded;
use std::thread;

#[derive(Debug, Clone)]
pub struct Pool {
    workers: usize,
}

impl Pool {
    pub fn new(workers: usize) -> Self {
        Pool {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task(i)` for `i` in `0..count` and returns the results ordered by `i`
    ///
    /// The task receives nothing but its index, so it may only read shared data.
    pub fn parallelize<T, E, F>(&self, count: usize, task: F) -> Vec<Result<T, E>>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync,
    {
        if count == 0 {
            return Vec::new();
        }
        if count == 1 || self.workers == 1 {
            return (0..count).map(task).collect();
        }

        let (job_sender, jobs) = unbounded::<usize>();
        for i in 0..count {
            // the receiver is alive, sending cannot fail
            let _ = job_sender.send(i);
        }
        drop(job_sender);

        let (result_sender, results) = unbounded::<(usize, Result<T, E>)>();
        let task = &task;
        thread::scope(|scope| {
            for _ in 0..self.workers.min(count) {
                let jobs = jobs.clone();
                let result_sender = result_sender.clone();
                scope.spawn(move || {
                    for i in jobs.iter() {
                        let _ = result_sender.send((i, task(i)));
                    }
                });
            }
        });
        drop(result_sender);

        let mut slots = (0..count).map(|_| None).collect::<Vec<_>>();
        for (i, result) in results.try_iter() {
            slots[i] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn results_are_ordered() {
        let _ = env_logger::builder().is_test(true).try_init();
        let pool = Pool::new(4);
        let results = pool.parallelize(10, |i| {
            // later tasks finish first
            thread::sleep(Duration::from_millis(10 * (10 - i as u64)));
            Ok::<_, String>(i * 2)
        });
        let values = results.into_iter().collect::<Result<Vec<_>, _>>();
        assert_eq!(values, Ok(vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]));
    }

    #[test]
    fn errors_do_not_cancel_siblings() {
        let pool = Pool::new(3);
        let results = pool.parallelize(5, |i| {
            thread::sleep(Duration::from_millis(5 * (i as u64 % 2)));
            if i == 3 {
                Err(format!("task {} failed", i))
            } else {
                Ok(i * 2)
            }
        });
        assert_eq!(
            results,
            vec![
                Ok(0),
                Ok(2),
                Ok(4),
                Err("task 3 failed".to_string()),
                Ok(8)
            ]
        );
    }

    #[test]
    fn single_worker() {
        let pool = Pool::new(0);
        assert_eq!(pool.workers(), 1);
        let results = pool.parallelize(3, |i| Ok::<_, ()>(i + 1));
        assert_eq!(results, vec![Ok(1), Ok(2), Ok(3)]);
        assert!(pool.parallelize(0, |i| Ok::<_, ()>(i)).is_empty());
    }
}
