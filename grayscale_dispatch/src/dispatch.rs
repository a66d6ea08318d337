use crossbeam::channel;
use crossbeam::sync::WaitGroup;
use log::debug;
use std::thread;

use crate::buffer::PixelBuffer;
use crate::kernel::grayscale;

/// Feeds every index in `[0, total)` through a bounded channel drained by `workers`
/// threads. With `capacity == 0` the channel is a rendezvous, so each send blocks until
/// a worker takes the index and at most `workers` indices are in flight.
///
/// Returns once the channel is closed and every worker has exited. Each index is
/// received by exactly one worker.
pub fn for_each_queued<F>(total: usize, workers: usize, capacity: usize, task: F) -> usize
where
    F: Fn(usize) + Sync,
{
    feed_queue(total, workers, capacity, task, |_| {})
}

/// Body of [`for_each_queued`]; `on_sent` runs on the sending thread after each
/// completed send.
fn feed_queue<F, S>(total: usize, workers: usize, capacity: usize, task: F, mut on_sent: S) -> usize
where
    F: Fn(usize) + Sync,
    S: FnMut(usize),
{
    let workers = workers.max(1);
    let (sender, receiver) = channel::bounded::<usize>(capacity);
    let done = WaitGroup::new();

    thread::scope(|s| {
        for worker in 0..workers {
            let receiver = receiver.clone();
            let done = done.clone();
            let task = &task;
            s.spawn(move || {
                let mut handled = 0usize;
                for index in receiver.iter() {
                    task(index);
                    handled += 1;
                }
                debug!("channel worker {} handled {} pixels", worker, handled);
                drop(done);
            });
        }
        drop(receiver);

        let mut sent = 0;
        for index in 0..total {
            // Only fails once every receiver is gone, i.e. a worker panicked.
            if sender.send(index).is_err() {
                break;
            }
            sent += 1;
            on_sent(index);
        }
        drop(sender);
        done.wait();
        sent
    })
}

/// Channel strategy: grayscale the buffer by dispatching pixel indices to `workers`.
pub fn process_with_channel(buffer: &mut PixelBuffer, workers: usize, capacity: usize) -> usize {
    let pixels = buffer.shared();
    for_each_queued(pixels.len(), workers, capacity, |index| {
        // SAFETY: the channel delivers each index in [0, len) to a single worker.
        unsafe { pixels.update(index, grayscale) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn hit_counts(total: usize, workers: usize, capacity: usize) -> Vec<usize> {
        let hits: Vec<AtomicUsize> = (0..total).map(|_| AtomicUsize::new(0)).collect();
        let sent = for_each_queued(total, workers, capacity, |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(sent, total);
        hits.into_iter().map(AtomicUsize::into_inner).collect()
    }

    #[test]
    fn rendezvous_delivers_each_index_once() {
        assert!(hit_counts(997, 4, 0).into_iter().all(|n| n == 1));
    }

    #[test]
    fn buffered_capacity_does_not_change_delivery() {
        assert!(hit_counts(997, 3, 64).into_iter().all(|n| n == 1));
    }

    #[test]
    fn empty_domain_returns_immediately() {
        assert_eq!(for_each_queued(0, 4, 0, |_| panic!("no tasks expected")), 0);
    }

    // Parks every worker inside its task, lets the sender run until it blocks, and
    // returns how many sends completed.
    fn sends_completed_while_workers_parked(workers: usize, capacity: usize) -> usize {
        let started = AtomicUsize::new(0);
        let sent = AtomicUsize::new(0);
        let (gate, parked) = channel::bounded::<()>(0);
        thread::scope(|s| {
            s.spawn(|| {
                feed_queue(
                    200,
                    workers,
                    capacity,
                    |_| {
                        started.fetch_add(1, Ordering::SeqCst);
                        let _ = parked.recv();
                    },
                    |_| {
                        sent.fetch_add(1, Ordering::SeqCst);
                    },
                );
            });

            let ceiling = workers + capacity;
            let deadline = Instant::now() + Duration::from_secs(5);
            while (started.load(Ordering::SeqCst) < workers || sent.load(Ordering::SeqCst) < ceiling)
                && Instant::now() < deadline
            {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(50));
            let completed = sent.load(Ordering::SeqCst);
            drop(gate);
            completed
        })
    }

    #[test]
    fn rendezvous_blocks_sender_once_every_worker_holds_a_task() {
        assert_eq!(sends_completed_while_workers_parked(4, 0), 4);
        assert_eq!(sends_completed_while_workers_parked(1, 0), 1);
    }

    #[test]
    fn buffered_channel_lets_sender_run_ahead_by_capacity() {
        assert_eq!(sends_completed_while_workers_parked(4, 8), 12);
    }
}
