use crossbeam::sync::WaitGroup;
use log::{debug, warn};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::thread;

use crate::buffer::PixelBuffer;
use crate::kernel::grayscale;

/// What the static partitioner does with the `total % workers` pixels left over after
/// equal chunking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TailPolicy {
    /// Leave the remainder untouched.
    #[default]
    Skip,
    /// Extend the last worker's range to the end of the domain.
    LastWorker,
}

impl FromStr for TailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "last-worker" | "last_worker" | "last" => Ok(Self::LastWorker),
            other => Err(format!("unknown tail policy: {other} (expected skip or last-worker)")),
        }
    }
}

impl fmt::Display for TailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::LastWorker => "last-worker",
        })
    }
}

/// Splits `[0, total)` into one contiguous range per worker, each `total / workers` long.
pub fn partition_ranges(total: usize, workers: usize, policy: TailPolicy) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = total / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if policy == TailPolicy::LastWorker && i == workers - 1 { total } else { start + chunk };
            start..end
        })
        .collect()
}

/// Runs `task` for every index covered by [`partition_ranges`], one thread per range,
/// and returns once all of them have signalled completion. Returns the number of
/// indices processed.
pub fn for_each_partitioned<F>(total: usize, workers: usize, policy: TailPolicy, task: F) -> usize
where
    F: Fn(usize) + Sync,
{
    let ranges = partition_ranges(total, workers, policy);
    let covered = ranges.last().map_or(0, |r| r.end);
    if covered < total {
        warn!("static partition leaves {} tail pixels unprocessed", total - covered);
    }

    let done = WaitGroup::new();
    thread::scope(|s| {
        for (worker, range) in ranges.into_iter().enumerate() {
            let done = done.clone();
            let task = &task;
            s.spawn(move || {
                debug!("barrier worker {} processing {:?}", worker, range);
                for index in range {
                    task(index);
                }
                drop(done);
            });
        }
        done.wait();
    });
    covered
}

/// Barrier strategy: grayscale the buffer with `workers` statically partitioned threads.
pub fn process_with_barrier(buffer: &mut PixelBuffer, workers: usize, policy: TailPolicy) -> usize {
    let pixels = buffer.shared();
    for_each_partitioned(pixels.len(), workers, policy, |index| {
        // SAFETY: partition ranges are disjoint and lie inside [0, len).
        unsafe { pixels.update(index, grayscale) }
    })
}
