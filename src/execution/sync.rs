//! Synchronization primitives shared by the parallel engines.
//!
//! - [`Tally`] counts a known number of completions and resets itself.
//! - [`RoundBarrier`] is a reusable counting barrier that carries state; the
//!   last party to arrive in a round advances it before anyone is released.
//! - [`scatter_gather`] runs one unit of work per scoped thread and waits for
//!   every unit to report back over a channel.

use parking_lot::{Condvar, Mutex};

/// Counts completions towards a fixed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    expected: usize,
    seen: usize,
}

impl Tally {
    /// Expect `expected` completions per cycle.
    pub fn new(expected: usize) -> Self {
        Self { expected, seen: 0 }
    }

    /// Record one completion; returns `true` (and resets) when the cycle is full.
    pub fn record(&mut self) -> bool {
        self.seen += 1;
        if self.seen >= self.expected {
            self.seen = 0;
            true
        } else {
            false
        }
    }

    /// Completions recorded in the current cycle.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

struct Round<S> {
    state: S,
    arrivals: Tally,
    generation: u64,
}

/// A reusable barrier guarding a piece of shared state.
///
/// All access to the state goes through the barrier's lock. Each round every
/// party calls [`arrive`](Self::arrive) exactly once; the last arrival runs
/// the `advance` step, and each party then reads what it needs for the next
/// round under the same lock acquisition that released it.
pub struct RoundBarrier<S> {
    round: Mutex<Round<S>>,
    released: Condvar,
}

impl<S> RoundBarrier<S> {
    /// Create a barrier for `parties` participants.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    pub fn new(parties: usize, state: S) -> Self {
        assert!(parties > 0, "a barrier needs at least one party");
        Self {
            round: Mutex::new(Round {
                state,
                arrivals: Tally::new(parties),
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Run `f` on the state under the lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.round.lock().state)
    }

    /// Number of completed rounds.
    pub fn generation(&self) -> u64 {
        self.round.lock().generation
    }

    /// Arrive at the barrier.
    ///
    /// `deposit` runs for every party as it arrives. The last party runs
    /// `advance`, then everyone is released and runs `observe` before the
    /// lock is dropped.
    pub fn arrive<R>(
        &self,
        deposit: impl FnOnce(&mut S),
        advance: impl FnOnce(&mut S),
        observe: impl FnOnce(&mut S) -> R,
    ) -> R {
        let mut round = self.round.lock();
        deposit(&mut round.state);

        if round.arrivals.record() {
            advance(&mut round.state);
            round.generation = round.generation.wrapping_add(1);
            self.released.notify_all();
        } else {
            let generation = round.generation;
            // Spurious wakeups leave the generation unchanged
            while round.generation == generation {
                self.released.wait(&mut round);
            }
        }

        observe(&mut round.state)
    }

    /// Take the state back once every party has left.
    pub fn into_state(self) -> S {
        self.round.into_inner().state
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for RoundBarrier<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let round = self.round.lock();
        f.debug_struct("RoundBarrier")
            .field("state", &round.state)
            .field("arrivals", &round.arrivals)
            .field("generation", &round.generation)
            .finish()
    }
}

/// Run `work` on every unit in its own scoped thread and collect the results
/// in unit order.
///
/// Returns once every unit has reported completion.
pub fn scatter_gather<U, R, F>(units: Vec<U>, work: F) -> Vec<R>
where
    U: Send,
    R: Send,
    F: Fn(U) -> R + Sync,
{
    let count = units.len();
    if count == 0 {
        return Vec::new();
    }

    let (done_tx, done_rx) = crossbeam::channel::bounded(count);
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(count).collect();

    std::thread::scope(|scope| {
        let work = &work;
        for (slot, unit) in units.into_iter().enumerate() {
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                // The receiver outlives every sender in this scope
                let _ = done_tx.send((slot, work(unit)));
            });
        }
        drop(done_tx);

        let mut tally = Tally::new(count);
        for (slot, result) in done_rx.iter() {
            slots[slot] = Some(result);
            if tally.record() {
                break;
            }
        }
    });

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_tally_resets() {
        let mut tally = Tally::new(3);
        assert!(!tally.record());
        assert!(!tally.record());
        assert_eq!(tally.seen(), 2);
        assert!(tally.record());
        assert_eq!(tally.seen(), 0);
        assert!(!tally.record());
    }

    #[test]
    fn test_single_party_never_blocks() {
        let barrier = RoundBarrier::new(1, 0u32);
        for _ in 0..5 {
            barrier.arrive(|_| {}, |count| *count += 1, |_| ());
        }
        assert_eq!(barrier.into_state(), 5);
    }

    #[test]
    fn test_rounds_advance_once_per_round() {
        const PARTIES: usize = 4;
        const ROUNDS: usize = 25;

        let barrier = Arc::new(RoundBarrier::new(PARTIES, (0usize, 0usize)));
        let mismatches = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..PARTIES {
                let barrier = Arc::clone(&barrier);
                let mismatches = Arc::clone(&mismatches);
                scope.spawn(move || {
                    let mut round = barrier.with_state(|(round, _)| *round);
                    for _ in 0..ROUNDS {
                        let next = barrier.arrive(
                            |(_, arrivals)| *arrivals += 1,
                            |(round, arrivals)| {
                                assert_eq!(*arrivals, PARTIES);
                                *arrivals = 0;
                                *round += 1;
                            },
                            |(round, _)| *round,
                        );
                        if next != round + 1 {
                            mismatches.fetch_add(1, Ordering::Relaxed);
                        }
                        round = next;
                    }
                });
            }
        });

        assert_eq!(mismatches.load(Ordering::Relaxed), 0);
        assert_eq!(barrier.generation(), ROUNDS as u64);
        let barrier = Arc::try_unwrap(barrier).unwrap();
        assert_eq!(barrier.into_state(), (ROUNDS, 0));
    }

    #[test]
    fn test_scatter_gather_keeps_unit_order() {
        let results = scatter_gather((0..8).collect(), |n: u32| n * n);
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
        assert!(scatter_gather(Vec::<u32>::new(), |n| n).is_empty());
    }
}
