//! Play queue resolver
//!
//! Pure next/previous selection for the four play modes. The only state it
//! touches is the caller-supplied shuffle history; randomness comes from the
//! caller's `Rng` so draws are reproducible under a seeded generator.
//!
//! Indices are resolved from the *pending* position (the track queued to play
//! next), not from the track currently loaded in the engine.

use cadence_common::PlayMode;
use rand::Rng;

/// What the controller should do with a resolved index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEffect {
    /// Play the resolved index
    Advance,
    /// End of a sequential list reached without user intent: stop instead
    StopAtEnd,
    /// Replay the current track without moving the index
    LoopCurrent,
}

/// Result of a next/previous resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub effect: QueueEffect,
}

impl Resolution {
    fn advance(index: usize) -> Self {
        Self {
            index,
            effect: QueueEffect::Advance,
        }
    }
}

/// Stack of indices left behind by forward shuffle steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleHistory {
    entries: Vec<usize>,
}

impl ShuffleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize) {
        self.entries.push(index);
    }

    /// Most recent entry, if any
    pub fn pop(&mut self) -> Option<usize> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first
    pub fn as_slice(&self) -> &[usize] {
        &self.entries
    }
}

/// Resolve the track after `pending` under `mode`
///
/// `len` must be non-zero.
pub fn resolve_next<R: Rng + ?Sized>(
    mode: PlayMode,
    pending: usize,
    len: usize,
    history: &mut ShuffleHistory,
    from_user: bool,
    rng: &mut R,
) -> Resolution {
    debug_assert!(len > 0, "resolve_next on an empty playlist");
    match mode {
        PlayMode::RepeatAll => Resolution::advance(wrap_forward(pending, len)),
        PlayMode::Sequential => sequential_next(pending, len, from_user),
        PlayMode::Shuffle => {
            history.push(pending);
            Resolution::advance(rng.gen_range(0..len))
        }
        PlayMode::RepeatSingle if from_user => sequential_next(pending, len, true),
        PlayMode::RepeatSingle => Resolution {
            index: pending,
            effect: QueueEffect::LoopCurrent,
        },
    }
}

/// Resolve the track before `pending` under `mode`
///
/// `len` must be non-zero.
pub fn resolve_previous<R: Rng + ?Sized>(
    mode: PlayMode,
    pending: usize,
    len: usize,
    history: &mut ShuffleHistory,
    from_user: bool,
    rng: &mut R,
) -> Resolution {
    debug_assert!(len > 0, "resolve_previous on an empty playlist");
    match mode {
        PlayMode::RepeatAll | PlayMode::Sequential => {
            Resolution::advance(wrap_backward(pending, len))
        }
        PlayMode::Shuffle => {
            // A stale entry from a longer playlist falls back to a fresh draw
            let index = match history.pop() {
                Some(index) if index < len => index,
                _ => rng.gen_range(0..len),
            };
            Resolution::advance(index)
        }
        PlayMode::RepeatSingle if from_user => Resolution::advance(wrap_backward(pending, len)),
        PlayMode::RepeatSingle => Resolution {
            index: pending,
            effect: QueueEffect::LoopCurrent,
        },
    }
}

fn sequential_next(pending: usize, len: usize, from_user: bool) -> Resolution {
    let next = wrap_forward(pending, len);
    if next == 0 && !from_user {
        // Stay on the last track
        return Resolution {
            index: len - 1,
            effect: QueueEffect::StopAtEnd,
        };
    }
    Resolution::advance(next)
}

fn wrap_forward(pending: usize, len: usize) -> usize {
    (pending + 1) % len
}

fn wrap_backward(pending: usize, len: usize) -> usize {
    if pending == 0 || pending >= len {
        len - 1
    } else {
        pending - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_repeat_all_wraps_both_ways() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let len = 3;

        let mut index = 0;
        for expected in [1, 2, 0, 1] {
            let r = resolve_next(PlayMode::RepeatAll, index, len, &mut history, false, &mut rng);
            assert_eq!(r, Resolution::advance(expected));
            index = r.index;
        }

        let mut index = 1;
        for expected in [0, 2, 1, 0] {
            let r = resolve_previous(PlayMode::RepeatAll, index, len, &mut history, true, &mut rng);
            assert_eq!(r, Resolution::advance(expected));
            index = r.index;
        }
        assert!(history.is_empty());
    }

    #[test]
    fn test_repeat_all_never_out_of_bounds() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        for len in 1..6 {
            let mut index = 0;
            for step in 0..20 {
                let r = if step % 3 == 0 {
                    resolve_previous(PlayMode::RepeatAll, index, len, &mut history, false, &mut rng)
                } else {
                    resolve_next(PlayMode::RepeatAll, index, len, &mut history, false, &mut rng)
                };
                let expected = if step % 3 == 0 {
                    (index + len - 1) % len
                } else {
                    (index + 1) % len
                };
                assert_eq!(r.index, expected);
                assert!(r.index < len);
                assert_eq!(r.effect, QueueEffect::Advance);
                index = r.index;
            }
        }
    }

    #[test]
    fn test_sequential_stops_at_end_without_user() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();

        let r = resolve_next(PlayMode::Sequential, 2, 3, &mut history, false, &mut rng);
        assert_eq!(r.effect, QueueEffect::StopAtEnd);
        assert_eq!(r.index, 2);

        let r = resolve_next(PlayMode::Sequential, 0, 3, &mut history, false, &mut rng);
        assert_eq!(r, Resolution::advance(1));
    }

    #[test]
    fn test_sequential_user_wraps_to_start() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let r = resolve_next(PlayMode::Sequential, 2, 3, &mut history, true, &mut rng);
        assert_eq!(r, Resolution::advance(0));
    }

    #[test]
    fn test_sequential_previous_wraps_to_end() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let r = resolve_previous(PlayMode::Sequential, 0, 4, &mut history, false, &mut rng);
        assert_eq!(r, Resolution::advance(3));
    }

    #[test]
    fn test_single_track_sequential() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let r = resolve_next(PlayMode::Sequential, 0, 1, &mut history, false, &mut rng);
        assert_eq!(r.effect, QueueEffect::StopAtEnd);
        let r = resolve_next(PlayMode::Sequential, 0, 1, &mut history, true, &mut rng);
        assert_eq!(r, Resolution::advance(0));
    }

    #[test]
    fn test_repeat_single_loops_on_completion() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let r = resolve_next(PlayMode::RepeatSingle, 1, 3, &mut history, false, &mut rng);
        assert_eq!(r.effect, QueueEffect::LoopCurrent);
        assert_eq!(r.index, 1);

        let r = resolve_previous(PlayMode::RepeatSingle, 1, 3, &mut history, false, &mut rng);
        assert_eq!(r.effect, QueueEffect::LoopCurrent);
    }

    #[test]
    fn test_repeat_single_user_skip_behaves_sequentially() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        assert_eq!(
            resolve_next(PlayMode::RepeatSingle, 1, 3, &mut history, true, &mut rng),
            Resolution::advance(2)
        );
        assert_eq!(
            resolve_next(PlayMode::RepeatSingle, 2, 3, &mut history, true, &mut rng),
            Resolution::advance(0)
        );
        assert_eq!(
            resolve_previous(PlayMode::RepeatSingle, 0, 3, &mut history, true, &mut rng),
            Resolution::advance(2)
        );
    }

    #[test]
    fn test_shuffle_previous_returns_to_index_before_next() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        for start in 0..5 {
            let forward = resolve_next(PlayMode::Shuffle, start, 5, &mut history, true, &mut rng);
            assert!(forward.index < 5);
            assert_eq!(history.as_slice().last(), Some(&start));

            let back = resolve_previous(PlayMode::Shuffle, forward.index, 5, &mut history, true, &mut rng);
            assert_eq!(back, Resolution::advance(start));
            assert!(history.is_empty());
        }
    }

    #[test]
    fn test_shuffle_history_is_lifo() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        let first = resolve_next(PlayMode::Shuffle, 0, 10, &mut history, true, &mut rng);
        let _second = resolve_next(PlayMode::Shuffle, first.index, 10, &mut history, true, &mut rng);
        assert_eq!(history.as_slice(), &[0, first.index]);

        let back = resolve_previous(PlayMode::Shuffle, 9, 10, &mut history, true, &mut rng);
        assert_eq!(back.index, first.index);
        let back = resolve_previous(PlayMode::Shuffle, back.index, 10, &mut history, true, &mut rng);
        assert_eq!(back.index, 0);
    }

    #[test]
    fn test_shuffle_previous_with_empty_history_draws() {
        let mut history = ShuffleHistory::new();
        let mut rng = rng();
        for _ in 0..50 {
            let r = resolve_previous(PlayMode::Shuffle, 0, 4, &mut history, true, &mut rng);
            assert!(r.index < 4);
            assert_eq!(r.effect, QueueEffect::Advance);
        }
    }

    #[test]
    fn test_shuffle_is_deterministic_with_seed() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let mut ha = ShuffleHistory::new();
        let mut hb = ShuffleHistory::new();
        for i in 0..10 {
            let ra = resolve_next(PlayMode::Shuffle, i % 7, 7, &mut ha, true, &mut a);
            let rb = resolve_next(PlayMode::Shuffle, i % 7, 7, &mut hb, true, &mut b);
            assert_eq!(ra, rb);
        }
    }
}
