use cg_core::ARCADE_IDLE_TTL;
use cg_core::Pounds;
use cg_core::SessionId;
use cg_core::Streak;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Stamp<T> {
    value: T,
    touched: Instant,
}

impl<T> Stamp<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            touched: Instant::now(),
        }
    }
}

/// Ephemeral state for the two anonymous modes, keyed by session id.
///
/// Zero mode accumulates absolute differences forever; streak mode
/// counts consecutive within-tolerance guesses and resets on a miss.
/// A missed streak is parked so exactly one leaderboard submission can
/// claim it. Entries idle past `ARCADE_IDLE_TTL` are reaped on the
/// next mutation, bounding orphaned anonymous state.
#[derive(Debug, Default)]
pub struct Arcade {
    zero: HashMap<SessionId, Stamp<Pounds>>,
    streak: HashMap<SessionId, Stamp<Streak>>,
    parked: HashMap<SessionId, Stamp<Streak>>,
}

impl Arcade {
    fn reap(&mut self) {
        let cutoff = Instant::now();
        self.zero
            .retain(|_, s| cutoff.duration_since(s.touched) < ARCADE_IDLE_TTL);
        self.streak
            .retain(|_, s| cutoff.duration_since(s.touched) < ARCADE_IDLE_TTL);
        self.parked
            .retain(|_, s| cutoff.duration_since(s.touched) < ARCADE_IDLE_TTL);
    }

    /// Adds a guess's absolute difference and returns the running total.
    pub fn zero_guess(&mut self, id: &SessionId, difference: Pounds) -> Pounds {
        self.reap();
        let entry = self
            .zero
            .entry(id.clone())
            .or_insert_with(|| Stamp::new(0));
        entry.value += difference;
        entry.touched = Instant::now();
        entry.value
    }

    /// Current zero-mode total, if the session has guessed at all.
    pub fn zero_score(&self, id: &SessionId) -> Option<Pounds> {
        self.zero.get(id).map(|s| s.value)
    }

    /// A within-tolerance guess: extends the streak and returns it.
    pub fn streak_hit(&mut self, id: &SessionId) -> Streak {
        self.reap();
        let entry = self
            .streak
            .entry(id.clone())
            .or_insert_with(|| Stamp::new(0));
        entry.value += 1;
        entry.touched = Instant::now();
        entry.value
    }

    /// A miss: clears the streak and parks its terminal value for one
    /// leaderboard submission. Returns the streak that just ended.
    pub fn streak_miss(&mut self, id: &SessionId) -> Streak {
        self.reap();
        let ended = self.streak.remove(id).map(|s| s.value).unwrap_or(0);
        if ended > 0 {
            self.parked.insert(id.clone(), Stamp::new(ended));
        }
        ended
    }

    /// Consumes the parked terminal streak for a session, if any.
    pub fn take_streak(&mut self, id: &SessionId) -> Option<Streak> {
        self.parked.remove(id).map(|s| s.value)
    }

    #[cfg(test)]
    fn backdate(&mut self, id: &SessionId, by: std::time::Duration) {
        if let Some(s) = self.zero.get_mut(id) {
            s.touched = Instant::now() - by;
        }
        if let Some(s) = self.streak.get_mut(id) {
            s.touched = Instant::now() - by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::Arbitrary;

    #[test]
    fn zero_accumulates_differences() {
        let mut arcade = Arcade::default();
        let id = SessionId::random();
        assert_eq!(arcade.zero_guess(&id, 500), 500);
        assert_eq!(arcade.zero_guess(&id, 1200), 1700);
        assert_eq!(arcade.zero_score(&id), Some(1700));
        assert_eq!(arcade.zero_score(&SessionId::random()), None);
    }

    #[test]
    fn streak_counts_and_resets() {
        let mut arcade = Arcade::default();
        let id = SessionId::random();
        assert_eq!(arcade.streak_hit(&id), 1);
        assert_eq!(arcade.streak_hit(&id), 2);
        assert_eq!(arcade.streak_hit(&id), 3);
        assert_eq!(arcade.streak_miss(&id), 3);
        // state cleared: the next run starts over
        assert_eq!(arcade.streak_hit(&id), 1);
    }

    #[test]
    fn terminal_streak_is_claimable_exactly_once() {
        let mut arcade = Arcade::default();
        let id = SessionId::random();
        arcade.streak_hit(&id);
        arcade.streak_hit(&id);
        arcade.streak_miss(&id);
        assert_eq!(arcade.take_streak(&id), Some(2));
        assert_eq!(arcade.take_streak(&id), None);
    }

    #[test]
    fn missing_with_no_streak_parks_nothing() {
        let mut arcade = Arcade::default();
        let id = SessionId::random();
        assert_eq!(arcade.streak_miss(&id), 0);
        assert_eq!(arcade.take_streak(&id), None);
    }

    #[test]
    fn idle_entries_are_reaped() {
        let mut arcade = Arcade::default();
        let old = SessionId::random();
        let live = SessionId::random();
        arcade.zero_guess(&old, 100);
        arcade.streak_hit(&old);
        arcade.backdate(&old, ARCADE_IDLE_TTL + std::time::Duration::from_secs(1));
        arcade.zero_guess(&live, 50);
        assert_eq!(arcade.zero_score(&old), None);
        assert_eq!(arcade.zero_score(&live), Some(50));
        assert_eq!(arcade.streak_hit(&old), 1);
    }
}
