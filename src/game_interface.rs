//! Module defining traits that need to be implemented to use the trainer

use rand::Rng;

/// What the trainable policy should implement.
///
/// A player is the genome of an agent: it is deep-copied when a survivor is cloned, mutated in
/// place on the copy, and created from scratch when the population needs fresh blood. Identity
/// and rating are kept by [`Agent`](crate::agent::Agent), not by the player.
pub trait Player: Clone + Send + 'static {
    /// Creates a brand-new, untrained player.
    fn fresh() -> Self;

    /// Randomly perturbs the player.
    ///
    /// `rate` is in `[0, 1]` and is interpreted by the implementation as a probability
    /// and/or an intensity. It is never called with `rate == 0.0`.
    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R);
}

/// Result of a single match, from the point of view of the first player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The first player won.
    FirstWins,
    /// The second player won.
    SecondWins,
    /// Nobody won.
    Draw,
}

impl Outcome {
    /// Actual score of the first player: `1.0` for a win, `0.5` for a draw, `0.0` for a loss.
    pub fn first_score(self) -> f64 {
        match self {
            Outcome::FirstWins => 1.0,
            Outcome::Draw => 0.5,
            Outcome::SecondWins => 0.0,
        }
    }

    /// Actual score of the second player.
    pub fn second_score(self) -> f64 {
        1.0 - self.first_score()
    }

    /// The same outcome seen from the other side of the board.
    pub fn swapped(self) -> Outcome {
        match self {
            Outcome::FirstWins => Outcome::SecondWins,
            Outcome::SecondWins => Outcome::FirstWins,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::FirstWins => "1-0",
            Outcome::SecondWins => "0-1",
            Outcome::Draw => "½-½",
        };
        write!(f, "{s}")
    }
}

/// What will be given to the trainer to let two players confront each other.
///
/// The engine is shared by every worker thread, hence `Sync`. It only sees the players by
/// reference: it cannot change who they are.
pub trait MatchEngine<P>: Send + Sync + 'static {
    /// Plays a complete contest and reports its outcome.
    ///
    /// # Error
    /// Returned when the match could not be played to the end. The trainer treats it as fatal:
    /// skipping the match would leave two agents without a game this sub-generation.
    fn play(&self, first: &P, second: &P) -> anyhow::Result<Outcome>;
}

impl<P, F> MatchEngine<P> for F
where
    F: Fn(&P, &P) -> anyhow::Result<Outcome> + Send + Sync + 'static,
{
    fn play(&self, first: &P, second: &P) -> anyhow::Result<Outcome> {
        self(first, second)
    }
}

#[cfg(test)]
mod interface_tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct DummyPlayer {
        strength: u32,
    }

    impl Player for DummyPlayer {
        fn fresh() -> Self {
            DummyPlayer { strength: 1 }
        }

        fn mutate<R: Rng + ?Sized>(&mut self, _rate: f64, rng: &mut R) {
            self.strength += rng.random_range(1..=3);
        }
    }

    struct StrongerWins;

    impl MatchEngine<DummyPlayer> for StrongerWins {
        fn play(&self, first: &DummyPlayer, second: &DummyPlayer) -> anyhow::Result<Outcome> {
            Ok(match first.strength.cmp(&second.strength) {
                std::cmp::Ordering::Greater => Outcome::FirstWins,
                std::cmp::Ordering::Less => Outcome::SecondWins,
                std::cmp::Ordering::Equal => Outcome::Draw,
            })
        }
    }

    fn run<P, E: MatchEngine<P>>(engine: &E, a: &P, b: &P) -> Outcome {
        engine.play(a, b).unwrap()
    }

    #[test]
    fn test_engine_trait() {
        let weak = DummyPlayer::fresh();
        let mut strong = weak.clone();
        strong.mutate(1.0, &mut rand::rng());
        assert!(strong.strength > weak.strength);
        assert_eq!(run(&StrongerWins, &strong, &weak), Outcome::FirstWins);
        assert_eq!(run(&StrongerWins, &weak, &strong), Outcome::SecondWins);
        assert_eq!(run(&StrongerWins, &weak, &weak), Outcome::Draw);
    }

    #[test]
    fn test_closure_engine() {
        let engine =
            |_: &DummyPlayer, _: &DummyPlayer| -> anyhow::Result<Outcome> { Ok(Outcome::Draw) };
        let p = DummyPlayer::fresh();
        assert_eq!(run(&engine, &p, &p), Outcome::Draw);
    }

    #[test]
    fn test_outcome_scores() {
        for outcome in [Outcome::FirstWins, Outcome::SecondWins, Outcome::Draw] {
            assert_eq!(outcome.first_score() + outcome.second_score(), 1.0);
            assert_eq!(outcome.swapped().first_score(), outcome.second_score());
        }
        assert_eq!(Outcome::Draw.to_string(), "½-½");
    }
}
