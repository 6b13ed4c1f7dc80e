use std::{
    any::Any,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    time::{Duration, Instant},
};

use tracing::{trace, warn};

use crate::{
    agent::{Agent, AgentId},
    game_interface::{MatchEngine, Outcome},
    rating::RatingSystem,
};

/// A played and rated match. Both agents travel back to the trainer inside it.
#[derive(Debug)]
pub struct MatchReport<P> {
    pub first: Agent<P>,
    pub second: Agent<P>,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl<P> Display for MatchReport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} VS {}]: {}",
            self.first.id(),
            self.second.id(),
            self.outcome
        )
    }
}

/// The match could not be played to the end.
///
/// The agents are lost with it: the training run cannot go on with two agents missing their
/// game.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("match {first} VS {second} failed: {reason}")]
pub struct MatchError {
    pub first: AgentId,
    pub second: AgentId,
    pub reason: String,
}

pub type RunnerResult<P> = Result<MatchReport<P>, MatchError>;

/// Plays `first` against `second` and applies the outcome to their ratings.
///
/// A panic inside the engine or the rating system is caught and reported like an engine
/// error, so that the trainer waiting for this result is not left hanging.
pub fn run_match<P, E, R>(
    mut first: Agent<P>,
    mut second: Agent<P>,
    engine: &E,
    ratings: &R,
) -> RunnerResult<P>
where
    E: MatchEngine<P> + ?Sized,
    R: RatingSystem + ?Sized,
{
    let start = Instant::now();
    let played = panic::catch_unwind(AssertUnwindSafe(|| {
        let outcome = engine.play(first.player(), second.player())?;
        let (first_rating, second_rating) = ratings.rate(first.rating(), second.rating(), outcome);
        anyhow::Ok((outcome, first_rating, second_rating))
    }));

    let (outcome, first_rating, second_rating) = match played {
        Ok(Ok(rated)) => rated,
        Ok(Err(e)) => return Err(failure(&first, &second, format!("{e:#}"))),
        Err(payload) => {
            let reason = format!("match panicked: {}", panic_message(payload.as_ref()));
            return Err(failure(&first, &second, reason));
        }
    };
    first.record_match(first_rating);
    second.record_match(second_rating);

    let report = MatchReport {
        first,
        second,
        outcome,
        elapsed: start.elapsed(),
    };
    trace!("{report} in {:?}", report.elapsed);
    Ok(report)
}

fn failure<P>(first: &Agent<P>, second: &Agent<P>, reason: String) -> MatchError {
    let error = MatchError {
        first: first.id(),
        second: second.id(),
        reason,
    };
    warn!("{error}");
    error
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
