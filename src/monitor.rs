use {
    crate::{
        collector::{CgroupCollector, CollectError, Collector},
        rate::{self, Rate, RateError},
        sample::Sample,
        trigger::{SysrqTrigger, Trigger},
    },
    std::{fmt, str::FromStr},
    tracing::{debug, error, info, warn},
};


/// watches cpu availability, firing a trigger when it runs out.
pub struct Monitor<C = CgroupCollector, T = SysrqTrigger> {
    /// the source of cpu usage samples.
    collector: C,
    /// the emergency action.
    trigger: T,
    settings: Settings,
    state: State,
}

/// fixed parameters of a [`Monitor`].
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// total cpu capacity of the host, in whole cpus.
    pub cpus: usize,
    /// the trigger fires when availability is at or below this percentage.
    pub trigger_percent: i64,
    /// passed to the trigger when it fires.
    pub payload: String,
    /// what to do with a sample that no rate could be computed from.
    pub baseline: BaselinePolicy,
}

/// what to do with the baseline sample when no rate can be computed from a new one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BaselinePolicy {
    /// keep the previous baseline, discarding the rejected sample.
    #[default]
    Retain,
    /// replace the previous baseline with the rejected sample.
    Advance,
}

enum State {
    /// no sample has been collected yet.
    Uninitialized,
    /// a baseline sample exists, so rates can be computed.
    Tracking {
        /// the last accepted sample.
        last: Sample,
    },
}

/// the result of one poll.
#[derive(Debug)]
pub enum Outcome {
    /// no sample could be collected.
    Collection(CollectError),
    /// the first sample was collected; a rate needs another one.
    Primed,
    /// no rate could be computed from the new sample.
    Rate(RateError),
    /// a rate was observed.
    Observed(Observation),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub rate: Rate,
    /// idle cpu capacity, in whole-cpu units scaled by 100.
    pub availability: f64,
    pub action: Action,
}

/// what was done about an observation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// availability was above the threshold.
    Idle,
    /// the trigger fired.
    Fired,
    /// the trigger was attempted, but failed.
    FireFailed,
}

/// === impl Monitor ===

impl<C, T> Monitor<C, T>
where
    C: Collector,
    T: Trigger,
{
    /// creates a new [`Monitor`], without a baseline sample.
    pub fn new(collector: C, trigger: T, settings: Settings) -> Self {
        Self {
            collector,
            trigger,
            settings,
            state: State::Uninitialized,
        }
    }

    /// runs one poll: collect a sample, compute a rate, and fire the trigger if needed.
    ///
    /// errors are logged and reported in the returned [`Outcome`]; none are fatal.
    pub fn poll(&mut self) -> Outcome {
        let Self {
            collector,
            trigger,
            settings,
            state,
        } = self;

        let current = match collector.collect() {
            Ok(sample) => sample,
            Err(error) => {
                error!(%error, "failed to get cpu usage");
                return Outcome::Collection(error);
            }
        };

        let previous = match state {
            State::Uninitialized => None,
            State::Tracking { last } => Some(&*last),
        };
        let primed = previous.is_none();
        let total = current.total();

        // with no baseline, `compute` yields a zero rate that must not be compared against
        // the threshold.
        let rate = match rate::compute(previous, &current) {
            Ok(rate) => {
                *state = State::Tracking { last: current };
                rate
            }
            Err(error) => {
                warn!(%error, policy = ?settings.baseline, "failed to compute cpu usage");
                if settings.baseline == BaselinePolicy::Advance {
                    *state = State::Tracking { last: current };
                }
                return Outcome::Rate(error);
            }
        };

        if primed {
            debug!(%total, "collected first sample");
            return Outcome::Primed;
        }

        let availability = rate.availability(settings.cpus);
        debug!(
            usage = rate.as_f64() * 100.0,
            used = %rate.used(),
            elapsed = %rate.elapsed(),
            availability,
            "observed cpu usage"
        );

        let action = if availability <= settings.trigger_percent as f64 {
            Self::fire(trigger, settings, availability)
        } else {
            Action::Idle
        };

        Outcome::Observed(Observation {
            rate,
            availability,
            action,
        })
    }

    fn fire(trigger: &T, settings: &Settings, availability: f64) -> Action {
        let Settings {
            trigger_percent,
            payload,
            ..
        } = settings;

        info!(
            availability,
            trigger_percent = *trigger_percent,
            %payload,
            "triggering sysrq since cpu availability is at or below the trigger value"
        );

        match trigger.fire(payload) {
            Ok(()) => Action::Fired,
            Err(error) => {
                error!(%error, "failed to trigger sysrq");
                Action::FireFailed
            }
        }
    }

    /// returns the current baseline sample, if one has been collected.
    #[cfg(test)]
    pub(crate) fn baseline(&self) -> Option<&Sample> {
        match &self.state {
            State::Uninitialized => None,
            State::Tracking { last } => Some(last),
        }
    }
}

// === impl BaselinePolicy ===

impl FromStr for BaselinePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(Self::Retain),
            "advance" => Ok(Self::Advance),
            other => Err(format!(
                "unknown policy `{other}`, expected `retain` or `advance`"
            )),
        }
    }
}

impl fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retain => "retain",
            Self::Advance => "advance",
        })
    }
}

// === impl Outcome ===

impl Outcome {
    /// returns true if the trigger was attempted during this poll.
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            Self::Observed(Observation {
                action: Action::Fired | Action::FireFailed,
                ..
            })
        )
    }
}
