use {
    crate::{
        meter::Meter,
        monitor::{Action, Observation, Outcome},
    },
    crossterm::{
        QueueableCommand, cursor,
        style::{self, Stylize},
        terminal,
    },
    std::io::{self, Stdout, Write},
};

/// redraws a one-line availability meter after every poll.
pub struct Watch<W = Stdout> {
    out: W,
    /// total cpu capacity, in whole cpus.
    cpus: usize,
    /// the width of the meter, in columns.
    width: usize,
}

/// === impl Watch ===

impl Watch {
    /// returns a meter drawn on stdout, sized to the terminal.
    pub fn stdout(cpus: usize) -> io::Result<Self> {
        const LABEL: usize = 32;

        let (cols, _) = terminal::size()?;
        let width = usize::from(cols).saturating_sub(LABEL).clamp(10, 100);

        Ok(Self::new(io::stdout(), cpus, width))
    }
}

impl<W: Write> Watch<W> {
    pub fn new(out: W, cpus: usize, width: usize) -> Self {
        Self {
            out,
            cpus,
            width,
        }
    }

    /// draws the outcome of a poll over the previous line.
    pub fn draw(&mut self, outcome: &Outcome) -> io::Result<()> {
        let Self { out, cpus, width } = self;

        out.queue(cursor::MoveToColumn(0))?
            .queue(terminal::Clear(terminal::ClearType::CurrentLine))?;

        match outcome {
            Outcome::Observed(Observation {
                availability,
                action,
                ..
            }) => {
                let mut meter = Vec::new();
                Meter::availability(*availability, *cpus, *width).draw(&mut meter)?;
                let line = format!("{} {availability:>7.1}%", String::from_utf8_lossy(&meter));

                let line = if outcome.attempted() {
                    line.red()
                } else {
                    line.green()
                };
                out.queue(style::PrintStyledContent(line))?;

                if *action == Action::FireFailed {
                    out.queue(style::PrintStyledContent(" (trigger failed)".red()))?;
                }
            }
            Outcome::Primed => {
                out.queue(style::PrintStyledContent("waiting for a second sample".grey()))?;
            }
            Outcome::Collection(error) => {
                out.queue(style::PrintStyledContent(format!("{error}").yellow()))?;
            }
            Outcome::Rate(error) => {
                out.queue(style::PrintStyledContent(format!("{error}").yellow()))?;
            }
        }

        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            rate::RateError,
            sample::{Nanos, Sample},
        },
        std::time::{Duration, Instant},
    };

    fn drawn(outcome: &Outcome) -> String {
        let mut watch = Watch::new(Vec::new(), 4, 8);
        watch.draw(outcome).unwrap();
        String::from_utf8(watch.out).unwrap()
    }

    #[test]
    fn observation() {
        let now = Instant::now();
        let a = Sample::new(now, Vec::new(), Nanos::ZERO);
        let b = Sample::new(now + Duration::from_millis(100), Vec::new(), Nanos::new(200_000_000));
        let rate = crate::rate::compute(Some(&a), &b).unwrap();

        let out = drawn(&Outcome::Observed(Observation {
            rate,
            availability: rate.availability(4),
            action: Action::Idle,
        }));
        assert!(out.contains("avail: [████    ]"));
        assert!(out.contains("200.0%"));
    }

    #[test]
    fn failed_trigger() {
        let out = drawn(&Outcome::Observed(Observation {
            rate: crate::rate::Rate::ZERO,
            availability: 0.0,
            action: Action::FireFailed,
        }));
        assert!(out.contains("trigger failed"));
    }

    #[test]
    fn rate_error() {
        let out = drawn(&Outcome::Rate(RateError::NonMonotonicTime));
        assert!(out.contains("samples move backwards in time"));
    }
}
