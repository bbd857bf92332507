use std::{
    io::{self, Write},
    iter::{once, repeat, repeat_n},
};

pub struct Meter {
    pub name: String,
    pub value: usize,
    pub width: usize,
}

/// === impl Meter ===

impl Meter {
    /// a meter of `availability` out of the capacity of `cpus` cpus, both scaled by 100.
    pub fn availability(availability: f64, cpus: usize, width: usize) -> Self {
        let capacity = (cpus as f64 * 100.0).max(1.0);
        let fraction = (availability / capacity).clamp(0.0, 1.0);

        Self {
            name: "avail".to_owned(),
            value: (fraction * width as f64).round() as usize,
            width,
        }
    }

    // XXX: a simple, hacky meter.
    pub fn draw(&self, writer: &mut impl Write) -> io::Result<()> {
        const ACTIVE: char = '█';
        const IDLE: char = ' ';
        const BORDER_L: char = '[';
        const BORDER_R: char = ']';

        let Self { name, value, width } = self;
        assert!(value <= width);

        // print the label.
        write!(writer, "{name}: ")?;

        // print the meter.
        let meter = {
            let active = repeat_n(ACTIVE, *value);
            let idle = repeat(IDLE);
            active.chain(idle).take(*width)
        };
        let meter = once(BORDER_L).chain(meter).chain(once(BORDER_R));
        writer.write_all(meter.collect::<String>().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn(meter: &Meter) -> String {
        let mut out = Vec::new();
        meter.draw(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn half_available() {
        let meter = Meter::availability(200.0, 4, 10);
        assert_eq!(meter.value, 5);
        assert_eq!(drawn(&meter), "avail: [█████     ]");
    }

    #[test]
    fn oversubscribed_is_empty() {
        let meter = Meter::availability(-35.0, 4, 10);
        assert_eq!(meter.value, 0);
        assert_eq!(drawn(&meter), "avail: [          ]");
    }

    #[test]
    fn idle_is_full() {
        let meter = Meter::availability(400.0, 4, 4);
        assert_eq!(drawn(&meter), "avail: [████]");
    }
}
