//! triggers a sysrq when the host runs out of cpu.

use {
    clap::Parser,
    cpu_sysrq::{App, cli::Args, config::Config, logging},
};

type Error = Box<dyn std::error::Error>;

fn main() -> Result<(), Error> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let config = Config::from(args);
    let app = App::new(&config)?;
    app.run();

    Ok(())
}
