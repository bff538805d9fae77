use std::{io::Write, path::PathBuf, process::ExitCode, time::Instant};

use env_logger::Env;
use station_stats::{aggregate_file, Error};
use time::OffsetDateTime;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = error.exit_code();
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::from(code)
        }
    }
}

fn run() -> Result<(), Error> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(Error::Usage)?;

    log::debug!("started at {}", OffsetDateTime::now_utc());
    // Monotonic, wall clock adjustments must not skew the measure
    let started = Instant::now();
    let stations = aggregate_file(&path)?;
    log::info!(
        "read {} stations from `{}` in {:.6}s",
        stations.len(),
        path.display(),
        started.elapsed().as_secs_f64()
    );

    let report = stations.finalize();
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{report}")
        .and_then(|()| stdout.flush())
        .map_err(Error::Output)
}
