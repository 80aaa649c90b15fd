// Copyright 2023 Viktor Reusch
//
// This file is part of kml2gpx.
//
// kml2gpx is free software: you can redistribute it and/or modify it under the
// terms of the GNU Affero General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any
// later version.
//
// kml2gpx is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
// A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml2gpx. If not, see <https://www.gnu.org/licenses/>.

//! Command-line interface of the KML-to-GPX converter.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kml2gpx::Error;

mod kml;
mod private_radar;

#[derive(Parser, Debug)]
#[command(name = "kml2gpx", version)]
#[command(about = "Convert flight-tracking KML exports to GPX", long_about = None)]
struct Args {
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output GPX file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert KML files
    Kml(kml::KmlArgs),
    /// Load flights from Private Radar
    PrivateRadar(private_radar::PrivateRadarArgs),
}

/// Run the selected command and return the written file, if any.
fn run(args: Args) -> Result<Option<PathBuf>, Error> {
    match args.command {
        Command::Kml(kml_args) => {
            let job = kml::KmlJob::new(kml_args, args.output)?;
            job.run().map(Some)
        }
        Command::PrivateRadar(radar_args) => private_radar::run(radar_args, args.output),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(Some(path)) => {
            println!("{} written successfully.", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Conversion failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kml_arguments() {
        let args = Args::try_parse_from([
            "kml2gpx", "kml", "-i", "a.kml", "b.kml", "--start", "2022-06-01T10:00:00Z",
            "2022-06-02T10:00:00Z", "--end", "2022-06-01T11:00:00Z", "2022-06-02T11:00:00Z",
            "-o", "out.gpx",
        ])
        .unwrap();

        assert_eq!(args.output, Some(PathBuf::from("out.gpx")));
        match args.command {
            Command::Kml(kml) => {
                assert_eq!(kml.inputs.len(), 2);
                assert_eq!(kml.starts.len(), 2);
                assert_eq!(kml.ends.len(), 2);
                assert_eq!(kml.layer, kml2gpx::DEFAULT_LAYER);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn input_is_required() {
        assert!(Args::try_parse_from(["kml2gpx", "kml"]).is_err());
    }

    #[test]
    fn negative_flight_offset() {
        let args = Args::try_parse_from(["kml2gpx", "private-radar", "--flight", "-1"]).unwrap();

        match args.command {
            Command::PrivateRadar(radar) => assert_eq!(radar.flight, Some(-1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_or_flight() {
        assert!(Args::try_parse_from(["kml2gpx", "private-radar"]).is_err());
        assert!(Args::try_parse_from(["kml2gpx", "private-radar", "--list", "--flight", "3"]).is_err());
        assert!(Args::try_parse_from(["kml2gpx", "private-radar", "--list", "--nb", "0"]).is_err());

        let args = Args::try_parse_from(["kml2gpx", "private-radar", "--list", "--nb", "5"]).unwrap();
        match args.command {
            Command::PrivateRadar(radar) => {
                assert!(radar.list);
                assert_eq!(radar.nb, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_times_fail_before_reading() {
        let args = Args::try_parse_from([
            "kml2gpx", "kml", "-i", "missing-a.kml", "missing-b.kml", "--start",
            "2022-06-01T10:00:00Z", "--end", "2022-06-01T11:00:00Z",
        ])
        .unwrap();

        assert!(matches!(run(args), Err(Error::Usage(_))));
    }
}
