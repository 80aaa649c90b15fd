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

//! The `private-radar` subcommand: list flights or convert one of them.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use kml2gpx::private_radar::{
    load_config, FlightSummary, HttpClient, PrivateRadar, PrivateRadarConfig,
};
use kml2gpx::writer::write_gpx_file;
use kml2gpx::{parse_instant, read_segment, Error, TrackCollection, DEFAULT_LAYER};

#[derive(clap::Args, Debug)]
pub struct PrivateRadarArgs {
    /// Path to the configuration file
    #[arg(short, long, help_heading = "Configuration")]
    pub conf: Option<PathBuf>,

    /// Base URL of Private Radar
    #[arg(long, help_heading = "Configuration")]
    pub url: Option<String>,

    /// Authentication token
    #[arg(long, help_heading = "Configuration")]
    pub auth: Option<String>,

    /// List available flights and exit
    #[arg(short, long, conflicts_with = "flight", help_heading = "Flights list")]
    pub list: bool,

    /// Number of available flights to list
    #[arg(
        short,
        long,
        default_value_t = 50,
        value_parser = clap::value_parser!(u32).range(1..),
        help_heading = "Flights list"
    )]
    pub nb: u32,

    /// ID of the flight to convert (or -1 for the last flight, ...)
    #[arg(short, long, allow_negative_numbers = true, required_unless_present = "list")]
    pub flight: Option<i64>,

    /// Start time of the flight (ISO-8601), defaults to the logged block-off time
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// End time of the flight (ISO-8601), defaults to the logged block-on time
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// KML layer to extract
    #[arg(long, default_value = DEFAULT_LAYER)]
    pub layer: String,
}

/// Start and end of a flight.
type Interval = (DateTime<FixedOffset>, DateTime<FixedOffset>);

/// List flights, or convert the selected flight and return the written file.
pub fn run(args: PrivateRadarArgs, output: Option<PathBuf>) -> Result<Option<PathBuf>, Error> {
    // Bad times must not cost a round trip.
    let interval = parse_interval(&args)?;
    let radar = PrivateRadar::new(resolve_config(&args)?)?;
    execute(&radar, &args, interval, output)
}

fn parse_interval(args: &PrivateRadarArgs) -> Result<Option<Interval>, Error> {
    let (Some(start), Some(end)) = (&args.start, &args.end) else {
        return Ok(None);
    };
    let (start, end) = (parse_instant(start)?, parse_instant(end)?);
    if start >= end {
        return Err(Error::InvalidInterval { start, end });
    }
    Ok(Some((start, end)))
}

fn execute<C: HttpClient>(
    radar: &PrivateRadar<C>,
    args: &PrivateRadarArgs,
    interval: Option<Interval>,
    output: Option<PathBuf>,
) -> Result<Option<PathBuf>, Error> {
    if args.list {
        for flight in radar.list_flights(args.nb as usize)? {
            println!("{flight}");
        }
        return Ok(None);
    }

    let flight_id = args
        .flight
        .ok_or_else(|| Error::Usage("a flight ID is required".to_string()))?;
    convert_flight(radar, flight_id, interval, &args.layer, output).map(Some)
}

/// Download the KML of a flight and write it as GPX.
///
/// Without `interval`, the logged block-off and block-on times are used. A
/// flight ID missing from the listing is still downloaded if `interval` is
/// given.
fn convert_flight<C: HttpClient>(
    radar: &PrivateRadar<C>,
    flight_id: i64,
    interval: Option<Interval>,
    layer: &str,
    output: Option<PathBuf>,
) -> Result<PathBuf, Error> {
    let flight = match radar.get_flight(flight_id) {
        Ok(flight) => {
            println!("Loaded flight: {flight}");
            Some(flight)
        }
        Err(Error::FlightNotFound(id)) if id >= 0 && interval.is_some() => {
            log::warn!("flight #{id} is not listed, downloading its KML anyway");
            None
        }
        Err(err) => return Err(err),
    };

    let id = flight.as_ref().map_or(flight_id, |f| f.id);
    let (start, end) = interval
        .or_else(|| flight.as_ref().and_then(logged_interval))
        .ok_or_else(|| {
            Error::Usage(format!(
                "flight #{id} has no logged start and end times, use --start and --end"
            ))
        })?;

    let kml = radar.fetch_kml(id)?;
    let mut collection = TrackCollection::named(match &flight {
        Some(flight) => track_name(flight),
        None => format!("Flight #{id}"),
    });
    collection.push(read_segment(kml.as_slice(), layer, start, end)?);

    let output = output.unwrap_or_else(|| match &flight {
        Some(flight) => default_output(flight),
        None => unlisted_output(id),
    });
    write_gpx_file(&collection, &output)?;
    Ok(output)
}

/// Build the configuration from the command line and the configuration file.
///
/// The file is skipped if both `--url` and `--auth` are given.
fn resolve_config(args: &PrivateRadarArgs) -> Result<PrivateRadarConfig, Error> {
    let mut config = match (&args.conf, &args.url, &args.auth) {
        (Some(path), _, _) => PrivateRadarConfig::load_from(path)?,
        (None, Some(url), Some(auth)) => PrivateRadarConfig::new(url, auth),
        (None, _, _) => load_config()?,
    };

    if let Some(url) = &args.url {
        config.base_url = url.clone();
    }
    if let Some(auth) = &args.auth {
        config.token = auth.clone();
    }
    Ok(config)
}

fn logged_interval(flight: &FlightSummary) -> Option<Interval> {
    flight.start.zip(flight.end)
}

fn track_name(flight: &FlightSummary) -> String {
    format!("Flight #{} {} - {}", flight.id, flight.from, flight.to)
}

/// `<date>-<from>-<to>.gpx`, or `flight-<id>.gpx` without a logged start.
fn default_output(flight: &FlightSummary) -> PathBuf {
    match flight.start {
        Some(start) => format!("{}-{}-{}.gpx", start.format("%Y-%m-%d"), flight.from, flight.to).into(),
        None => unlisted_output(flight.id),
    }
}

fn unlisted_output(id: i64) -> PathBuf {
    format!("flight-{id}.gpx").into()
}
