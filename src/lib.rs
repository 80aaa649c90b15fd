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

//! Library for converting flight tracks from [KML](https://developers.google.com/kml)
//! to [GPX](https://www.topografix.com/gpx.asp).
//!
//! Flight-tracking services export the path of a flight as KML layers without
//! any time information. This library reads the coordinates of one layer,
//! spreads timestamps evenly between the start and end of the flight, and
//! writes a GPX track which replay tools accept.
//!
//! See [`convert`] for the single-file pipeline, or combine [`read_segment`]
//! and [`writer::write_gpx`] for multiple files. The [`private_radar`] module
//! fetches KML exports straight from the tracking service.

use std::io::{self, Read};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use gpx::errors::GpxError;
use thiserror::Error;

pub mod layer;
pub mod private_radar;
pub mod track;
pub mod writer;

pub use track::{interpolate, parse_instant, FlightSegment, TrackCollection, TrackPoint};

/// Layer of flight-tracking KML exports carrying the barometric altitude.
pub const DEFAULT_LAYER: &str = "Altitude";

/// Error returned by every fallible operation of this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent command-line arguments.
    #[error("{0}")]
    Usage(String),
    /// A segment needs its start strictly before its end.
    #[error("start time {start} is not before end time {end}")]
    InvalidInterval {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    /// An instant could not be read as ISO-8601.
    #[error("invalid timestamp {text:?}: {source}")]
    InvalidInstant {
        text: String,
        source: chrono::ParseError,
    },

    /// No configuration file exists in any searched location.
    #[error("no configuration file found (searched: {})", display_paths(.searched))]
    ConfigMissing { searched: Vec<PathBuf> },
    /// The configuration file lacks a required section or key.
    #[error("invalid configuration file {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// Reading the configuration file failed.
    #[error("reading configuration failed: {0}")]
    ConfigRead(#[from] ini::Error),

    /// The KML document is not well-formed XML.
    #[error("reading KML failed: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The KML content does not follow the expected structure.
    #[error("cannot parse {token:?}: {reason}")]
    Parse { token: String, reason: String },
    /// No container of the document carries the requested layer name.
    #[error("layer {0:?} not found")]
    LayerNotFound(String),
    /// The requested layer exists but holds no coordinates.
    #[error("layer {0:?} has no coordinates")]
    EmptyLayer(String),
    /// A segment was built from zero points.
    #[error("cannot build a segment without points")]
    EmptySegment,

    /// A track point reached the writer without a timestamp.
    #[error("track point {index} of segment {segment} has no timestamp")]
    MissingTimestamp { segment: usize, index: usize },
    /// A timestamp falls outside of the range GPX can represent.
    #[error("timestamp out of range: {0}")]
    TimeRange(#[from] time::error::ComponentRange),
    /// GPX writing failed.
    #[error("writing GPX failed: {0}")]
    Gpx(#[from] GpxError),
    /// A file could not be read or written.
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    /// The backend answered, but reported a failure in its payload.
    #[error("Private Radar error: {0}")]
    Backend(String),
    /// The request could not be sent or its body not received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The configured base URL cannot be joined with an endpoint path.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The backend payload is not the expected JSON.
    #[error("invalid backend response: {0}")]
    Json(#[from] serde_json::Error),
    /// The flight ID or offset does not match any known flight.
    #[error("flight {0} not found")]
    FlightNotFound(i64),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read one KML document and turn its `layer` into a timestamped segment.
///
/// Timestamps are spread evenly between `start` and `end`, see
/// [`interpolate`].
pub fn read_segment(
    source: impl Read,
    layer: &str,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<FlightSegment, Error> {
    let points = layer::read_layer(source, layer)?;
    log::debug!("layer {layer:?}: {} points", points.len());
    interpolate(points, start, end)
}

/// Read a KML file and write a GPX file.
///
/// A complete KML document is read from `source`. The coordinates of the
/// [`DEFAULT_LAYER`] are timestamped between `start` and `end` and written as a
/// complete GPX document with a single track segment to `sink`.
///
/// If an error occurs, the function returns immediately. The `source` and
/// `sink` might have been modified in this case.
///
/// # Example
/// ```
/// # use kml2gpx::{convert, parse_instant};
/// #
/// let source = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <kml xmlns="http://www.opengis.net/kml/2.2">
///   <Document>
///     <Placemark>
///       <name>Altitude</name>
///       <LineString>
///         <altitudeMode>absolute</altitudeMode>
///         <coordinates>2.2945,48.858222,300 2.3,48.86,450</coordinates>
///       </LineString>
///     </Placemark>
///   </Document>
/// </kml>
/// "#;
/// let start = parse_instant("2022-06-01T10:00:00+02:00").unwrap();
/// let end = parse_instant("2022-06-01T10:30:00+02:00").unwrap();
/// let mut sink = vec![];
///
/// convert(source.as_bytes(), start, end, &mut sink).expect("conversion failed");
///
/// let gpx = String::from_utf8(sink).expect("GPX data is not valid UTF-8");
/// assert!(gpx.contains("<gpx"));
/// assert!(gpx.contains("2.2945"));
/// assert!(gpx.contains("48.858222"));
/// assert!(gpx.contains("<trkseg>"));
/// ```
pub fn convert(
    source: impl Read,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    sink: impl io::Write,
) -> Result<(), Error> {
    let segment = read_segment(source, DEFAULT_LAYER, start, end)?;
    let mut collection = TrackCollection::new();
    collection.push(segment);
    writer::write_gpx(&collection, sink)
}
