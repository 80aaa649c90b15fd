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

//! Track points, segments and the timestamp interpolation between them.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};

use crate::Error;

/// A single position of a flight.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackPoint {
    /// Degrees east.
    pub longitude: f64,
    /// Degrees north.
    pub latitude: f64,
    /// Meters above sea level.
    pub elevation: f64,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl TrackPoint {
    /// Create a point without timestamp.
    pub fn new(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
            timestamp: None,
        }
    }
}

/// Timestamped points read from one input, in source order.
///
/// Only [`interpolate`] builds segments, so every segment has at least one
/// point and every point carries a timestamp within `[start, end]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FlightSegment {
    points: Vec<TrackPoint>,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl FlightSegment {
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }
}

/// All segments going into one GPX document, in command-line order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackCollection {
    /// Name of the resulting GPX track.
    pub name: Option<String>,
    segments: Vec<FlightSegment>,
}

impl TrackCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection whose track is called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            segments: vec![],
        }
    }

    /// Append `segment` after all previously added segments.
    pub fn push(&mut self, segment: FlightSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[FlightSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Assign evenly-spaced timestamps to `points`.
///
/// The first point gets `start`, the last point gets `end` and all points in
/// between are spread linearly in their original order. A single point gets
/// `start`. The spacing ignores distance and speed, so climbs and turns are
/// replayed at the same pace as cruise.
///
/// Fails if `points` is empty or `start` is not strictly before `end`.
pub fn interpolate(
    mut points: Vec<TrackPoint>,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<FlightSegment, Error> {
    if points.is_empty() {
        return Err(Error::EmptySegment);
    }
    if start >= end {
        return Err(Error::InvalidInterval { start, end });
    }

    // Integer nanoseconds keep the last point exactly on `end`.
    let span = i128::from(
        (end - start)
            .num_nanoseconds()
            .ok_or_else(|| Error::Usage(format!("interval {start} to {end} is too long")))?,
    );
    let steps = (points.len() - 1).max(1) as i128;
    for (i, point) in points.iter_mut().enumerate() {
        // |offset| <= |span|, which came from an i64.
        let offset = (span * i as i128 / steps) as i64;
        point.timestamp = Some(start + TimeDelta::nanoseconds(offset));
    }

    Ok(FlightSegment { points, start, end })
}

/// Read an ISO-8601 instant.
///
/// RFC 3339 timestamps keep their UTC offset. The date and time may also be
/// separated by a space and the seconds may be left out. Timestamps without
/// offset are taken as UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<FixedOffset>, Error> {
    let trimmed = text.trim();
    let normalized = match trimmed.split_once(' ') {
        Some((date, time)) => format!("{date}T{time}"),
        None => trimmed.to_string(),
    };

    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .or_else(|_| parse_utc(&normalized))
        .map_err(|source| Error::InvalidInstant {
            text: text.to_string(),
            source,
        })
}

/// Read an instant without offset, or with `Z` but no seconds, as UTC.
fn parse_utc(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%MZ"))
        .map(|naive| naive.and_utc().fixed_offset())
}
