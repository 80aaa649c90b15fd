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

//! Writing [`TrackCollection`]s as GPX 1.1 documents.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Metadata, Track, TrackSegment, Waypoint};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, FlightSegment, TrackCollection, TrackPoint};

/// Value of the `creator` attribute of the `<gpx>` tag.
const CREATOR: &str = "kml2gpx";

/// Write `collection` as one GPX track to `sink`.
///
/// Every segment of the collection becomes one `<trkseg>`, in order. The
/// document's metadata carries the track name and the start of the first
/// segment. The whole document is built in memory before anything is written.
pub fn write_gpx(collection: &TrackCollection, sink: impl Write) -> Result<(), Error> {
    let segments = collection
        .segments()
        .iter()
        .enumerate()
        .map(|(index, segment)| convert_segment(index, segment))
        .collect::<Result<_, _>>()?;

    let time = match collection.segments().first() {
        Some(first) => Some(to_gpx_time(&first.start())?.into()),
        None => None,
    };
    let metadata = Metadata {
        name: collection.name.clone(),
        time,
        ..Default::default()
    };

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        metadata: Some(metadata),
        tracks: vec![Track {
            name: collection.name.clone(),
            segments,
            ..Default::default()
        }],
        ..Default::default()
    };

    gpx::write(&gpx, sink)?;
    Ok(())
}

/// Write `collection` to the file at `path`.
///
/// The file is written in place. If writing fails midway, a truncated file
/// stays behind.
pub fn write_gpx_file(collection: &TrackCollection, path: &Path) -> Result<(), Error> {
    let io_error = |source: io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut sink = BufWriter::new(file);
    write_gpx(collection, &mut sink)?;
    sink.flush().map_err(io_error)?;

    log::info!("wrote {} segments to {}", collection.segments().len(), path.display());
    Ok(())
}

/// Convert the `index`-th `segment` to a GPX track segment.
fn convert_segment(index: usize, segment: &FlightSegment) -> Result<TrackSegment, Error> {
    log::debug!(
        "segment {index}: {} points from {} to {}",
        segment.points().len(),
        segment.start(),
        segment.end()
    );
    let mut converted = TrackSegment::new();
    for (point_index, point) in segment.points().iter().enumerate() {
        let timestamp = point.timestamp.ok_or(Error::MissingTimestamp {
            segment: index,
            index: point_index,
        })?;
        converted.points.push(convert_point(point, &timestamp)?);
    }
    Ok(converted)
}

/// Convert a single track `point` to a GPX _trkpt_.
fn convert_point(point: &TrackPoint, timestamp: &DateTime<FixedOffset>) -> Result<Waypoint, Error> {
    let mut waypoint = Waypoint::new(Point::new(point.longitude, point.latitude));
    waypoint.elevation = Some(point.elevation);
    waypoint.time = Some(to_gpx_time(timestamp)?.into());
    Ok(waypoint)
}

/// Convert a chrono instant to the `time` representation used by [`gpx`].
///
/// The UTC offset is kept so that the written timestamp shows it.
fn to_gpx_time(instant: &DateTime<FixedOffset>) -> Result<OffsetDateTime, Error> {
    let nanos = i128::from(instant.timestamp()) * 1_000_000_000
        + i128::from(instant.timestamp_subsec_nanos());
    let offset = UtcOffset::from_whole_seconds(instant.offset().local_minus_utc())?;
    Ok(OffsetDateTime::from_unix_timestamp_nanos(nanos)?.to_offset(offset))
}
