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

//! Reading the coordinates of one named layer from a KML document.
//!
//! A _layer_ is any _Document_, _Folder_ or _Placemark_ whose `<name>` child
//! matches. Flight-tracking exports put the barometric track into a layer
//! called `Altitude` and the terrain profile into one called `Elevation`.

use std::io::{BufReader, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Error, TrackPoint};

/// KML elements which can carry a layer name.
const CONTAINERS: &[&[u8]] = &[b"Document", b"Folder", b"Placemark"];
/// The only altitude mode under which elevations are above sea level.
const ABSOLUTE: &str = "absolute";

/// Text content currently being collected.
#[derive(Clone, Copy, PartialEq)]
enum Capture {
    None,
    Name,
    Coordinates,
    AltitudeMode,
}

/// An open container and everything collected below it so far.
struct Container {
    /// Position in document order.
    order: usize,
    name: Option<String>,
    coordinates: Vec<String>,
    altitude_modes: Vec<String>,
}

impl Container {
    fn absorb(&mut self, child: &Container) {
        self.coordinates.extend(child.coordinates.iter().cloned());
        self.altitude_modes
            .extend(child.altitude_modes.iter().cloned());
    }
}

/// Read the coordinates of `layer` from the KML document in `source`.
///
/// The first container in document order named exactly `layer` is used. The
/// coordinates of all its geometries are concatenated in document order.
/// Coordinates of other layers are never parsed.
///
/// Fails with [`Error::LayerNotFound`] if no container is named `layer` and
/// with [`Error::EmptyLayer`] if the layer has no coordinates.
pub fn read_layer(source: impl Read, layer: &str) -> Result<Vec<TrackPoint>, Error> {
    let mut reader = Reader::from_reader(BufReader::new(source));
    reader.trim_text(true);

    let mut buf = vec![];
    let mut path: Vec<Vec<u8>> = vec![];
    let mut open: Vec<Container> = vec![];
    let mut found: Option<Container> = None;
    let mut containers = 0;
    let mut capture = Capture::None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if path.is_empty() && name != b"kml" {
                    return Err(not_kml(&name));
                }

                let parent_is_container = path
                    .last()
                    .is_some_and(|p| CONTAINERS.contains(&p.as_slice()));
                capture = match name.as_slice() {
                    b"name" if parent_is_container => Capture::Name,
                    b"coordinates" => Capture::Coordinates,
                    b"altitudeMode" => Capture::AltitudeMode,
                    _ => Capture::None,
                };
                text.clear();

                if CONTAINERS.contains(&name.as_slice()) {
                    open.push(Container {
                        order: containers,
                        name: None,
                        coordinates: vec![],
                        altitude_modes: vec![],
                    });
                    containers += 1;
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if path.is_empty() && e.local_name().as_ref() != b"kml" {
                    return Err(not_kml(e.local_name().as_ref()));
                }
            }
            Event::Text(e) if capture != Capture::None => {
                separate(&mut text, capture);
                text.push_str(&e.unescape()?)
            }
            Event::CData(e) if capture != Capture::None => {
                separate(&mut text, capture);
                text.push_str(&String::from_utf8_lossy(&e.into_inner()))
            }
            Event::End(e) => {
                let name = e.local_name().as_ref().to_vec();
                path.pop();

                if let Some(current) = open.last_mut() {
                    match capture {
                        Capture::Name if current.name.is_none() => {
                            current.name = Some(text.trim().to_string())
                        }
                        Capture::Coordinates => current.coordinates.push(text.clone()),
                        Capture::AltitudeMode => {
                            current.altitude_modes.push(text.trim().to_string())
                        }
                        _ => {}
                    }
                }
                capture = Capture::None;
                text.clear();

                if CONTAINERS.contains(&name.as_slice()) {
                    if let Some(closed) = open.pop() {
                        if let Some(parent) = open.last_mut() {
                            parent.absorb(&closed);
                        }
                        // Descendants close first, so an ancestor with the
                        // same name replaces them.
                        if closed.name.as_deref() == Some(layer)
                            && found.as_ref().map_or(true, |f| closed.order < f.order)
                        {
                            found = Some(closed);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    log::debug!("scanned {containers} KML containers for layer {layer:?}");
    let found = found.ok_or_else(|| Error::LayerNotFound(layer.to_string()))?;

    if let Some(mode) = found.altitude_modes.iter().find(|m| *m != ABSOLUTE) {
        log::warn!("layer {layer:?} uses altitude mode {mode:?}, elevations may be relative");
    }

    let mut points = vec![];
    for coordinates in &found.coordinates {
        points.extend(parse_coordinates(coordinates)?);
    }
    if points.is_empty() {
        return Err(Error::EmptyLayer(layer.to_string()));
    }

    Ok(points)
}

/// Keep coordinate tuples apart when a comment or CDATA section splits the
/// trimmed text.
fn separate(text: &mut String, capture: Capture) {
    if capture == Capture::Coordinates && !text.is_empty() {
        text.push(' ');
    }
}

fn not_kml(root: &[u8]) -> Error {
    Error::Parse {
        token: String::from_utf8_lossy(root).into_owned(),
        reason: "root element is not <kml>".to_string(),
    }
}

/// Parse the text of a KML `<coordinates>` element.
///
/// Tuples are separated by any whitespace. Each tuple is `lon,lat` or
/// `lon,lat,elevation`, a missing elevation is 0.
///
/// The first malformed tuple fails the whole text, naming the tuple in
/// [`Error::Parse`].
///
/// # Example
/// ```
/// # use kml2gpx::layer::parse_coordinates;
/// #
/// let points = parse_coordinates("7.1,46.2,1200\n  7.2,46.3").unwrap();
///
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[0].elevation, 1200.0);
/// assert_eq!(points[1].elevation, 0.0);
/// ```
pub fn parse_coordinates(text: &str) -> Result<Vec<TrackPoint>, Error> {
    text.split_whitespace().map(parse_tuple).collect()
}

fn parse_tuple(token: &str) -> Result<TrackPoint, Error> {
    let invalid = |reason: String| Error::Parse {
        token: token.to_string(),
        reason,
    };

    let fields: Vec<&str> = token.split(',').collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(invalid(format!(
            "expected lon,lat[,elevation] but found {} fields",
            fields.len()
        )));
    }

    let mut values = [0.0; 3];
    for (value, field) in values.iter_mut().zip(&fields) {
        *value = field
            .parse::<f64>()
            .map_err(|e| invalid(format!("{field:?} is not a number: {e}")))?;
        if !value.is_finite() {
            return Err(invalid(format!("{field:?} is not finite")));
        }
    }

    let [longitude, latitude, elevation] = values;
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid(format!("longitude {longitude} out of range")));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(invalid(format!("latitude {latitude} out of range")));
    }

    Ok(TrackPoint::new(longitude, latitude, elevation))
}
