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

//! Conversion of KML documents as written by a KML library.

use std::io::Write;

use approx::assert_abs_diff_eq;
use kml::types::{AltitudeMode, Coord, Element, Geometry, LineString, MultiGeometry, Placemark};
use kml::{Kml, KmlDocument, KmlVersion, KmlWriter};
use kml2gpx::writer::write_gpx;
use kml2gpx::{convert, parse_instant, read_segment, Error, TrackCollection};

/// Namespace attributes for the `<kml>` tag.
const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns", "http://www.opengis.net/kml/2.2"),
    ("xmlns:atom", "http://www.w3.org/2005/Atom"),
];

type Layer<'a> = (&'a str, Vec<Vec<(f64, f64, f64)>>);

/// Write a flight export with one _Placemark_ per layer.
///
/// A layer with several lines becomes a _MultiGeometry_.
fn flight_kml(layers: &[Layer]) -> Vec<u8> {
    let mut elements = vec![Kml::Element(Element {
        name: "name".to_string(),
        content: Some("LFPN - LFOB".to_string()),
        ..Default::default()
    })];

    for (name, lines) in layers {
        let mut geometries: Vec<Geometry> = lines.iter().map(|line| line_string(line)).collect();
        let geometry = if geometries.len() == 1 {
            geometries.remove(0)
        } else {
            Geometry::MultiGeometry(MultiGeometry {
                geometries,
                ..Default::default()
            })
        };
        elements.push(Kml::Placemark(Placemark {
            name: Some(name.to_string()),
            geometry: Some(geometry),
            ..Default::default()
        }));
    }

    let document = Kml::Document {
        elements,
        attrs: Default::default(),
    };
    let namespaces = NAMESPACES
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let kml = Kml::<f64>::KmlDocument(KmlDocument {
        version: KmlVersion::V22,
        attrs: namespaces,
        elements: vec![document],
    });

    let mut sink = vec![];
    writeln!(&mut sink, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();
    KmlWriter::from_writer(&mut sink).write(&kml).unwrap();
    sink
}

fn line_string(points: &[(f64, f64, f64)]) -> Geometry {
    Geometry::LineString(LineString {
        altitude_mode: AltitudeMode::Absolute,
        coords: points
            .iter()
            .map(|&(x, y, z)| Coord { x, y, z: Some(z) })
            .collect(),
        ..Default::default()
    })
}

fn altitude_and_elevation() -> Vec<u8> {
    flight_kml(&[
        (
            "Altitude",
            vec![vec![(2.10, 48.75, 160.0), (2.11, 48.76, 300.0), (2.12, 48.77, 600.0)]],
        ),
        (
            "Elevation",
            vec![vec![
                (2.10, 48.75, 150.0),
                (2.11, 48.76, 155.0),
                (2.12, 48.77, 150.0),
                (2.13, 48.78, 149.0),
                (2.14, 48.79, 151.0),
            ]],
        ),
    ])
}

#[test]
fn selects_altitude_layer() {
    let kml = altitude_and_elevation();
    let start = parse_instant("2022-06-01T10:00:00+02:00").unwrap();
    let end = parse_instant("2022-06-01T10:10:00+02:00").unwrap();

    let segment = read_segment(kml.as_slice(), "Altitude", start, end).unwrap();

    assert_eq!(segment.points().len(), 3);
    assert_abs_diff_eq!(segment.points()[1].elevation, 300.0);
    assert_eq!(segment.points()[0].timestamp, Some(start));
    assert_eq!(segment.points()[2].timestamp, Some(end));
}

#[test]
fn unknown_layer() {
    let kml = altitude_and_elevation();
    let start = parse_instant("2022-06-01T10:00:00Z").unwrap();
    let end = parse_instant("2022-06-01T10:10:00Z").unwrap();

    assert!(matches!(
        read_segment(kml.as_slice(), "Elevation2", start, end),
        Err(Error::LayerNotFound(_))
    ));
}

#[test]
fn multi_geometry_is_concatenated() {
    let kml = flight_kml(&[(
        "Altitude",
        vec![
            vec![(1.0, 1.0, 10.0), (1.1, 1.1, 20.0)],
            vec![(1.2, 1.2, 30.0)],
        ],
    )]);
    let start = parse_instant("2022-06-01T10:00:00Z").unwrap();
    let end = parse_instant("2022-06-01T10:02:00Z").unwrap();

    let segment = read_segment(kml.as_slice(), "Altitude", start, end).unwrap();

    let elevations: Vec<_> = segment.points().iter().map(|p| p.elevation).collect();
    assert_eq!(elevations, [10.0, 20.0, 30.0]);
}

#[test]
fn files_become_ordered_segments() {
    let first = flight_kml(&[("Altitude", vec![vec![(1.0, 1.0, 10.0), (1.1, 1.1, 20.0)]])]);
    let second = flight_kml(&[("Altitude", vec![vec![(5.0, 5.0, 50.0)]])]);
    let day = |d: u32| {
        (
            parse_instant(&format!("2022-06-{d:02}T10:00:00Z")).unwrap(),
            parse_instant(&format!("2022-06-{d:02}T11:00:00Z")).unwrap(),
        )
    };

    let mut collection = TrackCollection::new();
    for (kml, (start, end)) in [(first, day(1)), (second, day(2))] {
        collection.push(read_segment(kml.as_slice(), "Altitude", start, end).unwrap());
    }
    let mut sink = vec![];
    write_gpx(&collection, &mut sink).unwrap();

    let gpx = gpx::read(sink.as_slice()).unwrap();
    let segments = &gpx.tracks[0].segments;
    assert_eq!(segments.len(), 2);
    assert_abs_diff_eq!(segments[0].points[0].point().x(), 1.0);
    assert_abs_diff_eq!(segments[1].points[0].point().x(), 5.0);
}

#[test]
fn convert_uses_altitude_layer() {
    let kml = altitude_and_elevation();
    let start = parse_instant("2022-06-01T10:00:00Z").unwrap();
    let end = parse_instant("2022-06-01T10:10:00Z").unwrap();
    let mut sink = vec![];

    convert(kml.as_slice(), start, end, &mut sink).unwrap();

    let gpx = gpx::read(sink.as_slice()).unwrap();
    assert_eq!(gpx.tracks[0].segments[0].points.len(), 3);
}
