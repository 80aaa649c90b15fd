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

//! The `kml` subcommand: convert local KML files.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use kml2gpx::writer::write_gpx_file;
use kml2gpx::{parse_instant, read_segment, Error, TrackCollection, DEFAULT_LAYER};

#[derive(clap::Args, Debug)]
pub struct KmlArgs {
    /// Input KML file(s)
    #[arg(short, long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Start time of each input file (ISO-8601)
    #[arg(long = "start", num_args = 1..)]
    pub starts: Vec<String>,

    /// End time of each input file (ISO-8601)
    #[arg(long = "end", num_args = 1..)]
    pub ends: Vec<String>,

    /// KML layer to extract
    #[arg(long, default_value = DEFAULT_LAYER)]
    pub layer: String,
}

/// One input file and the interval it covers.
#[derive(Debug)]
struct Input {
    path: PathBuf,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

/// Validated conversion of local KML files into one GPX file.
#[derive(Debug)]
pub struct KmlJob {
    inputs: Vec<Input>,
    layer: String,
    output: PathBuf,
}

impl KmlJob {
    /// Check `args` without touching any input file.
    ///
    /// Without `output`, the GPX file is written next to the first input.
    pub fn new(args: KmlArgs, output: Option<PathBuf>) -> Result<Self, Error> {
        let count = args.inputs.len();
        if count == 0 {
            return Err(Error::Usage("no input file given".to_string()));
        }
        if args.starts.len() != count || args.ends.len() != count {
            return Err(Error::Usage(format!(
                "{count} input files need {count} start and {count} end times, got {} and {}",
                args.starts.len(),
                args.ends.len()
            )));
        }
        if args.layer.is_empty() {
            return Err(Error::Usage("no KML layer given".to_string()));
        }

        let mut inputs = Vec::with_capacity(count);
        for ((path, start), end) in args.inputs.into_iter().zip(&args.starts).zip(&args.ends) {
            let (start, end) = (parse_instant(start)?, parse_instant(end)?);
            if start >= end {
                return Err(Error::InvalidInterval { start, end });
            }
            inputs.push(Input { path, start, end });
        }

        let output = output.unwrap_or_else(|| default_output(&inputs[0].path));
        Ok(Self {
            inputs,
            layer: args.layer,
            output,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Convert all inputs in order and write the GPX file.
    pub fn run(&self) -> Result<PathBuf, Error> {
        let mut collection = match self.inputs[0].path.file_stem() {
            Some(stem) => TrackCollection::named(stem.to_string_lossy()),
            None => TrackCollection::new(),
        };

        for input in &self.inputs {
            log::info!("reading {}", input.path.display());
            let file = File::open(&input.path).map_err(|source| Error::Io {
                path: input.path.clone(),
                source,
            })?;
            collection.push(read_segment(file, &self.layer, input.start, input.end)?);
        }

        write_gpx_file(&collection, &self.output)?;
        Ok(self.output.clone())
    }
}

/// Path of the first input with the extension replaced by `.gpx`.
pub fn default_output(first_input: &Path) -> PathBuf {
    first_input.with_extension("gpx")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const FLIGHT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
  <Placemark><name>Altitude</name><LineString>
    <altitudeMode>absolute</altitudeMode>
    <coordinates>2.10,48.75,160 2.11,48.76,300 2.12,48.77,600</coordinates>
  </LineString></Placemark>
</Document></kml>
"#;

    fn args(inputs: &[&Path], starts: &[&str], ends: &[&str]) -> KmlArgs {
        KmlArgs {
            inputs: inputs.iter().map(|p| p.to_path_buf()).collect(),
            starts: starts.iter().map(|s| s.to_string()).collect(),
            ends: ends.iter().map(|s| s.to_string()).collect(),
            layer: DEFAULT_LAYER.to_string(),
        }
    }

    #[test]
    fn count_mismatch_is_usage_error() {
        let inputs = [Path::new("does-not-exist-1.kml"), Path::new("does-not-exist-2.kml")];

        let err = KmlJob::new(args(&inputs, &["2022-06-01T10:00:00Z"], &["2022-06-01T11:00:00Z"]), None)
            .unwrap_err();
        assert!(matches!(err, Error::Usage(_)));

        let err = KmlJob::new(args(&inputs[..1], &[], &[]), None).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn times_are_checked_up_front() {
        let input = [Path::new("does-not-exist.kml")];

        assert!(matches!(
            KmlJob::new(args(&input, &["noon"], &["2022-06-01T11:00:00Z"]), None),
            Err(Error::InvalidInstant { .. })
        ));
        assert!(matches!(
            KmlJob::new(args(&input, &["2022-06-01T11:00:00Z"], &["2022-06-01T10:00:00Z"]), None),
            Err(Error::InvalidInterval { .. })
        ));
    }

    #[test]
    fn output_defaults_to_first_input() {
        let inputs = [Path::new("dir/first.kml"), Path::new("second.kml")];
        let times = ["2022-06-01T10:00:00Z", "2022-06-02T10:00:00Z"];
        let ends = ["2022-06-01T11:00:00Z", "2022-06-02T11:00:00Z"];

        let job = KmlJob::new(args(&inputs, &times, &ends), None).unwrap();
        assert_eq!(job.output(), Path::new("dir/first.gpx"));

        let job = KmlJob::new(args(&inputs, &times, &ends), Some("x.gpx".into())).unwrap();
        assert_eq!(job.output(), Path::new("x.gpx"));
    }

    #[test]
    fn converts_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.kml");
        let second = dir.path().join("second.kml");
        fs::write(&first, FLIGHT).unwrap();
        fs::write(&second, FLIGHT).unwrap();

        let job = KmlJob::new(
            args(
                &[first.as_path(), second.as_path()],
                &["2022-06-01T10:00:00+02:00", "2022-06-02T10:00:00+02:00"],
                &["2022-06-01T10:30:00+02:00", "2022-06-02T10:30:00+02:00"],
            ),
            None,
        )
        .unwrap();
        let written = job.run().unwrap();

        assert_eq!(written, dir.path().join("first.gpx"));
        let gpx = fs::read_to_string(&written).unwrap();
        assert_eq!(gpx.matches("<trkseg>").count(), 2);
        assert_eq!(gpx.matches("<trkpt").count(), 6);
    }

    #[test]
    fn missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.kml");

        let job = KmlJob::new(
            args(&[missing.as_path()], &["2022-06-01T10:00:00Z"], &["2022-06-01T11:00:00Z"]),
            None,
        )
        .unwrap();

        assert!(matches!(job.run(), Err(Error::Io { .. })));
        assert!(!dir.path().join("missing.gpx").exists());
    }
}
