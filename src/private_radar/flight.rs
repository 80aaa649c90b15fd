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

//! Flight listings as returned by Private Radar.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::{parse_instant, Error};

/// Status reported by the backend for successful calls.
const SUCCESS: &str = "success";

/// Summary of a logged flight.
#[derive(Clone, Debug, PartialEq)]
pub struct FlightSummary {
    pub id: i64,
    /// Aircraft registration, e.g. `F-GXYZ`.
    pub registration: String,
    /// ICAO code of the departure airport.
    pub from: String,
    /// ICAO code of the arrival airport.
    pub to: String,
    /// Kind of flight: `solo`, `instr`, `trip`, ...
    pub flight_type: String,
    /// Engine start (block-off) time.
    pub start: Option<DateTime<FixedOffset>>,
    /// Engine shut down (block-on) time.
    pub end: Option<DateTime<FixedOffset>>,
    pub crew: Vec<String>,
    pub starred: bool,
}

impl fmt::Display for FlightSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = |t: Option<DateTime<FixedOffset>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M%:z").to_string())
                .unwrap_or_else(|| "n/a".to_string())
        };

        write!(f, "#{}", self.id)?;
        if self.starred {
            f.write_str(" (*)")?;
        }
        write!(
            f,
            " {} {} -> {} [{}] {} - {}",
            self.registration,
            self.from,
            self.to,
            self.flight_type,
            time(self.start),
            time(self.end),
        )?;
        if !self.crew.is_empty() {
            write!(f, " crew: {}", self.crew.join(", "))?;
        }
        Ok(())
    }
}

/// Body of the flight listing endpoint.
#[derive(Deserialize)]
pub(super) struct FlightListResponse {
    status: String,
    error: Option<String>,
    #[serde(default)]
    flight_list: Vec<RawFlight>,
}

#[derive(Deserialize)]
struct RawFlight {
    id: i64,
    registration: Option<String>,
    from: Option<String>,
    to: Option<String>,
    flight_type: Option<String>,
    dt_start: Option<String>,
    dt_terminated: Option<String>,
    #[serde(default)]
    crew: Vec<CrewMember>,
    #[serde(default)]
    starred: bool,
}

#[derive(Deserialize)]
struct CrewMember {
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
}

impl FlightListResponse {
    /// Decode a listing `body`, most recent flight first.
    pub(super) fn parse(body: &[u8]) -> Result<Vec<FlightSummary>, Error> {
        let response: Self = serde_json::from_slice(body)?;
        if response.status != SUCCESS {
            return Err(Error::Backend(
                response.error.unwrap_or_else(|| response.status.clone()),
            ));
        }

        response
            .flight_list
            .into_iter()
            .map(RawFlight::into_summary)
            .collect()
    }
}

impl RawFlight {
    fn into_summary(self) -> Result<FlightSummary, Error> {
        let instant = |t: Option<String>| {
            t.filter(|t| !t.trim().is_empty())
                .map(|t| parse_instant(&t))
                .transpose()
        };

        Ok(FlightSummary {
            id: self.id,
            registration: self.registration.unwrap_or_default(),
            from: self.from.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            flight_type: self.flight_type.unwrap_or_default(),
            start: instant(self.dt_start)?,
            end: instant(self.dt_terminated)?,
            crew: self
                .crew
                .into_iter()
                .map(|m| format!("{} {}", m.firstname, m.lastname).trim().to_string())
                .collect(),
            starred: self.starred,
        })
    }
}
