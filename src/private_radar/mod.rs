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

//! Read-only client for the flights logged in a Private Radar instance.
//!
//! Flights are addressed either by their ID or by a negative offset into the
//! list of recent flights: `-1` is the most recent flight, `-2` the one
//! before, and so on.

use url::Url;

use crate::Error;

mod config;
mod flight;
mod http;

pub use config::{
    config_search_path, find_config_file, load_config, load_config_from, Endpoints,
    PrivateRadarConfig, CONFIG_FILE_NAME, CONFIG_SECTION, ID_PLACEHOLDER,
};
pub use flight::FlightSummary;
pub use http::{HttpClient, ReqwestClient};

#[cfg(test)]
pub use http::tests::FakeHttpClient;

use flight::FlightListResponse;

/// Query parameter limiting the number of listed flights.
const COUNT_PARAM: &str = "nbFlights";
/// Query parameter restricting the listing to given flight IDs.
const IDS_PARAM: &str = "flightIds";

/// Client of one Private Radar instance.
pub struct PrivateRadar<C = ReqwestClient> {
    config: PrivateRadarConfig,
    http: C,
}

impl PrivateRadar {
    /// Create a client using a [`ReqwestClient`].
    pub fn new(config: PrivateRadarConfig) -> Result<Self, Error> {
        Ok(Self::with_client(config, ReqwestClient::new()?))
    }
}

impl<C: HttpClient> PrivateRadar<C> {
    pub fn with_client(config: PrivateRadarConfig, http: C) -> Self {
        log::debug!("using Private Radar at {}", config.base_url);
        Self { config, http }
    }

    /// List the `count` most recent flights, most recent first.
    pub fn list_flights(&self, count: usize) -> Result<Vec<FlightSummary>, Error> {
        if count == 0 {
            return Ok(vec![]);
        }

        let url = self.list_url(&[(COUNT_PARAM, count.to_string().as_str())])?;
        let mut flights = FlightListResponse::parse(&self.get(&url)?)?;
        flights.truncate(count);
        log::info!("listed {} flights", flights.len());
        Ok(flights)
    }

    /// Look up the summary of a flight by ID or negative offset.
    pub fn get_flight(&self, flight_id: i64) -> Result<FlightSummary, Error> {
        if flight_id < 0 {
            return self.flight_at_offset(flight_id);
        }

        let id = flight_id.to_string();
        let url = self.list_url(&[(COUNT_PARAM, "1"), (IDS_PARAM, id.as_str())])?;
        FlightListResponse::parse(&self.get(&url)?)?
            .into_iter()
            .find(|f| f.id == flight_id)
            .ok_or(Error::FlightNotFound(flight_id))
    }

    /// Download the KML export of a flight given by ID or negative offset.
    pub fn get_flight_kml(&self, flight_id: i64) -> Result<Vec<u8>, Error> {
        let id = if flight_id < 0 {
            self.flight_at_offset(flight_id)?.id
        } else {
            flight_id
        };
        self.fetch_kml(id)
    }

    /// Download the KML export of the flight with ID `id`.
    pub fn fetch_kml(&self, id: i64) -> Result<Vec<u8>, Error> {
        let path = self
            .config
            .endpoints
            .kml_path
            .replace(ID_PLACEHOLDER, &id.to_string());
        let url = self.endpoint(&path)?;
        let kml = self.get(&url)?;
        log::info!("downloaded {} bytes of KML for flight {id}", kml.len());
        Ok(kml)
    }

    /// Resolve a negative `offset` through the listing.
    fn flight_at_offset(&self, offset: i64) -> Result<FlightSummary, Error> {
        let position = offset.unsigned_abs() as usize;
        self.list_flights(position)?
            .into_iter()
            .nth(position - 1)
            .ok_or(Error::FlightNotFound(offset))
    }

    fn list_url(&self, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.endpoint(&self.config.endpoints.list_path)?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?)
    }

    fn get(&self, url: &Url) -> Result<Vec<u8>, Error> {
        self.http.get_with_bearer(url.as_str(), &self.config.token)
    }
}
