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

//! HTTP transport of the Private Radar client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::Error;

/// Timeout of a single request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("kml2gpx/", env!("CARGO_PKG_VERSION"));

/// Authenticated GET requests.
///
/// Implemented by [`ReqwestClient`], and by fakes in tests.
pub trait HttpClient {
    /// GET `url` with an `Authorization: Bearer` header and return the body.
    ///
    /// A non-success status is an [`Error::Http`].
    fn get_with_bearer(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, Error>;
}

/// Blocking [`reqwest`] implementation of [`HttpClient`].
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get_with_bearer(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, Error> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {bearer_token}"))
            .header(ACCEPT, "application/json, application/vnd.google-earth.kml+xml, */*")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

#[cfg(test)]
pub mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct FakeHttpClient {
        responses: RefCell<VecDeque<Result<Vec<u8>, Error>>>,
        /// URL and bearer token of each request.
        pub requests: RefCell<Vec<(String, String)>>,
    }

    impl FakeHttpClient {
        pub fn respond(self, body: impl Into<Vec<u8>>) -> Self {
            self.responses.borrow_mut().push_back(Ok(body.into()));
            self
        }

        pub fn fail(self, status: u16) -> Self {
            self.responses.borrow_mut().push_back(Err(Error::Http {
                status,
                url: "fake".to_string(),
            }));
            self
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    impl HttpClient for FakeHttpClient {
        fn get_with_bearer(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, Error> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), bearer_token.to_string()));
            self.responses
                .borrow_mut()
                .pop_front()
                .expect("unexpected request")
        }
    }

    #[test]
    fn client_creation() {
        assert!(ReqwestClient::new().is_ok());
        assert!(ReqwestClient::with_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("kml2gpx/"));
    }
}
