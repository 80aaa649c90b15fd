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

//! Loading the Private Radar settings from `kml2gpx.ini`.
//!
//! ```ini
//! [PRIVATE_RADAR]
//! url = https://club.example.org
//! token = 0123456789abcdef
//! ; optional
//! list_path = /prwsw/flight/list
//! kml_path = /prwsw/flight/{id}/kml
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::Error;

/// Name of the configuration file in each searched directory.
pub const CONFIG_FILE_NAME: &str = "kml2gpx.ini";
/// INI section holding the Private Radar settings.
pub const CONFIG_SECTION: &str = "PRIVATE_RADAR";
/// Placeholder for the flight ID in [`Endpoints::kml_path`].
pub const ID_PLACEHOLDER: &str = "{id}";

const DEFAULT_LIST_PATH: &str = "/prwsw/flight/list";
const DEFAULT_KML_PATH: &str = "/prwsw/flight/{id}/kml";

/// Backend paths, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Listing of the most recent flights.
    pub list_path: String,
    /// KML export of one flight, containing [`ID_PLACEHOLDER`].
    pub kml_path: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            list_path: DEFAULT_LIST_PATH.to_string(),
            kml_path: DEFAULT_KML_PATH.to_string(),
        }
    }
}

/// Connection settings of a Private Radar instance.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateRadarConfig {
    pub base_url: String,
    pub token: String,
    pub endpoints: Endpoints,
}

// The token must not end up in logs.
impl fmt::Debug for PrivateRadarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateRadarConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl PrivateRadarConfig {
    /// Create a configuration with the default [`Endpoints`].
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            endpoints: Endpoints::default(),
        }
    }

    /// Load the configuration from the INI file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        log::debug!("reading configuration file {}", path.display());
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini, path)
    }

    /// Extract the configuration from a parsed INI file read from `path`.
    pub fn from_ini(ini: &Ini, path: &Path) -> Result<Self, Error> {
        let invalid = |reason: String| Error::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let section = ini
            .section(Some(CONFIG_SECTION))
            .ok_or_else(|| invalid(format!("missing section [{CONFIG_SECTION}]")))?;
        let required = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("missing key {key:?} in [{CONFIG_SECTION}]")))
        };

        let mut config = Self::new(required("url")?, required("token")?);
        if let Some(v) = section.get("list_path").map(str::trim).filter(|v| !v.is_empty()) {
            config.endpoints.list_path = v.to_string();
        }
        if let Some(v) = section.get("kml_path").map(str::trim).filter(|v| !v.is_empty()) {
            if !v.contains(ID_PLACEHOLDER) {
                return Err(invalid(format!("kml_path {v:?} lacks {ID_PLACEHOLDER}")));
            }
            config.endpoints.kml_path = v.to_string();
        }

        Ok(config)
    }
}

/// Locations searched for [`CONFIG_FILE_NAME`], in order of preference.
///
/// The home directory comes first, then the current working directory.
pub fn config_search_path() -> Vec<PathBuf> {
    let mut paths = vec![];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Return the first of `candidates` which is an existing file.
pub fn find_config_file(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
}

/// Load the configuration from the first file found in `candidates`.
///
/// Fails with [`Error::ConfigMissing`] if none exists.
pub fn load_config_from(candidates: &[PathBuf]) -> Result<PrivateRadarConfig, Error> {
    let path = find_config_file(candidates).ok_or_else(|| Error::ConfigMissing {
        searched: candidates.to_vec(),
    })?;
    PrivateRadarConfig::load_from(path)
}

/// Load the configuration from the [`config_search_path`].
pub fn load_config() -> Result<PrivateRadarConfig, Error> {
    load_config_from(&config_search_path())
}
