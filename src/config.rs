// Copyright 2024 Dell DRAC driver contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Driver configuration, loaded from an optional YAML file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

/// Driver-wide configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How often the RAID-job reconciler ticks.
    pub query_raid_config_job_status_interval: Duration,
    /// Timeout applied to every WS-MAN request.
    pub request_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> DriverConfig {
        DriverConfig {
            query_raid_config_job_status_interval: Duration::from_secs(120),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    query_raid_config_job_status_interval: Option<u64>,
    #[serde(default)]
    request_timeout: Option<u64>,
}

fn find_config() -> Option<PathBuf> {
    let current = Path::new("./drac.yaml");
    if current.is_file() {
        match current.canonicalize() {
            Ok(val) => return Some(val),
            Err(e) => warn!("Cannot canonicalize {:?}: {}", current, e),
        }
    }

    if let Some(mut home) = dirs::home_dir() {
        home.push(".config/drac/drac.yaml");
        if home.is_file() {
            return Some(home);
        }
    } else {
        warn!("Cannot find home directory");
    }

    let abs = PathBuf::from("/etc/drac/drac.yaml");
    if abs.is_file() {
        Some(abs)
    } else {
        None
    }
}

impl DriverConfig {
    /// Load configuration from the first of `./drac.yaml`, `~/.config/drac/drac.yaml`,
    /// `/etc/drac/drac.yaml` that exists. Falls back to defaults if none is found.
    pub fn load() -> Result<DriverConfig> {
        let path = match find_config() {
            Some(path) => path,
            None => return Ok(DriverConfig::default()),
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<DriverConfig> {
        let file = File::open(path).map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let raw: RawConfig = serde_yaml::from_reader(file).map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("cannot parse {}: {}", path.display(), e),
            )
        })?;

        let defaults = DriverConfig::default();
        Ok(DriverConfig {
            query_raid_config_job_status_interval: raw
                .query_raid_config_job_status_interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.query_raid_config_job_status_interval),
            request_timeout: raw
                .request_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }
}
