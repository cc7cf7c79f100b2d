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

//! Node-shaped state and the capability traits the driver needs from its
//! conductor, per the "small `NodeMutator` capability" guidance: the driver
//! never owns node persistence, it is handed narrow traits instead.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::wsman::Endpoint;

/// Transport protocol spoken to the RAC's WS-MAN listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain HTTP (rare, usually lab-only).
    Http,
    /// HTTPS (the default for all real iDRACs).
    Https,
}

/// Credentials and address of a node's RAC, as stored on the node record.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// RAC hostname or IP.
    pub host: String,
    /// RAC port.
    pub port: u16,
    /// RAC username.
    pub username: String,
    /// RAC password.
    pub password: String,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Whether to validate the RAC's TLS certificate.
    pub verify_ca: bool,
}

impl Credentials {
    /// Build the WS-MAN endpoint these credentials describe.
    pub fn endpoint(&self) -> Endpoint {
        let scheme = match self.protocol {
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        Endpoint {
            url: format!("{}://{}:{}/wsman", scheme, self.host, self.port),
            username: self.username.clone(),
            password: self.password.clone(),
            verify_ca: self.verify_ca,
        }
    }
}

/// The `properties` bag, a dynamic JSON map with a couple of named keys the
/// driver reads and writes (`logical_disks`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties(pub HashMap<String, Value>);

impl Properties {
    /// Replace `logical_disks` with a freshly-fetched virtual disk inventory.
    pub fn set_logical_disks<T: Serialize>(&mut self, disks: &[T]) -> Result<()> {
        self.0.insert(
            "logical_disks".into(),
            serde_json::to_value(disks).map_err(|e| {
                crate::error::Error::new(
                    crate::error::ErrorKind::OperationFailed,
                    format!("cannot serialize logical disks: {}", e),
                )
            })?,
        );
        Ok(())
    }
}

/// The `driver_internal_info` bag; tracks outstanding RAID config jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverInternalInfo(pub HashMap<String, Value>);

impl DriverInternalInfo {
    /// Currently tracked RAID config job ids, in insertion order.
    pub fn raid_config_job_ids(&self) -> Vec<String> {
        self.0
            .get("raid_config_job_ids")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a job id to the tracked list.
    pub fn push_raid_config_job_id(&mut self, job_id: impl Into<String>) {
        let mut ids = self.raid_config_job_ids();
        ids.push(job_id.into());
        self.0.insert(
            "raid_config_job_ids".into(),
            Value::Array(ids.into_iter().map(Value::String).collect()),
        );
    }

    /// Remove a job id from the tracked list, if present.
    pub fn remove_raid_config_job_id(&mut self, job_id: &str) {
        let ids: Vec<String> = self
            .raid_config_job_ids()
            .into_iter()
            .filter(|id| id != job_id)
            .collect();
        self.0.insert(
            "raid_config_job_ids".into(),
            Value::Array(ids.into_iter().map(Value::String).collect()),
        );
    }
}

/// A single logical-disk specification, as found in `extra.target_raid_configuration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalDiskTarget {
    /// Controller FQDD to build the virtual disk on.
    pub controller: String,
    /// Target size in GB; mutually resolved with `size_mb` before use.
    #[serde(default)]
    pub size_gb: Option<i64>,
    /// Target size in MB; takes precedence over `size_gb` if both are set.
    #[serde(default)]
    pub size_mb: Option<i64>,
    /// RAID level string, e.g. `"1"`, `"5+0"`, `"non-raid"`.
    pub raid_level: String,
    /// Explicit physical disk FQDDs to use.
    #[serde(default)]
    pub physical_disks: Option<Vec<String>>,
    /// Number of physical disks to select automatically.
    #[serde(default)]
    pub number_of_physical_disks: Option<u32>,
    /// Disk type filter (`hdd`/`ssd`).
    #[serde(default)]
    pub disk_type: Option<String>,
    /// Interface type filter.
    #[serde(default)]
    pub interface_type: Option<String>,
    /// Volume name to request.
    #[serde(default)]
    pub volume_name: Option<String>,
    /// Optional human-readable disk name.
    #[serde(default)]
    pub disk_name: Option<String>,
    /// Whether this logical disk is the root volume.
    #[serde(default)]
    pub is_root_volume: Option<bool>,
    /// Requested span depth, filled in by the planner if absent.
    #[serde(default)]
    pub span_depth: Option<u32>,
    /// Requested span length, filled in by the planner if absent.
    #[serde(default)]
    pub span_length: Option<u32>,
}

impl LogicalDiskTarget {
    /// Resolve the target size to megabytes, preferring an explicit `size_mb`.
    pub fn resolve_size_mb(&self) -> Option<i64> {
        self.size_mb.or_else(|| self.size_gb.map(|gb| gb * 1024))
    }

    /// Whether this logical disk is flagged as the root volume.
    pub fn is_root(&self) -> bool {
        self.is_root_volume.unwrap_or(false)
    }
}

/// The `extra.target_raid_configuration` input spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRaidConfiguration {
    /// Logical disks to create.
    pub logical_disks: Vec<LogicalDiskTarget>,
}

/// A minimal summary used by `NodeSource::list_candidates`.
#[derive(Debug, Clone)]
pub struct NodeSummary {
    /// Node UUID.
    pub id: String,
    /// Driver name (the reconciler only acts on DRAC-family drivers).
    pub driver: String,
    /// Raw `driver_internal_info`.
    pub driver_internal_info: DriverInternalInfo,
}

/// Filter passed to `NodeSource::list_candidates`.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Only consider unreserved nodes.
    pub reserved: Option<bool>,
    /// Only consider nodes not in maintenance.
    pub maintenance: Option<bool>,
}

/// A held lock on a single node. Dropping it releases the lock.
pub trait NodeLockGuard: Send + Sync {}

/// Acquires per-node locks from the conductor.
#[async_trait]
pub trait NodeLocker: Send + Sync {
    /// Acquire an exclusive lock, required for any mutating operation.
    async fn acquire_exclusive(&self, node_id: &str) -> Result<Box<dyn NodeLockGuard>>;

    /// Acquire a shared lock, sufficient for read-only queries.
    async fn acquire_shared(&self, node_id: &str) -> Result<Box<dyn NodeLockGuard>>;
}

/// Lists candidate nodes for the periodic reconciler.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List nodes matching `filter`.
    async fn list_candidates(&self, filter: NodeFilter) -> Result<Vec<NodeSummary>>;
}

/// Read-modify-write mutation capability over a single node's persisted state.
#[async_trait]
pub trait NodeMutator: Send + Sync {
    /// Node UUID.
    fn id(&self) -> &str;

    /// RAC credentials.
    fn credentials(&self) -> &Credentials;

    /// Current `properties` bag.
    fn properties(&self) -> Properties;

    /// Current `driver_internal_info` bag.
    fn driver_internal_info(&self) -> DriverInternalInfo;

    /// Current `extra` bag (only `target_raid_configuration` is read by the driver).
    fn target_raid_configuration(&self) -> Option<Result<TargetRaidConfiguration>>;

    /// Whether the node is currently in maintenance mode.
    fn maintenance(&self) -> bool;

    /// Replace the `properties` bag wholesale.
    fn set_properties(&mut self, properties: Properties);

    /// Replace the `driver_internal_info` bag wholesale.
    fn set_driver_internal_info(&mut self, info: DriverInternalInfo);

    /// Set maintenance mode and an optional `last_error` message.
    fn set_maintenance(&mut self, maintenance: bool, last_error: Option<String>);

    /// Persist whatever has been mutated so far.
    async fn save(&mut self) -> Result<()>;
}
