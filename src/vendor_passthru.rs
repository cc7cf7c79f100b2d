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

//! Vendor-passthru surface exposed to the conductor.
//!
//! The original implementation dispatches on a runtime method-name string;
//! here that becomes a fixed, statically typed `(HttpVerb, &str)` table so a
//! REST layer can route directly into these handlers without reflection.

use std::collections::HashMap;

use serde_json::Value;

use crate::bios;
use crate::error::{Error, ErrorKind, Result};
use crate::node::{NodeLocker, NodeMutator};
use crate::raid;
use crate::wsman::{Client, Transport};
use crate::{job, management};

/// HTTP verb a vendor-passthru method is invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// GET.
    Get,
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

/// Every vendor-passthru method name this driver answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET get_bios_config`.
    GetBiosConfig,
    /// `POST set_bios_config`.
    SetBiosConfig,
    /// `POST commit_bios_config`.
    CommitBiosConfig,
    /// `DELETE abandon_bios_config`.
    AbandonBiosConfig,
    /// `GET list_raid_controllers`.
    ListRaidControllers,
    /// `GET list_physical_disks`.
    ListPhysicalDisks,
    /// `GET list_virtual_disks`.
    ListVirtualDisks,
    /// `POST create_virtual_disk`.
    CreateVirtualDisk,
    /// `POST delete_virtual_disk`.
    DeleteVirtualDisk,
    /// `POST apply_pending_raid_config`.
    ApplyPendingRaidConfig,
    /// `POST delete_pending_raid_config`.
    DeletePendingRaidConfig,
    /// `GET get_job`.
    GetJob,
    /// `GET list_unfinished_jobs`.
    ListUnfinishedJobs,
    /// `POST create_raid_configuration`.
    CreateRaidConfiguration,
}

impl Method {
    /// The `(verb, name)` entry this method is dispatched under.
    pub fn dispatch_key(self) -> (HttpVerb, &'static str) {
        match self {
            Method::GetBiosConfig => (HttpVerb::Get, "get_bios_config"),
            Method::SetBiosConfig => (HttpVerb::Post, "set_bios_config"),
            Method::CommitBiosConfig => (HttpVerb::Post, "commit_bios_config"),
            Method::AbandonBiosConfig => (HttpVerb::Delete, "abandon_bios_config"),
            Method::ListRaidControllers => (HttpVerb::Get, "list_raid_controllers"),
            Method::ListPhysicalDisks => (HttpVerb::Get, "list_physical_disks"),
            Method::ListVirtualDisks => (HttpVerb::Get, "list_virtual_disks"),
            Method::CreateVirtualDisk => (HttpVerb::Post, "create_virtual_disk"),
            Method::DeleteVirtualDisk => (HttpVerb::Post, "delete_virtual_disk"),
            Method::ApplyPendingRaidConfig => (HttpVerb::Post, "apply_pending_raid_config"),
            Method::DeletePendingRaidConfig => (HttpVerb::Post, "delete_pending_raid_config"),
            Method::GetJob => (HttpVerb::Get, "get_job"),
            Method::ListUnfinishedJobs => (HttpVerb::Get, "list_unfinished_jobs"),
            Method::CreateRaidConfiguration => (HttpVerb::Post, "create_raid_configuration"),
        }
    }

    /// Every dispatchable method, in the fixed order the conductor sees them.
    pub const ALL: &'static [Method] = &[
        Method::GetBiosConfig,
        Method::SetBiosConfig,
        Method::CommitBiosConfig,
        Method::AbandonBiosConfig,
        Method::ListRaidControllers,
        Method::ListPhysicalDisks,
        Method::ListVirtualDisks,
        Method::CreateVirtualDisk,
        Method::DeleteVirtualDisk,
        Method::ApplyPendingRaidConfig,
        Method::DeletePendingRaidConfig,
        Method::GetJob,
        Method::ListUnfinishedJobs,
        Method::CreateRaidConfiguration,
    ];

    /// Look up a method from its `(verb, name)` pair.
    pub fn lookup(verb: HttpVerb, name: &str) -> Option<Method> {
        Method::ALL.iter().copied().find(|m| m.dispatch_key() == (verb, name))
    }
}

fn require_str<'a>(args: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::new(ErrorKind::InvalidParameterValue, format!("missing required argument {}", key)))
}

/// Dispatch a single synchronous vendor-passthru call.
///
/// All methods here are synchronous, per §6: none of them are backgrounded.
pub async fn dispatch<T: Transport, N: NodeMutator>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node: &mut N,
    method: Method,
    args: HashMap<String, Value>,
) -> Result<Value> {
    let node_id = node.id().to_string();
    match method {
        Method::GetBiosConfig => {
            let config = bios::get_config(client).await?;
            Ok(serde_json::json!(config
                .keys()
                .cloned()
                .collect::<Vec<_>>()))
        }
        Method::SetBiosConfig => {
            let requested: HashMap<String, String> = args
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect();
            let reboot_needed = bios::set_config(client, locker, &node_id, &requested).await?;
            Ok(Value::Bool(reboot_needed))
        }
        Method::CommitBiosConfig => {
            let reboot = args.get("reboot").and_then(Value::as_bool).unwrap_or(false);
            let job_id = bios::commit_config(client, locker, &node_id, reboot).await?;
            Ok(Value::String(job_id))
        }
        Method::AbandonBiosConfig => {
            bios::abandon_config(client, locker, &node_id).await?;
            Ok(Value::Null)
        }
        Method::ListRaidControllers => {
            let controllers = raid::list_raid_controllers(client).await?;
            Ok(serde_json::json!(controllers
                .into_iter()
                .map(|c| serde_json::json!({"id": c.id, "model": c.model}))
                .collect::<Vec<_>>()))
        }
        Method::ListPhysicalDisks => {
            let disks = raid::list_physical_disks(client).await?;
            Ok(serde_json::json!(disks
                .into_iter()
                .map(|d| serde_json::json!({"id": d.id, "controller": d.controller}))
                .collect::<Vec<_>>()))
        }
        Method::ListVirtualDisks => {
            let disks = raid::list_virtual_disks(client).await?;
            serde_json::to_value(disks).map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))
        }
        Method::CreateVirtualDisk => {
            let create_args = raid::CreateVirtualDiskArgs {
                raid_controller: require_str(&args, "raid_controller")?.to_string(),
                physical_disks: args
                    .get("physical_disks")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                size_mb: args.get("size_mb").and_then(Value::as_i64).unwrap_or(0),
                raid_level: require_str(&args, "raid_level")?.to_string(),
                disk_name: args.get("disk_name").and_then(Value::as_str).map(str::to_string),
                span_depth: args.get("span_depth").and_then(Value::as_u64).map(|v| v as u32),
                span_length: args.get("span_length").and_then(Value::as_u64).map(|v| v as u32),
            };
            raid::create_virtual_disk(client, locker, &node_id, &create_args).await?;
            Ok(Value::Null)
        }
        Method::DeleteVirtualDisk => {
            let fqdd = require_str(&args, "virtual_disk")?;
            raid::delete_virtual_disk(client, locker, &node_id, fqdd).await?;
            Ok(Value::Null)
        }
        Method::ApplyPendingRaidConfig => {
            let controller = require_str(&args, "raid_controller")?;
            let reboot = args.get("reboot").and_then(Value::as_bool).unwrap_or(false);
            let job_id = raid::apply_pending_config(client, locker, &node_id, controller, reboot).await?;
            Ok(Value::String(job_id))
        }
        Method::DeletePendingRaidConfig => {
            let controller = require_str(&args, "raid_controller")?;
            raid::delete_pending_config(client, locker, &node_id, controller).await?;
            Ok(Value::Null)
        }
        Method::GetJob => {
            let job_id = require_str(&args, "job_id")?;
            let found = job::get_job(client, job_id).await?;
            Ok(serde_json::json!({
                "id": found.id,
                "name": found.name,
                "state": found.state,
                "message": found.message,
            }))
        }
        Method::ListUnfinishedJobs => {
            let jobs = job::list_unfinished_jobs(client).await?;
            Ok(serde_json::json!(jobs
                .into_iter()
                .map(|j| serde_json::json!({"id": j.id, "name": j.name, "percent_complete": j.percent_complete}))
                .collect::<Vec<_>>()))
        }
        Method::CreateRaidConfiguration => {
            let create_root_volume = args.get("create_root_volume").and_then(Value::as_bool).unwrap_or(true);
            let create_nonroot_volumes = args.get("create_nonroot_volumes").and_then(Value::as_bool).unwrap_or(true);
            let reboot = args.get("reboot").and_then(Value::as_bool).unwrap_or(false);
            raid::create_configuration(client, locker, node, create_root_volume, create_nonroot_volumes, reboot).await?;
            Ok(Value::Null)
        }
    }
}

/// Boot-device passthru is exposed separately because it belongs to the
/// management interface rather than vendor-passthru proper, but shares the
/// same dispatch shape for a REST layer that wants a single table.
pub async fn set_boot_device<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    device: management::BootDevice,
    persistent: bool,
) -> Result<()> {
    management::set_boot_device(client, locker, node_id, device, persistent).await
}
