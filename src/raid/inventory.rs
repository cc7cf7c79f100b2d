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

//! RAID controller/physical-disk/virtual-disk inventory queries.

use crate::error::Result;
use crate::wsman::constants::{resource_uri, DCIM_CONTROLLER_VIEW, DCIM_PHYSICAL_DISK_VIEW, DCIM_VIRTUAL_DISK_VIEW};
use crate::wsman::{Client, Node, Transport};

use super::types::{DiskState, DiskType, InterfaceType, PhysicalDisk, RaidController, RaidState, VirtualDisk};

const BYTES_PER_GB: i64 = 1 << 30;

fn size_gb_from_bytes(item: &Node, tag: &str) -> i64 {
    item.find_text(tag)
        .and_then(|s| s.parse::<i64>().ok())
        .map(|bytes| bytes / BYTES_PER_GB)
        .unwrap_or(0)
}

fn disk_type(item: &Node) -> DiskType {
    match item.find_text("MediaType") {
        Some("1") => DiskType::Ssd,
        _ => DiskType::Hdd,
    }
}

fn interface_type(item: &Node) -> InterfaceType {
    match item.find_text("BusProtocol") {
        Some("0") => InterfaceType::Scsi,
        Some("1") => InterfaceType::Pata,
        Some("2") => InterfaceType::Fibre,
        Some("3") => InterfaceType::Usb,
        Some("4") => InterfaceType::Sata,
        Some("5") | Some("6") => InterfaceType::Sas,
        _ => InterfaceType::Unknown,
    }
}

fn disk_state(item: &Node) -> DiskState {
    match item.find_text("PrimaryStatus") {
        Some("1") => DiskState::Ok,
        Some("2") => DiskState::Degraded,
        Some("3") => DiskState::Error,
        _ => DiskState::Unknown,
    }
}

fn raid_state(item: &Node) -> RaidState {
    match item.find_text("RaidStatus") {
        Some("0") => RaidState::Ready,
        Some("1") => RaidState::Online,
        Some("2") => RaidState::Foreign,
        Some("3") => RaidState::Offline,
        Some("4") => RaidState::Blocked,
        Some("5") => RaidState::Failed,
        Some("6") => RaidState::Degraded,
        Some("7") => RaidState::NonRaid,
        _ => RaidState::Unknown,
    }
}

/// List all RAID controllers on the node.
pub async fn list_raid_controllers<T: Transport>(client: &Client<T>) -> Result<Vec<RaidController>> {
    let items = client.enumerate(&resource_uri(DCIM_CONTROLLER_VIEW)).await?;
    Ok(items
        .iter()
        .map(|item| RaidController {
            id: item.find_text("FQDD").unwrap_or_default().to_string(),
            model: item.find_text("ProductName").unwrap_or_default().to_string(),
        })
        .collect())
}

/// List all physical disks on the node.
pub async fn list_physical_disks<T: Transport>(client: &Client<T>) -> Result<Vec<PhysicalDisk>> {
    let items = client.enumerate(&resource_uri(DCIM_PHYSICAL_DISK_VIEW)).await?;
    Ok(items
        .iter()
        .map(|item| PhysicalDisk {
            id: item.find_text("FQDD").unwrap_or_default().to_string(),
            controller: item.find_text("RAIDController" /* parent FQDD */).unwrap_or_default().to_string(),
            disk_type: disk_type(item),
            interface_type: interface_type(item),
            size_gb: size_gb_from_bytes(item, "SizeInBytes"),
            free_size_gb: size_gb_from_bytes(item, "FreeSizeInBytes"),
            vendor: item.find_text("Manufacturer").unwrap_or_default().to_string(),
            model: item.find_text("Model").unwrap_or_default().to_string(),
            serial_number: item.find_text("SerialNumber").unwrap_or_default().to_string(),
            firmware_version: item.find_text("Revision").unwrap_or_default().to_string(),
            state: disk_state(item),
            raid_state: raid_state(item),
        })
        .collect())
}

/// List all virtual disks on the node.
pub async fn list_virtual_disks<T: Transport>(client: &Client<T>) -> Result<Vec<VirtualDisk>> {
    let items = client.enumerate(&resource_uri(DCIM_VIRTUAL_DISK_VIEW)).await?;
    Ok(items
        .iter()
        .map(|item| VirtualDisk {
            id: item.find_text("FQDD").unwrap_or_default().to_string(),
            controller: item.find_text("RAIDController" /* parent FQDD */).unwrap_or_default().to_string(),
            size_gb: size_gb_from_bytes(item, "SizeInBytes"),
            raid_level: item
                .find_text("RAIDTypes")
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(super::types::decode_raid_level)
                .unwrap_or("unknown")
                .to_string(),
            name: item.find_text("Name").unwrap_or_default().to_string(),
            state: item.find_text("PrimaryStatus").unwrap_or_default().to_string(),
            raid_state: item.find_text("RaidStatus").unwrap_or_default().to_string(),
        })
        .collect())
}
