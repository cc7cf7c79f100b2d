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

//! RAID inventory types and the RAID-level/disk-attribute encoding maps.

use serde::{Deserialize, Serialize};

/// A RAID controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidController {
    /// FQDD, e.g. `RAID.Integrated.1-1`.
    pub id: String,
    /// Controller model string.
    pub model: String,
}

/// Disk media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    /// Spinning disk.
    Hdd,
    /// Solid state.
    Ssd,
}

/// Disk bus/interface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    /// Unrecognized.
    Unknown,
    /// SCSI.
    Scsi,
    /// PATA/IDE.
    Pata,
    /// Fibre channel.
    Fibre,
    /// USB.
    Usb,
    /// SATA.
    Sata,
    /// SAS.
    Sas,
}

/// Physical health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskState {
    /// Not reported.
    Unknown,
    /// Healthy.
    Ok,
    /// Degraded but operational.
    Degraded,
    /// Failed.
    Error,
}

/// Disk's membership state within a RAID array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaidState {
    /// Not reported.
    Unknown,
    /// Available for use in a new array.
    Ready,
    /// Part of an online array.
    Online,
    /// Carries data from a foreign configuration.
    Foreign,
    /// Taken offline.
    Offline,
    /// Administratively blocked.
    Blocked,
    /// Failed.
    Failed,
    /// Array is degraded.
    Degraded,
    /// Not under RAID management.
    #[serde(rename = "non-raid")]
    NonRaid,
}

/// A physical disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDisk {
    /// FQDD.
    pub id: String,
    /// Parent controller FQDD.
    pub controller: String,
    /// Media type.
    pub disk_type: DiskType,
    /// Bus/interface type.
    pub interface_type: InterfaceType,
    /// Total size in GB.
    pub size_gb: i64,
    /// Free (unused) size in GB.
    pub free_size_gb: i64,
    /// Vendor string.
    pub vendor: String,
    /// Model string.
    pub model: String,
    /// Serial number.
    pub serial_number: String,
    /// Firmware version.
    pub firmware_version: String,
    /// Health state.
    pub state: DiskState,
    /// RAID membership state.
    pub raid_state: RaidState,
}

/// A virtual (logical) disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDisk {
    /// FQDD.
    pub id: String,
    /// Parent controller FQDD.
    pub controller: String,
    /// Size in GB.
    pub size_gb: i64,
    /// RAID level string, e.g. `"1"`, `"5+0"`.
    pub raid_level: String,
    /// Volume name.
    pub name: String,
    /// Health state string as reported.
    pub state: String,
    /// RAID membership state string as reported.
    pub raid_state: String,
}

/// Bidirectional RAID-level ↔ DCIM numeric-code mapping.
const RAID_LEVEL_TABLE: &[(&str, i64)] = &[
    ("non-raid", 1),
    ("0", 2),
    ("1", 4),
    ("5", 64),
    ("6", 128),
    ("1+0", 2048),
    ("5+0", 8192),
    ("6+0", 16384),
];

/// Encode a RAID level string to its DCIM numeric code.
pub fn encode_raid_level(level: &str) -> Option<i64> {
    RAID_LEVEL_TABLE.iter().find(|(l, _)| *l == level).map(|(_, c)| *c)
}

/// Decode a DCIM numeric RAID level code back to its string form.
pub fn decode_raid_level(code: i64) -> Option<&'static str> {
    RAID_LEVEL_TABLE.iter().find(|(_, c)| *c == code).map(|(l, _)| *l)
}

/// Compute `(span_length, span_depth)` for a RAID level and disk count,
/// preserving the original implementation's literal arithmetic.
pub fn calculate_spans(raid_level: &str, disks_count: u32) -> Option<(u32, u32)> {
    match raid_level {
        "0" | "1" | "5" | "6" => Some((disks_count, 1)),
        "5+0" | "6+0" => Some(((disks_count >> 1) << 1, 2)),
        "1+0" => Some(((disks_count >> 1) << 1, disks_count >> 1)),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_raid_level_bijection() {
        for (level, _) in RAID_LEVEL_TABLE {
            let code = encode_raid_level(level).unwrap();
            assert_eq!(decode_raid_level(code), Some(*level));
        }
    }

    #[test]
    fn test_calculate_spans_mirror_level() {
        assert_eq!(calculate_spans("1", 2), Some((2, 1)));
    }

    #[test]
    fn test_calculate_spans_raid50() {
        assert_eq!(calculate_spans("5+0", 7), Some((6, 2)));
    }

    #[test]
    fn test_calculate_spans_raid10() {
        assert_eq!(calculate_spans("1+0", 7), Some((6, 3)));
    }

    #[test]
    fn test_calculate_spans_unknown_level_is_none() {
        assert_eq!(calculate_spans("foo", 7), None);
    }
}
