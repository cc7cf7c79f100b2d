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

//! The RAID configuration planner: turns a `TargetRaidConfiguration` plus an
//! inventory of physical disks into a concrete set of `CreateVirtualDisk`
//! calls and their controller commit order.

use std::collections::HashSet;

use crate::error::{Error, ErrorKind, Result};
use crate::node::LogicalDiskTarget;

use super::types::{calculate_spans, PhysicalDisk, RaidState};

/// A resolved logical disk, ready to hand to `create_virtual_disk`.
#[derive(Debug, Clone)]
pub struct PlannedVirtualDisk {
    /// Controller the virtual disk is created on.
    pub raid_controller: String,
    /// Physical disks backing this virtual disk.
    pub physical_disks: Vec<String>,
    /// Resolved size in MB.
    pub size_mb: i64,
    /// RAID level requested.
    pub raid_level: String,
    /// Resolved span length.
    pub span_length: u32,
    /// Resolved span depth.
    pub span_depth: u32,
    /// Optional volume name.
    pub volume_name: Option<String>,
}

/// The controller the observed implementation always targets after planning.
///
/// This is a known quirk of the original implementation (it overwrites each
/// logical disk's controller unconditionally); preserved verbatim here, see
/// `DESIGN.md`.
pub const PLANNER_CONTROLLER_OVERWRITE: &str = "RAID.Integrated.1-1";

fn filter_logical_disks(
    logical_disks: &[LogicalDiskTarget],
    want_root: bool,
) -> Vec<&LogicalDiskTarget> {
    logical_disks
        .iter()
        .filter(|ld| ld.is_root() == want_root)
        .collect()
}

fn filter_physical_disks<'a>(
    disks: &'a [PhysicalDisk],
    used: &HashSet<String>,
    controller: &str,
    interface_type: Option<&str>,
    disk_type: Option<&str>,
) -> Vec<&'a PhysicalDisk> {
    disks
        .iter()
        .filter(|d| !used.contains(&d.id))
        .filter(|d| d.raid_state == RaidState::Ready)
        .filter(|d| d.controller == controller)
        .filter(|d| {
            interface_type
                .map(|it| format!("{:?}", d.interface_type).to_lowercase() == it.to_lowercase())
                .unwrap_or(true)
        })
        .filter(|d| {
            disk_type
                .map(|dt| format!("{:?}", d.disk_type).to_lowercase() == dt.to_lowercase())
                .unwrap_or(true)
        })
        .collect()
}

/// Match physical disks to logical-disk targets, per the matching rules in
/// §4.6: explicit `physical_disks` first, then auto-selection for the rest.
fn match_physical_disks(
    logical_disks: &[&LogicalDiskTarget],
    available: &[PhysicalDisk],
) -> Result<Vec<Vec<String>>> {
    let mut used: HashSet<String> = HashSet::new();
    let mut assigned = Vec::with_capacity(logical_disks.len());

    // Explicit selections reserve disks first.
    for ld in logical_disks {
        if let Some(explicit) = &ld.physical_disks {
            for id in explicit {
                used.insert(id.clone());
            }
        }
    }

    for ld in logical_disks {
        if let Some(explicit) = &ld.physical_disks {
            assigned.push(explicit.clone());
            continue;
        }

        let wanted = ld.number_of_physical_disks.unwrap_or(0) as usize;
        let candidates = filter_physical_disks(
            available,
            &used,
            &ld.controller,
            ld.interface_type.as_deref(),
            ld.disk_type.as_deref(),
        );

        if candidates.len() < wanted {
            return Err(Error::new(
                ErrorKind::InvalidRaidConfiguration,
                format!(
                    "controller {} has {} eligible disks, but {} were requested",
                    ld.controller,
                    candidates.len(),
                    wanted
                ),
            ));
        }

        let selected: Vec<String> = candidates.into_iter().take(wanted).map(|d| d.id.clone()).collect();
        for id in &selected {
            used.insert(id.clone());
        }
        assigned.push(selected);
    }

    Ok(assigned)
}

/// Run the planner end to end, returning one `PlannedVirtualDisk` per
/// logical-disk target and the distinct controllers touched, in the order
/// they were first encountered (insertion order, per §4.6 step 5).
pub fn plan(
    logical_disks_spec: &[LogicalDiskTarget],
    create_root_volume: bool,
    create_nonroot_volumes: bool,
    available: &[PhysicalDisk],
) -> Result<(Vec<PlannedVirtualDisk>, Vec<String>)> {
    let mut selected: Vec<&LogicalDiskTarget> = Vec::new();
    if create_root_volume {
        selected.extend(filter_logical_disks(logical_disks_spec, true));
    }
    if create_nonroot_volumes {
        selected.extend(filter_logical_disks(logical_disks_spec, false));
    }

    if selected.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let physical_assignments = match_physical_disks(&selected, available)?;

    let mut planned = Vec::with_capacity(selected.len());
    let mut controller_order: Vec<String> = Vec::new();

    for (ld, disks) in selected.iter().zip(physical_assignments.into_iter()) {
        let size_mb = ld.resolve_size_mb().ok_or_else(|| {
            Error::new(ErrorKind::InvalidParameterValue, "logical disk is missing size_gb/size_mb")
        })?;

        // span_length/span_depth are resolved independently: a
        // caller-supplied value is always kept, and only the missing one
        // falls back to the computed geometry.
        let (span_length, span_depth) = if let (Some(l), Some(d)) = (ld.span_length, ld.span_depth) {
            (l, d)
        } else {
            let (computed_length, computed_depth) =
                calculate_spans(&ld.raid_level, disks.len() as u32).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidRaidConfiguration,
                        format!("unsupported RAID level {}", ld.raid_level),
                    )
                })?;
            (ld.span_length.unwrap_or(computed_length), ld.span_depth.unwrap_or(computed_depth))
        };

        if !controller_order.iter().any(|c| c == PLANNER_CONTROLLER_OVERWRITE) {
            controller_order.push(PLANNER_CONTROLLER_OVERWRITE.to_string());
        }

        planned.push(PlannedVirtualDisk {
            raid_controller: PLANNER_CONTROLLER_OVERWRITE.to_string(),
            physical_disks: disks,
            size_mb,
            raid_level: ld.raid_level.clone(),
            span_length,
            span_depth,
            volume_name: ld.volume_name.clone(),
        });
    }

    Ok((planned, controller_order))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raid::types::{DiskState, DiskType, InterfaceType};

    fn ready_sas_hdd(id: &str, controller: &str) -> PhysicalDisk {
        PhysicalDisk {
            id: id.into(),
            controller: controller.into(),
            disk_type: DiskType::Hdd,
            interface_type: InterfaceType::Sas,
            size_gb: 500,
            free_size_gb: 500,
            vendor: "SEAGATE".into(),
            model: "ST500".into(),
            serial_number: id.into(),
            firmware_version: "FW1".into(),
            state: DiskState::Ok,
            raid_state: RaidState::Ready,
        }
    }

    fn degraded(id: &str, controller: &str) -> PhysicalDisk {
        let mut d = ready_sas_hdd(id, controller);
        d.raid_state = RaidState::Degraded;
        d
    }

    fn target(controller: &str, n: u32, is_root: bool) -> LogicalDiskTarget {
        LogicalDiskTarget {
            controller: controller.into(),
            size_gb: Some(50),
            size_mb: None,
            raid_level: "1".into(),
            physical_disks: None,
            number_of_physical_disks: Some(n),
            disk_type: None,
            interface_type: None,
            volume_name: None,
            disk_name: None,
            is_root_volume: Some(is_root),
            span_depth: None,
            span_length: None,
        }
    }

    #[test]
    fn test_filter_physical_disks_excludes_non_ready() {
        let mut disks: Vec<PhysicalDisk> = (0..7).map(|i| degraded(&format!("D{}", i), "C")).collect();
        disks.push(ready_sas_hdd("D_ready", "C"));
        let used = HashSet::new();
        let eligible = filter_physical_disks(&disks, &used, "C", None, None);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "D_ready");
    }

    #[test]
    fn test_planner_sufficiency_assigns_disjoint_disks() {
        let disks: Vec<PhysicalDisk> = (0..8).map(|i| ready_sas_hdd(&format!("D{}", i), "C")).collect();
        let targets = vec![target("C", 2, true), target("C", 2, false)];
        let (planned, controllers) = plan(&targets, true, true, &disks).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(controllers, vec![PLANNER_CONTROLLER_OVERWRITE.to_string()]);
        let all_used: Vec<&String> = planned.iter().flat_map(|p| p.physical_disks.iter()).collect();
        let unique: HashSet<&String> = all_used.iter().cloned().collect();
        assert_eq!(all_used.len(), unique.len(), "no physical disk should be reused");
    }

    #[test]
    fn test_planner_insufficiency_fails() {
        let disks: Vec<PhysicalDisk> = (0..3).map(|i| ready_sas_hdd(&format!("D{}", i), "C")).collect();
        let targets = vec![target("C", 2, true), target("C", 2, false)];
        let err = plan(&targets, true, true, &disks).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRaidConfiguration);
    }

    #[test]
    fn test_happy_path_matches_s3_scenario() {
        let disks: Vec<PhysicalDisk> = (0..8).map(|i| ready_sas_hdd(&format!("D{}", i), "RAID.Integrated.1-1")).collect();
        let target = LogicalDiskTarget {
            controller: "RAID.Integrated.1-1".into(),
            size_gb: Some(50),
            size_mb: None,
            raid_level: "1".into(),
            physical_disks: None,
            number_of_physical_disks: Some(2),
            disk_type: None,
            interface_type: None,
            volume_name: None,
            disk_name: None,
            is_root_volume: Some(true),
            span_depth: None,
            span_length: None,
        };
        let (planned, _) = plan(&[target], true, false, &disks).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].size_mb, 51200);
        assert_eq!(planned[0].span_length, 2);
        assert_eq!(planned[0].span_depth, 1);
        assert_eq!(planned[0].raid_controller, "RAID.Integrated.1-1");
    }

    #[test]
    fn test_plan_keeps_caller_supplied_span_length_and_only_fills_span_depth() {
        let disks: Vec<PhysicalDisk> = (0..8).map(|i| ready_sas_hdd(&format!("D{}", i), "C")).collect();
        let mut ld = target("C", 2, true);
        ld.span_length = Some(99);
        let (planned, _) = plan(&[ld], true, false, &disks).unwrap();
        assert_eq!(planned[0].span_length, 99, "caller-supplied span_length must not be discarded");
        assert_eq!(planned[0].span_depth, 1, "missing span_depth is still filled in from geometry");
    }

    #[test]
    fn test_plan_keeps_caller_supplied_span_depth_and_only_fills_span_length() {
        let disks: Vec<PhysicalDisk> = (0..8).map(|i| ready_sas_hdd(&format!("D{}", i), "C")).collect();
        let mut ld = target("C", 2, true);
        ld.span_depth = Some(77);
        let (planned, _) = plan(&[ld], true, false, &disks).unwrap();
        assert_eq!(planned[0].span_depth, 77, "caller-supplied span_depth must not be discarded");
        assert_eq!(planned[0].span_length, 2, "missing span_length is still filled in from geometry");
    }
}
