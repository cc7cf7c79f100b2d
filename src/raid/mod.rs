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

//! RAID inventory, planning and configuration.

pub mod inventory;
pub mod planner;
pub mod service;
pub mod types;

pub use inventory::{list_physical_disks, list_raid_controllers, list_virtual_disks};
pub use planner::{plan, PlannedVirtualDisk};
pub use service::{
    apply_pending_config, create_configuration, create_virtual_disk, delete_pending_config, delete_virtual_disk,
    CreateVirtualDiskArgs,
};
pub use types::{PhysicalDisk, RaidController, VirtualDisk};
