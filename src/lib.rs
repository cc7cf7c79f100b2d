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

//! A driver for out-of-band management of Dell servers over WS-Management,
//! modeled on the DRAC driver once shipped by OpenStack Ironic.
//!
//! This crate speaks WS-MAN directly to a server's iDRAC: BIOS attribute
//! get/set, boot-device selection, Lifecycle Controller job queries, and
//! RAID inventory/planning/configuration. It does not implement node
//! persistence, locking, or an HTTP surface; those are the responsibility of
//! the conductor that embeds it, via the small capability traits in
//! [`node`].

pub mod bios;
pub mod config;
pub mod error;
pub mod job;
pub mod management;
pub mod node;
pub mod raid;
pub mod reconciler;
pub mod vendor_passthru;
pub mod wsman;

pub use config::DriverConfig;
pub use error::{Error, ErrorKind, Result};
