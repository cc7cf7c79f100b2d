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

//! Lifecycle Controller job queries.

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, ErrorKind, Result};
use crate::wsman::constants::{resource_uri, DCIM_LIFECYCLE_JOB};
use crate::wsman::{Client, Node, Transport};

/// States a Lifecycle Controller job will never leave.
const TERMINAL_STATES: &[&str] = &["Reboot Completed", "Completed", "Completed with Errors", "Failed"];

/// Housekeeping job name excluded from `list_unfinished_jobs`.
const CLEARALL: &str = "CLEARALL";

/// A Lifecycle Controller job.
#[derive(Debug, Clone)]
pub struct Job {
    /// `InstanceID`.
    pub id: String,
    /// Target device name, e.g. `BIOS.Setup.1-1`.
    pub name: String,
    /// Job state, e.g. `Completed`, `Failed`, `Running`.
    pub state: String,
    /// Human-readable status message.
    pub message: String,
    /// Completion percentage, if reported.
    pub percent_complete: Option<u32>,
    /// Scheduled start time, if reported and parseable (the RAC reports
    /// `TIME_NOW` and `Not Applicable` for jobs that haven't been scheduled).
    pub start_time: Option<DateTime<FixedOffset>>,
    /// Expiry time, under the same caveats as `start_time`.
    pub until_time: Option<DateTime<FixedOffset>>,
}

/// Parse a WMI-style CIM datetime (`yyyyMMddHHmmss.ffffff+zzz`) as reported
/// in `StartTime`/`UntilTime`. Sentinel values like `TIME_NOW` parse to `None`.
fn parse_cim_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(text, "%Y%m%d%H%M%S%.f%#z").ok()
}

impl Job {
    fn from_node(item: &Node) -> Job {
        Job {
            id: item.find_text("InstanceID").unwrap_or_default().to_string(),
            name: item.find_text("Name").unwrap_or_default().to_string(),
            state: item.find_text("JobStatus").unwrap_or_default().to_string(),
            message: item.find_text("Message").unwrap_or_default().to_string(),
            percent_complete: item.find_text("PercentComplete").and_then(|s| s.parse().ok()),
            start_time: item.find_text("StartTime").and_then(parse_cim_datetime),
            until_time: item.find_text("UntilTime").and_then(parse_cim_datetime),
        }
    }

    /// Whether this job has left a terminal state and the "CLEARALL"
    /// housekeeping placeholder.
    pub fn is_unfinished(&self) -> bool {
        self.name != CLEARALL && !TERMINAL_STATES.contains(&self.state.as_str())
    }
}

/// Fetch a single job by its `InstanceID`.
pub async fn get_job<T: Transport>(client: &Client<T>, job_id: &str) -> Result<Job> {
    let items = client.enumerate(&resource_uri(DCIM_LIFECYCLE_JOB)).await?;
    items
        .iter()
        .map(Job::from_node)
        .find(|j| j.id == job_id)
        .ok_or_else(|| Error::bare(ErrorKind::LifecycleJobNotFound))
}

/// List every job that has not yet reached a terminal state.
pub async fn list_unfinished_jobs<T: Transport>(client: &Client<T>) -> Result<Vec<Job>> {
    let items = client.enumerate(&resource_uri(DCIM_LIFECYCLE_JOB)).await?;
    Ok(items
        .iter()
        .map(Job::from_node)
        .filter(Job::is_unfinished)
        .collect())
}

/// Extract a newly created job's id from an `Invoke` response's WS-MAN
/// `Selector[@Name='InstanceID']`, as returned by e.g. `CreateTargetedConfigJob`.
pub fn extract_job_id(output: &Node) -> Result<String> {
    output
        .find_all("Selector")
        .into_iter()
        .find(|s| s.attr("Name") == Some("InstanceID"))
        .map(|s| s.text().to_string())
        .ok_or_else(|| Error::new(ErrorKind::OperationFailed, "Invoke response has no job InstanceID selector"))
}
