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

//! Error and Result implementations.

use std::fmt;

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, HTTP or XML-parse failure at the WS-MAN layer.
    ClientError,

    /// Request completed but the RAC reported an error or an unexpected
    /// structural response.
    OperationFailed,

    /// The `ReturnValue` of an `Invoke` did not match what the caller expected.
    UnexpectedReturnValue,

    /// A configuration job targeting the same device is already pending.
    PendingConfigJobExists,

    /// A Lifecycle Controller job with the requested ID does not exist.
    LifecycleJobNotFound,

    /// Caller-supplied arguments failed validation.
    InvalidParameterValue,

    /// The RAID planner could not satisfy the target configuration with the
    /// disks available.
    InvalidRaidConfiguration,

    /// The WS-MAN transport could not be initialized.
    DriverLoadError,

    /// The node referenced by an operation does not exist.
    NodeNotFound,

    /// The node referenced by an operation is locked by another worker.
    NodeLocked,

    /// The driver configuration file was missing or malformed.
    InvalidConfig,

    #[allow(missing_docs)]
    __Nonexhaustive,
}

/// Error from a driver call.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

/// Result of a driver call.
pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Create a new error of the given kind with a message.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: Some(message.into()),
        }
    }

    /// Create a new error of the given kind with no message.
    pub(crate) fn bare(kind: ErrorKind) -> Error {
        Error {
            kind,
            message: None,
        }
    }

    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Message attached to this error, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn pending_config_job_exists<S: Into<String>>(job_id: S, target: S) -> Error {
        let job_id = job_id.into();
        let target = target.into();
        Error::new(
            ErrorKind::PendingConfigJobExists,
            format!(
                "a configuration job {} is already pending for target {}",
                job_id, target
            ),
        )
    }
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::ClientError => "WS-MAN transport or parse error",
            ErrorKind::OperationFailed => "requested operation has failed",
            ErrorKind::UnexpectedReturnValue => "unexpected ReturnValue in WS-MAN response",
            ErrorKind::PendingConfigJobExists => "a pending configuration job already exists",
            ErrorKind::LifecycleJobNotFound => "requested Lifecycle Controller job was not found",
            ErrorKind::InvalidParameterValue => "input value(s) are invalid or missing",
            ErrorKind::InvalidRaidConfiguration => {
                "requested RAID configuration cannot be satisfied"
            }
            ErrorKind::DriverLoadError => "WS-MAN transport is not available",
            ErrorKind::NodeNotFound => "requested node was not found",
            ErrorKind::NodeLocked => "requested node is locked by another worker",
            ErrorKind::InvalidConfig => "driver configuration is missing or invalid",
            ErrorKind::__Nonexhaustive => unreachable!(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref msg) = self.message {
            write!(f, ": {}", msg)
        } else {
            Ok(())
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Error {
        Error::new(ErrorKind::ClientError, value.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Error {
        Error::new(ErrorKind::ClientError, format!("XML parse error: {}", value))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(value: std::str::Utf8Error) -> Error {
        Error::new(
            ErrorKind::ClientError,
            format!("invalid UTF-8 in response: {}", value),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_with_message() {
        let err = Error::new(ErrorKind::OperationFailed, "Item has no name");
        assert_eq!(
            err.to_string(),
            "requested operation has failed: Item has no name"
        );
    }

    #[test]
    fn test_display_without_message() {
        let err = Error::bare(ErrorKind::NodeLocked);
        assert_eq!(err.to_string(), "requested node is locked by another worker");
    }

    #[test]
    fn test_kind_roundtrip() {
        let err = Error::new(ErrorKind::InvalidRaidConfiguration, "no disks");
        assert_eq!(err.kind(), ErrorKind::InvalidRaidConfiguration);
    }
}
