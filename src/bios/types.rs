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

//! BIOS attribute types: a union over the three DCIM BIOS namespaces.

/// The DCIM instance ID of the BIOS settings target, used by every BIOS
/// operation (`SetAttributes`, `CreateTargetedConfigJob`, job filtering).
pub const BIOS_TARGET: &str = "BIOS.Setup.1-1";

/// A BIOS attribute's value, which may be unset (`xsi:nil`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// No value staged/reported.
    Nil,
    /// A textual or enumeration value.
    Text(String),
    /// An integer value.
    Integer(i64),
}

impl AttributeValue {
    /// Render the value as a string for comparison/serialization purposes.
    pub fn as_display(&self) -> Option<String> {
        match self {
            AttributeValue::Nil => None,
            AttributeValue::Text(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
        }
    }
}

/// Constraint-specific fields, one variant per DCIM BIOS namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// `DCIM_BIOSEnumeration`.
    Enumeration {
        /// Allowed values, sorted lexicographically.
        possible_values: Vec<String>,
    },
    /// `DCIM_BIOSString`.
    String {
        /// Minimum allowed length.
        min_length: u32,
        /// Maximum allowed length.
        max_length: u32,
        /// Optional validation regex (already AssetTag-patched).
        regex: Option<String>,
    },
    /// `DCIM_BIOSInteger`.
    Integer {
        /// Minimum allowed value.
        lower_bound: i64,
        /// Maximum allowed value.
        upper_bound: i64,
    },
}

/// A single BIOS attribute, as reported by `get_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, e.g. `ProcVirtualization`.
    pub name: String,
    /// Currently active value.
    pub current_value: AttributeValue,
    /// Staged value not yet committed, if any.
    pub pending_value: AttributeValue,
    /// Whether the attribute can be modified at all.
    pub read_only: bool,
    /// Constraint-specific fields.
    pub kind: AttributeKind,
}

impl Attribute {
    /// The literal token the firmware sometimes emits in an `AssetTag`
    /// string attribute's regex instead of a concrete number.
    pub const ASSET_TAG_TOKEN: &'static str = "MAX_ASSET_TAG_LEN";

    /// Whether `value` is acceptable for this attribute, without considering
    /// read-only status or whether it actually changes anything.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match &self.kind {
            AttributeKind::Enumeration { possible_values } => {
                if possible_values.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(format!(
                        "attribute {} does not support value {} (allowed: {:?})",
                        self.name, value, possible_values
                    ))
                }
            }
            AttributeKind::String { regex, .. } => {
                if let Some(pattern) = regex {
                    let re = regex::Regex::new(pattern).map_err(|e| {
                        format!("attribute {} has an invalid regex {}: {}", self.name, pattern, e)
                    })?;
                    if re.is_match(value) {
                        Ok(())
                    } else {
                        Err(format!(
                            "attribute {} value {} does not match pattern {}",
                            self.name, value, pattern
                        ))
                    }
                } else {
                    Ok(())
                }
            }
            AttributeKind::Integer {
                lower_bound,
                upper_bound,
            } => {
                let parsed: i64 = value.parse().map_err(|_| {
                    format!("attribute {} expects an integer, got {}", self.name, value)
                })?;
                // Bounds are checked against the parsed value, not the
                // attribute name; the original implementation compared the
                // name instead, which was a bug.
                if parsed < *lower_bound || parsed > *upper_bound {
                    Err(format!(
                        "attribute {} value {} is outside [{}, {}]",
                        self.name, parsed, lower_bound, upper_bound
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}
