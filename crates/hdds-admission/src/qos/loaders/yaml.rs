// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML QoS profile loader.
//!
//! # Example YAML
//!
//! ```yaml
//! # qos_profiles.yaml
//! default_profile: sensor_state
//! profiles:
//!   sensor_state:
//!     history:
//!       kind: KEEP_LAST
//!       depth: 4
//!     destination_order: BY_SOURCE_TIMESTAMP
//!     deadline:
//!       period_ms: 50
//!     time_based_filter:
//!       minimum_separation_ms: 10
//!
//!   audit_log:
//!     history:
//!       kind: KEEP_ALL
//!     resource_limits:
//!       max_samples_per_instance: 1024
//! ```

use crate::error::{Error, Result};
use crate::qos::{
    Deadline, DestinationOrder, History, QoS, ResourceLimits, TimeBasedFilter,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// YAML QoS profile loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
pub struct YamlQosDocument {
    /// Named QoS profiles.
    #[serde(default)]
    pub profiles: HashMap<String, YamlQosProfile>,

    /// Default profile name (optional).
    #[serde(default)]
    pub default_profile: Option<String>,
}

/// A single QoS profile in YAML format.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlQosProfile {
    /// History configuration
    pub history: Option<YamlHistory>,

    /// Destination order: BY_RECEPTION_TIMESTAMP or BY_SOURCE_TIMESTAMP
    pub destination_order: Option<String>,

    /// Deadline configuration
    pub deadline: Option<YamlDeadline>,

    /// Time-based filter configuration
    pub time_based_filter: Option<YamlTimeBasedFilter>,

    /// Resource limits
    pub resource_limits: Option<YamlResourceLimits>,
}

/// History QoS in YAML.
#[derive(Debug, Deserialize)]
pub struct YamlHistory {
    /// KEEP_LAST or KEEP_ALL
    pub kind: String,
    /// Depth for KEEP_LAST
    #[serde(default = "default_history_depth")]
    pub depth: u32,
}

fn default_history_depth() -> u32 {
    1
}

/// Deadline QoS in YAML.
#[derive(Debug, Deserialize)]
pub struct YamlDeadline {
    /// Period in milliseconds
    #[serde(default)]
    pub period_ms: Option<u64>,
    /// Period in seconds (alternative)
    #[serde(default)]
    pub period_secs: Option<u64>,
}

/// Time-based filter QoS in YAML.
#[derive(Debug, Deserialize)]
pub struct YamlTimeBasedFilter {
    /// Minimum separation in milliseconds
    #[serde(default)]
    pub minimum_separation_ms: Option<u64>,
}

/// Resource limits QoS in YAML (-1 = unlimited).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct YamlResourceLimits {
    pub max_samples: i32,
    pub max_instances: i32,
    pub max_samples_per_instance: i32,
}

impl Default for YamlResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: -1,              // UNLIMITED
            max_instances: -1,            // UNLIMITED
            max_samples_per_instance: -1, // UNLIMITED
        }
    }
}

impl YamlLoader {
    /// Load QoS profiles from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<YamlQosDocument> {
        let yaml_content = fs::read_to_string(path)?;
        Self::parse_yaml(&yaml_content)
    }

    /// Parse YAML content.
    pub fn parse_yaml(yaml_content: &str) -> Result<YamlQosDocument> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Get QoS by profile name.
    pub fn get_profile(doc: &YamlQosDocument, name: &str) -> Result<QoS> {
        let profile = doc
            .profiles
            .get(name)
            .ok_or_else(|| Error::Config(format!("Profile '{}' not found", name)))?;
        Self::profile_to_qos(profile)
    }

    /// Get default QoS from document.
    ///
    /// Falls back to `QoS::default()` when the document declares no
    /// default and contains no profile.
    pub fn get_default_profile(doc: &YamlQosDocument) -> Result<QoS> {
        if let Some(ref default_name) = doc.default_profile {
            Self::get_profile(doc, default_name)
        } else if doc.profiles.len() == 1 {
            let (_, profile) = doc
                .profiles
                .iter()
                .next()
                .ok_or_else(|| Error::Config("empty profile map".to_string()))?;
            Self::profile_to_qos(profile)
        } else if doc.profiles.is_empty() {
            Ok(QoS::default())
        } else {
            Err(Error::Config(
                "several profiles and no default_profile".to_string(),
            ))
        }
    }

    /// Convert YAML profile to a validated QoS.
    pub fn profile_to_qos(profile: &YamlQosProfile) -> Result<QoS> {
        let mut qos = QoS::default();

        if let Some(ref hist) = profile.history {
            qos.history = match hist.kind.to_uppercase().as_str() {
                "KEEP_LAST" => History::KeepLast(hist.depth),
                "KEEP_ALL" => History::KeepAll,
                other => return Err(Error::Config(format!("Invalid history kind: {}", other))),
            };
        }

        if let Some(ref order) = profile.destination_order {
            qos.destination_order = match order.to_uppercase().as_str() {
                "BY_RECEPTION_TIMESTAMP" => DestinationOrder::by_reception_timestamp(),
                "BY_SOURCE_TIMESTAMP" => DestinationOrder::by_source_timestamp(),
                other => {
                    return Err(Error::Config(format!(
                        "Invalid destination_order: {}",
                        other
                    )))
                }
            };
        }

        if let Some(ref deadline) = profile.deadline {
            qos.deadline = match (deadline.period_ms, deadline.period_secs) {
                (Some(ms), _) => Deadline::from_millis(ms),
                (None, Some(secs)) => Deadline::from_secs(secs),
                (None, None) => Deadline::infinite(),
            };
        }

        if let Some(ref tbf) = profile.time_based_filter {
            if let Some(ms) = tbf.minimum_separation_ms {
                qos.time_based_filter = TimeBasedFilter::new(Duration::from_millis(ms));
            }
        }

        if let Some(ref rl) = profile.resource_limits {
            qos.resource_limits = ResourceLimits {
                max_samples: ResourceLimits::limit_from_i32(rl.max_samples),
                max_instances: ResourceLimits::limit_from_i32(rl.max_instances),
                max_samples_per_instance: ResourceLimits::limit_from_i32(
                    rl.max_samples_per_instance,
                ),
            };
        }

        qos.validate()?;
        Ok(qos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = r#"
default_profile: sensor_state
profiles:
  sensor_state:
    history:
      kind: KEEP_LAST
      depth: 4
    destination_order: BY_SOURCE_TIMESTAMP
    deadline:
      period_ms: 50
    time_based_filter:
      minimum_separation_ms: 10
  audit_log:
    history:
      kind: keep_all
    resource_limits:
      max_samples_per_instance: 1024
"#;

    #[test]
    fn test_parse_profiles() {
        let doc = YamlLoader::parse_yaml(DOC).expect("valid yaml");
        assert_eq!(doc.profiles.len(), 2);

        let qos = YamlLoader::get_default_profile(&doc).expect("default profile");
        assert_eq!(qos.history, History::KeepLast(4));
        assert!(qos.destination_order.uses_source_timestamp());
        assert_eq!(qos.deadline.period, Duration::from_millis(50));
        assert_eq!(qos.time_based_filter.minimum_separation, Duration::from_millis(10));
    }

    #[test]
    fn test_keep_all_with_limits() {
        let doc = YamlLoader::parse_yaml(DOC).expect("valid yaml");
        let qos = YamlLoader::get_profile(&doc, "audit_log").expect("profile");
        assert_eq!(qos.history, History::KeepAll);
        assert_eq!(qos.resource_limits.max_samples_per_instance, 1024);
        assert_eq!(qos.resource_limits.max_instances, crate::qos::LENGTH_UNLIMITED);
    }

    #[test]
    fn test_unknown_profile() {
        let doc = YamlLoader::parse_yaml(DOC).expect("valid yaml");
        assert!(matches!(
            YamlLoader::get_profile(&doc, "missing"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let doc = YamlLoader::parse_yaml(
            "profiles:\n  p:\n    destination_order: BY_MOOD\n",
        )
        .expect("valid yaml");
        assert!(matches!(
            YamlLoader::get_profile(&doc, "p"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_inconsistent_profile_fails_validation() {
        let doc = YamlLoader::parse_yaml(
            "profiles:\n  p:\n    deadline:\n      period_ms: 5\n    time_based_filter:\n      minimum_separation_ms: 20\n",
        )
        .expect("valid yaml");
        assert!(matches!(
            YamlLoader::get_profile(&doc, "p"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(DOC.as_bytes()).expect("write");

        let doc = YamlLoader::load_from_file(file.path()).expect("load");
        assert!(doc.profiles.contains_key("sensor_state"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            YamlLoader::load_from_file("/nonexistent/hdds/qos.yaml"),
            Err(Error::Io(_))
        ));
    }
}
