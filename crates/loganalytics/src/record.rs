// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log records as received from the host and as sent over the wire.

use crate::identity::IdentityConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single log line emitted by a container, as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogRecord {
    /// Stream the line came from (`stdout`, `stderr`); reported as the level.
    pub source: String,
    pub data: String,
    pub container_name: String,
    pub container_id: String,
    pub container_image: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// Wire schema accepted by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub version: u8,
    #[serde(rename = "timeEmitted")]
    pub time_emitted: DateTime<Utc>,
    pub level: String,
    pub msg: String,
    #[serde(rename = "moduleName")]
    pub module_name: String,
    #[serde(rename = "containerID")]
    pub container_id: String,
    #[serde(rename = "containerImage")]
    pub container_image: String,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iothubname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iothubdeviceid: Option<String>,
}

impl CanonicalRecord {
    pub const VERSION: u8 = 0;

    /// Maps `record` onto the wire schema. The emission time is `timestamp`,
    /// then the record's own time, then the current UTC time.
    pub fn build(
        record: &LogRecord,
        identity: &IdentityConfig,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        CanonicalRecord {
            version: Self::VERSION,
            time_emitted: timestamp.or(record.time).unwrap_or_else(Utc::now),
            level: record.source.clone(),
            msg: record.data.clone(),
            module_name: record.container_name.clone(),
            container_id: record.container_id.clone(),
            container_image: record.container_image.clone(),
            hostname: identity.hostname.clone().unwrap_or_default(),
            iothubname: identity.hub_name.clone(),
            iothubdeviceid: identity.device_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> LogRecord {
        LogRecord {
            source: "stderr".to_string(),
            data: "sensor offline".to_string(),
            container_name: "tempSensor".to_string(),
            container_id: "4f9c0e".to_string(),
            container_image: "mcr.microsoft.com/azureiotedge-simulated-temperature-sensor:1.0"
                .to_string(),
            time: None,
        }
    }

    #[test]
    fn maps_fields_onto_wire_schema() {
        let identity = IdentityConfig::new("ws", "c2VjcmV0")
            .with_hub_name("hub")
            .with_device_id("dev")
            .with_hostname("gw");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let canonical = CanonicalRecord::build(&record(), &identity, Some(ts));

        assert_eq!(canonical.version, 0);
        assert_eq!(canonical.time_emitted, ts);
        assert_eq!(canonical.level, "stderr");
        assert_eq!(canonical.msg, "sensor offline");
        assert_eq!(canonical.module_name, "tempSensor");
        assert_eq!(canonical.container_id, "4f9c0e");
        assert_eq!(canonical.hostname, "gw");
        assert_eq!(canonical.iothubname.as_deref(), Some("hub"));
        assert_eq!(canonical.iothubdeviceid.as_deref(), Some("dev"));
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let identity = IdentityConfig::new("ws", "c2VjcmV0");
        let before = Utc::now();
        let canonical = CanonicalRecord::build(&record(), &identity, None);
        let after = Utc::now();

        assert!(canonical.time_emitted >= before);
        assert!(canonical.time_emitted <= after + Duration::milliseconds(50));
    }

    #[test]
    fn record_time_used_when_no_explicit_timestamp() {
        let identity = IdentityConfig::new("ws", "c2VjcmV0");
        let emitted = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let mut rec = record();
        rec.time = Some(emitted);

        assert_eq!(
            CanonicalRecord::build(&rec, &identity, None).time_emitted,
            emitted
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let identity = IdentityConfig::new("ws", "c2VjcmV0").with_device_id("dev");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let canonical = CanonicalRecord::build(&record(), &identity, Some(ts));

        let value = serde_json::to_value(&canonical).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["timeEmitted"], "2024-03-01T12:30:00Z");
        assert_eq!(value["moduleName"], "tempSensor");
        assert_eq!(value["containerID"], "4f9c0e");
        assert_eq!(
            value["containerImage"],
            "mcr.microsoft.com/azureiotedge-simulated-temperature-sensor:1.0"
        );
        assert_eq!(value["hostname"], "");
        assert_eq!(value["iothubdeviceid"], "dev");
        assert!(value.get("iothubname").is_none());
    }
}
