//! Docker volume plugin wire types
//!
//! Requests and responses are JSON objects with PascalCase keys. Failures
//! carry a human-readable message in `Err`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::driver::Capabilities;
use crate::registry::{VolumeOptions, VolumeRecord};

/// Content type of every plugin response
pub const CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

/// Subsystem this plugin implements
pub const VOLUME_DRIVER: &str = "VolumeDriver";

pub const ACTIVATE_PATH: &str = "/Plugin.Activate";
pub const CREATE_PATH: &str = "/VolumeDriver.Create";
pub const GET_PATH: &str = "/VolumeDriver.Get";
pub const LIST_PATH: &str = "/VolumeDriver.List";
pub const REMOVE_PATH: &str = "/VolumeDriver.Remove";
pub const PATH_PATH: &str = "/VolumeDriver.Path";
pub const MOUNT_PATH: &str = "/VolumeDriver.Mount";
pub const UNMOUNT_PATH: &str = "/VolumeDriver.Unmount";
pub const CAPABILITIES_PATH: &str = "/VolumeDriver.Capabilities";

/// `/Plugin.Activate` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginManifest {
    pub implements: Vec<String>,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            implements: vec![VOLUME_DRIVER.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub name: String,
    /// Docker sends `null` when no `-o` flags were given
    #[serde(default)]
    pub opts: Option<VolumeOptions>,
}

/// Body of Get, Remove and Path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

/// Body of Mount and Unmount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountRequest {
    #[serde(default)]
    pub name: String,
    /// Caller (container) identifier
    #[serde(default, rename = "ID")]
    pub id: String,
}

/// Volume as the runtime sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub name: String,
    pub mountpoint: String,
}

impl From<VolumeRecord> for Volume {
    fn from(record: VolumeRecord) -> Self {
        Self {
            name: record.name,
            mountpoint: record.mountpoint,
        }
    }
}

/// Response of operations without a payload, and of every failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub err: String,
}

impl ErrorResponse {
    pub fn new(err: impl ToString) -> Self {
        Self {
            err: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: Volume,
    pub err: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<Volume>,
    pub err: String,
}

/// Response of Path and Mount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountpointResponse {
    pub mountpoint: String,
    pub err: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Capabilities,
}

/// Decode a request body. Empty and `null` bodies decode to the default.
pub fn decode<T: DeserializeOwned + Default>(body: &[u8]) -> serde_json::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Scope;
    use serde_json::json;

    #[test]
    fn manifest_names_volume_driver() {
        assert_eq!(
            serde_json::to_value(PluginManifest::default()).unwrap(),
            json!({"Implements": ["VolumeDriver"]})
        );
    }

    #[test]
    fn create_request_accepts_null_opts() {
        let req: CreateRequest = decode(br#"{"Name": "foo", "Opts": null}"#).unwrap();
        assert_eq!(req.name, "foo");
        assert!(req.opts.is_none());

        let req: CreateRequest = decode(br#"{"Name": "foo", "Opts": {"cmd": "x"}}"#).unwrap();
        assert_eq!(req.opts.unwrap().get("cmd").map(String::as_str), Some("x"));
    }

    #[test]
    fn mount_request_reads_id() {
        let req: MountRequest = decode(br#"{"Name": "foo", "ID": "abc123"}"#).unwrap();
        assert_eq!(req.id, "abc123");
    }

    #[test]
    fn empty_and_null_bodies_decode_to_default() {
        assert_eq!(decode::<NameRequest>(b"").unwrap(), NameRequest::default());
        assert_eq!(decode::<NameRequest>(b"  \n").unwrap(), NameRequest::default());
        assert_eq!(decode::<NameRequest>(b"null").unwrap(), NameRequest::default());
    }

    #[test]
    fn malformed_body_is_error() {
        assert!(decode::<NameRequest>(b"{\"Name\": 3}").is_err());
        assert!(decode::<NameRequest>(b"{").is_err());
    }

    #[test]
    fn responses_use_plugin_field_names() {
        let get = GetResponse {
            volume: Volume {
                name: "foo".to_string(),
                mountpoint: "/m/foo".to_string(),
            },
            err: String::new(),
        };
        assert_eq!(
            serde_json::to_value(get).unwrap(),
            json!({"Volume": {"Name": "foo", "Mountpoint": "/m/foo"}, "Err": ""})
        );

        let caps = CapabilitiesResponse {
            capabilities: Capabilities {
                scope: Scope::Local,
            },
        };
        assert_eq!(
            serde_json::to_value(caps).unwrap(),
            json!({"Capabilities": {"Scope": "local"}})
        );
    }

    #[test]
    fn volume_from_record_drops_options() {
        let record = VolumeRecord::new(
            "foo",
            "/m/foo",
            VolumeOptions::from([("cmd".to_string(), "x".to_string())]),
        );
        let volume = Volume::from(record);
        assert_eq!(volume.name, "foo");
        assert_eq!(volume.mountpoint, "/m/foo");
    }
}
