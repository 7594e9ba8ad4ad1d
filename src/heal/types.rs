//! Heal wire types and session snapshot types.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::heal::color::Color;

/// Item type as reported by the cluster.
pub type HealItemType = String;

pub const HEAL_ITEM_METADATA: &str = "metadata";
pub const HEAL_ITEM_BUCKET: &str = "bucket";
pub const HEAL_ITEM_BUCKET_METADATA: &str = "bucket-metadata";
pub const HEAL_ITEM_OBJECT: &str = "object";

pub const DRIVE_STATE_OK: &str = "ok";
pub const DRIVE_STATE_OFFLINE: &str = "offline";
pub const DRIVE_STATE_CORRUPT: &str = "corrupt";
pub const DRIVE_STATE_MISSING: &str = "missing";

/// Summary strings of a heal sequence.
pub const HEAL_SUMMARY_FINISHED: &str = "finished";
pub const HEAL_SUMMARY_STOPPED: &str = "stopped";

/// Scan depth requested for a heal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealScanMode {
    #[default]
    Normal,
    Deep,
}

impl From<HealScanMode> for u8 {
    fn from(mode: HealScanMode) -> u8 {
        match mode {
            HealScanMode::Normal => 1,
            HealScanMode::Deep => 2,
        }
    }
}

impl TryFrom<u8> for HealScanMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            // 0 is "unknown" on the wire and defaults to a normal scan
            0 | 1 => Ok(HealScanMode::Normal),
            2 => Ok(HealScanMode::Deep),
            other => Err(format!("unknown heal scan mode {other}")),
        }
    }
}

/// Options sent with a heal start request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealOpts {
    pub recursive: bool,
    pub dry_run: bool,
    pub remove: bool,
    pub scan_mode: HealScanMode,
}

/// A heal sequence request against a bucket and optional prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealRequest {
    pub bucket: String,
    pub prefix: String,
    pub opts: HealOpts,
    pub force_start: bool,
    pub force_stop: bool,
}

/// Returned by the cluster when a heal sequence is started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealStartSuccess {
    pub client_token: String,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealDriveInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Infos {
    #[serde(default)]
    pub drives: Vec<HealDriveInfo>,
}

impl Infos {
    fn count_state(&self, state: &str) -> i64 {
        self.drives.iter().filter(|d| d.state == state).count() as i64
    }
}

/// One healed (or inspected) item in a status batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealResultItem {
    #[serde(rename = "resultId")]
    pub result_index: u64,
    #[serde(rename = "type")]
    pub heal_item_type: HealItemType,
    pub bucket: String,
    pub object: String,
    pub version_id: String,
    pub detail: String,
    pub parity_blocks: i64,
    pub data_blocks: i64,
    pub disk_count: i64,
    pub set_count: i64,
    pub before: Infos,
    pub after: Infos,
    /// Negative when the size is unknown.
    pub object_size: i64,
}

impl HealResultItem {
    /// Online drive counts before and after healing.
    pub fn online_counts(&self) -> (i64, i64) {
        (
            self.before.count_state(DRIVE_STATE_OK),
            self.after.count_state(DRIVE_STATE_OK),
        )
    }
}

/// Status of a running heal sequence as reported by the cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealTaskStatus {
    pub summary: String,
    #[serde(rename = "detail")]
    pub failure_detail: String,
    pub start_time: Option<DateTime<Utc>>,
    pub settings: HealOpts,
    pub items: Vec<HealResultItem>,
}

/// Drive health of one item at one point in time (before or after healing).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DriveHealth {
    pub color: Color,
    pub online: i64,
    pub offline: i64,
    pub missing: i64,
    pub corrupted: i64,
    pub drives: Vec<HealDriveInfo>,
}

impl DriveHealth {
    pub fn from_infos(color: Color, infos: &Infos) -> Self {
        Self {
            color,
            online: infos.count_state(DRIVE_STATE_OK),
            offline: infos.count_state(DRIVE_STATE_OFFLINE),
            missing: infos.count_state(DRIVE_STATE_MISSING),
            corrupted: infos.count_state(DRIVE_STATE_CORRUPT),
            drives: infos.drives.clone(),
        }
    }
}

/// Per-item result appended to the session snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemHealthStatus {
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
    pub size: i64,
    pub before: DriveHealth,
    pub after: DriveHealth,
}

/// Cumulative heal session snapshot sent after every poll.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealStatus {
    #[serde(serialize_with = "serialize_duration")]
    pub heal_duration: Duration,
    pub bytes_scanned: i64,
    pub objects_scanned: u64,
    pub objects_healed: u64,
    pub items_scanned: u64,
    pub items_healed: u64,
    pub items: Vec<ItemHealthStatus>,
    #[serde(rename = "healthBeforeCols")]
    pub health_before_cols: BTreeMap<Color, u64>,
    #[serde(rename = "healthAfterCols")]
    pub health_after_cols: BTreeMap<Color, u64>,
}

fn serialize_duration<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*d))
}
