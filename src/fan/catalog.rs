// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

//! Vendor command catalog for QM2 fan control.
//!
//! QM2 cards are driven through the `hal_app` enclosure interface. Every
//! operation resolves to an ordered list of candidate commands: the
//! `hal_app` form first, followed by the legacy `qcontrol` / procfs / hwmon
//! forms when legacy fallback is enabled.

use serde::{Serialize, Serializer};
use std::fmt;

/// Binary that speaks the enclosure protocol on QTS
const HAL_APP: &str = "hal_app";

/// Fan slot on the card; QM2 cards carry a single fan
const FAN_OBJ_INDEX: u32 = 0;

/// `hal_app` fan mode that accepts raw PWM writes
pub const MANUAL_PWM_MODE: u8 = 1;

/// Enclosure identifier of a detected expansion card, e.g. `qm2_1_11.32`.
///
/// Only [`detect`](super::detector::detect) produces these, from the
/// enumeration output of the host itself, so the value can be substituted
/// into command templates as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// What selecting a speed option does on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedAction {
    /// Hand control back to the firmware's own curve.
    RestoreDefault,
    /// Manual mode with a fixed duty. `legacy_level` is the 1-4 step used
    /// by `qcontrol` on older models.
    Pwm { duty: u8, legacy_level: u8 },
}

/// A caller-selectable fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FanSpeedOption {
    pub label: &'static str,
    pub value: &'static str,
    #[serde(skip)]
    pub action: SpeedAction,
}

/// Available speeds, in the order they are offered to users.
pub const FAN_SPEED_OPTIONS: &[FanSpeedOption] = &[
    FanSpeedOption {
        label: "Auto",
        value: "auto",
        action: SpeedAction::RestoreDefault,
    },
    FanSpeedOption {
        label: "Silent",
        value: "silent",
        action: SpeedAction::Pwm {
            duty: 50,
            legacy_level: 1,
        },
    },
    FanSpeedOption {
        label: "Low",
        value: "low",
        action: SpeedAction::Pwm {
            duty: 75,
            legacy_level: 1,
        },
    },
    FanSpeedOption {
        label: "Medium",
        value: "medium",
        action: SpeedAction::Pwm {
            duty: 100,
            legacy_level: 2,
        },
    },
    FanSpeedOption {
        label: "High",
        value: "high",
        action: SpeedAction::Pwm {
            duty: 175,
            legacy_level: 3,
        },
    },
    FanSpeedOption {
        label: "Maximum",
        value: "max",
        action: SpeedAction::Pwm {
            duty: 255,
            legacy_level: 4,
        },
    },
];

/// A fan operation to be rendered into concrete commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOperation {
    EnumerateDevices,
    GetFanStatus,
    GetFanPwm,
    SetFanMode(u8),
    SetFanPwm { duty: u8, legacy_level: u8 },
    RestoreDefaultFan,
}

impl FanOperation {
    /// Short verb phrase used in failure messages.
    pub fn action(&self) -> &'static str {
        match self {
            FanOperation::EnumerateDevices => "enumerate devices",
            FanOperation::GetFanStatus => "read fan status",
            FanOperation::GetFanPwm => "read fan PWM",
            FanOperation::SetFanMode(_) => "set fan mode",
            FanOperation::SetFanPwm { .. } | FanOperation::RestoreDefaultFan => "set fan speed",
        }
    }
}

/// Read-only lookup table from operations to commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    legacy_fallback: bool,
}

impl Catalog {
    /// Strict catalog: one `hal_app` command per operation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append legacy alternatives after the `hal_app` command.
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    pub fn speed_options(&self) -> &'static [FanSpeedOption] {
        FAN_SPEED_OPTIONS
    }

    /// Exact-match lookup of a speed by its value key.
    pub fn find_speed(&self, value: &str) -> Option<&'static FanSpeedOption> {
        FAN_SPEED_OPTIONS.iter().find(|option| option.value == value)
    }

    /// Candidate commands for `op`, in the order they should be tried.
    ///
    /// Device enumeration takes no identifier; pass `None` for it. Other
    /// operations without a device get only the legacy alternatives, which
    /// address the system fan.
    pub fn candidates(&self, op: FanOperation, device: Option<&DeviceId>) -> Vec<String> {
        let mut commands = Vec::with_capacity(4);
        match (op, device) {
            (FanOperation::EnumerateDevices, _) => commands.push(enum_command()),
            (_, None) => {}
            (op, Some(device)) => commands.push(hal_app_command(op, device)),
        }

        commands.extend(self.legacy_candidates(op));
        commands
    }

    /// Legacy alternatives for `op`; empty unless legacy fallback is enabled.
    pub fn legacy_candidates(&self, op: FanOperation) -> Vec<String> {
        if self.legacy_fallback {
            legacy_commands(op)
        } else {
            Vec::new()
        }
    }
}

/// `hal_app --se_enum`
pub fn enum_command() -> String {
    format!("{HAL_APP} --se_enum")
}

pub fn fan_status_command(device: &DeviceId) -> String {
    format!("{HAL_APP} --se_sys_get_fan_status enc_sys_id={device},obj_index={FAN_OBJ_INDEX}")
}

pub fn fan_pwm_command(device: &DeviceId) -> String {
    format!("{HAL_APP} --se_sys_get_fan_pwm enc_sys_id={device},obj_index={FAN_OBJ_INDEX}")
}

pub fn set_fan_mode_command(device: &DeviceId, mode: u8) -> String {
    format!(
        "{HAL_APP} --se_sys_set_fan_mode enc_sys_id={device},obj_index={FAN_OBJ_INDEX},mode={mode}"
    )
}

pub fn set_fan_pwm_command(device: &DeviceId, pwm: u8) -> String {
    format!(
        "{HAL_APP} --se_sys_set_fan_pwm enc_sys_id={device},obj_index={FAN_OBJ_INDEX},pwm={pwm}"
    )
}

pub fn restore_default_fan_command(device: &DeviceId) -> String {
    format!("{HAL_APP} --se_sys_restore_default_fan enc_sys_id={device},obj_index={FAN_OBJ_INDEX}")
}

fn hal_app_command(op: FanOperation, device: &DeviceId) -> String {
    match op {
        FanOperation::EnumerateDevices => enum_command(),
        FanOperation::GetFanStatus => fan_status_command(device),
        FanOperation::GetFanPwm => fan_pwm_command(device),
        FanOperation::SetFanMode(mode) => set_fan_mode_command(device, mode),
        FanOperation::SetFanPwm { duty, .. } => set_fan_pwm_command(device, duty),
        FanOperation::RestoreDefaultFan => restore_default_fan_command(device),
    }
}

/// Pre-`hal_app` interfaces found on older QTS builds. They address the
/// system fan rather than a specific card, so they ignore the device id.
fn legacy_commands(op: FanOperation) -> Vec<String> {
    match op {
        FanOperation::GetFanStatus => vec![
            "qcontrol fan status".to_string(),
            "cat /proc/qnap/fan_speed".to_string(),
        ],
        FanOperation::GetFanPwm => {
            vec!["cat /sys/devices/platform/pwm_fan/hwmon/hwmon0/pwm1".to_string()]
        }
        FanOperation::RestoreDefaultFan => vec![
            "qcontrol fan auto".to_string(),
            "/usr/bin/qcontrol fan auto".to_string(),
            "echo auto > /proc/qnap/fan_speed".to_string(),
        ],
        FanOperation::SetFanPwm { legacy_level, .. } => vec![
            format!("qcontrol fan {legacy_level}"),
            format!("/usr/bin/qcontrol fan {legacy_level}"),
            format!("echo {legacy_level} > /proc/qnap/fan_speed"),
        ],
        FanOperation::EnumerateDevices | FanOperation::SetFanMode(_) => Vec::new(),
    }
}
