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

//! Fan speed and status operations on a connected session.
//!
//! Arbitrary PWM writes are only honoured by the card firmware in manual
//! mode, so every fixed speed is applied as a mode switch followed by the
//! PWM write. "Auto" instead restores the firmware default curve.
//!
//! With legacy fallback enabled, hosts without a working `hal_app` are
//! driven through the system-fan interfaces instead: a failed detection or
//! a failed mode switch falls through to the legacy chain for the
//! operation, which needs neither a device id nor a mode switch.

use super::catalog::{Catalog, DeviceId, FanOperation, SpeedAction, MANUAL_PWM_MODE};
use super::detector;
use crate::error::{FanError, Result};
use crate::session::{CommandOutput, RemoteShellSession};

/// Drives one session's fan through the catalog.
pub struct FanController<'a> {
    session: &'a mut RemoteShellSession,
    catalog: &'a Catalog,
}

impl<'a> FanController<'a> {
    pub fn new(session: &'a mut RemoteShellSession, catalog: &'a Catalog) -> Self {
        Self { session, catalog }
    }

    /// Apply the speed option whose value key is `value`.
    ///
    /// The key is validated before anything is sent, so an unknown key
    /// never costs a remote command.
    pub async fn set_fan_speed(&mut self, value: &str) -> Result<String> {
        if !self.session.is_connected() {
            return Err(FanError::NotConnected);
        }
        let option = self
            .catalog
            .find_speed(value)
            .ok_or_else(|| FanError::InvalidSpeedValue(value.to_string()))?;

        let mut device = match option.action {
            SpeedAction::RestoreDefault => {
                self.resolve_target(FanOperation::RestoreDefaultFan)
                    .await?
            }
            SpeedAction::Pwm { duty, legacy_level } => {
                self.resolve_target(FanOperation::SetFanPwm { duty, legacy_level })
                    .await?
            }
        };

        match option.action {
            SpeedAction::RestoreDefault => {
                self.run_candidates(FanOperation::RestoreDefaultFan, device.as_ref())
                    .await?;
            }
            SpeedAction::Pwm { duty, legacy_level } => {
                let pwm = FanOperation::SetFanPwm { duty, legacy_level };
                if let Some(id) = device.clone() {
                    match self
                        .run_candidates(FanOperation::SetFanMode(MANUAL_PWM_MODE), Some(&id))
                        .await
                    {
                        Ok(_) => {}
                        Err(e @ FanError::CommandFailed { .. })
                            if !self.catalog.legacy_candidates(pwm).is_empty() =>
                        {
                            tracing::warn!("{e}; falling back to legacy fan control");
                            device = None;
                        }
                        Err(e) => return Err(e),
                    }
                }
                self.run_candidates(pwm, device.as_ref()).await?;
            }
        }

        tracing::info!(speed = option.value, "Fan speed applied");
        Ok(match device {
            Some(id) => format!("Fan speed set to {} (QM2: {})", option.label, id),
            None => format!("Fan speed set to {} (system fan)", option.label),
        })
    }

    /// Current fan status and PWM, pipe-joined.
    ///
    /// Either half may be missing; fails only when neither yields output.
    pub async fn get_fan_status(&mut self) -> Result<String> {
        let device = self.resolve_target(FanOperation::GetFanStatus).await?;

        let mut status_info = Vec::with_capacity(2);
        if let Some(status) = self
            .read(FanOperation::GetFanStatus, device.as_ref())
            .await?
        {
            status_info.push(format!("Fan Status: {status}"));
        }
        if let Some(pwm) = self.read(FanOperation::GetFanPwm, device.as_ref()).await? {
            status_info.push(format!("PWM: {pwm}"));
        }

        if status_info.is_empty() {
            Err(FanError::StatusUnavailable)
        } else {
            Ok(status_info.join(" | "))
        }
    }

    /// The cached device identifier, or a fresh detection that is then cached.
    async fn resolve_device(&mut self) -> Result<DeviceId> {
        if !self.session.is_connected() {
            return Err(FanError::NotConnected);
        }
        if let Some(device) = self.session.device_id() {
            return Ok(device.clone());
        }

        let device = detector::detect(self.session, self.catalog).await?;
        self.session.cache_device_id(device.clone());
        Ok(device)
    }

    /// Device to address for `op`, or `None` when detection failed and
    /// legacy alternatives for `op` can run without one.
    async fn resolve_target(&mut self, op: FanOperation) -> Result<Option<DeviceId>> {
        match self.resolve_device().await {
            Ok(device) => Ok(Some(device)),
            Err(FanError::NotConnected) => Err(FanError::NotConnected),
            Err(e) if !self.catalog.legacy_candidates(op).is_empty() => {
                tracing::warn!("{e}; falling back to legacy fan control");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Try each candidate for `op` until one exits zero.
    ///
    /// On exhaustion the error carries the last candidate's stderr.
    async fn run_candidates(
        &mut self,
        op: FanOperation,
        device: Option<&DeviceId>,
    ) -> Result<CommandOutput> {
        let candidates = self.catalog.candidates(op, device);
        let mut last_failure = String::new();

        for (attempt, command) in candidates.iter().enumerate() {
            if attempt > 0 {
                tracing::warn!(command = %command, "Trying alternative command");
            }
            let output = self.session.execute_command(command).await?;
            if output.success() {
                return Ok(output);
            }
            last_failure = output.stderr;
        }

        Err(FanError::command_failed(op.action(), last_failure))
    }

    /// First non-empty stdout among the candidates for a read operation.
    async fn read(
        &mut self,
        op: FanOperation,
        device: Option<&DeviceId>,
    ) -> Result<Option<String>> {
        for command in self.catalog.candidates(op, device) {
            let output = self.session.execute_command(&command).await?;
            if output.success() && !output.stdout.is_empty() {
                return Ok(Some(output.stdout));
            }
        }
        Ok(None)
    }
}
