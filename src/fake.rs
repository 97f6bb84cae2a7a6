// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Utility file to provide a scripted passthrough device, so that callers of
// the transport can be exercised without SCSI hardware.

use std::time::Duration;

use crate::device::check_driver_version;
use crate::device::ScsiPassthrough;
use crate::device::Transfer;
use crate::device::TransferDirection;
use crate::error::Result;
use crate::status::StatusOutcome;

/// Record of one command executed against a [`FakeScsiDevice`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeCommand {
    pub cdb: Vec<u8>,
    pub direction: TransferDirection,
    pub transfer_len: usize,
    /// Bytes the caller sent on a `ToDevice` transfer, empty otherwise.
    pub data: Vec<u8>,
    pub timeout: Duration,
}

/// A passthrough device that completes every command with a scripted
/// outcome, recording what was asked of it. Runs the real status decoder,
/// so tests exercise the same classification path as hardware.
#[derive(Debug, Default)]
pub struct FakeScsiDevice {
    outcome: StatusOutcome,
    read_data: Vec<u8>,
    commands: Vec<FakeCommand>,
}

impl FakeScsiDevice {
    /// A device that completes every command cleanly and returns zeroes.
    pub fn new() -> FakeScsiDevice {
        FakeScsiDevice::default()
    }

    /// Like [`FakeScsiDevice::new`], but first runs the same
    /// driver-capability gate as the real sg open path against the given
    /// decimal-packed version.
    pub fn with_driver_version(version: i32) -> Result<FakeScsiDevice> {
        check_driver_version(version)?;
        Ok(FakeScsiDevice::new())
    }

    /// Scripts the raw outcome every subsequent command completes with.
    pub fn set_outcome(&mut self, outcome: StatusOutcome) {
        self.outcome = outcome;
    }

    /// Scripts the bytes handed back on `FromDevice` transfers. Shorter
    /// payloads leave the tail of the caller's buffer untouched.
    pub fn set_read_data(&mut self, data: &[u8]) {
        self.read_data = data.to_vec();
    }

    /// Commands executed so far, oldest first.
    pub fn commands(&self) -> &[FakeCommand] {
        &self.commands
    }
}

impl ScsiPassthrough for FakeScsiDevice {
    fn execute(&mut self, cdb: &[u8], mut xfer: Transfer, timeout: Duration) -> Result<()> {
        let data = match &xfer {
            Transfer::ToDevice(data) => data.to_vec(),
            _ => Vec::new(),
        };
        self.commands.push(FakeCommand {
            cdb: cdb.to_vec(),
            direction: xfer.direction(),
            transfer_len: xfer.len(),
            data,
            timeout,
        });
        if let Transfer::FromDevice(buf) = &mut xfer {
            let n = self.read_data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.read_data[..n]);
        }
        self.outcome.clone().into_result()
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
