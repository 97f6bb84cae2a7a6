// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use remain::sorted;
use thiserror::Error as ThisError;

use crate::errno::Error as SysError;
use crate::status::DriverStatus;
use crate::status::HostStatus;
use crate::status::ScsiStatus;
use crate::status::DRIVER_STATUS_MASK;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a passthrough device. The three status variants are
/// mutually exclusive per command and carry the raw code as reported by the
/// native interface.
#[sorted]
#[derive(ThisError, Debug)]
pub enum Error {
    /// Releasing the device handle failed at the OS level.
    #[error("failed to close device: {0}")]
    Close(SysError),
    /// The mid-level driver reported a failure for the command.
    #[error("driver status {0:#04x} ({name})", name = driver_status_name(.0))]
    DriverStatus(u16),
    /// The host adapter reported a failure for the command.
    #[error("host status {0:#04x} ({name})", name = host_status_name(.0))]
    HostStatus(u16),
    /// Opening or probing the device failed at the OS level.
    #[error("failed to open device: {0}")]
    Open(SysError),
    /// The device itself completed the command with a non-good status.
    /// `sense` holds the raw bytes the device wrote, undecoded.
    #[error("scsi status {status:#04x} ({name}), sense {sense:02x?}", name = scsi_status_name(.status))]
    ScsiStatus { status: u8, sense: Vec<u8> },
    /// The native passthrough call failed before any status was produced.
    #[error("passthrough call failed: {0}")]
    Transport(SysError),
    /// The completion was flagged abnormal but every status layer reads
    /// clean; reported rather than treated as success.
    #[error("abnormal completion with all status layers clean")]
    UnclassifiedTransport,
    /// The sg driver predates the synchronous passthrough interface.
    #[error("sg driver version {version} is older than 3.0.0", version = sg_version_string(.0))]
    UnsupportedDriver(i32),
    /// The host OS was recognized but its version is not supported.
    #[error("host platform is not supported")]
    UnsupportedPlatform,
}

fn scsi_status_name(status: &u8) -> &'static str {
    match ScsiStatus::n(*status) {
        Some(ScsiStatus::Good) => "GOOD",
        Some(ScsiStatus::CheckCondition) => "CHECK CONDITION",
        Some(ScsiStatus::ConditionMet) => "CONDITION MET",
        Some(ScsiStatus::Busy) => "BUSY",
        Some(ScsiStatus::Intermediate) => "INTERMEDIATE",
        Some(ScsiStatus::IntermediateConditionMet) => "INTERMEDIATE CONDITION MET",
        Some(ScsiStatus::ReservationConflict) => "RESERVATION CONFLICT",
        Some(ScsiStatus::CommandTerminated) => "COMMAND TERMINATED",
        Some(ScsiStatus::TaskSetFull) => "TASK SET FULL",
        Some(ScsiStatus::AcaActive) => "ACA ACTIVE",
        Some(ScsiStatus::TaskAborted) => "TASK ABORTED",
        None => "unrecognized",
    }
}

fn driver_status_name(status: &u16) -> &'static str {
    match DriverStatus::n(*status & DRIVER_STATUS_MASK) {
        Some(DriverStatus::Ok) => "DRIVER_OK",
        Some(DriverStatus::Busy) => "DRIVER_BUSY",
        Some(DriverStatus::Soft) => "DRIVER_SOFT",
        Some(DriverStatus::Media) => "DRIVER_MEDIA",
        Some(DriverStatus::Error) => "DRIVER_ERROR",
        Some(DriverStatus::Invalid) => "DRIVER_INVALID",
        Some(DriverStatus::Timeout) => "DRIVER_TIMEOUT",
        Some(DriverStatus::Hard) => "DRIVER_HARD",
        Some(DriverStatus::Sense) => "DRIVER_SENSE",
        None => "unrecognized",
    }
}

fn host_status_name(status: &u16) -> &'static str {
    match HostStatus::n(*status) {
        Some(HostStatus::Ok) => "DID_OK",
        Some(HostStatus::NoConnect) => "DID_NO_CONNECT",
        Some(HostStatus::BusBusy) => "DID_BUS_BUSY",
        Some(HostStatus::TimeOut) => "DID_TIME_OUT",
        Some(HostStatus::BadTarget) => "DID_BAD_TARGET",
        Some(HostStatus::Abort) => "DID_ABORT",
        Some(HostStatus::Parity) => "DID_PARITY",
        Some(HostStatus::Error) => "DID_ERROR",
        Some(HostStatus::Reset) => "DID_RESET",
        Some(HostStatus::BadIntr) => "DID_BAD_INTR",
        Some(HostStatus::Passthrough) => "DID_PASSTHROUGH",
        Some(HostStatus::SoftError) => "DID_SOFT_ERROR",
        Some(HostStatus::ImmRetry) => "DID_IMM_RETRY",
        Some(HostStatus::Requeue) => "DID_REQUEUE",
        None => "unrecognized",
    }
}

// The sg driver packs its version as major * 10000 + minor * 100 + revision.
fn sg_version_string(version: &i32) -> String {
    format!(
        "{}.{}.{}",
        version / 10000,
        (version / 100) % 100,
        version % 100
    )
}
