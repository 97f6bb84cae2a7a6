// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Classification of the layered status a passthrough command completes with.
//!
//! Status code values follow SAM-5 and `<scsi/sg.h>`:
//! <https://www.t10.org/cgi-bin/ac.pl?t=f&f=sam5r21.pdf>

use enumn::N;
use log::warn;

use crate::error::Error;
use crate::error::Result;

/// Low nibble of the driver status carries the error class; the high nibble
/// is a retry suggestion sub-field and is not modeled.
pub const DRIVER_STATUS_MASK: u16 = 0x0f;

/// SAM status codes reported by the device itself.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ScsiStatus {
    Good = 0x00,
    /// Sense data has been delivered in the sense buffer.
    CheckCondition = 0x02,
    ConditionMet = 0x04,
    Busy = 0x08,
    Intermediate = 0x10,
    IntermediateConditionMet = 0x14,
    ReservationConflict = 0x18,
    CommandTerminated = 0x22,
    TaskSetFull = 0x28,
    AcaActive = 0x30,
    TaskAborted = 0x40,
}

/// Mid-level driver outcomes (`DRIVER_*` in `<scsi/sg.h>`), already masked
/// to the low nibble.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum DriverStatus {
    Ok = 0x00,
    Busy = 0x01,
    Soft = 0x02,
    Media = 0x03,
    Error = 0x04,
    Invalid = 0x05,
    Timeout = 0x06,
    Hard = 0x07,
    /// Sense data was obtained for the command.
    Sense = 0x08,
}

/// Host adapter outcomes (`DID_*` in `<scsi/sg.h>`).
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum HostStatus {
    Ok = 0x00,
    NoConnect = 0x01,
    BusBusy = 0x02,
    TimeOut = 0x03,
    BadTarget = 0x04,
    Abort = 0x05,
    Parity = 0x06,
    Error = 0x07,
    Reset = 0x08,
    BadIntr = 0x09,
    Passthrough = 0x0a,
    SoftError = 0x0b,
    ImmRetry = 0x0c,
    Requeue = 0x0d,
}

/// Raw per-layer status of one completed passthrough command, as decoded
/// from the native control block. Built once per execute call and consumed
/// once by [`StatusOutcome::into_result`].
///
/// `abnormal` mirrors the sg `SG_INFO_CHECK` bit; backends without such a
/// flag set it whenever any layer they carry is non-clean.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusOutcome {
    pub scsi_status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    pub abnormal: bool,
    /// Sense bytes actually written by the device, empty if none.
    pub sense: Vec<u8>,
}

impl StatusOutcome {
    /// Collapses the layered status into success or exactly one classified
    /// error. The device's own status is checked first, then the driver,
    /// then the host adapter: the most specific diagnosis available wins.
    pub fn into_result(self) -> Result<()> {
        if !self.abnormal {
            return Ok(());
        }
        if self.scsi_status != ScsiStatus::Good as u8 {
            return Err(Error::ScsiStatus {
                status: self.scsi_status,
                sense: self.sense,
            });
        }
        if self.driver_status & DRIVER_STATUS_MASK != DriverStatus::Ok as u16 {
            return Err(Error::DriverStatus(self.driver_status));
        }
        if self.host_status != HostStatus::Ok as u16 {
            return Err(Error::HostStatus(self.host_status));
        }
        warn!("abnormal completion but scsi, driver and host statuses are all clean");
        Err(Error::UnclassifiedTransport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abnormal(scsi_status: u8, driver_status: u16, host_status: u16) -> StatusOutcome {
        StatusOutcome {
            scsi_status,
            host_status,
            driver_status,
            abnormal: true,
            sense: Vec::new(),
        }
    }

    #[test]
    fn clean_outcome_is_ok() {
        assert!(StatusOutcome::default().into_result().is_ok());
    }

    #[test]
    fn statuses_ignored_without_abnormal_flag() {
        // The decoder only runs when the driver flagged the completion.
        let outcome = StatusOutcome {
            scsi_status: ScsiStatus::CheckCondition as u8,
            ..Default::default()
        };
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn scsi_status_outranks_all_layers() {
        let outcome = abnormal(
            ScsiStatus::CheckCondition as u8,
            DriverStatus::Timeout as u16,
            HostStatus::NoConnect as u16,
        );
        assert!(matches!(
            outcome.into_result(),
            Err(Error::ScsiStatus { status, .. }) if status == ScsiStatus::CheckCondition as u8
        ));
    }

    #[test]
    fn driver_status_outranks_host_status() {
        let outcome = abnormal(0, DriverStatus::Media as u16, HostStatus::BusBusy as u16);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::DriverStatus(status)) if status == DriverStatus::Media as u16
        ));
    }

    #[test]
    fn host_status_when_other_layers_clean() {
        let outcome = abnormal(0, 0, HostStatus::BadTarget as u16);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::HostStatus(status)) if status == HostStatus::BadTarget as u16
        ));
    }

    #[test]
    fn suggestion_bits_do_not_classify() {
        // A driver status carrying only the suggestion sub-field reads as
        // clean once masked.
        let outcome = abnormal(0, 0x10, HostStatus::TimeOut as u16);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::HostStatus(status)) if status == HostStatus::TimeOut as u16
        ));
    }

    #[test]
    fn suggestion_bits_preserved_in_error() {
        let outcome = abnormal(0, 0x10 | DriverStatus::Timeout as u16, 0);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::DriverStatus(0x16))
        ));
    }

    #[test]
    fn all_layers_clean_is_never_success() {
        let outcome = abnormal(0, 0, 0);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::UnclassifiedTransport)
        ));
    }

    #[test]
    fn sense_travels_with_scsi_status() {
        let outcome = StatusOutcome {
            scsi_status: ScsiStatus::CheckCondition as u8,
            abnormal: true,
            sense: vec![0x70, 0x00, 0x03],
            ..Default::default()
        };
        match outcome.into_result() {
            Err(Error::ScsiStatus { sense, .. }) => assert_eq!(sense, vec![0x70, 0x00, 0x03]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
