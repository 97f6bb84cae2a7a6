// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Safe, cross-platform-compatible SCSI passthrough transport.
//!
//! Sends caller-supplied command descriptor blocks (CDBs) to a SCSI-capable
//! device and reports the transport-level outcome through one surface,
//! although the underlying passthrough primitives differ significantly per
//! platform: the sg driver's synchronous `SG_IO` ioctl on Linux and Android,
//! `IOCTL_SCSI_PASS_THROUGH_DIRECT` on Windows.
//!
//! CDBs and data buffers are opaque byte sequences here; this crate never
//! builds or validates command semantics, it only transports them and
//! classifies the layered completion status into one error.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use scsi_util::ScsiDevice;
//! use scsi_util::ScsiPassthrough;
//!
//! # fn main() -> scsi_util::Result<()> {
//! let mut device = ScsiDevice::open("/dev/sg0")?;
//! // INQUIRY, allocation length 96.
//! let inquiry = device.read(&[0x12, 0, 0, 0, 96, 0], 96, Duration::from_secs(5))?;
//! println!("vendor: {}", String::from_utf8_lossy(&inquiry[8..16]));
//! device.close()?;
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
mod device;
mod errno;
mod error;
mod fake;
mod status;
pub mod sys;

pub use descriptor::AsRawDescriptor;
pub use descriptor::FromRawDescriptor;
pub use descriptor::IntoRawDescriptor;
pub use descriptor::SafeDescriptor;
pub use device::ScsiPassthrough;
pub use device::Transfer;
pub use device::TransferDirection;
pub use errno::Error as SysError;
pub use error::Error;
pub use error::Result;
pub use fake::FakeCommand;
pub use fake::FakeScsiDevice;
pub use scsi_sys::SENSE_BUFFER_LENGTH;
pub use status::DriverStatus;
pub use status::HostStatus;
pub use status::ScsiStatus;
pub use status::StatusOutcome;
pub use status::DRIVER_STATUS_MASK;
pub use sys::RawDescriptor;
pub use sys::ScsiDevice;
