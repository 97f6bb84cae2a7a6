// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Raw definitions for the host SCSI passthrough interfaces.
//!
//! On Linux and Android this mirrors the v3 interface of `<scsi/sg.h>`; on
//! Windows it mirrors the pass-through structures of `<ntddscsi.h>`. Layouts
//! are spelled out field by field with `#[repr(C)]` and checked by tests;
//! nothing here relies on implicit field ordering.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

#[cfg(any(target_os = "android", target_os = "linux"))]
pub mod sg;
#[cfg(any(target_os = "android", target_os = "linux"))]
pub use sg::*;

#[cfg(windows)]
pub mod spt;
#[cfg(windows)]
pub use spt::*;

/// Fixed capacity of the per-command sense region, in bytes. Both backends
/// hand the driver a sense buffer of exactly this size on every command.
pub const SENSE_BUFFER_LENGTH: usize = 32;
