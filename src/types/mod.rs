// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Management cluster resources read by the operator.

pub mod cluster;
pub mod vmi;

pub use cluster::Cluster;
pub use vmi::VirtualMachineInstance;
