// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.
//
// Author: Gris Ge <fge@redhat.com>

use super::cim::{AssocQuery, CimInstance, CimPath};
use super::data::{Disk, DiskType};
use super::dmtf::*;
use super::error::*;
use super::identity::ResourceKind;
use super::profile::{Profile, ProfileVersion};
use super::provider::Provider;
use super::sys::sys_id_of_cim_dev;

/// `Type` and `MediaType` are only provided by MegaRAID, `EMCInUse` only by
/// EMC.
pub(crate) const CIM_DISK_PROPS: [&str; 10] = [
    "OperationalStatus",
    "Name",
    "SystemName",
    "Caption",
    "InterconnectType",
    "DiskType",
    "DeviceID",
    "Type",
    "MediaType",
    "EMCInUse",
];

const DISK_OP_STATUS_CONV: [(u64, u64); 8] = [
    (OP_STATUS_UNKNOWN, Disk::STATUS_UNKNOWN),
    (OP_STATUS_OK, Disk::STATUS_OK),
    (OP_STATUS_PREDICTIVE_FAILURE, Disk::STATUS_PREDICTIVE_FAILURE),
    (OP_STATUS_ERROR, Disk::STATUS_ERROR),
    (OP_STATUS_NON_RECOVERABLE_ERROR, Disk::STATUS_ERROR),
    (OP_STATUS_STARTING, Disk::STATUS_STARTING),
    (OP_STATUS_STOPPING, Disk::STATUS_STOPPING),
    (OP_STATUS_STOPPED, Disk::STATUS_STOPPED),
];

// LSIESG_DiskDrive values.
const MEGARAID_MEDIA_TYPE_SSD: u64 = 1;
const MEGARAID_MEDIA_TYPE_SSD_FLASH: u64 = 2;
const MEGARAID_TYPE_SCSI: u64 = 1;
const MEGARAID_TYPE_SAS: u64 = 2;
const MEGARAID_TYPE_SATA: u64 = 3;
const MEGARAID_TYPE_FC: u64 = 4;

fn disk_status_of_cim_disk(cim_disk: &CimInstance) -> u64 {
    match cim_disk.u64_list("OperationalStatus") {
        Some(op_status) => {
            op_status_list_conv(
                &DISK_OP_STATUS_CONV,
                &op_status,
                Disk::STATUS_UNKNOWN,
                Disk::STATUS_OTHER,
            ).0
        }
        None => Disk::STATUS_UNKNOWN,
    }
}

fn disk_type_megaraid(cim_disk: &CimInstance) -> DiskType {
    match cim_disk.u64_prop("MediaType") {
        Some(MEGARAID_MEDIA_TYPE_SSD) | Some(MEGARAID_MEDIA_TYPE_SSD_FLASH) => {
            return DiskType::Ssd
        }
        _ => (),
    }
    match cim_disk.u64_prop("Type") {
        Some(MEGARAID_TYPE_SCSI) => DiskType::Scsi,
        Some(MEGARAID_TYPE_SAS) => DiskType::Sas,
        Some(MEGARAID_TYPE_SATA) => DiskType::Sata,
        Some(MEGARAID_TYPE_FC) => DiskType::Fc,
        _ => DiskType::Unknown,
    }
}

fn dmtf_disk_type_to_lsm(dmtf_disk_type: u64) -> DiskType {
    match dmtf_disk_type {
        DISK_TYPE_OTHER => DiskType::Other,
        DISK_TYPE_HDD => DiskType::Hdd,
        DISK_TYPE_SSD => DiskType::Ssd,
        DISK_TYPE_HYBRID => DiskType::Hybrid,
        DISK_TYPE_UNKNOWN => DiskType::Unknown,
        _ => DiskType::Unknown,
    }
}

// DMTF 2.31 InterconnectType shares values with DiskType. EMC VNX reports
// NL_SAS disks through Caption.
fn disk_type_generic(cim_disk: &CimInstance) -> DiskType {
    let mut disk_type = DiskType::Unknown;
    if let Some(it) = cim_disk.u64_prop("InterconnectType") {
        disk_type = DiskType::from(it as i32);
        if cim_disk.str_prop("Caption") == Some("NL_SAS") {
            disk_type = DiskType::NlSas;
        }
    }
    if disk_type == DiskType::Unknown {
        if let Some(t) = cim_disk.u64_prop("DiskType") {
            disk_type = dmtf_disk_type_to_lsm(t);
        }
    }
    disk_type
}

/// The single primordial `CIM_StorageExtent` holding the disk size.
fn pri_cim_ext_of_cim_disk(
    provider: &Provider,
    cim_disk_path: &CimPath,
) -> Result<CimInstance> {
    let mut cim_exts: Vec<CimInstance> = provider
        .associators(
            cim_disk_path,
            &AssocQuery::new("CIM_MediaPresent")
                .result_class("CIM_StorageExtent"),
            &["Primordial", "BlockSize", "NumberOfBlocks"],
        )?
        .into_iter()
        .filter(|e| e.bool_prop("Primordial") == Some(true))
        .collect();
    if cim_exts.len() == 1 {
        return cim_exts.pop().ok_or_plugin_bug("no primordial extent");
    }
    Err(LsmError::PluginBug(format!(
        "Got unexpected count({}) of primordial CIM_StorageExtent for \
         CIM_DiskDrive {}",
        cim_exts.len(),
        cim_disk_path
    )))
}

pub(crate) fn cim_disk_to_lsm_disk(
    provider: &Provider,
    cim_disk: &CimInstance,
) -> Result<Disk> {
    let cim_ext = pri_cim_ext_of_cim_disk(provider, &cim_disk.path)?;

    let mut status = disk_status_of_cim_disk(cim_disk);
    if provider.profile_check(
        Profile::DiskSparing,
        ProfileVersion::V1_4,
        false,
    )? {
        let cim_srss = provider.associator_names(
            &cim_ext.path,
            &AssocQuery::new("CIM_IsSpare")
                .result_class("CIM_StorageRedundancySet"),
        )?;
        if !cim_srss.is_empty() {
            status |= Disk::STATUS_SPARE_DISK;
        }
    }
    if cim_disk.bool_prop("EMCInUse") == Some(false) {
        status |= Disk::STATUS_FREE;
    }

    let disk_type = if provider.is_megaraid() {
        disk_type_megaraid(cim_disk)
    } else {
        disk_type_generic(cim_disk)
    };

    Ok(Disk::new(
        provider.id_of(ResourceKind::Disk, cim_disk)?,
        cim_disk.str_prop("Name").unwrap_or("").to_string(),
        disk_type,
        cim_ext
            .u64_prop("BlockSize")
            .unwrap_or(Disk::BLOCK_SIZE_NOT_FOUND),
        cim_ext
            .u64_prop("NumberOfBlocks")
            .unwrap_or(Disk::BLOCK_COUNT_NOT_FOUND),
        status,
        sys_id_of_cim_dev(cim_disk)?,
    ))
}

/// Disks of all systems. Disks of sub-systems are included as
/// `CIM_DiskDrive` is enumerated directly.
pub(crate) fn disks(provider: &Provider) -> Result<Vec<Disk>> {
    provider.profile_check(
        Profile::DiskDriveLite,
        ProfileVersion::V1_4,
        true,
    )?;
    let mut rc = Vec::new();
    for cim_disk in provider.enumerate("CIM_DiskDrive", &CIM_DISK_PROPS)? {
        let sys_id = sys_id_of_cim_dev(&cim_disk)?;
        if !provider.cfg().system_allowed(&sys_id) {
            continue;
        }
        rc.push(cim_disk_to_lsm_disk(provider, &cim_disk)?);
    }
    Ok(rc)
}
