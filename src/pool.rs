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

use std::collections::VecDeque;

use super::cim::{AssocQuery, CimInstance, CimPath};
use super::data::{Pool, PoolMemberInfo, PoolMemberType, RaidType};
use super::dmtf::*;
use super::error::*;
use super::identity::ResourceKind;
use super::misc::{cim_path_to_path_str, path_str_to_cim_path};
use super::provider::{merge_props, Provider};
use super::raid::{merge_raid_types, raid_type_of_cim_ext, RAID_EXT_PROPS};

pub(crate) const POOL_ID_PROPS: [&str; 1] = ["InstanceID"];

pub(crate) const CIM_POOL_PROPS: [&str; 7] = [
    "InstanceID",
    "ElementName",
    "TotalManagedSpace",
    "RemainingManagedSpace",
    "Usage",
    "OperationalStatus",
    "Primordial",
];

const DISK_ID_PROPS: [&str; 2] = ["SystemName", "DeviceID"];

// IBM DS8000 array and array site pools only hold RAID and disk layout,
// no volume or pool could be allocated from them directly.
const IBM_HIDDEN_POOL_CLASSES: [&str; 2] =
    ["IBMTSDS_ArrayPool", "IBMTSDS_ArraySitePool"];

const POOL_OP_STATUS_CONV: [(u64, u64); 5] = [
    (OP_STATUS_OK, Pool::STATUS_OK),
    (OP_STATUS_ERROR, Pool::STATUS_ERROR),
    (OP_STATUS_DEGRADED, Pool::STATUS_OK | Pool::STATUS_DEGRADED),
    (OP_STATUS_NON_RECOVERABLE_ERROR, Pool::STATUS_ERROR),
    (OP_STATUS_SUPPORTING_ENTITY_IN_ERROR, Pool::STATUS_ERROR),
];

/// Non-primordial pools hosted by the system, spare pools excluded.
pub(crate) fn cim_pools_of_cim_sys_path(
    provider: &Provider,
    cim_sys_path: &CimPath,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let props = merge_props(props, &["Primordial", "Usage"]);
    let cim_pools = provider.associators(
        cim_sys_path,
        &AssocQuery::new("CIM_HostedStoragePool")
            .result_class("CIM_StoragePool"),
        &props,
    )?;
    Ok(cim_pools
        .into_iter()
        .filter(|p| p.bool_prop("Primordial") != Some(true))
        .filter(|p| p.u64_prop("Usage") != Some(POOL_USAGE_SPARE))
        .filter(|p| !IBM_HIDDEN_POOL_CLASSES.contains(&p.classname()))
        .collect())
}

/// Return `(element_type, unsupported_actions)` of the pool.
fn pool_element_type(
    provider: &Provider,
    cim_pool: &CimInstance,
) -> Result<(u64, u64)> {
    if provider.is_megaraid() {
        return Ok((
            Pool::ELEMENT_TYPE_VOLUME | Pool::ELEMENT_TYPE_VOLUME_FULL,
            0,
        ));
    }

    let mut element_type = 0;
    let mut unsupported = 0;

    let cim_sccs = provider.associators_optional(
        &cim_pool.path,
        &AssocQuery::new("CIM_ElementCapabilities")
            .result_class("CIM_StorageConfigurationCapabilities"),
        &[
            "SupportedStorageElementFeatures",
            "SupportedStorageElementTypes",
        ],
    )?;
    if cim_sccs.len() == 1 {
        let cim_scc = &cim_sccs[0];
        if let Some(features) =
            cim_scc.u64_list("SupportedStorageElementFeatures")
        {
            let types = cim_scc
                .u64_list("SupportedStorageElementTypes")
                .unwrap_or_default();
            if features.contains(&SUPPORT_VOL_CREATE) {
                element_type = Pool::ELEMENT_TYPE_VOLUME;
                if types.contains(&u64::from(ELEMENT_THIN_VOLUME)) {
                    element_type |= Pool::ELEMENT_TYPE_VOLUME_THIN;
                }
                if types.contains(&u64::from(ELEMENT_THICK_VOLUME)) {
                    element_type |= Pool::ELEMENT_TYPE_VOLUME_FULL;
                }
            }
            if !features.contains(&SUPPORT_ELEMENT_EXPAND) {
                unsupported |= Pool::UNSUPPORTED_VOLUME_GROW;
            }
            if !features.contains(&SUPPORT_ELEMENT_REDUCE) {
                unsupported |= Pool::UNSUPPORTED_VOLUME_SHRINK;
            }
        }
    } else {
        // Vendors without per pool capabilities.
        element_type = match cim_pool.classname() {
            "IBMTSDS_VirtualPool" | "IBMTSDS_ExtentPool" => {
                Pool::ELEMENT_TYPE_VOLUME
            }
            "IBMTSDS_RankPool" => Pool::ELEMENT_TYPE_POOL,
            "LSIESG_StoragePool" => Pool::ELEMENT_TYPE_VOLUME,
            _ => 0,
        };
    }

    if let Some(usage) = cim_pool.u64_prop("Usage") {
        if usage == POOL_USAGE_UNRESTRICTED {
            element_type |= Pool::ELEMENT_TYPE_VOLUME;
        }
        if usage == POOL_USAGE_RESERVED_FOR_SYSTEM || usage > POOL_USAGE_DELTA
        {
            element_type |= Pool::ELEMENT_TYPE_SYS_RESERVED;
        }
        if usage == POOL_USAGE_DELTA {
            element_type = Pool::ELEMENT_TYPE_DELTA;
        }
    }
    Ok((element_type, unsupported))
}

fn pool_status_of_cim_pool(cim_pool: &CimInstance) -> (u64, String) {
    match cim_pool.u64_list("OperationalStatus") {
        Some(op_status) => op_status_list_conv(
            &POOL_OP_STATUS_CONV,
            &op_status,
            Pool::STATUS_UNKNOWN,
            Pool::STATUS_OTHER,
        ),
        None => (Pool::STATUS_OK, String::new()),
    }
}

pub(crate) fn cim_pool_to_lsm_pool(
    provider: &Provider,
    cim_pool: &CimInstance,
    system_id: &str,
) -> Result<Pool> {
    let pool_id = provider.id_of(ResourceKind::Pool, cim_pool)?;
    let name = cim_pool.str_prop("ElementName").unwrap_or("").to_string();
    let total_space = cim_pool
        .u64_prop("TotalManagedSpace")
        .unwrap_or(Pool::SPACE_NOT_FOUND);
    let free_space = cim_pool
        .u64_prop("RemainingManagedSpace")
        .unwrap_or(Pool::SPACE_NOT_FOUND);
    let (status, status_info) = pool_status_of_cim_pool(cim_pool);
    let (element_type, unsupported) = pool_element_type(provider, cim_pool)?;

    Ok(Pool::new(
        pool_id,
        name,
        element_type,
        unsupported,
        total_space,
        free_space,
        status,
        status_info,
        system_id.to_string(),
        Some(cim_path_to_path_str(&cim_pool.path)?),
    ))
}

pub(crate) fn lsm_pool_to_cim_pool_path(
    provider: &Provider,
    pool: &Pool,
) -> Result<CimPath> {
    let plugin_data = pool.plugin_data().ok_or_else(|| {
        LsmError::PluginBug(
            "Got Pool instance with empty plugin_data".to_string(),
        )
    })?;
    if !provider.cfg().system_allowed(&pool.system_id) {
        return Err(LsmError::NotFoundSystem(
            "System filtered in URI".to_string(),
        ));
    }
    path_str_to_cim_path(plugin_data)
}

/// ID of the pool the volume is allocated from.
pub(crate) fn pool_id_of_cim_vol(
    provider: &Provider,
    cim_vol_path: &CimPath,
) -> Result<String> {
    let cim_pools = provider.associators(
        cim_vol_path,
        &AssocQuery::new("CIM_AllocatedFromStoragePool")
            .result_class("CIM_StoragePool"),
        &POOL_ID_PROPS,
    )?;
    if cim_pools.len() != 1 {
        return Err(LsmError::PluginBug(format!(
            "Got unexpected count({}) of CIM_StoragePool associated to \
             volume {}",
            cim_pools.len(),
            cim_vol_path
        )));
    }
    provider.id_of(ResourceKind::Pool, &cim_pools[0])
}

pub(crate) fn pools(provider: &Provider) -> Result<Vec<Pool>> {
    let mut rc = Vec::new();
    for cim_sys in provider.root_cim_syss(ResourceKind::System.key_props())? {
        let system_id = provider.id_of(ResourceKind::System, &cim_sys)?;
        for cim_pool in
            cim_pools_of_cim_sys_path(provider, &cim_sys.path, &CIM_POOL_PROPS)?
        {
            rc.push(cim_pool_to_lsm_pool(provider, &cim_pool, &system_id)?);
        }
    }
    Ok(rc)
}

/// RAID type and members of a pool.
///
/// Pools allocated from other non-primordial pools report those pools as
/// members. Otherwise the composite extents of the pool are walked down
/// through `CIM_BasedOn` until extents backed by disks are reached.
pub(crate) fn pool_member_info(
    provider: &Provider,
    pool: &Pool,
) -> Result<PoolMemberInfo> {
    let cim_pool_path = lsm_pool_to_cim_pool_path(provider, pool)?;

    let cim_exts = provider.associators_optional(
        &cim_pool_path,
        &AssocQuery::new("CIM_ConcreteComponent")
            .result_class("CIM_StorageExtent"),
        &RAID_EXT_PROPS,
    )?;
    let raid_type = merge_raid_types(cim_exts.iter().map(raid_type_of_cim_ext));

    let parent_pools = provider.associators(
        &cim_pool_path,
        &AssocQuery::new("CIM_AllocatedFromStoragePool")
            .result_class("CIM_StoragePool")
            .role("Dependent")
            .result_role("Antecedent"),
        &["InstanceID", "Primordial"],
    )?;
    let (primordial, concrete): (Vec<CimInstance>, Vec<CimInstance>) =
        parent_pools
            .into_iter()
            .partition(|p| p.bool_prop("Primordial") == Some(true));

    if !concrete.is_empty() {
        let mut member_ids = Vec::new();
        for cim_pool in &concrete {
            member_ids.push(provider.id_of(ResourceKind::Pool, cim_pool)?);
        }
        return Ok(PoolMemberInfo {
            raid_type,
            member_type: PoolMemberType::Pool,
            member_ids,
        });
    }

    let mut start: Vec<CimPath> =
        cim_exts.into_iter().map(|e| e.path).collect();
    if start.is_empty() {
        for cim_pool in &primordial {
            start.extend(provider.associator_names(
                &cim_pool.path,
                &AssocQuery::new("CIM_ConcreteComponent")
                    .result_class("CIM_StorageExtent"),
            )?);
        }
    }
    let member_ids = disk_ids_under_cim_exts(provider, start)?;
    let member_type = if member_ids.is_empty() {
        PoolMemberType::Unknown
    } else {
        PoolMemberType::Disk
    };
    Ok(PoolMemberInfo {
        raid_type: if member_ids.is_empty() {
            RaidType::Unknown
        } else {
            raid_type
        },
        member_type,
        member_ids,
    })
}

// Breadth first walk over `CIM_BasedOn`, extents are visited once.
fn disk_ids_under_cim_exts(
    provider: &Provider,
    start: Vec<CimPath>,
) -> Result<Vec<String>> {
    let mut visited: Vec<CimPath> = Vec::new();
    let mut queue: VecDeque<CimPath> = start.into_iter().collect();
    let mut disk_ids: Vec<String> = Vec::new();

    while let Some(ext_path) = queue.pop_front() {
        if visited.iter().any(|v| v.same_object(&ext_path)) {
            continue;
        }
        visited.push(ext_path.clone());

        let cim_disks = provider.associators(
            &ext_path,
            &AssocQuery::new("CIM_MediaPresent").result_class("CIM_DiskDrive"),
            &DISK_ID_PROPS,
        )?;
        if !cim_disks.is_empty() {
            for cim_disk in &cim_disks {
                let disk_id = provider.id_of(ResourceKind::Disk, cim_disk)?;
                if !disk_ids.contains(&disk_id) {
                    disk_ids.push(disk_id);
                }
            }
            continue;
        }
        queue.extend(provider.associator_names(
            &ext_path,
            &AssocQuery::new("CIM_BasedOn")
                .result_class("CIM_StorageExtent")
                .role("Dependent")
                .result_role("Antecedent"),
        )?);
    }
    Ok(disk_ids)
}
