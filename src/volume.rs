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

use std::thread::sleep;

use tracing::debug;

use super::cim::{AssocQuery, CimInstance, CimParams, CimPath, CimValue};
use super::data::{Pool, Volume, VolumeCreateArgThinP, VolumeReplicateType};
use super::dmtf::*;
use super::error::*;
use super::identity::ResourceKind;
use super::job::{Invoked, JobId, RetrieveKind};
use super::misc::{cim_path_to_path_str, path_str_to_cim_path, vpd83_verify};
use super::pool::{
    cim_pools_of_cim_sys_path, lsm_pool_to_cim_pool_path, pool_id_of_cim_vol,
    POOL_ID_PROPS,
};
use super::provider::{merge_props, Provider, Service};
use super::sys::sys_id_of_cim_dev;

pub(crate) const CIM_VOL_PROPS: [&str; 13] = [
    "ElementName",
    "NameFormat",
    "NameNamespace",
    "BlockSize",
    "NumberOfBlocks",
    "Name",
    "OtherIdentifyingInfo",
    "IdentifyingDescriptions",
    "Usage",
    "OtherNameFormat",
    "OtherNameNamespace",
    "SystemName",
    "DeviceID",
];

/// Volumes allocated from the pool, system reserved ones excluded.
pub(crate) fn cim_vols_of_cim_pool_path(
    provider: &Provider,
    cim_pool_path: &CimPath,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let props = merge_props(props, &["Usage"]);
    Ok(provider
        .associators(
            cim_pool_path,
            &AssocQuery::new("CIM_AllocatedFromStoragePool")
                .result_class("CIM_StorageVolume"),
            &props,
        )?
        .into_iter()
        .filter(|v| v.u64_prop("Usage") != Some(VOL_USAGE_SYS_RESERVED))
        .collect())
}

// NameFormat NAA(9) with NameNamespace VPD83Type3(2).
fn vpd83_in_cim_vol_name(cim_vol: &CimInstance) -> Option<String> {
    match (
        cim_vol.u64_prop("NameFormat"),
        cim_vol.u64_prop("NameNamespace"),
        cim_vol.str_prop("Name"),
    ) {
        (Some(VOL_NAME_FORMAT_NNA), Some(VOL_NAME_SPACE_VPD83_TYPE3), Some(n))
            if !n.is_empty() =>
        {
            Some(n.to_string())
        }
        _ => None,
    }
}

fn vpd83_in_cim_vol_otherinfo(cim_vol: &CimInstance) -> Option<String> {
    let id_des = cim_vol.str_list("IdentifyingDescriptions")?;
    let other_info = cim_vol.str_list("OtherIdentifyingInfo")?;
    id_des
        .iter()
        .zip(other_info.into_iter())
        .find(|(d, _)| d.as_str() == VOL_OTHER_INFO_NAA_VPD83_TYPE3H)
        .map(|(_, i)| i)
}

// NetApp stores it in OtherNameFormat and OtherNameNamespace.
fn vpd83_netapp(cim_vol: &CimInstance) -> Option<String> {
    if cim_vol.str_prop("OtherNameFormat") != Some("NAA")
        || cim_vol.str_prop("OtherNameNamespace") != Some("VPD83Type3")
    {
        return None;
    }
    match cim_vol.str_list("OtherIdentifyingInfo") {
        Some(mut info) if info.len() == 1 => info.pop(),
        _ => None,
    }
}

fn vpd83_of_cim_vol(cim_vol: &CimInstance) -> Result<String> {
    let vpd83 = vpd83_in_cim_vol_name(cim_vol)
        .or_else(|| vpd83_in_cim_vol_otherinfo(cim_vol))
        .or_else(|| vpd83_netapp(cim_vol));
    match vpd83 {
        Some(v) => {
            let v = v.to_lowercase();
            if vpd83_verify(&v)? {
                Ok(v)
            } else {
                Ok(String::new())
            }
        }
        None => Ok(String::new()),
    }
}

pub(crate) fn cim_vol_to_lsm_vol(
    provider: &Provider,
    cim_vol: &CimInstance,
    pool_id: &str,
    sys_id: &str,
) -> Result<Volume> {
    let vol_id = provider.id_of(ResourceKind::Volume, cim_vol)?;
    let name = match cim_vol.str_prop("ElementName") {
        Some(n) => n.to_string(),
        None => cim_vol.str_prop("DeviceID").unwrap_or("").to_string(),
    };
    let block_size = cim_vol
        .u64_prop("BlockSize")
        .ok_or_plugin_bug("Got CIM_StorageVolume with no BlockSize")?;
    let num_of_blocks = cim_vol
        .u64_prop("NumberOfBlocks")
        .ok_or_plugin_bug("Got CIM_StorageVolume with no NumberOfBlocks")?;

    Ok(Volume::new(
        vol_id,
        name,
        vpd83_of_cim_vol(cim_vol)?,
        block_size,
        num_of_blocks,
        sys_id.to_string(),
        pool_id.to_string(),
        Some(cim_path_to_path_str(&cim_vol.path)?),
    ))
}

pub(crate) fn lsm_vol_to_cim_vol_path(
    provider: &Provider,
    vol: &Volume,
) -> Result<CimPath> {
    let plugin_data = vol.plugin_data().ok_or_else(|| {
        LsmError::PluginBug(
            "Got Volume instance with empty plugin_data".to_string(),
        )
    })?;
    if !provider.cfg().system_allowed(&vol.system_id) {
        return Err(LsmError::NotFoundSystem(
            "System filtered in URI".to_string(),
        ));
    }
    path_str_to_cim_path(plugin_data)
}

pub(crate) fn volumes(provider: &Provider) -> Result<Vec<Volume>> {
    let mut rc = Vec::new();
    for cim_sys in provider.root_cim_syss(ResourceKind::System.key_props())? {
        let sys_id = provider.id_of(ResourceKind::System, &cim_sys)?;
        for cim_pool in
            cim_pools_of_cim_sys_path(provider, &cim_sys.path, &POOL_ID_PROPS)?
        {
            let pool_id = provider.id_of(ResourceKind::Pool, &cim_pool)?;
            for cim_vol in
                cim_vols_of_cim_pool_path(provider, &cim_pool.path, &CIM_VOL_PROPS)?
            {
                rc.push(cim_vol_to_lsm_vol(
                    provider, &cim_vol, &pool_id, &sys_id,
                )?);
            }
        }
    }
    Ok(rc)
}

/// Translate a volume found by path, resolving its pool.
pub(crate) fn lsm_vol_of_cim_vol_path(
    provider: &Provider,
    cim_vol_path: &CimPath,
) -> Result<Volume> {
    let cim_vol = provider.get_instance(cim_vol_path, &CIM_VOL_PROPS)?;
    let pool_id = pool_id_of_cim_vol(provider, &cim_vol.path)?;
    let sys_id = sys_id_of_cim_dev(&cim_vol)?;
    cim_vol_to_lsm_vol(provider, &cim_vol, &pool_id, &sys_id)
}

fn new_vol_from_out(provider: &Provider, out: &CimParams) -> Result<Volume> {
    let cim_vol_path = out
        .get("TheElement")
        .or_else(|| out.get("TargetElement"))
        .and_then(CimValue::as_path)
        .ok_or_else(|| {
            LsmError::PluginBug(format!(
                "Got no TheElement or TargetElement in output {:?}",
                out
            ))
        })?;
    lsm_vol_of_cim_vol_path(provider, cim_vol_path)
}

/// The volume a finished job produced, if any.
pub(crate) fn new_vol_from_cim_job(
    provider: &Provider,
    cim_job: &CimInstance,
) -> Result<Option<Volume>> {
    let query = AssocQuery::new("CIM_AffectedJobElement")
        .result_class("CIM_StorageVolume");
    // HP 3PAR returns nothing for copy jobs when a property list is given.
    let cim_vols = if cim_job.classname() == "TPD_ConcreteJob" {
        provider.conn().associators(&cim_job.path, &query, None)?
    } else {
        provider.associators(&cim_job.path, &query, &CIM_VOL_PROPS)?
    };
    match cim_vols.first() {
        Some(cim_vol) => {
            let pool_id = pool_id_of_cim_vol(provider, &cim_vol.path)?;
            let sys_id = sys_id_of_cim_dev(cim_vol)?;
            Ok(Some(cim_vol_to_lsm_vol(provider, cim_vol, &pool_id, &sys_id)?))
        }
        None => Ok(None),
    }
}

pub(crate) fn volume_name_exists(
    provider: &Provider,
    name: &str,
) -> Result<bool> {
    Ok(provider
        .enumerate("CIM_StorageVolume", &["ElementName"])?
        .iter()
        .any(|v| v.str_prop("ElementName") == Some(name)))
}

/// A failed volume creation is a name conflict when a volume of the
/// requested name exists.
pub(crate) fn volume_create_error_handler(
    provider: &Provider,
    name: &str,
    e: LsmError,
) -> LsmError {
    match volume_name_exists(provider, name) {
        Ok(true) => LsmError::NameConflict(format!(
            "Volume with name '{}' already exists!",
            name
        )),
        Ok(false) => e,
        Err(lookup_err) => {
            debug!("Volume name lookup failed: {}", lookup_err);
            e
        }
    }
}

fn dmtf_element_type_of(
    pool: &Pool,
    thinp: VolumeCreateArgThinP,
) -> Result<u16> {
    let full = pool.element_type & Pool::ELEMENT_TYPE_VOLUME_FULL != 0;
    let thin = pool.element_type & Pool::ELEMENT_TYPE_VOLUME_THIN != 0;
    match thinp {
        // Thick unless the pool can only create thin volumes.
        VolumeCreateArgThinP::Default if !full && thin => {
            Ok(ELEMENT_THIN_VOLUME)
        }
        VolumeCreateArgThinP::Default => Ok(ELEMENT_THICK_VOLUME),
        VolumeCreateArgThinP::Full if full => Ok(ELEMENT_THICK_VOLUME),
        VolumeCreateArgThinP::Thin if thin => Ok(ELEMENT_THIN_VOLUME),
        _ => Err(LsmError::NoSupport(
            "Pool not suitable for creating volume with requested \
             provisioning type"
                .to_string(),
        )),
    }
}

pub(crate) fn volume_create(
    provider: &Provider,
    pool: &Pool,
    name: &str,
    size_bytes: u64,
    thinp: VolumeCreateArgThinP,
) -> Result<Invoked<Volume>> {
    if pool.element_type & Pool::ELEMENT_TYPE_VOLUME == 0 {
        return Err(LsmError::NoSupport(
            "Pool not suitable for creating volumes".to_string(),
        ));
    }
    let element_type = dmtf_element_type_of(pool, thinp)?;
    let cim_scs =
        provider.service(Service::StorageConfiguration, &pool.system_id)?;
    let cim_pool_path = lsm_pool_to_cim_pool_path(provider, pool)?;

    let mut params = CimParams::new();
    params.insert("ElementName".to_string(), name.into());
    params.insert("ElementType".to_string(), element_type.into());
    params.insert("InPool".to_string(), cim_pool_path.into());
    params.insert("Size".to_string(), size_bytes.into());

    let handler = |p: &Provider, e: LsmError| {
        volume_create_error_handler(p, name, e)
    };
    provider
        .invoke_method(
            "CreateOrModifyElementFromStoragePool",
            &cim_scs.path,
            &params,
            RetrieveKind::Volume,
            Some(name),
            Some(&handler),
        )?
        .and_then(|out| new_vol_from_out(provider, &out))
}

pub(crate) fn volume_resize(
    provider: &Provider,
    vol: &Volume,
    new_size_bytes: u64,
) -> Result<Invoked<Volume>> {
    let cim_scs =
        provider.service(Service::StorageConfiguration, &vol.system_id)?;
    let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;

    let mut params = CimParams::new();
    params.insert("ElementType".to_string(), ELEMENT_THICK_VOLUME.into());
    params.insert("TheElement".to_string(), cim_vol_path.into());
    params.insert("Size".to_string(), new_size_bytes.into());

    provider
        .invoke_method(
            "CreateOrModifyElementFromStoragePool",
            &cim_scs.path,
            &params,
            RetrieveKind::Volume,
            None,
            None,
        )?
        .and_then(|out| new_vol_from_out(provider, &out))
}

fn same_vol_path(a: &CimPath, b: &CimPath) -> bool {
    ["DeviceID", "SystemName", "SystemCreationClassName"]
        .iter()
        .all(|k| a.keybindings.get(*k) == b.keybindings.get(*k))
}

fn modify_sync(
    provider: &Provider,
    vol: &Volume,
    sync: &CimInstance,
    operation: u16,
) -> Result<()> {
    let (method, cim_srv) = if provider.is_netappe() {
        (
            "ModifySynchronization",
            provider.service(Service::StorageConfiguration, &vol.system_id)?,
        )
    } else {
        match provider.find_service(Service::Replication, &vol.system_id)? {
            Some(s) => ("ModifyReplicaSynchronization", s),
            None => return Ok(()),
        }
    };
    let mut params = CimParams::new();
    params.insert("Operation".to_string(), operation.into());
    params.insert("Synchronization".to_string(), sync.path.clone().into());
    provider.invoke_method_wait(method, &cim_srv.path, &params)
}

fn involves_vol(sync: &CimInstance, cim_vol_path: &CimPath) -> bool {
    ["SyncedElement", "SystemElement"].iter().any(|k| {
        sync.path_prop(k)
            .map(|p| same_vol_path(p, cim_vol_path))
            .unwrap_or(false)
    })
}

/// Detach replication relationships of the volume.
///
/// Return false when the array already returned the volume to its pool
/// while breaking them.
fn deal_volume_associations(
    provider: &Provider,
    vol: &Volume,
    cim_vol_path: &CimPath,
) -> Result<bool> {
    let syncs = match provider.references(
        cim_vol_path,
        "CIM_StorageSynchronized",
        &["SyncedElement", "SystemElement", "SyncState", "CopyType"],
    ) {
        Ok(s) => s,
        Err(e) => {
            debug!("No CIM_StorageSynchronized for {}: {}", cim_vol_path, e);
            return Ok(true);
        }
    };

    if provider.is_netappe() {
        let mut detached = false;
        for sync in syncs.iter().filter(|s| involves_vol(s, cim_vol_path)) {
            modify_sync(provider, vol, sync, NETAPP_E_MODIFY_SYNC_OP_DETACH)?;
            detached = true;
        }
        return Ok(!detached);
    }

    let mut need_return = true;
    for sync in syncs.iter().filter(|s| involves_vol(s, cim_vol_path)) {
        match (sync.u64_prop("SyncState"), sync.u64_prop("CopyType")) {
            (Some(ST_SYNC_STATE_SYNCHRONIZED), Some(ST_SYNC_COPY_TYPE_UNSYNC_ASSOC)) => {
                modify_sync(provider, vol, sync, MODIFY_SYNC_OP_RETURN_TO_POOL)?;
                need_return = false;
            }
            (Some(ST_SYNC_STATE_SYNCHRONIZED), Some(_)) => {
                modify_sync(provider, vol, sync, MODIFY_SYNC_OP_DETACH)?;
            }
            _ => (),
        }
    }
    Ok(need_return)
}

/// Delete a volume. The caller must make sure it is not masked.
pub(crate) fn volume_delete(
    provider: &Provider,
    vol: &Volume,
) -> Result<Option<JobId>> {
    let cim_scs =
        provider.service(Service::StorageConfiguration, &vol.system_id)?;
    let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;

    let need_return = deal_volume_associations(provider, vol, &cim_vol_path)?;
    if need_return {
        let mut params = CimParams::new();
        params.insert("TheElement".to_string(), cim_vol_path.into());
        return Ok(provider
            .invoke_method(
                "ReturnToStoragePool",
                &cim_scs.path,
                &params,
                RetrieveKind::None,
                None,
                None,
            )?
            .job_id()
            .cloned());
    }

    if provider.is_netappe() {
        // Volume goes away along with its replication relationship.
        for _ in 0..provider.cfg().job_poll_max {
            if provider.get_instance(&cim_vol_path, &[]).is_err() {
                break;
            }
            sleep(provider.cfg().job_poll_interval);
        }
    }
    Ok(None)
}

// Pick the SyncType for CreateElementReplica from the replication types the
// service advertises.
fn sync_type_of_rep_type(
    provider: &Provider,
    cim_rs: &CimInstance,
    rep_type: VolumeReplicateType,
) -> Result<u16> {
    let rs_caps = provider.associators(
        &cim_rs.path,
        &AssocQuery::new("CIM_ElementCapabilities")
            .result_class("CIM_ReplicationServiceCapabilities"),
        &["SupportedReplicationTypes"],
    )?;
    let s_rt = rs_caps
        .first()
        .and_then(|c| c.u64_list("SupportedReplicationTypes"))
        .unwrap_or_default();
    let has_clone = s_rt.contains(&REPLICA_CAP_TYPE_SYNC_CLONE_LOCAL)
        || s_rt.contains(&REPLICA_CAP_TYPE_ASYNC_CLONE_LOCAL);
    let sync_type = match rep_type {
        VolumeReplicateType::Copy if has_clone => Some(SYNC_TYPE_CLONE),
        VolumeReplicateType::Clone if has_clone => Some(SYNC_TYPE_SNAPSHOT),
        VolumeReplicateType::MirrorAsync
            if s_rt.contains(&REPLICA_CAP_TYPE_ASYNC_MIRROR_LOCAL) =>
        {
            Some(SYNC_TYPE_MIRROR)
        }
        VolumeReplicateType::MirrorSync
            if s_rt.contains(&REPLICA_CAP_TYPE_SYNC_MIRROR_LOCAL) =>
        {
            Some(SYNC_TYPE_MIRROR)
        }
        _ => None,
    };
    sync_type.ok_or_else(|| {
        LsmError::NoSupport("Replication type not supported".to_string())
    })
}

pub(crate) fn volume_replicate(
    provider: &Provider,
    pool: Option<&Pool>,
    rep_type: VolumeReplicateType,
    src_vol: &Volume,
    name: &str,
) -> Result<Invoked<Volume>> {
    // Some providers allow duplicate ElementName.
    if volume_name_exists(provider, name)? {
        return Err(LsmError::NameConflict(format!(
            "Volume with name '{}' already exists!",
            name
        )));
    }

    let src_cim_vol_path = lsm_vol_to_cim_vol_path(provider, src_vol)?;
    let mut params = CimParams::new();
    params.insert("ElementName".to_string(), name.into());
    params.insert("SourceElement".to_string(), src_cim_vol_path.into());
    if let Some(pool) = pool {
        params.insert(
            "TargetPool".to_string(),
            lsm_pool_to_cim_pool_path(provider, pool)?.into(),
        );
    }

    let (method, cim_srv) = match provider
        .find_service(Service::Replication, &src_vol.system_id)?
    {
        Some(cim_rs) => {
            let sync_type = sync_type_of_rep_type(provider, &cim_rs, rep_type)?;
            params.insert("SyncType".to_string(), sync_type.into());
            params.insert("WaitForCopyState".to_string(), COPY_STATE_SYNC.into());
            ("CreateElementReplica", cim_rs)
        }
        None => {
            // Older providers replicate through the configuration service.
            let cim_scs = provider
                .find_service(Service::StorageConfiguration, &src_vol.system_id)?
                .ok_or_else(|| {
                    LsmError::NoSupport(
                        "volume-replicate not supported".to_string(),
                    )
                })?;
            let copy_type = match rep_type {
                VolumeReplicateType::Clone => ST_CONF_CAP_COPY_TYPE_UNSYNC_ASSOC,
                VolumeReplicateType::Copy => ST_CONF_CAP_COPY_TYPE_UNSYNC_UNASSOC,
                VolumeReplicateType::MirrorAsync => ST_CONF_CAP_COPY_TYPE_ASYNC,
                VolumeReplicateType::MirrorSync => ST_CONF_CAP_COPY_TYPE_SYNC,
            };
            params.insert("CopyType".to_string(), copy_type.into());
            ("CreateReplica", cim_scs)
        }
    };

    provider
        .invoke_method(
            method,
            &cim_srv.path,
            &params,
            RetrieveKind::Volume,
            None,
            None,
        )?
        .and_then(|out| new_vol_from_out(provider, &out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cim_vol() -> CimInstance {
        CimInstance::new(
            CimPath::new("CIM_StorageVolume")
                .with_key("SystemName", "SYS-1")
                .with_key("DeviceID", "0001"),
        ).with_prop("BlockSize", 512u64)
            .with_prop("NumberOfBlocks", 2048u64)
    }

    #[test]
    fn vpd83_from_name() {
        let v = cim_vol()
            .with_prop("NameFormat", VOL_NAME_FORMAT_NNA)
            .with_prop("NameNamespace", VOL_NAME_SPACE_VPD83_TYPE3)
            .with_prop("Name", "600A0B80006E6D7E0000C9B75200B3D0");
        assert_eq!(
            vpd83_of_cim_vol(&v).unwrap(),
            "600a0b80006e6d7e0000c9b75200b3d0"
        );
    }

    #[test]
    fn vpd83_from_other_info() {
        let v = cim_vol()
            .with_prop(
                "IdentifyingDescriptions",
                vec!["SNVM", VOL_OTHER_INFO_NAA_VPD83_TYPE3H],
            ).with_prop(
                "OtherIdentifyingInfo",
                vec!["foo", "60000970000192601874533030303341"],
            );
        assert_eq!(
            vpd83_of_cim_vol(&v).unwrap(),
            "60000970000192601874533030303341"
        );
    }

    #[test]
    fn vpd83_netapp_and_invalid() {
        let v = cim_vol()
            .with_prop("OtherNameFormat", "NAA")
            .with_prop("OtherNameNamespace", "VPD83Type3")
            .with_prop("OtherIdentifyingInfo", vec!["600A0B80006E6D7E"]);
        assert_eq!(vpd83_of_cim_vol(&v).unwrap(), "600a0b80006e6d7e");

        let v = cim_vol()
            .with_prop("NameFormat", VOL_NAME_FORMAT_NNA)
            .with_prop("NameNamespace", VOL_NAME_SPACE_VPD83_TYPE3)
            .with_prop("Name", "not-hex");
        assert_eq!(vpd83_of_cim_vol(&v).unwrap(), "");
    }

    #[test]
    fn thin_only_pool_defaults_to_thin() {
        let pool = Pool::new(
            "P1".to_string(),
            "pool".to_string(),
            Pool::ELEMENT_TYPE_VOLUME | Pool::ELEMENT_TYPE_VOLUME_THIN,
            0,
            100,
            100,
            Pool::STATUS_OK,
            String::new(),
            "SYS-1".to_string(),
            None,
        );
        assert_eq!(
            dmtf_element_type_of(&pool, VolumeCreateArgThinP::Default)
                .unwrap(),
            ELEMENT_THIN_VOLUME
        );
        assert!(
            dmtf_element_type_of(&pool, VolumeCreateArgThinP::Full).is_err()
        );
    }
}
