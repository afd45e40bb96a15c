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
use super::data::{Capabilities, Capability};
use super::dmtf::*;
use super::error::*;
use super::masking::{gmm_cap_of_cim_sys_path, mask_type_of_cim_sys, MaskType};
use super::profile::{Profile, ProfileVersion};
use super::provider::{Provider, Service};

const CIM_GMM_CAP_PROPS: [&str; 3] = [
    "SupportedAsynchronousActions",
    "SupportedSynchronousActions",
    "SupportedDeviceGroupFeatures",
];

pub(crate) fn fc_tgt_is_supported(provider: &Provider) -> Result<bool> {
    provider.profile_check(Profile::FcTargetPorts, ProfileVersion::V1_4, false)
}

pub(crate) fn iscsi_tgt_is_supported(provider: &Provider) -> Result<bool> {
    provider.profile_check(
        Profile::IscsiTargetPorts,
        ProfileVersion::V1_1,
        false,
    )
}

pub(crate) fn multi_sys_is_supported(provider: &Provider) -> Result<bool> {
    provider.profile_check(
        Profile::MultipleComputerSystem,
        ProfileVersion::V1_1,
        false,
    )
}

// Synchronous and asynchronous actions advertised by a capabilities
// instance.
pub(crate) fn supported_actions(cim_cap: &CimInstance) -> Vec<u64> {
    let mut rc = cim_cap
        .u64_list("SupportedSynchronousActions")
        .unwrap_or_default();
    rc.extend(
        cim_cap
            .u64_list("SupportedAsynchronousActions")
            .unwrap_or_default(),
    );
    rc
}

fn element_cap_of(
    provider: &Provider,
    path: &CimPath,
    cap_class: &str,
    props: &[&str],
) -> Result<Option<CimInstance>> {
    Ok(provider
        .associators(
            path,
            &AssocQuery::new("CIM_ElementCapabilities").result_class(cap_class),
            props,
        )?
        .into_iter()
        .next())
}

// Replication through CIM_ReplicationService, or through the older
// CreateReplica() of CIM_StorageConfigurationService.
fn rs_cap_set(
    provider: &Provider,
    system_id: &str,
    cap: &mut Capabilities,
) -> Result<()> {
    if let Some(cim_rs) = provider.find_service(Service::Replication, system_id)?
    {
        let rs_cap = match element_cap_of(
            provider,
            &cim_rs.path,
            "CIM_ReplicationServiceCapabilities",
            &[
                "SupportedReplicationTypes",
                "SupportedAsynchronousActions",
                "SupportedSynchronousActions",
            ],
        )? {
            Some(c) => c,
            None => return Ok(()),
        };
        if !supported_actions(&rs_cap).contains(&REPLICA_CAP_ACTION_CREATE_ELEMENT)
        {
            return Ok(());
        }
        cap.set(Capability::VolumeReplicate);
        let rep_types = rs_cap
            .u64_list("SupportedReplicationTypes")
            .unwrap_or_default();
        if rep_types.contains(&REPLICA_CAP_TYPE_SYNC_SNAPSHOT_LOCAL)
            || rep_types.contains(&REPLICA_CAP_TYPE_ASYNC_SNAPSHOT_LOCAL)
        {
            cap.set(Capability::VolumeReplicateClone);
        }
        if rep_types.contains(&REPLICA_CAP_TYPE_SYNC_CLONE_LOCAL)
            || rep_types.contains(&REPLICA_CAP_TYPE_ASYNC_CLONE_LOCAL)
        {
            cap.set(Capability::VolumeReplicateCopy);
        }
        return Ok(());
    }

    let cim_scs =
        match provider.find_service(Service::StorageConfiguration, system_id)? {
            Some(s) => s,
            None => return Ok(()),
        };
    let copy_types = element_cap_of(
        provider,
        &cim_scs.path,
        "CIM_StorageConfigurationCapabilities",
        &["SupportedCopyTypes"],
    )?
    .and_then(|c| c.u64_list("SupportedCopyTypes"))
    .unwrap_or_default();
    if !copy_types.is_empty() {
        cap.set(Capability::VolumeReplicate);
        if copy_types.contains(&u64::from(ST_CONF_CAP_COPY_TYPE_UNSYNC_ASSOC)) {
            cap.set(Capability::VolumeReplicateClone);
        }
        if copy_types.contains(&u64::from(ST_CONF_CAP_COPY_TYPE_UNSYNC_UNASSOC))
        {
            cap.set(Capability::VolumeReplicateCopy);
        }
    }
    Ok(())
}

// Volume listing and life cycle from the Block Services Package.
fn bsp_cap_set(
    provider: &Provider,
    system_id: &str,
    cap: &mut Capabilities,
) -> Result<()> {
    cap.set(Capability::PoolMemberInfo);
    let cim_scs =
        match provider.find_service(Service::StorageConfiguration, system_id)? {
            Some(s) => s,
            None => return Ok(()),
        };
    // Which functions of CreateOrModifyElementFromStoragePool() are
    // implemented is only told by the capabilities.
    let cim_scs_cap = match element_cap_of(
        provider,
        &cim_scs.path,
        "CIM_StorageConfigurationCapabilities",
        &[
            "SupportedAsynchronousActions",
            "SupportedSynchronousActions",
            "SupportedStorageElementTypes",
        ],
    )? {
        Some(c) => c,
        None => return Ok(()),
    };
    let element_types = cim_scs_cap
        .u64_list("SupportedStorageElementTypes")
        .unwrap_or_default();
    if element_types.contains(&SCS_CAP_SUP_ST_VOLUME)
        || element_types.contains(&SCS_CAP_SUP_THIN_ST_VOLUME)
    {
        cap.set(Capability::Volumes);
        if element_types.contains(&SCS_CAP_SUP_THIN_ST_VOLUME) {
            cap.set(Capability::VolumeThin);
        }
    }

    let actions = supported_actions(&cim_scs_cap);
    if actions.contains(&SCS_CAP_VOLUME_CREATE) {
        cap.set(Capability::VolumeCreate);
    }
    if actions.contains(&SCS_CAP_VOLUME_DELETE) {
        cap.set(Capability::VolumeDelete);
    }
    if actions.contains(&SCS_CAP_VOLUME_MODIFY) {
        cap.set(Capability::VolumeResize);
    }
    Ok(())
}

fn disk_cap_set(provider: &Provider, cap: &mut Capabilities) -> Result<()> {
    if provider.profile_check(
        Profile::DiskDriveLite,
        ProfileVersion::V1_4,
        false,
    )? {
        cap.set(Capability::Disks);
    }
    Ok(())
}

fn init_add_cap_set(
    provider: &Provider,
    cap: &mut Capabilities,
    with_create: bool,
) -> Result<()> {
    if fc_tgt_is_supported(provider)? {
        cap.set(Capability::AccessGroupInitAddWwpn);
        if with_create {
            cap.set(Capability::AccessGroupCreateWwpn);
        }
    }
    if iscsi_tgt_is_supported(provider)? {
        cap.set(Capability::AccessGroupInitAddIscsiIqn);
        if with_create {
            cap.set(Capability::AccessGroupCreateIscsiIqn);
        }
    }
    Ok(())
}

// Group Masking and Mapping 1.5+: AddMembers() and RemoveMembers() are
// mandatory, view and group deletion are optional.
fn group_mask_map_cap_set(
    provider: &Provider,
    cim_sys_path: &CimPath,
    cap: &mut Capabilities,
) -> Result<()> {
    cap.set(Capability::AccessGroups);
    cap.set(Capability::AgsGrantedToVol);
    cap.set(Capability::VolsMaskedToAg);
    cap.set(Capability::VolumeMask);
    cap.set(Capability::AccessGroupInitDel);
    init_add_cap_set(provider, cap, true)?;

    let cim_gmm_cap =
        match gmm_cap_of_cim_sys_path(provider, cim_sys_path, &CIM_GMM_CAP_PROPS)?
        {
            Some(c) => c,
            None => return Ok(()),
        };
    let actions = supported_actions(&cim_gmm_cap);
    let dev_features = cim_gmm_cap
        .u64_list("SupportedDeviceGroupFeatures")
        .unwrap_or_default();
    // Unmasking needs either an empty device group allowed in a view, or
    // DeleteMaskingView().
    if dev_features.contains(&GMM_CAP_DEV_MG_ALLOW_EMPTY_W_SPC)
        || actions.contains(&GMM_CAP_DELETE_SPC)
    {
        cap.set(Capability::VolumeUnmask);
    }
    if actions.contains(&GMM_CAP_DELETE_GROUP) {
        cap.set(Capability::AccessGroupDelete);
    }
    Ok(())
}

// Masking and Mapping 1.4 revision 6: ExposePaths() and HidePaths() are
// mandatory.
fn mask_map_cap_set(
    provider: &Provider,
    cim_sys_path: &CimPath,
    cap: &mut Capabilities,
) -> Result<()> {
    if !provider.profile_check(
        Profile::MaskingAndMapping,
        ProfileVersion::V1_4,
        false,
    )? {
        return Ok(());
    }
    cap.set(Capability::AccessGroups);
    cap.set(Capability::VolumeMask);
    cap.set(Capability::VolumeUnmask);
    cap.set(Capability::AgsGrantedToVol);
    cap.set(Capability::VolsMaskedToAg);
    if !provider.is_netappe() {
        cap.set(Capability::AccessGroupInitDel);
    }

    // EMC VNX requires WWNN for WWPN and cannot create iSCSI hardware IDs.
    if cim_sys_path.classname == "Clar_StorageSystem" {
        return Ok(());
    }
    init_add_cap_set(provider, cap, false)
}

fn tgt_cap_set(
    provider: &Provider,
    cim_sys_path: &CimPath,
    cap: &mut Capabilities,
) -> Result<()> {
    // MegaRAID exposes an empty list of CIM_FCPort.
    if cim_sys_path.classname == "LSIESG_MegaRAIDHBA" {
        return Ok(());
    }
    if fc_tgt_is_supported(provider)? || iscsi_tgt_is_supported(provider)? {
        cap.set(Capability::TargetPorts);
    }
    Ok(())
}

/// Capabilities of the system behind `cim_sys`.
pub(crate) fn capabilities(
    provider: &Provider,
    cim_sys: &CimInstance,
    system_id: &str,
) -> Result<Capabilities> {
    let mut cap = Capabilities::default();

    // The NetApp-E provider advertises more than actually works, only the
    // replication check is trusted.
    if provider.is_netappe() {
        rs_cap_set(provider, system_id, &mut cap)?;
        return Ok(cap);
    }

    bsp_cap_set(provider, system_id, &mut cap)?;
    disk_cap_set(provider, &mut cap)?;
    match mask_type_of_cim_sys(provider, cim_sys)? {
        Some(MaskType::Group) => {
            group_mask_map_cap_set(provider, &cim_sys.path, &mut cap)?
        }
        _ => mask_map_cap_set(provider, &cim_sys.path, &mut cap)?,
    }
    tgt_cap_set(provider, &cim_sys.path, &mut cap)?;
    rs_cap_set(provider, system_id, &mut cap)?;
    Ok(cap)
}
