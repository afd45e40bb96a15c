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

//! Volume masking and access group management.
//!
//! Two generations of SNIA profiles exist:
//!
//!  * Masking and Mapping: the access group is a
//!    `CIM_SCSIProtocolController`, volumes are granted through
//!    `ExposePaths()` and revoked through `HidePaths()` of the
//!    `CIM_ControllerConfigurationService`.
//!  * Group Masking and Mapping (1.5+): the access group is a
//!    `CIM_InitiatorMaskingGroup`. A masking view (also a
//!    `CIM_SCSIProtocolController`) joins it with a target masking group
//!    and a device masking group holding the volumes.
//!
//! The protocol is chosen per system on every call and never mixed within
//! one operation.

use tracing::{debug, warn};

use super::access_group::*;
use super::cap::{fc_tgt_is_supported, iscsi_tgt_is_supported, supported_actions};
use super::cim::{AssocQuery, CimInstance, CimParams, CimPath, CimValue};
use super::data::{AccessGroup, InitiatorType, System, Volume};
use super::dmtf::*;
use super::error::*;
use super::identity::ResourceKind;
use super::misc::{init_id_to_snia, verify_init_id_str};
use super::pool::pool_id_of_cim_vol;
use super::profile::{Profile, ProfileVersion};
use super::provider::{merge_props, Expect, Provider, Service};
use super::sys::sys_id_of_cim_dev;
use super::target_port::{cim_fc_tgts_of, cim_iscsi_pgs_of, cim_pep_path_of_fc_tgt};
use super::volume::{cim_vol_to_lsm_vol, lsm_vol_to_cim_vol_path, CIM_VOL_PROPS};

// EMC VNX/CX claims Group Masking and Mapping in its registered profiles
// but only implements Masking and Mapping.
const EMC_VNX_SYS_CLASS: &str = "Clar_StorageSystem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaskType {
    /// Masking and Mapping 1.4+.
    Legacy,
    /// Group Masking and Mapping 1.5+.
    Group,
}

/// Masking protocol advertised by the provider, `None` when masking is not
/// supported at all.
pub(crate) fn mask_type(provider: &Provider) -> Result<Option<MaskType>> {
    if provider.profile_check(
        Profile::GroupMaskingAndMapping,
        ProfileVersion::V1_5,
        false,
    )? {
        return Ok(Some(MaskType::Group));
    }
    if provider.profile_check(
        Profile::MaskingAndMapping,
        ProfileVersion::V1_4,
        false,
    )? {
        return Ok(Some(MaskType::Legacy));
    }
    Ok(None)
}

/// Like `mask_type()` with the vendor override of `cim_sys` applied.
pub(crate) fn mask_type_of_cim_sys(
    provider: &Provider,
    cim_sys: &CimInstance,
) -> Result<Option<MaskType>> {
    Ok(match mask_type(provider)? {
        Some(MaskType::Group) if cim_sys.classname() == EMC_VNX_SYS_CLASS => {
            Some(MaskType::Legacy)
        }
        mt => mt,
    })
}

fn no_mask_support() -> LsmError {
    LsmError::NoSupport(format!(
        "Target SMI-S provider does not support {} version {} or {} \
         version {}",
        Profile::MaskingAndMapping.name(),
        ProfileVersion::V1_4,
        Profile::GroupMaskingAndMapping.name(),
        ProfileVersion::V1_5
    ))
}

fn masking_of_type(mask_type: Option<MaskType>) -> Result<&'static dyn MaskingProtocol> {
    match mask_type {
        Some(MaskType::Group) => Ok(&GroupMasking),
        Some(MaskType::Legacy) => Ok(&LegacyMasking),
        None => Err(no_mask_support()),
    }
}

pub(crate) fn masking_of_cim_sys(
    provider: &Provider,
    cim_sys: &CimInstance,
) -> Result<&'static dyn MaskingProtocol> {
    masking_of_type(mask_type_of_cim_sys(provider, cim_sys)?)
}

pub(crate) fn masking_of_sys_id(
    provider: &Provider,
    system_id: &str,
) -> Result<&'static dyn MaskingProtocol> {
    match mask_type(provider)? {
        // Only the group protocol has a vendor override to check.
        Some(MaskType::Group) => {
            let cim_sys = provider.cim_sys_of_sys_id(system_id, &[])?;
            masking_of_cim_sys(provider, &cim_sys)
        }
        mt => masking_of_type(mt),
    }
}

/// `CIM_GroupMaskingMappingCapabilities` of a system.
pub(crate) fn gmm_cap_of_cim_sys_path(
    provider: &Provider,
    cim_sys_path: &CimPath,
    props: &[&str],
) -> Result<Option<CimInstance>> {
    Ok(provider
        .associators(
            cim_sys_path,
            &AssocQuery::new("CIM_ElementCapabilities")
                .result_class("CIM_GroupMaskingMappingCapabilities"),
            props,
        )?
        .into_iter()
        .next())
}

fn cim_init_matches(
    provider: &Provider,
    cim_init: &CimInstance,
    snia_init_id: &str,
) -> Result<bool> {
    Ok(init_id_to_snia(&init_id_of_cim_init(provider, cim_init)?)? == snia_init_id)
}

fn find_cim_init<'a>(
    provider: &Provider,
    cim_inits: &'a [CimInstance],
    snia_init_id: &str,
) -> Result<Option<&'a CimInstance>> {
    for cim_init in cim_inits {
        if cim_init_matches(provider, cim_init, snia_init_id)? {
            return Ok(Some(cim_init));
        }
    }
    Ok(None)
}

fn find_cim_vol(
    provider: &Provider,
    cim_vols: Vec<CimInstance>,
    vol_id: &str,
) -> Result<Option<CimInstance>> {
    for cim_vol in cim_vols {
        if provider.id_of(ResourceKind::Volume, &cim_vol)? == vol_id {
            return Ok(Some(cim_vol));
        }
    }
    Ok(None)
}

fn params(pairs: Vec<(&str, CimValue)>) -> CimParams {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// One masking protocol. All initiator IDs given are in SNIA format.
pub(crate) trait MaskingProtocol {
    fn access_groups_of_sys(
        &self,
        provider: &Provider,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>>;

    fn cim_vols_masked_to_ag(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        props: &[&str],
    ) -> Result<Vec<CimInstance>>;

    fn access_groups_granted_to_cim_vol(
        &self,
        provider: &Provider,
        cim_vol_path: &CimPath,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>>;

    fn volume_mask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()>;

    fn volume_unmask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()>;

    fn access_group_create(
        &self,
        provider: &Provider,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        cim_sys: &CimInstance,
        system_id: &str,
    ) -> Result<AccessGroup>;

    fn access_group_delete(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
    ) -> Result<()>;

    fn initiator_add(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup>;

    fn initiator_delete(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
    ) -> Result<AccessGroup>;
}

/// Masking and Mapping through `CIM_ControllerConfigurationService`.
pub(crate) struct LegacyMasking;

impl LegacyMasking {
    fn cim_vol_masked_to_spc(
        provider: &Provider,
        cim_spc_path: &CimPath,
        vol_id: &str,
        props: &[&str],
    ) -> Result<Option<CimInstance>> {
        let props = merge_props(props, ResourceKind::Volume.key_props());
        find_cim_vol(
            provider,
            cim_vols_masked_to_cim_spc_path(provider, cim_spc_path, &props)?,
            vol_id,
        )
    }

    fn ag_of_cim_spc_path(
        provider: &Provider,
        cim_spc_path: &CimPath,
        system_id: &str,
    ) -> Result<AccessGroup> {
        let cim_spc = provider.get_instance(cim_spc_path, &CIM_SPC_PROPS)?;
        cim_spc_to_lsm_ag(provider, &cim_spc, system_id)
    }
}

impl MaskingProtocol for LegacyMasking {
    fn access_groups_of_sys(
        &self,
        provider: &Provider,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>> {
        cim_spcs_of_sys_id(provider, system_id, &CIM_SPC_PROPS)?
            .iter()
            .map(|s| cim_spc_to_lsm_ag(provider, s, system_id))
            .collect()
    }

    fn cim_vols_masked_to_ag(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        let cim_spc_path = lsm_ag_to_cim_path(provider, ag)?;
        cim_vols_masked_to_cim_spc_path(provider, &cim_spc_path, props)
    }

    fn access_groups_granted_to_cim_vol(
        &self,
        provider: &Provider,
        cim_vol_path: &CimPath,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>> {
        provider
            .associators(
                cim_vol_path,
                &AssocQuery::new("CIM_ProtocolControllerForUnit")
                    .result_class("CIM_SCSIProtocolController"),
                &CIM_SPC_PROPS,
            )?
            .iter()
            .filter(|s| is_access_group(provider, s))
            .map(|s| cim_spc_to_lsm_ag(provider, s, system_id))
            .collect()
    }

    fn volume_mask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()> {
        let cim_spc_path = lsm_ag_to_cim_path(provider, ag)?;
        if cim_inits_of_cim_spc_path(provider, &cim_spc_path)?.is_empty() {
            return Err(LsmError::EmptyAccessGroup(format!(
                "Access group {} is empty(no member), will not do \
                 volume_mask()",
                ag.id
            )));
        }
        if LegacyMasking::cim_vol_masked_to_spc(
            provider,
            &cim_spc_path,
            &vol.id,
            &[],
        )?
        .is_some()
        {
            return Err(LsmError::NoStateChange(
                "Volume already masked to requested access group".to_string(),
            ));
        }

        let cim_ccs =
            provider.service(Service::ControllerConfiguration, &vol.system_id)?;
        let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;
        let cim_vol = provider.get_instance(&cim_vol_path, &["Name"])?;
        let lu_name = cim_vol
            .str_prop("Name")
            .ok_or_plugin_bug("Got CIM_StorageVolume with no Name")?;
        provider.invoke_method_wait(
            "ExposePaths",
            &cim_ccs.path,
            &params(vec![
                ("LUNames", vec![lu_name].into()),
                ("ProtocolControllers", vec![cim_spc_path].into()),
                ("DeviceAccesses", vec![CTRL_CONF_SRV_DA_RW].into()),
            ]),
        )
    }

    fn volume_unmask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()> {
        let cim_ccs =
            provider.service(Service::ControllerConfiguration, &vol.system_id)?;
        let cim_spc_path = lsm_ag_to_cim_path(provider, ag)?;
        let cim_vol = LegacyMasking::cim_vol_masked_to_spc(
            provider,
            &cim_spc_path,
            &vol.id,
            &["Name"],
        )?
        .ok_or_else(|| {
            LsmError::NoStateChange(
                "Volume is not masked to requested access group".to_string(),
            )
        })?;
        let lu_name = cim_vol
            .str_prop("Name")
            .ok_or_plugin_bug("Got CIM_StorageVolume with no Name")?;
        provider.invoke_method_wait(
            "HidePaths",
            &cim_ccs.path,
            &params(vec![
                ("LUNames", vec![lu_name].into()),
                ("ProtocolControllers", vec![cim_spc_path].into()),
            ]),
        )
    }

    fn access_group_create(
        &self,
        _provider: &Provider,
        _name: &str,
        _init_id: &str,
        _init_type: InitiatorType,
        _cim_sys: &CimInstance,
        _system_id: &str,
    ) -> Result<AccessGroup> {
        Err(LsmError::NoSupport(format!(
            "access_group_create() requires {} version {}",
            Profile::GroupMaskingAndMapping.name(),
            ProfileVersion::V1_5
        )))
    }

    fn access_group_delete(
        &self,
        _provider: &Provider,
        _ag: &AccessGroup,
    ) -> Result<()> {
        Err(LsmError::NoSupport(format!(
            "access_group_delete() requires {} version {}",
            Profile::GroupMaskingAndMapping.name(),
            ProfileVersion::V1_5
        )))
    }

    fn initiator_add(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        let cim_sys = provider.cim_sys_of_sys_id(&ag.system_id, &[])?;
        if cim_sys.classname() == EMC_VNX_SYS_CLASS {
            return Err(LsmError::NoSupport(
                "EMC VNX/CX require WWNN defined when adding new initiator \
                 which is not supported by LSM yet. Please do it via EMC \
                 vendor specific tools."
                    .to_string(),
            ));
        }

        let cim_spc_path = lsm_ag_to_cim_path(provider, ag)?;
        let cim_inits = cim_inits_of_cim_spc_path(provider, &cim_spc_path)?;
        if find_cim_init(provider, &cim_inits, init_id)?.is_some() {
            return Ok(ag.clone());
        }

        cim_init_path_check_or_create(
            provider,
            &ag.system_id,
            init_id,
            init_type,
        )?;
        let cim_ccs =
            provider.service(Service::ControllerConfiguration, &ag.system_id)?;
        let new_cim_spc_path = provider.invoke_method_wait_path(
            "ExposePaths",
            &cim_ccs.path,
            &params(vec![
                ("InitiatorPortIDs", vec![init_id].into()),
                ("ProtocolControllers", vec![cim_spc_path].into()),
            ]),
            Expect::first_of("ProtocolControllers", "CIM_SCSIProtocolController"),
        )?;
        LegacyMasking::ag_of_cim_spc_path(
            provider,
            &new_cim_spc_path,
            &ag.system_id,
        )
    }

    fn initiator_delete(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
    ) -> Result<AccessGroup> {
        let cim_spc_path = lsm_ag_to_cim_path(provider, ag)?;
        let cim_inits = cim_inits_of_cim_spc_path(provider, &cim_spc_path)?;
        if find_cim_init(provider, &cim_inits, init_id)?.is_none() {
            return Err(LsmError::NoStateChange(format!(
                "Initiator {} does not exist in defined access group {}",
                init_id, ag.id
            )));
        }
        if cim_inits.len() == 1 {
            return Err(LsmError::LastInitInAccessGroup(
                "Refuse to remove last initiator from access group"
                    .to_string(),
            ));
        }

        let cim_ccs =
            provider.service(Service::ControllerConfiguration, &ag.system_id)?;
        provider.invoke_method_wait(
            "HidePaths",
            &cim_ccs.path,
            &params(vec![
                ("InitiatorPortIDs", vec![init_id].into()),
                ("ProtocolControllers", vec![cim_spc_path.clone()].into()),
            ]),
        )?;
        LegacyMasking::ag_of_cim_spc_path(provider, &cim_spc_path, &ag.system_id)
    }
}

/// Group Masking and Mapping through `CIM_GroupMaskingMappingService`.
pub(crate) struct GroupMasking;

impl GroupMasking {
    fn cim_spcs_path_of_init_mg(
        provider: &Provider,
        cim_init_mg_path: &CimPath,
    ) -> Result<Vec<CimPath>> {
        provider.associator_names(
            cim_init_mg_path,
            &AssocQuery::new("CIM_AssociatedInitiatorMaskingGroup")
                .result_class("CIM_SCSIProtocolController"),
        )
    }

    // SNIA requires exactly one device masking group per masking view.
    fn cim_dev_mg_path_of_spc(
        provider: &Provider,
        cim_spc_path: &CimPath,
    ) -> Result<CimPath> {
        provider
            .associator_names(
                cim_spc_path,
                &AssocQuery::new("CIM_AssociatedDeviceMaskingGroup")
                    .result_class("CIM_DeviceMaskingGroup"),
            )?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LsmError::PluginBug(format!(
                    "No CIM_DeviceMaskingGroup associated to {}",
                    cim_spc_path
                ))
            })
    }

    fn ag_of_cim_init_mg_path(
        provider: &Provider,
        cim_init_mg_path: &CimPath,
        system_id: &str,
    ) -> Result<AccessGroup> {
        let cim_init_mg =
            provider.get_instance(cim_init_mg_path, &CIM_INIT_MG_PROPS)?;
        cim_init_mg_to_lsm_ag(provider, &cim_init_mg, system_id)
    }

    // A target masking group of the given name, reused when creation
    // failed because it already exists.
    fn exist_cim_tgt_mg(provider: &Provider, name: &str) -> Result<Option<CimPath>> {
        Ok(provider
            .enumerate("CIM_TargetMaskingGroup", &["ElementName"])?
            .into_iter()
            .find(|g| g.str_prop("ElementName") == Some(name))
            .map(|g| g.path))
    }

    // A device masking group of the given name, with the volume added when
    // not already in.
    fn exist_cim_dev_mg(
        provider: &Provider,
        name: &str,
        cim_gmms_path: &CimPath,
        cim_vol_path: &CimPath,
        vol_id: &str,
    ) -> Result<Option<CimPath>> {
        let cim_dev_mg = match provider
            .enumerate("CIM_DeviceMaskingGroup", &["ElementName"])?
            .into_iter()
            .find(|g| g.str_prop("ElementName") == Some(name))
        {
            Some(g) => g,
            None => return Ok(None),
        };
        let cim_vols = provider.associators(
            &cim_dev_mg.path,
            &AssocQuery::new("CIM_OrderedMemberOfCollection")
                .result_class("CIM_StorageVolume"),
            ResourceKind::Volume.key_props(),
        )?;
        if find_cim_vol(provider, cim_vols, vol_id)?.is_none() {
            provider.invoke_method_wait(
                "AddMembers",
                cim_gmms_path,
                &params(vec![
                    ("MaskingGroup", cim_dev_mg.path.clone().into()),
                    ("Members", vec![cim_vol_path.clone()].into()),
                ]),
            )?;
        }
        Ok(Some(cim_dev_mg.path))
    }

    // Target masking group holding every target port of the initiator
    // type.
    fn cim_tgt_mg_path_create(
        provider: &Provider,
        cim_sys_path: &CimPath,
        cim_gmms_path: &CimPath,
        name: &str,
        init_type: InitiatorType,
    ) -> Result<CimPath> {
        let members: Vec<CimPath> = match init_type {
            InitiatorType::Wwpn => {
                let mut peps = Vec::new();
                for cim_fc_tgt in cim_fc_tgts_of(provider, cim_sys_path, &[])? {
                    peps.push(cim_pep_path_of_fc_tgt(provider, &cim_fc_tgt.path)?);
                }
                peps
            }
            _ => cim_iscsi_pgs_of(provider, cim_sys_path, &[])?
                .into_iter()
                .map(|p| p.path)
                .collect(),
        };
        match provider.invoke_method_wait_path(
            "CreateGroup",
            cim_gmms_path,
            &params(vec![
                ("GroupName", name.into()),
                ("Type", MASK_GROUP_TYPE_TGT.into()),
                ("Members", members.into()),
            ]),
            Expect::path("MaskingGroup", "CIM_TargetMaskingGroup"),
        ) {
            Ok(p) => Ok(p),
            Err(e) => match GroupMasking::exist_cim_tgt_mg(provider, name)? {
                Some(p) => {
                    debug!("Reusing existing target masking group {}", p);
                    Ok(p)
                }
                None => Err(e),
            },
        }
    }

    fn cim_dev_mg_path_create(
        provider: &Provider,
        cim_gmms_path: &CimPath,
        name: &str,
        cim_vol_path: &CimPath,
        vol_id: &str,
    ) -> Result<CimPath> {
        match provider.invoke_method_wait_path(
            "CreateGroup",
            cim_gmms_path,
            &params(vec![
                ("GroupName", name.into()),
                ("Type", MASK_GROUP_TYPE_DEV.into()),
                ("Members", vec![cim_vol_path.clone()].into()),
            ]),
            Expect::path("MaskingGroup", "CIM_DeviceMaskingGroup"),
        ) {
            Ok(p) => Ok(p),
            Err(e) => match GroupMasking::exist_cim_dev_mg(
                provider,
                name,
                cim_gmms_path,
                cim_vol_path,
                vol_id,
            )? {
                Some(p) => {
                    debug!("Reusing existing device masking group {}", p);
                    Ok(p)
                }
                None => Err(e),
            },
        }
    }

    fn cim_spc_path_create(
        provider: &Provider,
        cim_gmms_path: &CimPath,
        cim_init_mg_path: &CimPath,
        cim_tgt_mg_path: CimPath,
        cim_dev_mg_path: CimPath,
        name: &str,
    ) -> Result<CimPath> {
        provider.invoke_method_wait_path(
            "CreateMaskingView",
            cim_gmms_path,
            &params(vec![
                ("ElementName", name.into()),
                ("InitiatorMaskingGroup", cim_init_mg_path.clone().into()),
                ("TargetMaskingGroup", cim_tgt_mg_path.into()),
                ("DeviceMaskingGroup", cim_dev_mg_path.into()),
            ]),
            Expect::path("ProtocolController", "CIM_SCSIProtocolController"),
        )
    }
}

impl MaskingProtocol for GroupMasking {
    fn access_groups_of_sys(
        &self,
        provider: &Provider,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>> {
        cim_init_mgs_of_sys_id(provider, system_id, &CIM_INIT_MG_PROPS)?
            .iter()
            .map(|g| cim_init_mg_to_lsm_ag(provider, g, system_id))
            .collect()
    }

    fn cim_vols_masked_to_ag(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        let mut rc = Vec::new();
        for cim_spc_path in
            GroupMasking::cim_spcs_path_of_init_mg(provider, &cim_init_mg_path)?
        {
            rc.extend(cim_vols_masked_to_cim_spc_path(
                provider,
                &cim_spc_path,
                props,
            )?);
        }
        Ok(rc)
    }

    fn access_groups_granted_to_cim_vol(
        &self,
        provider: &Provider,
        cim_vol_path: &CimPath,
        system_id: &str,
    ) -> Result<Vec<AccessGroup>> {
        let mut rc = Vec::new();
        for cim_spc_path in provider.associator_names(
            cim_vol_path,
            &AssocQuery::new("CIM_ProtocolControllerForUnit")
                .result_class("CIM_SCSIProtocolController"),
        )? {
            for cim_init_mg in provider.associators(
                &cim_spc_path,
                &AssocQuery::new("CIM_AssociatedInitiatorMaskingGroup")
                    .result_class("CIM_InitiatorMaskingGroup"),
                &CIM_INIT_MG_PROPS,
            )? {
                rc.push(cim_init_mg_to_lsm_ag(provider, &cim_init_mg, system_id)?);
            }
        }
        Ok(rc)
    }

    // Without a masking view yet, one is created with a target group of
    // all target ports and a device group holding the volume. Otherwise the
    // volume joins the device group of every existing view.
    fn volume_mask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()> {
        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        if cim_inits_of_cim_init_mg_path(provider, &cim_init_mg_path)?.is_empty()
        {
            return Err(LsmError::EmptyAccessGroup(format!(
                "Access group {} is empty(no member), will not do \
                 volume_mask()",
                ag.id
            )));
        }
        if ag.init_type != InitiatorType::Wwpn
            && ag.init_type != InitiatorType::IscsiIqn
        {
            return Err(LsmError::NoSupport(format!(
                "SMI-S plugin only support iSCSI and FC/FCoE access group \
                 volume masking, but got access group init_type: {}",
                ag.init_type as i32
            )));
        }

        let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;
        let cim_gmms =
            provider.service(Service::GroupMaskingMapping, &ag.system_id)?;
        let cim_spcs_path =
            GroupMasking::cim_spcs_path_of_init_mg(provider, &cim_init_mg_path)?;

        if cim_spcs_path.is_empty() {
            let cim_sys = provider.cim_sys_of_sys_id(&ag.system_id, &[])?;
            let cim_tgt_mg_path = GroupMasking::cim_tgt_mg_path_create(
                provider,
                &cim_sys.path,
                &cim_gmms.path,
                &ag.name,
                ag.init_type,
            )?;
            let cim_dev_mg_path = GroupMasking::cim_dev_mg_path_create(
                provider,
                &cim_gmms.path,
                &ag.name,
                &cim_vol_path,
                &vol.id,
            )?;
            GroupMasking::cim_spc_path_create(
                provider,
                &cim_gmms.path,
                &cim_init_mg_path,
                cim_tgt_mg_path,
                cim_dev_mg_path,
                &ag.name,
            )?;
            return Ok(());
        }

        for cim_spc_path in &cim_spcs_path {
            let cim_vols = cim_vols_masked_to_cim_spc_path(
                provider,
                cim_spc_path,
                ResourceKind::Volume.key_props(),
            )?;
            if find_cim_vol(provider, cim_vols, &vol.id)?.is_some() {
                return Err(LsmError::NoStateChange(
                    "Volume already masked to requested access group"
                        .to_string(),
                ));
            }
        }
        for cim_spc_path in &cim_spcs_path {
            let cim_dev_mg_path =
                GroupMasking::cim_dev_mg_path_of_spc(provider, cim_spc_path)?;
            provider.invoke_method_wait(
                "AddMembers",
                &cim_gmms.path,
                &params(vec![
                    ("MaskingGroup", cim_dev_mg_path.into()),
                    ("Members", vec![cim_vol_path.clone()].into()),
                ]),
            )?;
        }
        Ok(())
    }

    // RemoveMembers() against the device masking group of the view. When
    // the provider does not allow an empty device group in a view, the view
    // is deleted first if this is its last volume.
    fn volume_unmask(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        vol: &Volume,
    ) -> Result<()> {
        let cim_sys = provider.cim_sys_of_sys_id(&vol.system_id, &[])?;
        let cim_gmm_cap = gmm_cap_of_cim_sys_path(
            provider,
            &cim_sys.path,
            &[
                "SupportedDeviceGroupFeatures",
                "SupportedSynchronousActions",
                "SupportedAsynchronousActions",
            ],
        )?;
        let allow_empty_dev_mg = cim_gmm_cap
            .as_ref()
            .and_then(|c| c.u64_list("SupportedDeviceGroupFeatures"))
            .map(|f| f.contains(&GMM_CAP_DEV_MG_ALLOW_EMPTY_W_SPC))
            .unwrap_or(false);
        if !allow_empty_dev_mg
            && !cim_gmm_cap
                .as_ref()
                .map(|c| supported_actions(c).contains(&GMM_CAP_DELETE_SPC))
                .unwrap_or(false)
        {
            return Err(LsmError::NoSupport(
                "volume_unmask() not supported. It requires one of these: \
                 1. support of DeleteMaskingView(). 2. allowing empty \
                 DeviceMaskingGroup in SPC. But target SMI-S provider does \
                 not support any of these"
                    .to_string(),
            ));
        }

        let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;
        let vol_cim_spcs_path = provider.associator_names(
            &cim_vol_path,
            &AssocQuery::new("CIM_ProtocolControllerForUnit")
                .result_class("CIM_SCSIProtocolController"),
        )?;
        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        let ag_cim_spcs_path =
            GroupMasking::cim_spcs_path_of_init_mg(provider, &cim_init_mg_path)?;
        let cim_spc_path = ag_cim_spcs_path
            .into_iter()
            .find(|a| vol_cim_spcs_path.iter().any(|v| v.same_object(a)))
            .ok_or_else(|| {
                LsmError::NoStateChange(
                    "Volume is not masked to requested access group"
                        .to_string(),
                )
            })?;

        let cim_dev_mg_path =
            GroupMasking::cim_dev_mg_path_of_spc(provider, &cim_spc_path)?;
        let cim_gmms =
            provider.service(Service::GroupMaskingMapping, &vol.system_id)?;

        if !allow_empty_dev_mg {
            let cur_cim_vols_path = provider.associator_names(
                &cim_dev_mg_path,
                &AssocQuery::new("CIM_OrderedMemberOfCollection")
                    .result_class("CIM_StorageVolume"),
            )?;
            if cur_cim_vols_path.len() == 1 {
                debug!("Deleting masking view {} of last volume", cim_spc_path);
                provider.invoke_method_wait(
                    "DeleteMaskingView",
                    &cim_gmms.path,
                    &params(vec![("ProtocolController", cim_spc_path.into())]),
                )?;
            }
        }

        provider.invoke_method_wait(
            "RemoveMembers",
            &cim_gmms.path,
            &params(vec![
                ("MaskingGroup", cim_dev_mg_path.into()),
                ("Members", vec![cim_vol_path].into()),
            ]),
        )
    }

    fn access_group_create(
        &self,
        provider: &Provider,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        _cim_sys: &CimInstance,
        system_id: &str,
    ) -> Result<AccessGroup> {
        if init_type == InitiatorType::Wwpn && !fc_tgt_is_supported(provider)? {
            return Err(LsmError::NoSupport(
                "Target SMI-S provider does not support FC target port, \
                 which not allow creating WWPN access group"
                    .to_string(),
            ));
        }
        if init_type == InitiatorType::IscsiIqn
            && !iscsi_tgt_is_supported(provider)?
        {
            return Err(LsmError::NoSupport(
                "Target SMI-S provider does not support iSCSI target port, \
                 which not allow creating iSCSI IQN access group"
                    .to_string(),
            ));
        }

        let cim_init_path =
            cim_init_path_check_or_create(provider, system_id, init_id, init_type)?;
        let cim_gmms = provider.service(Service::GroupMaskingMapping, system_id)?;

        let cim_init_mg_path = match provider.invoke_method_wait_path(
            "CreateGroup",
            &cim_gmms.path,
            &params(vec![
                ("GroupName", name.into()),
                ("Members", vec![cim_init_path.clone()].into()),
                ("Type", MASK_GROUP_TYPE_INIT.into()),
            ]),
            Expect::path("MaskingGroup", "CIM_InitiatorMaskingGroup"),
        ) {
            Ok(p) => p,
            Err(e) => {
                // Find out why the provider refused.
                if !provider
                    .associator_names(
                        &cim_init_path,
                        &AssocQuery::new("CIM_MemberOfCollection")
                            .result_class("CIM_InitiatorMaskingGroup"),
                    )?
                    .is_empty()
                {
                    return Err(LsmError::ExistsInitiator(format!(
                        "Initiator {} already exist in other access group",
                        init_id
                    )));
                }
                if cim_init_mgs_of_sys_id(provider, system_id, &["ElementName"])?
                    .iter()
                    .any(|g| g.str_prop("ElementName") == Some(name))
                {
                    return Err(LsmError::NameConflict(format!(
                        "Requested name {} is used by another access group",
                        name
                    )));
                }
                return Err(e);
            }
        };
        GroupMasking::ag_of_cim_init_mg_path(provider, &cim_init_mg_path, system_id)
    }

    fn access_group_delete(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
    ) -> Result<()> {
        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        for cim_spc_path in
            GroupMasking::cim_spcs_path_of_init_mg(provider, &cim_init_mg_path)?
        {
            if !provider
                .associator_names(
                    &cim_spc_path,
                    &AssocQuery::new("CIM_ProtocolControllerForUnit")
                        .result_class("CIM_StorageVolume"),
                )?
                .is_empty()
            {
                return Err(LsmError::IsMasked(format!(
                    "Access Group {} has volume masked",
                    ag.id
                )));
            }
        }

        let cim_gmms =
            provider.service(Service::GroupMaskingMapping, &ag.system_id)?;
        provider.invoke_method_wait(
            "DeleteGroup",
            &cim_gmms.path,
            &params(vec![
                ("MaskingGroup", cim_init_mg_path.into()),
                ("Force", true.into()),
            ]),
        )
    }

    fn initiator_add(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        let cim_sys = provider.cim_sys_of_sys_id(&ag.system_id, &[])?;
        if cim_sys.classname() == EMC_VNX_SYS_CLASS {
            return Err(LsmError::NoSupport(
                "EMC VNX/CX require WWNN defined when adding a new initiator \
                 which is not supported by LSM yet. Please do it via EMC \
                 vendor specific tools."
                    .to_string(),
            ));
        }

        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        let cim_inits = cim_inits_of_cim_init_mg_path(provider, &cim_init_mg_path)?;
        if find_cim_init(provider, &cim_inits, init_id)?.is_some() {
            return Ok(ag.clone());
        }

        let cim_init_path = cim_init_path_check_or_create(
            provider,
            &ag.system_id,
            init_id,
            init_type,
        )?;
        let cim_gmms =
            provider.service(Service::GroupMaskingMapping, &ag.system_id)?;
        provider.invoke_method_wait(
            "AddMembers",
            &cim_gmms.path,
            &params(vec![
                ("MaskingGroup", cim_init_mg_path.clone().into()),
                ("Members", vec![cim_init_path].into()),
            ]),
        )?;
        GroupMasking::ag_of_cim_init_mg_path(
            provider,
            &cim_init_mg_path,
            &ag.system_id,
        )
    }

    fn initiator_delete(
        &self,
        provider: &Provider,
        ag: &AccessGroup,
        init_id: &str,
    ) -> Result<AccessGroup> {
        let cim_init_mg_path = lsm_ag_to_cim_path(provider, ag)?;
        let cim_inits = cim_inits_of_cim_init_mg_path(provider, &cim_init_mg_path)?;
        let cim_init = find_cim_init(provider, &cim_inits, init_id)?
            .ok_or_else(|| {
                LsmError::NoStateChange(format!(
                    "Initiator {} does not exist in defined access group {}",
                    init_id, ag.id
                ))
            })?;
        if cim_inits.len() == 1 {
            return Err(LsmError::LastInitInAccessGroup(
                "Refuse to remove last initiator from access group"
                    .to_string(),
            ));
        }

        let cim_gmms =
            provider.service(Service::GroupMaskingMapping, &ag.system_id)?;
        provider.invoke_method_wait(
            "RemoveMembers",
            &cim_gmms.path,
            &params(vec![
                ("MaskingGroup", cim_init_mg_path.clone().into()),
                ("Members", vec![cim_init.path.clone()].into()),
            ]),
        )?;
        GroupMasking::ag_of_cim_init_mg_path(
            provider,
            &cim_init_mg_path,
            &ag.system_id,
        )
    }
}

pub(crate) fn volume_mask(
    provider: &Provider,
    ag: &AccessGroup,
    vol: &Volume,
) -> Result<()> {
    masking_of_sys_id(provider, &vol.system_id)?.volume_mask(provider, ag, vol)
}

pub(crate) fn volume_unmask(
    provider: &Provider,
    ag: &AccessGroup,
    vol: &Volume,
) -> Result<()> {
    masking_of_sys_id(provider, &vol.system_id)?
        .volume_unmask(provider, ag, vol)
}

pub(crate) fn volumes_accessible_by_access_group(
    provider: &Provider,
    ag: &AccessGroup,
) -> Result<Vec<Volume>> {
    let masking = masking_of_sys_id(provider, &ag.system_id)?;
    let mut rc = Vec::new();
    for cim_vol in masking.cim_vols_masked_to_ag(provider, ag, &CIM_VOL_PROPS)? {
        let pool_id = pool_id_of_cim_vol(provider, &cim_vol.path)?;
        let sys_id = sys_id_of_cim_dev(&cim_vol)?;
        rc.push(cim_vol_to_lsm_vol(provider, &cim_vol, &pool_id, &sys_id)?);
    }
    Ok(rc)
}

pub(crate) fn access_groups_granted_to_volume(
    provider: &Provider,
    vol: &Volume,
) -> Result<Vec<AccessGroup>> {
    let masking = masking_of_sys_id(provider, &vol.system_id)?;
    let cim_vol_path = lsm_vol_to_cim_vol_path(provider, vol)?;
    masking.access_groups_granted_to_cim_vol(
        provider,
        &cim_vol_path,
        &vol.system_id,
    )
}

/// Whether `vol` is masked to any access group. Providers without masking
/// support have nothing masked.
pub(crate) fn volume_is_masked(provider: &Provider, vol: &Volume) -> Result<bool> {
    match access_groups_granted_to_volume(provider, vol) {
        Ok(ags) => Ok(!ags.is_empty()),
        Err(LsmError::NoSupport(msg)) => {
            debug!("Skip masking check of volume {}: {}", vol.id, msg);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn check_init_type(init_type: InitiatorType) -> Result<()> {
    match init_type {
        InitiatorType::Wwpn | InitiatorType::IscsiIqn => Ok(()),
        _ => Err(LsmError::NoSupport(
            "SMI-S plugin only support FC/FCoE WWPN and iSCSI IQN initiator"
                .to_string(),
        )),
    }
}

pub(crate) fn access_group_create(
    provider: &Provider,
    name: &str,
    init_id: &str,
    init_type: InitiatorType,
    system: &System,
) -> Result<AccessGroup> {
    check_init_type(init_type)?;
    verify_init_id_str(init_id, init_type)?;
    let init_id = init_id_to_snia(init_id)?;
    let cim_sys = provider.cim_sys_of_sys_id(&system.id, &[])?;
    masking_of_cim_sys(provider, &cim_sys)?.access_group_create(
        provider, name, &init_id, init_type, &cim_sys, &system.id,
    )
}

pub(crate) fn access_group_delete(
    provider: &Provider,
    ag: &AccessGroup,
) -> Result<()> {
    masking_of_sys_id(provider, &ag.system_id)?.access_group_delete(provider, ag)
}

pub(crate) fn access_group_initiator_add(
    provider: &Provider,
    ag: &AccessGroup,
    init_id: &str,
    init_type: InitiatorType,
) -> Result<AccessGroup> {
    check_init_type(init_type)?;
    verify_init_id_str(init_id, init_type)?;
    let init_id = init_id_to_snia(init_id)?;
    masking_of_sys_id(provider, &ag.system_id)?
        .initiator_add(provider, ag, &init_id, init_type)
}

pub(crate) fn access_group_initiator_delete(
    provider: &Provider,
    ag: &AccessGroup,
    init_id: &str,
) -> Result<AccessGroup> {
    // HidePaths() removes the whole SPC on NetApp-E.
    if provider.is_netappe() {
        return Err(LsmError::NoSupport(
            "SMI-S plugin does not support access_group_initiator_delete() \
             against NetApp-E"
                .to_string(),
        ));
    }
    let init_id = init_id_to_snia(init_id)?;
    let masking = masking_of_sys_id(provider, &ag.system_id)?;
    match masking.initiator_delete(provider, ag, &init_id) {
        Err(LsmError::LastInitInAccessGroup(msg)) => {
            warn!("Keeping initiator {} in access group {}", init_id, ag.id);
            Err(LsmError::LastInitInAccessGroup(msg))
        }
        r => r,
    }
}
