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

use super::cim::{AssocQuery, CimInstance, CimParams, CimPath, CIM_ERR_NOT_FOUND};
use super::data::{AccessGroup, InitiatorType};
use super::dmtf::{ID_TYPE_ISCSI, ID_TYPE_WWPN};
use super::error::*;
use super::identity::ResourceKind;
use super::masking::masking_of_cim_sys;
use super::misc::{
    cim_path_to_path_str, init_id_normalize, init_id_to_snia,
    path_str_to_cim_path,
};
use super::profile::{Profile, ProfileVersion};
use super::provider::{Expect, Provider, Service};

/// Properties of `CIM_StorageHardwareID` needed for access group.
pub(crate) const CIM_INIT_PROPS: [&str; 2] = ["StorageID", "IDType"];

/// Properties of `CIM_SCSIProtocolController` needed for access group.
/// `EMCAdapterRole` is EMC VNX only.
pub(crate) const CIM_SPC_PROPS: [&str; 5] = [
    "DeviceID",
    "ElementName",
    "StorageID",
    "EMCAdapterRole",
    "SystemName",
];

pub(crate) const CIM_INIT_MG_PROPS: [&str; 2] = ["ElementName", "InstanceID"];

// EMC exposes its front end ports as SPC as well, only the ones holding
// this role are masking views.
const EMC_ADAPTER_ROLE_MASKING: &str = "MASK_VIEW";

/// SNIA formatted initiator ID of a `CIM_StorageHardwareID`.
pub(crate) fn init_id_of_cim_init(
    provider: &Provider,
    cim_init: &CimInstance,
) -> Result<String> {
    provider.id_of(ResourceKind::Initiator, cim_init)
}

fn lsm_init_id_of_cim_init(
    provider: &Provider,
    cim_init: &CimInstance,
) -> Result<String> {
    let init_id = init_id_of_cim_init(provider, cim_init)?;
    Ok(match init_id_normalize(&init_id)? {
        Some((_, id)) => id,
        None => init_id,
    })
}

/// Initiator IDs and the overall initiator type of a list of
/// `CIM_StorageHardwareID`. Initiators other than WWPN and iSCSI are
/// skipped.
pub(crate) fn init_ids_and_type_of(
    provider: &Provider,
    cim_inits: &[CimInstance],
) -> Result<(Vec<String>, InitiatorType)> {
    let mut init_ids = Vec::new();
    let mut has_wwpn = false;
    let mut has_iscsi = false;
    for cim_init in cim_inits {
        match cim_init.u64_prop("IDType") {
            Some(ID_TYPE_WWPN) => has_wwpn = true,
            Some(ID_TYPE_ISCSI) => has_iscsi = true,
            _ => continue,
        }
        init_ids.push(lsm_init_id_of_cim_init(provider, cim_init)?);
    }
    let init_type = match (has_wwpn, has_iscsi) {
        (true, true) => InitiatorType::Mixed,
        (true, false) => InitiatorType::Wwpn,
        (false, true) => InitiatorType::IscsiIqn,
        (false, false) => InitiatorType::Unknown,
    };
    Ok((init_ids, init_type))
}

/// `CIM_StorageHardwareID` granted to a `CIM_SCSIProtocolController`.
///
/// Masking and Mapping 1.6 defines the direct `CIM_AssociatedPrivilege`,
/// older providers need the walk through `CIM_AuthorizedPrivilege`:
///
/// ```text
///     CIM_SCSIProtocolController
///             |  CIM_AuthorizedTarget
///             v
///     CIM_AuthorizedPrivilege
///             |  CIM_AuthorizedSubject
///             v
///     CIM_StorageHardwareID
/// ```
pub(crate) fn cim_inits_of_cim_spc_path(
    provider: &Provider,
    cim_spc_path: &CimPath,
) -> Result<Vec<CimInstance>> {
    let mut cim_inits = Vec::new();
    if provider.profile_check(
        Profile::MaskingAndMapping,
        ProfileVersion::V1_6,
        false,
    )? {
        match provider.conn().associators(
            cim_spc_path,
            &AssocQuery::new("CIM_AssociatedPrivilege")
                .result_class("CIM_StorageHardwareID"),
            Some(&CIM_INIT_PROPS),
        ) {
            Ok(i) => cim_inits = i,
            Err(ref e) if e.is_cim(&[CIM_ERR_NOT_FOUND]) => (),
            Err(e) => return Err(e.into()),
        }
    }

    if cim_inits.is_empty() {
        for cim_ap_path in provider.associator_names(
            cim_spc_path,
            &AssocQuery::new("CIM_AuthorizedTarget")
                .result_class("CIM_AuthorizedPrivilege"),
        )? {
            cim_inits.extend(provider.associators(
                &cim_ap_path,
                &AssocQuery::new("CIM_AuthorizedSubject")
                    .result_class("CIM_StorageHardwareID"),
                &CIM_INIT_PROPS,
            )?);
        }
    }
    Ok(cim_inits)
}

pub(crate) fn cim_spc_to_lsm_ag(
    provider: &Provider,
    cim_spc: &CimInstance,
    system_id: &str,
) -> Result<AccessGroup> {
    let ag_id = provider.id_of(ResourceKind::AccessGroupSpc, cim_spc)?;
    let name = cim_spc.str_prop("ElementName").unwrap_or("").to_string();
    let cim_inits = cim_inits_of_cim_spc_path(provider, &cim_spc.path)?;
    let (init_ids, init_type) = init_ids_and_type_of(provider, &cim_inits)?;
    Ok(AccessGroup::new(
        ag_id,
        name,
        init_ids,
        init_type,
        system_id.to_string(),
        Some(cim_path_to_path_str(&cim_spc.path)?),
    ))
}

/// Members of a `CIM_InitiatorMaskingGroup`.
pub(crate) fn cim_inits_of_cim_init_mg_path(
    provider: &Provider,
    cim_init_mg_path: &CimPath,
) -> Result<Vec<CimInstance>> {
    provider.associators(
        cim_init_mg_path,
        &AssocQuery::new("CIM_MemberOfCollection")
            .result_class("CIM_StorageHardwareID"),
        &CIM_INIT_PROPS,
    )
}

pub(crate) fn cim_init_mg_to_lsm_ag(
    provider: &Provider,
    cim_init_mg: &CimInstance,
    system_id: &str,
) -> Result<AccessGroup> {
    let ag_id = provider.id_of(ResourceKind::AccessGroupInitMg, cim_init_mg)?;
    let name = cim_init_mg
        .str_prop("ElementName")
        .unwrap_or("")
        .to_string();
    let cim_inits = cim_inits_of_cim_init_mg_path(provider, &cim_init_mg.path)?;
    let (init_ids, init_type) = init_ids_and_type_of(provider, &cim_inits)?;
    Ok(AccessGroup::new(
        ag_id,
        name,
        init_ids,
        init_type,
        system_id.to_string(),
        Some(cim_path_to_path_str(&cim_init_mg.path)?),
    ))
}

/// CIM path stored in the `plugin_data` of an access group: a
/// `CIM_SCSIProtocolController` or a `CIM_InitiatorMaskingGroup` depending
/// on the masking protocol which created it.
pub(crate) fn lsm_ag_to_cim_path(
    provider: &Provider,
    ag: &AccessGroup,
) -> Result<CimPath> {
    let plugin_data = ag.plugin_data().ok_or_else(|| {
        LsmError::PluginBug(
            "Got AccessGroup instance with empty plugin_data".to_string(),
        )
    })?;
    if !provider.cfg().system_allowed(&ag.system_id) {
        return Err(LsmError::NotFoundSystem(
            "System filtered in URI".to_string(),
        ));
    }
    path_str_to_cim_path(plugin_data)
}

/// Path of the `CIM_StorageHardwareID` holding `init_id`, created through
/// the hardware ID management service when missing.
pub(crate) fn cim_init_path_check_or_create(
    provider: &Provider,
    system_id: &str,
    init_id: &str,
    init_type: InitiatorType,
) -> Result<CimPath> {
    let snia_init_id = init_id_to_snia(init_id)?;
    for cim_init in provider.enumerate("CIM_StorageHardwareID", &CIM_INIT_PROPS)? {
        if init_id_to_snia(&init_id_of_cim_init(provider, &cim_init)?)?
            == snia_init_id
        {
            return Ok(cim_init.path);
        }
    }

    let dmtf_id_type = match init_type {
        InitiatorType::Wwpn => ID_TYPE_WWPN,
        InitiatorType::IscsiIqn => ID_TYPE_ISCSI,
        _ => {
            return Err(LsmError::PluginBug(format!(
                "cim_init_path_check_or_create(): Got invalid init_type: {}",
                init_type as i32
            )))
        }
    };
    let cim_hwms =
        provider.service(Service::HardwareIdManagement, system_id)?;
    let mut params = CimParams::new();
    params.insert("StorageID".to_string(), snia_init_id.into());
    params.insert("IDType".to_string(), (dmtf_id_type as u16).into());
    provider.invoke_method_wait_path(
        "CreateStorageHardwareID",
        &cim_hwms.path,
        &params,
        Expect::path("HardwareID", "CIM_StorageHardwareID"),
    )
}

/// Volumes masked to a `CIM_SCSIProtocolController`.
pub(crate) fn cim_vols_masked_to_cim_spc_path(
    provider: &Provider,
    cim_spc_path: &CimPath,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    provider.associators(
        cim_spc_path,
        &AssocQuery::new("CIM_ProtocolControllerForUnit")
            .result_class("CIM_StorageVolume"),
        props,
    )
}

fn has_masking_role(cim_spc: &CimInstance) -> bool {
    match cim_spc.str_prop("EMCAdapterRole") {
        Some(roles) => roles.split(' ').any(|r| r == EMC_ADAPTER_ROLE_MASKING),
        None => true,
    }
}

/// Every SPC of NetApp-E is an access group.
pub(crate) fn is_access_group(
    provider: &Provider,
    cim_spc: &CimInstance,
) -> bool {
    provider.is_netappe() || has_masking_role(cim_spc)
}

/// Access group capable `CIM_SCSIProtocolController` of a system:
///
/// ```text
///     CIM_ControllerConfigurationService
///             |  CIM_ConcreteDependency
///             v
///     CIM_SCSIProtocolController
/// ```
pub(crate) fn cim_spcs_of_sys_id(
    provider: &Provider,
    system_id: &str,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let cim_ccs = provider
        .find_service(Service::ControllerConfiguration, system_id)?
        .ok_or_else(|| {
            LsmError::NoSupport(
                "AccessGroup is not supported by this array".to_string(),
            )
        })?;
    Ok(provider
        .associators(
            &cim_ccs.path,
            &AssocQuery::new("CIM_ConcreteDependency")
                .result_class("CIM_SCSIProtocolController"),
            props,
        )?
        .into_iter()
        .filter(|s| is_access_group(provider, s))
        .collect())
}

/// `CIM_InitiatorMaskingGroup` of a system, found through
/// `CIM_ServiceAffectsElement` of its group masking and mapping service.
pub(crate) fn cim_init_mgs_of_sys_id(
    provider: &Provider,
    system_id: &str,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let cim_gmms =
        provider.service(Service::GroupMaskingMapping, system_id)?;
    provider.associators(
        &cim_gmms.path,
        &AssocQuery::new("CIM_ServiceAffectsElement")
            .result_class("CIM_InitiatorMaskingGroup"),
        props,
    )
}

pub(crate) fn access_groups(provider: &Provider) -> Result<Vec<AccessGroup>> {
    let mut rc = Vec::new();
    for cim_sys in provider.root_cim_syss(&[])? {
        let system_id = provider.id_of(ResourceKind::System, &cim_sys)?;
        let masking = masking_of_cim_sys(provider, &cim_sys)?;
        rc.extend(masking.access_groups_of_sys(provider, &system_id)?);
    }
    Ok(rc)
}
