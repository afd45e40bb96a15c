/*
 * Copyright (C) 2017 Red Hat, Inc.
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; If not, see <http://www.gnu.org/licenses/>.
 *
 * Author: Gris Ge <fge@redhat.com>
 */

//! A single system array with one pool, two volumes and one front end FC
//! port, masked through either Masking and Mapping or Group Masking and
//! Mapping. Vendor flavors rename the system class or serve the objects
//! from a vendor namespace.

use lsm_smis::{CimInstance, CimParams, CimPath, CimResult, CimValue};

use super::{
    invalid, out, param_bool, param_path, param_paths, param_str, param_strs,
    param_u64, MockState, MockWbem, INTEROP_NS, NS,
};

pub const SYS_ID: &str = "SYS-1";
pub const POOL_ID: &str = "POOL-1";
pub const POOL_TOTAL: u64 = 1 << 40;
pub const POOL_FREE: u64 = 1 << 39;
pub const VOL_BLOCKS: u64 = 2048;
/// Initiators of the "host1" access group.
pub const INIT_A: &str = "10:00:00:00:c9:a1:b2:c3";
pub const INIT_B: &str = "10:00:00:00:c9:a1:b2:c4";
/// Known to the array but in no access group.
pub const INIT_FREE: &str = "10:00:00:00:c9:a1:b2:c5";
/// Unknown to the array.
pub const INIT_NEW: &str = "10:00:00:00:c9:a1:b2:c6";
pub const FC_WWPN: &str = "50:0a:09:86:99:4b:8d:c5";
pub const NETAPP_E_NS: &str = "root/LsiArray13";
pub const MEGARAID_NS: &str = "root/LsiMr13";
pub const CLAR_SYS_CLASS: &str = "Clar_StorageSystem";
pub const MEGARAID_SYS_CLASS: &str = "LSIESG_MegaRAIDHBA";
/// Access group without the masking role, only listed on NetApp-E.
pub const FRONT_END_SPC: &str = "front-end";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flavor {
    /// Masking and Mapping 1.4, replicas through CreateReplica().
    Legacy,
    /// Group Masking and Mapping 1.5 and a replication service.
    Group,
    /// Same objects as `Legacy` without any registered profile.
    Unregistered,
    /// EMC VNX: registers Group Masking and Mapping 1.5 but only answers
    /// ExposePaths() and HidePaths().
    Clar,
    /// NetApp E-Series: registry of 1.2 era profiles, objects in
    /// `NETAPP_E_NS` and a replication service.
    NetAppE,
    /// LSI MegaRAID: no registry, no masking, objects in `MEGARAID_NS`.
    MegaRaid,
}

impl Flavor {
    fn sys_class(self) -> &'static str {
        match self {
            Flavor::Clar => CLAR_SYS_CLASS,
            Flavor::MegaRaid => MEGARAID_SYS_CLASS,
            _ => "CIM_ComputerSystem",
        }
    }
}

pub fn snia(init_id: &str) -> String {
    init_id.replace(':', "").to_uppercase()
}

/// VPD 0x83 of the volume with the given serial, as reported by the
/// engine.
pub fn vpd83(serial: u32) -> String {
    format!("600a0b80005ad1d70000{:012x}", serial)
}

fn obj(class: &str, keys: &[(&str, &str)]) -> CimInstance {
    let path = keys
        .iter()
        .fold(CimPath::new(class).with_namespace(NS), |p, (k, v)| {
            p.with_key(k, *v)
        });
    CimInstance::new(path)
}

fn device(class: &str, dev_id: &str) -> CimInstance {
    obj(
        class,
        &[
            ("CreationClassName", class),
            ("DeviceID", dev_id),
            ("SystemCreationClassName", "CIM_ComputerSystem"),
            ("SystemName", SYS_ID),
        ],
    )
}

fn service(class: &str) -> CimInstance {
    let name = format!("{}:{}", class, SYS_ID);
    obj(
        class,
        &[
            ("CreationClassName", class),
            ("Name", name.as_str()),
            ("SystemCreationClassName", "CIM_ComputerSystem"),
            ("SystemName", SYS_ID),
        ],
    )
}

fn vol_instance(serial: u32, name: &str, blocks: u64) -> CimInstance {
    device("CIM_StorageVolume", &format!("VOL-{:04}", serial))
        .with_prop("ElementName", name)
        .with_prop("BlockSize", 512u64)
        .with_prop("NumberOfBlocks", blocks)
        .with_prop("Name", format!("600A0B80005AD1D70000{:012X}", serial))
        .with_prop("NameFormat", 9u64)
        .with_prop("NameNamespace", 2u64)
        .with_prop("OperationalStatus", vec![2u64])
}

fn spc_instance(dev_id: &str, name: &str) -> CimInstance {
    device("CIM_SCSIProtocolController", dev_id).with_prop("ElementName", name)
}

fn hwid(st: &mut MockState, init_id: &str) -> CimPath {
    let storage_id = snia(init_id);
    let id_type = if storage_id.starts_with("iqn") { 5u64 } else { 2u64 };
    st.add(
        obj(
            "CIM_StorageHardwareID",
            &[("InstanceID", format!("HWID-{}", storage_id).as_str())],
        ).with_prop("StorageID", storage_id.as_str())
            .with_prop("IDType", id_type),
    )
}

// Masking and Mapping grants an initiator through a privilege instance.
fn grant(st: &mut MockState, cim_spc: &CimPath, cim_init: &CimPath) {
    let id = st.next_id("PRIV");
    let privilege =
        st.add(obj("CIM_AuthorizedPrivilege", &[("InstanceID", id.as_str())]));
    st.link_roles(
        "CIM_AuthorizedTarget",
        &privilege,
        "Privilege",
        cim_spc,
        "TargetElement",
    );
    st.link_roles(
        "CIM_AuthorizedSubject",
        &privilege,
        "Privilege",
        cim_init,
        "PrivilegedElement",
    );
}

fn member(st: &mut MockState, assoc: &str, group: &CimPath, m: &CimPath) {
    st.link_roles(assoc, group, "Collection", m, "Member");
}

fn register(st: &mut MockState, cim_sys: &CimPath, profiles: &[(&str, &str)]) {
    let base = [("Array", "1.4"), ("Block Services", "1.4")];
    for (name, ver) in base.iter().chain(profiles.iter()) {
        let id = st.next_id("RP");
        let rp = st.add(
            CimInstance::new(
                CimPath::new("CIM_RegisteredProfile")
                    .with_namespace(INTEROP_NS)
                    .with_key("InstanceID", id),
            ).with_prop("RegisteredName", *name)
                .with_prop("RegisteredVersion", *ver)
                .with_prop("RegisteredOrganization", 11u64),
        );
        if *name == "Array" {
            st.link_roles(
                "CIM_ElementConformsToProfile",
                &rp,
                "ConformantStandard",
                cim_sys,
                "ManagedElement",
            );
        }
    }
    // DMTF profile of the same name.
    st.add(
        CimInstance::new(
            CimPath::new("CIM_RegisteredProfile")
                .with_namespace(INTEROP_NS)
                .with_key("InstanceID", "RP-DMTF"),
        ).with_prop("RegisteredName", "Array")
            .with_prop("RegisteredVersion", "1.1")
            .with_prop("RegisteredOrganization", 2u64),
    );
}

fn block_services(st: &mut MockState, cim_sys: &CimPath, flavor: Flavor) {
    let scs = st.add(service("CIM_StorageConfigurationService"));
    st.link("CIM_HostedService", cim_sys, &scs);
    let mut scs_cap = obj(
        "CIM_StorageConfigurationCapabilities",
        &[("InstanceID", "SCS-CAP")],
    ).with_prop("SupportedStorageElementTypes", vec![2u64])
        .with_prop("SupportedSynchronousActions", vec![5u64, 6u64])
        .with_prop("SupportedAsynchronousActions", vec![5u64]);
    if flavor == Flavor::Legacy {
        // Unsynchronized associated and unassociated copies.
        scs_cap = scs_cap.with_prop("SupportedCopyTypes", vec![4u64, 5u64]);
    }
    let scs_cap = st.add(scs_cap);
    st.link_roles(
        "CIM_ElementCapabilities",
        &scs,
        "ManagedElement",
        &scs_cap,
        "Capabilities",
    );
    let hwms = st.add(service("CIM_StorageHardwareIDManagementService"));
    st.link("CIM_HostedService", cim_sys, &hwms);

    let primordial = st.add(
        obj("CIM_StoragePool", &[("InstanceID", "POOL-PRIMORDIAL")])
            .with_prop("ElementName", "Primordial")
            .with_prop("Primordial", true),
    );
    let spare = st.add(
        obj("CIM_StoragePool", &[("InstanceID", "POOL-SPARE")])
            .with_prop("ElementName", "Spare")
            .with_prop("Primordial", false)
            .with_prop("Usage", 8u64),
    );
    let pool = st.add(
        obj("CIM_StoragePool", &[("InstanceID", POOL_ID)])
            .with_prop("ElementName", "Pool 1")
            .with_prop("TotalManagedSpace", POOL_TOTAL)
            .with_prop("RemainingManagedSpace", POOL_FREE)
            .with_prop("Usage", 2u64)
            .with_prop("Primordial", false)
            .with_prop("OperationalStatus", vec![2u64]),
    );
    for p in &[&primordial, &spare, &pool] {
        st.link_roles(
            "CIM_HostedStoragePool",
            cim_sys,
            "GroupComponent",
            p,
            "PartComponent",
        );
    }
    st.link("CIM_AllocatedFromStoragePool", &primordial, &pool);
    let pool_cap = st.add(
        obj("CIM_StorageConfigurationCapabilities", &[("InstanceID", "POOL-CAP")])
            .with_prop("SupportedStorageElementFeatures", vec![3u64, 12u64])
            .with_prop("SupportedStorageElementTypes", vec![2u64]),
    );
    st.link_roles(
        "CIM_ElementCapabilities",
        &pool,
        "ManagedElement",
        &pool_cap,
        "Capabilities",
    );

    // Two disks behind the primordial pool.
    let ext = st.add(
        device("CIM_StorageExtent", "EXT-0")
            .with_prop("Primordial", true)
            .with_prop("BlockSize", 512u64)
            .with_prop("NumberOfBlocks", 1u64 << 31),
    );
    st.link_roles(
        "CIM_ConcreteComponent",
        &primordial,
        "GroupComponent",
        &ext,
        "PartComponent",
    );
    // MediaType and Type only mean something to MegaRAID: a flash SSD
    // and a SAS HDD.
    for (dev_id, media_type, disk_type) in
        [("DISK-0", 2u64, 3u64), ("DISK-1", 0u64, 2u64)].iter()
    {
        let disk = st.add(
            device("CIM_DiskDrive", dev_id)
                .with_prop("MediaType", *media_type)
                .with_prop("Type", *disk_type),
        );
        st.link("CIM_MediaPresent", &disk, &ext);
    }

    for (serial, name) in [(1u32, "vol-a"), (2u32, "vol-b")].iter() {
        let vol = st.add(vol_instance(*serial, name, VOL_BLOCKS));
        st.link("CIM_AllocatedFromStoragePool", &pool, &vol);
    }
    // Reserved for the array itself, never listed.
    let sys_vol = st.add(vol_instance(3, "vol-sys", VOL_BLOCKS).with_prop("Usage", 3u64));
    st.link("CIM_AllocatedFromStoragePool", &pool, &sys_vol);
}

fn target_ports(st: &mut MockState, cim_sys: &CimPath) {
    let fc = st.add(
        device("CIM_FCPort", "FC-0")
            .with_prop("ElementName", "FC Port 0")
            .with_prop("UsageRestriction", 2u64)
            .with_prop("PermanentAddress", "500A0986994B8DC5"),
    );
    // Back end only.
    let fc_be = st.add(
        device("CIM_FCPort", "FC-1")
            .with_prop("ElementName", "FC Port 1")
            .with_prop("UsageRestriction", 3u64)
            .with_prop("PermanentAddress", "500A0986994B8DC6"),
    );
    for p in &[&fc, &fc_be] {
        st.link_roles(
            "CIM_SystemDevice",
            cim_sys,
            "GroupComponent",
            p,
            "PartComponent",
        );
    }
    let pep = st.add(obj(
        "CIM_SCSIProtocolEndpoint",
        &[
            ("CreationClassName", "CIM_SCSIProtocolEndpoint"),
            ("Name", "PEP-0"),
            ("SystemCreationClassName", "CIM_ComputerSystem"),
            ("SystemName", SYS_ID),
        ],
    ));
    st.link("CIM_DeviceSAPImplementation", &fc, &pep);
}

fn legacy_masking(st: &mut MockState, cim_sys: &CimPath) {
    let ccs = st.add(service("CIM_ControllerConfigurationService"));
    st.link("CIM_HostedService", cim_sys, &ccs);
    let init_a = hwid(st, INIT_A);
    let init_b = hwid(st, INIT_B);
    hwid(st, INIT_FREE);

    let host1 = st.add(spc_instance("SPC-HOST1", "host1"));
    grant(st, &host1, &init_a);
    grant(st, &host1, &init_b);
    let empty = st.add(spc_instance("SPC-EMPTY", "empty"));
    for spc in &[&host1, &empty] {
        st.link("CIM_ConcreteDependency", &ccs, spc);
    }
    let vol_b = st
        .find_by("CIM_StorageVolume", "ElementName", "vol-b")
        .expect("vol-b");
    st.link("CIM_ProtocolControllerForUnit", &host1, &vol_b);
}

// Front end SPC, EMC marks the ones usable for masking with MASK_VIEW.
fn front_end_spc(st: &mut MockState) {
    let ccs = st
        .find_by(
            "CIM_ControllerConfigurationService",
            "SystemName",
            SYS_ID,
        )
        .expect("CIM_ControllerConfigurationService");
    let spc = st.add(
        spc_instance("SPC-FE", FRONT_END_SPC).with_prop("EMCAdapterRole", "FA"),
    );
    st.link("CIM_ConcreteDependency", &ccs, &spc);
}

fn replication(st: &mut MockState, cim_sys: &CimPath) {
    let rs = st.add(service("CIM_ReplicationService"));
    st.link("CIM_HostedService", cim_sys, &rs);
    // Local snapshot and clone, CreateElementReplica() only.
    let rs_cap = st.add(
        obj("CIM_ReplicationServiceCapabilities", &[("InstanceID", "RS-CAP")])
            .with_prop("SupportedReplicationTypes", vec![6u64, 10u64])
            .with_prop("SupportedSynchronousActions", vec![2u64]),
    );
    st.link_roles(
        "CIM_ElementCapabilities",
        &rs,
        "ManagedElement",
        &rs_cap,
        "Capabilities",
    );
}

fn init_mg(st: &mut MockState, gmms: &CimPath, name: &str) -> CimPath {
    let id = st.next_id("IMG");
    let g = st.add(
        obj("CIM_InitiatorMaskingGroup", &[("InstanceID", id.as_str())])
            .with_prop("ElementName", name),
    );
    st.link_roles(
        "CIM_ServiceAffectsElement",
        gmms,
        "AffectingElement",
        &g,
        "AffectedElement",
    );
    g
}

fn group_masking(st: &mut MockState, cim_sys: &CimPath) {
    let gmms = st.add(service("CIM_GroupMaskingMappingService"));
    st.link("CIM_HostedService", cim_sys, &gmms);
    // No empty device group in a view, DeleteMaskingView() and
    // DeleteGroup() are there.
    let gmm_cap = st.add(
        obj("CIM_GroupMaskingMappingCapabilities", &[("InstanceID", "GMM-CAP")])
            .with_prop("SupportedDeviceGroupFeatures", Vec::<u64>::new())
            .with_prop("SupportedSynchronousActions", vec![20u64, 24u64]),
    );
    st.link_roles(
        "CIM_ElementCapabilities",
        cim_sys,
        "ManagedElement",
        &gmm_cap,
        "Capabilities",
    );
    let init_a = hwid(st, INIT_A);
    let init_b = hwid(st, INIT_B);
    hwid(st, INIT_FREE);

    let host1 = init_mg(st, &gmms, "host1");
    member(st, "CIM_MemberOfCollection", &host1, &init_a);
    member(st, "CIM_MemberOfCollection", &host1, &init_b);
    init_mg(st, &gmms, "empty");
}

/// Build the array and the provider methods it answers.
pub fn array(flavor: Flavor) -> MockWbem {
    let mock = MockWbem::new(&[INTEROP_NS, NS]);
    match flavor {
        Flavor::NetAppE => mock.alias_namespace(NETAPP_E_NS, NS),
        Flavor::MegaRaid => mock.alias_namespace(MEGARAID_NS, NS),
        _ => (),
    }
    {
        let mut guard = mock.state_mut();
        let st = &mut *guard;
        st.inherit("CIM_OrderedMemberOfCollection", "CIM_MemberOfCollection");
        st.inherit(CLAR_SYS_CLASS, "CIM_ComputerSystem");
        st.inherit(MEGARAID_SYS_CLASS, "CIM_ComputerSystem");
        let sys_class = flavor.sys_class();
        let cim_sys = st.add(
            obj(sys_class, &[("CreationClassName", sys_class), ("Name", SYS_ID)])
                .with_prop("ElementName", "Mock Array")
                .with_prop("OperationalStatus", vec![2u64]),
        );
        match flavor {
            Flavor::Legacy => register(
                st,
                &cim_sys,
                &[("Masking and Mapping", "1.4"), ("FC Target Port", "1.4")],
            ),
            Flavor::Group | Flavor::Clar => register(
                st,
                &cim_sys,
                &[
                    ("Group Masking and Mapping", "1.5"),
                    ("Masking and Mapping", "1.5"),
                    ("FC Target Ports", "1.4"),
                    ("iSCSI Target Ports", "1.1"),
                ],
            ),
            // Masking and target port profiles are declared in versions
            // older than 1.4 which define none of them.
            Flavor::NetAppE => register(
                st,
                &cim_sys,
                &[("Masking and Mapping", "1.2"), ("FC Target Ports", "1.2")],
            ),
            Flavor::Unregistered | Flavor::MegaRaid => (),
        }
        block_services(st, &cim_sys, flavor);
        target_ports(st, &cim_sys);
        match flavor {
            Flavor::Group => group_masking(st, &cim_sys),
            Flavor::MegaRaid => (),
            Flavor::Clar | Flavor::NetAppE => {
                legacy_masking(st, &cim_sys);
                front_end_spc(st);
            }
            Flavor::Legacy | Flavor::Unregistered => {
                legacy_masking(st, &cim_sys)
            }
        }
        if flavor == Flavor::Group || flavor == Flavor::NetAppE {
            replication(st, &cim_sys);
        }
    }

    mock.handle("CreateStorageHardwareID", create_hardware_id);
    mock.handle(
        "CreateOrModifyElementFromStoragePool",
        create_or_modify_element,
    );
    mock.handle("ReturnToStoragePool", return_to_storage_pool);
    mock.handle("CreateReplica", create_replica);
    mock.handle("CreateElementReplica", create_element_replica);
    mock.handle("ModifySynchronization", modify_synchronization);
    match flavor {
        Flavor::MegaRaid => (),
        Flavor::Group => {
            mock.handle("CreateGroup", create_group);
            mock.handle("AddMembers", add_members);
            mock.handle("RemoveMembers", remove_members);
            mock.handle("CreateMaskingView", create_masking_view);
            mock.handle("DeleteMaskingView", delete_masking_view);
            mock.handle("DeleteGroup", delete_group);
        }
        _ => {
            mock.handle("ExposePaths", expose_paths);
            mock.handle("HidePaths", hide_paths);
        }
    }
    mock
}

fn failed() -> CimResult<(u32, CimParams)> {
    Ok((4, CimParams::new()))
}

fn create_hardware_id(
    st: &mut MockState,
    _srv: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let storage_id = param_str(params, "StorageID")?;
    let id_type = param_u64(params, "IDType")?;
    if st
        .find_by("CIM_StorageHardwareID", "StorageID", &storage_id)
        .is_some()
    {
        return failed();
    }
    let path = st.add(
        obj(
            "CIM_StorageHardwareID",
            &[("InstanceID", format!("HWID-{}", storage_id).as_str())],
        ).with_prop("StorageID", storage_id.as_str())
            .with_prop("IDType", id_type),
    );
    Ok((0, out(vec![("HardwareID", path.into())])))
}

fn create_or_modify_element(
    st: &mut MockState,
    _srv: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let size = param_u64(params, "Size")?;
    if let Some(CimValue::Path(cim_vol_path)) = params.get("TheElement") {
        if st.find(cim_vol_path).is_none() {
            return failed();
        }
        st.set_prop(cim_vol_path, "NumberOfBlocks", size / 512);
        return Ok((0, out(vec![("TheElement", cim_vol_path.clone().into())])));
    }

    let name = param_str(params, "ElementName")?;
    if st.find_by("CIM_StorageVolume", "ElementName", &name).is_some() {
        return failed();
    }
    let cim_pool_path = param_path(params, "InPool")?;
    let serial = 100 + st.next_num();
    let cim_vol_path = st.add(vol_instance(serial, &name, size / 512));
    st.link("CIM_AllocatedFromStoragePool", &cim_pool_path, &cim_vol_path);
    if !st.async_jobs {
        return Ok((0, out(vec![("TheElement", cim_vol_path.into())])));
    }

    let id = st.next_id("JOB");
    let job = st.add(
        obj("CIM_ConcreteJob", &[("InstanceID", id.as_str())])
            .with_prop("JobState", 4u64)
            .with_prop("PercentComplete", 150u64)
            .with_prop("DeleteOnCompletion", false),
    );
    st.link_roles(
        "CIM_AffectedJobElement",
        &cim_vol_path,
        "AffectedElement",
        &job,
        "AffectingElement",
    );
    Ok((4096, out(vec![("Job", job.into())])))
}

fn return_to_storage_pool(
    st: &mut MockState,
    _srv: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let cim_vol_path = param_path(params, "TheElement")?;
    if st.remove(&cim_vol_path) {
        Ok((0, CimParams::new()))
    } else {
        failed()
    }
}

// Copy of `SourceElement` named `ElementName`, in `TargetPool` or the
// pool of the source.
fn replica_of(
    st: &mut MockState,
    params: &CimParams,
) -> CimResult<Option<CimPath>> {
    let name = param_str(params, "ElementName")?;
    let src = param_path(params, "SourceElement")?;
    let blocks = st
        .find(&src)
        .and_then(|v| v.u64_prop("NumberOfBlocks"))
        .ok_or_else(|| invalid("SourceElement"))?;
    if st.find_by("CIM_StorageVolume", "ElementName", &name).is_some() {
        return Ok(None);
    }
    let cim_pool_path = match param_path(params, "TargetPool") {
        Ok(p) => p,
        Err(_) => st
            .linked("CIM_AllocatedFromStoragePool", &src, "CIM_StoragePool")
            .into_iter()
            .next()
            .ok_or_else(|| invalid("SourceElement"))?,
    };
    let serial = 100 + st.next_num();
    let tgt = st.add(vol_instance(serial, &name, blocks));
    st.link("CIM_AllocatedFromStoragePool", &cim_pool_path, &tgt);
    st.link_roles(
        "CIM_StorageSynchronized",
        &src,
        "SystemElement",
        &tgt,
        "SyncedElement",
    );
    Ok(Some(tgt))
}

fn create_replica(
    st: &mut MockState,
    _scs: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    match param_u64(params, "CopyType")? {
        4 | 5 => (),
        _ => return failed(),
    }
    match replica_of(st, params)? {
        Some(tgt) => Ok((0, out(vec![("TargetElement", tgt.into())]))),
        None => failed(),
    }
}

fn create_element_replica(
    st: &mut MockState,
    _rs: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    match param_u64(params, "SyncType")? {
        7 | 8 => (),
        _ => return failed(),
    }
    match replica_of(st, params)? {
        Some(tgt) => Ok((0, out(vec![("TargetElement", tgt.into())]))),
        None => failed(),
    }
}

// NetApp-E detach: the replica goes away with the relationship.
fn modify_synchronization(
    st: &mut MockState,
    _scs: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    if param_u64(params, "Operation")? != 2 {
        return failed();
    }
    for tgt in st.link_ends("CIM_StorageSynchronized", "SyncedElement") {
        st.remove(&tgt);
    }
    Ok((0, CimParams::new()))
}

fn expose_paths(
    st: &mut MockState,
    _srv: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let cim_spc_path = param_paths(params, "ProtocolControllers")
        .into_iter()
        .next()
        .ok_or_else(|| invalid("ProtocolControllers"))?;
    for lu_name in param_strs(params, "LUNames") {
        let cim_vol_path = st
            .find_by("CIM_StorageVolume", "Name", &lu_name)
            .ok_or_else(|| invalid("LUNames"))?;
        st.link("CIM_ProtocolControllerForUnit", &cim_spc_path, &cim_vol_path);
    }
    for init_id in param_strs(params, "InitiatorPortIDs") {
        let cim_init_path = st
            .find_by("CIM_StorageHardwareID", "StorageID", &init_id)
            .ok_or_else(|| invalid("InitiatorPortIDs"))?;
        grant(st, &cim_spc_path, &cim_init_path);
    }
    Ok((0, out(vec![("ProtocolControllers", vec![cim_spc_path].into())])))
}

fn hide_paths(
    st: &mut MockState,
    _srv: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let cim_spc_path = param_paths(params, "ProtocolControllers")
        .into_iter()
        .next()
        .ok_or_else(|| invalid("ProtocolControllers"))?;
    for lu_name in param_strs(params, "LUNames") {
        if let Some(cim_vol_path) =
            st.find_by("CIM_StorageVolume", "Name", &lu_name)
        {
            st.unlink(
                "CIM_ProtocolControllerForUnit",
                &cim_spc_path,
                &cim_vol_path,
            );
        }
    }
    for init_id in param_strs(params, "InitiatorPortIDs") {
        let cim_init_path =
            match st.find_by("CIM_StorageHardwareID", "StorageID", &init_id) {
                Some(p) => p,
                None => continue,
            };
        for privilege in st.linked(
            "CIM_AuthorizedTarget",
            &cim_spc_path,
            "CIM_AuthorizedPrivilege",
        ) {
            st.unlink("CIM_AuthorizedSubject", &privilege, &cim_init_path);
        }
    }
    Ok((0, CimParams::new()))
}

fn is_dev_mg(path: &CimPath) -> bool {
    path.classname.eq_ignore_ascii_case("CIM_DeviceMaskingGroup")
}

fn create_group(
    st: &mut MockState,
    gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let name = param_str(params, "GroupName")?;
    let members = param_paths(params, "Members");
    let (class, assoc) = match param_u64(params, "Type")? {
        2 => ("CIM_InitiatorMaskingGroup", "CIM_MemberOfCollection"),
        3 => ("CIM_TargetMaskingGroup", "CIM_MemberOfCollection"),
        4 => ("CIM_DeviceMaskingGroup", "CIM_OrderedMemberOfCollection"),
        _ => return failed(),
    };
    if st.find_by(class, "ElementName", &name).is_some() {
        return failed();
    }
    // An initiator belongs to one initiator group only.
    if class == "CIM_InitiatorMaskingGroup"
        && members.iter().any(|m| {
            !st.linked("CIM_MemberOfCollection", m, "CIM_InitiatorMaskingGroup")
                .is_empty()
        })
    {
        return failed();
    }
    let id = st.next_id("MG");
    let group = st.add(
        obj(class, &[("InstanceID", id.as_str())])
            .with_prop("ElementName", name.as_str()),
    );
    st.link_roles(
        "CIM_ServiceAffectsElement",
        gmms,
        "AffectingElement",
        &group,
        "AffectedElement",
    );
    for m in &members {
        member(st, assoc, &group, m);
    }
    Ok((0, out(vec![("MaskingGroup", group.into())])))
}

fn add_members(
    st: &mut MockState,
    _gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let group = param_path(params, "MaskingGroup")?;
    if st.find(&group).is_none() {
        return Err(invalid("MaskingGroup"));
    }
    let assoc = if is_dev_mg(&group) {
        "CIM_OrderedMemberOfCollection"
    } else {
        "CIM_MemberOfCollection"
    };
    for m in param_paths(params, "Members") {
        member(st, assoc, &group, &m);
        if is_dev_mg(&group) {
            for cim_spc_path in st.linked(
                "CIM_AssociatedDeviceMaskingGroup",
                &group,
                "CIM_SCSIProtocolController",
            ) {
                st.link("CIM_ProtocolControllerForUnit", &cim_spc_path, &m);
            }
        }
    }
    Ok((0, CimParams::new()))
}

fn remove_members(
    st: &mut MockState,
    _gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let group = param_path(params, "MaskingGroup")?;
    for m in param_paths(params, "Members") {
        st.unlink("CIM_MemberOfCollection", &group, &m);
        if is_dev_mg(&group) {
            for cim_spc_path in st.linked(
                "CIM_AssociatedDeviceMaskingGroup",
                &group,
                "CIM_SCSIProtocolController",
            ) {
                st.unlink("CIM_ProtocolControllerForUnit", &cim_spc_path, &m);
            }
        }
    }
    Ok((0, CimParams::new()))
}

fn create_masking_view(
    st: &mut MockState,
    _gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let name = param_str(params, "ElementName")?;
    let init_mg = param_path(params, "InitiatorMaskingGroup")?;
    let tgt_mg = param_path(params, "TargetMaskingGroup")?;
    let dev_mg = param_path(params, "DeviceMaskingGroup")?;
    let id = st.next_id("VIEW");
    let cim_spc_path = st.add(spc_instance(&id, &name));
    st.link("CIM_AssociatedInitiatorMaskingGroup", &init_mg, &cim_spc_path);
    st.link("CIM_AssociatedTargetMaskingGroup", &tgt_mg, &cim_spc_path);
    st.link("CIM_AssociatedDeviceMaskingGroup", &dev_mg, &cim_spc_path);
    for cim_vol_path in
        st.linked("CIM_OrderedMemberOfCollection", &dev_mg, "CIM_StorageVolume")
    {
        st.link("CIM_ProtocolControllerForUnit", &cim_spc_path, &cim_vol_path);
    }
    Ok((0, out(vec![("ProtocolController", cim_spc_path.into())])))
}

fn delete_masking_view(
    st: &mut MockState,
    _gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let cim_spc_path = param_path(params, "ProtocolController")?;
    if st.remove(&cim_spc_path) {
        Ok((0, CimParams::new()))
    } else {
        failed()
    }
}

fn delete_group(
    st: &mut MockState,
    _gmms: &CimPath,
    params: &CimParams,
) -> CimResult<(u32, CimParams)> {
    let group = param_path(params, "MaskingGroup")?;
    let in_view = !st
        .linked(
            "CIM_AssociatedInitiatorMaskingGroup",
            &group,
            "CIM_SCSIProtocolController",
        )
        .is_empty();
    if in_view && !param_bool(params, "Force") {
        return failed();
    }
    if st.remove(&group) {
        Ok((0, CimParams::new()))
    } else {
        failed()
    }
}
