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

use serde::{Deserialize, Deserializer, Serializer};
use std::convert::TryFrom;
use std::mem::transmute;

fn gen_system_class_string() -> String {
    "System".to_string()
}

fn gen_pool_class_string() -> String {
    "Pool".to_string()
}

fn gen_vol_class_string() -> String {
    "Volume".to_string()
}

fn gen_ag_class_string() -> String {
    "AccessGroup".to_string()
}

fn gen_disk_class_string() -> String {
    "Disk".to_string()
}

fn gen_tgt_port_class_string() -> String {
    "TargetPort".to_string()
}

/// Represent a storage system managed by a SMI-S provider. One provider
/// might manage several systems, and a system might contain sub-systems
/// (controllers, directors) hosting its disks and ports.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct System {
    #[serde(default = "gen_system_class_string")]
    class: String,
    /// Identifier. The `Name` property of `CIM_ComputerSystem`.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// System status stored in bitmap. Valid status value are:
    ///
    ///  * [`System::STATUS_UNKNOWN`][1]
    ///  * [`System::STATUS_OK`][2]
    ///  * [`System::STATUS_ERROR`][3]
    ///  * [`System::STATUS_DEGRADED`][4]
    ///  * [`System::STATUS_PREDICTIVE_FAILURE`][5]
    ///  * [`System::STATUS_OTHER`][6]
    ///
    /// [1]: #associatedconstant.STATUS_UNKNOWN
    /// [2]: #associatedconstant.STATUS_OK
    /// [3]: #associatedconstant.STATUS_ERROR
    /// [4]: #associatedconstant.STATUS_DEGRADED
    /// [5]: #associatedconstant.STATUS_PREDICTIVE_FAILURE
    /// [6]: #associatedconstant.STATUS_OTHER
    pub status: u32,
    /// Additional message for status.
    pub status_info: String,
    plugin_data: Option<String>,
}

impl System {
    /// Plugin failed to query system status.
    pub const STATUS_UNKNOWN: u32 = 1;
    /// System is up and healthy.
    pub const STATUS_OK: u32 = 1 << 1;
    /// System is in error state.
    pub const STATUS_ERROR: u32 = 1 << 2;
    /// System is degraded.
    pub const STATUS_DEGRADED: u32 = 1 << 3;
    /// System has protential failure.
    pub const STATUS_PREDICTIVE_FAILURE: u32 = 1 << 4;
    /// Vendor specific status.
    pub const STATUS_OTHER: u32 = 1 << 5;

    pub(crate) fn new(
        id: String,
        name: String,
        status: u32,
        status_info: String,
    ) -> System {
        System {
            class: gen_system_class_string(),
            id,
            name,
            status,
            status_info,
            plugin_data: None,
        }
    }
}

/// Represent a storage volume. Also known as LUN(Logical Unit Number) or
/// Storage Volume or Virtual Disk.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Volume {
    #[serde(default = "gen_vol_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    #[serde(deserialize_with = "int_to_bool")]
    #[serde(serialize_with = "bool_to_int")]
    #[serde(rename = "admin_state")]
    /// Whether volume is online or offline(I/O access disabled by
    /// administrator.
    pub enabled: bool,
    /// Block size.
    pub block_size: u64,
    /// Number of blocks.
    pub num_of_blocks: u64,
    plugin_data: Option<String>,
    /// SCSI VPD 0x83 NAA type identifier, 16 or 32 lower case hex digits.
    /// Empty when the provider does not expose one.
    pub vpd83: String,
    /// Identifier of owner system.
    pub system_id: String,
    /// Identifier of owner pool.
    pub pool_id: String,
}

impl Volume {
    /// Retried the usable size of volume in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.block_size * self.num_of_blocks
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        name: String,
        vpd83: String,
        block_size: u64,
        num_of_blocks: u64,
        system_id: String,
        pool_id: String,
        plugin_data: Option<String>,
    ) -> Volume {
        Volume {
            class: gen_vol_class_string(),
            id,
            name,
            enabled: true,
            block_size,
            num_of_blocks,
            plugin_data,
            vpd83,
            system_id,
            pool_id,
        }
    }

    pub(crate) fn plugin_data(&self) -> Option<&str> {
        self.plugin_data.as_ref().map(String::as_str)
    }
}

/// Represent a volume replication type.
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum VolumeReplicateType {
    /// Point in time read writeable space efficient copy of data. Also know as
    /// read writeable snapshot.
    Clone = 2,
    /// Full bitwise copy of the data (occupies full space).
    Copy = 3,
    /// I/O will be blocked until I/O reached both source and target storage
    /// systems.
    MirrorSync = 4,
    /// I/O will be blocked until I/O reached source storage systems. The
    /// changes are copied to the target in a predefined interval.
    MirrorAsync = 5,
}

/// Provisioning requested by [`Smis::volume_create()`][1].
///
/// [1]: struct.Smis.html#method.volume_create
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum VolumeCreateArgThinP {
    Full,
    Thin,
    Default,
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
/// Represent a RAID type.
pub enum RaidType {
    /// Plugin failed to detect RAID type.
    Unknown = -1,
    /// [RAID 0](https://en.wikipedia.org/wiki/Standard_RAID_levels#RAID_0)
    Raid0 = 0,
    /// Two disk mirror.
    Raid1 = 1,
    /// Byte-level striping with dedicated parity.
    Raid3 = 3,
    /// Block-level striping with dedicated parity.
    Raid4 = 4,
    /// Block-level striping with distributed parity.
    Raid5 = 5,
    /// Block-level striping with two distributed parities. Also known as
    /// RAID-DP.
    Raid6 = 6,
    /// Stripe of mirrors.
    Raid10 = 10,
    /// Parity of mirrors.
    Raid15 = 15,
    /// Dual parity of mirrors.
    Raid16 = 16,
    /// Stripe of parities.
    Raid50 = 50,
    /// Stripe of dual parities.
    Raid60 = 60,
    /// Mirror of parities.
    Raid51 = 51,
    /// Mirror of dual parities.
    Raid61 = 61,
    /// Just bunch of disks, no parity, no striping.
    Jbod = 20,
    /// The pool contains RAID groups of different RAID types.
    Mixed = 21,
    /// Vendor specific RAID type
    Other = 22,
}

impl From<i32> for RaidType {
    fn from(i: i32) -> RaidType {
        match i {
            0..=1 | 3..=6 | 10 | 15 | 16 | 50 | 60 | 51 | 61 | 20..=22 => unsafe {
                transmute(i)
            },
            _ => RaidType::Unknown,
        }
    }
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
/// What a pool is assembled from.
pub enum PoolMemberType {
    Unknown = 0,
    Other = 1,
    /// Pool is created from disks.
    Disk = 2,
    /// Pool is allocated from other pools.
    Pool = 3,
}

#[derive(Debug, Clone)]
/// Represent pool membership information.
pub struct PoolMemberInfo {
    /// RAID type. [`RaidType::Mixed`][1] when the pool is built from RAID
    /// groups of different types.
    ///
    /// [1]: enum.RaidType.html#variant.Mixed
    pub raid_type: RaidType,
    pub member_type: PoolMemberType,
    /// Disk IDs or pool IDs depending on `member_type`.
    pub member_ids: Vec<String>,
}

fn int_to_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<bool, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    match i {
        1 => Ok(true),
        _ => Ok(false),
    }
}

fn bool_to_int<S: Serializer>(
    b: &bool,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    if *b {
        serializer.serialize_i8(1i8)
    } else {
        serializer.serialize_i8(0i8)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pool {
    #[serde(default = "gen_pool_class_string")]
    class: String,
    /// Identifier. The `InstanceID` property of `CIM_StoragePool`.
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// The type of elements this pool could create, stored in bitmap of
    /// `Pool::ELEMENT_TYPE_*`.
    pub element_type: u64,
    /// The actions does not supported by this pool, stored in bitmap of
    /// `Pool::UNSUPPORTED_*`.
    pub unsupported_actions: u64,
    /// Total space in bytes, [`Pool::SPACE_NOT_FOUND`][1] when provider
    /// does not expose it.
    ///
    /// [1]: #associatedconstant.SPACE_NOT_FOUND
    pub total_space: u64,
    /// Free space in bytes, [`Pool::SPACE_NOT_FOUND`][1] when provider
    /// does not expose it.
    ///
    /// [1]: #associatedconstant.SPACE_NOT_FOUND
    pub free_space: u64,
    /// Pool status stored in bitmap of `Pool::STATUS_*`.
    pub status: u64,
    /// Additional message for status.
    pub status_info: Option<String>,
    plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
    #[serde(deserialize_with = "int_to_thinp_type")]
    #[serde(serialize_with = "thinp_type_to_int")]
    /// Thin provisioning type derived from the element types.
    pub thinp_type: ThinpType,
}

impl Pool {
    /// This pool could allocate space for sub pool.
    pub const ELEMENT_TYPE_POOL: u64 = 1 << 1;
    /// This pool could create volume.
    pub const ELEMENT_TYPE_VOLUME: u64 = 1 << 2;
    /// This pool could create file system.
    pub const ELEMENT_TYPE_FS: u64 = 1 << 3;
    /// This pool could hold delta data for snapshots.
    pub const ELEMENT_TYPE_DELTA: u64 = 1 << 4;
    /// This pool could create fully allocated volume.
    pub const ELEMENT_TYPE_VOLUME_FULL: u64 = 1 << 5;
    /// This pool could create thin provisioned volume.
    pub const ELEMENT_TYPE_VOLUME_THIN: u64 = 1 << 6;
    /// This pool is reserved for internal use.
    pub const ELEMENT_TYPE_SYS_RESERVED: u64 = 1 << 10;

    /// This pool does not allow growing volume.
    pub const UNSUPPORTED_VOLUME_GROW: u64 = 1;
    /// This pool does not allow shrinking volume.
    pub const UNSUPPORTED_VOLUME_SHRINK: u64 = 1 << 1;

    /// Plugin failed to query pool status.
    pub const STATUS_UNKNOWN: u64 = 1;
    /// Pool is up and healthy.
    pub const STATUS_OK: u64 = 1 << 1;
    /// Vendor specific status.
    pub const STATUS_OTHER: u64 = 1 << 2;
    /// Pool is degraded.
    pub const STATUS_DEGRADED: u64 = 1 << 4;
    /// Pool is in error state.
    pub const STATUS_ERROR: u64 = 1 << 5;
    pub const STATUS_STOPPED: u64 = 1 << 9;
    pub const STATUS_STARTING: u64 = 1 << 10;
    pub const STATUS_RECONSTRUCTING: u64 = 1 << 12;
    pub const STATUS_VERIFYING: u64 = 1 << 13;
    pub const STATUS_INITIALIZING: u64 = 1 << 14;
    pub const STATUS_GROWING: u64 = 1 << 15;

    /// Sentinel for space counters the provider did not report.
    pub const SPACE_NOT_FOUND: u64 = ::std::u64::MAX;

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        name: String,
        element_type: u64,
        unsupported_actions: u64,
        total_space: u64,
        free_space: u64,
        status: u64,
        status_info: String,
        system_id: String,
        plugin_data: Option<String>,
    ) -> Pool {
        Pool {
            class: gen_pool_class_string(),
            id,
            name,
            element_type,
            unsupported_actions,
            total_space,
            free_space,
            status,
            status_info: Some(status_info),
            plugin_data,
            system_id,
            thinp_type: ThinpType::from_element_type(element_type),
        }
    }

    pub(crate) fn plugin_data(&self) -> Option<&str> {
        self.plugin_data.as_ref().map(String::as_str)
    }
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum ThinpType {
    Unknown = 0,
    /// Pool only creates thin provisioned volumes.
    Thin = 1,
    /// Pool only creates fully allocated volumes.
    Thick = 5,
    /// Pool itself is not thin provisioned but could create thin or thick
    /// volumes.
    NotApplicable = 6,
}

impl ThinpType {
    fn from_element_type(element_type: u64) -> ThinpType {
        let thin = element_type & Pool::ELEMENT_TYPE_VOLUME_THIN != 0;
        let full = element_type & Pool::ELEMENT_TYPE_VOLUME_FULL != 0;
        match (thin, full) {
            (true, true) => ThinpType::NotApplicable,
            (true, false) => ThinpType::Thin,
            (false, true) => ThinpType::Thick,
            (false, false) => ThinpType::Unknown,
        }
    }
}

fn int_to_thinp_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<ThinpType, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    match i {
        0 | 1 | 5 | 6 => unsafe { Ok(transmute(i)) },
        _ => Ok(ThinpType::Unknown),
    }
}

fn thinp_type_to_int<S: Serializer>(
    t: &ThinpType,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i32(*t as i32)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Disk {
    #[serde(default = "gen_disk_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    /// Disk name, normally the `Name` of `CIM_DiskDrive`.
    pub name: String,
    #[serde(deserialize_with = "int_to_disk_type")]
    #[serde(serialize_with = "disk_type_to_int")]
    /// Disk type.
    pub disk_type: DiskType,
    /// Block size in bytes.
    pub block_size: u64,
    /// Count of block.
    pub num_of_blocks: u64,
    /// Disk status stored in bitmap of `Disk::STATUS_*`.
    pub status: u64,
    plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum DiskType {
    /// Plugin failed to query out the disk type.
    Unknown = 0,
    /// Vendor specific disk type.
    Other = 1,
    /// IDE disk.
    Ata = 3,
    /// SATA disk.
    Sata = 4,
    /// SAS disk.
    Sas = 5,
    /// FC disk.
    Fc = 6,
    /// SCSI over PCI-Express.
    Sop = 7,
    /// SCSI disk.
    Scsi = 8,
    /// Remote LUN from SAN array.
    Lun = 9,
    /// Near-Line SAS, just SATA disk + SAS port.
    NlSas = 51,
    /// Normal HDD, fall back value if failed to detect HDD type(SAS/SATA/etc).
    Hdd = 52,
    /// Solid State Drive.
    Ssd = 53,
    /// Hybrid disk uses a combination of HDD and SSD.
    Hybrid = 54,
}

fn int_to_disk_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<DiskType, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    Ok(DiskType::from(i))
}

impl From<i32> for DiskType {
    fn from(i: i32) -> DiskType {
        match i {
            0 | 1 | 3..=9 | 51..=54 => unsafe { transmute(i) },
            _ => DiskType::Unknown,
        }
    }
}

fn disk_type_to_int<S: Serializer>(
    t: &DiskType,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i32(*t as i32)
}

impl Disk {
    /// Plugin failed to query out the status of disk.
    pub const STATUS_UNKNOWN: u64 = 1;
    /// Disk is up and healthy.
    pub const STATUS_OK: u64 = 1 << 1;
    /// Vendor specific status.
    pub const STATUS_OTHER: u64 = 1 << 2;
    /// Disk is functional but will fail soon.
    pub const STATUS_PREDICTIVE_FAILURE: u64 = 1 << 3;
    /// Disk is not functional.
    pub const STATUS_ERROR: u64 = 1 << 4;
    /// Disk was removed by administrator.
    pub const STATUS_REMOVED: u64 = 1 << 5;
    /// Disk is starting up.
    pub const STATUS_STARTING: u64 = 1 << 6;
    /// Disk is shutting down.
    pub const STATUS_STOPPING: u64 = 1 << 7;
    /// Disk is stopped by administrator.
    pub const STATUS_STOPPED: u64 = 1 << 8;
    /// Disk is not functional yet, internal storage system is initializing
    /// this disk.
    pub const STATUS_INITIALIZING: u64 = 1 << 9;
    /// In maintenance for bad sector scan, integrity check and etc.
    pub const STATUS_MAINTENANCE_MODE: u64 = 1 << 10;
    /// Disk is configured as spare disk.
    pub const STATUS_SPARE_DISK: u64 = 1 << 11;
    /// Disk is reconstructing its data.
    pub const STATUS_RECONSTRUCT: u64 = 1 << 12;
    /// Indicate the whole disk is not holding any data or acting as a dedicate
    /// spare disk.
    pub const STATUS_FREE: u64 = 1 << 13;

    /// Sentinel for a block size the provider did not report.
    pub const BLOCK_SIZE_NOT_FOUND: u64 = ::std::u64::MAX;
    /// Sentinel for a block count the provider did not report.
    pub const BLOCK_COUNT_NOT_FOUND: u64 = ::std::u64::MAX;

    pub(crate) fn new(
        id: String,
        name: String,
        disk_type: DiskType,
        block_size: u64,
        num_of_blocks: u64,
        status: u64,
        system_id: String,
    ) -> Disk {
        Disk {
            class: gen_disk_class_string(),
            id,
            name,
            disk_type,
            block_size,
            num_of_blocks,
            status,
            plugin_data: None,
            system_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessGroup {
    #[serde(default = "gen_ag_class_string")]
    class: String,
    /// Identifier
    pub id: String,
    /// Human friendly name.
    pub name: String,
    /// Initiator list.
    pub init_ids: Vec<String>,
    #[serde(deserialize_with = "int_to_init_type")]
    #[serde(serialize_with = "init_type_to_int")]
    /// Initiator type. [`InitiatorType::Mixed`][1] when both WWPN and iSCSI
    /// IQN are present.
    ///
    /// [1]: enum.InitiatorType.html#variant.Mixed
    pub init_type: InitiatorType,
    plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

impl AccessGroup {
    pub(crate) fn new(
        id: String,
        name: String,
        init_ids: Vec<String>,
        init_type: InitiatorType,
        system_id: String,
        plugin_data: Option<String>,
    ) -> AccessGroup {
        AccessGroup {
            class: gen_ag_class_string(),
            id,
            name,
            init_ids,
            init_type,
            plugin_data,
            system_id,
        }
    }

    pub(crate) fn plugin_data(&self) -> Option<&str> {
        self.plugin_data.as_ref().map(String::as_str)
    }
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum InitiatorType {
    /// Plugin failed to query initiator type.
    Unknown = 0,
    /// Vendor specific initiator type.
    Other = 1,
    /// FC or FCoE WWPN
    Wwpn = 2,
    /// iSCSI IQN
    IscsiIqn = 5,
    /// This access group contains more than 1 type of initiator.
    Mixed = 7,
}

fn int_to_init_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<InitiatorType, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    match i {
        0 | 1 | 2 | 5 | 7 => unsafe { Ok(transmute(i)) },
        _ => Ok(InitiatorType::Unknown),
    }
}

fn init_type_to_int<S: Serializer>(
    i: &InitiatorType,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i32(*i as i32)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TargetPort {
    #[serde(default = "gen_tgt_port_class_string")]
    class: String,
    /// Identifier.
    pub id: String,
    #[serde(deserialize_with = "int_to_port_type")]
    #[serde(serialize_with = "port_type_to_int")]
    /// Target port type.
    pub port_type: PortType,
    /// The address used by upper layer like FC and iSCSI:
    ///
    ///  * FC and FCoE:    WWPN
    ///  * iSCSI:          IQN
    ///
    /// String is in lower case, split with `:` every two digits if WWPN.
    pub service_address: String,
    /// The address used by network layer like FC and TCP/IP:
    ///
    ///  * FC/FCoE:        WWPN
    ///  * iSCSI:          `IPv4:Port` or `[IPv6]:Port`
    ///
    /// String is in lower case, split with `:` every two digits if WWPN.
    pub network_address: String,
    /// The address used by physical layer like FC-0 and MAC:
    ///
    ///  * FC and FCoE :   WWPN
    ///  * iSCSI:          MAC
    ///
    /// String is in lower case, split with `:` every two digits.
    pub physical_address: String,
    /// The name of physical port. Administrator could use this name to
    /// locate the port on storage system. E.g. 'eth0'
    pub physical_name: String,
    plugin_data: Option<String>,
    /// Identifier of owner system.
    pub system_id: String,
}

impl TargetPort {
    pub(crate) fn new(
        id: String,
        port_type: PortType,
        service_address: String,
        network_address: String,
        physical_address: String,
        physical_name: String,
        system_id: String,
    ) -> TargetPort {
        TargetPort {
            class: gen_tgt_port_class_string(),
            id,
            port_type,
            service_address,
            network_address,
            physical_address,
            physical_name,
            plugin_data: None,
            system_id,
        }
    }
}

#[repr(i32)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum PortType {
    /// Vendor specific port type.
    Other = 1,
    /// FC port
    Fc = 2,
    /// FCoE port
    FCoE = 3,
    /// iSCSI port
    Iscsi = 4,
}

fn int_to_port_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<PortType, D::Error> {
    let i: i32 = Deserialize::deserialize(deserializer)?;
    match i {
        1 | 2 | 3 | 4 => unsafe { Ok(transmute(i)) },
        _ => Ok(PortType::Other),
    }
}

fn port_type_to_int<S: Serializer>(
    t: &PortType,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i32(*t as i32)
}

const CAPABILITY_COUNT: usize = 512;

/// Per system capability table. Use
/// [`Capabilities::is_supported()`][1] to check a single
/// [`Capability`][2].
///
/// [1]: #method.is_supported
/// [2]: enum.Capability.html
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(try_from = "CapabilitiesIpc", into = "CapabilitiesIpc")]
pub struct Capabilities {
    cap: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct CapabilitiesIpc {
    class: String,
    cap: String,
}

impl From<Capabilities> for CapabilitiesIpc {
    fn from(c: Capabilities) -> Self {
        CapabilitiesIpc {
            class: "Capabilities".to_string(),
            cap: c.cap.iter().map(|b| format!("{:02x}", b)).collect(),
        }
    }
}

impl TryFrom<CapabilitiesIpc> for Capabilities {
    type Error = String;

    fn try_from(c: CapabilitiesIpc) -> ::std::result::Result<Self, String> {
        let mut cap = Vec::with_capacity(CAPABILITY_COUNT);
        let bytes = c.cap.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(format!("Invalid capability string '{}'", c.cap));
        }
        for pair in bytes.chunks(2) {
            let s = ::std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            cap.push(u8::from_str_radix(s, 16).map_err(|e| e.to_string())?);
        }
        cap.resize(CAPABILITY_COUNT, CapabilityValue::Unsupported as u8);
        Ok(Capabilities { cap })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum CapabilityValue {
    Unsupported = 0,
    Supported = 1,
    /// Only supported when the resource is offline.
    SupportedOffline = 2,
    NotImplemented = 3,
    Unknown = 4,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            cap: vec![CapabilityValue::Unsupported as u8; CAPABILITY_COUNT],
        }
    }
}

#[repr(usize)]
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum Capability {
    Volumes = 20,
    VolumeCreate = 21,
    VolumeResize = 22,
    VolumeReplicate = 23,
    VolumeReplicateClone = 24,
    VolumeReplicateCopy = 25,
    VolumeReplicateMirrorAsync = 26,
    VolumeReplicateMirrorSync = 27,
    VolumeDelete = 33,
    VolumeMask = 36,
    VolumeUnmask = 37,
    AccessGroups = 38,
    AccessGroupCreateWwpn = 39,
    AccessGroupDelete = 40,
    AccessGroupInitAddWwpn = 41,
    AccessGroupInitDel = 42,
    VolsMaskedToAg = 43,
    AgsGrantedToVol = 44,
    AccessGroupCreateIscsiIqn = 47,
    AccessGroupInitAddIscsiIqn = 48,
    VolumeThin = 55,
    TargetPorts = 216,
    Disks = 220,
    PoolMemberInfo = 221,
}

impl Capabilities {
    pub fn get(&self, cap: Capability) -> CapabilityValue {
        match self.cap.get(cap as usize).copied() {
            Some(1) => CapabilityValue::Supported,
            Some(2) => CapabilityValue::SupportedOffline,
            Some(3) => CapabilityValue::NotImplemented,
            Some(4) => CapabilityValue::Unknown,
            _ => CapabilityValue::Unsupported,
        }
    }

    pub fn is_supported(&self, cap: Capability) -> bool {
        self.get(cap) == CapabilityValue::Supported
    }

    pub(crate) fn set(&mut self, cap: Capability) {
        self.set_value(cap, CapabilityValue::Supported);
    }

    pub(crate) fn set_value(&mut self, cap: Capability, val: CapabilityValue) {
        self.cap[cap as usize] = val as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_hex_roundtrip_keeps_values() {
        let mut c = Capabilities::default();
        c.set(Capability::Volumes);
        c.set_value(Capability::VolumeResize, CapabilityValue::SupportedOffline);
        let s = ::serde_json::to_string(&c).unwrap();
        assert!(s.contains("\"class\":\"Capabilities\""));
        let c: Capabilities = ::serde_json::from_str(&s).unwrap();
        assert!(c.is_supported(Capability::Volumes));
        assert!(!c.is_supported(Capability::VolumeResize));
        assert_eq!(
            c.get(Capability::VolumeResize),
            CapabilityValue::SupportedOffline
        );
        assert_eq!(c.get(Capability::Disks), CapabilityValue::Unsupported);
    }

    #[test]
    fn volume_size() {
        let v = Volume::new(
            "id".to_string(),
            "name".to_string(),
            String::new(),
            512,
            2048,
            "sys".to_string(),
            "pool".to_string(),
            None,
        );
        assert_eq!(v.size_bytes(), 1 << 20);
    }

    #[test]
    fn thinp_type_follows_element_type() {
        assert_eq!(
            ThinpType::from_element_type(
                Pool::ELEMENT_TYPE_VOLUME | Pool::ELEMENT_TYPE_VOLUME_THIN
            ),
            ThinpType::Thin
        );
        assert_eq!(
            ThinpType::from_element_type(
                Pool::ELEMENT_TYPE_VOLUME_THIN | Pool::ELEMENT_TYPE_VOLUME_FULL
            ),
            ThinpType::NotApplicable
        );
        assert_eq!(
            ThinpType::from_element_type(Pool::ELEMENT_TYPE_VOLUME),
            ThinpType::Unknown
        );
    }

    #[test]
    fn raid_type_from_int() {
        assert_eq!(RaidType::from(5), RaidType::Raid5);
        assert_eq!(RaidType::from(2), RaidType::Unknown);
        assert_eq!(RaidType::from(21), RaidType::Mixed);
    }
}
