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

//! DMTF and SNIA numeric values used by SMI-S providers.

pub(crate) const ID_TYPE_WWPN: u64 = 2;
pub(crate) const ID_TYPE_ISCSI: u64 = 5;

pub(crate) const TGT_PORT_USAGE_FRONTEND_ONLY: u64 = 2;
pub(crate) const TGT_PORT_USAGE_UNRESTRICTED: u64 = 4;
pub(crate) const FC_PORT_PORT_DISCRIMINATOR_FCOE: u64 = 10;
pub(crate) const NET_PORT_LINK_TECH_ETHERNET: u64 = 2;
pub(crate) const ISCSI_TGT_ROLE_TARGET: u64 = 3;
pub(crate) const SPC_NAME_FORMAT_ISCSI: u64 = 3;
pub(crate) const IPV6_ADDR_TYPE_GUA: u64 = 6;
pub(crate) const IPV6_ADDR_TYPE_6TO4: u64 = 7;
pub(crate) const IPV6_ADDR_TYPE_ULA: u64 = 8;

pub(crate) const MASK_GROUP_TYPE_INIT: u16 = 2;
pub(crate) const MASK_GROUP_TYPE_TGT: u16 = 3;
pub(crate) const MASK_GROUP_TYPE_DEV: u16 = 4;

pub(crate) const GMM_CAP_DEV_MG_ALLOW_EMPTY_W_SPC: u64 = 5;
pub(crate) const GMM_CAP_DELETE_SPC: u64 = 24;
pub(crate) const GMM_CAP_DELETE_GROUP: u64 = 20;

pub(crate) const SCS_CAP_SUP_ST_VOLUME: u64 = 2;
pub(crate) const SCS_CAP_SUP_THIN_ST_VOLUME: u64 = 5;
pub(crate) const SCS_CAP_VOLUME_CREATE: u64 = 5;
pub(crate) const SCS_CAP_VOLUME_DELETE: u64 = 6;
pub(crate) const SCS_CAP_VOLUME_MODIFY: u64 = 7;

pub(crate) const INTEROP_NAMESPACES: [&str; 3] =
    ["interop", "root/interop", "root/PG_Interop"];
pub(crate) const DEFAULT_NAMESPACE: &str = "interop";

pub(crate) const POOL_USAGE_UNRESTRICTED: u64 = 2;
pub(crate) const POOL_USAGE_RESERVED_FOR_SYSTEM: u64 = 3;
pub(crate) const POOL_USAGE_DELTA: u64 = 4;
pub(crate) const POOL_USAGE_SPARE: u64 = 8;

pub(crate) const SUPPORT_VOL_CREATE: u64 = 3;
pub(crate) const SUPPORT_ELEMENT_EXPAND: u64 = 12;
pub(crate) const SUPPORT_ELEMENT_REDUCE: u64 = 13;

pub(crate) const ELEMENT_THICK_VOLUME: u16 = 2;
pub(crate) const ELEMENT_THIN_VOLUME: u16 = 5;

pub(crate) const DISK_TYPE_UNKNOWN: u64 = 0;
pub(crate) const DISK_TYPE_OTHER: u64 = 1;
pub(crate) const DISK_TYPE_HDD: u64 = 2;
pub(crate) const DISK_TYPE_SSD: u64 = 3;
pub(crate) const DISK_TYPE_HYBRID: u64 = 4;

pub(crate) const OP_STATUS_UNKNOWN: u64 = 0;
pub(crate) const OP_STATUS_OK: u64 = 2;
pub(crate) const OP_STATUS_DEGRADED: u64 = 3;
pub(crate) const OP_STATUS_PREDICTIVE_FAILURE: u64 = 5;
pub(crate) const OP_STATUS_ERROR: u64 = 6;
pub(crate) const OP_STATUS_NON_RECOVERABLE_ERROR: u64 = 7;
pub(crate) const OP_STATUS_STARTING: u64 = 8;
pub(crate) const OP_STATUS_STOPPING: u64 = 9;
pub(crate) const OP_STATUS_STOPPED: u64 = 10;
pub(crate) const OP_STATUS_SUPPORTING_ENTITY_IN_ERROR: u64 = 16;
pub(crate) const OP_STATUS_COMPLETED: u64 = 17;

const OP_STATUS_NAMES: [(u64, &str); 19] = [
    (0, "UNKNOWN"),
    (1, "OTHER"),
    (2, "OK"),
    (3, "DEGRADED"),
    (4, "STRESSED"),
    (5, "PREDICTIVE_FAILURE"),
    (6, "ERROR"),
    (7, "NON_RECOVERABLE_ERROR"),
    (8, "STARTING"),
    (9, "STOPPING"),
    (10, "STOPPED"),
    (11, "IN_SERVICE"),
    (12, "NO_CONTACT"),
    (13, "LOST_COMMUNICATION"),
    (14, "ABORTED"),
    (15, "DORMANT"),
    (16, "SUPPORTING_ENTITY_IN_ERROR"),
    (17, "COMPLETED"),
    (18, "POWER_MODE"),
];

fn op_status_name(op_status: u64) -> Option<&'static str> {
    OP_STATUS_NAMES
        .iter()
        .find(|(num, _)| *num == op_status)
        .map(|(_, name)| *name)
}

/// Fold a DMTF `OperationalStatus` list into a libStorageMgmt status bitmap
/// plus status text.
///
/// Values listed in `conv` are OR-ed in. Other known DMTF values set
/// `other_value` and have their names appended to the text. An empty result
/// becomes `unknown_value`.
pub(crate) fn op_status_list_conv(
    conv: &[(u64, u64)],
    op_status_list: &[u64],
    unknown_value: u64,
    other_value: u64,
) -> (u64, String) {
    let mut status = 0u64;
    let mut info = Vec::new();
    for op_status in op_status_list {
        match conv.iter().find(|(k, _)| k == op_status) {
            Some((_, v)) => status |= *v,
            None => {
                if let Some(name) = op_status_name(*op_status) {
                    status |= other_value;
                    info.push(name);
                }
            }
        }
    }
    if status == 0 {
        status = unknown_value;
    }
    (status, info.join(" "))
}

pub(crate) const JOB_STATE_NEW: u64 = 2;
pub(crate) const JOB_STATE_STARTING: u64 = 3;
pub(crate) const JOB_STATE_RUNNING: u64 = 4;
pub(crate) const JOB_STATE_COMPLETED: u64 = 7;

pub(crate) const SYNC_TYPE_MIRROR: u16 = 6;
pub(crate) const SYNC_TYPE_SNAPSHOT: u16 = 7;
pub(crate) const SYNC_TYPE_CLONE: u16 = 8;

pub(crate) const VOL_NAME_FORMAT_NNA: u64 = 9;
pub(crate) const VOL_NAME_SPACE_VPD83_TYPE3: u64 = 2;
pub(crate) const VOL_OTHER_INFO_NAA_VPD83_TYPE3H: &str = "NAA;VPD83Type3";
pub(crate) const VOL_USAGE_SYS_RESERVED: u64 = 3;

pub(crate) const REPLICA_CAP_ACTION_CREATE_ELEMENT: u64 = 2;
pub(crate) const REPLICA_CAP_TYPE_SYNC_MIRROR_LOCAL: u64 = 2;
pub(crate) const REPLICA_CAP_TYPE_ASYNC_MIRROR_LOCAL: u64 = 3;
pub(crate) const REPLICA_CAP_TYPE_SYNC_SNAPSHOT_LOCAL: u64 = 6;
pub(crate) const REPLICA_CAP_TYPE_ASYNC_SNAPSHOT_LOCAL: u64 = 7;
pub(crate) const REPLICA_CAP_TYPE_SYNC_CLONE_LOCAL: u64 = 10;
pub(crate) const REPLICA_CAP_TYPE_ASYNC_CLONE_LOCAL: u64 = 11;

pub(crate) const COPY_STATE_SYNC: u16 = 4;

pub(crate) const ST_CONF_CAP_COPY_TYPE_ASYNC: u16 = 2;
pub(crate) const ST_CONF_CAP_COPY_TYPE_SYNC: u16 = 3;
pub(crate) const ST_CONF_CAP_COPY_TYPE_UNSYNC_ASSOC: u16 = 4;
pub(crate) const ST_CONF_CAP_COPY_TYPE_UNSYNC_UNASSOC: u16 = 5;

pub(crate) const ST_SYNC_STATE_SYNCHRONIZED: u64 = 6;
pub(crate) const ST_SYNC_COPY_TYPE_UNSYNC_ASSOC: u64 = 4;
pub(crate) const MODIFY_SYNC_OP_DETACH: u16 = 8;
pub(crate) const MODIFY_SYNC_OP_RETURN_TO_POOL: u16 = 19;
pub(crate) const NETAPP_E_MODIFY_SYNC_OP_DETACH: u16 = 2;

pub(crate) const CTRL_CONF_SRV_DA_RW: u16 = 2;

/// `RegisteredOrganization` value of SNIA.
pub(crate) const REG_ORG_SNIA: u64 = 11;
