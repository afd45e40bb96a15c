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

use super::cim::CimInstance;
use super::data::System;
use super::dmtf::*;
use super::error::*;
use super::identity::ResourceKind;
use super::provider::Provider;

/// Properties of `CIM_ComputerSystem` needed by `cim_sys_to_lsm_sys()`.
pub(crate) const CIM_SYS_PROPS: [&str; 3] =
    ["Name", "ElementName", "OperationalStatus"];

const SYS_OP_STATUS_CONV: [(u64, u64); 7] = [
    (OP_STATUS_UNKNOWN, System::STATUS_UNKNOWN as u64),
    (OP_STATUS_OK, System::STATUS_OK as u64),
    (OP_STATUS_ERROR, System::STATUS_ERROR as u64),
    (OP_STATUS_DEGRADED, System::STATUS_DEGRADED as u64),
    (OP_STATUS_NON_RECOVERABLE_ERROR, System::STATUS_ERROR as u64),
    (
        OP_STATUS_PREDICTIVE_FAILURE,
        System::STATUS_PREDICTIVE_FAILURE as u64,
    ),
    (
        OP_STATUS_SUPPORTING_ENTITY_IN_ERROR,
        System::STATUS_ERROR as u64,
    ),
];

fn sys_status_of_cim_sys(cim_sys: &CimInstance) -> (u32, String) {
    match cim_sys.u64_list("OperationalStatus") {
        Some(op_status) => {
            let (status, info) = op_status_list_conv(
                &SYS_OP_STATUS_CONV,
                &op_status,
                u64::from(System::STATUS_UNKNOWN),
                u64::from(System::STATUS_OTHER),
            );
            (status as u32, info)
        }
        None => (System::STATUS_UNKNOWN, String::new()),
    }
}

pub(crate) fn cim_sys_to_lsm_sys(
    provider: &Provider,
    cim_sys: &CimInstance,
) -> Result<System> {
    let sys_id = provider.id_of(ResourceKind::System, cim_sys)?;
    let name = cim_sys
        .str_prop("ElementName")
        .map(str::to_string)
        .unwrap_or_else(|| sys_id.clone());
    let (status, status_info) = sys_status_of_cim_sys(cim_sys);
    Ok(System::new(sys_id, name, status, status_info))
}

/// Owner system ID of a volume, disk or any other `CIM_LogicalDevice`.
pub(crate) fn sys_id_of_cim_dev(cim_dev: &CimInstance) -> Result<String> {
    cim_dev
        .str_prop("SystemName")
        .map(str::to_string)
        .ok_or_else(|| {
            LsmError::PluginBug(format!(
                "Got {} with no SystemName property: {}",
                cim_dev.classname(),
                cim_dev.path
            ))
        })
}

pub(crate) fn systems(provider: &Provider) -> Result<Vec<System>> {
    provider
        .root_cim_syss(&CIM_SYS_PROPS)?
        .iter()
        .map(|s| cim_sys_to_lsm_sys(provider, s))
        .collect()
}
