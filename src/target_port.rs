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

use super::cap::{fc_tgt_is_supported, iscsi_tgt_is_supported, multi_sys_is_supported};
use super::cim::{AssocQuery, CimInstance, CimPath};
use super::data::{PortType, TargetPort};
use super::dmtf::*;
use super::error::*;
use super::identity::{digest, ResourceKind};
use super::misc::hex_string_format;
use super::provider::{merge_props, Provider};

pub(crate) const CIM_FC_TGT_PROPS: [&str; 7] = [
    "UsageRestriction",
    "ElementName",
    "SystemName",
    "PermanentAddress",
    "PortDiscriminator",
    "LinkTechnology",
    "DeviceID",
];

const CIM_IP_PROPS: [&str; 4] =
    ["IPv4Address", "IPv6Address", "SystemName", "IPv6AddressType"];

// Some NetApp arrays report IPv4 mapped addresses like this even with IPv6
// disabled.
const IPV6_BOGUS_PREFIX: &str = "0000:0000:0000:0000:0000:0000";

fn is_frontend_fc_tgt(cim_fc_tgt: &CimInstance) -> bool {
    match cim_fc_tgt.u64_prop("UsageRestriction") {
        Some(TGT_PORT_USAGE_FRONTEND_ONLY)
        | Some(TGT_PORT_USAGE_UNRESTRICTED) => true,
        _ => false,
    }
}

fn port_type_of_cim_fc_tgt(cim_fc_tgt: &CimInstance) -> PortType {
    // PortDiscriminator is mandatory for FCoE since SMI-S 1.6.1.
    if let Some(discriminators) = cim_fc_tgt.u64_list("PortDiscriminator") {
        if discriminators.contains(&FC_PORT_PORT_DISCRIMINATOR_FCOE) {
            return PortType::FCoE;
        }
    }
    if cim_fc_tgt.u64_prop("LinkTechnology") == Some(NET_PORT_LINK_TECH_ETHERNET)
    {
        return PortType::FCoE;
    }
    PortType::Fc
}

// The system itself plus its sub-systems when the provider supports the
// Multiple Computer System profile.
fn cim_syss_path_of(
    provider: &Provider,
    cim_sys_path: &CimPath,
) -> Result<Vec<CimPath>> {
    if multi_sys_is_supported(provider)? {
        provider.cim_syss_path_with_leafs(cim_sys_path)
    } else {
        Ok(vec![cim_sys_path.clone()])
    }
}

/// Front end `CIM_FCPort` of a system and its sub-systems.
pub(crate) fn cim_fc_tgts_of(
    provider: &Provider,
    cim_sys_path: &CimPath,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let props = merge_props(props, &["UsageRestriction"]);
    let mut rc = Vec::new();
    for cur_cim_sys_path in cim_syss_path_of(provider, cim_sys_path)? {
        rc.extend(
            provider
                .associators(
                    &cur_cim_sys_path,
                    &AssocQuery::new("CIM_SystemDevice")
                        .result_class("CIM_FCPort"),
                    &props,
                )?
                .into_iter()
                .filter(is_frontend_fc_tgt),
        );
    }
    Ok(rc)
}

fn cim_fc_tgt_to_lsm(
    provider: &Provider,
    cim_fc_tgt: &CimInstance,
    system_id: &str,
) -> Result<TargetPort> {
    let port_id = provider.id_of(ResourceKind::FcPort, cim_fc_tgt)?;
    // SNIA defines WWPN as 16 upper case hex digits without splitter.
    let wwpn = hex_string_format(
        cim_fc_tgt
            .str_prop("PermanentAddress")
            .ok_or_plugin_bug("Got CIM_FCPort with no PermanentAddress")?,
        16,
        2,
    );
    let name = cim_fc_tgt.str_prop("ElementName").unwrap_or("").to_string();
    Ok(TargetPort::new(
        port_id,
        port_type_of_cim_fc_tgt(cim_fc_tgt),
        wwpn.clone(),
        wwpn.clone(),
        wwpn,
        name,
        system_id.to_string(),
    ))
}

/// The `CIM_SCSIProtocolEndpoint` of a `CIM_FCPort`, one to one since
/// SMI-S 1.4 revision 6.
pub(crate) fn cim_pep_path_of_fc_tgt(
    provider: &Provider,
    cim_fc_tgt_path: &CimPath,
) -> Result<CimPath> {
    provider
        .associator_names(
            cim_fc_tgt_path,
            &AssocQuery::new("CIM_DeviceSAPImplementation")
                .result_class("CIM_SCSIProtocolEndpoint"),
        )?
        .into_iter()
        .next()
        .ok_or_else(|| {
            LsmError::PluginBug(format!(
                "No CIM_SCSIProtocolEndpoint associated to {}",
                cim_fc_tgt_path
            ))
        })
}

/// Target role `CIM_iSCSIProtocolEndpoint` (iSCSI portal groups) of a
/// system and its sub-systems.
pub(crate) fn cim_iscsi_pgs_of(
    provider: &Provider,
    cim_sys_path: &CimPath,
    props: &[&str],
) -> Result<Vec<CimInstance>> {
    let props = merge_props(props, &["Role"]);
    let mut rc = Vec::new();
    for cur_cim_sys_path in cim_syss_path_of(provider, cim_sys_path)? {
        rc.extend(
            provider
                .associators(
                    &cur_cim_sys_path,
                    &AssocQuery::new("CIM_HostedAccessPoint")
                        .result_class("CIM_iSCSIProtocolEndpoint"),
                    &props,
                )?
                .into_iter()
                .filter(|p| p.u64_prop("Role") == Some(ISCSI_TGT_ROLE_TARGET)),
        );
    }
    Ok(rc)
}

// iSCSI node names served by a portal group.
fn iscsi_node_names_of(
    provider: &Provider,
    cim_iscsi_pg_path: &CimPath,
) -> Result<Vec<String>> {
    let cim_spcs = provider.associators(
        cim_iscsi_pg_path,
        &AssocQuery::new("CIM_SAPAvailableForElement")
            .result_class("CIM_SCSIProtocolController"),
        &["Name", "NameFormat"],
    )?;
    Ok(cim_spcs
        .iter()
        // EMC duplicates the iSCSI node in this vendor class.
        .filter(|s| s.classname() != "Clar_MappingSCSIProtocolController")
        .filter(|s| s.u64_prop("NameFormat") == Some(SPC_NAME_FORMAT_ISCSI))
        .filter_map(|s| s.str_prop("Name"))
        .map(str::to_string)
        .collect())
}

fn ipv4_addr_of_cim_ip(cim_ip: &CimInstance) -> Option<String> {
    match cim_ip.str_prop("IPv4Address") {
        Some(a) if !a.is_empty() => Some(a.to_string()),
        _ => None,
    }
}

// Only global unicast, 6to4 and unique local addresses are reported.
fn ipv6_addr_of_cim_ip(cim_ip: &CimInstance) -> Option<String> {
    let addr = match cim_ip.str_prop("IPv6Address") {
        Some(a) if !a.is_empty() => a,
        _ => return None,
    };
    if let Some(addr_type) = cim_ip.u64_prop("IPv6AddressType") {
        if addr_type != IPV6_ADDR_TYPE_GUA
            && addr_type != IPV6_ADDR_TYPE_6TO4
            && addr_type != IPV6_ADDR_TYPE_ULA
        {
            return None;
        }
    }
    if addr.starts_with(IPV6_BOGUS_PREFIX) {
        return None;
    }
    if addr.len() == 39 {
        let digits = addr.replace(':', "");
        if digits.len() == 32 {
            return Some(hex_string_format(&digits, 32, 4));
        }
    }
    Some(addr.to_string())
}

// (MAC address, port name) of the ethernet ports behind an IP endpoint.
fn nics_of_cim_ip(
    provider: &Provider,
    cim_ip_path: &CimPath,
) -> Result<Vec<(String, String)>> {
    let cim_eths = provider.associators(
        cim_ip_path,
        &AssocQuery::new("CIM_DeviceSAPImplementation")
            .result_class("CIM_EthernetPort"),
        &["PermanentAddress", "ElementName"],
    )?;
    if cim_eths.is_empty() {
        return Ok(vec![(String::new(), String::new())]);
    }
    Ok(cim_eths
        .iter()
        .map(|e| {
            let mac = match e.str_prop("PermanentAddress") {
                Some(m) if !m.is_empty() => hex_string_format(m, 12, 2),
                _ => String::new(),
            };
            let name = e.str_prop("ElementName").unwrap_or("").to_string();
            (mac, name)
        })
        .collect())
}

/// Target ports of an iSCSI portal group, one per node name, network
/// address and NIC:
///
/// ```text
///     CIM_SCSIProtocolController      # iSCSI node
///             ^  CIM_SAPAvailableForElement
///     CIM_iSCSIProtocolEndpoint       # iSCSI portal group
///             |  CIM_BindsTo
///     CIM_TCPProtocolEndpoint         # TCP port
///             |  CIM_BindsTo
///     CIM_IPProtocolEndpoint          # IPv4 and IPv6 address
///             |  CIM_DeviceSAPImplementation
///     CIM_EthernetPort                # MAC address
/// ```
fn cim_iscsi_pg_to_lsm(
    provider: &Provider,
    cim_iscsi_pg: &CimInstance,
    system_id: &str,
) -> Result<Vec<TargetPort>> {
    let cim_tcps = provider.associators(
        &cim_iscsi_pg.path,
        &AssocQuery::new("CIM_BindsTo").result_class("CIM_TCPProtocolEndpoint"),
        &["PortNumber"],
    )?;
    if cim_tcps.is_empty() {
        return Err(LsmError::PluginBug(format!(
            "No CIM_TCPProtocolEndpoint associated to {}",
            cim_iscsi_pg.path
        )));
    }
    let node_names = iscsi_node_names_of(provider, &cim_iscsi_pg.path)?;
    let mut rc = Vec::new();
    if node_names.is_empty() {
        return Ok(rc);
    }

    for cim_tcp in cim_tcps {
        let tcp_port = cim_tcp.u64_prop("PortNumber").unwrap_or(3260);
        let cim_ips = provider.associators(
            &cim_tcp.path,
            &AssocQuery::new("CIM_BindsTo")
                .result_class("CIM_IPProtocolEndpoint"),
            &CIM_IP_PROPS,
        )?;
        for cim_ip in cim_ips {
            let mut net_addrs = Vec::new();
            if let Some(ipv4) = ipv4_addr_of_cim_ip(&cim_ip) {
                net_addrs.push(format!("{}:{}", ipv4, tcp_port));
            }
            if let Some(ipv6) = ipv6_addr_of_cim_ip(&cim_ip) {
                net_addrs.push(format!("[{}]:{}", ipv6, tcp_port));
            }
            for (mac, port_name) in nics_of_cim_ip(provider, &cim_ip.path)? {
                for net_addr in &net_addrs {
                    for node_name in &node_names {
                        let id_src =
                            format!("{}:{}:{}", mac, net_addr, node_name);
                        rc.push(TargetPort::new(
                            digest(&[id_src.as_str()]),
                            PortType::Iscsi,
                            node_name.clone(),
                            net_addr.clone(),
                            mac.clone(),
                            port_name.clone(),
                            system_id.to_string(),
                        ));
                    }
                }
            }
        }
    }
    Ok(rc)
}

pub(crate) fn target_ports(provider: &Provider) -> Result<Vec<TargetPort>> {
    let fc_support = fc_tgt_is_supported(provider)?;
    let iscsi_support = iscsi_tgt_is_supported(provider)?;
    // One provider either supports target ports for all its systems or for
    // none.
    if !fc_support && !iscsi_support {
        return Err(LsmError::NoSupport(
            "Target SMI-S provider does not support any of these profiles: \
             'FC Target Ports 1.4', 'iSCSI Target Ports 1.1'"
                .to_string(),
        ));
    }

    let cim_syss = provider.root_cim_syss(&[])?;
    let mut rc = Vec::new();
    for cim_sys in &cim_syss {
        let system_id = provider.id_of(ResourceKind::System, cim_sys)?;
        if fc_support {
            // CIM_FCPort of sub-systems carries the sub-system name in
            // SystemName, the root system ID is used instead.
            for cim_fc_tgt in
                cim_fc_tgts_of(provider, &cim_sys.path, &CIM_FC_TGT_PROPS)?
            {
                rc.push(cim_fc_tgt_to_lsm(provider, &cim_fc_tgt, &system_id)?);
            }
        }
        if iscsi_support {
            for cim_iscsi_pg in cim_iscsi_pgs_of(provider, &cim_sys.path, &[])? {
                rc.extend(cim_iscsi_pg_to_lsm(
                    provider,
                    &cim_iscsi_pg,
                    &system_id,
                )?);
            }
        }
    }

    // NetApp ONTAP shares CIM_TCPProtocolEndpoint between portal groups.
    if cim_syss
        .first()
        .map(|s| s.classname() == "ONTAP_StorageSystem")
        .unwrap_or(false)
    {
        let mut seen: Vec<String> = Vec::new();
        rc.retain(|p| {
            if seen.contains(&p.id) {
                false
            } else {
                seen.push(p.id.clone());
                true
            }
        });
    }
    Ok(rc)
}
