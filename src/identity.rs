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

//! Stable opaque IDs for CIM objects.

use sha2::{Digest, Sha256};
use tracing::debug;

use super::cim::{CimInstance, CimValue, WbemConnection};
use super::error::*;

/// Kinds of CIM objects the engine hands out IDs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    System,
    Pool,
    Volume,
    Disk,
    Job,
    /// `CIM_SCSIProtocolController` used as access group.
    AccessGroupSpc,
    /// `CIM_InitiatorMaskingGroup` used as access group.
    AccessGroupInitMg,
    FcPort,
    Initiator,
}

enum IdEncoding {
    Verbatim,
    Digest,
}

struct KindInfo {
    keys: &'static [&'static str],
    encoding: IdEncoding,
}

impl ResourceKind {
    fn info(self) -> KindInfo {
        match self {
            ResourceKind::System => KindInfo {
                keys: &["Name"],
                encoding: IdEncoding::Verbatim,
            },
            ResourceKind::Pool => KindInfo {
                keys: &["InstanceID"],
                encoding: IdEncoding::Verbatim,
            },
            ResourceKind::Initiator => KindInfo {
                keys: &["StorageID"],
                encoding: IdEncoding::Verbatim,
            },
            ResourceKind::Volume | ResourceKind::Disk => KindInfo {
                keys: &["SystemName", "DeviceID"],
                encoding: IdEncoding::Digest,
            },
            // Provider internal handles, meaningless to users.
            ResourceKind::Job | ResourceKind::AccessGroupInitMg => KindInfo {
                keys: &["InstanceID"],
                encoding: IdEncoding::Digest,
            },
            ResourceKind::AccessGroupSpc | ResourceKind::FcPort => KindInfo {
                keys: &["DeviceID"],
                encoding: IdEncoding::Digest,
            },
        }
    }

    /// Properties required to derive the ID.
    pub fn key_props(self) -> &'static [&'static str] {
        self.info().keys
    }
}

/// Lower case hex SHA-256 of the parts. Each part is prefixed with its
/// length so that moving bytes between adjacent parts changes the digest.
pub(crate) fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update((p.len() as u64).to_le_bytes());
        hasher.update(p.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn key_value(inst: &CimInstance, key: &str) -> Option<String> {
    match inst.get(key)? {
        CimValue::Str(s) => Some(s.clone()),
        CimValue::Uint(i) => Some(i.to_string()),
        CimValue::Sint(i) => Some(i.to_string()),
        _ => None,
    }
}

/// ID of `inst` when all key properties are present.
pub fn id_of(kind: ResourceKind, inst: &CimInstance) -> Option<String> {
    let info = kind.info();
    let mut vals = Vec::with_capacity(info.keys.len());
    for key in info.keys {
        vals.push(key_value(inst, key)?);
    }
    match info.encoding {
        IdEncoding::Verbatim if vals.len() == 1 => vals.pop(),
        _ => {
            let parts: Vec<&str> = vals.iter().map(String::as_str).collect();
            Some(digest(&parts))
        }
    }
}

/// Resolve the ID of `inst`, fetching the key properties again when the
/// instance was retrieved without them.
pub fn resolve(
    conn: &dyn WbemConnection,
    kind: ResourceKind,
    inst: &CimInstance,
) -> Result<String> {
    if let Some(id) = id_of(kind, inst) {
        return Ok(id);
    }
    debug!(
        "{:?} {} lacks key properties {:?}, fetching again",
        kind,
        inst.path,
        kind.key_props()
    );
    let fresh = conn.get_instance(&inst.path, Some(kind.key_props()))?;
    id_of(kind, &fresh).ok_or_else(|| {
        LsmError::NoSupport(format!(
            "{} does not provide {:?} required for {:?} ID",
            inst.classname(),
            kind.key_props(),
            kind
        ))
    })
}
