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

//! Profile registry negotiation.
//!
//! A provider advertises the SNIA profiles it implements through
//! `CIM_RegisteredProfile` in its interop namespace. Providers without a
//! usable registry are handled in fallback mode, where support of a profile
//! is guessed by enumerating the class mandatory for it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::cim::{
    AssocQuery, CimError, CimPath, WbemConnection, CIM_ERR_INVALID_CLASS,
    CIM_ERR_INVALID_NAMESPACE, CIM_ERR_METHOD_NOT_AVAILABLE,
    CIM_ERR_NOT_SUPPORTED,
};
use super::config::SmisConfig;
use super::dmtf::{INTEROP_NAMESPACES, REG_ORG_SNIA};
use super::error::*;

const MEGARAID_NAMESPACE: &str = "root/LsiMr13";
const NETAPP_E_NAMESPACE: &str = "root/LsiArray13";

/// SMI-S version of a registered profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProfileVersion {
    major: u32,
    minor: u32,
    revision: u32,
}

impl ProfileVersion {
    pub const V1_1: ProfileVersion = ProfileVersion::new(1, 1, 0);
    pub const V1_4: ProfileVersion = ProfileVersion::new(1, 4, 0);
    pub const V1_5: ProfileVersion = ProfileVersion::new(1, 5, 0);
    pub const V1_6: ProfileVersion = ProfileVersion::new(1, 6, 0);

    pub const fn new(major: u32, minor: u32, revision: u32) -> ProfileVersion {
        ProfileVersion {
            major,
            minor,
            revision,
        }
    }

    /// "1.5.1" is 1_005_001.
    pub fn as_num(&self) -> u64 {
        u64::from(self.major) * 1_000_000
            + u64::from(self.minor) * 1_000
            + u64::from(self.revision)
    }
}

impl FromStr for ProfileVersion {
    type Err = LsmError;

    fn from_str(s: &str) -> Result<ProfileVersion> {
        let nums: ::std::result::Result<Vec<u32>, _> =
            s.trim().split('.').map(str::parse::<u32>).collect();
        match nums {
            Ok(ref n) if n.len() == 2 => Ok(ProfileVersion::new(n[0], n[1], 0)),
            Ok(ref n) if n.len() == 3 => {
                Ok(ProfileVersion::new(n[0], n[1], n[2]))
            }
            _ => Err(LsmError::PluginBug(format!(
                "Invalid registered profile version '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for ProfileVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.revision == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Profile {
    Array,
    BlockServices,
    DiskDriveLite,
    MultipleComputerSystem,
    MaskingAndMapping,
    GroupMaskingAndMapping,
    FcTargetPorts,
    IscsiTargetPorts,
    DiskSparing,
}

const ALL_PROFILES: [Profile; 9] = [
    Profile::Array,
    Profile::BlockServices,
    Profile::DiskDriveLite,
    Profile::MultipleComputerSystem,
    Profile::MaskingAndMapping,
    Profile::GroupMaskingAndMapping,
    Profile::FcTargetPorts,
    Profile::IscsiTargetPorts,
    Profile::DiskSparing,
];

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Array => "Array",
            Profile::BlockServices => "Block Services",
            Profile::DiskDriveLite => "Disk Drive Lite",
            Profile::MultipleComputerSystem => "Multiple Computer System",
            Profile::MaskingAndMapping => "Masking and Mapping",
            Profile::GroupMaskingAndMapping => "Group Masking and Mapping",
            Profile::FcTargetPorts => "FC Target Ports",
            Profile::IscsiTargetPorts => "iSCSI Target Ports",
            Profile::DiskSparing => "Disk Sparing",
        }
    }

    // Spellings seen in the wild besides the SNIA one.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Profile::FcTargetPorts => &["FC Target Port"],
            Profile::BlockServices => &["Block Services Package"],
            _ => &[],
        }
    }

    fn from_registered_name(name: &str) -> Option<Profile> {
        ALL_PROFILES.iter().cloned().find(|p| {
            p.name() == name || p.aliases().iter().any(|a| *a == name)
        })
    }

    /// Class whose presence implies the profile in fallback mode.
    fn fallback_class(self) -> &'static str {
        match self {
            Profile::Array => "CIM_ComputerSystem",
            Profile::BlockServices => "CIM_StorageConfigurationService",
            Profile::DiskDriveLite => "CIM_DiskDrive",
            Profile::MultipleComputerSystem => "CIM_ComponentCS",
            Profile::MaskingAndMapping => "CIM_ControllerConfigurationService",
            Profile::GroupMaskingAndMapping => "CIM_GroupMaskingMappingService",
            Profile::FcTargetPorts => "CIM_FCPort",
            Profile::IscsiTargetPorts => "CIM_iSCSIProtocolEndpoint",
            Profile::DiskSparing => "CIM_StorageRedundancySet",
        }
    }
}

/// Vendor families needing special treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Generic,
    /// LSI MegaRAID provider.
    MegaRaid,
    /// NetApp E-Series (LSI Engenio) provider.
    NetAppE,
}

/// Outcome of profile negotiation, fixed for the lifetime of a connection.
#[derive(Debug, Clone)]
pub struct NegotiatedSession {
    fallback: bool,
    vendor: Vendor,
    profiles: BTreeMap<Profile, ProfileVersion>,
    root_profile: Option<CimPath>,
    namespace: String,
}

fn is_tolerated_namespace_error(e: &CimError) -> bool {
    e.is_cim(&[
        CIM_ERR_NOT_SUPPORTED,
        CIM_ERR_INVALID_NAMESPACE,
        CIM_ERR_INVALID_CLASS,
    ])
}

type ProfileRegistry = (BTreeMap<Profile, ProfileVersion>, Option<CimPath>);

/// Load SNIA profiles from the first interop namespace that has any.
/// Return `None` when no namespace exposes a profile registry.
fn profile_register_load(
    conn: &dyn WbemConnection,
) -> Result<Option<ProfileRegistry>> {
    let mut cim_rps = Vec::new();
    for namespace in INTEROP_NAMESPACES.iter() {
        match conn.enumerate_instances(
            "CIM_RegisteredProfile",
            namespace,
            Some(&[
                "RegisteredName",
                "RegisteredVersion",
                "RegisteredOrganization",
            ]),
        ) {
            Ok(i) => cim_rps = i,
            Err(ref e) if is_tolerated_namespace_error(e) => {
                debug!("No profile registry in namespace {}: {}", namespace, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        if !cim_rps.is_empty() {
            break;
        }
    }
    if cim_rps.is_empty() {
        return Ok(None);
    }

    let mut profiles: BTreeMap<Profile, ProfileVersion> = BTreeMap::new();
    let mut root_profile = None;
    for cim_rp in &cim_rps {
        if cim_rp.u64_prop("RegisteredOrganization") != Some(REG_ORG_SNIA) {
            continue;
        }
        let profile = match cim_rp
            .str_prop("RegisteredName")
            .and_then(Profile::from_registered_name)
        {
            Some(p) => p,
            None => continue,
        };
        let ver: ProfileVersion = match cim_rp.str_prop("RegisteredVersion") {
            Some(v) => match v.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!("Ignoring {} with version '{}'", profile.name(), v);
                    continue;
                }
            },
            None => continue,
        };
        if let Some(exist) = profiles.get(&profile) {
            if exist.as_num() >= ver.as_num() {
                continue;
            }
        }
        if profile == Profile::Array {
            root_profile = Some(cim_rp.path.clone());
        }
        profiles.insert(profile, ver);
    }
    Ok(Some((profiles, root_profile)))
}

impl NegotiatedSession {
    /// Discover which SNIA profiles the provider implements.
    pub fn negotiate(
        conn: &dyn WbemConnection,
        cfg: &SmisConfig,
    ) -> Result<NegotiatedSession> {
        let vendor = if cfg.namespace.eq_ignore_ascii_case(MEGARAID_NAMESPACE) {
            Vendor::MegaRaid
        } else if cfg.namespace.eq_ignore_ascii_case(NETAPP_E_NAMESPACE) {
            Vendor::NetAppE
        } else {
            Vendor::Generic
        };

        let mut session = NegotiatedSession {
            fallback: false,
            vendor,
            profiles: BTreeMap::new(),
            root_profile: None,
            namespace: cfg.namespace.clone(),
        };

        if vendor == Vendor::MegaRaid {
            // The MegaRAID provider is slow on registry queries and its
            // profile set is fixed.
            for p in &[
                Profile::Array,
                Profile::BlockServices,
                Profile::DiskDriveLite,
            ] {
                session.profiles.insert(*p, ProfileVersion::V1_4);
            }
        } else if cfg.force_fallback {
            info!("Profile registry skipped on request, using fallback mode");
            session.fallback = true;
        } else {
            match profile_register_load(conn)? {
                Some((profiles, root_profile)) => {
                    session.profiles = profiles;
                    session.root_profile = root_profile;
                }
                None => {
                    info!(
                        "SMI-S provider has no profile registry, \
                         using fallback mode"
                    );
                    session.fallback = true;
                }
            }
        }

        if vendor == Vendor::NetAppE && !session.fallback {
            // Declared as 1.0 and 1.2 which do not define these profiles.
            for p in &[
                Profile::FcTargetPorts,
                Profile::IscsiTargetPorts,
                Profile::MaskingAndMapping,
            ] {
                session.profiles.insert(*p, ProfileVersion::V1_4);
            }
        }

        if !session.fallback {
            session.profile_check(
                conn,
                Profile::Array,
                ProfileVersion::V1_4,
                true,
            )?;
            session.namespace = session.vendor_namespace(conn, cfg)?;
        }
        debug!(
            "Negotiated SMI-S session: fallback {}, vendor {:?}, \
             namespace {}, profiles {:?}",
            session.fallback, session.vendor, session.namespace, session.profiles
        );
        Ok(session)
    }

    fn vendor_namespace(
        &self,
        conn: &dyn WbemConnection,
        cfg: &SmisConfig,
    ) -> Result<String> {
        let in_interop = INTEROP_NAMESPACES
            .iter()
            .any(|ns| ns.eq_ignore_ascii_case(&cfg.namespace));
        if !in_interop {
            return Ok(cfg.namespace.clone());
        }
        let root_profile = match self.root_profile {
            Some(ref p) => p,
            None => return Ok(cfg.namespace.clone()),
        };
        let cim_sys_paths = conn.associator_names(
            root_profile,
            &AssocQuery::new("CIM_ElementConformsToProfile")
                .result_class("CIM_ComputerSystem"),
        )?;
        match cim_sys_paths.first() {
            Some(p) => Ok(p
                .namespace
                .clone()
                .unwrap_or_else(|| cfg.namespace.clone())),
            None => Err(LsmError::NoSupport(format!(
                "Target SMI-S provider does not support any \
                 CIM_ComputerSystem for SNIA SMI-S '{}' profile",
                Profile::Array.name()
            ))),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Namespace holding the array objects.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path of the `Array` registered profile, `None` in fallback mode and
    /// for MegaRAID.
    pub fn root_profile(&self) -> Option<&CimPath> {
        self.root_profile.as_ref()
    }

    /// Return the supported version of `profile`.
    ///
    /// With `strict` only `min_ver` itself is accepted, otherwise any later
    /// version is accepted too. In fallback mode the mandatory class of the
    /// profile is looked up and `min_ver` is reported when present.
    pub fn is_profile_supported(
        &self,
        conn: &dyn WbemConnection,
        profile: Profile,
        min_ver: ProfileVersion,
        strict: bool,
    ) -> Result<Option<ProfileVersion>> {
        if self.fallback {
            return self.check_profile_class(conn, profile, min_ver);
        }
        Ok(match self.profiles.get(&profile) {
            Some(ver) if strict && *ver == min_ver => Some(*ver),
            Some(ver) if !strict && ver.as_num() >= min_ver.as_num() => {
                Some(*ver)
            }
            _ => None,
        })
    }

    fn check_profile_class(
        &self,
        conn: &dyn WbemConnection,
        profile: Profile,
        min_ver: ProfileVersion,
    ) -> Result<Option<ProfileVersion>> {
        match conn.enumerate_instance_names(
            profile.fallback_class(),
            &self.namespace,
        ) {
            Ok(ref paths) if !paths.is_empty() => Ok(Some(min_ver)),
            Ok(_) => Ok(None),
            Err(ref e)
                if e.is_cim(&[
                    CIM_ERR_NOT_SUPPORTED,
                    CIM_ERR_INVALID_CLASS,
                    CIM_ERR_INVALID_NAMESPACE,
                    CIM_ERR_METHOD_NOT_AVAILABLE,
                ]) =>
            {
                debug!(
                    "Fallback check of {} failed: {}",
                    profile.fallback_class(),
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Non-strict check, optionally turning absence into `NoSupport`.
    pub fn profile_check(
        &self,
        conn: &dyn WbemConnection,
        profile: Profile,
        min_ver: ProfileVersion,
        raise_error: bool,
    ) -> Result<bool> {
        match self.is_profile_supported(conn, profile, min_ver, false)? {
            Some(_) => Ok(true),
            None if raise_error => {
                let found = match self.profiles.get(&profile) {
                    Some(v) => format!(" Only version {} is supported", v),
                    None => String::new(),
                };
                Err(LsmError::NoSupport(format!(
                    "SNIA SMI-S {} '{}' profile is not supported by \
                     target SMI-S provider.{}",
                    profile.name(),
                    min_ver,
                    found
                )))
            }
            None => Ok(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_profiles(
        profiles: &[(Profile, ProfileVersion)],
        vendor: Vendor,
    ) -> NegotiatedSession {
        NegotiatedSession {
            fallback: false,
            vendor,
            profiles: profiles.iter().cloned().collect(),
            root_profile: None,
            namespace: "root/test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::testing::NoConn;

    #[test]
    fn version_parse_and_order() {
        let v: ProfileVersion = "1.5.1".parse().unwrap();
        assert_eq!(v.as_num(), 1_005_001);
        let v14: ProfileVersion = "1.4".parse().unwrap();
        assert_eq!(v14, ProfileVersion::V1_4);
        assert!(v14 < v);
        assert_eq!(format!("{}", v), "1.5.1");
        assert!("1.x".parse::<ProfileVersion>().is_err());
        assert!("1".parse::<ProfileVersion>().is_err());
    }

    #[test]
    fn strict_and_non_strict_checks() {
        let session = NegotiatedSession::with_profiles(
            &[(Profile::Array, ProfileVersion::V1_6)],
            Vendor::Generic,
        );
        let v = session
            .is_profile_supported(
                &NoConn,
                Profile::Array,
                ProfileVersion::V1_4,
                false,
            ).unwrap();
        assert_eq!(v, Some(ProfileVersion::V1_6));
        assert!(
            session
                .is_profile_supported(
                    &NoConn,
                    Profile::Array,
                    ProfileVersion::V1_5,
                    true
                ).unwrap()
                .is_none()
        );
        assert!(
            session
                .is_profile_supported(
                    &NoConn,
                    Profile::Array,
                    ProfileVersion::V1_6,
                    true
                ).unwrap()
                .is_some()
        );
        assert!(
            !session
                .profile_check(
                    &NoConn,
                    Profile::MaskingAndMapping,
                    ProfileVersion::V1_4,
                    false
                ).unwrap()
        );
        match session.profile_check(
            &NoConn,
            Profile::MaskingAndMapping,
            ProfileVersion::V1_4,
            true,
        ) {
            Err(LsmError::NoSupport(_)) => (),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(
            Profile::from_registered_name("FC Target Port"),
            Some(Profile::FcTargetPorts)
        );
        assert_eq!(Profile::from_registered_name("Unknown"), None);
    }

    #[test]
    fn no_registry_means_fallback() {
        let cfg = SmisConfig::from_uri("smispy://host", None, None).unwrap();
        let session = NegotiatedSession::negotiate(&NoConn, &cfg).unwrap();
        assert!(session.is_fallback());
        assert!(
            session
                .is_profile_supported(
                    &NoConn,
                    Profile::MaskingAndMapping,
                    ProfileVersion::V1_4,
                    false
                ).unwrap()
                .is_none()
        );
    }
}
