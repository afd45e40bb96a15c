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
use super::data::RaidType;

/// Properties of `CIM_StorageExtent` describing its redundancy.
pub(crate) const RAID_EXT_PROPS: [&str; 4] = [
    "DataRedundancy",
    "PackageRedundancy",
    "NoSinglePointOfFailure",
    "ExtentStripeLength",
];

/// Classify RAID type from the redundancy settings of an extent.
///
/// Rules are checked in order, first match wins.
pub(crate) fn raid_type_of(
    data_redundancy: u64,
    package_redundancy: u64,
    no_spof: bool,
    stripe_length: u64,
) -> RaidType {
    match (data_redundancy, package_redundancy, no_spof, stripe_length) {
        (1, 0, false, 1) => RaidType::Jbod,
        (1, 0, false, s) if s >= 1 => RaidType::Raid0,
        (2, 1, true, 1) => RaidType::Raid1,
        (1, 1, true, s) if s >= 1 => RaidType::Raid5,
        (1, 2, true, s) if s >= 1 => RaidType::Raid6,
        (2, 1, true, s) if s > 1 => RaidType::Raid10,
        _ => RaidType::Unknown,
    }
}

/// RAID type of a `CIM_StorageExtent`, `Unknown` when any of
/// `RAID_EXT_PROPS` is missing.
pub(crate) fn raid_type_of_cim_ext(cim_ext: &CimInstance) -> RaidType {
    match (
        cim_ext.u64_prop("DataRedundancy"),
        cim_ext.u64_prop("PackageRedundancy"),
        cim_ext.bool_prop("NoSinglePointOfFailure"),
        cim_ext.u64_prop("ExtentStripeLength"),
    ) {
        (Some(dr), Some(pr), Some(no_spof), Some(sl)) => {
            raid_type_of(dr, pr, no_spof, sl)
        }
        _ => RaidType::Unknown,
    }
}

/// Fold the RAID types of the groups in one pool.
pub(crate) fn merge_raid_types<I>(raid_types: I) -> RaidType
where
    I: IntoIterator<Item = RaidType>,
{
    let mut rc: Option<RaidType> = None;
    for t in raid_types {
        match rc {
            None => rc = Some(t),
            Some(cur) if cur != t => return RaidType::Mixed,
            Some(_) => (),
        }
    }
    rc.unwrap_or(RaidType::Unknown)
}
