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

use regex::Regex;

use super::cim::CimPath;
use super::data::InitiatorType;
use super::error::*;

const REGEX_WWPN: &str = r"(?x)
    ^(?:0x|0X)?(?:[0-9A-Fa-f]{2})
    (?:(?:[\.:\-])?[0-9A-Fa-f]{2}){7}$
    ";

const REGEX_VPD83: &str = r"^(?:6[0-9a-f]{31}|[235][0-9a-f]{15})$";

pub(crate) fn verify_init_id_str(
    init_id: &str,
    init_type: InitiatorType,
) -> Result<()> {
    let valid: bool = match init_type {
        InitiatorType::Wwpn => Regex::new(REGEX_WWPN)?.is_match(init_id),
        InitiatorType::IscsiIqn => is_iscsi_name(init_id),
        _ => {
            return Err(LsmError::InvalidArgument(format!(
                "Invalid init_type {}, should be \
                 InitiatorType::Wwpn or InitiatorType::IscsiIqn.",
                init_type as i32
            )))
        }
    };
    if valid {
        Ok(())
    } else {
        Err(LsmError::InvalidArgument(format!(
            "Invalid initiator ID string '{}'",
            init_id
        )))
    }
}

fn is_iscsi_name(init_id: &str) -> bool {
    init_id.starts_with("iqn")
        || init_id.starts_with("eui")
        || init_id.starts_with("naa")
}

/// Guess the initiator type and return the ID in libStorageMgmt format:
/// WWPN in lower case split by `:` every two digits, iSCSI names untouched.
pub(crate) fn init_id_normalize(
    init_id: &str,
) -> Result<Option<(InitiatorType, String)>> {
    if is_iscsi_name(init_id) {
        return Ok(Some((InitiatorType::IscsiIqn, init_id.to_string())));
    }
    if Regex::new(REGEX_WWPN)?.is_match(init_id) {
        let s = init_id.to_lowercase();
        let s = s.trim_start_matches("0x");
        let digits: Vec<char> = s.chars().filter(char::is_ascii_hexdigit).collect();
        let pairs: Vec<String> = digits
            .chunks(2)
            .map(|c| c.iter().collect::<String>())
            .collect();
        return Ok(Some((InitiatorType::Wwpn, pairs.join(":"))));
    }
    Ok(None)
}

/// SNIA expects WWPN as 16 upper case hex digits without separator.
pub(crate) fn init_id_to_snia(init_id: &str) -> Result<String> {
    match init_id_normalize(init_id)? {
        Some((InitiatorType::Wwpn, wwpn)) => {
            Ok(wwpn.replace(':', "").to_uppercase())
        }
        _ => Ok(init_id.to_string()),
    }
}

/// Lower case `hex_str` truncated to `length` and joined by `:` every
/// `every` characters.
pub(crate) fn hex_string_format(
    hex_str: &str,
    length: usize,
    every: usize,
) -> String {
    let chars: Vec<char> = hex_str.to_lowercase().chars().take(length).collect();
    chars
        .chunks(every.max(1))
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>()
        .join(":")
}

pub(crate) fn vpd83_verify(vpd83: &str) -> Result<bool> {
    Ok(!vpd83.is_empty() && Regex::new(REGEX_VPD83)?.is_match(vpd83))
}

/// Serialize a CIM path for `plugin_data`.
pub(crate) fn cim_path_to_path_str(path: &CimPath) -> Result<String> {
    Ok(::serde_json::to_string(path)?)
}

pub(crate) fn path_str_to_cim_path(path_str: &str) -> Result<CimPath> {
    Ok(::serde_json::from_str(path_str)?)
}
