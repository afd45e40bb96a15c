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

use std::fmt;
use std::result;

use super::cim::CimError;

#[derive(Debug)]
pub enum LsmError {
    LibBug(String),
    PluginBug(String),
    TimeOut(String),
    NameConflict(String),
    ExistsInitiator(String),
    InvalidArgument(String),
    NoStateChange(String),
    NetworkConRefused(String),
    NetworkHostDown(String),
    NetworkError(String),
    NoSupport(String),
    IsMasked(String),
    NotFoundAccessGroup(String),
    NotFoundJob(String),
    NotFoundPool(String),
    NotFoundVolume(String),
    NotFoundSystem(String),
    NotFoundDisk(String),
    PluginAuthFailed(String),
    TransportCommunication(String),
    TransportSerialization(String),
    LastInitInAccessGroup(String),
    UnSupportedSearchKey(String),
    EmptyAccessGroup(String),
}

impl ::std::error::Error for LsmError {
    fn description(&self) -> &str {
        match *self {
            LsmError::LibBug(_) => "Library bug",
            LsmError::PluginBug(_) => "Plugin bug",
            LsmError::TimeOut(_) => "Timeout",
            LsmError::NameConflict(_) => "Name conflict",
            LsmError::ExistsInitiator(_) => "Initiator exists and in use",
            LsmError::InvalidArgument(_) => "Invalid argument",
            LsmError::NoStateChange(_) => "No state change",
            LsmError::NetworkConRefused(_) => "Network connection refused",
            LsmError::NetworkHostDown(_) => "Network host down",
            LsmError::NetworkError(_) => "Network error",
            LsmError::NoSupport(_) => "Not supported",
            LsmError::IsMasked(_) => "Volume masked to access group",
            LsmError::NotFoundAccessGroup(_) => "Access group not found",
            LsmError::NotFoundJob(_) => "Job not found",
            LsmError::NotFoundPool(_) => "Pool not found",
            LsmError::NotFoundVolume(_) => "Volume not found",
            LsmError::NotFoundSystem(_) => "System not found",
            LsmError::NotFoundDisk(_) => "Disk not found",
            LsmError::PluginAuthFailed(_) => "Authentication failed in plugin",
            LsmError::TransportCommunication(_) => {
                "Error when communicating with SMI-S provider"
            }
            LsmError::TransportSerialization(_) => {
                "Incorrect transport serialization"
            }
            LsmError::LastInitInAccessGroup(_) => {
                "Refused to remove the last initiator from access group"
            }
            LsmError::UnSupportedSearchKey(_) => {
                "Specified search key is not supported"
            }
            LsmError::EmptyAccessGroup(_) => {
                "Refused to mask volume to empty access group"
            }
        }
    }
}

impl fmt::Display for LsmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                LsmError::LibBug(ref x)
                | LsmError::PluginBug(ref x)
                | LsmError::TimeOut(ref x)
                | LsmError::NameConflict(ref x)
                | LsmError::ExistsInitiator(ref x)
                | LsmError::InvalidArgument(ref x)
                | LsmError::NoStateChange(ref x)
                | LsmError::NetworkConRefused(ref x)
                | LsmError::NetworkHostDown(ref x)
                | LsmError::NetworkError(ref x)
                | LsmError::NoSupport(ref x)
                | LsmError::IsMasked(ref x)
                | LsmError::NotFoundAccessGroup(ref x)
                | LsmError::NotFoundJob(ref x)
                | LsmError::NotFoundPool(ref x)
                | LsmError::NotFoundVolume(ref x)
                | LsmError::NotFoundSystem(ref x)
                | LsmError::NotFoundDisk(ref x)
                | LsmError::PluginAuthFailed(ref x)
                | LsmError::TransportCommunication(ref x)
                | LsmError::TransportSerialization(ref x)
                | LsmError::LastInitInAccessGroup(ref x)
                | LsmError::UnSupportedSearchKey(ref x)
                | LsmError::EmptyAccessGroup(ref x) => x,
            }
        )
    }
}

pub type Result<T> = result::Result<T, LsmError>;

const ERROR_NUMBER_LIB_BUG: i32 = 1;
const ERROR_NUMBER_PLUGIN_BUG: i32 = 2;
const ERROR_NUMBER_TIMEOUT: i32 = 11;
const ERROR_NUMBER_NAME_CONFLICT: i32 = 50;
const ERROR_NUMBER_EXISTS_INITIATOR: i32 = 52;
const ERROR_NUMBER_INVALID_ARGUMENT: i32 = 101;
const ERROR_NUMBER_NO_STATE_CHANGE: i32 = 125;
const ERROR_NUMBER_NETWORK_CONNREFUSED: i32 = 140;
const ERROR_NUMBER_NETWORK_HOSTDOWN: i32 = 141;
const ERROR_NUMBER_NETWORK_ERROR: i32 = 142;
const ERROR_NUMBER_NO_SUPPORT: i32 = 153;
const ERROR_NUMBER_IS_MASKED: i32 = 160;
const ERROR_NUMBER_NOT_FOUND_ACCESS_GROUP: i32 = 200;
const ERROR_NUMBER_NOT_FOUND_JOB: i32 = 202;
const ERROR_NUMBER_NOT_FOUND_POOL: i32 = 203;
const ERROR_NUMBER_NOT_FOUND_VOLUME: i32 = 205;
const ERROR_NUMBER_NOT_FOUND_SYSTEM: i32 = 208;
const ERROR_NUMBER_NOT_FOUND_DISK: i32 = 209;
const ERROR_NUMBER_PLUGIN_AUTH_FAILED: i32 = 300;
const ERROR_NUMBER_TRANSPORT_COMMUNICATION: i32 = 400;
const ERROR_NUMBER_TRANSPORT_SERIALIZATION: i32 = 401;
const ERROR_NUMBER_LAST_INIT_IN_ACCESS_GROUP: i32 = 502;
const ERROR_NUMBER_UNSUPPORTED_SEARCH_KEY: i32 = 510;
const ERROR_NUMBER_EMPTY_ACCESS_GROUP: i32 = 511;

impl LsmError {
    /// The libStorageMgmt error number carried over the RPC boundary.
    pub fn errno(&self) -> i32 {
        match *self {
            LsmError::LibBug(_) => ERROR_NUMBER_LIB_BUG,
            LsmError::PluginBug(_) => ERROR_NUMBER_PLUGIN_BUG,
            LsmError::TimeOut(_) => ERROR_NUMBER_TIMEOUT,
            LsmError::NameConflict(_) => ERROR_NUMBER_NAME_CONFLICT,
            LsmError::ExistsInitiator(_) => ERROR_NUMBER_EXISTS_INITIATOR,
            LsmError::InvalidArgument(_) => ERROR_NUMBER_INVALID_ARGUMENT,
            LsmError::NoStateChange(_) => ERROR_NUMBER_NO_STATE_CHANGE,
            LsmError::NetworkConRefused(_) => ERROR_NUMBER_NETWORK_CONNREFUSED,
            LsmError::NetworkHostDown(_) => ERROR_NUMBER_NETWORK_HOSTDOWN,
            LsmError::NetworkError(_) => ERROR_NUMBER_NETWORK_ERROR,
            LsmError::NoSupport(_) => ERROR_NUMBER_NO_SUPPORT,
            LsmError::IsMasked(_) => ERROR_NUMBER_IS_MASKED,
            LsmError::NotFoundAccessGroup(_) => {
                ERROR_NUMBER_NOT_FOUND_ACCESS_GROUP
            }
            LsmError::NotFoundJob(_) => ERROR_NUMBER_NOT_FOUND_JOB,
            LsmError::NotFoundPool(_) => ERROR_NUMBER_NOT_FOUND_POOL,
            LsmError::NotFoundVolume(_) => ERROR_NUMBER_NOT_FOUND_VOLUME,
            LsmError::NotFoundSystem(_) => ERROR_NUMBER_NOT_FOUND_SYSTEM,
            LsmError::NotFoundDisk(_) => ERROR_NUMBER_NOT_FOUND_DISK,
            LsmError::PluginAuthFailed(_) => ERROR_NUMBER_PLUGIN_AUTH_FAILED,
            LsmError::TransportCommunication(_) => {
                ERROR_NUMBER_TRANSPORT_COMMUNICATION
            }
            LsmError::TransportSerialization(_) => {
                ERROR_NUMBER_TRANSPORT_SERIALIZATION
            }
            LsmError::LastInitInAccessGroup(_) => {
                ERROR_NUMBER_LAST_INIT_IN_ACCESS_GROUP
            }
            LsmError::UnSupportedSearchKey(_) => {
                ERROR_NUMBER_UNSUPPORTED_SEARCH_KEY
            }
            LsmError::EmptyAccessGroup(_) => ERROR_NUMBER_EMPTY_ACCESS_GROUP,
        }
    }
}

impl From<::serde_json::Error> for LsmError {
    fn from(e: ::serde_json::Error) -> Self {
        LsmError::TransportSerialization(format!(
            "Failed to serialize CIM data: {}",
            e
        ))
    }
}

impl From<::std::io::Error> for LsmError {
    fn from(e: ::std::io::Error) -> Self {
        LsmError::TransportCommunication(format!("{}", e))
    }
}

impl From<::regex::Error> for LsmError {
    fn from(e: ::regex::Error) -> Self {
        LsmError::LibBug(format!("Regex error: {}", e))
    }
}

const ERRNO_CONNREFUSED: i32 = 111;
const ERRNO_CONNRESET: i32 = 104;
const ERRNO_HOSTUNREACH: i32 = 113;

// No raw provider fault crosses the public API. Callers that understand a
// particular CIM status code match on `CimError` before converting.
impl From<CimError> for LsmError {
    fn from(e: CimError) -> Self {
        match e {
            CimError::Socket(ERRNO_CONNREFUSED, _) => {
                LsmError::NetworkConRefused("Connection refused".to_string())
            }
            CimError::Socket(ERRNO_CONNRESET, _) => {
                LsmError::NetworkConRefused(
                    "Connection reset by peer".to_string(),
                )
            }
            CimError::Socket(ERRNO_HOSTUNREACH, _) => {
                LsmError::NetworkHostDown("Host is down".to_string())
            }
            CimError::Socket(errno, msg) => LsmError::NetworkError(format!(
                "Socket error {}: {}",
                errno, msg
            )),
            CimError::Ssl(msg)
            | CimError::BadStatusLine(msg)
            | CimError::Http(msg) => LsmError::TransportCommunication(msg),
            CimError::Auth(_) => {
                LsmError::PluginAuthFailed("Unauthorized user".to_string())
            }
            CimError::Connection(msg) => LsmError::NetworkError(msg),
            CimError::Cim(code, msg) => LsmError::PluginBug(format!(
                "CIM error {}: {}",
                code, msg
            )),
        }
    }
}

pub(crate) trait OkOrPlugBug<T> {
    fn ok_or_plugin_bug(self, msg: &str) -> Result<T>;
}

impl<T> OkOrPlugBug<T> for Option<T> {
    fn ok_or_plugin_bug(self, msg: &str) -> Result<T> {
        match self {
            Some(i) => Ok(i),
            None => Err(LsmError::PluginBug(format!(
                "SMI-S provider returned unexpected data: {}",
                msg
            ))),
        }
    }
}
