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

//! Typed view of the CIM/WBEM object model and the connection contract the
//! engine consumes.
//!
//! Wire encoding (CIM-XML over HTTP) lives outside this crate. Anything able
//! to enumerate, traverse associations and invoke extrinsic methods can be
//! plugged in by implementing [`WbemConnection`][1].
//!
//! [1]: trait.WbemConnection.html

use std::collections::BTreeMap;
use std::fmt;
use std::result;

/// CIM status codes defined by DSP0200.
pub const CIM_ERR_FAILED: u32 = 1;
pub const CIM_ERR_ACCESS_DENIED: u32 = 2;
pub const CIM_ERR_INVALID_NAMESPACE: u32 = 3;
pub const CIM_ERR_INVALID_PARAMETER: u32 = 4;
pub const CIM_ERR_INVALID_CLASS: u32 = 5;
pub const CIM_ERR_NOT_FOUND: u32 = 6;
pub const CIM_ERR_NOT_SUPPORTED: u32 = 7;
pub const CIM_ERR_METHOD_NOT_AVAILABLE: u32 = 16;

/// Faults raised by the WBEM client.
#[derive(Debug, Clone, PartialEq)]
pub enum CimError {
    /// CIM status code and description returned by the provider.
    Cim(u32, String),
    /// Socket level failure carrying the OS errno.
    Socket(i32, String),
    Ssl(String),
    BadStatusLine(String),
    Http(String),
    Auth(String),
    /// Any other transport failure.
    Connection(String),
}

impl CimError {
    pub fn cim_code(&self) -> Option<u32> {
        match *self {
            CimError::Cim(code, _) => Some(code),
            _ => None,
        }
    }

    pub(crate) fn is_cim(&self, codes: &[u32]) -> bool {
        match self.cim_code() {
            Some(c) => codes.contains(&c),
            None => false,
        }
    }
}

impl fmt::Display for CimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CimError::Cim(code, ref msg) => {
                write!(f, "CIM error {}: {}", code, msg)
            }
            CimError::Socket(errno, ref msg) => {
                write!(f, "Socket error {}: {}", errno, msg)
            }
            CimError::Ssl(ref msg) => write!(f, "SSL error: {}", msg),
            CimError::BadStatusLine(ref msg) => {
                write!(f, "Bad status line: {}", msg)
            }
            CimError::Http(ref msg) => write!(f, "HTTP error: {}", msg),
            CimError::Auth(ref msg) => write!(f, "Auth error: {}", msg),
            CimError::Connection(ref msg) => write!(f, "{}", msg),
        }
    }
}

impl ::std::error::Error for CimError {}

pub type CimResult<T> = result::Result<T, CimError>;

/// A CIM property or parameter value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum CimValue {
    Null,
    Bool(bool),
    Uint(u64),
    Sint(i64),
    Str(String),
    Path(CimPath),
    Array(Vec<CimValue>),
}

impl CimValue {
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            CimValue::Str(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            CimValue::Uint(i) => Some(i),
            CimValue::Sint(i) if i >= 0 => Some(i as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            CimValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&CimPath> {
        match *self {
            CimValue::Path(ref p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CimValue]> {
        match *self {
            CimValue::Array(ref a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == CimValue::Null
    }
}

impl From<&str> for CimValue {
    fn from(s: &str) -> Self {
        CimValue::Str(s.to_string())
    }
}

impl From<String> for CimValue {
    fn from(s: String) -> Self {
        CimValue::Str(s)
    }
}

impl From<u64> for CimValue {
    fn from(i: u64) -> Self {
        CimValue::Uint(i)
    }
}

impl From<u32> for CimValue {
    fn from(i: u32) -> Self {
        CimValue::Uint(u64::from(i))
    }
}

impl From<u16> for CimValue {
    fn from(i: u16) -> Self {
        CimValue::Uint(u64::from(i))
    }
}

impl From<bool> for CimValue {
    fn from(b: bool) -> Self {
        CimValue::Bool(b)
    }
}

impl From<CimPath> for CimValue {
    fn from(p: CimPath) -> Self {
        CimValue::Path(p)
    }
}

impl<T: Into<CimValue>> From<Vec<T>> for CimValue {
    fn from(v: Vec<T>) -> Self {
        CimValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Instance name: class plus key bindings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CimPath {
    pub classname: String,
    pub namespace: Option<String>,
    pub host: Option<String>,
    pub keybindings: BTreeMap<String, CimValue>,
}

impl CimPath {
    pub fn new(classname: &str) -> CimPath {
        CimPath {
            classname: classname.to_string(),
            namespace: None,
            host: None,
            keybindings: BTreeMap::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> CimPath {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn with_key<V: Into<CimValue>>(mut self, key: &str, val: V) -> CimPath {
        self.keybindings.insert(key.to_string(), val.into());
        self
    }

    /// Compare class and key bindings only. Providers do not always fill
    /// host and namespace consistently between calls.
    pub fn same_object(&self, other: &CimPath) -> bool {
        self.classname.eq_ignore_ascii_case(&other.classname)
            && self.keybindings == other.keybindings
    }
}

impl fmt::Display for CimPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref host) = self.host {
            write!(f, "//{}/", host)?;
        }
        if let Some(ref ns) = self.namespace {
            write!(f, "{}:", ns)?;
        }
        write!(f, "{}", self.classname)?;
        let mut first = true;
        for (k, v) in &self.keybindings {
            write!(f, "{}{}=", if first { "." } else { "," }, k)?;
            match *v {
                CimValue::Str(ref s) => write!(f, "\"{}\"", s)?,
                CimValue::Uint(i) => write!(f, "{}", i)?,
                CimValue::Sint(i) => write!(f, "{}", i)?,
                CimValue::Bool(b) => write!(f, "{}", b)?,
                _ => write!(f, "{:?}", v)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Named parameters of an extrinsic method call, input or output.
pub type CimParams = BTreeMap<String, CimValue>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CimInstance {
    pub path: CimPath,
    pub properties: BTreeMap<String, CimValue>,
}

impl CimInstance {
    pub fn new(path: CimPath) -> CimInstance {
        CimInstance {
            path,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_prop<V: Into<CimValue>>(
        mut self,
        name: &str,
        val: V,
    ) -> CimInstance {
        self.properties.insert(name.to_string(), val.into());
        self
    }

    pub fn classname(&self) -> &str {
        &self.path.classname
    }

    /// Property value, falling back to the key bindings of the path.
    /// NULL values are reported as absent.
    pub fn get(&self, name: &str) -> Option<&CimValue> {
        let val = match self.properties.get(name) {
            Some(v) => Some(v),
            None => self.path.keybindings.get(name),
        };
        match val {
            Some(v) if !v.is_null() => Some(v),
            _ => None,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn str_prop(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(CimValue::as_str)
    }

    pub fn u64_prop(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(CimValue::as_u64)
    }

    pub fn bool_prop(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(CimValue::as_bool)
    }

    pub fn path_prop(&self, name: &str) -> Option<&CimPath> {
        self.get(name).and_then(CimValue::as_path)
    }

    /// Integer array property. A scalar is treated as a one element array.
    pub fn u64_list(&self, name: &str) -> Option<Vec<u64>> {
        match self.get(name)? {
            CimValue::Array(a) => Some(a.iter().filter_map(CimValue::as_u64).collect()),
            v => v.as_u64().map(|i| vec![i]),
        }
    }

    pub fn str_list(&self, name: &str) -> Option<Vec<String>> {
        match self.get(name)? {
            CimValue::Array(a) => Some(
                a.iter()
                    .filter_map(CimValue::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            v => v.as_str().map(|s| vec![s.to_string()]),
        }
    }
}

/// Filters of an Associators or AssociatorNames request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssocQuery<'a> {
    pub assoc_class: Option<&'a str>,
    pub result_class: Option<&'a str>,
    pub role: Option<&'a str>,
    pub result_role: Option<&'a str>,
}

impl<'a> AssocQuery<'a> {
    pub fn new(assoc_class: &'a str) -> AssocQuery<'a> {
        AssocQuery {
            assoc_class: Some(assoc_class),
            ..Default::default()
        }
    }

    pub fn result_class(mut self, result_class: &'a str) -> AssocQuery<'a> {
        self.result_class = Some(result_class);
        self
    }

    pub fn role(mut self, role: &'a str) -> AssocQuery<'a> {
        self.role = Some(role);
        self
    }

    pub fn result_role(mut self, result_role: &'a str) -> AssocQuery<'a> {
        self.result_role = Some(result_role);
        self
    }
}

/// Operations the engine needs from a WBEM client.
///
/// All calls are synchronous request/response. Implementations must
/// serialize concurrent use themselves if they allow it.
pub trait WbemConnection {
    fn enumerate_instances(
        &self,
        class_name: &str,
        namespace: &str,
        property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>>;

    fn enumerate_instance_names(
        &self,
        class_name: &str,
        namespace: &str,
    ) -> CimResult<Vec<CimPath>>;

    fn get_instance(
        &self,
        path: &CimPath,
        property_list: Option<&[&str]>,
    ) -> CimResult<CimInstance>;

    fn associators(
        &self,
        path: &CimPath,
        query: &AssocQuery,
        property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>>;

    fn associator_names(
        &self,
        path: &CimPath,
        query: &AssocQuery,
    ) -> CimResult<Vec<CimPath>>;

    fn references(
        &self,
        path: &CimPath,
        result_class: Option<&str>,
        property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>>;

    /// Invoke an extrinsic method, returning the method return code and
    /// output parameters.
    fn invoke_method(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
    ) -> CimResult<(u32, CimParams)>;

    fn delete_instance(&self, path: &CimPath) -> CimResult<()>;

    /// Request timeout in milliseconds.
    fn set_timeout(&self, _ms: u32) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Connection to a provider that has nothing: enumerations fail with a
    /// CIM status and invocations succeed without output.
    pub(crate) struct NoConn;

    impl WbemConnection for NoConn {
        fn enumerate_instances(
            &self,
            _: &str,
            _: &str,
            _: Option<&[&str]>,
        ) -> CimResult<Vec<CimInstance>> {
            Err(CimError::Cim(CIM_ERR_NOT_SUPPORTED, String::new()))
        }
        fn enumerate_instance_names(
            &self,
            _: &str,
            _: &str,
        ) -> CimResult<Vec<CimPath>> {
            Err(CimError::Cim(CIM_ERR_INVALID_CLASS, String::new()))
        }
        fn get_instance(
            &self,
            p: &CimPath,
            _: Option<&[&str]>,
        ) -> CimResult<CimInstance> {
            Ok(CimInstance::new(p.clone()))
        }
        fn associators(
            &self,
            _: &CimPath,
            _: &AssocQuery,
            _: Option<&[&str]>,
        ) -> CimResult<Vec<CimInstance>> {
            Ok(Vec::new())
        }
        fn associator_names(
            &self,
            _: &CimPath,
            _: &AssocQuery,
        ) -> CimResult<Vec<CimPath>> {
            Ok(Vec::new())
        }
        fn references(
            &self,
            _: &CimPath,
            _: Option<&str>,
            _: Option<&[&str]>,
        ) -> CimResult<Vec<CimInstance>> {
            Ok(Vec::new())
        }
        fn invoke_method(
            &self,
            _: &str,
            _: &CimPath,
            _: &CimParams,
        ) -> CimResult<(u32, CimParams)> {
            Ok((0, CimParams::new()))
        }
        fn delete_instance(&self, _: &CimPath) -> CimResult<()> {
            Ok(())
        }
    }
}
