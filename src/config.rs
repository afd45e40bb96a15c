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

use std::path::PathBuf;
use std::time::Duration;

use url;

use super::dmtf::DEFAULT_NAMESPACE;
use super::error::*;

const DEFAULT_TIMEOUT: u32 = 30_000;
const DEFAULT_HTTP_PORT: u16 = 5988;
const DEFAULT_HTTPS_PORT: u16 = 5989;
const DEFAULT_JOB_POLL_INTERVAL: u64 = 5;
const DEFAULT_JOB_POLL_MAX: u32 = 60;

/// Connection settings taken from a `smispy://` or `smispy+ssl://` URI.
///
/// The WBEM client is built by the caller from [`SmisConfig::url()`][1],
/// credentials and `no_ssl_verify`; the engine only uses the remaining
/// fields.
///
/// [1]: #method.url
#[derive(Debug, Clone)]
pub struct SmisConfig {
    /// `http` or `https`.
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Namespace to search for the profile registry first.
    pub namespace: String,
    /// Only expose these systems when set.
    pub system_list: Option<Vec<String>>,
    pub no_ssl_verify: bool,
    /// Folder for request/reply dumps of failed method invocations.
    pub debug_path: Option<PathBuf>,
    /// Skip the profile registry even if the provider has one.
    pub force_fallback: bool,
    /// Request timeout in milliseconds.
    pub timeout: u32,
    /// Sleep between job polls when an operation has to wait for a job.
    pub job_poll_interval: Duration,
    /// Give up waiting after this many polls.
    pub job_poll_max: u32,
}

fn is_yes(val: &str) -> bool {
    val.eq_ignore_ascii_case("yes") || val.eq_ignore_ascii_case("true")
}

impl SmisConfig {
    /// Parse URI like
    /// `smispy+ssl://admin@emc-smi:5989?namespace=root/emc&systems=SYS-1`.
    ///
    /// The `timeout` argument is in milliseconds.
    pub fn from_uri(
        uri: &str,
        password: Option<&str>,
        timeout: Option<u32>,
    ) -> Result<SmisConfig> {
        let p = match url::Url::parse(uri) {
            Ok(p) => p,
            Err(e) => {
                return Err(LsmError::InvalidArgument(format!(
                    "Failed to parse URI: {}",
                    e
                )))
            }
        };
        let (protocol, default_port) = match p.scheme() {
            "smispy" | "smis" => ("http", DEFAULT_HTTP_PORT),
            "smispy+ssl" | "smis+ssl" => ("https", DEFAULT_HTTPS_PORT),
            s => {
                return Err(LsmError::InvalidArgument(format!(
                    "Unsupported URI scheme '{}'",
                    s
                )))
            }
        };
        let host = match p.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => {
                return Err(LsmError::InvalidArgument(format!(
                    "No host defined in URI '{}'",
                    uri
                )))
            }
        };
        let username = match p.username() {
            "" => None,
            u => Some(u.to_string()),
        };

        let mut cfg = SmisConfig {
            protocol: protocol.to_string(),
            host,
            port: p.port().unwrap_or(default_port),
            username,
            password: password.map(str::to_string),
            namespace: DEFAULT_NAMESPACE.to_string(),
            system_list: None,
            no_ssl_verify: false,
            debug_path: None,
            force_fallback: false,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            job_poll_interval: Duration::from_secs(DEFAULT_JOB_POLL_INTERVAL),
            job_poll_max: DEFAULT_JOB_POLL_MAX,
        };

        for (key, val) in p.query_pairs() {
            match key.as_ref() {
                "namespace" => cfg.namespace = val.to_string(),
                "systems" => {
                    cfg.system_list = Some(
                        val.split(':')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                "no_ssl_verify" => cfg.no_ssl_verify = is_yes(&val),
                "debug_path" => cfg.debug_path = Some(PathBuf::from(val.as_ref())),
                "force_fallback" => cfg.force_fallback = is_yes(&val),
                _ => (),
            }
        }
        Ok(cfg)
    }

    /// URL of the WBEM server, e.g. `https://emc-smi:5989`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Override how long operations wait for provider jobs.
    pub fn with_job_poll(mut self, interval: Duration, max: u32) -> SmisConfig {
        self.job_poll_interval = interval;
        self.job_poll_max = max;
        self
    }

    pub(crate) fn system_allowed(&self, system_id: &str) -> bool {
        match self.system_list {
            Some(ref l) => l.iter().any(|s| s == system_id),
            None => true,
        }
    }
}
