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

//! # `lsm_smis`
//!
//! SMI-S protocol translation and job management for `LibStorageMgmt`.
//!
//! This crate talks to storage arrays through the CIM/WBEM object model
//! profiled by SNIA SMI-S and presents them in the `LibStorageMgmt`
//! resource model:
//!
//!  * List systems, pools, volumes, disks, access groups and target ports.
//!
//!  * Create, delete, resize and replicate volumes.
//!
//!  * Grant and remove access to volumes through either Masking and
//!    Mapping or Group Masking and Mapping.
//!
//!  * Create and delete access groups and edit members of a group.
//!
//!  * Track provider jobs of long running actions.
//!
//! To use it, you need:
//!
//!  * A [`WbemConnection`][1] implementation carrying the CIM operations
//!    to the provider.
//!
//!  * A [`SmisConfig`][2] parsed from URI like
//!    `smispy+ssl://admin@emc-smi:5989?namespace=root/emc`.
//!
//!  * Make a connection via [`Smis::new()`][3].
//!
//!  * Check required [`capability`][4] is supported.
//!
//! # Example code
//!
//! ```rust,no_run
//! extern crate lsm_smis;
//! use lsm_smis::{Capability, Smis, SmisConfig, WbemConnection};
//! fn list_volumes(conn: Box<dyn WbemConnection>) {
//!     let cfg = SmisConfig::from_uri(
//!         "smispy+ssl://admin@emc-smi:5989?no_ssl_verify=yes",
//!         Some("password"),
//!         None,
//!     ).unwrap();
//!     let smis = Smis::new(conn, cfg).unwrap();
//!     for s in smis.systems(None).unwrap() {
//!         let cap = smis.capabilities(&s).unwrap();
//!         if cap.is_supported(Capability::Volumes) {
//!             for vol in smis.volumes(Some(("system_id", &s.id))).unwrap() {
//!                 println!("Got volume: {} {}", vol.name, vol.id);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! [1]: trait.WbemConnection.html
//! [2]: struct.SmisConfig.html
//! [3]: struct.Smis.html#method.new
//! [4]: struct.Capabilities.html

extern crate regex;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate sha2;
extern crate tracing;
extern crate url;

pub use self::cim::{
    AssocQuery, CimError, CimInstance, CimParams, CimPath, CimResult,
    CimValue, WbemConnection, CIM_ERR_ACCESS_DENIED, CIM_ERR_FAILED,
    CIM_ERR_INVALID_CLASS, CIM_ERR_INVALID_NAMESPACE,
    CIM_ERR_INVALID_PARAMETER, CIM_ERR_METHOD_NOT_AVAILABLE,
    CIM_ERR_NOT_FOUND, CIM_ERR_NOT_SUPPORTED,
};
pub use self::config::SmisConfig;
pub use self::data::*;
pub use self::error::{LsmError, Result};
pub use self::identity::ResourceKind;
pub use self::job::{Invoked, JobId, JobStatus, RetrieveKind};
pub use self::plugin::{search_filter, PluginInfo, Searchable, Smis};
pub use self::profile::{NegotiatedSession, Profile, ProfileVersion, Vendor};

mod access_group;
mod cap;
mod cim;
mod config;
mod data;
mod disk;
mod dmtf;
mod error;
mod identity;
mod job;
mod masking;
mod misc;
mod plugin;
mod pool;
mod profile;
mod provider;
mod raid;
mod sys;
mod target_port;
mod volume;
