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

use std::fs;
use std::thread::sleep;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::cim::{
    AssocQuery, CimError, CimInstance, CimParams, CimPath, CimValue,
    WbemConnection, CIM_ERR_INVALID_CLASS, CIM_ERR_NOT_SUPPORTED,
};
use super::config::SmisConfig;
use super::dmtf::{
    JOB_STATE_COMPLETED, JOB_STATE_NEW, JOB_STATE_RUNNING, JOB_STATE_STARTING,
};
use super::error::*;
use super::identity::{self, ResourceKind};
use super::job::{cim_job_completed_ok, Invoked, JobId, RetrieveKind, CIM_JOB_PROPS};
use super::profile::{NegotiatedSession, Profile, ProfileVersion, Vendor};

pub(crate) const INVOKE_OK: u32 = 0;
pub(crate) const INVOKE_NOT_SUPPORTED: u32 = 1;
pub(crate) const INVOKE_FAILED: u32 = 4;
pub(crate) const INVOKE_ASYNC: u32 = 4096;

// Sub-system nesting deeper than this is treated as a provider loop.
const LEAF_SYSTEM_MAX_DEPTH: usize = 32;

/// Turns a failure of an invocation into a more precise error.
pub(crate) type ErrorHandler<'a> = &'a dyn Fn(&Provider, LsmError) -> LsmError;

/// Management services located by the `SystemName` they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Service {
    StorageConfiguration,
    Replication,
    GroupMaskingMapping,
    ControllerConfiguration,
    HardwareIdManagement,
}

impl Service {
    fn class_name(self) -> &'static str {
        match self {
            Service::StorageConfiguration => "CIM_StorageConfigurationService",
            Service::Replication => "CIM_ReplicationService",
            Service::GroupMaskingMapping => "CIM_GroupMaskingMappingService",
            Service::ControllerConfiguration => {
                "CIM_ControllerConfigurationService"
            }
            Service::HardwareIdManagement => {
                "CIM_StorageHardwareIDManagementService"
            }
        }
    }
}

/// What `invoke_method_wait()` should hand back.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Expect<'a> {
    /// Output parameter holding the result of a synchronous call.
    pub out_key: &'a str,
    /// Class of the element affected by the job of an asynchronous call.
    pub class: &'a str,
    /// The output parameter is a one element array.
    pub out_array: bool,
}

impl<'a> Expect<'a> {
    pub(crate) fn path(out_key: &'a str, class: &'a str) -> Expect<'a> {
        Expect {
            out_key,
            class,
            out_array: false,
        }
    }

    pub(crate) fn first_of(out_key: &'a str, class: &'a str) -> Expect<'a> {
        Expect {
            out_key,
            class,
            out_array: true,
        }
    }
}

/// Merge two property lists without duplicates.
pub(crate) fn merge_props<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<&'a str> {
    let mut rc: Vec<&'a str> = a.to_vec();
    for p in b {
        if !rc.contains(p) {
            rc.push(p);
        }
    }
    rc
}

fn srv_of_sys_id(cim_srvs: Vec<CimInstance>, sys_id: &str) -> Option<CimInstance> {
    cim_srvs
        .into_iter()
        .find(|s| s.str_prop("SystemName") == Some(sys_id))
}

/// A negotiated connection to one SMI-S provider.
pub struct Provider {
    conn: Box<dyn WbemConnection>,
    session: NegotiatedSession,
    cfg: SmisConfig,
}

impl Provider {
    pub(crate) fn new(
        conn: Box<dyn WbemConnection>,
        cfg: SmisConfig,
    ) -> Result<Provider> {
        conn.set_timeout(cfg.timeout);
        let session = NegotiatedSession::negotiate(conn.as_ref(), &cfg)?;
        Ok(Provider {
            conn,
            session,
            cfg,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_session(
        conn: Box<dyn WbemConnection>,
        session: NegotiatedSession,
        cfg: SmisConfig,
    ) -> Provider {
        Provider {
            conn,
            session,
            cfg,
        }
    }

    pub(crate) fn conn(&self) -> &dyn WbemConnection {
        self.conn.as_ref()
    }

    pub(crate) fn session(&self) -> &NegotiatedSession {
        &self.session
    }

    pub(crate) fn cfg(&self) -> &SmisConfig {
        &self.cfg
    }

    pub(crate) fn set_timeout(&mut self, ms: u32) {
        self.cfg.timeout = ms;
        self.conn.set_timeout(ms);
    }

    pub(crate) fn is_megaraid(&self) -> bool {
        self.session.vendor() == Vendor::MegaRaid
    }

    pub(crate) fn is_netappe(&self) -> bool {
        self.session.vendor() == Vendor::NetAppE
    }

    pub(crate) fn profile_check(
        &self,
        profile: Profile,
        min_ver: ProfileVersion,
        raise_error: bool,
    ) -> Result<bool> {
        self.session
            .profile_check(self.conn(), profile, min_ver, raise_error)
    }

    pub(crate) fn is_profile_supported(
        &self,
        profile: Profile,
        min_ver: ProfileVersion,
        strict: bool,
    ) -> Result<Option<ProfileVersion>> {
        self.session
            .is_profile_supported(self.conn(), profile, min_ver, strict)
    }

    /// Enumerate instances in the vendor namespace.
    pub(crate) fn enumerate(
        &self,
        class_name: &str,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        Ok(self.conn.enumerate_instances(
            class_name,
            self.session.namespace(),
            Some(props),
        )?)
    }

    /// Like `enumerate()`, but a provider not knowing the class yields
    /// nothing.
    pub(crate) fn enumerate_optional(
        &self,
        class_name: &str,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        match self.conn.enumerate_instances(
            class_name,
            self.session.namespace(),
            Some(props),
        ) {
            Ok(i) => Ok(i),
            Err(ref e)
                if e.is_cim(&[CIM_ERR_NOT_SUPPORTED, CIM_ERR_INVALID_CLASS]) =>
            {
                debug!("{} is not supported: {}", class_name, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn get_instance(
        &self,
        path: &CimPath,
        props: &[&str],
    ) -> Result<CimInstance> {
        Ok(self.conn.get_instance(path, Some(props))?)
    }

    pub(crate) fn associators(
        &self,
        path: &CimPath,
        query: &AssocQuery,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        Ok(self.conn.associators(path, query, Some(props))?)
    }

    pub(crate) fn associator_names(
        &self,
        path: &CimPath,
        query: &AssocQuery,
    ) -> Result<Vec<CimPath>> {
        Ok(self.conn.associator_names(path, query)?)
    }

    /// Like `associators()`, but an association class unknown to the
    /// provider yields nothing.
    pub(crate) fn associators_optional(
        &self,
        path: &CimPath,
        query: &AssocQuery,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        match self.conn.associators(path, query, Some(props)) {
            Ok(i) => Ok(i),
            Err(ref e)
                if e.is_cim(&[CIM_ERR_INVALID_CLASS, CIM_ERR_NOT_SUPPORTED]) =>
            {
                debug!("{:?} is not supported: {}", query.assoc_class, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn references(
        &self,
        path: &CimPath,
        result_class: &str,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        Ok(self.conn.references(path, Some(result_class), Some(props))?)
    }

    pub(crate) fn delete_instance(&self, path: &CimPath) -> Result<()> {
        Ok(self.conn.delete_instance(path)?)
    }

    pub(crate) fn id_of(
        &self,
        kind: ResourceKind,
        inst: &CimInstance,
    ) -> Result<String> {
        identity::resolve(self.conn(), kind, inst)
    }

    /// Find the service of `srv` type for the system. `Ok(None)` when the
    /// provider has none or refuses the enumeration with a CIM status.
    /// Transport faults are still errors.
    pub(crate) fn find_service(
        &self,
        srv: Service,
        sys_id: &str,
    ) -> Result<Option<CimInstance>> {
        let cim_srvs = match self.conn.enumerate_instances(
            srv.class_name(),
            self.session.namespace(),
            Some(&["SystemName"]),
        ) {
            Ok(s) => s,
            Err(ref e @ CimError::Cim(..)) => {
                debug!("Failed to enumerate {}: {}", srv.class_name(), e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(srv_of_sys_id(cim_srvs, sys_id))
    }

    /// Like `find_service()`, but every fault is an error and absence is
    /// `NoSupport`.
    pub(crate) fn service(
        &self,
        srv: Service,
        sys_id: &str,
    ) -> Result<CimInstance> {
        let cim_srvs = self.enumerate(srv.class_name(), &["SystemName"])?;
        srv_of_sys_id(cim_srvs, sys_id).ok_or_else(|| {
            LsmError::NoSupport(format!(
                "Cannot find any '{}' for requested system ID {}",
                srv.class_name(),
                sys_id
            ))
        })
    }

    /// Root `CIM_ComputerSystem` instances, filtered by the configured
    /// system list.
    pub(crate) fn root_cim_syss(
        &self,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        let props = merge_props(props, ResourceKind::System.key_props());
        let cim_syss = if self.is_megaraid() {
            self.enumerate("CIM_ComputerSystem", &props)?
        } else if self.session.is_fallback() {
            self.fallback_root_cim_syss(&props)?
        } else {
            let root_profile = self.session.root_profile().ok_or_else(|| {
                LsmError::NoSupport(
                    "Current SMI-S provider does not provide the 'Array' \
                     CIM_RegisteredProfile"
                        .to_string(),
                )
            })?;
            let cim_syss = self.associators(
                root_profile,
                &AssocQuery::new("CIM_ElementConformsToProfile")
                    .result_class("CIM_ComputerSystem"),
                &props,
            )?;
            if cim_syss.is_empty() {
                return Err(LsmError::NoSupport(
                    "Current SMI-S provider does not provide the root \
                     CIM_ComputerSystem associated to 'Array' \
                     CIM_RegisteredProfile."
                        .to_string(),
                ));
            }
            cim_syss
        };

        let mut rc = Vec::with_capacity(cim_syss.len());
        for cim_sys in cim_syss {
            let sys_id = self.id_of(ResourceKind::System, &cim_sys)?;
            if self.cfg.system_allowed(&sys_id) {
                rc.push(cim_sys);
            }
        }
        Ok(rc)
    }

    // Without a profile registry, the systems hosting configuration
    // services are taken as root systems.
    fn fallback_root_cim_syss(
        &self,
        props: &[&str],
    ) -> Result<Vec<CimInstance>> {
        let mut rc: Vec<CimInstance> = Vec::new();
        for srv_class in &[
            "CIM_ControllerConfigurationService",
            "CIM_StorageConfigurationService",
        ] {
            for cim_srv in self.enumerate_optional(srv_class, &["SystemName"])? {
                let cim_syss = self.associators(
                    &cim_srv.path,
                    &AssocQuery::new("CIM_HostedService")
                        .result_class("CIM_ComputerSystem"),
                    props,
                )?;
                for cim_sys in cim_syss {
                    if !rc.iter().any(|s| s.path.same_object(&cim_sys.path)) {
                        rc.push(cim_sys);
                    }
                }
            }
        }
        Ok(rc)
    }

    pub(crate) fn cim_sys_of_sys_id(
        &self,
        sys_id: &str,
        props: &[&str],
    ) -> Result<CimInstance> {
        for cim_sys in self.root_cim_syss(props)? {
            if self.id_of(ResourceKind::System, &cim_sys)? == sys_id {
                return Ok(cim_sys);
            }
        }
        Err(LsmError::NotFoundSystem("Not found System".to_string()))
    }

    /// All sub-systems below `cim_sys_path`, found through
    /// `CIM_ComponentCS` directly or through a `CIM_RedundancySet` grouping
    /// the sub-systems.
    pub(crate) fn leaf_cim_syss_path_of(
        &self,
        cim_sys_path: &CimPath,
    ) -> Result<Vec<CimPath>> {
        let mut visited = vec![cim_sys_path.clone()];
        let mut rc = Vec::new();
        self.collect_leaf_cim_syss(cim_sys_path, 0, &mut visited, &mut rc)?;
        Ok(rc)
    }

    fn collect_leaf_cim_syss(
        &self,
        cim_sys_path: &CimPath,
        depth: usize,
        visited: &mut Vec<CimPath>,
        rc: &mut Vec<CimPath>,
    ) -> Result<()> {
        if depth >= LEAF_SYSTEM_MAX_DEPTH {
            warn!(
                "Stop walking sub-systems of {} at depth {}",
                cim_sys_path, depth
            );
            return Ok(());
        }
        let mut children = self.optional_assoc_names(
            cim_sys_path,
            &AssocQuery::new("CIM_ComponentCS")
                .result_class("CIM_ComputerSystem")
                .role("GroupComponent")
                .result_role("PartComponent"),
        )?;
        for cim_rs_path in self.optional_assoc_names(
            cim_sys_path,
            &AssocQuery::new("CIM_HostedCollection")
                .result_class("CIM_RedundancySet"),
        )? {
            children.extend(self.optional_assoc_names(
                &cim_rs_path,
                &AssocQuery::new("CIM_MemberOfCollection")
                    .result_class("CIM_ComputerSystem"),
            )?);
        }
        for child in children {
            if visited.iter().any(|v| v.same_object(&child)) {
                continue;
            }
            visited.push(child.clone());
            rc.push(child.clone());
            self.collect_leaf_cim_syss(&child, depth + 1, visited, rc)?;
        }
        Ok(())
    }

    fn optional_assoc_names(
        &self,
        path: &CimPath,
        query: &AssocQuery,
    ) -> Result<Vec<CimPath>> {
        match self.conn.associator_names(path, query) {
            Ok(p) => Ok(p),
            Err(ref e)
                if e.is_cim(&[CIM_ERR_INVALID_CLASS, CIM_ERR_NOT_SUPPORTED]) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Root system and all its sub-systems.
    pub(crate) fn cim_syss_path_with_leafs(
        &self,
        cim_sys_path: &CimPath,
    ) -> Result<Vec<CimPath>> {
        let mut rc = vec![cim_sys_path.clone()];
        rc.extend(self.leaf_cim_syss_path_of(cim_sys_path)?);
        Ok(rc)
    }

    fn dump_invocation(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
        reply: &str,
    ) {
        let debug_path = match self.cfg.debug_path {
            Some(ref p) => p,
            None => return,
        };
        let request = serde_json::json!({
            "method": method,
            "path": path,
            "params": params,
        });
        let request = serde_json::to_string_pretty(&request)
            .unwrap_or_else(|_| format!("{} {}", method, path));
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file = debug_path.join(format!("{}_{}", method, ts));
        let content = format!("REQUEST:\n{}\n\nREPLY:\n{}\n", request, reply);
        if let Err(e) = fs::create_dir_all(debug_path)
            .and_then(|_| fs::write(&file, content))
        {
            warn!("Failed to dump {} to {}: {}", method, file.display(), e);
        }
    }

    fn raw_invoke(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
    ) -> Result<(u32, CimParams)> {
        debug!("Invoking {} on {}", method, path);
        match self.conn.invoke_method(method, path, params) {
            Ok((rc, out)) => {
                debug!("{} returned {}", method, rc);
                if ![INVOKE_OK, INVOKE_NOT_SUPPORTED, INVOKE_FAILED, INVOKE_ASYNC]
                    .contains(&rc)
                {
                    let reply = serde_json::json!({ "rc": rc, "out": &out });
                    self.dump_invocation(
                        method,
                        path,
                        params,
                        &serde_json::to_string_pretty(&reply)
                            .unwrap_or_default(),
                    );
                }
                Ok((rc, out))
            }
            Err(e) => {
                self.dump_invocation(method, path, params, &e.to_string());
                Err(e.into())
            }
        }
    }

    fn job_id_of_out(
        &self,
        method: &str,
        out: &CimParams,
        retrieve: RetrieveKind,
        create_name: Option<&str>,
    ) -> Result<JobId> {
        let job_path = out
            .get("Job")
            .and_then(CimValue::as_path)
            .ok_or_else(|| {
                LsmError::PluginBug(format!(
                    "{}() returned async without a Job: {:?}",
                    method, out
                ))
            })?;
        let job_ref =
            self.id_of(ResourceKind::Job, &CimInstance::new(job_path.clone()))?;
        Ok(JobId::new(&job_ref, retrieve).with_create_name(create_name))
    }

    /// Invoke `method` and interpret its return code: output parameters
    /// when done, a job when running asynchronously.
    pub(crate) fn invoke_method(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
        retrieve: RetrieveKind,
        create_name: Option<&str>,
        error_handler: Option<ErrorHandler>,
    ) -> Result<Invoked<CimParams>> {
        let result = self.raw_invoke(method, path, params).and_then(
            |(rc, out)| match rc {
                INVOKE_OK => Ok(Invoked::Done(out)),
                INVOKE_ASYNC => Ok(Invoked::Job(self.job_id_of_out(
                    method,
                    &out,
                    retrieve,
                    create_name,
                )?)),
                INVOKE_NOT_SUPPORTED => Err(LsmError::NoSupport(
                    "SMI-S error code indicates operation not supported"
                        .to_string(),
                )),
                _ => Err(LsmError::PluginBug(format!(
                    "Error: {} rc= {}",
                    method, rc
                ))),
            },
        );
        match (result, error_handler) {
            (Err(e), Some(handler)) => Err(handler(self, e)),
            (r, _) => r,
        }
    }

    /// Invoke `method` and wait for its job, if any, to finish.
    pub(crate) fn invoke_method_wait(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
    ) -> Result<()> {
        self.invoke_wait(method, path, params, None).map(|_| ())
    }

    /// Invoke `method`, wait for it and return the path of the element it
    /// produced.
    pub(crate) fn invoke_method_wait_path(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
        expect: Expect,
    ) -> Result<CimPath> {
        self.invoke_wait(method, path, params, Some(expect))?
            .ok_or_else(|| {
                LsmError::PluginBug(format!(
                    "{}() returned no {}",
                    method, expect.class
                ))
            })
    }

    fn invoke_wait(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
        expect: Option<Expect>,
    ) -> Result<Option<CimPath>> {
        let (rc, out) = self.raw_invoke(method, path, params)?;
        match rc {
            INVOKE_OK => match expect {
                None => Ok(None),
                Some(expect) => {
                    self.path_of_out(method, &out, expect).map(Some)
                }
            },
            INVOKE_ASYNC => {
                let job_path = out
                    .get("Job")
                    .and_then(CimValue::as_path)
                    .ok_or_else(|| {
                        LsmError::PluginBug(format!(
                            "{}() returned async without a Job",
                            method
                        ))
                    })?;
                self.wait_cim_job(method, job_path, expect)
            }
            _ => Err(LsmError::PluginBug(format!(
                "invoke_method_wait(): Got unexpected rc code {} from {}, \
                 out: {:?}",
                rc, method, out
            ))),
        }
    }

    fn path_of_out(
        &self,
        method: &str,
        out: &CimParams,
        expect: Expect,
    ) -> Result<CimPath> {
        let val = out.get(expect.out_key).ok_or_else(|| {
            LsmError::PluginBug(format!(
                "{}(): {} not exist in out {:?}",
                method, expect.out_key, out
            ))
        })?;
        let val = if expect.out_array {
            match val.as_array() {
                Some(a) if a.len() == 1 => &a[0],
                _ => {
                    return Err(LsmError::PluginBug(format!(
                        "{}(): output {} is not a one element array: {:?}",
                        method, expect.out_key, val
                    )))
                }
            }
        } else {
            val
        };
        val.as_path().cloned().ok_or_else(|| {
            LsmError::PluginBug(format!(
                "{}(): output {} is not a reference: {:?}",
                method, expect.out_key, val
            ))
        })
    }

    fn wait_cim_job(
        &self,
        method: &str,
        job_path: &CimPath,
        expect: Option<Expect>,
    ) -> Result<Option<CimPath>> {
        let props = ["JobState", "ErrorDescription", "OperationalStatus"];
        for _ in 0..=self.cfg.job_poll_max {
            let cim_job = self.get_instance(job_path, &props)?;
            match cim_job.u64_prop("JobState") {
                Some(JOB_STATE_NEW)
                | Some(JOB_STATE_STARTING)
                | Some(JOB_STATE_RUNNING) => {
                    debug!("Waiting on job {} of {}", job_path, method);
                    sleep(self.cfg.job_poll_interval);
                }
                Some(JOB_STATE_COMPLETED) => {
                    if !cim_job_completed_ok(&cim_job) {
                        return Err(LsmError::PluginBug(
                            cim_job
                                .str_prop("ErrorDescription")
                                .unwrap_or("")
                                .to_string(),
                        ));
                    }
                    let expect = match expect {
                        Some(e) => e,
                        None => return Ok(None),
                    };
                    let paths = self.associator_names(
                        job_path,
                        &AssocQuery::new("CIM_AffectedJobElement")
                            .result_class(expect.class),
                    )?;
                    if paths.len() == 1 {
                        return Ok(paths.into_iter().next());
                    }
                    return Err(LsmError::PluginBug(format!(
                        "invoke_method_wait(): got unexpected(not 1) return \
                         from CIM_AffectedJobElement: {:?}",
                        paths
                    )));
                }
                state => {
                    return Err(LsmError::PluginBug(format!(
                        "invoke_method_wait(): Got unknown job state {:?}: {}",
                        state,
                        cim_job.str_prop("ErrorDescription").unwrap_or("")
                    )))
                }
            }
        }
        Err(LsmError::TimeOut(format!(
            "The job generated by {}() failed to finish in {}s",
            method,
            self.cfg.job_poll_interval.as_secs()
                * u64::from(self.cfg.job_poll_max)
        )))
    }

    /// `CIM_ConcreteJob` behind `job_id`.
    pub(crate) fn cim_job_of_job_id(
        &self,
        job_id: &JobId,
        props: &[&str],
    ) -> Result<CimInstance> {
        let props = merge_props(props, &CIM_JOB_PROPS);
        for cim_job in self.enumerate("CIM_ConcreteJob", &props)? {
            if self.id_of(ResourceKind::Job, &cim_job)? == job_id.job_ref {
                return Ok(cim_job);
            }
        }
        Err(LsmError::NotFoundJob(format!("Job {} not found", job_id)))
    }
}

