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

//! Asynchronous provider jobs.

use std::fmt;
use std::str::FromStr;

use super::cim::CimInstance;
use super::data::Volume;
use super::dmtf::{
    JOB_STATE_COMPLETED, JOB_STATE_NEW, JOB_STATE_RUNNING, JOB_STATE_STARTING,
    OP_STATUS_COMPLETED, OP_STATUS_OK,
};
use super::error::*;

/// Properties of `CIM_ConcreteJob` needed to decode its state.
pub(crate) const CIM_JOB_PROPS: [&str; 6] = [
    "InstanceID",
    "JobState",
    "PercentComplete",
    "ErrorDescription",
    "OperationalStatus",
    "DeleteOnCompletion",
];

/// What to fetch once a job completes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieveKind {
    None = 0,
    Volume = 1,
    Pool = 3,
    FileSystem = 4,
    Snapshot = 5,
}

impl RetrieveKind {
    fn from_u8(i: u8) -> Option<RetrieveKind> {
        match i {
            0 => Some(RetrieveKind::None),
            1 => Some(RetrieveKind::Volume),
            3 => Some(RetrieveKind::Pool),
            4 => Some(RetrieveKind::FileSystem),
            5 => Some(RetrieveKind::Snapshot),
            _ => None,
        }
    }
}

/// Handle of an asynchronous operation.
///
/// `job_ref` is the opaque ID of the `CIM_ConcreteJob`. `create_name` holds
/// the requested name of a volume being created, used to tell a name
/// conflict apart from other failures when the job ends in error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId {
    pub job_ref: String,
    pub retrieve: RetrieveKind,
    pub create_name: Option<String>,
}

impl JobId {
    pub fn new(job_ref: &str, retrieve: RetrieveKind) -> JobId {
        JobId {
            job_ref: job_ref.to_string(),
            retrieve,
            create_name: None,
        }
    }

    pub(crate) fn with_create_name(mut self, name: Option<&str>) -> JobId {
        self.create_name = name.map(str::to_string);
        self
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.job_ref, self.retrieve as u8)?;
        if let Some(ref name) = self.create_name {
            write!(f, "@{}", name)?;
        }
        Ok(())
    }
}

impl FromStr for JobId {
    type Err = LsmError;

    fn from_str(s: &str) -> Result<JobId> {
        let mut parts = s.splitn(3, '@');
        let job_ref = match parts.next() {
            Some(r) if !r.is_empty() => r,
            _ => {
                return Err(LsmError::NotFoundJob(format!(
                    "Job {} not found",
                    s
                )))
            }
        };
        let retrieve = match parts.next() {
            Some(r) => r
                .parse::<u8>()
                .ok()
                .and_then(RetrieveKind::from_u8)
                .ok_or_else(|| {
                    LsmError::InvalidArgument(format!(
                        "Invalid job ID '{}'",
                        s
                    ))
                })?,
            None => RetrieveKind::None,
        };
        Ok(JobId {
            job_ref: job_ref.to_string(),
            retrieve,
            create_name: parts.next().map(str::to_string),
        })
    }
}

/// Outcome of a mutating call: done already or running as a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Invoked<T> {
    Done(T),
    Job(JobId),
}

impl<T> Invoked<T> {
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Invoked::Job(j) => Some(j),
            Invoked::Done(_) => None,
        }
    }

    pub(crate) fn and_then<U, F>(self, f: F) -> Result<Invoked<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        Ok(match self {
            Invoked::Done(t) => Invoked::Done(f(t)?),
            Invoked::Job(j) => Invoked::Job(j),
        })
    }
}

/// Status reported by `job_status()`. Failed jobs are reported as errors.
#[derive(Debug, Clone)]
pub enum JobStatus {
    /// Percentage done, 0 to 100.
    InProgress(u8),
    /// Finished, with the produced volume when one was requested.
    Complete(Option<Volume>),
}

impl JobStatus {
    pub const STATUS_INPROGRESS: u32 = 1;
    pub const STATUS_COMPLETE: u32 = 2;

    pub fn status(&self) -> u32 {
        match self {
            JobStatus::InProgress(_) => JobStatus::STATUS_INPROGRESS,
            JobStatus::Complete(_) => JobStatus::STATUS_COMPLETE,
        }
    }

    pub fn percent(&self) -> u8 {
        match self {
            JobStatus::InProgress(p) => *p,
            JobStatus::Complete(_) => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CimJobState {
    Running(u8),
    Succeeded,
}

/// Providers disagree on the order of the two `OperationalStatus` values of
/// a finished job, both orders are accepted.
pub(crate) fn cim_job_completed_ok(cim_job: &CimInstance) -> bool {
    match cim_job.u64_list("OperationalStatus") {
        Some(ref op) if op.len() > 1 => {
            (op[0] == OP_STATUS_OK && op[1] == OP_STATUS_COMPLETED)
                || (op[0] == OP_STATUS_COMPLETED && op[1] == OP_STATUS_OK)
        }
        _ => false,
    }
}

fn job_error(cim_job: &CimInstance) -> LsmError {
    LsmError::PluginBug(
        cim_job
            .str_prop("ErrorDescription")
            .unwrap_or("Job failed with no error description")
            .to_string(),
    )
}

/// Decode `CIM_ConcreteJob` state. Failed or unknown states become errors
/// carrying the provider's error description.
pub(crate) fn decode_cim_job(cim_job: &CimInstance) -> Result<CimJobState> {
    let state = cim_job.u64_prop("JobState").ok_or_else(|| {
        LsmError::PluginBug(format!(
            "Got CIM_ConcreteJob with no JobState: {}",
            cim_job.path
        ))
    })?;
    match state {
        JOB_STATE_NEW | JOB_STATE_STARTING | JOB_STATE_RUNNING => {
            let pc = cim_job.u64_prop("PercentComplete").unwrap_or(0);
            Ok(CimJobState::Running(if pc > 100 { 100 } else { pc as u8 }))
        }
        JOB_STATE_COMPLETED if cim_job_completed_ok(cim_job) => {
            Ok(CimJobState::Succeeded)
        }
        _ => Err(job_error(cim_job)),
    }
}
