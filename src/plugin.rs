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

use std::thread::sleep;

use tracing::{debug, info, warn};

use super::access_group;
use super::cap;
use super::cim::WbemConnection;
use super::config::SmisConfig;
use super::data::*;
use super::disk;
use super::error::*;
use super::job::{
    decode_cim_job, CimJobState, Invoked, JobId, JobStatus, RetrieveKind,
};
use super::masking;
use super::pool;
use super::profile::NegotiatedSession;
use super::provider::Provider;
use super::sys;
use super::target_port;
use super::volume;

const PLUGIN_DESCRIPTION: &str = "Generic SMI-S support";
const PLUGIN_NAME: &str = "smispy";

/// Represent a plugin information
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Plugin version string.
    pub version: String,
    /// Plugin description.
    pub description: String,
    /// Plugin name.
    pub name: String,
}

/// Records which could be filtered by a search key.
pub trait Searchable {
    /// Keys accepted by the enumeration of this record.
    const SEARCH_KEYS: &'static [&'static str];

    fn search_value(&self, key: &str) -> Option<&str>;
}

impl Searchable for System {
    const SEARCH_KEYS: &'static [&'static str] = &["id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            _ => None,
        }
    }
}

impl Searchable for Pool {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "system_id" => Some(&self.system_id),
            _ => None,
        }
    }
}

impl Searchable for Volume {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id", "pool_id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "system_id" => Some(&self.system_id),
            "pool_id" => Some(&self.pool_id),
            _ => None,
        }
    }
}

impl Searchable for Disk {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "system_id" => Some(&self.system_id),
            _ => None,
        }
    }
}

impl Searchable for AccessGroup {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "system_id" => Some(&self.system_id),
            _ => None,
        }
    }
}

impl Searchable for TargetPort {
    const SEARCH_KEYS: &'static [&'static str] = &["id", "system_id"];

    fn search_value(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "system_id" => Some(&self.system_id),
            _ => None,
        }
    }
}

/// Keep the records whose `key` equals `value`. `None` keeps everything.
pub fn search_filter<T: Searchable>(
    items: Vec<T>,
    search: Option<(&str, &str)>,
) -> Result<Vec<T>> {
    let (key, value) = match search {
        Some(s) => s,
        None => return Ok(items),
    };
    if !T::SEARCH_KEYS.contains(&key) {
        return Err(LsmError::UnSupportedSearchKey(format!(
            "Search key '{}' is not supported, expecting one of {:?}",
            key,
            T::SEARCH_KEYS
        )));
    }
    Ok(items
        .into_iter()
        .filter(|i| i.search_value(key) == Some(value))
        .collect())
}

/// Storage management against one SMI-S provider.
///
/// The CIM/WBEM client is injected as a [`WbemConnection`][1]. Profile
/// negotiation happens once in [`Smis::new()`][2], the outcome is kept for
/// the life of this object.
///
/// Mutating calls return [`Invoked`][3]: either the result or a
/// [`JobId`][4] to track with [`Smis::job_status()`][5].
///
/// [1]: trait.WbemConnection.html
/// [2]: #method.new
/// [3]: enum.Invoked.html
/// [4]: struct.JobId.html
/// [5]: #method.job_status
pub struct Smis {
    provider: Provider,
}

impl Smis {
    /// Negotiate with the provider behind `conn`.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NoSupport`][1]: Provider does not support the SNIA
    ///    Array profile 1.4 or later.
    ///  * [`LsmError::PluginAuthFailed`][2]: Bad credential.
    ///
    /// [1]: enum.LsmError.html#variant.NoSupport
    /// [2]: enum.LsmError.html#variant.PluginAuthFailed
    pub fn new(conn: Box<dyn WbemConnection>, cfg: SmisConfig) -> Result<Smis> {
        let provider = Provider::new(conn, cfg)?;
        info!(
            "Connected to SMI-S provider {}, fallback mode: {}",
            provider.cfg().url(),
            provider.session().is_fallback()
        );
        Ok(Smis { provider })
    }

    /// Profiles and vendor found during negotiation.
    pub fn session(&self) -> &NegotiatedSession {
        self.provider.session()
    }

    /// Get plugin information.
    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: PLUGIN_DESCRIPTION.to_string(),
            name: PLUGIN_NAME.to_string(),
        }
    }

    /// Set connection timeout value in milliseconds.
    pub fn time_out_set(&mut self, ms: u32) {
        self.provider.set_timeout(ms);
    }

    /// Get connection timeout value in milliseconds.
    pub fn time_out_get(&self) -> u32 {
        self.provider.cfg().timeout
    }

    /// Gets a list of systems on this connection.
    pub fn systems(&self, search: Option<(&str, &str)>) -> Result<Vec<System>> {
        search_filter(sys::systems(&self.provider)?, search)
    }

    /// Gets a list of pools on this connection.
    pub fn pools(&self, search: Option<(&str, &str)>) -> Result<Vec<Pool>> {
        search_filter(pool::pools(&self.provider)?, search)
    }

    /// Gets a list of volumes on this connection.
    pub fn volumes(&self, search: Option<(&str, &str)>) -> Result<Vec<Volume>> {
        search_filter(volume::volumes(&self.provider)?, search)
    }

    /// Gets a list of disks on this connection.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NoSupport`][1]: Provider does not support Disk Drive
    ///    Lite profile 1.4 or later.
    ///
    /// [1]: enum.LsmError.html#variant.NoSupport
    pub fn disks(&self, search: Option<(&str, &str)>) -> Result<Vec<Disk>> {
        search_filter(disk::disks(&self.provider)?, search)
    }

    /// Gets a list of access group on this connection.
    pub fn access_groups(
        &self,
        search: Option<(&str, &str)>,
    ) -> Result<Vec<AccessGroup>> {
        search_filter(access_group::access_groups(&self.provider)?, search)
    }

    /// Gets a list of target ports on this connection.
    pub fn target_ports(
        &self,
        search: Option<(&str, &str)>,
    ) -> Result<Vec<TargetPort>> {
        search_filter(target_port::target_ports(&self.provider)?, search)
    }

    /// Get system's capabilities.
    ///
    /// To verify capability is supported, use
    /// [`Capabilities::is_supported()`][1].
    ///
    /// [1]: struct.Capabilities.html#method.is_supported
    pub fn capabilities(&self, sys: &System) -> Result<Capabilities> {
        let cim_sys = self.provider.cim_sys_of_sys_id(&sys.id, &[])?;
        cap::capabilities(&self.provider, &cim_sys, &sys.id)
    }

    /// Query the RAID type and members of a pool.
    pub fn pool_member_info(&self, pool: &Pool) -> Result<PoolMemberInfo> {
        pool::pool_member_info(&self.provider, pool)
    }

    /// Create new volume.
    ///
    ///  * `pool` -- The pool where new volume should allocated from.
    ///  * `name` -- The name of new volume. It might be altered or
    ///    ignored.
    ///  * `size_bytes` -- Size in bytes of new volume.
    ///  * `thinp` -- Whether to create thin provisioning volume.
    ///    Check [VolumeCreateArgThinP][1]
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NameConflict`][2]: Volume name used already.
    ///
    /// [1]: enum.VolumeCreateArgThinP.html
    /// [2]: enum.LsmError.html#variant.NameConflict
    pub fn volume_create(
        &self,
        pool: &Pool,
        name: &str,
        size_bytes: u64,
        thinp: VolumeCreateArgThinP,
    ) -> Result<Invoked<Volume>> {
        volume::volume_create(&self.provider, pool, name, size_bytes, thinp)
    }

    /// Delete a volume.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::IsMasked`][1]: Volume is masked to access group.
    ///
    /// [1]: enum.LsmError.html#variant.IsMasked
    pub fn volume_delete(&self, vol: &Volume) -> Result<Option<JobId>> {
        match masking::volume_is_masked(&self.provider, vol) {
            Ok(true) => {
                return Err(LsmError::IsMasked(
                    "Volume is masked to access group".to_string(),
                ))
            }
            Ok(false) => (),
            Err(e) => {
                warn!("Failed to check masking of volume {}: {}", vol.id, e)
            }
        }
        volume::volume_delete(&self.provider, vol)
    }

    /// Resize a volume.
    pub fn volume_resize(
        &self,
        vol: &Volume,
        new_size_bytes: u64,
    ) -> Result<Invoked<Volume>> {
        volume::volume_resize(&self.provider, vol, new_size_bytes)
    }

    /// Replicate a volume.
    ///
    ///  * `pool` -- The pool where new volume should allocated from. `None`
    ///    for the pool of source volume.
    pub fn volume_replicate(
        &self,
        pool: Option<&Pool>,
        rep_type: VolumeReplicateType,
        src_vol: &Volume,
        name: &str,
    ) -> Result<Invoked<Volume>> {
        volume::volume_replicate(&self.provider, pool, rep_type, src_vol, name)
    }

    /// Grant access to a volume for the specified group, also known as LUN
    /// masking or mapping.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::EmptyAccessGroup`][1]: Cannot mask volume to empty
    ///    access group.
    ///  * [`LsmError::NoStateChange`][2]: Volume is masked to this access
    ///    group already.
    ///
    /// [1]: enum.LsmError.html#variant.EmptyAccessGroup
    /// [2]: enum.LsmError.html#variant.NoStateChange
    pub fn volume_mask(&self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        masking::volume_mask(&self.provider, ag, vol)
    }

    /// Revokes access to a volume for the specified group
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NoStateChange`][1]: Volume is not masked to this
    ///    access group.
    ///
    /// [1]: enum.LsmError.html#variant.NoStateChange
    pub fn volume_unmask(&self, vol: &Volume, ag: &AccessGroup) -> Result<()> {
        masking::volume_unmask(&self.provider, ag, vol)
    }

    /// Create a access group.
    ///
    /// Creates a new access group with one initiator in it. You may expand
    /// the access group by adding more initiators via
    /// [`Smis::access_group_initiator_add()`][1]
    ///
    /// # Errors
    ///
    ///  * [`LsmError::ExistsInitiator`][2]: Specified initiator is used by
    ///    other access group.
    ///  * [`LsmError::NameConflict`][3]: Specified name is used by other
    ///    access group.
    ///
    /// [1]: #method.access_group_initiator_add
    /// [2]: enum.LsmError.html#variant.ExistsInitiator
    /// [3]: enum.LsmError.html#variant.NameConflict
    pub fn access_group_create(
        &self,
        name: &str,
        init_id: &str,
        init_type: InitiatorType,
        sys: &System,
    ) -> Result<AccessGroup> {
        masking::access_group_create(&self.provider, name, init_id, init_type, sys)
    }

    /// Delete an access group. Only access group with no volume masked can
    /// be deleted.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::IsMasked`][1]: Access group has volume masked to.
    ///
    /// [1]: enum.LsmError.html#variant.IsMasked
    pub fn access_group_delete(&self, ag: &AccessGroup) -> Result<()> {
        masking::access_group_delete(&self.provider, ag)
    }

    /// Add an initiator to the access group. Adding an initiator already in
    /// the group returns the group unchanged.
    pub fn access_group_initiator_add(
        &self,
        ag: &AccessGroup,
        init_id: &str,
        init_type: InitiatorType,
    ) -> Result<AccessGroup> {
        masking::access_group_initiator_add(&self.provider, ag, init_id, init_type)
    }

    /// Delete an initiator from an access group.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::LastInitInAccessGroup`][1]: Specified initiator is the
    ///  last initiator of access group. Use
    ///  [`Smis::access_group_delete()`][2] instead.
    ///  * [`LsmError::NoStateChange`][3]: Initiator is not in the access
    ///  group.
    ///
    /// [1]: enum.LsmError.html#variant.LastInitInAccessGroup
    /// [2]: #method.access_group_delete
    /// [3]: enum.LsmError.html#variant.NoStateChange
    pub fn access_group_initiator_delete(
        &self,
        ag: &AccessGroup,
        init_id: &str,
    ) -> Result<AccessGroup> {
        masking::access_group_initiator_delete(&self.provider, ag, init_id)
    }

    /// Query volumes that the specified access group has access to.
    pub fn volumes_accessible_by_access_group(
        &self,
        ag: &AccessGroup,
    ) -> Result<Vec<Volume>> {
        masking::volumes_accessible_by_access_group(&self.provider, ag)
    }

    /// Retrieves the access groups that have access to the specified volume.
    pub fn access_groups_granted_to_volume(
        &self,
        vol: &Volume,
    ) -> Result<Vec<AccessGroup>> {
        masking::access_groups_granted_to_volume(&self.provider, vol)
    }

    /// Query the status of a job. A failed job is reported as error with
    /// the description from the provider.
    ///
    /// # Errors
    ///
    ///  * [`LsmError::NotFoundJob`][1]: No such job.
    ///  * [`LsmError::NameConflict`][2]: The volume creation job failed as
    ///    the requested name is used already.
    ///
    /// [1]: enum.LsmError.html#variant.NotFoundJob
    /// [2]: enum.LsmError.html#variant.NameConflict
    pub fn job_status(&self, job_id: &JobId) -> Result<JobStatus> {
        let cim_job = self.provider.cim_job_of_job_id(job_id, &[])?;
        match decode_cim_job(&cim_job) {
            Ok(CimJobState::Running(pc)) => Ok(JobStatus::InProgress(pc)),
            Ok(CimJobState::Succeeded) => match job_id.retrieve {
                RetrieveKind::Volume => Ok(JobStatus::Complete(
                    volume::new_vol_from_cim_job(&self.provider, &cim_job)?,
                )),
                _ => Ok(JobStatus::Complete(None)),
            },
            Err(e) => {
                debug!("Job {} failed: {}", job_id, e);
                match job_id.create_name {
                    Some(ref name) => Err(volume::volume_create_error_handler(
                        &self.provider,
                        name,
                        e,
                    )),
                    None => Err(e),
                }
            }
        }
    }

    /// Release the job. Providers which clean up finished jobs by
    /// themselves are left alone.
    pub fn job_free(&self, job_id: &JobId) -> Result<()> {
        let cim_job = self
            .provider
            .cim_job_of_job_id(job_id, &["DeleteOnCompletion"])?;
        if cim_job.bool_prop("DeleteOnCompletion") != Some(true) {
            if let Err(e) = self.provider.delete_instance(&cim_job.path) {
                warn!("Failed to delete job {}: {}", job_id, e);
            }
        }
        Ok(())
    }

    /// Block until the job finishes, then free it. Returns the volume
    /// produced by the job, if any.
    ///
    /// A failed job is freed before its error is returned. A job still
    /// running after the configured number of polls is left in place and
    /// [`LsmError::TimeOut`][1] is returned.
    ///
    /// [1]: enum.LsmError.html#variant.TimeOut
    pub fn wait_job(&self, job_id: &JobId) -> Result<Option<Volume>> {
        let cfg = self.provider.cfg();
        for _ in 0..=cfg.job_poll_max {
            match self.job_status(job_id) {
                Ok(JobStatus::InProgress(pc)) => {
                    debug!("Job {} is {}% done", job_id, pc);
                    sleep(cfg.job_poll_interval);
                }
                Ok(JobStatus::Complete(vol)) => {
                    self.job_free(job_id)?;
                    return Ok(vol);
                }
                Err(e @ LsmError::NotFoundJob(_)) => return Err(e),
                Err(e) => {
                    if let Err(free_err) = self.job_free(job_id) {
                        warn!("Failed to free failed job {}: {}", job_id, free_err);
                    }
                    return Err(e);
                }
            }
        }
        Err(LsmError::TimeOut(format!(
            "Job {} did not finish after {} polls",
            job_id, cfg.job_poll_max
        )))
    }

    /// Like `wait_job()` for the outcome of a mutating call.
    pub fn wait_invoked(&self, invoked: Invoked<Volume>) -> Result<Volume> {
        match invoked {
            Invoked::Done(v) => Ok(v),
            Invoked::Job(j) => self.wait_job(&j)?.ok_or_else(|| {
                LsmError::PluginBug(format!(
                    "Job {} completed with no volume",
                    j
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::testing::NoConn;
    use crate::profile::Vendor;

    fn vol(id: &str, pool_id: &str) -> Volume {
        Volume::new(
            id.to_string(),
            format!("vol-{}", id),
            String::new(),
            512,
            2048,
            "SYS-1".to_string(),
            pool_id.to_string(),
            None,
        )
    }

    // MegaRAID negotiates without asking the provider anything.
    fn megaraid() -> Smis {
        let cfg = SmisConfig::from_uri(
            "smispy://admin@hba?namespace=root/LsiMr13",
            None,
            None,
        ).unwrap();
        Smis::new(Box::new(NoConn), cfg).unwrap()
    }

    #[test]
    fn filter_by_key() {
        let vols = vec![vol("1", "POOL-1"), vol("2", "POOL-2"), vol("3", "POOL-1")];
        let found = search_filter(vols.clone(), Some(("pool_id", "POOL-1"))).unwrap();
        assert_eq!(
            found.iter().map(|v| v.id.as_str()).collect::<Vec<&str>>(),
            vec!["1", "3"]
        );
        assert!(search_filter(vols.clone(), Some(("id", "4"))).unwrap().is_empty());
        assert_eq!(search_filter(vols, None).unwrap().len(), 3);
    }

    #[test]
    fn unknown_search_key() {
        match search_filter(vec![vol("1", "POOL-1")], Some(("name", "vol-1"))) {
            Err(LsmError::UnSupportedSearchKey(msg)) => {
                assert!(msg.contains("pool_id"))
            }
            r => panic!("unexpected {:?}", r),
        }
        // Pools have no pool_id.
        match search_filter(Vec::<Pool>::new(), Some(("pool_id", "POOL-1"))) {
            Err(LsmError::UnSupportedSearchKey(_)) => (),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn info_and_time_out() {
        let mut c = megaraid();
        assert_eq!(c.session().vendor(), Vendor::MegaRaid);
        let info = c.plugin_info();
        assert_eq!(info.name, PLUGIN_NAME);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        c.time_out_set(5000);
        assert_eq!(c.time_out_get(), 5000);
    }

    #[test]
    fn finished_call_needs_no_wait() {
        let c = megaraid();
        let v = c.wait_invoked(Invoked::Done(vol("1", "POOL-1"))).unwrap();
        assert_eq!(v.id, "1");
    }
}
