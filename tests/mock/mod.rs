/*
 * Copyright (C) 2017 Red Hat, Inc.
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; If not, see <http://www.gnu.org/licenses/>.
 *
 * Author: Gris Ge <fge@redhat.com>
 */

//! In-memory CIM object graph standing in for a WBEM client.
//!
//! Instances live in a flat list, associations are undirected links with a
//! role on each end. Extrinsic methods are plain functions registered per
//! method name and mutate the graph the way a provider would.

#![allow(dead_code)]

pub mod array;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

use lsm_smis::{
    AssocQuery, CimError, CimInstance, CimParams, CimPath, CimResult,
    CimValue, WbemConnection, CIM_ERR_INVALID_NAMESPACE,
    CIM_ERR_INVALID_PARAMETER, CIM_ERR_METHOD_NOT_AVAILABLE,
    CIM_ERR_NOT_FOUND,
};

/// Namespace holding the array objects.
pub const NS: &str = "root/mock";
/// Namespace holding the profile registry.
pub const INTEROP_NS: &str = "interop";

pub type Handler =
    fn(&mut MockState, &CimPath, &CimParams) -> CimResult<(u32, CimParams)>;

struct Link {
    assoc: String,
    ends: [(CimPath, String); 2],
}

impl Link {
    fn joins(&self, a: &CimPath, b: &CimPath) -> bool {
        (self.ends[0].0.same_object(a) && self.ends[1].0.same_object(b))
            || (self.ends[0].0.same_object(b) && self.ends[1].0.same_object(a))
    }

    fn touches(&self, path: &CimPath) -> bool {
        self.ends.iter().any(|(p, _)| p.same_object(path))
    }
}

fn is_a(parents: &BTreeMap<String, String>, class: &str, target: &str) -> bool {
    let target = target.to_lowercase();
    let mut cur = class.to_lowercase();
    loop {
        if cur == target {
            return true;
        }
        match parents.get(&cur) {
            Some(p) => cur = p.clone(),
            None => return false,
        }
    }
}

fn role_ok(wanted: Option<&str>, role: &str) -> bool {
    wanted.map_or(true, |w| w.eq_ignore_ascii_case(role))
}

#[derive(Default)]
pub struct MockState {
    instances: Vec<CimInstance>,
    links: Vec<Link>,
    parents: BTreeMap<String, String>,
    namespaces: Vec<String>,
    // Vendor namespace -> namespace holding the objects.
    aliases: BTreeMap<String, String>,
    // Class or method name -> fault raised instead of answering.
    faults: BTreeMap<String, CimError>,
    counter: u32,
    /// Methods invoked so far, in order.
    pub calls: Vec<String>,
    /// Input parameters of the latest invocation of each method.
    pub last_params: BTreeMap<String, CimParams>,
    /// Volume creation answers with a job instead of the volume.
    pub async_jobs: bool,
}

impl MockState {
    pub fn is_a(&self, class: &str, target: &str) -> bool {
        is_a(&self.parents, class, target)
    }

    pub fn inherit(&mut self, class: &str, parent: &str) {
        self.parents
            .insert(class.to_lowercase(), parent.to_lowercase());
    }

    pub fn next_num(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.next_num())
    }

    pub fn add(&mut self, inst: CimInstance) -> CimPath {
        let path = inst.path.clone();
        self.instances.push(inst);
        path
    }

    pub fn find(&self, path: &CimPath) -> Option<&CimInstance> {
        self.instances.iter().find(|i| i.path.same_object(path))
    }

    /// Path of the first instance of `class` whose string property `prop`
    /// equals `val`.
    pub fn find_by(&self, class: &str, prop: &str, val: &str) -> Option<CimPath> {
        self.instances
            .iter()
            .find(|i| self.is_a(i.classname(), class) && i.str_prop(prop) == Some(val))
            .map(|i| i.path.clone())
    }

    pub fn of_class(&self, class: &str) -> Vec<CimInstance> {
        self.instances
            .iter()
            .filter(|i| self.is_a(i.classname(), class))
            .cloned()
            .collect()
    }

    pub fn set_prop<V: Into<CimValue>>(&mut self, path: &CimPath, name: &str, val: V) {
        if let Some(inst) = self
            .instances
            .iter_mut()
            .find(|i| i.path.same_object(path))
        {
            inst.properties.insert(name.to_string(), val.into());
        }
    }

    /// Remove the instance along with every association it takes part in.
    pub fn remove(&mut self, path: &CimPath) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| !i.path.same_object(path));
        self.links.retain(|l| !l.touches(path));
        before != self.instances.len()
    }

    pub fn link(&mut self, assoc: &str, a: &CimPath, b: &CimPath) {
        self.link_roles(assoc, a, "Antecedent", b, "Dependent");
    }

    pub fn link_roles(
        &mut self,
        assoc: &str,
        a: &CimPath,
        a_role: &str,
        b: &CimPath,
        b_role: &str,
    ) {
        self.links.push(Link {
            assoc: assoc.to_string(),
            ends: [
                (a.clone(), a_role.to_string()),
                (b.clone(), b_role.to_string()),
            ],
        });
    }

    /// Drop associations of `assoc` class, subclasses included, between
    /// `a` and `b`.
    pub fn unlink(&mut self, assoc: &str, a: &CimPath, b: &CimPath) {
        let parents = &self.parents;
        self.links
            .retain(|l| !(is_a(parents, &l.assoc, assoc) && l.joins(a, b)));
    }

    fn linked_paths(&self, path: &CimPath, query: &AssocQuery) -> Vec<CimPath> {
        let mut rc: Vec<CimPath> = Vec::new();
        for l in &self.links {
            if let Some(assoc) = query.assoc_class {
                if !self.is_a(&l.assoc, assoc) {
                    continue;
                }
            }
            for i in 0..2 {
                let (ref me, ref my_role) = l.ends[i];
                let (ref other, ref other_role) = l.ends[1 - i];
                if !me.same_object(path)
                    || !role_ok(query.role, my_role)
                    || !role_ok(query.result_role, other_role)
                {
                    continue;
                }
                let inst = match self.find(other) {
                    Some(i) => i,
                    None => continue,
                };
                if let Some(result_class) = query.result_class {
                    if !self.is_a(inst.classname(), result_class) {
                        continue;
                    }
                }
                if !rc.iter().any(|p| p.same_object(&inst.path)) {
                    rc.push(inst.path.clone());
                }
            }
        }
        rc
    }

    /// Objects at the `role` end of every `assoc` association.
    pub fn link_ends(&self, assoc: &str, role: &str) -> Vec<CimPath> {
        self.links
            .iter()
            .filter(|l| self.is_a(&l.assoc, assoc))
            .flat_map(|l| l.ends.iter())
            .filter(|(_, r)| r.eq_ignore_ascii_case(role))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Objects of `result_class` associated to `path` through `assoc`.
    pub fn linked(&self, assoc: &str, path: &CimPath, result_class: &str) -> Vec<CimPath> {
        self.linked_paths(
            path,
            &AssocQuery::new(assoc).result_class(result_class),
        )
    }

    fn resolve_namespace(&self, namespace: &str) -> Option<String> {
        if let Some(target) = self.aliases.get(&namespace.to_lowercase()) {
            return Some(target.clone());
        }
        self.namespaces
            .iter()
            .find(|n| n.eq_ignore_ascii_case(namespace))
            .cloned()
    }

    fn fault(&self, name: &str) -> CimResult<()> {
        match self.faults.get(&name.to_lowercase()) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct MockWbem {
    state: Rc<RefCell<MockState>>,
    handlers: Rc<RefCell<BTreeMap<String, Handler>>>,
    timeout: Rc<Cell<u32>>,
}

impl MockWbem {
    pub fn new(namespaces: &[&str]) -> MockWbem {
        let state = MockState {
            namespaces: namespaces.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        };
        MockWbem {
            state: Rc::new(RefCell::new(state)),
            handlers: Rc::new(RefCell::new(BTreeMap::new())),
            timeout: Rc::new(Cell::new(0)),
        }
    }

    pub fn state(&self) -> Ref<MockState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<MockState> {
        self.state.borrow_mut()
    }

    pub fn handle(&self, method: &str, handler: Handler) {
        self.handlers
            .borrow_mut()
            .insert(method.to_string(), handler);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn called(&self, method: &str) -> bool {
        self.state().calls.iter().any(|c| c == method)
    }

    pub fn timeout(&self) -> u32 {
        self.timeout.get()
    }

    pub fn last_params(&self, method: &str) -> Option<CimParams> {
        self.state().last_params.get(method).cloned()
    }

    /// Serve `namespace` with the objects of `target`, the way vendor
    /// providers expose one tree under their own name.
    pub fn alias_namespace(&self, namespace: &str, target: &str) {
        self.state_mut()
            .aliases
            .insert(namespace.to_lowercase(), target.to_string());
    }

    /// Raise `err` on every enumeration of class `name` and every
    /// invocation of method `name`.
    pub fn fail(&self, name: &str, err: CimError) {
        self.state_mut().faults.insert(name.to_lowercase(), err);
    }

    pub fn heal(&self, name: &str) {
        self.state_mut().faults.remove(&name.to_lowercase());
    }

    /// Finish every job with the given `OperationalStatus`.
    pub fn finish_jobs(&self, op_status: Vec<u64>) {
        let mut st = self.state_mut();
        for job in st.of_class("CIM_ConcreteJob") {
            st.set_prop(&job.path, "JobState", 7u64);
            st.set_prop(&job.path, "PercentComplete", 100u64);
            st.set_prop(&job.path, "OperationalStatus", op_status.clone());
        }
    }

    fn check_namespace(&self, namespace: &str) -> CimResult<String> {
        self.state().resolve_namespace(namespace).ok_or_else(|| {
            CimError::Cim(
                CIM_ERR_INVALID_NAMESPACE,
                format!("Namespace {} not found", namespace),
            )
        })
    }
}

fn not_found(path: &CimPath) -> CimError {
    CimError::Cim(CIM_ERR_NOT_FOUND, format!("{} not found", path))
}

impl WbemConnection for MockWbem {
    fn enumerate_instances(
        &self,
        class_name: &str,
        namespace: &str,
        _property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>> {
        let namespace = self.check_namespace(namespace)?;
        let st = self.state();
        st.fault(class_name)?;
        Ok(st
            .of_class(class_name)
            .into_iter()
            .filter(|i| {
                i.path
                    .namespace
                    .as_ref()
                    .map_or(false, |n| n.eq_ignore_ascii_case(&namespace))
            })
            .collect())
    }

    fn enumerate_instance_names(
        &self,
        class_name: &str,
        namespace: &str,
    ) -> CimResult<Vec<CimPath>> {
        Ok(self
            .enumerate_instances(class_name, namespace, None)?
            .into_iter()
            .map(|i| i.path)
            .collect())
    }

    fn get_instance(
        &self,
        path: &CimPath,
        _property_list: Option<&[&str]>,
    ) -> CimResult<CimInstance> {
        self.state().find(path).cloned().ok_or_else(|| not_found(path))
    }

    fn associators(
        &self,
        path: &CimPath,
        query: &AssocQuery,
        _property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>> {
        let st = self.state();
        Ok(st
            .linked_paths(path, query)
            .iter()
            .filter_map(|p| st.find(p).cloned())
            .collect())
    }

    fn associator_names(
        &self,
        path: &CimPath,
        query: &AssocQuery,
    ) -> CimResult<Vec<CimPath>> {
        Ok(self.state().linked_paths(path, query))
    }

    fn references(
        &self,
        path: &CimPath,
        result_class: Option<&str>,
        _property_list: Option<&[&str]>,
    ) -> CimResult<Vec<CimInstance>> {
        let st = self.state();
        Ok(st
            .links
            .iter()
            .filter(|l| result_class.map_or(true, |c| st.is_a(&l.assoc, c)))
            .filter(|l| l.touches(path))
            .map(|l| {
                CimInstance::new(CimPath::new(&l.assoc).with_namespace(NS))
                    .with_prop(&l.ends[0].1, l.ends[0].0.clone())
                    .with_prop(&l.ends[1].1, l.ends[1].0.clone())
            })
            .collect())
    }

    fn invoke_method(
        &self,
        method: &str,
        path: &CimPath,
        params: &CimParams,
    ) -> CimResult<(u32, CimParams)> {
        let handler = self.handlers.borrow().get(method).cloned();
        let mut st = self.state_mut();
        st.calls.push(method.to_string());
        st.last_params.insert(method.to_string(), params.clone());
        st.fault(method)?;
        match handler {
            Some(h) => h(&mut *st, path, params),
            None => Err(CimError::Cim(
                CIM_ERR_METHOD_NOT_AVAILABLE,
                format!("{}() is not implemented", method),
            )),
        }
    }

    fn delete_instance(&self, path: &CimPath) -> CimResult<()> {
        if self.state_mut().remove(path) {
            Ok(())
        } else {
            Err(not_found(path))
        }
    }

    fn set_timeout(&self, ms: u32) {
        self.timeout.set(ms);
    }
}

pub fn invalid(what: &str) -> CimError {
    CimError::Cim(
        CIM_ERR_INVALID_PARAMETER,
        format!("Invalid parameter {}", what),
    )
}

pub fn out(pairs: Vec<(&str, CimValue)>) -> CimParams {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub fn param_str(params: &CimParams, key: &str) -> CimResult<String> {
    params
        .get(key)
        .and_then(CimValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(key))
}

pub fn param_u64(params: &CimParams, key: &str) -> CimResult<u64> {
    params
        .get(key)
        .and_then(CimValue::as_u64)
        .ok_or_else(|| invalid(key))
}

pub fn param_bool(params: &CimParams, key: &str) -> bool {
    params.get(key).and_then(CimValue::as_bool).unwrap_or(false)
}

pub fn param_path(params: &CimParams, key: &str) -> CimResult<CimPath> {
    params
        .get(key)
        .and_then(CimValue::as_path)
        .cloned()
        .ok_or_else(|| invalid(key))
}

/// Reference array parameter, a single reference is taken as one element.
pub fn param_paths(params: &CimParams, key: &str) -> Vec<CimPath> {
    match params.get(key) {
        Some(CimValue::Array(a)) => {
            a.iter().filter_map(CimValue::as_path).cloned().collect()
        }
        Some(CimValue::Path(p)) => vec![p.clone()],
        _ => Vec::new(),
    }
}

pub fn param_strs(params: &CimParams, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(CimValue::Array(a)) => a
            .iter()
            .filter_map(CimValue::as_str)
            .map(str::to_string)
            .collect(),
        Some(CimValue::Str(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
