//! In-memory IAM backend for tests and offline runs.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{PutRolePolicy, RolePolicy};
use crate::wire::{decode_document, encode_document};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call received by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `GetRolePolicy`
    GetRolePolicy {
        /// Role queried
        role_name: String,
        /// Policy queried
        policy_name: String,
    },
    /// `PutRolePolicy`
    PutRolePolicy(PutRolePolicy),
}

#[derive(Debug, Default)]
struct State {
    /// Wire-form documents keyed by (role, policy)
    policies: BTreeMap<(String, String), String>,
    /// Canonical role names keyed by their lowercase form
    roles: BTreeMap<String, String>,
    calls: Vec<Call>,
    throttled_calls: u32,
    deny_puts: Option<String>,
}

/// Backend that keeps role policies in memory.
///
/// Clones share state, so a test can hand one clone to a client and inspect
/// the other. Documents come back percent-encoded the way IAM returns them.
/// Role names registered with [`MemoryBackend::create_role`] match
/// case-insensitively and are reported in their registered spelling, as IAM
/// does.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl State {
    fn canonical_role(&self, role_name: &str) -> String {
        self.roles
            .get(&role_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| role_name.to_string())
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a role under its canonical spelling.
    pub fn create_role(&self, role_name: &str) {
        self.state()
            .roles
            .insert(role_name.to_lowercase(), role_name.to_string());
    }

    /// Store a plain-text policy document.
    pub fn insert(&self, role_name: &str, policy_name: &str, document: &str) {
        self.insert_raw(role_name, policy_name, &encode_document(document));
    }

    /// Store a document exactly as IAM would return it.
    pub fn insert_raw(&self, role_name: &str, policy_name: &str, wire: &str) {
        let mut state = self.state();
        let role_name = state.canonical_role(role_name);
        state
            .policies
            .insert((role_name, policy_name.to_string()), wire.to_string());
    }

    /// Plain-text document currently stored, if any.
    pub fn document(&self, role_name: &str, policy_name: &str) -> Option<String> {
        let state = self.state();
        let wire = state
            .policies
            .get(&(state.canonical_role(role_name), policy_name.to_string()))?;
        decode_document(wire).ok()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Every put request received so far, in order.
    pub fn puts(&self) -> Vec<PutRolePolicy> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::PutRolePolicy(request) => Some(request.clone()),
                Call::GetRolePolicy { .. } => None,
            })
            .collect()
    }

    /// Answer the next `count` calls with a throttling error.
    pub fn throttle_next(&self, count: u32) {
        self.state().throttled_calls = count;
    }

    /// Reject every put with an access denied error.
    pub fn deny_puts(&self, message: &str) {
        self.state().deny_puts = Some(message.to_string());
    }

    fn take_throttle(state: &mut State) -> Result<()> {
        if state.throttled_calls > 0 {
            state.throttled_calls -= 1;
            return Err(Error::Throttled {
                message: "Rate exceeded".to_string(),
            });
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn get_role_policy(&self, role_name: &str, policy_name: &str) -> Result<RolePolicy> {
        let mut state = self.state();
        state.calls.push(Call::GetRolePolicy {
            role_name: role_name.to_string(),
            policy_name: policy_name.to_string(),
        });
        Self::take_throttle(&mut state)?;

        let role_name = state.canonical_role(role_name);
        let wire = state
            .policies
            .get(&(role_name.clone(), policy_name.to_string()))
            .cloned()
            .ok_or_else(|| Error::NoSuchEntity {
                message: format!("The role policy with name {policy_name} cannot be found."),
            })?;

        Ok(RolePolicy {
            role_name,
            policy_name: policy_name.to_string(),
            policy_document: Some(wire),
        })
    }

    fn put_role_policy(&self, request: &PutRolePolicy) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::PutRolePolicy(request.clone()));
        Self::take_throttle(&mut state)?;

        if let Some(message) = &state.deny_puts {
            return Err(Error::AccessDenied {
                message: message.clone(),
            });
        }

        let wire = encode_document(&request.policy_document);
        let role_name = state.canonical_role(&request.role_name);
        state
            .policies
            .insert((role_name, request.policy_name.clone()), wire);
        Ok(())
    }
}
