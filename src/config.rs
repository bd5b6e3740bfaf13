//! Configuration file - AWS connection settings and the role policies to manage

use anyhow::{Context, Result, bail};
use declarative::{DocumentHolder, Handle};
use iamkit::AwsSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::paths;
use crate::resource::IamRolePolicy;

/// File name of the config inside the config directory
pub const CONFIG_FILE: &str = "cloudup.toml";

/// Root of `cloudup.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudupConfig {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default, rename = "role_policy")]
    pub role_policies: Vec<RolePolicyConfig>,
}

/// `[aws]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
    /// AWS CLI executable, `aws` on `PATH` by default
    pub program: Option<String>,
}

impl AwsConfig {
    /// CLI backend settings
    pub fn settings(&self) -> AwsSettings {
        let defaults = AwsSettings::default();
        AwsSettings {
            program: self
                .program
                .as_deref()
                .map_or(defaults.program, |p| paths::expand(p).display().to_string()),
            profile: self.profile.clone(),
            region: self.region.clone(),
        }
    }
}

/// `[[role_policy]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolePolicyConfig {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    /// Inline policy document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Policy document file, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<String>,
    /// Template variables; when set the document is expanded as a template
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl RolePolicyConfig {
    /// Validate the entry
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("role_policy has an empty name");
        }
        if self.role.trim().is_empty() {
            bail!("role_policy '{}' has an empty role", self.name);
        }
        match (&self.policy, &self.policy_file) {
            (None, None) => bail!("role_policy '{}' needs policy or policy_file", self.name),
            (Some(_), Some(_)) => {
                bail!("role_policy '{}' sets both policy and policy_file", self.name)
            }
            _ => Ok(()),
        }
    }

    /// Policy document, with relative files resolved against `base_dir`
    pub fn document(&self, base_dir: &Path) -> Result<DocumentHolder> {
        let document = match (&self.policy, &self.policy_file) {
            (Some(text), None) => DocumentHolder::text(text.clone()),
            (None, Some(file)) => DocumentHolder::file(base_dir.join(paths::expand(file))),
            _ => bail!(
                "role_policy '{}' needs exactly one of policy or policy_file",
                self.name
            ),
        };

        Ok(if self.vars.is_empty() {
            document
        } else {
            document.with_vars(self.vars.clone())
        })
    }

    /// Build the reconciliation task for this entry
    pub fn task(&self, base_dir: &Path) -> Result<IamRolePolicy> {
        let mut role = Handle::named(&self.role);
        if let Some(id) = &self.role_id {
            role = role.with_id(id);
        }
        Ok(IamRolePolicy::new(&self.name, role, self.document(base_dir)?))
    }
}

impl CloudupConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format in cloudup config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for policy in &self.role_policies {
            policy.validate()?;
            if !seen.insert(policy.name.as_str()) {
                bail!("role_policy '{}' is declared more than once", policy.name);
            }
        }
        Ok(())
    }

    /// Reconciliation tasks for every configured role policy
    pub fn tasks(&self, base_dir: &Path) -> Result<Vec<IamRolePolicy>> {
        self.role_policies
            .iter()
            .map(|p| p.task(base_dir))
            .collect()
    }
}

/// Resolve the config file to use
///
/// An explicit path wins; otherwise `cloudup.toml` in the config directory.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(paths::expand(&path.to_string_lossy())),
        None => Ok(paths::config_dir()?.join(CONFIG_FILE)),
    }
}
