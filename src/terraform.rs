//! Terraform JSON output target
//!
//! Collects declared resources and auxiliary files in memory, then resolves
//! every symbolic reference when the module is rendered. Resources that are
//! referenced but not declared in the module are looked up by name through a
//! `data` block.

use anyhow::{Context as _, Result};
use declarative::{DocumentHolder, Error, IacTarget, LinkTable, Literal, Record, ResourceKey};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the main output file
pub const MAIN_FILE: &str = "main.tf.json";

/// Directory, relative to the module, holding embedded files
const DATA_DIR: &str = "data";

/// Terraform resource names may not contain dots
fn sanitize(name: &str) -> String {
    name.replace('.', "-")
}

/// Address of a resource within the module
fn address(key: &ResourceKey) -> String {
    format!("{}.{}", key.kind, sanitize(&key.name))
}

fn resolve(links: &LinkTable, literal: &Literal) -> declarative::Result<String> {
    match literal {
        Literal::Link { key, property } => Ok(format!("${{{}.{property}}}", links.address(key)?)),
        Literal::File { path } => Ok(format!("${{file(\"${{path.module}}/{path}\")}}")),
    }
}

/// Builds a Terraform JSON module
#[derive(Debug, Default)]
pub struct TerraformTarget {
    resources: BTreeMap<String, BTreeMap<String, Record>>,
    files: BTreeMap<String, String>,
    links: LinkTable,
    /// Resource owning each address handed out so far
    claimed: BTreeMap<String, ResourceKey>,
    /// Resources referenced through `link`
    referenced: BTreeSet<ResourceKey>,
}

impl TerraformTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared record for a resource, if any
    #[cfg(test)]
    pub fn record(&self, kind: &str, name: &str) -> Option<&Record> {
        self.resources.get(kind)?.get(&sanitize(name))
    }

    /// Embedded files as (path, contents), in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve the address of `key`, rejecting a second resource that
    /// sanitizes to the same address
    fn claim(&mut self, key: &ResourceKey) -> declarative::Result<String> {
        let address = address(key);
        match self.claimed.get(&address) {
            Some(existing) if existing != key => Err(Error::AddressCollision {
                key: key.clone(),
                existing: existing.clone(),
                address,
            }),
            Some(_) => Ok(address),
            None => {
                self.claimed.insert(address.clone(), key.clone());
                Ok(address)
            }
        }
    }

    /// Referenced resources the module does not declare
    fn lookups(&self) -> impl Iterator<Item = &ResourceKey> {
        self.referenced.iter().filter(|key| !self.links.contains(key))
    }

    /// Declared addresses plus `data.` addresses for every lookup
    fn link_table(&self) -> LinkTable {
        let mut links = self.links.clone();
        for key in self.lookups() {
            links.register(key.clone(), format!("data.{}", address(key)));
        }
        links
    }

    /// Resolve every reference and build the module document
    pub fn render(&self) -> declarative::Result<Value> {
        let links = self.link_table();

        let mut kinds = Map::new();
        for (kind, records) in &self.resources {
            let mut resources = Map::new();
            for (name, record) in records {
                let fields = record.resolve(|literal| resolve(&links, literal))?;
                resources.insert(name.clone(), Value::Object(fields));
            }
            kinds.insert(kind.clone(), Value::Object(resources));
        }

        let mut data: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
        for key in self.lookups() {
            log::debug!("{key} is not declared, looking it up by name");
            data.entry(key.kind.as_str())
                .or_default()
                .insert(sanitize(&key.name), json!({ "name": key.name }));
        }

        let mut module = Map::new();
        if !data.is_empty() {
            module.insert("data".to_string(), json!(data));
        }
        module.insert("resource".to_string(), Value::Object(kinds));
        Ok(Value::Object(module))
    }

    /// Write `main.tf.json` and the embedded files under `dir`
    ///
    /// Returns the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let module = self.render()?;

        fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.files.len() + 1);
        let main = dir.join(MAIN_FILE);
        let content = serde_json::to_string_pretty(&module)?;
        fs::write(&main, content + "\n")
            .with_context(|| format!("Could not write {}", main.display()))?;
        written.push(main);

        for (path, contents) in self.files() {
            let file = dir.join(path);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create {}", parent.display()))?;
            }
            fs::write(&file, contents)
                .with_context(|| format!("Could not write {}", file.display()))?;
            written.push(file);
        }

        log::info!("Wrote {} files to {}", written.len(), dir.display());
        Ok(written)
    }
}

impl IacTarget for TerraformTarget {
    fn add_file(
        &mut self,
        kind: &str,
        name: &str,
        field: &'static str,
        document: &DocumentHolder,
    ) -> declarative::Result<Literal> {
        let key = ResourceKey::new(kind, name);
        self.claim(&key)?;
        let contents = document
            .as_string()
            .map_err(|e| Error::render(key, field, e))?;
        let path = format!("{DATA_DIR}/{kind}_{}_{field}", sanitize(name));
        log::debug!("Embedding {} as {path}", document.origin());
        self.files.insert(path.clone(), contents);
        Ok(Literal::File { path })
    }

    fn link(&mut self, key: &ResourceKey, property: &str) -> declarative::Result<Literal> {
        self.claim(key)?;
        self.referenced.insert(key.clone());
        Ok(Literal::link(key.clone(), property))
    }

    fn render_resource(&mut self, kind: &str, name: &str, record: Record) -> declarative::Result<()> {
        let key = ResourceKey::new(kind, name);
        let address = self.claim(&key)?;
        let records = self.resources.entry(kind.to_string()).or_default();
        let sanitized = sanitize(name);
        if records.contains_key(&sanitized) {
            return Err(Error::DuplicateResource(key));
        }
        records.insert(sanitized, record);
        self.links.register(key, address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn declare(target: &mut TerraformTarget, name: &str, role: &str, policy: &str) {
        let file = target
            .add_file("aws_iam_role_policy", name, "policy", &DocumentHolder::text(policy))
            .unwrap();
        let role = target
            .link(&ResourceKey::new("aws_iam_role", role), "name")
            .unwrap();
        let record = Record::new()
            .with_value("name", name)
            .with_literal("role", role)
            .with_literal("policy", file);
        target
            .render_resource("aws_iam_role_policy", name, record)
            .unwrap();
    }

    #[test]
    fn test_render_looks_up_undeclared_role() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "r1", "{}");

        let module = target.render().unwrap();

        assert_eq!(
            module,
            json!({
                "data": {
                    "aws_iam_role": {
                        "r1": { "name": "r1" }
                    }
                },
                "resource": {
                    "aws_iam_role_policy": {
                        "p1": {
                            "name": "p1",
                            "role": "${data.aws_iam_role.r1.name}",
                            "policy": "${file(\"${path.module}/data/aws_iam_role_policy_p1_policy\")}"
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_declared_role_is_referenced_directly() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "r1", "{}");
        target
            .render_resource("aws_iam_role", "r1", Record::new().with_value("name", "r1"))
            .unwrap();

        let module = target.render().unwrap();

        assert!(module.get("data").is_none());
        assert_eq!(
            module["resource"]["aws_iam_role_policy"]["p1"]["role"],
            "${aws_iam_role.r1.name}"
        );
    }

    #[test]
    fn test_dotted_names_are_sanitized() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "nodes.example.com", "nodes.example.com", "{}");

        let module = target.render().unwrap();
        let resource = &module["resource"]["aws_iam_role_policy"]["nodes-example-com"];

        assert_eq!(resource["name"], "nodes.example.com");
        assert_eq!(resource["role"], "${data.aws_iam_role.nodes-example-com.name}");
        assert_eq!(
            module["data"]["aws_iam_role"]["nodes-example-com"]["name"],
            "nodes.example.com"
        );
        assert_eq!(
            resource["policy"],
            "${file(\"${path.module}/data/aws_iam_role_policy_nodes-example-com_policy\")}"
        );
        assert!(target.record("aws_iam_role_policy", "nodes.example.com").is_some());
    }

    #[test]
    fn test_colliding_names_are_rejected() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "a.b", "r1", "{}");

        let err = target
            .render_resource("aws_iam_role_policy", "a-b", Record::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AddressCollision { ref existing, .. }
                if *existing == ResourceKey::new("aws_iam_role_policy", "a.b")
        ));

        let err = target
            .add_file("aws_iam_role_policy", "a-b", "policy", &DocumentHolder::text("{}"))
            .unwrap_err();
        assert!(matches!(err, Error::AddressCollision { .. }));
        assert_eq!(target.files().count(), 1);
    }

    #[test]
    fn test_colliding_link_is_rejected() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "team.a", "{}");

        let err = target
            .link(&ResourceKey::new("aws_iam_role", "team-a"), "name")
            .unwrap_err();

        assert!(matches!(err, Error::AddressCollision { .. }));
        assert_eq!(
            target.render().unwrap()["resource"]["aws_iam_role_policy"]["p1"]["role"],
            "${data.aws_iam_role.team-a.name}"
        );
    }

    #[test]
    fn test_self_link_resolves_after_declaration() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "r1", "{}");

        let link = Literal::self_link(ResourceKey::new("aws_iam_role_policy", "p1"));
        assert_eq!(
            resolve(&target.link_table(), &link).unwrap(),
            "${aws_iam_role_policy.p1.id}"
        );
    }

    #[test]
    fn test_unlinked_reference_is_unresolved() {
        let mut target = TerraformTarget::new();
        let record = Record::new().with_literal(
            "policy",
            Literal::self_link(ResourceKey::new("aws_iam_role_policy", "p1")),
        );
        target
            .render_resource("aws_iam_role_policy_attachment", "a1", record)
            .unwrap();

        assert!(matches!(target.render(), Err(Error::UnresolvedLink(_))));
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "r1", "{}");

        let err = target
            .render_resource("aws_iam_role_policy", "p1", Record::new())
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateResource(_)));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_unreadable_document_is_render_error() {
        let mut target = TerraformTarget::new();

        let err = target
            .add_file(
                "aws_iam_role_policy",
                "p1",
                "policy",
                &DocumentHolder::file("/nonexistent/policy.json"),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Render { field: "policy", .. }));
        assert_eq!(target.files().count(), 0);
    }

    #[test]
    fn test_write_to() {
        let temp = TempDir::new().unwrap();
        let mut target = TerraformTarget::new();
        declare(&mut target, "p1", "r1", r#"{"Version":"2012-10-17"}"#);

        let written = target.write_to(temp.path()).unwrap();

        assert_eq!(written.len(), 2);
        let main: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join(MAIN_FILE)).unwrap())
                .unwrap();
        assert_eq!(main["resource"]["aws_iam_role_policy"]["p1"]["name"], "p1");
        assert_eq!(main["data"]["aws_iam_role"]["r1"]["name"], "r1");
        assert_eq!(
            fs::read_to_string(temp.path().join("data/aws_iam_role_policy_p1_policy")).unwrap(),
            r#"{"Version":"2012-10-17"}"#
        );
    }
}
