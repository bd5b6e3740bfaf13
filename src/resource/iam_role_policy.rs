//! IAM inline role policy - discover, diff and upsert through IAM or declare as Terraform

use declarative::changes::{self, ChangeSet};
use declarative::{
    ApplyResult, Context, Discovered, DocumentHolder, Error, FieldDiff, Handle, IacTarget, Record,
    Reporter, Result, Task,
};
use iamkit::{Client, PutRolePolicy, decode_document};

/// Terraform resource type of a role policy
pub const KIND: &str = "aws_iam_role_policy";

/// Terraform resource type of the role a policy is attached to
pub const ROLE_KIND: &str = "aws_iam_role";

const NAME: &str = "Name";
const ROLE: &str = "Role";
const POLICY_DOCUMENT: &str = "PolicyDocument";

/// Compare two policy documents as JSON, falling back to their exact text
///
/// IAM and the AWS CLI hand documents back with keys reordered and
/// whitespace dropped.
fn same_document(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// An inline policy attached to an IAM role
///
/// The same type is the desired description and the snapshot discovery
/// returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamRolePolicy {
    /// Provider identifier (`role:policy`), known once discovered
    pub id: Option<String>,
    /// Policy name
    pub name: String,
    /// Role the policy is attached to
    pub role: Handle,
    /// Policy document
    pub policy_document: Option<DocumentHolder>,
}

impl IamRolePolicy {
    pub fn new(name: impl Into<String>, role: Handle, policy_document: DocumentHolder) -> Self {
        Self {
            id: None,
            name: name.into(),
            role,
            policy_document: Some(policy_document),
        }
    }

    fn identity(&self) -> String {
        format!("role={} policy={}", self.role.name, self.name)
    }

    fn render_policy(&self) -> Result<Option<String>> {
        self.policy_document
            .as_ref()
            .map(DocumentHolder::as_string)
            .transpose()
            .map_err(|e| Error::render(self.key(), POLICY_DOCUMENT, e))
    }
}

/// Fields that differ between an actual and a desired role policy
#[derive(Debug, Default)]
pub struct IamRolePolicyChanges {
    pub name: Option<String>,
    pub role: Option<Handle>,
    pub policy_document: Option<DocumentHolder>,
}

impl ChangeSet for IamRolePolicyChanges {
    fn changed_fields(&self) -> Vec<&'static str> {
        changes::present(&[
            (NAME, self.name.is_some()),
            (ROLE, self.role.is_some()),
            (POLICY_DOCUMENT, self.policy_document.is_some()),
        ])
    }
}

impl Task for IamRolePolicy {
    type Cloud = Client;
    type Changes = IamRolePolicyChanges;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn discover(&self, ctx: &Context<'_, Client>) -> Result<Discovered<Self>> {
        let found = ctx
            .cloud
            .find_role_policy(&self.role.name, &self.name)
            .map_err(|e| Error::provider_query(self.key(), self.identity(), e))?;

        let Some(policy) = found else {
            log::debug!("{}: not found", self.key());
            return Ok(Discovered::absent());
        };

        // Only a role with the same name can carry over the known identifier
        let mut role = Handle::named(&policy.role_name);
        if role.name == self.role.name {
            role.id.clone_from(&self.role.id);
        }

        let policy_document = policy
            .policy_document
            .as_deref()
            .map(decode_document)
            .transpose()
            .map_err(|e| Error::decode(self.key(), POLICY_DOCUMENT, e))?
            .map(DocumentHolder::Text);

        let id = format!("{}:{}", policy.role_name, policy.policy_name);
        let actual = Self {
            id: Some(id.clone()),
            name: policy.policy_name,
            role,
            policy_document,
        };

        Ok(Discovered::found(actual, Some(id)))
    }

    fn changes(actual: &Self, desired: &Self) -> Result<IamRolePolicyChanges> {
        let policy_document = match desired.render_policy()? {
            Some(policy)
                if !actual
                    .render_policy()?
                    .is_some_and(|before| same_document(&before, &policy)) =>
            {
                desired.policy_document.clone()
            }
            _ => None,
        };

        Ok(IamRolePolicyChanges {
            name: changes::field(&actual.name, &desired.name),
            role: (actual.role.name != desired.role.name).then(|| desired.role.clone()),
            policy_document,
        })
    }

    fn validate(
        actual: Option<&Self>,
        desired: &Self,
        _changes: Option<&IamRolePolicyChanges>,
    ) -> Result<()> {
        if actual.is_some() && desired.name.is_empty() {
            return Err(Error::missing_field(desired.key(), NAME));
        }
        Ok(())
    }

    fn apply_live(
        &self,
        cloud: &Client,
        actual: Option<&Self>,
        changes: Option<&IamRolePolicyChanges>,
        reporter: &dyn Reporter,
    ) -> Result<ApplyResult> {
        let policy_changed = changes.is_some_and(|c| c.policy_document.is_some());
        if actual.is_some() && !policy_changed {
            return Ok(ApplyResult::NoChange);
        }

        let key = self.key();
        let policy = self
            .render_policy()?
            .ok_or_else(|| Error::render(key.clone(), POLICY_DOCUMENT, "no policy document"))?;

        match actual {
            None => log::debug!("Creating IAM role policy {}", self.identity()),
            Some(actual) => {
                let before = actual.render_policy()?.unwrap_or_default();
                if same_document(&before, &policy) {
                    reporter.on_field_unchanged(&key, POLICY_DOCUMENT);
                } else {
                    reporter.on_field_changed(&key, POLICY_DOCUMENT, &before, &policy);
                }
            }
        }

        let request = PutRolePolicy::new(&self.role.name, &self.name, policy);
        cloud
            .put_role_policy(&request)
            .map_err(|e| Error::apply(key, self.identity(), e))?;

        Ok(if actual.is_some() {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }

    fn apply_iac(&self, target: &mut dyn IacTarget) -> Result<()> {
        let document = self.policy_document.as_ref().ok_or_else(|| {
            Error::render(self.key(), POLICY_DOCUMENT, "no policy document")
        })?;
        let policy = target.add_file(KIND, &self.name, "policy", document)?;
        let role = target.link(&self.role.key(ROLE_KIND), "name")?;

        let record = Record::new()
            .with_value("name", self.name.clone())
            .with_literal("role", role)
            .with_literal("policy", policy);

        target.render_resource(KIND, &self.name, record)
    }

    fn field_diffs(
        &self,
        actual: Option<&Self>,
        changes: Option<&IamRolePolicyChanges>,
    ) -> Result<Vec<FieldDiff>> {
        let mut diffs = Vec::new();

        if let Some(actual) = actual
            && let Some(role) = changes.and_then(|c| c.role.as_ref())
        {
            diffs.push(FieldDiff {
                field: ROLE.to_string(),
                before: Some(actual.role.name.clone()),
                after: role.name.clone(),
            });
        }

        let policy_changed = changes.is_none_or(|c| c.policy_document.is_some());
        if policy_changed && let Some(after) = self.render_policy()? {
            let before = actual.map(Self::render_policy).transpose()?.flatten();
            diffs.push(FieldDiff {
                field: POLICY_DOCUMENT.to_string(),
                before: before.or_else(|| actual.map(|_| String::new())),
                after,
            });
        }

        Ok(diffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::TerraformTarget;
    use declarative::{
        Backend, Literal, NoReport, RecordingReporter, ReportEvent, ResourceKey, apply_discovered,
        run_task,
    };
    use iamkit::{Call, MemoryBackend, RetryConfig};

    const POLICY: &str = r#"{"Version":"2012-10-17"}"#;

    fn client(backend: &MemoryBackend) -> Client {
        Client::with_backend(Box::new(backend.clone())).with_retry_config(RetryConfig::no_retry())
    }

    fn desired(policy: &str) -> IamRolePolicy {
        IamRolePolicy::new("p1", Handle::named("r1"), DocumentHolder::text(policy))
    }

    fn snapshot(policy: &str) -> IamRolePolicy {
        IamRolePolicy {
            id: Some("r1:p1".to_string()),
            ..desired(policy)
        }
    }

    fn run_live(task: &IamRolePolicy, cloud: &Client, reporter: &dyn Reporter) -> ApplyResult {
        run_task(task, Backend::Live(Context::new(cloud)), reporter)
            .unwrap()
            .result
    }

    #[test]
    fn test_create_puts_exact_policy_on_role() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);

        let result = run_live(&desired(POLICY), &cloud, &NoReport);

        assert_eq!(result, ApplyResult::Created);
        assert_eq!(backend.puts(), vec![PutRolePolicy::new("r1", "p1", POLICY)]);
    }

    #[test]
    fn test_unchanged_policy_makes_no_provider_calls() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let task = desired(POLICY);
        let changes = IamRolePolicy::changes(&snapshot(POLICY), &task).unwrap();
        assert!(changes.is_empty());

        let result = task
            .apply_live(&cloud, Some(&snapshot(POLICY)), Some(&changes), &NoReport)
            .unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_update_puts_new_policy_and_reports_diff() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let reporter = RecordingReporter::new();
        let task = desired("B");
        let actual = snapshot("A");
        let changes = IamRolePolicy::changes(&actual, &task).unwrap();
        assert_eq!(changes.changed_fields(), vec![POLICY_DOCUMENT]);

        let result = task
            .apply_live(&cloud, Some(&actual), Some(&changes), &reporter)
            .unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(backend.puts(), vec![PutRolePolicy::new("r1", "p1", "B")]);
        assert_eq!(
            reporter.events(),
            vec![ReportEvent::FieldChanged {
                key: ResourceKey::new(KIND, "p1"),
                field: POLICY_DOCUMENT.to_string(),
                before: "A".to_string(),
                after: "B".to_string(),
            }]
        );
    }

    #[test]
    fn test_flagged_but_identical_policy_warns_and_still_puts() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let reporter = RecordingReporter::new();
        let changes = IamRolePolicyChanges {
            policy_document: Some(DocumentHolder::text("A")),
            ..Default::default()
        };

        let result = desired("A")
            .apply_live(&cloud, Some(&snapshot("A")), Some(&changes), &reporter)
            .unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(backend.puts().len(), 1);
        assert!(matches!(
            reporter.events().as_slice(),
            [ReportEvent::FieldUnchanged { .. }]
        ));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let task = desired(POLICY);

        assert_eq!(run_live(&task, &cloud, &NoReport), ApplyResult::Created);
        assert_eq!(run_live(&task, &cloud, &NoReport), ApplyResult::NoChange);
        assert_eq!(backend.puts().len(), 1);
    }

    #[test]
    fn test_missing_policy_is_absent() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);

        let discovered = desired(POLICY).discover(&Context::new(&cloud)).unwrap();

        assert!(discovered.actual.is_none());
        assert!(discovered.id.is_none());
        assert_eq!(
            backend.calls(),
            vec![Call::GetRolePolicy {
                role_name: "r1".to_string(),
                policy_name: "p1".to_string()
            }]
        );
    }

    #[test]
    fn test_discover_decodes_document() {
        let backend = MemoryBackend::new();
        backend.insert_raw("r1", "p1", "%7B%22Statement%22%3A+%5B%5D%7D");
        let cloud = client(&backend);

        let discovered = desired(POLICY).discover(&Context::new(&cloud)).unwrap();

        let actual = discovered.actual.unwrap();
        assert_eq!(
            actual.policy_document,
            Some(DocumentHolder::text(r#"{"Statement": []}"#))
        );
        assert_eq!(actual.name, "p1");
        assert_eq!(discovered.id.as_deref(), Some("r1:p1"));
    }

    #[test]
    fn test_discover_rejects_malformed_escape() {
        let backend = MemoryBackend::new();
        backend.insert_raw("r1", "p1", "%7B%ZZ");
        let cloud = client(&backend);

        let err = desired(POLICY).discover(&Context::new(&cloud)).unwrap_err();

        assert!(matches!(err, Error::Decode { field: POLICY_DOCUMENT, .. }));
        assert_eq!(err.key(), &ResourceKey::new(KIND, "p1"));
    }

    #[test]
    fn test_discover_wraps_provider_errors() {
        let backend = MemoryBackend::new();
        backend.throttle_next(1);
        let cloud = client(&backend);

        let err = desired(POLICY).discover(&Context::new(&cloud)).unwrap_err();

        assert!(matches!(err, Error::ProviderQuery { .. }));
        assert!(err.to_string().contains("role=r1 policy=p1"));
    }

    #[test]
    fn test_discover_does_not_touch_desired() {
        let backend = MemoryBackend::new();
        backend.insert("r1", "p1", POLICY);
        let cloud = client(&backend);
        let task = desired(POLICY);

        let discovered = task.discover(&Context::new(&cloud)).unwrap();

        assert_eq!(discovered.id.as_deref(), Some("r1:p1"));
        assert_eq!(task.id, None);
    }

    #[test]
    fn test_role_id_carried_only_for_same_role_name() {
        let backend = MemoryBackend::new();
        backend.insert("r1", "p1", POLICY);
        let cloud = client(&backend);
        let ctx = Context::new(&cloud);

        let same = IamRolePolicy::new(
            "p1",
            Handle::named("r1").with_id("AROA1"),
            DocumentHolder::text(POLICY),
        );
        let actual = same.discover(&ctx).unwrap().actual.unwrap();
        assert_eq!(actual.role, Handle::named("r1").with_id("AROA1"));
    }

    #[test]
    fn test_role_id_not_carried_across_role_names() {
        let backend = MemoryBackend::new();
        backend.create_role("Nodes");
        backend.insert("Nodes", "p1", POLICY);
        let cloud = client(&backend);

        let task = IamRolePolicy::new(
            "p1",
            Handle::named("nodes").with_id("AROA1"),
            DocumentHolder::text(POLICY),
        );
        let actual = task.discover(&Context::new(&cloud)).unwrap().actual.unwrap();

        assert_eq!(actual.role.name, "Nodes");
        assert_eq!(actual.role.id, None);
        assert_eq!(task.role.id.as_deref(), Some("AROA1"));
    }

    #[test]
    fn test_reformatted_document_is_unchanged() {
        let backend = MemoryBackend::new();
        // The AWS CLI returns the document as a JSON object; re-serialized it
        // comes back compact with sorted keys.
        let desired_text = "{\n  \"Version\": \"2012-10-17\",\n  \"Statement\": []\n}";
        let returned: serde_json::Value = serde_json::from_str(desired_text).unwrap();
        let returned = serde_json::to_string(&returned).unwrap();
        assert_eq!(returned, r#"{"Statement":[],"Version":"2012-10-17"}"#);
        backend.insert("r1", "p1", &returned);
        let cloud = client(&backend);
        let task = desired(desired_text);

        let actual = task.discover(&Context::new(&cloud)).unwrap().actual.unwrap();
        let changes = IamRolePolicy::changes(&actual, &task).unwrap();

        assert!(changes.is_empty());
        assert_eq!(run_live(&task, &cloud, &NoReport), ApplyResult::NoChange);
        assert!(backend.puts().is_empty());
    }

    #[test]
    fn test_same_document() {
        assert!(same_document(r#"{"a": 1, "b": [2]}"#, r#"{"b":[2],"a":1}"#));
        assert!(!same_document(r#"{"a": 1}"#, r#"{"a": 2}"#));
        assert!(same_document("A", "A"));
        assert!(!same_document("A", " A"));
    }

    #[test]
    fn test_validate_requires_name_when_resource_exists() {
        let mut task = desired(POLICY);
        task.name = String::new();

        let err = IamRolePolicy::validate(Some(&snapshot(POLICY)), &task, None).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { field: NAME, .. }));

        assert!(IamRolePolicy::validate(None, &task, None).is_ok());
    }

    #[test]
    fn test_validation_failure_skips_apply() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let mut task = desired(POLICY);
        task.name = String::new();
        let discovered = Discovered::found(snapshot("A"), None);

        let err = apply_discovered(&task, discovered, &Context::new(&cloud), &NoReport).unwrap_err();

        assert!(matches!(err, Error::MissingRequiredField { .. }));
        assert!(backend.puts().is_empty());
    }

    #[test]
    fn test_put_failure_is_apply_error() {
        let backend = MemoryBackend::new();
        backend.deny_puts("not authorized to perform iam:PutRolePolicy");
        let cloud = client(&backend);

        let err = run_task(&desired(POLICY), Backend::Live(Context::new(&cloud)), &NoReport)
            .unwrap_err();

        assert!(matches!(err, Error::Apply { .. }));
        assert!(err.to_string().contains("iam:PutRolePolicy"));
    }

    #[test]
    fn test_render_failure_is_render_error() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);
        let task = IamRolePolicy::new(
            "p1",
            Handle::named("r1"),
            DocumentHolder::file("/nonexistent/policy.json"),
        );

        let err = task.apply_live(&cloud, None, None, &NoReport).unwrap_err();

        assert!(matches!(err, Error::Render { .. }));
        assert!(backend.puts().is_empty());
    }

    #[test]
    fn test_dry_run_skips_put() {
        let backend = MemoryBackend::new();
        let cloud = client(&backend);

        let outcome =
            run_task(&desired(POLICY), Backend::Live(Context::dry_run(&cloud)), &NoReport).unwrap();

        assert!(matches!(outcome.result, ApplyResult::Skipped { .. }));
        assert!(backend.puts().is_empty());
    }

    #[test]
    fn test_iac_declares_record_and_file() {
        let mut target = TerraformTarget::new();

        let outcome = run_task(&desired(POLICY), Backend::Iac(&mut target), &NoReport).unwrap();
        assert_eq!(outcome.result, ApplyResult::Declared);

        let record = target.record(KIND, "p1").unwrap();
        assert_eq!(
            record.get("role"),
            Some(&declarative::Field::Literal(Literal::link(
                ResourceKey::new(ROLE_KIND, "r1"),
                "name"
            )))
        );
        assert_eq!(
            record.get("policy"),
            Some(&declarative::Field::Literal(Literal::File {
                path: "data/aws_iam_role_policy_p1_policy".to_string()
            }))
        );
        assert_eq!(
            target.files().collect::<Vec<_>>(),
            vec![("data/aws_iam_role_policy_p1_policy", POLICY)]
        );
    }

    #[test]
    fn test_iac_needs_no_provider() {
        let mut target = TerraformTarget::new();
        let task: &dyn declarative::Reconcile<Client> = &desired(POLICY);

        task.run(Backend::Iac(&mut target), &NoReport).unwrap();

        let json = target.render().unwrap();
        assert_eq!(
            json["resource"][KIND]["p1"]["role"],
            "${data.aws_iam_role.r1.name}"
        );
    }

    #[test]
    fn test_self_link() {
        assert_eq!(
            desired(POLICY).self_link(),
            Literal::link(ResourceKey::new(KIND, "p1"), "id")
        );
    }

    #[test]
    fn test_field_diffs_for_update() {
        let diffs = desired("B")
            .field_diffs(
                Some(&snapshot("A")),
                Some(&IamRolePolicy::changes(&snapshot("A"), &desired("B")).unwrap()),
            )
            .unwrap();

        assert_eq!(
            diffs,
            vec![FieldDiff {
                field: POLICY_DOCUMENT.to_string(),
                before: Some("A".to_string()),
                after: "B".to_string(),
            }]
        );
    }
}
