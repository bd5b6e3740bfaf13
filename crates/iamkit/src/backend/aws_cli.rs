//! IAM backend using the `aws` command line tool.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{AwsSettings, PutRolePolicy, RolePolicy};
use crate::wire::encode_document;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Backend that executes real `aws iam` commands.
pub struct AwsCliBackend {
    /// Resolved path to the aws executable
    program: PathBuf,
    settings: AwsSettings,
}

impl AwsCliBackend {
    /// Create a new AwsCliBackend.
    ///
    /// Returns an error if the configured program cannot be found.
    pub fn new(settings: AwsSettings) -> Result<Self> {
        let program = find_program(&settings.program).ok_or_else(|| Error::CliNotFound {
            program: settings.program.clone(),
        })?;
        log::debug!("Using AWS CLI at {}", program.display());
        Ok(Self { program, settings })
    }

    /// Global arguments shared by every call.
    fn global_args(&self) -> Vec<String> {
        let mut args = vec!["--output".to_string(), "json".to_string()];
        if let Some(profile) = &self.settings.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        if let Some(region) = &self.settings.region {
            args.extend(["--region".to_string(), region.clone()]);
        }
        args
    }

    /// Run an `aws iam` subcommand and return output.
    fn run_iam(&self, operation: &str, args: &[&str]) -> Result<Output> {
        log::trace!("aws iam {operation} {}", args.join(" "));
        Command::new(&self.program)
            .args(self.global_args())
            .arg("iam")
            .arg(operation)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute {}: {e}", self.program.display()),
                stderr: String::new(),
            })
    }

    /// Run an `aws iam` subcommand and check for success.
    fn run_iam_checked(&self, operation: &str, args: &[&str]) -> Result<String> {
        let output = self.run_iam(operation, args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_aws_output(&stderr, operation));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Backend for AwsCliBackend {
    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn get_role_policy(&self, role_name: &str, policy_name: &str) -> Result<RolePolicy> {
        let stdout = self.run_iam_checked(
            "get-role-policy",
            &["--role-name", role_name, "--policy-name", policy_name],
        )?;
        parse_role_policy(&stdout)
    }

    fn put_role_policy(&self, request: &PutRolePolicy) -> Result<()> {
        self.run_iam_checked(
            "put-role-policy",
            &[
                "--role-name",
                &request.role_name,
                "--policy-name",
                &request.policy_name,
                "--policy-document",
                &request.policy_document,
            ],
        )?;
        Ok(())
    }
}

/// Parse `aws iam get-role-policy` JSON output.
///
/// The CLI decodes the document and returns it as a JSON object; it is
/// re-encoded so callers always see the wire form IAM itself returns.
fn parse_role_policy(stdout: &str) -> Result<RolePolicy> {
    let json: Value = serde_json::from_str(stdout)?;

    let field = |name: &str| json[name].as_str().map(str::to_string);
    let role_name = field("RoleName")
        .ok_or_else(|| Error::Other("get-role-policy output has no RoleName".to_string()))?;
    let policy_name = field("PolicyName")
        .ok_or_else(|| Error::Other("get-role-policy output has no PolicyName".to_string()))?;

    let policy_document = match &json["PolicyDocument"] {
        Value::Null => None,
        Value::String(wire) => Some(wire.clone()),
        document => Some(encode_document(&serde_json::to_string(document)?)),
    };

    Ok(RolePolicy {
        role_name,
        policy_name,
        policy_document,
    })
}

/// Locate a program either by path or on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decode_document;

    #[test]
    fn test_parse_role_policy_decoded_object() {
        let stdout = r#"{
            "RoleName": "r1",
            "PolicyName": "p1",
            "PolicyDocument": {"Version": "2012-10-17", "Statement": []}
        }"#;

        let policy = parse_role_policy(stdout).unwrap();
        assert_eq!(policy.role_name, "r1");
        assert_eq!(policy.policy_name, "p1");

        let wire = policy.policy_document.unwrap();
        assert!(wire.starts_with("%7B"));
        let decoded: Value = serde_json::from_str(&decode_document(&wire).unwrap()).unwrap();
        assert_eq!(decoded["Version"], "2012-10-17");
    }

    #[test]
    fn test_parse_role_policy_wire_string() {
        let stdout = r#"{"RoleName": "r1", "PolicyName": "p1", "PolicyDocument": "%7B%7D"}"#;
        let policy = parse_role_policy(stdout).unwrap();
        assert_eq!(policy.policy_document.as_deref(), Some("%7B%7D"));
    }

    #[test]
    fn test_parse_role_policy_without_document() {
        let stdout = r#"{"RoleName": "r1", "PolicyName": "p1"}"#;
        assert_eq!(parse_role_policy(stdout).unwrap().policy_document, None);
    }

    #[test]
    fn test_parse_role_policy_malformed() {
        assert!(matches!(parse_role_policy("not json"), Err(Error::Json(_))));
        assert!(matches!(
            parse_role_policy(r#"{"PolicyName": "p1"}"#),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn test_global_args() {
        let backend = AwsCliBackend {
            program: PathBuf::from("aws"),
            settings: AwsSettings {
                profile: Some("prod".to_string()),
                region: Some("eu-west-1".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(
            backend.global_args(),
            vec!["--output", "json", "--profile", "prod", "--region", "eu-west-1"]
        );
    }

    #[test]
    fn test_find_program_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("aws");
        std::fs::write(&program, "").unwrap();

        assert_eq!(
            find_program(program.to_str().unwrap()),
            Some(program.clone())
        );
        assert_eq!(find_program(dir.path().join("missing").to_str().unwrap()), None);
    }

    #[test]
    fn test_new_reports_missing_cli() {
        let err = AwsCliBackend::new(AwsSettings {
            program: "/nonexistent/aws".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::CliNotFound { .. }));
    }
}
