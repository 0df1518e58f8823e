//! Globally installed npm packages.

use crate::backend::runner::CommandRunner;
use crate::backend::{Backend, Tool};
use crate::error::{Error, Result};
use crate::types::{BackendKind, PackageRef};
use std::sync::Arc;

/// Backend for `npm -g`.
pub struct NpmBackend {
    npm: Tool,
}

impl NpmBackend {
    /// Create an npm backend using the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            npm: Tool::new(runner, "npm", BackendKind::NodeGlobal),
        }
    }
}

impl Backend for NpmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NodeGlobal
    }

    fn is_available(&self) -> bool {
        self.npm.is_available()
    }

    fn query(&self) -> Result<Vec<PackageRef>> {
        let output = self
            .npm
            .capture(&self.npm.invocation(&["outdated", "-g", "--json"]))?;
        let stdout = output.stdout_str();

        // `npm outdated` exits 1 whenever something is outdated.
        if !output.success && stdout.trim().is_empty() {
            return Err(Error::from_command_output("npm", &output.stderr_str()));
        }

        let names = parse_outdated(&stdout)?;
        Ok(self.npm.package_refs(names.iter().map(String::as_str)))
    }

    fn apply(&self, packages: &[PackageRef]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let targets = packages.iter().map(|p| format!("{}@latest", p.name()));
        let invocation = self
            .npm
            .invocation(&["install", "-g", "--"])
            .with_args(targets)
            .streaming();
        self.npm.run_apply(&invocation)
    }

    fn apply_all(&self, _pending: &[PackageRef]) -> Result<()> {
        let invocation = self.npm.invocation(&["update", "-g"]).streaming();
        self.npm.run_apply(&invocation)
    }
}

/// Package names from `npm outdated -g --json` (an object keyed by name).
fn parse_outdated(stdout: &str) -> Result<Vec<String>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(stdout)?;
    let object = value.as_object().ok_or_else(|| Error::Parse {
        backend: BackendKind::NodeGlobal,
        message: "expected a JSON object".to_string(),
    })?;
    Ok(object.keys().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::runner::CommandOutput;
    use crate::backend::testing::ScriptedRunner;

    const OUTDATED: &str = r#"{
  "typescript": {"current": "5.4.5", "wanted": "5.6.3", "latest": "5.6.3"},
  "@angular/cli": {"current": "17.0.0", "wanted": "18.2.8", "latest": "18.2.8"}
}"#;

    #[test]
    fn test_parse_outdated() {
        let mut names = parse_outdated(OUTDATED).unwrap();
        names.sort();
        assert_eq!(names, vec!["@angular/cli", "typescript"]);
        assert!(parse_outdated("").unwrap().is_empty());
        assert!(parse_outdated("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_outdated_rejects_arrays() {
        assert!(matches!(parse_outdated("[]"), Err(Error::Parse { .. })));
        assert!(matches!(parse_outdated("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_query_accepts_exit_code_one() {
        let runner = Arc::new(ScriptedRunner::new(&["npm"]));
        runner.push(CommandOutput {
            stdout: OUTDATED.as_bytes().to_vec(),
            stderr: Vec::new(),
            success: false,
        });
        let pending = NpmBackend::new(runner).query().unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_query_failure_without_output() {
        let runner = Arc::new(ScriptedRunner::new(&["npm"]));
        runner.push(CommandOutput::failed("npm ERR! code EACCES\n"));
        assert!(NpmBackend::new(runner).query().is_err());
    }

    #[test]
    fn test_apply_targets_latest() {
        let runner = Arc::new(ScriptedRunner::new(&["npm"]));
        let packages = vec![PackageRef::new("@angular/cli", BackendKind::NodeGlobal).unwrap()];
        NpmBackend::new(runner.clone()).apply(&packages).unwrap();
        assert_eq!(
            runner.calls()[0].args,
            vec!["install", "-g", "--", "@angular/cli@latest"]
        );
    }
}
