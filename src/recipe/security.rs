// src/recipe/security.rs

//! Security gate: SBOM generation and vulnerability scanning
//!
//! Both tools are external executables; their exit code is the only contract.

use crate::error::{Error, Result};
use crate::hash::{self, Checksum};
use crate::recipe::config::SecurityTools;
use crate::recipe::kitchen::{CommandSpec, Cook};
use crate::recipe::options::SbomFailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// SBOM produced by the build phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomRecord {
    pub path: PathBuf,
    /// Hex SHA-256 of the report at generation time
    pub sha256: String,
}

impl SbomRecord {
    pub fn checksum(&self) -> Result<Checksum> {
        Checksum::new(self.sha256.clone())
    }
}

pub struct SecurityGate<'a> {
    tools: &'a SecurityTools,
}

impl<'a> SecurityGate<'a> {
    pub fn new(tools: &'a SecurityTools) -> Self {
        Self { tools }
    }

    /// `syft scan dir:<root> -o cyclonedx-json=<out>`
    pub fn sbom_command(&self, root: &Path, out: &Path) -> CommandSpec {
        CommandSpec::new("sbom", self.tools.sbom_tool.clone(), root).args([
            "scan".to_string(),
            format!("dir:{}", root.display()),
            "-o".to_string(),
            format!("cyclonedx-json={}", out.display()),
        ])
    }

    /// `trivy fs --exit-code 1 --quiet <dir>`
    pub fn scan_command(&self, package_dir: &Path) -> CommandSpec {
        CommandSpec::new("scan", self.tools.scanner.clone(), package_dir)
            .args(["fs", "--exit-code", "1", "--quiet"])
            .arg(package_dir.to_string_lossy().into_owned())
    }

    /// Generate an SBOM for `root`
    ///
    /// Returns `Ok(None)` when generation failed under the warn policy.
    pub fn generate_sbom(
        &self,
        cook: &mut Cook<'_>,
        root: &Path,
        out: &Path,
        policy: SbomFailurePolicy,
    ) -> Result<Option<SbomRecord>> {
        info!("Generating SBOM for {}", root.display());

        let failure = match self.try_generate(cook, root, out) {
            Ok(record) => {
                info!("SBOM written to {} (sha256 {})", record.path.display(), record.sha256);
                return Ok(Some(record));
            }
            Err(reason) => reason,
        };

        match policy {
            SbomFailurePolicy::Fatal => Err(Error::SecurityGateError(failure)),
            SbomFailurePolicy::Warn => {
                cook.warn(format!("SBOM generation skipped: {}", failure));
                Ok(None)
            }
        }
    }

    fn try_generate(&self, cook: &mut Cook<'_>, root: &Path, out: &Path) -> std::result::Result<SbomRecord, String> {
        let output = cook
            .run_tool(&self.sbom_command(root, out))
            .map_err(|e| e.to_string())?;

        if !output.success() {
            return Err(format!(
                "{} exited with {:?}: {}",
                self.tools.sbom_tool,
                output.code,
                output.stderr.trim()
            ));
        }

        let checksum = hash::hash_file(out).map_err(|e| {
            format!("{} reported success but {} is unreadable: {}", self.tools.sbom_tool, out.display(), e)
        })?;

        Ok(SbomRecord {
            path: out.to_path_buf(),
            sha256: checksum.as_str().to_string(),
        })
    }

    /// Scan `package_dir`; any finding or a missing scanner is fatal
    pub fn scan(&self, cook: &mut Cook<'_>, package_dir: &Path) -> Result<()> {
        info!("Scanning {} for vulnerabilities", package_dir.display());

        let output = cook
            .run_tool(&self.scan_command(package_dir))
            .map_err(|e| Error::SecurityGateError(format!("{} could not run: {}", self.tools.scanner, e)))?;

        if !output.success() {
            return Err(Error::SecurityGateError(format!(
                "{} reported findings (exit {:?}): {}",
                self.tools.scanner,
                output.code,
                output.stdout.trim()
            )));
        }

        info!("Vulnerability scan passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::kitchen::testing::RecordingRunner;
    use std::fs;

    fn tools() -> SecurityTools {
        SecurityTools {
            sbom_tool: "syft".to_string(),
            scanner: "trivy".to_string(),
        }
    }

    #[test]
    fn test_command_lines() {
        let tools = tools();
        let gate = SecurityGate::new(&tools);
        assert_eq!(
            gate.sbom_command(Path::new("/install"), Path::new("/work/sbom.json")).to_string(),
            "syft scan dir:/install -o cyclonedx-json=/work/sbom.json"
        );
        assert_eq!(
            gate.scan_command(Path::new("/pkg")).to_string(),
            "trivy fs --exit-code 1 --quiet /pkg"
        );
    }

    #[test]
    fn test_sbom_hash_recorded() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("sbom.json");
        let written = out.clone();
        let runner = RecordingRunner::new().on_phase("sbom", move |_| {
            fs::write(&written, b"{\"bomFormat\":\"CycloneDX\"}").unwrap();
        });
        let mut cook = Cook::new(&runner);
        let tools = tools();

        let record = SecurityGate::new(&tools)
            .generate_sbom(&mut cook, temp.path(), &out, SbomFailurePolicy::Fatal)
            .unwrap()
            .unwrap();
        assert_eq!(record.checksum().unwrap(), hash::hash_file(&out).unwrap());
    }

    #[test]
    fn test_sbom_failure_policy() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("sbom.json");
        let tools = tools();

        let runner = RecordingRunner::new().fail_phase("sbom", 1);
        let mut cook = Cook::new(&runner);
        let warned = SecurityGate::new(&tools)
            .generate_sbom(&mut cook, temp.path(), &out, SbomFailurePolicy::Warn)
            .unwrap();
        assert!(warned.is_none());
        assert_eq!(cook.warnings().len(), 1);

        let mut cook = Cook::new(&runner);
        let fatal = SecurityGate::new(&tools).generate_sbom(&mut cook, temp.path(), &out, SbomFailurePolicy::Fatal);
        assert!(matches!(fatal, Err(Error::SecurityGateError(_))));
    }

    #[test]
    fn test_sbom_success_without_report_is_failure() {
        let temp = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);
        let tools = tools();

        let result = SecurityGate::new(&tools).generate_sbom(
            &mut cook,
            temp.path(),
            &temp.path().join("missing.json"),
            SbomFailurePolicy::Fatal,
        );
        assert!(matches!(result, Err(Error::SecurityGateError(_))));
    }

    #[test]
    fn test_scan_exit_one_is_fatal() {
        let runner = RecordingRunner::new().fail_phase("scan", 1);
        let mut cook = Cook::new(&runner);
        let tools = tools();

        let result = SecurityGate::new(&tools).scan(&mut cook, Path::new("/pkg"));
        assert!(matches!(result, Err(Error::SecurityGateError(_))));
    }

    #[test]
    fn test_missing_scanner_is_fatal() {
        let tools = SecurityTools {
            sbom_tool: "syft".to_string(),
            scanner: "no-such-scanner-7731".to_string(),
        };
        let mut cook = Cook::new(&crate::recipe::kitchen::SystemRunner);
        let result = SecurityGate::new(&tools).scan(&mut cook, Path::new("."));
        assert!(matches!(result, Err(Error::SecurityGateError(_))));
    }
}
