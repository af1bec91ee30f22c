//! Workspace collection delegated to another process, typically on another
//! host, over a JSON request/response exchange on stdin/stdout.

use super::{CollectRequest, CollectResponse, Workspace};
use crate::core::error::{Error, Result};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs `command` for every collection and talks JSON to it.
///
/// The command is expected to end in `testopia-sync collect`, possibly behind
/// `ssh` or a container exec.
pub struct RemoteWorkspace {
    command: Vec<String>,
}

impl RemoteWorkspace {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::config("remote command must not be empty"));
        }
        Ok(Self { command })
    }
}

impl Workspace for RemoteWorkspace {
    fn collect(&self, request: &CollectRequest) -> Result<CollectResponse> {
        let program = &self.command[0];
        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!("Executing: {:?}", cmd);
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::workspace(format!("failed to execute {program}: {e}")))?;

        let payload = serde_json::to_vec(request)?;
        if let Some(mut stdin) = child.stdin.take() {
            // A peer that exits without reading is reported through its exit status.
            match stdin.write_all(&payload) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::workspace(format!("failed to wait for {program}: {e}")))?;
        if !output.status.success() {
            return Err(Error::workspace(format!(
                "{program} exited with {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::workspace(format!("invalid collect response from {program}: {e}")))
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Server side of the exchange: read one request from `input`, collect it
/// from `workspace` and write the response to `output`.
pub fn serve(workspace: &dyn Workspace, input: impl Read, mut output: impl Write) -> Result<()> {
    let request: CollectRequest = serde_json::from_reader(input)?;
    let response = workspace.collect(&request)?;
    serde_json::to_writer(&mut output, &response)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportFormat;
    use crate::workspace::LocalWorkspace;
    use std::fs;

    #[test]
    fn test_empty_command_rejected() {
        assert!(RemoteWorkspace::new(Vec::new()).is_err());
    }

    #[test]
    fn test_serve_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("smoke.tap"), "1..1\nok 1\n").unwrap();
        let ws = LocalWorkspace::new(dir.path());

        let request = CollectRequest {
            include_pattern: "*.tap".to_string(),
            format: ReportFormat::Tap,
            include_raw: false,
            excludes: Vec::new(),
        };
        let input = serde_json::to_vec(&request).unwrap();
        let mut output = Vec::new();
        serve(&ws, input.as_slice(), &mut output).unwrap();

        let response: CollectResponse = serde_json::from_slice(&output).unwrap();
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.files[0].path, "smoke.tap");
    }

    #[cfg(unix)]
    #[test]
    fn test_remote_reads_response_from_child() {
        let canned = serde_json::to_string(&CollectResponse::default()).unwrap();
        let ws = RemoteWorkspace::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("cat > /dev/null; printf '%s' '{canned}'"),
        ])
        .unwrap();
        let response = ws
            .collect(&CollectRequest {
                include_pattern: "**/*.xml".to_string(),
                format: ReportFormat::Junit,
                include_raw: false,
                excludes: Vec::new(),
            })
            .unwrap();
        assert!(response.files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_remote_failure_exit_is_workspace_error() {
        let ws = RemoteWorkspace::new(vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()])
            .unwrap();
        let err = ws
            .collect(&CollectRequest {
                include_pattern: "*".to_string(),
                format: ReportFormat::Tap,
                include_raw: false,
                excludes: Vec::new(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("exited with 3"));
    }
}
