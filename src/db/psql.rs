//! psql-backed SQL session
//!
//! Each call spawns one `psql` invocation with `ON_ERROR_STOP` so the first
//! failing statement aborts the run with a non-zero exit. The password goes
//! to the child via PGPASSWORD, never onto the command line.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::config::{DbConfig, VaultConfig};

use super::errors::{SessionError, SessionResult};
use super::SqlSession;

/// SQL session shelling out to psql.
#[derive(Debug, Clone)]
pub struct PsqlSession {
    bin: String,
    db: DbConfig,
}

impl PsqlSession {
    /// Build a session from the vault configuration.
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            bin: config.psql_bin.clone(),
            db: config.db.clone(),
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-h")
            .arg(&self.db.host)
            .arg("-p")
            .arg(self.db.port.to_string())
            .arg("-U")
            .arg(&self.db.user)
            .arg("-d")
            .arg(&self.db.database)
            .arg("-v")
            .arg("ON_ERROR_STOP=1")
            .arg("-q")
            .env("PGPASSWORD", &self.db.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_err(&self, e: std::io::Error) -> SessionError {
        SessionError::Spawn {
            tool: self.bin.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl SqlSession for PsqlSession {
    async fn execute(&self, sql: &str) -> SessionResult<()> {
        let output = self
            .base_command()
            .arg("-c")
            .arg(sql)
            .output()
            .await
            .map_err(|e| self.spawn_err(e))?;

        if !output.status.success() {
            return Err(SessionError::Tool {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    async fn execute_script(&self, sql: &str, timeout: Duration) -> SessionResult<()> {
        let mut cmd = self.base_command();
        cmd.stdin(Stdio::piped()).stdout(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| self.spawn_err(e))?;

        // Drain stderr concurrently so a chatty child cannot block on a full
        // pipe while we are still feeding stdin.
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| SessionError::Io("stderr pipe missing".to_string()))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        // The feed runs as its own task so the timeout below also covers a
        // child that stops draining stdin: once the pipe fills, the write
        // blocks until the kill tears the pipe down.
        let feed_task = child.stdin.take().map(|mut stdin| {
            let script = sql.as_bytes().to_vec();
            tokio::spawn(async move {
                // An early tool exit surfaces as a broken pipe here; the exit
                // status below carries the real diagnosis.
                let _ = stdin.write_all(&script).await;
                let _ = stdin.shutdown().await;
            })
        });

        let status = tokio::select! {
            res = child.wait() => res.map_err(|e| SessionError::Io(e.to_string()))?,
            _ = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                if let Some(task) = feed_task {
                    task.abort();
                }
                stderr_task.abort();
                return Err(SessionError::Timeout(timeout.as_secs()));
            }
        };

        if let Some(task) = feed_task {
            let _ = task.await;
        }

        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(SessionError::Tool {
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok(())
    }

    async fn schema_exists(&self, schema: &str) -> SessionResult<bool> {
        // Schema names are generated by this crate, but quote defensively.
        let escaped = schema.replace('\'', "''");
        let sql = format!(
            "SELECT 1 FROM information_schema.schemata WHERE schema_name = '{}'",
            escaped
        );

        let output = self
            .base_command()
            .arg("-tA")
            .arg("-c")
            .arg(&sql)
            .output()
            .await
            .map_err(|e| self.spawn_err(e))?;

        if !output.status.success() {
            return Err(SessionError::Tool {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim() == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    // psql is stubbed with small shell scripts; no PostgreSQL server needed.
    fn write_stub(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh").unwrap();
        writeln!(f, "{}", body).unwrap();
        let mut perms = f.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn session_with_bin(bin: String) -> PsqlSession {
        let mut config = VaultConfig::default();
        config.psql_bin = bin;
        PsqlSession::new(&config)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let dir = TempDir::new().unwrap();
        let bin = write_stub(&dir, "psql_ok", "exit 0");
        let session = session_with_bin(bin);
        session.execute("CREATE SCHEMA x").await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let bin = write_stub(&dir, "psql_fail", "echo 'ERROR: boom' >&2; exit 3");
        let session = session_with_bin(bin);

        let err = session.execute("DROP SCHEMA x").await.unwrap_err();
        match err {
            SessionError::Tool { exit_code, stderr } => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_script_feeds_stdin() {
        let dir = TempDir::new().unwrap();
        let capture = dir.path().join("captured.sql");
        let bin = write_stub(&dir, "psql_cap", &format!("cat > {}", capture.display()));
        let session = session_with_bin(bin);

        session
            .execute_script("INSERT INTO t VALUES (1);", Duration::from_secs(10))
            .await
            .unwrap();

        let captured = std::fs::read_to_string(&capture).unwrap();
        assert_eq!(captured, "INSERT INTO t VALUES (1);");
    }

    #[tokio::test]
    async fn test_execute_script_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let bin = write_stub(&dir, "psql_hang", "cat > /dev/null; sleep 60");
        let session = session_with_bin(bin);

        let err = session
            .execute_script("SELECT 1;", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_timeout_fires_while_feeding_stdin() {
        let dir = TempDir::new().unwrap();
        // Never reads stdin, so the pipe fills and the feed blocks.
        let bin = write_stub(&dir, "psql_deaf", "sleep 60");
        let session = session_with_bin(bin);

        // Well past any OS pipe buffer.
        let script = "SELECT 1;\n".repeat(200_000);
        let err = session
            .execute_script(&script, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_schema_exists_parses_output() {
        let dir = TempDir::new().unwrap();
        let yes = write_stub(&dir, "psql_yes", "echo 1");
        let no = write_stub(&dir, "psql_no", "exit 0");

        assert!(session_with_bin(yes).schema_exists("tenant_5").await.unwrap());
        assert!(!session_with_bin(no).schema_exists("tenant_5").await.unwrap());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let session = session_with_bin("/nonexistent/psql".to_string());
        let err = session.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, SessionError::Spawn { .. }));
    }
}
