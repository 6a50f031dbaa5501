use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SyncError};

/// Produces a generated site directory from a source repository
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteBuilder: Send + Sync {
    /// Fetch `repo_url`, generate the site and return the output directory
    async fn build(&self, repo_url: &str) -> Result<PathBuf>;
}

/// Clones a repository with git and renders it with hugo
#[derive(Debug, Clone)]
pub struct HugoSiteBuilder {
    work_dir: PathBuf,
    generator: PathBuf,
    generator_args: Vec<String>,
    git: PathBuf,
}

impl HugoSiteBuilder {
    pub fn new(work_dir: impl Into<PathBuf>, generator: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            generator: generator.into(),
            generator_args: vec!["--minify".to_string()],
            git: PathBuf::from("git"),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.work_dir, &config.generator)
    }

    /// Use a different git executable
    #[cfg(test)]
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    /// Replace the arguments passed to the generator after `-s <dir>`
    pub fn with_generator_args(mut self, args: Vec<String>) -> Self {
        self.generator_args = args;
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("public")
    }

    /// Remove anything left over from a previous run
    async fn clean(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.work_dir).await? {
            info!("Cleanup old checkout at {}", self.work_dir.display());
            tokio::fs::remove_dir_all(&self.work_dir).await?;
        }
        Ok(())
    }

    async fn clone_repo(&self, repo_url: &str) -> Result<()> {
        info!("git clone {} to {}", repo_url, self.work_dir.display());

        let output = Command::new(&self.git)
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(repo_url)
            .arg(&self.work_dir)
            .output()
            .await
            .map_err(|e| SyncError::Clone {
                repo: repo_url.to_string(),
                message: format!("failed to run {}: {}", self.git.display(), e),
            })?;

        if !output.status.success() {
            return Err(SyncError::Clone {
                repo: repo_url.to_string(),
                message: failure_message(&output),
            });
        }

        debug!("Cloned {} into {}", repo_url, self.work_dir.display());
        Ok(())
    }

    async fn run_generator(&self) -> Result<()> {
        info!(
            "Running {} at path {}",
            self.generator.display(),
            self.work_dir.display()
        );

        let program = self.generator.display().to_string();
        let output = Command::new(&self.generator)
            .arg("-s")
            .arg(&self.work_dir)
            .args(&self.generator_args)
            .output()
            .await
            .map_err(|e| SyncError::Generator {
                program: program.clone(),
                message: format!("failed to start: {}", e),
            })?;

        if !output.status.success() {
            return Err(SyncError::Generator {
                program,
                message: failure_message(&output),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl SiteBuilder for HugoSiteBuilder {
    async fn build(&self, repo_url: &str) -> Result<PathBuf> {
        self.clean().await?;
        self.clone_repo(repo_url).await?;
        self.run_generator().await?;

        let output_dir = self.output_dir();
        info!("Site generated at {}", output_dir.display());
        Ok(output_dir)
    }
}

/// Exit status plus the trimmed stderr of a failed command
fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_git_is_clone_error() {
        let tmp = TempDir::new().unwrap();
        let builder = HugoSiteBuilder::new(tmp.path().join("blog"), "hugo")
            .with_git(tmp.path().join("no-such-git"));

        let err = builder
            .build("https://example.com/blog.git")
            .await
            .unwrap_err();
        match err {
            SyncError::Clone { repo, .. } => assert_eq!(repo, "https://example.com/blog.git"),
            other => panic!("expected clone error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_generator_is_generator_error() {
        let tmp = TempDir::new().unwrap();
        let builder = HugoSiteBuilder::new(tmp.path().join("blog"), tmp.path().join("no-hugo"));

        let err = builder.run_generator().await.unwrap_err();
        assert!(matches!(err, SyncError::Generator { .. }), "{err:?}");
    }

    #[test]
    fn test_output_dir_from_config_has_no_trailing_separator() {
        let config = Config {
            git_repo: "https://github.com/example/blog.git".to_string(),
            s3_bucket: "example-blog".to_string(),
            s3_region: "us-east-1".to_string(),
            profile: None,
            work_dir: PathBuf::from("/tmp/blog"),
            generator: PathBuf::from("/var/task/hugo"),
            max_concurrent: 8,
        };
        let output = HugoSiteBuilder::from_config(&config).output_dir();

        assert_eq!(output, PathBuf::from("/tmp/blog/public"));
        assert!(!output.to_string_lossy().ends_with('/'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_cleans_work_dir_and_returns_public() {
        let tmp = TempDir::new().unwrap();
        let work_dir = tmp.path().join("blog");
        fs::create_dir_all(work_dir.join("public")).unwrap();
        fs::write(work_dir.join("public/stale.html"), "old").unwrap();

        // `true` accepts any arguments and succeeds without touching the tree
        let builder = HugoSiteBuilder::new(&work_dir, "true").with_git("true");
        let output = builder.build("https://example.com/blog.git").await.unwrap();

        assert_eq!(output, work_dir.join("public"));
        assert!(!work_dir.join("public/stale.html").exists());
        assert!(!output.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_generator_reports_status() {
        let tmp = TempDir::new().unwrap();
        let builder = HugoSiteBuilder::new(tmp.path(), "false");

        match builder.run_generator().await.unwrap_err() {
            SyncError::Generator { program, message } => {
                assert_eq!(program, "false");
                assert!(message.contains("exit status"), "{message}");
            }
            other => panic!("expected generator error, got {other:?}"),
        }
    }
}
