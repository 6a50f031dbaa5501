use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_WORK_DIR: &str = "/tmp/blog";
pub const DEFAULT_GENERATOR: &str = "/var/task/hugo";
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Configuration for a build-and-publish run
#[derive(Debug, Clone)]
pub struct Config {
    pub git_repo: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub profile: Option<String>,
    /// Where the repository is cloned; the site is generated into `public/` below it
    pub work_dir: PathBuf,
    /// Path of the hugo executable
    pub generator: PathBuf,
    pub max_concurrent: usize,
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// Values returned by `overrides` (e.g. command line flags) win over the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid
    pub fn from_env_with<F>(overrides: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        dotenv::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|name| overrides(name).or_else(|| env::var(name).ok()))
    }

    /// Build configuration from any variable source
    ///
    /// `GIT_REPO` may be absent here; call [`Config::require_git_repo`] before
    /// building a site from it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let git_repo = lookup("GIT_REPO").unwrap_or_default();

        let s3_bucket = lookup("S3_BUCKET")
            .context("S3_BUCKET not found in environment. Please set it in .env file")?;
        Self::validate_bucket_name(&s3_bucket)?;

        let s3_region = lookup("S3_REGION")
            .context("S3_REGION not found in environment. Please set it in .env file")?;
        Self::validate_region(&s3_region)?;

        let profile = lookup("AWS_PROFILE");

        let work_dir = lookup("SITE_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR));

        let generator = lookup("HUGO_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GENERATOR));

        let max_concurrent = match lookup("MAX_CONCURRENT") {
            Some(value) => Self::parse_max_concurrent(&value)?,
            None => DEFAULT_MAX_CONCURRENT,
        };

        Ok(Self {
            git_repo,
            s3_bucket,
            s3_region,
            profile,
            work_dir,
            generator,
            max_concurrent,
        })
    }

    /// The repository to build, failing if none was configured
    pub fn require_git_repo(&self) -> Result<&str> {
        Self::validate_git_repo(&self.git_repo)?;
        Ok(&self.git_repo)
    }

    fn validate_git_repo(repo: &str) -> Result<()> {
        if repo.trim().is_empty() {
            anyhow::bail!("GIT_REPO not found in environment. Please set it in .env file");
        }
        Ok(())
    }

    /// Validate AWS region format
    fn validate_region(region: &str) -> Result<()> {
        if region.is_empty() {
            anyhow::bail!("S3_REGION cannot be empty");
        }

        // Basic validation - ensure it looks like a region (contains a dash)
        if !region.contains('-') {
            anyhow::bail!(
                "S3_REGION '{}' doesn't look like a valid region (e.g., us-west-2, eu-west-1)",
                region
            );
        }

        Ok(())
    }

    /// Validate S3 bucket name according to AWS rules
    fn validate_bucket_name(bucket: &str) -> Result<()> {
        if bucket.is_empty() {
            anyhow::bail!("S3_BUCKET cannot be empty");
        }

        if bucket.len() < 3 || bucket.len() > 63 {
            anyhow::bail!(
                "S3_BUCKET '{}' must be between 3 and 63 characters (got {})",
                bucket,
                bucket.len()
            );
        }

        let is_edge_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

        if !bucket.starts_with(is_edge_char) {
            anyhow::bail!(
                "S3_BUCKET '{}' must start with a lowercase letter or number",
                bucket
            );
        }

        if !bucket.ends_with(is_edge_char) {
            anyhow::bail!(
                "S3_BUCKET '{}' must end with a lowercase letter or number",
                bucket
            );
        }

        for c in bucket.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
                anyhow::bail!(
                    "S3_BUCKET '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
                    bucket,
                    c
                );
            }
        }

        if bucket.contains("..") {
            anyhow::bail!("S3_BUCKET '{}' cannot contain consecutive periods", bucket);
        }

        // Check for IP address format (not allowed)
        if bucket
            .split('.')
            .all(|part| part.parse::<u8>().is_ok() && !part.is_empty())
        {
            anyhow::bail!(
                "S3_BUCKET '{}' cannot be formatted as an IP address",
                bucket
            );
        }

        Ok(())
    }

    fn parse_max_concurrent(value: &str) -> Result<usize> {
        let n: usize = value
            .trim()
            .parse()
            .with_context(|| format!("MAX_CONCURRENT '{}' is not a number", value))?;
        if n == 0 {
            anyhow::bail!("MAX_CONCURRENT must be at least 1");
        }
        Ok(n)
    }
}
