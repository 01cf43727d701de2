//! Test suite runner
//!
//! Discovers functional test files under a directory, evaluates them
//! concurrently and collects a [`SuiteReport`].

pub mod discovery;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use log::{info, warn};

use crate::config::HarnessConfig;
use crate::fixtures::run_test_file;

pub use discovery::discover_test_files;
pub use report::{SuiteReport, TestResultEntry, TestStatus};

/// A set of test files sharing one configuration.
#[derive(Debug, Clone)]
pub struct TestSuite {
    files: Vec<PathBuf>,
    config: Arc<HarnessConfig>,
}

impl TestSuite {
    /// Collect every test file under `root`.
    pub fn discover(root: &Path, config: HarnessConfig) -> Result<Self> {
        let files = discover_test_files(root, &config.file_extension)?;
        info!("Discovered {} test files under {}", files.len(), root.display());
        Ok(Self {
            files,
            config: Arc::new(config),
        })
    }

    /// Collect test files from several roots, dropping duplicates.
    pub fn from_paths(paths: &[PathBuf], config: HarnessConfig) -> Result<Self> {
        let mut files = Vec::new();
        for path in paths {
            files.extend(discover_test_files(path, &config.file_extension)?);
        }
        files.sort();
        files.dedup();
        Ok(Self {
            files,
            config: Arc::new(config),
        })
    }

    /// Keep only files whose path contains `pattern`.
    pub fn filter(mut self, pattern: &str) -> Self {
        self.files
            .retain(|path| path.to_string_lossy().contains(pattern));
        self
    }

    /// Test files, sorted by path
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of test files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the suite has no test files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Run every file, `config.jobs` at a time.
    pub async fn run(&self) -> SuiteReport {
        let start = Instant::now();
        let jobs = self.config.jobs.max(1);

        let results: Vec<TestResultEntry> = stream::iter(self.files.iter().cloned())
            .map(|path| {
                let config = Arc::clone(&self.config);
                async move { run_one(path, config).await }
            })
            .buffer_unordered(jobs)
            .collect()
            .await;

        let mut report = SuiteReport::new();
        for result in results {
            report.add_result(result);
        }
        report.sort();
        report.duration = start.elapsed();
        report
    }
}

async fn run_one(path: PathBuf, config: Arc<HarnessConfig>) -> TestResultEntry {
    let start = Instant::now();
    let display = path.display().to_string();

    let handle = tokio::spawn(async move { run_test_file(&path, &config).await });
    let error = match handle.await {
        Ok(Ok(_)) => None,
        Ok(Err(err)) => Some(format!("{:#}", err)),
        Err(join_error) => Some(format!("test task panicked: {}", join_error)),
    };
    if let Some(error) = &error {
        warn!("{} failed: {}", display, error);
    }

    TestResultEntry {
        path: display,
        status: if error.is_none() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        },
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}
