//! Suite report
//!
//! Output formats: JSON, JUnit XML and a human-readable summary.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one test file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Evaluated and every check matched
    Pass,
    /// Parse error, evaluation error or check mismatch
    Fail,
}

/// Result of one test file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultEntry {
    /// Test file path
    pub path: String,
    /// Status
    pub status: TestStatus,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
}

/// Report of a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Test files run
    pub total: usize,
    /// Files passed
    pub passed: usize,
    /// Files failed
    pub failed: usize,
    /// Wall-clock duration of the run
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Per-file results, sorted by path
    pub results: Vec<TestResultEntry>,
}

impl SuiteReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            duration: Duration::ZERO,
            results: Vec::new(),
        }
    }

    /// Add a test result
    pub fn add_result(&mut self, result: TestResultEntry) {
        self.total += 1;
        match result.status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
        }
        self.results.push(result);
    }

    /// Sort results by path
    pub fn sort(&mut self) {
        self.results.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Check if all tests passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Convert to JUnit XML format
    pub fn to_junit_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            "<testsuite name=\"functional-tests\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{:.3}\">",
            self.total,
            self.failed,
            self.duration.as_secs_f64()
        );

        for result in &self.results {
            let _ = write!(
                xml,
                "  <testcase name=\"{}\" time=\"{:.3}\"",
                escape_xml(&result.path),
                result.duration_ms as f64 / 1000.0
            );
            match (&result.status, &result.error) {
                (TestStatus::Fail, Some(error)) => {
                    xml.push_str(">\n");
                    let _ = writeln!(
                        xml,
                        "    <failure message=\"Test failed\">{}</failure>",
                        escape_xml(error)
                    );
                    xml.push_str("  </testcase>\n");
                }
                _ => xml.push_str(" />\n"),
            }
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let tag = match result.status {
                TestStatus::Pass => "ok",
                TestStatus::Fail => "FAILED",
            };
            let _ = writeln!(out, "test {} ... {}", result.path, tag);
        }

        let failures: Vec<&TestResultEntry> = self
            .results
            .iter()
            .filter(|result| result.status == TestStatus::Fail)
            .collect();
        if !failures.is_empty() {
            out.push_str("\nfailures:\n");
            for result in failures {
                let _ = writeln!(out, "\n---- {} ----", result.path);
                if let Some(error) = &result.error {
                    let _ = writeln!(out, "{}", error);
                }
            }
        }

        let _ = writeln!(
            out,
            "\ntest result: {}. {} passed; {} failed; finished in {:.2}s",
            if self.all_passed() { "ok" } else { "FAILED" },
            self.passed,
            self.failed,
            self.duration.as_secs_f64()
        );
        out
    }
}

impl Default for SuiteReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Duration as milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
