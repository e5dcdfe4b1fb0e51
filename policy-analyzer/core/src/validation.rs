use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A critical issue that must be fixed.
    Error,
    /// An issue that should be reviewed.
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    pub field: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remediation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
}

/// The outcome of validating a single resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub resource_type: String,
    pub name: String,
    pub namespace: String,
    pub valid: bool,
    pub issues: Vec<Issue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterValidationReport {
    pub total_resources: usize,
    pub valid_resources: usize,
    pub results: Vec<ValidationResult>,
    pub summary: ValidationSummary,
    pub timestamp: DateTime<Utc>,
}

// === impl Severity ===

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl ValidationResult ===

impl ValidationResult {
    pub fn new(
        resource_type: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            namespace: namespace.into(),
            valid: true,
            issues: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn add_issue(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        field: impl Into<String>,
        code: impl Into<String>,
        remediation: impl Into<String>,
    ) {
        self.issues.push(Issue {
            severity,
            message: message.into(),
            field: field.into(),
            code: code.into(),
            remediation: remediation.into(),
        });
    }

    pub fn error(
        &mut self,
        message: impl Into<String>,
        field: impl Into<String>,
        code: impl Into<String>,
        remediation: impl Into<String>,
    ) {
        self.add_issue(Severity::Error, message, field, code, remediation)
    }

    pub fn warning(
        &mut self,
        message: impl Into<String>,
        field: impl Into<String>,
        code: impl Into<String>,
        remediation: impl Into<String>,
    ) {
        self.add_issue(Severity::Warning, message, field, code, remediation)
    }

    pub fn info(
        &mut self,
        message: impl Into<String>,
        field: impl Into<String>,
        code: impl Into<String>,
        remediation: impl Into<String>,
    ) {
        self.add_issue(Severity::Info, message, field, code, remediation)
    }

    /// Stamps the result and marks it valid iff it has no errors.
    pub fn finalize(mut self) -> Self {
        self.timestamp = Utc::now();
        self.valid = !self.has_errors();
        self
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|i| i.code.as_str())
    }

    /// Drops every issue that is not an error and recomputes validity.
    pub fn retain_errors(&mut self) {
        self.issues.retain(|i| i.severity == Severity::Error);
        self.valid = self.issues.is_empty();
    }
}

// === impl ValidationSummary ===

impl ValidationSummary {
    fn count(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.info += 1,
        }
    }
}

// === impl ClusterValidationReport ===

impl Default for ClusterValidationReport {
    fn default() -> Self {
        Self {
            total_resources: 0,
            valid_resources: 0,
            results: Vec::new(),
            summary: ValidationSummary::default(),
            timestamp: Utc::now(),
        }
    }
}

impl ClusterValidationReport {
    pub fn add_result(&mut self, result: ValidationResult) {
        self.total_resources += 1;
        if result.valid {
            self.valid_resources += 1;
        }
        for issue in &result.issues {
            self.summary.count(issue.severity);
        }
        self.results.push(result);
    }

    pub fn finalize(mut self) -> Self {
        self.timestamp = Utc::now();
        self
    }
}
