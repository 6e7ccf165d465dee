// Prerequisite validation domain models
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    SystemTables,
    Permission,
    Warehouse,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Requirement::SystemTables => "system tables",
            Requirement::Permission => "permission",
            Requirement::Warehouse => "warehouse",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub requirement: Requirement,
    pub passed: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn pass(requirement: Requirement) -> Self {
        Self {
            requirement,
            passed: true,
            error: None,
        }
    }

    pub fn fail(requirement: Requirement, error: impl Into<String>) -> Self {
        Self {
            requirement,
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a single validation run, in check order
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
    /// Warehouses that satisfied the sizing check
    pub qualifying_warehouses: Vec<super::workspace::WarehouseDescriptor>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    #[cfg(test)]
    pub fn result_for(&self, requirement: Requirement) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.requirement == requirement)
    }
}

/// Render a set of names the way remediation messages list them
pub fn format_name_set<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let joined = names
        .into_iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_passes_only_when_every_check_passes() {
        let mut report = ValidationReport::default();
        report.results.push(ValidationResult::pass(Requirement::SystemTables));
        report.results.push(ValidationResult::pass(Requirement::Warehouse));
        assert!(report.all_passed());

        report.results.push(ValidationResult::fail(Requirement::Permission, "denied"));
        assert!(!report.all_passed());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.result_for(Requirement::Permission).and_then(|r| r.error.as_deref()),
            Some("denied")
        );
    }

    #[test]
    fn test_format_name_set() {
        let names = vec!["access".to_string(), "compute".to_string()];
        assert_eq!(format_name_set(&names), "{'access', 'compute'}");
    }
}
