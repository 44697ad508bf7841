//! Advisory diagnostics collected during a pipeline run

/// Warnings and internal-invariant notices for one schema file. Nothing in
/// here aborts processing; the CLI prints the messages after the run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    warnings: Vec<String>,
    invariant_violations: Vec<String>,
}

impl Report {
    /// Record a rule miss or coverage gap.
    pub fn warn(&mut self, rule: &str, message: impl Into<String>) {
        self.warnings.push(format!("{}: {}", rule, message.into()));
    }

    /// Record a tree-consistency problem, such as a removal candidate whose
    /// parent is missing from the current index.
    pub fn invariant(&mut self, message: impl Into<String>) {
        self.invariant_violations.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn invariant_violations(&self) -> &[String] {
        &self.invariant_violations
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.invariant_violations.is_empty()
    }

    /// All messages in emission order, warnings first.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.warnings
            .iter()
            .chain(self.invariant_violations.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_clean() {
        let report = Report::default();
        assert!(report.is_clean());
        assert_eq!(report.messages().count(), 0);
    }

    #[test]
    fn test_warn_formats_rule() {
        let mut report = Report::default();
        report.warn("codeLists", "no match for Temperature");
        assert!(!report.is_clean());
        assert_eq!(report.warnings(), &["codeLists: no match for Temperature"]);
    }

    #[test]
    fn test_invariant_collected_separately() {
        let mut report = Report::default();
        report.invariant("removal candidate has no parent");
        assert!(report.warnings().is_empty());
        assert_eq!(report.invariant_violations().len(), 1);
    }
}
