//! Security status self-report.
//!
//! Runs the classifier against its canned vectors and inspects the header
//! policy. Read-only; never on the admission path.

use serde::Serialize;

use crate::security::classifier::Classifier;
use crate::security::headers::{HeaderCompliance, SecurityHeaders};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityChecks {
    pub xss_protection: bool,
    pub sql_injection_protection: bool,
    pub headers_security: HeaderCompliance,
}

impl SecurityChecks {
    pub fn all_passing(&self) -> bool {
        self.xss_protection
            && self.sql_injection_protection
            && self.headers_security.missing.is_empty()
    }
}

/// Evaluate the self-checks.
pub fn run_checks(classifier: &Classifier, headers: &SecurityHeaders) -> SecurityChecks {
    SecurityChecks {
        xss_protection: classifier.xss_self_test(),
        sql_injection_protection: classifier.sql_injection_self_test(),
        headers_security: headers.compliance(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderPolicyConfig;
    use crate::security::patterns::PatternRegistry;
    use std::sync::Arc;

    #[test]
    fn test_default_engine_reports_secure() {
        let classifier = Classifier::new(Arc::new(PatternRegistry::compile().unwrap()));
        let headers = SecurityHeaders::from_config(&HeaderPolicyConfig::default()).unwrap();

        let checks = run_checks(&classifier, &headers);
        assert!(checks.all_passing());

        let json = serde_json::to_value(&checks).unwrap();
        assert_eq!(json["xssProtection"], true);
        assert_eq!(json["headersSecurity"]["compliance"], 100);
    }
}
