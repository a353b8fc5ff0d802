use std::sync::Arc;

use pretty_assertions::assert_eq;

use mender::detect::Detector;
use mender::errors::ProviderError;
use mender::fixes::{AiFixProvider, FixEngine, ProposedFix, ProviderStatus};
use mender::models::{Confidence, FixType, Issue};

// Hand-rolled provider mocks for driving the AI path
mod test_mocks {
    use super::*;
    use async_trait::async_trait;

    /// Provider that returns a canned proposal for every issue
    pub struct CannedProvider {
        pub proposal: ProposedFix,
    }

    #[async_trait]
    impl AiFixProvider for CannedProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn propose_fix(
            &self,
            _issue: &Issue,
            _context: &str,
        ) -> Result<Option<ProposedFix>, ProviderError> {
            Ok(Some(self.proposal.clone()))
        }
    }

    /// Provider that always fails
    pub struct DownProvider;

    #[async_trait]
    impl AiFixProvider for DownProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn propose_fix(
            &self,
            _issue: &Issue,
            _context: &str,
        ) -> Result<Option<ProposedFix>, ProviderError> {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        }
    }

    /// Provider without credentials
    pub struct UnconfiguredProvider;

    #[async_trait]
    impl AiFixProvider for UnconfiguredProvider {
        fn is_configured(&self) -> bool {
            false
        }

        async fn propose_fix(
            &self,
            _issue: &Issue,
            _context: &str,
        ) -> Result<Option<ProposedFix>, ProviderError> {
            Err(ProviderError::Misconfigured("no key".to_string()))
        }
    }
}

use test_mocks::{CannedProvider, DownProvider, UnconfiguredProvider};

const SECRET_SOURCE: &str = "import os\n\napi_key = \"sk_live_123\"\n";

fn secret_issues() -> Vec<Issue> {
    Detector::new().detect(SECRET_SOURCE, "config.py")
}

#[tokio::test]
async fn test_rule_fix_externalizes_python_secret() {
    let engine = FixEngine::rule_based();
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    assert_eq!(batch.provider_status, ProviderStatus::Disabled);
    assert_eq!(batch.fixes.len(), 1);

    let fix = &batch.fixes[0];
    assert_eq!(fix.line, 3);
    assert_eq!(fix.fixed_code, "api_key = os.environ[\"API_KEY\"]");
    assert_eq!(fix.confidence, Confidence::High);
    assert_eq!(fix.fix_type, FixType::RuleBased);
    assert!(fix.env_vars_needed.contains("API_KEY"));
    assert!(!fix.applied);
}

#[tokio::test]
async fn test_rule_fix_externalizes_javascript_secret() {
    let engine = FixEngine::rule_based();
    let source = "const x = 1;\napi_key = \"sk_live_123\";\n";
    let issues = Detector::new().detect(source, "app.js");

    let batch = engine.generate(&issues, source, "app.js").await;

    let secret_fix = batch
        .fixes
        .iter()
        .find(|f| f.fixed_code.contains("process.env"))
        .expect("expected a JS secret fix");
    assert_eq!(secret_fix.fixed_code, "const api_key = process.env.API_KEY");
    assert!(secret_fix.env_vars_needed.contains("API_KEY"));
}

#[tokio::test]
async fn test_rule_fix_comments_out_debug_print() {
    let engine = FixEngine::rule_based();
    let source = "x = 1\nprint(x)\n";
    let issues = Detector::new().detect(source, "app.py");

    let batch = engine.generate(&issues, source, "app.py").await;

    assert_eq!(batch.fixes.len(), 1);
    let fix = &batch.fixes[0];
    assert_eq!(fix.line, 2);
    assert!(fix.fixed_code.starts_with("# print(x)"));
    assert_eq!(fix.confidence, Confidence::High);
    assert!(fix.env_vars_needed.is_empty());
}

#[tokio::test]
async fn test_rule_fix_replaces_bare_except() {
    let engine = FixEngine::rule_based();
    let source = "try:\n    work()\nexcept:\n    fail()\n";
    let issues = Detector::new().detect(source, "job.py");

    let batch = engine.generate(&issues, source, "job.py").await;

    assert_eq!(batch.fixes.len(), 1);
    assert_eq!(batch.fixes[0].fixed_code, "except Exception as e:");
}

#[tokio::test]
async fn test_identical_rewrites_collapse_to_rule_based_fix() {
    // AI proposes the same replacement text the rule produced
    let provider = CannedProvider {
        proposal: ProposedFix {
            line: None,
            fixed_code: "api_key = os.environ[\"API_KEY\"]".to_string(),
            explanation: "Use an environment variable".to_string(),
            env_vars_needed: vec!["API_KEY".to_string()],
            confidence: None,
        },
    };
    let engine = FixEngine::new(Some(Arc::new(provider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    assert_eq!(batch.provider_status, ProviderStatus::Ready);
    assert_eq!(batch.fixes.len(), 1);
    assert_eq!(batch.fixes[0].fix_type, FixType::RuleBased);
}

#[tokio::test]
async fn test_differing_rewrites_are_kept_as_alternatives() {
    let provider = CannedProvider {
        proposal: ProposedFix {
            line: None,
            fixed_code: "api_key = load_secret(\"api_key\")".to_string(),
            explanation: "Load the key from the secret store".to_string(),
            env_vars_needed: vec![],
            confidence: None,
        },
    };
    let engine = FixEngine::new(Some(Arc::new(provider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    assert_eq!(batch.fixes.len(), 2);
    assert_eq!(batch.fixes[0].fix_type, FixType::RuleBased);
    assert_eq!(batch.fixes[1].fix_type, FixType::AiGenerated);
}

#[tokio::test]
async fn test_ai_confidence_is_capped_at_medium() {
    let provider = CannedProvider {
        proposal: ProposedFix {
            line: None,
            fixed_code: "api_key = vault.read(\"api_key\")".to_string(),
            explanation: "Read from vault".to_string(),
            env_vars_needed: vec![],
            confidence: Some(Confidence::High),
        },
    };
    let engine = FixEngine::new(Some(Arc::new(provider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    let ai_fix = batch
        .fixes
        .iter()
        .find(|f| f.fix_type == FixType::AiGenerated)
        .expect("expected an AI fix");
    assert_eq!(ai_fix.confidence, Confidence::Medium);
}

#[tokio::test]
async fn test_ai_fix_outside_source_bounds_is_dropped() {
    let provider = CannedProvider {
        proposal: ProposedFix {
            line: Some(999),
            fixed_code: "whatever()".to_string(),
            explanation: "out of range".to_string(),
            env_vars_needed: vec![],
            confidence: None,
        },
    };
    let engine = FixEngine::new(Some(Arc::new(provider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    // Only the rule-based fix survives; the batch itself is intact
    assert_eq!(batch.provider_status, ProviderStatus::Ready);
    assert_eq!(batch.fixes.len(), 1);
    assert_eq!(batch.fixes[0].fix_type, FixType::RuleBased);
}

#[tokio::test]
async fn test_ai_fix_with_empty_replacement_is_dropped() {
    let provider = CannedProvider {
        proposal: ProposedFix {
            line: None,
            fixed_code: "   ".to_string(),
            explanation: "empty".to_string(),
            env_vars_needed: vec![],
            confidence: None,
        },
    };
    let engine = FixEngine::new(Some(Arc::new(provider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    assert_eq!(batch.fixes.len(), 1);
    assert_eq!(batch.fixes[0].fix_type, FixType::RuleBased);
}

#[tokio::test]
async fn test_provider_outage_degrades_to_rule_based_fixes() {
    let engine = FixEngine::new(Some(Arc::new(DownProvider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    match &batch.provider_status {
        ProviderStatus::Unavailable { reason } => {
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected unavailable status, got {:?}", other),
    }
    assert_eq!(batch.fixes.len(), 1);
    assert_eq!(batch.fixes[0].fix_type, FixType::RuleBased);
}

#[tokio::test]
async fn test_unconfigured_provider_disables_ai_path() {
    let engine = FixEngine::new(Some(Arc::new(UnconfiguredProvider)));
    let issues = secret_issues();

    let batch = engine.generate(&issues, SECRET_SOURCE, "config.py").await;

    assert_eq!(batch.provider_status, ProviderStatus::Disabled);
    assert!(!engine.ai_configured());
    assert_eq!(batch.fixes.len(), 1);
}
