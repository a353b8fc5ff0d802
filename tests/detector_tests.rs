use mender::detect::{decode_source, Detector};
use mender::errors::DetectError;
use mender::models::results::{security_score, RiskLevel};
use mender::models::{Issue, IssueCategory, IssueKind, Severity};

fn make_issue(severity: Severity) -> Issue {
    Issue {
        kind: IssueKind::CodeQuality,
        category: IssueCategory::Quality,
        line: 1,
        severity,
        message: "test issue".to_string(),
        matched: "x".to_string(),
        fix_available: true,
    }
}

#[test]
fn test_detects_hardcoded_api_key() {
    let detector = Detector::new();
    let code = "import os\n\napi_key = \"sk_live_123\"\n";

    let issues = detector.detect(code, "config.py");

    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    assert_eq!(issue.kind, IssueKind::SecretExposure);
    assert_eq!(issue.category, IssueCategory::Security);
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.line, 3);
    assert!(issue.matched.contains("api_key"));
    assert!(issue.fix_available);
}

#[test]
fn test_detects_python_debug_statement() {
    let detector = Detector::new();
    let code = "x = 1\nprint(x)\n";

    let issues = detector.detect(code, "app.py");

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::DebugStatement);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert_eq!(issues[0].line, 2);
}

#[test]
fn test_detects_bare_except() {
    let detector = Detector::new();
    let code = "try:\n    work()\nexcept:\n    fail()\n";

    let issues = detector.detect(code, "job.py");

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::CodeQuality);
    assert_eq!(issues[0].line, 3);
    assert_eq!(issues[0].message, "Bare Except Clause");
}

#[test]
fn test_detects_javascript_console_and_var() {
    let detector = Detector::new();
    let code = "var count = 0;\nconsole.log(count);\n";

    let issues = detector.detect(code, "main.js");

    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].line, 1);
    assert_eq!(issues[0].kind, IssueKind::CodeQuality);
    assert_eq!(issues[1].line, 2);
    assert_eq!(issues[1].kind, IssueKind::DebugStatement);
}

#[test]
fn test_issues_come_out_in_ascending_line_order() {
    let detector = Detector::new();
    let code = "password = \"hunter2secret\"\n\nx = 1\n\nprint(x)\n\napi_key = \"sk_live_123\"\n";

    let issues = detector.detect(code, "settings.py");

    assert!(issues.len() >= 3);
    let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
}

#[test]
fn test_language_patterns_do_not_apply_to_other_files() {
    let detector = Detector::new();
    // A print call is only a debug statement in Python sources
    let issues = detector.detect("print(x)\n", "readme.txt");
    assert!(issues.is_empty());
}

#[test]
fn test_detector_is_pure_and_repeatable() {
    let detector = Detector::new();
    let code = "api_key = \"sk_live_123\"\nprint(x)\n";

    let first = detector.detect(code, "a.py");
    let second = detector.detect(code, "a.py");

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.line, b.line);
        assert_eq!(a.message, b.message);
    }
}

#[test]
fn test_security_score_decreases_as_issues_accumulate() {
    let mut issues = Vec::new();
    let mut previous = security_score(&issues);
    assert_eq!(previous, 100);

    for _ in 0..6 {
        issues.push(make_issue(Severity::Critical));
        let next = security_score(&issues);
        assert!(next <= previous);
        previous = next;
    }
}

#[test]
fn test_security_score_is_clamped_to_zero() {
    let issues: Vec<Issue> = (0..20).map(|_| make_issue(Severity::Critical)).collect();
    assert_eq!(security_score(&issues), 0);
}

#[test]
fn test_severity_weights_strictly_increase_with_risk() {
    assert!(Severity::Critical.weight() > Severity::High.weight());
    assert!(Severity::High.weight() > Severity::Medium.weight());
    assert!(Severity::Medium.weight() > Severity::Low.weight());
}

#[test]
fn test_risk_level_buckets_are_total_and_monotonic() {
    assert_eq!(RiskLevel::from_score(100), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(95), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(94), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(80), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(79), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(59), RiskLevel::Critical);
    assert_eq!(RiskLevel::from_score(0), RiskLevel::Critical);

    // Lower scores never map to a lower risk bucket
    let mut previous = RiskLevel::from_score(100);
    for score in (0..=100).rev() {
        let bucket = RiskLevel::from_score(score);
        assert!(bucket >= previous);
        previous = bucket;
    }
}

#[test]
fn test_decode_source_rejects_binary_content() {
    let result = decode_source("image.py", &[0xff, 0xfe, 0x00, 0x01]);

    match result {
        Err(DetectError::Decode { path, .. }) => assert_eq!(path, "image.py"),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn test_decode_source_accepts_utf8() {
    let text = decode_source("ok.py", "x = 1\n".as_bytes()).unwrap();
    assert_eq!(text, "x = 1\n");
}
