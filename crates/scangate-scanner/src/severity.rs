//! Severity mapping shared by the adapters.

use scangate_core::finding::Severity;

/// Map a scanner's textual severity onto the canonical scale.
pub(crate) fn from_text(value: Option<&str>, default: Severity) -> Severity {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "critical" => Severity::Critical,
        "error" | "high" => Severity::High,
        "warning" | "medium" | "moderate" => Severity::Medium,
        "low" => Severity::Low,
        "info" => Severity::Info,
        _ => default,
    }
}

/// Map a CVSS base score onto the canonical scale.
pub(crate) fn from_cvss(score: Option<f64>) -> Severity {
    match score {
        None => Severity::Medium,
        Some(s) if s >= 9.0 => Severity::Critical,
        Some(s) if s >= 7.0 => Severity::High,
        Some(s) if s >= 4.0 => Severity::Medium,
        Some(s) if s > 0.0 => Severity::Low,
        Some(_) => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mapping_covers_scanner_vocabularies() {
        assert_eq!(
            from_text(Some("CRITICAL"), Severity::Medium),
            Severity::Critical
        );
        assert_eq!(from_text(Some("ERROR"), Severity::Medium), Severity::High);
        assert_eq!(
            from_text(Some("moderate"), Severity::Medium),
            Severity::Medium
        );
        assert_eq!(from_text(Some("nonsense"), Severity::Low), Severity::Low);
        assert_eq!(from_text(None, Severity::Medium), Severity::Medium);
    }

    #[test]
    fn cvss_thresholds() {
        assert_eq!(from_cvss(Some(9.8)), Severity::Critical);
        assert_eq!(from_cvss(Some(7.0)), Severity::High);
        assert_eq!(from_cvss(Some(5.4)), Severity::Medium);
        assert_eq!(from_cvss(Some(0.1)), Severity::Low);
        assert_eq!(from_cvss(Some(0.0)), Severity::Info);
        assert_eq!(from_cvss(None), Severity::Medium);
    }
}
