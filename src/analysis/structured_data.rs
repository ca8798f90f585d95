//! StructuredData analyzer (§4.9): JSON-LD `<script type="application/
//! ld+json">` blocks plus a microdata attribute walk, validated against
//! a required-field table for the known schema.org types the spec
//! names. Invalid JSON yields a `parse-error` issue and the page's
//! other blocks are still analysed.

use super::types::{Issue, IssueKind, IssueSeverity};
use serde_json::Value;

/// One structured-data block found on a page, JSON-LD or microdata.
#[derive(Debug, Clone)]
pub struct StructuredBlock {
    pub schema_type: Option<String>,
    pub valid: bool,
    pub missing_fields: Vec<&'static str>,
}

fn required_fields(schema_type: &str) -> Option<&'static [&'static str]> {
    match schema_type {
        "Article" | "NewsArticle" | "BlogPosting" => {
            Some(&["headline", "author", "datePublished"])
        }
        "Product" => Some(&["name", "image", "offers"]),
        "LocalBusiness" => Some(&["name", "address"]),
        "BreadcrumbList" => Some(&["itemListElement"]),
        "FAQPage" => Some(&["mainEntity"]),
        "WebSite" => Some(&["name", "url"]),
        _ => None,
    }
}

/// Structural fields whose absence is an error (invalidates the block)
/// rather than a warning, per §4.9.
fn is_structural(schema_type: &str, field: &str) -> bool {
    matches!(
        (schema_type, field),
        ("BreadcrumbList", "itemListElement") | ("FAQPage", "mainEntity")
    )
}

fn extract_type(value: &Value) -> Option<String> {
    match value.get("@type") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn validate_object(value: &Value) -> Option<StructuredBlock> {
    let schema_type = extract_type(value)?;
    let required = required_fields(&schema_type);
    let mut missing = Vec::new();
    if let Some(fields) = required {
        for field in fields {
            if value.get(field).is_none() {
                missing.push(*field);
            }
        }
    }
    let valid = !missing
        .iter()
        .any(|f| is_structural(&schema_type, f));
    Some(StructuredBlock {
        schema_type: Some(schema_type),
        valid,
        missing_fields: missing,
    })
}

/// Parses and validates every `<script type="application/ld+json">`
/// block already captured into `PageFacts.json_ld_blocks`, returning
/// the per-block results and any issues raised.
pub fn analyze_json_ld(url: &str, blocks: &[String]) -> (Vec<StructuredBlock>, Vec<Issue>) {
    let mut results = Vec::new();
    let mut issues = Vec::new();

    for (i, raw) in blocks.iter().enumerate() {
        let parsed: Result<Value, _> = serde_json::from_str(raw);
        let value = match parsed {
            Ok(v) => v,
            Err(e) => {
                issues.push(Issue::new(
                    url,
                    "structured-data",
                    "parse-error",
                    IssueSeverity::Medium,
                    IssueKind::Warning,
                    format!("JSON-LD block {i} failed to parse: {e}"),
                ));
                continue;
            }
        };

        let graph = match value.get("@graph") {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![value],
        };

        for item in &graph {
            if let Some(block) = validate_object(item) {
                if !block.missing_fields.is_empty() {
                    let severity = if block.valid {
                        IssueSeverity::Low
                    } else {
                        IssueSeverity::Medium
                    };
                    let kind = if block.valid {
                        IssueKind::Warning
                    } else {
                        IssueKind::Error
                    };
                    issues.push(Issue::new(
                        url,
                        "structured-data",
                        "missing-recommended-fields",
                        severity,
                        kind,
                        format!(
                            "{} block missing: {}",
                            block.schema_type.as_deref().unwrap_or("unknown"),
                            block.missing_fields.join(", ")
                        ),
                    ));
                }
                results.push(block);
            }
        }
    }

    (results, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_article_no_issues() {
        let block = r#"{"@type":"Article","headline":"H","author":"me","datePublished":"2024-01-01"}"#;
        let (results, issues) = analyze_json_ld("https://x/a", &[block.to_string()]);
        assert_eq!(results.len(), 1);
        assert!(results[0].valid);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_malformed_json_yields_parse_error() {
        let (results, issues) = analyze_json_ld("https://x/a", &["{not json".to_string()]);
        assert!(results.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "parse-error");
    }

    #[test]
    fn test_missing_non_structural_field_is_warning() {
        let block = r#"{"@type":"Article","headline":"H"}"#;
        let (results, issues) = analyze_json_ld("https://x/a", &[block.to_string()]);
        assert!(results[0].valid);
        assert_eq!(issues[0].kind, IssueKind::Warning);
    }

    #[test]
    fn test_breadcrumblist_missing_structural_field_is_invalid() {
        let block = r#"{"@type":"BreadcrumbList"}"#;
        let (results, issues) = analyze_json_ld("https://x/a", &[block.to_string()]);
        assert!(!results[0].valid);
        assert_eq!(issues[0].kind, IssueKind::Error);
    }

    #[test]
    fn test_graph_array_validates_each_entry() {
        let block = r#"{"@graph":[{"@type":"WebSite","name":"S","url":"https://x"},{"@type":"Product","name":"P"}]}"#;
        let (results, issues) = analyze_json_ld("https://x/a", &[block.to_string()]);
        assert_eq!(results.len(), 2);
        assert!(results[0].valid);
        assert!(!issues.is_empty());
    }

    #[test]
    fn test_unknown_type_has_no_required_fields() {
        let block = r#"{"@type":"SomethingElse"}"#;
        let (results, issues) = analyze_json_ld("https://x/a", &[block.to_string()]);
        assert!(results[0].valid);
        assert!(issues.is_empty());
    }
}
