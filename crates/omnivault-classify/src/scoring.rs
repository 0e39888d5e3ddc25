//! Stage two: SQL-vs-NoSQL structural scoring for non-media files.
//!
//! The file is parsed by a format bucket chosen from its extension, then
//! independent SQL and NoSQL scores are accumulated from structural
//! signals. The decision is reported with per-signal reasons; downstream,
//! the SQL branch is disabled and every non-media file routes to document
//! ingestion regardless, so this report is carried as metadata rather than
//! acted on.

use omnivault_core::{Classification, ClassificationReport, ClassifyError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use omnivault_extract::TextExtractor;

/// String fields at or above this length count as large free text.
const LARGE_TEXT_FIELD_CHARS: usize = 200;

/// Whole-document length over which plain text counts as content-heavy.
const CONTENT_HEAVY_CHARS: usize = 5000;

/// Extracted-document length over which PDF/DOCX bodies count as
/// content-heavy.
const DOCUMENT_HEAVY_CHARS: usize = 3000;

/// Structural classifier for non-media files.
pub struct FileClassifier {
    text: TextExtractor,
}

impl FileClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: TextExtractor::new(),
        }
    }

    /// Score a file and return the decision with per-signal reasons.
    pub async fn classify(&self, path: &Path) -> Result<ClassificationReport, ClassifyError> {
        let file_type = detect_file_type(path);
        debug!("Classifying {:?} as {file_type}", path.file_name());

        let mut card = Scorecard::new();

        match file_type {
            "json" => {
                let raw = tokio::fs::read_to_string(path).await?;
                let value: Value = serde_json::from_str(&raw)
                    .map_err(|e| ClassifyError::Parse(format!("invalid JSON: {e}")))?;
                analyze_json(&value, &mut card);
            }
            "yaml" => {
                let raw = tokio::fs::read_to_string(path).await?;
                let yaml: serde_yaml::Value = serde_yaml::from_str(&raw)
                    .map_err(|e| ClassifyError::Parse(format!("invalid YAML: {e}")))?;
                let value = serde_json::to_value(&yaml)
                    .map_err(|e| ClassifyError::Parse(format!("YAML not JSON-mappable: {e}")))?;
                analyze_json(&value, &mut card);
            }
            "csv" => {
                card.sql(5.0, "File type is CSV (tabular)");
                analyze_csv(path, &mut card)?;
            }
            "excel" => {
                card.sql(5.0, "File type is Excel (tabular)");
            }
            "xml" => {
                let raw = tokio::fs::read_to_string(path).await?;
                analyze_xml(&raw, &mut card);
            }
            "html" => {
                let raw = tokio::fs::read_to_string(path).await?;
                analyze_html(&raw, &mut card);
            }
            "text" => {
                let raw = tokio::fs::read_to_string(path).await?;
                analyze_text(&raw, &mut card);
            }
            "document" => {
                let payload = self
                    .text
                    .extract(path)
                    .await
                    .map_err(|e| ClassifyError::Parse(e.to_string()))?;
                analyze_document(&payload.text, &mut card);
            }
            "ini" => {
                let raw = tokio::fs::read_to_string(path).await?;
                analyze_ini(&raw, &mut card);
            }
            _ => {
                let raw = tokio::fs::read_to_string(path).await.unwrap_or_default();
                analyze_unknown(&raw, &mut card);
            }
        }

        Ok(card.into_report(file_type))
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an extension to the parser bucket used for analysis.
fn detect_file_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "json" => "json",
        "csv" => "csv",
        "xlsx" | "xls" => "excel",
        "xml" => "xml",
        "html" | "htm" => "html",
        "txt" | "md" | "log" => "text",
        "yaml" | "yml" => "yaml",
        "ini" | "cfg" | "conf" => "ini",
        "pdf" | "docx" | "doc" => "document",
        _ => "unknown",
    }
}

// ============================================================================
// Scorecard
// ============================================================================

struct Scorecard {
    sql: f32,
    nosql: f32,
    reasons: Vec<String>,
}

impl Scorecard {
    fn new() -> Self {
        Self {
            sql: 0.0,
            nosql: 0.0,
            reasons: Vec::new(),
        }
    }

    fn sql(&mut self, points: f32, reason: &str) {
        self.sql += points;
        self.reasons.push(format!("{reason} (+{points} SQL)"));
    }

    fn nosql(&mut self, points: f32, reason: &str) {
        self.nosql += points;
        self.reasons.push(format!("{reason} (+{points} NoSQL)"));
    }

    fn into_report(self, file_type: &str) -> ClassificationReport {
        // Ties break to SQL.
        let classification = if self.sql >= self.nosql {
            Classification::Sql
        } else {
            Classification::NoSql
        };
        let confidence = (self.sql - self.nosql).abs() / self.sql.max(self.nosql).max(1.0);
        ClassificationReport {
            classification,
            sql_score: self.sql,
            nosql_score: self.nosql,
            confidence,
            reasons: self.reasons,
            file_type: file_type.to_string(),
        }
    }
}

// ============================================================================
// JSON / YAML analysis
// ============================================================================

fn analyze_json(value: &Value, card: &mut Scorecard) {
    if is_flat(value) {
        card.sql(4.0, "Structure is flat (no nested objects or arrays)");
    } else {
        let depth = nested_depth(value, 0);
        card.nosql(4.0, &format!("Contains nested values (depth {depth})"));
    }

    if let Value::Array(items) = value {
        let key_sets: Vec<BTreeSet<&str>> = items
            .iter()
            .filter_map(|item| item.as_object())
            .map(|obj| obj.keys().map(String::as_str).collect())
            .collect();
        if key_sets.len() > 1 {
            if key_sets.iter().all(|ks| *ks == key_sets[0]) {
                card.sql(4.0, "Array elements share identical key sets");
            } else {
                card.nosql(3.0, "Array elements have inconsistent shapes");
            }
        }
    }

    if has_id_fields(value) {
        card.sql(1.0, "Contains relational patterns (id fields)");
    }

    if has_dynamic_keys(value) {
        card.nosql(2.0, "Keys vary per record");
    }

    if is_schema_consistent(value) {
        card.sql(2.0, "Schema looks consistent across records");
    } else {
        card.nosql(2.0, "Schema varies across records");
    }

    if is_mostly_primitive(value) {
        card.sql(1.0, "Mostly primitive fields");
    }

    if has_large_text_fields(value) {
        card.nosql(2.0, "Contains large free-text fields");
    }
}

/// Flat means no nested container values. An array of records whose fields
/// are all primitive is flat: the records are rows, not nesting.
fn is_flat(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(|v| !v.is_object() && !v.is_array()),
        Value::Array(items) => items.iter().all(|v| match v {
            Value::Object(map) => map.values().all(|x| !x.is_object() && !x.is_array()),
            Value::Array(_) => false,
            _ => true,
        }),
        _ => true,
    }
}

fn nested_depth(value: &Value, current: usize) -> usize {
    match value {
        Value::Object(map) => map
            .values()
            .map(|v| nested_depth(v, current + 1))
            .max()
            .unwrap_or(current),
        Value::Array(items) => items
            .iter()
            .map(|v| nested_depth(v, current + 1))
            .max()
            .unwrap_or(current),
        _ => current,
    }
}

fn has_id_fields(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            let hit = map.keys().any(|k| {
                let k = k.to_lowercase();
                k == "id" || k == "key" || k == "pk" || k.ends_with("_id") || k.starts_with("id_")
            });
            hit || map.values().any(has_id_fields)
        }
        Value::Array(items) => items.iter().any(has_id_fields),
        _ => false,
    }
}

fn has_dynamic_keys(value: &Value) -> bool {
    if let Value::Array(items) = value {
        if items.len() > 1 && items.iter().all(Value::is_object) {
            let key_sets: BTreeSet<Vec<&str>> = items
                .iter()
                .filter_map(|i| i.as_object())
                .map(|obj| obj.keys().map(String::as_str).collect())
                .collect();
            return key_sets.len() > 1;
        }
    }
    false
}

fn is_schema_consistent(value: &Value) -> bool {
    if let Value::Array(items) = value {
        if items.len() > 1 && items.iter().all(Value::is_object) {
            let first: BTreeSet<&str> = items[0]
                .as_object()
                .map(|obj| obj.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return items.iter().skip(1).all(|item| {
                item.as_object()
                    .map(|obj| obj.keys().map(String::as_str).collect::<BTreeSet<&str>>())
                    .is_some_and(|ks| ks == first)
            });
        }
    }
    true
}

fn is_mostly_primitive(value: &Value) -> bool {
    let values: Vec<&Value> = match value {
        Value::Object(map) => map.values().collect(),
        // Arrays of records are judged by the record fields, not the
        // records themselves.
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => items
            .iter()
            .filter_map(|i| i.as_object())
            .flat_map(|obj| obj.values())
            .collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return true,
    };
    if values.is_empty() {
        return true;
    }
    let primitives = values
        .iter()
        .filter(|v| !v.is_object() && !v.is_array())
        .count();
    primitives as f32 / values.len() as f32 > 0.8
}

fn has_large_text_fields(value: &Value) -> bool {
    match value {
        Value::String(s) => s.chars().count() >= LARGE_TEXT_FIELD_CHARS,
        Value::Object(map) => map.values().any(has_large_text_fields),
        Value::Array(items) => items.iter().any(has_large_text_fields),
        _ => false,
    }
}

// ============================================================================
// CSV analysis
// ============================================================================

fn analyze_csv(path: &Path, card: &mut Scorecard) -> Result<(), ClassifyError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ClassifyError::Parse(format!("csv open failed: {e}")))?;

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(str::to_string).collect(),
        Err(_) => return Ok(()),
    };

    let width = headers.len();
    let mut consistent = true;
    for record in reader.records().take(50) {
        match record {
            Ok(r) if r.len() == width => {}
            Ok(_) => {
                consistent = false;
                break;
            }
            Err(_) => {
                consistent = false;
                break;
            }
        }
    }

    if width > 0 && consistent {
        card.sql(2.0, "Schema looks consistent across records");
    }
    if headers.iter().any(|h| h.to_lowercase().contains("id")) {
        card.sql(1.0, "Contains relational patterns (id columns)");
    }

    Ok(())
}

// ============================================================================
// XML analysis
// ============================================================================

/// Structural facts pulled from an XML document by a single tag scan.
struct XmlShape {
    max_depth: usize,
    /// Tag name and attribute key set of each direct child of the root.
    root_children: Vec<(String, BTreeSet<String>)>,
}

fn analyze_xml(raw: &str, card: &mut Scorecard) {
    let shape = scan_xml(raw);

    if shape.max_depth > 2 {
        card.nosql(
            3.0,
            &format!("Deeply nested XML (depth {})", shape.max_depth),
        );
    }

    if shape.root_children.len() > 1 {
        let first_tag = &shape.root_children[0].0;
        if shape.root_children.iter().all(|(tag, _)| tag == first_tag) {
            card.sql(3.0, "XML has repeating same-shape records");

            let first_attrs = &shape.root_children[0].1;
            if shape
                .root_children
                .iter()
                .all(|(_, attrs)| attrs == first_attrs)
            {
                card.sql(2.0, "Schema looks consistent across records");
            }
        }
    }
}

/// Walk tags tracking element depth. Comments, declarations and CDATA are
/// skipped; malformed markup degrades to whatever depth was seen.
fn scan_xml(raw: &str) -> XmlShape {
    let mut max_depth = 0usize;
    let mut depth = 0usize;
    let mut root_children = Vec::new();

    let mut rest = raw;
    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        let Some(end) = rest.find('>') else { break };
        let tag = &rest[..end];
        rest = &rest[end + 1..];

        if tag.starts_with('?') || tag.starts_with('!') {
            continue;
        }

        if let Some(name) = tag.strip_prefix('/') {
            let _ = name;
            depth = depth.saturating_sub(1);
            continue;
        }

        let self_closing = tag.ends_with('/');
        let body = tag.trim_end_matches('/');
        let mut parts = body.split_whitespace();
        let Some(name) = parts.next() else { continue };

        depth += 1;
        // Root element sits at depth 1; record its direct children.
        if depth == 2 {
            let attrs: BTreeSet<String> = parts
                .filter_map(|attr| attr.split('=').next())
                .map(str::to_string)
                .collect();
            root_children.push((name.to_string(), attrs));
        }
        // Depth below the root, matching tree-edge counting.
        max_depth = max_depth.max(depth - 1);

        if self_closing {
            depth = depth.saturating_sub(1);
        }
    }

    XmlShape {
        max_depth,
        root_children,
    }
}

// ============================================================================
// HTML / text / document analysis
// ============================================================================

fn analyze_html(raw: &str, card: &mut Scorecard) {
    let lowered = raw.to_lowercase();
    let table_count = lowered.matches("<table").count();

    if table_count > 0 {
        card.sql(
            3.0,
            &format!("HTML contains well-formed tables ({table_count})"),
        );
    } else if raw.len() > CONTENT_HEAVY_CHARS {
        card.nosql(1.0, "HTML without structured tables");
    }

    let text_len = strip_tags(raw).len();
    if text_len > DOCUMENT_HEAVY_CHARS {
        card.nosql(2.0, "Contains large free-text fields");
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn analyze_text(raw: &str, card: &mut Scorecard) {
    card.nosql(3.0, "Pure text content");

    if raw.len() > CONTENT_HEAVY_CHARS {
        card.nosql(2.0, "Contains large free-text fields");
    }

    if looks_tabular(raw, ',') || looks_tabular(raw, '\t') {
        card.sql(3.0, "Text contains tabular patterns");
    }
}

fn analyze_document(body: &str, card: &mut Scorecard) {
    card.nosql(3.0, "Document body (PDF/DOCX extracted text)");

    if body.len() > DOCUMENT_HEAVY_CHARS {
        card.nosql(2.0, "Contains large free-text fields");
    }
}

fn analyze_ini(raw: &str, card: &mut Scorecard) {
    let pairs: Vec<(&str, &str)> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))
        .filter_map(|l| l.split_once('='))
        .collect();

    if pairs.is_empty() {
        analyze_text(raw, card);
        return;
    }

    card.sql(4.0, "Flat key-value structure (no nested values)");
    card.sql(2.0, "Schema looks consistent across records");
    if pairs.iter().all(|(_, v)| v.trim().len() < LARGE_TEXT_FIELD_CHARS) {
        card.sql(1.0, "Mostly primitive fields");
    }
}

fn analyze_unknown(raw: &str, card: &mut Scorecard) {
    let trimmed = raw.trim();

    // Content sniffing: honor embedded JSON or XML before giving up.
    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            card.reasons
                .push("Unknown extension but content is valid JSON".to_string());
            analyze_json(&value, card);
            return;
        }
    }

    if trimmed.starts_with('<') {
        card.reasons
            .push("Unknown extension but content looks like XML".to_string());
        analyze_xml(trimmed, card);
        return;
    }

    card.nosql(2.0, "Unknown file type (unstructured)");

    if looks_tabular(raw, ',') || looks_tabular(raw, '\t') {
        card.sql(3.0, "Content contains tabular patterns");
    }

    if raw.len() > CONTENT_HEAVY_CHARS {
        card.nosql(2.0, "Contains large free-text fields");
    }
}

/// CSV/TSV shape test: the first ten non-empty lines split into the same
/// number of fields (more than one).
fn looks_tabular(raw: &str, delimiter: char) -> bool {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty()).take(10);
    let Some(first) = lines.next() else {
        return false;
    };
    let width = first.split(delimiter).count();
    if width < 2 {
        return false;
    }
    let mut saw_more = false;
    for line in lines {
        saw_more = true;
        if line.split(delimiter).count() != width {
            return false;
        }
    }
    saw_more
}
