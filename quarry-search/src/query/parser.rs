//! Free-text query parser.
//!
//! Tokenises on whitespace, matches lowercase forms against a handful of
//! phrase patterns, and keeps everything else as an ordered keyword list.
//! The raw query keeps its original casing.

use std::collections::BTreeSet;

use crate::types::{normalize_extensions, ParsedQuery, QueryIntent, SearchFilters, SearchRequest};

use super::units::{parse_date, parse_size, DateBound};

/// Extensions recognised in the bare `csv files` form. The `*.ext` and
/// `.ext` forms accept any alphanumeric extension.
const KNOWN_EXTENSIONS: &[&str] = &[
    "arrow", "avro", "bam", "csv", "feather", "fastq", "gif", "gz", "h5", "hdf5", "html", "ipynb",
    "jpeg", "jpg", "json", "jsonl", "md", "npy", "orc", "parquet", "pdf", "png", "py", "sql",
    "tar", "tif", "tiff", "tsv", "txt", "vcf", "xls", "xlsx", "xml", "yaml", "yml", "zip",
];

/// Words that carry no search signal on their own.
const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "do", "file", "files", "find", "for", "have", "i",
    "in", "is", "list", "me", "my", "of", "show", "that", "the", "there", "what", "which", "with",
];

/// Parse a raw query merged with explicit filters.
///
/// Never fails. An empty or blank query yields `keywords = [raw_query]`
/// verbatim with keyword intent.
pub fn parse(raw_query: &str, explicit: &SearchFilters) -> ParsedQuery {
    if raw_query.trim().is_empty() {
        return ParsedQuery {
            raw_query: raw_query.to_owned(),
            keywords: vec![raw_query.to_owned()],
            inferred_extensions: BTreeSet::new(),
            inferred_filters: SearchFilters::default(),
            filters: explicit.merged_over(&SearchFilters::default()),
            intent: QueryIntent::Keyword,
        };
    }

    let tokens: Vec<String> = raw_query.split_whitespace().map(clean_token).collect();
    let mut scan = Scan::default();
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);

        if tok.is_empty() {
            i += 1;
            continue;
        }

        // Count phrasing.
        if matches!((tok, next), ("how", Some("many")) | ("count" | "number", Some("of"))) {
            scan.count = true;
            i += 2;
            continue;
        }
        if tok == "count" && i == 0 {
            scan.count = true;
            i += 1;
            continue;
        }

        // Size phrasing: "larger than 10mb", "over 1 gb", ">10mb".
        if let Some((bound, skip)) = size_comparator(tok, next) {
            let start = i + skip;
            if let Some(number) = tokens.get(start) {
                let unit = tokens.get(start + 1).map(String::as_str);
                if let Some((bytes, unit_used)) = parse_size(number, unit) {
                    scan.set_size(bound, bytes);
                    i = start + 1 + usize::from(unit_used);
                    continue;
                }
            }
        }
        if let Some((bound, literal)) = attached_comparator(tok) {
            if let Some((bytes, unit_used)) = parse_size(literal, next) {
                scan.set_size(bound, bytes);
                i += 1 + usize::from(unit_used);
                continue;
            }
        }

        // Date phrasing: "since 2023", "after 2024-01-31", "before 2022".
        if let Some(date_token) = next {
            let parsed = match tok {
                "since" => parse_date(date_token, DateBound::Start).map(|d| (true, d)),
                "after" => parse_date(date_token, DateBound::End).map(|d| (true, d)),
                "before" => parse_date(date_token, DateBound::Start).map(|d| (false, d)),
                _ => None,
            };
            if let Some((is_after, instant)) = parsed {
                if is_after {
                    scan.filters.modified_after = Some(instant);
                } else {
                    scan.filters.modified_before = Some(instant);
                }
                i += 2;
                continue;
            }
        }

        // Extension phrasing: "*.csv", ".csv files", "csv files".
        if let Some(ext) = extension_literal(tok) {
            scan.extensions.insert(ext);
            i += if matches!(next, Some("file" | "files")) { 2 } else { 1 };
            continue;
        }
        if KNOWN_EXTENSIONS.contains(&tok) && matches!(next, Some("file" | "files")) {
            scan.extensions.insert(tok.to_owned());
            i += 2;
            continue;
        }

        if !STOPWORDS.contains(&tok) && !scan.keywords.iter().any(|k| k == tok) {
            scan.keywords.push(tok.to_owned());
        }
        i += 1;
    }

    let mut inferred = scan.filters;
    inferred.extensions = scan.extensions.iter().cloned().collect();
    let filters = explicit.merged_over(&inferred);

    let intent = if scan.count {
        QueryIntent::Count
    } else if !filters.is_empty() {
        QueryIntent::Structured
    } else {
        QueryIntent::Keyword
    };

    tracing::trace!(
        query = raw_query,
        keywords = ?scan.keywords,
        ?intent,
        "parsed query"
    );

    ParsedQuery {
        raw_query: raw_query.to_owned(),
        keywords: scan.keywords,
        inferred_extensions: scan.extensions,
        inferred_filters: inferred,
        filters,
        intent,
    }
}

/// Parse the query of a request, forcing count intent when `count_only` is set.
pub fn parse_request(request: &SearchRequest) -> ParsedQuery {
    let mut parsed = parse(&request.query, &request.filters);
    if request.count_only {
        parsed.intent = QueryIntent::Count;
    }
    parsed
}

#[derive(Default)]
struct Scan {
    keywords: Vec<String>,
    extensions: BTreeSet<String>,
    filters: SearchFilters,
    count: bool,
}

#[derive(Clone, Copy)]
enum SizeBound {
    Min,
    Max,
}

impl Scan {
    fn set_size(&mut self, bound: SizeBound, bytes: u64) {
        match bound {
            SizeBound::Min => self.filters.min_size = Some(bytes),
            SizeBound::Max => self.filters.max_size = Some(bytes),
        }
    }
}

/// Lowercase and strip surrounding punctuation that never carries meaning.
fn clean_token(raw: &str) -> String {
    raw.trim_matches(|c: char| matches!(c, '?' | '!' | ',' | ';' | ':' | '"' | '\'' | '(' | ')'))
        .to_lowercase()
}

/// Returns the bound and how many tokens the comparator spans.
fn size_comparator(tok: &str, next: Option<&str>) -> Option<(SizeBound, usize)> {
    match (tok, next) {
        ("larger" | "bigger" | "greater", Some("than")) => Some((SizeBound::Min, 2)),
        ("smaller" | "less", Some("than")) => Some((SizeBound::Max, 2)),
        ("over" | "above" | ">" | ">=", _) => Some((SizeBound::Min, 1)),
        ("under" | "below" | "<" | "<=", _) => Some((SizeBound::Max, 1)),
        _ => None,
    }
}

/// `>10mb` / `<=2gb` with the comparator glued to the literal.
fn attached_comparator(tok: &str) -> Option<(SizeBound, &str)> {
    let (bound, rest) = if let Some(rest) = tok.strip_prefix('>') {
        (SizeBound::Min, rest)
    } else if let Some(rest) = tok.strip_prefix('<') {
        (SizeBound::Max, rest)
    } else {
        return None;
    };
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    if rest.is_empty() {
        None
    } else {
        Some((bound, rest))
    }
}

/// `*.csv` or `.csv` → `csv`. Compound forms like `*.tar.gz` are kept whole.
fn extension_literal(tok: &str) -> Option<String> {
    let rest = tok.strip_prefix("*.").or_else(|| tok.strip_prefix('.'))?;
    let valid = !rest.is_empty()
        && rest.len() <= 16
        && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
        && !rest.starts_with('.')
        && !rest.ends_with('.');
    if valid {
        normalize_extensions(&[rest.to_owned()]).into_iter().next()
    } else {
        None
    }
}
