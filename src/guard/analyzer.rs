//! Text-level GraphQL query heuristics
//!
//! The host resolves queries without handing a parsed document to
//! third-party code at the point the guard runs, so every estimator here
//! works on the raw request text. They approximate what an AST visitor would
//! measure and will misjudge some queries, most notably braces inside
//! object-literal arguments and string values. That imprecision is accepted:
//! the contract is heuristic equivalence, not exactness.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::EffectiveConfig;

/// A field name seen this many times inside one `{ ... }` block is treated
/// as a query expansion attempt.
pub const DUPLICATE_FIELD_THRESHOLD: u32 = 3;

/// Regexes shared by every analysis
struct QueryPatterns {
    alias: Regex,
    directive: Regex,
    introspection: Regex,
    connection_argument: Regex,
    where_argument: Regex,
}

static PATTERNS: OnceLock<QueryPatterns> = OnceLock::new();

fn patterns() -> &'static QueryPatterns {
    PATTERNS.get_or_init(|| QueryPatterns {
        // `alias: field`, but not `$variable: Type`
        alias: Regex::new(r"(?:^|[^$\w])[A-Za-z_]\w*\s*:\s*[A-Za-z_]").unwrap(),

        directive: Regex::new(r"@[A-Za-z_]\w*").unwrap(),

        introspection: Regex::new(r"__schema|__type|__typename|__directive").unwrap(),

        // Pagination sizes multiply resolver work
        connection_argument: Regex::new(r"\b(?:first|last)\s*:\s*(\d+)").unwrap(),

        where_argument: Regex::new(r"\bwhere\s*:").unwrap(),
    })
}

/// Measurements derived from one raw query string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySignature {
    #[serde(skip)]
    pub raw_text: String,
    /// Length in bytes
    pub length: usize,
    pub alias_count: u32,
    pub directive_count: u32,
    /// Longest run of opening braces with no closing brace in between
    pub nesting_depth: u32,
    pub has_duplicate_fields: bool,
    /// Most occurrences of a single field name inside one block
    pub max_field_repeats: u32,
    /// Most occurrences of a single field name anywhere in the query
    pub max_total_field_repeats: u32,
    pub is_introspection: bool,
    pub field_count: u32,
    /// Fragment spreads and inline fragments
    pub fragment_count: u32,
    pub estimated_complexity: u32,
}

impl QuerySignature {
    /// True when `depth_limit + 1` consecutive opening braces occur
    pub fn exceeds_depth(&self, depth_limit: u32) -> bool {
        self.nesting_depth > depth_limit
    }

    /// Truncated query text for logs
    pub fn preview(&self, max_chars: usize) -> String {
        let collapsed: String = self
            .raw_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if collapsed.chars().count() <= max_chars {
            collapsed
        } else {
            let mut preview: String = collapsed.chars().take(max_chars).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Near-miss indicators evaluated against halved limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionIndicator {
    Aliases,
    Directives,
    Depth,
    Length,
    Complexity,
    FieldRepeats,
}

impl SuspicionIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspicionIndicator::Aliases => "aliases",
            SuspicionIndicator::Directives => "directives",
            SuspicionIndicator::Depth => "depth",
            SuspicionIndicator::Length => "length",
            SuspicionIndicator::Complexity => "complexity",
            SuspicionIndicator::FieldRepeats => "field_repeats",
        }
    }
}

/// Stateless query estimators
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Derive the full signature of `raw_text`. Pure: the same text always
    /// produces the same signature.
    pub fn analyze(&self, raw_text: &str) -> QuerySignature {
        let patterns = patterns();
        let scan = scan_tokens(raw_text);
        let braces = brace_profile(raw_text);

        let alias_count = patterns.alias.find_iter(raw_text).count() as u32;
        let directive_count = patterns.directive.find_iter(raw_text).count() as u32;
        let is_introspection = patterns.introspection.is_match(raw_text);

        let estimated_complexity = estimate_complexity(raw_text, &scan, braces.max_balance);

        QuerySignature {
            raw_text: raw_text.to_string(),
            length: raw_text.len(),
            alias_count,
            directive_count,
            nesting_depth: braces.longest_open_run,
            has_duplicate_fields: scan.max_field_repeats >= DUPLICATE_FIELD_THRESHOLD,
            max_field_repeats: scan.max_field_repeats,
            max_total_field_repeats: scan.max_total_field_repeats,
            is_introspection,
            field_count: scan.field_count,
            fragment_count: scan.fragment_count,
            estimated_complexity,
        }
    }

    /// Indicators tripped at half of each hard limit. Monitoring only.
    pub fn suspicion_indicators(
        &self,
        signature: &QuerySignature,
        config: &EffectiveConfig,
    ) -> Vec<SuspicionIndicator> {
        let mut indicators = Vec::new();

        if signature.alias_count > config.alias_limit / 2 {
            indicators.push(SuspicionIndicator::Aliases);
        }
        // Hard directive limit is doubled, so half of it is the base limit
        if signature.directive_count > config.directive_limit {
            indicators.push(SuspicionIndicator::Directives);
        }
        if signature.nesting_depth > config.query_depth_limit / 2 {
            indicators.push(SuspicionIndicator::Depth);
        }
        if signature.length > max_query_length(config) / 2 {
            indicators.push(SuspicionIndicator::Length);
        }
        if signature.estimated_complexity > config.query_complexity_limit / 2 {
            indicators.push(SuspicionIndicator::Complexity);
        }
        // Per-block repeats are rejected outright at the duplication
        // threshold, so the soft limit applies to the whole query.
        if signature.max_total_field_repeats > config.field_duplicate_limit / 2 {
            indicators.push(SuspicionIndicator::FieldRepeats);
        }

        indicators
    }
}

/// Raw length ceiling derived from the complexity limit
pub fn max_query_length(config: &EffectiveConfig) -> usize {
    config.query_complexity_limit as usize * 100
}

struct BraceProfile {
    longest_open_run: u32,
    max_balance: u32,
}

// Raw character scan: braces inside strings count too, matching the
// textual depth proxy.
fn brace_profile(raw_text: &str) -> BraceProfile {
    let mut run = 0u32;
    let mut longest_open_run = 0u32;
    let mut balance = 0i64;
    let mut max_balance = 0i64;

    for c in raw_text.chars() {
        match c {
            '{' => {
                run = run.saturating_add(1);
                longest_open_run = longest_open_run.max(run);
                balance += 1;
                max_balance = max_balance.max(balance);
            }
            '}' => {
                run = 0;
                balance = (balance - 1).max(0);
            }
            _ => {}
        }
    }

    BraceProfile {
        longest_open_run,
        max_balance: u32::try_from(max_balance).unwrap_or(u32::MAX),
    }
}

struct TokenScan {
    field_count: u32,
    fragment_count: u32,
    max_field_repeats: u32,
    max_total_field_repeats: u32,
}

const KEYWORDS: &[&str] = &[
    "query",
    "mutation",
    "subscription",
    "fragment",
    "on",
    "true",
    "false",
    "null",
];

// Walks the text once, counting selection-set field names. A "block" is the
// text from an opening brace to the next closing brace; repeats are counted
// per block. Nested opens before that close extend the same block.
fn scan_tokens(raw_text: &str) -> TokenScan {
    let bytes = raw_text.as_bytes();
    let mut i = 0;

    let mut field_count = 0u32;
    let mut fragment_count = 0u32;
    let mut max_field_repeats = 0u32;

    let mut paren_depth = 0u32;
    let mut block: Option<HashMap<&str, u32>> = None;
    let mut totals: HashMap<&str, u32> = HashMap::new();
    // Set after `on`, `fragment`, operation keywords and `...`: the next
    // identifier names a type, fragment or operation, not a field.
    let mut skip_next_identifier = false;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            b'(' => {
                paren_depth += 1;
                skip_next_identifier = false;
            }
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b'{' => {
                skip_next_identifier = false;
                if block.is_none() {
                    block = Some(HashMap::new());
                }
            }
            b'}' => {
                skip_next_identifier = false;
                if let Some(counts) = block.take() {
                    let repeats = counts.values().copied().max().unwrap_or(0);
                    max_field_repeats = max_field_repeats.max(repeats);
                }
            }
            b'.' if raw_text[i..].starts_with("...") => {
                fragment_count += 1;
                skip_next_identifier = true;
                i += 3;
                // `... on Type` is an inline fragment; `on` itself re-arms the skip
                continue;
            }
            b'$' | b'@' => {
                i += 1;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                continue;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                let name = &raw_text[start..i];

                if KEYWORDS.contains(&name) {
                    skip_next_identifier = matches!(
                        name,
                        "on" | "fragment" | "query" | "mutation" | "subscription"
                    );
                    continue;
                }

                if std::mem::take(&mut skip_next_identifier) || paren_depth > 0 {
                    continue;
                }

                if next_non_space(bytes, i) == Some(b':') {
                    // alias name; the aliased field follows
                    continue;
                }

                field_count += 1;
                *totals.entry(name).or_insert(0) += 1;
                if let Some(counts) = block.as_mut() {
                    *counts.entry(name).or_insert(0) += 1;
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    TokenScan {
        field_count,
        fragment_count,
        max_field_repeats,
        max_total_field_repeats: totals.values().copied().max().unwrap_or(0),
    }
}

fn estimate_complexity(raw_text: &str, scan: &TokenScan, max_nesting: u32) -> u32 {
    let patterns = patterns();

    let pagination: u64 = patterns
        .connection_argument
        .captures_iter(raw_text)
        .filter_map(|caps| caps.get(1))
        .map(|size| size.as_str().parse::<u64>().unwrap_or(u64::MAX).div_ceil(10))
        .fold(0u64, |total, cost| total.saturating_add(cost));

    let where_clauses = patterns.where_argument.find_iter(raw_text).count() as u64;

    let total = 1u64
        .saturating_add(u64::from(scan.field_count))
        .saturating_add(pagination)
        .saturating_add(where_clauses)
        .saturating_add(2 * u64::from(scan.fragment_count))
        .saturating_add(2 * u64::from(max_nesting));

    u32::try_from(total).unwrap_or(u32::MAX)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn next_non_space(bytes: &[u8], from: usize) -> Option<u8> {
    bytes[from..]
        .iter()
        .copied()
        .find(|c| !c.is_ascii_whitespace() && *c != b',')
}
