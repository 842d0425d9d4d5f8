use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use globwalk::GlobWalkerBuilder;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Tunable thresholds for the structure heuristics. These are approximate
// classifiers, not guarantees; adjust here rather than inside the stages.
pub const MIN_REPEAT_OCCURRENCES: usize = 3;
pub const REPEATED_LINE_MIN_LEN: usize = 5;
pub const REPEATED_LINE_MAX_LEN: usize = 100;
pub const MIN_DEDUP_BLOCK_LEN: usize = 50;
pub const DEDUP_SIMILARITY_THRESHOLD: f64 = 0.95;
pub const DEDUP_SAMPLE_LEN: usize = 100;
pub const SECTION_TITLE_MAX_LEN: usize = 80;
pub const CHARS_PER_TOKEN: usize = 4;
pub const PREVIEW_CHARS: usize = 500;

// C0 controls except \t and \n; \r is folded into \n before this runs.
static RE_CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\\x00-\\x08\\x0B\\x0C\\x0E-\\x1F\\x7F]").unwrap());
static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}\u{00AD}]").unwrap());
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static RE_TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());
// A full trimmed line that is only a number with optional page-marker punctuation.
static RE_PAGE_NUMBER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-–—.·*(\[]{0,3}\s*\d{1,4}\s*[-–—.·*)\]]{0,3}$").unwrap());
static RE_BROKEN_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\p{L}\p{N}])-[ \t]*\n[ \t]*(\p{Ll})").unwrap());
static RE_NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(\.\d{1,3})*\.?|[IVXLCDM]{1,7}\.)\s+\S").unwrap());
static RE_BLANK_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

// Typographic characters mapped to plain ASCII.
pub const UNICODE_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{2002}', " "),
    ('\u{2003}', " "),
    ('\u{2009}', " "),
    ('\u{202F}', " "),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl NormalizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMode::Conservative => "conservative",
            NormalizationMode::Balanced => "balanced",
            NormalizationMode::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for NormalizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(NormalizationMode::Conservative),
            "balanced" => Ok(NormalizationMode::Balanced),
            "aggressive" => Ok(NormalizationMode::Aggressive),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationOptions {
    pub mode: NormalizationMode,
    pub remove_control_chars: bool,
    pub remove_invisible_unicode: bool,
    pub normalize_unicode: bool,
    pub collapse_whitespace: bool,
    pub remove_page_numbers: bool,
    pub detect_headers_footers: bool,
    pub fix_hyphenation: bool,
    pub smart_line_join: bool,
    pub collapse_paragraphs: bool,
    pub deduplicate_blocks: bool,
    pub max_consecutive_newlines: usize,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self::preset(NormalizationMode::Balanced)
    }
}

impl NormalizationOptions {
    /// Canonical toggle bundle for a mode. Pure; never mutates shared state.
    pub fn preset(mode: NormalizationMode) -> Self {
        let base = Self {
            mode,
            remove_control_chars: true,
            remove_invisible_unicode: true,
            normalize_unicode: true,
            collapse_whitespace: true,
            fix_hyphenation: true,
            remove_page_numbers: false,
            detect_headers_footers: false,
            smart_line_join: false,
            collapse_paragraphs: false,
            deduplicate_blocks: false,
            max_consecutive_newlines: 3,
        };
        match mode {
            NormalizationMode::Conservative => base,
            NormalizationMode::Balanced => Self {
                remove_page_numbers: true,
                detect_headers_footers: true,
                smart_line_join: true,
                collapse_paragraphs: true,
                max_consecutive_newlines: 2,
                ..base
            },
            NormalizationMode::Aggressive => Self {
                remove_page_numbers: true,
                detect_headers_footers: true,
                smart_line_join: true,
                collapse_paragraphs: true,
                deduplicate_blocks: true,
                max_consecutive_newlines: 2,
                ..base
            },
        }
    }

    /// Resolve the options the engine will actually run with.
    ///
    /// A non-balanced `mode` is authoritative: the whole bundle is regenerated
    /// from its preset and any sibling fields set by the caller are discarded.
    /// Callers that want individual toggles must stay on the balanced mode.
    /// `max_consecutive_newlines` is clamped to [1,5] either way.
    pub fn resolve(&self) -> Self {
        let mut resolved = if self.mode != NormalizationMode::Balanced {
            Self::preset(self.mode)
        } else {
            self.clone()
        };
        resolved.max_consecutive_newlines = resolved.max_consecutive_newlines.clamp(1, 5);
        resolved
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub original_length: usize,
    pub normalized_length: usize,
    pub original_lines: usize,
    pub normalized_lines: usize,
    pub chars_removed: usize,
    pub lines_joined: usize,
    pub hyphenations_fixed: usize,
    pub headers_removed: usize,
    pub footers_removed: usize,
    pub page_numbers_removed: usize,
    pub blocks_deduplicated: usize,
    pub paragraphs_collapsed: usize,
    pub processing_time_ms: f64,
}

impl NormalizationStats {
    pub fn compression_ratio(&self) -> f64 {
        if self.original_length == 0 {
            1.0
        } else {
            self.normalized_length as f64 / self.original_length as f64
        }
    }

    pub fn reduction_percent(&self) -> f64 {
        (1.0 - self.compression_ratio()) * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizationResult {
    pub text: String,
    pub stats: NormalizationStats,
    pub estimated_tokens: usize,
}

/// Rough token count for LLM budgeting: one token per 4 characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Substitute typographic characters with their ASCII equivalents.
pub fn normalize_unicode_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    'chars: for ch in text.chars() {
        for (from, to) in UNICODE_REPLACEMENTS {
            if ch == *from {
                out.push_str(to);
                continue 'chars;
            }
        }
        out.push(ch);
    }
    out
}

/// Trimmed lines occurring at least `min_occurrences` times.
/// Lines shorter than 5 or longer than 100 characters are ignored so that
/// numbering artifacts and full paragraphs are not flagged as boilerplate.
pub fn find_repeated_lines(lines: &[&str], min_occurrences: usize) -> HashSet<String> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for raw in lines {
        let line = raw.trim();
        let len = line.chars().count();
        if len < REPEATED_LINE_MIN_LEN || len > REPEATED_LINE_MAX_LEN {
            continue;
        }
        *freq.entry(line).or_insert(0) += 1;
    }
    freq.into_iter()
        .filter(|(_, count)| *count >= min_occurrences)
        .map(|(line, _)| line.to_string())
        .collect()
}

/// Classify repeated lines by block position: headers open a block, footers
/// close one. A line can land in both sets if it plays both roles.
pub fn detect_headers_footers(
    text: &str,
    min_occurrences: usize,
) -> (HashSet<String>, HashSet<String>) {
    let all_lines: Vec<&str> = text.lines().collect();
    let repeated = find_repeated_lines(&all_lines, min_occurrences);

    let mut headers = HashSet::new();
    let mut footers = HashSet::new();
    if repeated.is_empty() {
        return (headers, footers);
    }
    for block in RE_BLANK_GAP.split(text) {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        if let Some(first) = lines.first() {
            let t = first.trim();
            if repeated.contains(t) {
                headers.insert(t.to_string());
            }
        }
        if let Some(last) = lines.last() {
            let t = last.trim();
            if repeated.contains(t) {
                footers.insert(t.to_string());
            }
        }
    }
    (headers, footers)
}

/// Drop blocks judged near-duplicate of an earlier block. Blocks shorter than
/// `min_block_length` are always kept. Similarity is a deliberate shortcut:
/// length ratio plus identical first/last sample characters, not full content.
pub fn remove_duplicate_blocks(
    text: &str,
    min_block_length: usize,
    similarity_threshold: f64,
) -> (String, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0usize;
    for block in RE_BLANK_GAP.split(text) {
        if block.trim().is_empty() {
            continue;
        }
        let len = block.chars().count();
        if len >= min_block_length
            && kept
                .iter()
                .any(|prev| blocks_similar(prev, block, similarity_threshold))
        {
            removed += 1;
            continue;
        }
        kept.push(block);
    }
    (kept.join("\n\n"), removed)
}

fn blocks_similar(a: &str, b: &str, threshold: f64) -> bool {
    let la = a.chars().count();
    let lb = b.chars().count();
    if la == 0 || lb == 0 {
        return false;
    }
    let ratio = la.min(lb) as f64 / la.max(lb) as f64;
    if ratio < threshold {
        return false;
    }
    let n = DEDUP_SAMPLE_LEN.min(la).min(lb);
    a.chars().take(n).eq(b.chars().take(n)) && a.chars().rev().take(n).eq(b.chars().rev().take(n))
}

pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.matches('\n').count() + 1
    }
}

pub fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | ';' | ':')
}

pub fn starts_with_lowercase(text: &str) -> bool {
    text.chars().next().map(char::is_lowercase).unwrap_or(false)
}

/// Short line that reads like a structural heading: all caps, or a numbered
/// or roman-numeral prefix. Heuristic; false positives and negatives happen.
pub fn is_section_title(line: &str) -> bool {
    let t = line.trim();
    if t.is_empty() || t.chars().count() > SECTION_TITLE_MAX_LEN {
        return false;
    }
    let all_caps = t.chars().any(char::is_alphabetic) && !t.chars().any(char::is_lowercase);
    all_caps || RE_NUMBERED_HEADING.is_match(t)
}

// Wrapped-line merge rule, shared by the line-join and paragraph-collapse
// stages so a second pass cannot re-join what the first pass separated.
fn should_join(prev: &str, next: &str) -> bool {
    let p = prev.trim_end();
    if is_section_title(p) {
        return false;
    }
    match p.chars().last() {
        Some(c) if is_sentence_end(c) => false,
        Some(_) => starts_with_lowercase(next.trim_start()),
        None => false,
    }
}

type Stage = fn(String, &NormalizationOptions, &mut NormalizationStats) -> String;

/// Run the full cleaning pipeline over `text`.
///
/// Stages run in a fixed order because later ones assume earlier cleanups
/// (hyphenation repair expects collapsed whitespace, the paragraph collapse
/// expects line-joined blocks). Each stage is gated by its toggle; the final
/// newline cap and outer trim always run. Empty or whitespace-only input
/// short-circuits with only the original size recorded.
pub fn normalize(text: &str, options: Option<&NormalizationOptions>) -> NormalizationResult {
    let started = Instant::now();
    let opts = options
        .map(NormalizationOptions::resolve)
        .unwrap_or_default();

    let mut stats = NormalizationStats {
        original_length: text.chars().count(),
        original_lines: count_lines(text),
        ..NormalizationStats::default()
    };

    if text.trim().is_empty() {
        stats.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        return NormalizationResult {
            text: String::new(),
            stats,
            estimated_tokens: 0,
        };
    }

    let stages: [(bool, Stage); 10] = [
        (opts.remove_control_chars, strip_control_chars),
        (opts.remove_invisible_unicode, strip_invisible_unicode),
        (opts.normalize_unicode, apply_unicode_map),
        (opts.collapse_whitespace, collapse_whitespace_runs),
        (opts.remove_page_numbers, drop_page_number_lines),
        (opts.detect_headers_footers, drop_repeated_boilerplate),
        (opts.fix_hyphenation, rejoin_hyphenated_words),
        (opts.smart_line_join, join_wrapped_lines),
        (opts.collapse_paragraphs, collapse_paragraph_gaps),
        (opts.deduplicate_blocks, drop_duplicate_blocks),
    ];

    let mut current = text.to_string();
    for (enabled, stage) in stages {
        if enabled {
            current = stage(current, &opts, &mut stats);
        }
    }
    current = final_cleanup(current, &opts, &mut stats);

    stats.normalized_length = current.chars().count();
    stats.normalized_lines = count_lines(&current);
    stats.chars_removed = stats.original_length.saturating_sub(stats.normalized_length);
    stats.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    NormalizationResult {
        estimated_tokens: estimate_tokens(&current),
        text: current,
        stats,
    }
}

fn strip_control_chars(
    text: String,
    _opts: &NormalizationOptions,
    _stats: &mut NormalizationStats,
) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    RE_CONTROL_CHARS.replace_all(&unified, "").into_owned()
}

fn strip_invisible_unicode(
    text: String,
    _opts: &NormalizationOptions,
    _stats: &mut NormalizationStats,
) -> String {
    RE_INVISIBLE.replace_all(&text, "").into_owned()
}

fn apply_unicode_map(
    text: String,
    _opts: &NormalizationOptions,
    _stats: &mut NormalizationStats,
) -> String {
    normalize_unicode_chars(&text)
}

fn collapse_whitespace_runs(
    text: String,
    _opts: &NormalizationOptions,
    _stats: &mut NormalizationStats,
) -> String {
    let collapsed = RE_MULTI_SPACE.replace_all(&text, " ");
    RE_TRAILING_SPACE.replace_all(&collapsed, "").into_owned()
}

fn drop_page_number_lines(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0usize;
    for line in text.lines() {
        if RE_PAGE_NUMBER_LINE.is_match(line.trim()) {
            removed += 1;
            continue;
        }
        kept.push(line);
    }
    stats.page_numbers_removed += removed;
    kept.join("\n")
}

fn drop_repeated_boilerplate(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    let (headers, footers) = detect_headers_footers(&text, MIN_REPEAT_OCCURRENCES);
    if headers.is_empty() && footers.is_empty() {
        return text;
    }
    let mut out_blocks: Vec<String> = Vec::new();
    for block in RE_BLANK_GAP.split(&text) {
        let mut lines: Vec<&str> = block.lines().collect();
        if let Some(first) = lines.first() {
            if headers.contains(first.trim()) {
                lines.remove(0);
                stats.headers_removed += 1;
            }
        }
        if let Some(last) = lines.last() {
            if footers.contains(last.trim()) {
                lines.pop();
                stats.footers_removed += 1;
            }
        }
        if lines.iter().all(|l| l.trim().is_empty()) {
            continue;
        }
        out_blocks.push(lines.join("\n"));
    }
    out_blocks.join("\n\n")
}

fn rejoin_hyphenated_words(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    // Repeat until stable so chained wraps ("medica-\nmen-\nto") fully rejoin
    // in one call; each replacement removes a newline, so this terminates.
    let mut current = text;
    loop {
        let fixes = RE_BROKEN_HYPHEN.find_iter(&current).count();
        if fixes == 0 {
            return current;
        }
        stats.hyphenations_fixed += fixes;
        current = RE_BROKEN_HYPHEN
            .replace_all(&current, "${1}${2}")
            .into_owned();
    }
}

fn join_wrapped_lines(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    for block in RE_BLANK_GAP.split(&text) {
        if block.trim().is_empty() {
            continue;
        }
        let mut out_lines: Vec<String> = Vec::new();
        for raw in block.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let join = out_lines
                .last()
                .map(|prev| should_join(prev, line))
                .unwrap_or(false);
            if join {
                if let Some(prev) = out_lines.last_mut() {
                    prev.push(' ');
                    prev.push_str(line);
                    stats.lines_joined += 1;
                }
            } else {
                out_lines.push(line.to_string());
            }
        }
        paragraphs.push(out_lines.join("\n"));
    }
    paragraphs.join("\n\n")
}

fn collapse_paragraph_gaps(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    let blocks: Vec<&str> = RE_BLANK_GAP
        .split(&text)
        .filter(|b| !b.trim().is_empty())
        .collect();
    if blocks.len() <= 1 {
        return text;
    }
    let mut out = String::with_capacity(text.len());
    out.push_str(blocks[0]);
    for block in &blocks[1..] {
        let first_line = block.lines().next().unwrap_or("");
        if is_section_title(first_line) {
            out.push_str("\n\n");
        } else {
            stats.paragraphs_collapsed += 1;
            let prev_last = out.lines().last().unwrap_or("");
            if should_join(prev_last, first_line) {
                out.push(' ');
            } else {
                out.push('\n');
            }
        }
        out.push_str(block);
    }
    out
}

fn drop_duplicate_blocks(
    text: String,
    _opts: &NormalizationOptions,
    stats: &mut NormalizationStats,
) -> String {
    let (result, removed) =
        remove_duplicate_blocks(&text, MIN_DEDUP_BLOCK_LEN, DEDUP_SIMILARITY_THRESHOLD);
    stats.blocks_deduplicated += removed;
    result
}

// Always runs: blank-only lines become empty, newline runs are capped, and
// the whole text is trimmed.
fn final_cleanup(
    text: String,
    opts: &NormalizationOptions,
    _stats: &mut NormalizationStats,
) -> String {
    let blanked = text
        .lines()
        .map(|l| if l.trim().is_empty() { "" } else { l })
        .collect::<Vec<_>>()
        .join("\n");
    let cap = opts.max_consecutive_newlines.clamp(1, 5);
    let capped = RE_NEWLINE_RUNS.replace_all(&blanked, |caps: &Captures| {
        "\n".repeat(caps[0].len().min(cap))
    });
    capped.trim().to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizationPreview {
    pub head: String,
    pub tail: String,
    pub truncated: bool,
    pub stats: NormalizationStats,
    pub estimated_tokens: usize,
}

/// Size-bounded view of a result: first and last `PREVIEW_CHARS` characters.
/// Short texts come back whole in `head` with an empty `tail`.
pub fn preview(result: &NormalizationResult) -> NormalizationPreview {
    let total = result.text.chars().count();
    if total <= PREVIEW_CHARS * 2 {
        return NormalizationPreview {
            head: result.text.clone(),
            tail: String::new(),
            truncated: false,
            stats: result.stats.clone(),
            estimated_tokens: result.estimated_tokens,
        };
    }
    NormalizationPreview {
        head: result.text.chars().take(PREVIEW_CHARS).collect(),
        tail: result.text.chars().skip(total - PREVIEW_CHARS).collect(),
        truncated: true,
        stats: result.stats.clone(),
        estimated_tokens: result.estimated_tokens,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeInfo {
    pub mode: NormalizationMode,
    pub label: &'static str,
    pub description: &'static str,
    pub features: Vec<&'static str>,
}

/// Static metadata for the three modes, for mode-picker UIs.
pub fn mode_catalog() -> Vec<ModeInfo> {
    vec![
        ModeInfo {
            mode: NormalizationMode::Conservative,
            label: "Conservador",
            description: "Limpeza minima: remove caracteres de controle e normaliza \
                          a tipografia, preservando quebras de linha e paragrafos.",
            features: vec![
                "Remove caracteres de controle e invisiveis",
                "Normaliza aspas e travessoes tipograficos",
                "Corrige hifenizacao quebrada entre linhas",
                "Preserva a estrutura original do texto",
            ],
        },
        ModeInfo {
            mode: NormalizationMode::Balanced,
            label: "Balanceado",
            description: "Limpeza padrao para envio ao LLM: remove numeros de pagina \
                          e cabecalhos repetidos e reconstroi paragrafos corridos.",
            features: vec![
                "Tudo do modo conservador",
                "Remove numeros de pagina isolados",
                "Remove cabecalhos e rodapes repetidos",
                "Une linhas quebradas em paragrafos corridos",
                "Compacta espacos entre paragrafos, preservando titulos",
            ],
        },
        ModeInfo {
            mode: NormalizationMode::Aggressive,
            label: "Agressivo",
            description: "Reducao maxima de tokens: tudo do balanceado mais a remocao \
                          de blocos de texto quase duplicados.",
            features: vec![
                "Tudo do modo balanceado",
                "Remove blocos quase duplicados",
            ],
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRoot {
    pub id: String,
    #[serde(default)]
    pub mode: Option<NormalizationMode>,
    #[serde(default)]
    pub options: Option<ProfileOptions>,
    #[serde(default)]
    pub datasources: Option<Vec<ProfileDatasource>>,
    #[serde(default)]
    pub outputs: Option<ProfileOutputs>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOptions {
    #[serde(default)]
    pub deduplicate_blocks: Option<bool>,
    #[serde(default)]
    pub max_consecutive_newlines: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDatasource {
    pub name: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOutputs {
    pub dir: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile: {0}")]
    Read(String),
    #[error("Failed to parse profile: {0}")]
    Parse(String),
    #[error("Invalid profile: {0}")]
    Invalid(String),
}

/// Minimal validation for the batch profile (norm.yaml).
pub fn validate_profile(path: &Path) -> Result<ProfileRoot, ProfileError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ProfileError::Read(e.to_string()))?;
    let profile: ProfileRoot =
        serde_yaml::from_str(&raw).map_err(|e| ProfileError::Parse(e.to_string()))?;

    if profile.id.trim().is_empty() {
        return Err(ProfileError::Invalid("missing id".into()));
    }

    let has_ds_glob = profile
        .datasources
        .as_ref()
        .and_then(|ds| ds.first())
        .and_then(|d| d.path.clone())
        .is_some();
    let has_out_dir = profile
        .outputs
        .as_ref()
        .and_then(|o| o.dir.clone())
        .is_some();
    if !has_ds_glob || !has_out_dir {
        return Err(ProfileError::Invalid(
            "missing datasources.path or outputs.dir".into(),
        ));
    }

    Ok(profile)
}

impl ProfileRoot {
    pub fn input_glob(&self) -> String {
        self.datasources
            .as_ref()
            .and_then(|d| d.first())
            .and_then(|d| d.path.clone())
            .unwrap_or_else(|| "./input/**/*.txt".to_string())
    }

    pub fn output_dir(&self) -> String {
        self.outputs
            .as_ref()
            .and_then(|o| o.dir.clone())
            .unwrap_or_else(|| "./output".to_string())
    }

    /// Options implied by the profile: the mode preset plus the few overrides
    /// the profile schema exposes. The engine's resolve step still applies.
    pub fn normalization_options(&self) -> NormalizationOptions {
        let mut opts = NormalizationOptions::preset(self.mode.unwrap_or_default());
        if let Some(overrides) = &self.options {
            if let Some(dedup) = overrides.deduplicate_blocks {
                opts.deduplicate_blocks = dedup;
            }
            if let Some(max) = overrides.max_consecutive_newlines {
                opts.max_consecutive_newlines = max;
            }
        }
        opts
    }
}

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("NoFilesFound")]
    NoFilesFound { guidance: String },
}

/// Enumerate input text files using a glob pattern (e.g., "./input/**/*.txt").
/// Returns a sorted list of paths.
pub fn enumerate_texts(glob_pattern: &str) -> Result<Vec<PathBuf>, EnumerateError> {
    let (root, pat) = split_glob_base(glob_pattern);
    let walker = GlobWalkerBuilder::from_patterns(&root, &[pat.as_str()])
        .case_insensitive(false)
        .follow_links(false)
        .build()
        .map_err(|_| EnumerateError::NoFilesFound {
            guidance: folder_guidance(),
        })?;

    let mut paths: Vec<PathBuf> = walker
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().to_path_buf())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(EnumerateError::NoFilesFound {
            guidance: folder_guidance(),
        });
    }

    Ok(paths)
}

// Anchor the walk at the longest non-glob directory prefix so absolute
// patterns do not walk the filesystem root.
fn split_glob_base(pattern: &str) -> (String, String) {
    let trimmed = pattern.trim_start_matches("./");
    match trimmed.find(|c| matches!(c, '*' | '?' | '[' | '{')) {
        Some(idx) => {
            let cut = trimmed[..idx].rfind('/').map(|i| i + 1).unwrap_or(0);
            let (base, rest) = trimmed.split_at(cut);
            let base = base.trim_end_matches('/');
            let base = if base.is_empty() {
                if cut > 0 {
                    "/"
                } else {
                    "."
                }
            } else {
                base
            };
            (base.to_string(), rest.to_string())
        }
        None => (".".to_string(), trimmed.to_string()),
    }
}

fn folder_guidance() -> String {
    let guide = r#"Nenhum arquivo de texto no padrao ./input/**/*.txt
Estrutura sugerida:
  ./input/peticoes/...
  ./input/contestacoes/...
  ./input/pareceres/...
Exemplo: coloque os textos extraidos em ./input/peticoes/PROCESSO-ANO.txt"#;
    guide.to_string()
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("WriteFailed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitPaths {
    pub text_path: String,
    pub meta_path: String,
}

/// Atomically write normalized text and meta JSON into outdir with doc_id stem.
pub fn emit_files(
    text: &str,
    meta: &serde_json::Value,
    outdir: &str,
    doc_id: &str,
) -> Result<EmitPaths, EmitError> {
    std::fs::create_dir_all(outdir).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    let text_path = Path::new(outdir).join(format!("{}.txt", doc_id));
    let meta_path = Path::new(outdir).join(format!("{}.meta.json", doc_id));

    // Write temp files then rename
    let pid = std::process::id();
    let text_tmp = text_path.with_extension(format!("txt.tmp.{}", pid));
    let meta_tmp = meta_path.with_extension(format!("meta.json.tmp.{}", pid));

    std::fs::write(&text_tmp, text).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    let meta_bytes =
        serde_json::to_vec_pretty(meta).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    std::fs::write(&meta_tmp, meta_bytes).map_err(|e| EmitError::WriteFailed(e.to_string()))?;

    std::fs::rename(&text_tmp, &text_path).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    std::fs::rename(&meta_tmp, &meta_path).map_err(|e| EmitError::WriteFailed(e.to_string()))?;

    Ok(EmitPaths {
        text_path: text_path.to_string_lossy().to_string(),
        meta_path: meta_path.to_string_lossy().to_string(),
    })
}

// Utility to compute sha256 hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    out.iter().map(|b| format!("{:02x}", b)).collect()
}
