use legaltext_normalizer::{
    mode_catalog, normalize, preview, NormalizationMode, NormalizationOptions, PREVIEW_CHARS,
};

#[test]
fn conservative_preset_only_cleans_characters() {
    let opts = NormalizationOptions::preset(NormalizationMode::Conservative);
    assert!(opts.remove_control_chars);
    assert!(opts.remove_invisible_unicode);
    assert!(opts.normalize_unicode);
    assert!(opts.collapse_whitespace);
    assert!(opts.fix_hyphenation);
    assert!(!opts.remove_page_numbers);
    assert!(!opts.detect_headers_footers);
    assert!(!opts.smart_line_join);
    assert!(!opts.collapse_paragraphs);
    assert!(!opts.deduplicate_blocks);
    assert_eq!(opts.max_consecutive_newlines, 3);
}

#[test]
fn balanced_preset_is_the_default() {
    let opts = NormalizationOptions::default();
    assert_eq!(opts, NormalizationOptions::preset(NormalizationMode::Balanced));
    assert!(opts.remove_page_numbers);
    assert!(opts.detect_headers_footers);
    assert!(opts.smart_line_join);
    assert!(opts.collapse_paragraphs);
    assert!(!opts.deduplicate_blocks);
    assert_eq!(opts.max_consecutive_newlines, 2);
}

#[test]
fn aggressive_preset_enables_dedup() {
    let opts = NormalizationOptions::preset(NormalizationMode::Aggressive);
    assert!(opts.deduplicate_blocks);
    assert_eq!(opts.max_consecutive_newlines, 2);
}

#[test]
fn non_balanced_mode_is_authoritative_over_explicit_fields() {
    // Long-standing contract: setting a non-balanced mode regenerates the
    // whole bundle, discarding sibling fields the caller set.
    let mut opts = NormalizationOptions::preset(NormalizationMode::Aggressive);
    opts.deduplicate_blocks = false;
    opts.max_consecutive_newlines = 5;
    let resolved = opts.resolve();
    assert!(resolved.deduplicate_blocks);
    assert_eq!(resolved.max_consecutive_newlines, 2);

    let mut opts = NormalizationOptions::preset(NormalizationMode::Conservative);
    opts.smart_line_join = true;
    let resolved = opts.resolve();
    assert!(!resolved.smart_line_join);
}

#[test]
fn balanced_mode_honors_explicit_overrides() {
    let mut opts = NormalizationOptions::default();
    opts.deduplicate_blocks = true;
    opts.max_consecutive_newlines = 4;
    let resolved = opts.resolve();
    assert!(resolved.deduplicate_blocks);
    assert_eq!(resolved.max_consecutive_newlines, 4);
}

#[test]
fn newline_cap_is_clamped_to_valid_range() {
    let mut opts = NormalizationOptions::default();
    opts.max_consecutive_newlines = 9;
    assert_eq!(opts.resolve().max_consecutive_newlines, 5);
    opts.max_consecutive_newlines = 0;
    assert_eq!(opts.resolve().max_consecutive_newlines, 1);
}

#[test]
fn mode_parses_from_str() {
    assert_eq!(
        "aggressive".parse::<NormalizationMode>().unwrap(),
        NormalizationMode::Aggressive
    );
    assert_eq!(
        "Balanced".parse::<NormalizationMode>().unwrap(),
        NormalizationMode::Balanced
    );
    assert!("banana".parse::<NormalizationMode>().is_err());
}

#[test]
fn options_deserialize_with_defaults() {
    let opts: NormalizationOptions = serde_json::from_str("{}").expect("empty object");
    assert_eq!(opts, NormalizationOptions::default());

    let opts: NormalizationOptions =
        serde_json::from_str(r#"{"mode":"conservative"}"#).expect("mode only");
    assert_eq!(opts.mode, NormalizationMode::Conservative);
}

#[test]
fn catalog_lists_the_three_modes() {
    let catalog = mode_catalog();
    assert_eq!(catalog.len(), 3);
    let modes: Vec<NormalizationMode> = catalog.iter().map(|m| m.mode).collect();
    assert!(modes.contains(&NormalizationMode::Conservative));
    assert!(modes.contains(&NormalizationMode::Balanced));
    assert!(modes.contains(&NormalizationMode::Aggressive));
    for info in &catalog {
        assert!(!info.label.is_empty());
        assert!(!info.description.is_empty());
        assert!(!info.features.is_empty());
    }
}

#[test]
fn preview_truncates_long_output_only() {
    let opts = NormalizationOptions::preset(NormalizationMode::Conservative);

    let short = normalize("Texto curto.", Some(&opts));
    let p = preview(&short);
    assert_eq!(p.head, short.text);
    assert_eq!(p.tail, "");
    assert!(!p.truncated);

    let long_input = "palavra ".repeat(300);
    let long = normalize(&long_input, Some(&opts));
    let p = preview(&long);
    assert!(p.truncated);
    assert_eq!(p.head.chars().count(), PREVIEW_CHARS);
    assert_eq!(p.tail.chars().count(), PREVIEW_CHARS);
    assert!(long.text.starts_with(&p.head));
    assert!(long.text.ends_with(&p.tail));
    assert_eq!(p.estimated_tokens, long.estimated_tokens);
}
