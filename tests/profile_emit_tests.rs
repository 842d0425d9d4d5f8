use std::fs;

use legaltext_normalizer::{
    emit_files, normalize, sha256_hex, validate_profile, NormalizationMode, ProfileError,
};

fn write_profile(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let p = dir.join("norm.yaml");
    fs::write(&p, contents).unwrap();
    p
}

#[test]
fn valid_profile_resolves_glob_outdir_and_options() {
    let td = tempfile::tempdir().unwrap();
    let p = write_profile(
        td.path(),
        r#"id: pge-ms-normalizer
mode: aggressive
datasources:
  - name: peticoes
    path: "./input/**/*.txt"
outputs:
  dir: "./output"
options:
  max_consecutive_newlines: 3
"#,
    );
    let profile = validate_profile(&p).expect("profile should validate");
    assert_eq!(profile.input_glob(), "./input/**/*.txt");
    assert_eq!(profile.output_dir(), "./output");

    let opts = profile.normalization_options();
    assert_eq!(opts.mode, NormalizationMode::Aggressive);
    assert!(opts.deduplicate_blocks);
    assert_eq!(opts.max_consecutive_newlines, 3);
}

#[test]
fn profile_without_mode_defaults_to_balanced() {
    let td = tempfile::tempdir().unwrap();
    let p = write_profile(
        td.path(),
        "id: portal\ndatasources:\n  - path: \"./in/**/*.txt\"\noutputs:\n  dir: \"./out\"\n",
    );
    let profile = validate_profile(&p).expect("profile should validate");
    assert_eq!(
        profile.normalization_options().mode,
        NormalizationMode::Balanced
    );
}

#[test]
fn profile_missing_id_is_invalid() {
    let td = tempfile::tempdir().unwrap();
    let p = write_profile(
        td.path(),
        "id: \"\"\ndatasources:\n  - path: \"./in/**/*.txt\"\noutputs:\n  dir: \"./out\"\n",
    );
    match validate_profile(&p) {
        Err(ProfileError::Invalid(msg)) => assert!(msg.contains("id")),
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn profile_missing_glob_or_outdir_is_invalid() {
    let td = tempfile::tempdir().unwrap();
    let p = write_profile(td.path(), "id: portal\n");
    match validate_profile(&p) {
        Err(ProfileError::Invalid(_)) => {}
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn profile_parse_error_is_reported() {
    let td = tempfile::tempdir().unwrap();
    let p = write_profile(td.path(), "id: [unclosed\n");
    match validate_profile(&p) {
        Err(ProfileError::Parse(_)) => {}
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[test]
fn emit_writes_text_and_meta() {
    let result = normalize("Texto.\n42\nMais texto do documento.", None);

    let td = tempfile::tempdir().unwrap();
    let outdir = td.path().join("out");
    let meta = serde_json::json!({
        "doc_id": "processo-0801234",
        "mode": "balanced",
        "stats": result.stats,
        "estimated_tokens": result.estimated_tokens,
    });
    let paths = emit_files(
        &result.text,
        &meta,
        outdir.to_str().unwrap(),
        "processo-0801234",
    )
    .expect("emit ok");

    let text = fs::read_to_string(&paths.text_path).unwrap();
    assert_eq!(text, result.text);
    let meta_raw = fs::read_to_string(&paths.meta_path).unwrap();
    assert!(meta_raw.contains("\"doc_id\""));
    assert!(meta_raw.contains("\"page_numbers_removed\""));
    assert!(paths.text_path.ends_with("processo-0801234.txt"));
    assert!(paths.meta_path.ends_with("processo-0801234.meta.json"));

    // No temp files left behind
    let leftovers: Vec<_> = fs::read_dir(&outdir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn sha256_hex_matches_known_vector() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    // Fingerprints are stable across runs for identical meta
    let meta = serde_json::json!({"doc_id":"x","estimated_tokens":10});
    let a = sha256_hex(&serde_json::to_vec(&meta).unwrap());
    let b = sha256_hex(&serde_json::to_vec(&meta).unwrap());
    assert_eq!(a, b);
}
