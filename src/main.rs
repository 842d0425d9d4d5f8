use std::collections::HashSet;
use std::path::Path;

use legaltext_normalizer::{
    emit_files, enumerate_texts, mode_catalog, normalize, preview, sha256_hex, validate_profile,
    NormalizationMode, NormalizationOptions,
};

fn main() {
    // Simple CLI flags parsing
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--list-modes") {
        match serde_json::to_string_pretty(&mode_catalog()) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!(
                "{}",
                serde_json::json!({"tool":"list_modes","error": e.to_string()})
            ),
        }
        return;
    }

    let preview_only = args.iter().any(|a| a == "--preview");

    let mut mode_flag: Option<NormalizationMode> = None;
    if let Some(pos) = args.iter().position(|a| a == "--mode") {
        if let Some(val) = args.get(pos + 1) {
            if !val.starts_with("--") {
                match val.parse::<NormalizationMode>() {
                    Ok(m) => mode_flag = Some(m),
                    Err(e) => {
                        eprintln!(
                            "{}",
                            serde_json::json!({
                                "tool":"parse_args",
                                "flag":"--mode",
                                "error": e,
                                "error_code": 2
                            })
                        );
                        std::process::exit(2);
                    }
                }
            }
        }
    }

    // Dedup flag supports: --dedup, --dedup=on, --dedup=off
    let mut dedup_forced: Option<bool> = None;
    if let Some(pos) = args.iter().position(|a| a.starts_with("--dedup")) {
        let val = &args[pos];
        if val == "--dedup" || val == "--dedup=on" {
            dedup_forced = Some(true);
        } else if val == "--dedup=off" {
            dedup_forced = Some(false);
        }
    }

    let mut max_newlines: Option<usize> = None;
    if let Some(pos) = args.iter().position(|a| a == "--max-newlines") {
        if let Some(val) = args.get(pos + 1) {
            if let Ok(n) = val.parse::<usize>() {
                max_newlines = Some(n.clamp(1, 5));
            }
        }
    }

    let mut profile_path = String::from("norm.yaml");
    if let Some(pos) = args.iter().position(|a| a == "--profile") {
        if let Some(val) = args.get(pos + 1) {
            if !val.starts_with("--") {
                profile_path = val.clone();
            }
        }
    }

    // Track used slugs for uniqueness
    let mut used_doc_ids: HashSet<String> = HashSet::new();

    fn slugify(base: &str) -> String {
        let mut slug = String::with_capacity(base.len());
        let mut prev_dash = true; // swallow leading separators
        for ch in base.to_lowercase().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch);
                prev_dash = false;
            } else if !prev_dash {
                slug.push('-');
                prev_dash = true;
            }
        }
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            "doc".to_string()
        } else {
            slug.to_string()
        }
    }

    fn unique_slug(slug_in: String, used: &mut HashSet<String>) -> String {
        if !used.contains(&slug_in) {
            used.insert(slug_in.clone());
            return slug_in;
        }
        let mut i = 1;
        loop {
            let candidate = format!("{}-{}", slug_in, i);
            if !used.contains(&candidate) {
                used.insert(candidate.clone());
                return candidate;
            }
            i += 1;
        }
    }

    // 1) Read and validate the profile
    let profile = match validate_profile(Path::new(&profile_path)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::json!({
                    "tool": "validate_profile",
                    "file": profile_path,
                    "error": e.to_string(),
                    "error_code": 3
                })
            );
            std::process::exit(3);
        }
    };

    let mut opts = profile.normalization_options();
    if let Some(mode) = mode_flag {
        opts = NormalizationOptions::preset(mode);
    }
    if let Some(dedup) = dedup_forced {
        opts.deduplicate_blocks = dedup;
    }
    if let Some(max) = max_newlines {
        opts.max_consecutive_newlines = max;
    }

    eprintln!(
        "{}",
        serde_json::json!({
            "tool":"validate_profile",
            "file": profile_path,
            "status":"ok",
            "mode": opts.mode,
            "input_glob": profile.input_glob(),
            "output_dir": profile.output_dir()
        })
    );

    // 2) Enumerate input texts on the configured glob
    match enumerate_texts(&profile.input_glob()) {
        Ok(files) => {
            eprintln!(
                "{}",
                serde_json::json!({
                    "tool":"enumerate_texts",
                    "count": files.len(),
                })
            );

            for file in files {
                let started_ms = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as i128)
                    .unwrap_or(0);
                let stem = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("doc")
                    .to_string();
                let doc_id = unique_slug(slugify(&stem), &mut used_doc_ids);

                // 3) Read raw text; OCR output is not always valid UTF-8
                let bytes = match std::fs::read(&file) {
                    Ok(b) => b,
                    Err(e) => {
                        eprintln!(
                            "{}",
                            serde_json::json!({
                                "tool":"read_text",
                                "file": file,
                                "error": e.to_string(),
                                "error_code": 4
                            })
                        );
                        std::process::exit(4);
                    }
                };
                let raw = String::from_utf8_lossy(&bytes);

                // 4) Normalize
                let result = normalize(&raw, Some(&opts));
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "tool":"normalize",
                        "file": file,
                        "doc_id": doc_id,
                        "original_length": result.stats.original_length,
                        "normalized_length": result.stats.normalized_length,
                        "reduction_percent": result.stats.reduction_percent(),
                        "estimated_tokens": result.estimated_tokens
                    })
                );

                if preview_only {
                    match serde_json::to_string_pretty(&preview(&result)) {
                        Ok(s) => println!("{}", s),
                        Err(e) => eprintln!(
                            "{}",
                            serde_json::json!({"tool":"preview","error": e.to_string()})
                        ),
                    }
                    continue;
                }

                // 5) Emit files (atomic) with fingerprinted meta
                let finished_ms = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as i128)
                    .unwrap_or(0);
                let meta = serde_json::json!({
                    "doc_id": doc_id,
                    "mode": opts.mode,
                    "stats": result.stats,
                    "compression_ratio": result.stats.compression_ratio(),
                    "reduction_percent": result.stats.reduction_percent(),
                    "estimated_tokens": result.estimated_tokens,
                    "timestamps": {"started_ms": started_ms, "finished_ms": finished_ms},
                });
                // Fingerprint over normalized meta without timestamps
                let mut meta_norm = meta.clone();
                if let Some(obj) = meta_norm.as_object_mut() {
                    obj.remove("timestamps");
                }
                let meta_norm_bytes = serde_json::to_vec(&meta_norm).unwrap_or_default();
                let fingerprint = sha256_hex(&meta_norm_bytes);
                let mut meta_full = meta.as_object().cloned().unwrap_or_default();
                meta_full.insert(
                    "meta_fingerprint".to_string(),
                    serde_json::json!(fingerprint),
                );
                let meta = serde_json::Value::Object(meta_full);

                match emit_files(&result.text, &meta, profile.output_dir().as_str(), &doc_id) {
                    Ok(paths) => {
                        eprintln!(
                            "{}",
                            serde_json::json!({
                                "tool":"emit_files",
                                "file": file,
                                "text_path": paths.text_path,
                                "meta_path": paths.meta_path
                            })
                        );
                    }
                    Err(e) => {
                        eprintln!(
                            "{}",
                            serde_json::json!({
                                "tool":"emit_files",
                                "file": file,
                                "error": e.to_string(),
                                "error_code": 6
                            })
                        );
                        std::process::exit(6);
                    }
                }
            }
        }
        Err(err) => {
            let guidance = match err {
                legaltext_normalizer::EnumerateError::NoFilesFound { guidance } => guidance,
            };
            eprintln!(
                "{}",
                serde_json::json!({
                    "tool":"enumerate_texts",
                    "error":"NoFilesFound",
                    "error_code":1
                })
            );
            eprintln!("{}", guidance);
            std::process::exit(1);
        }
    }
}
