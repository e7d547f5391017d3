use std::path::Path;

use anyhow::Context as _;

use toon_metrics::codec::{Codec, RoundTrip, round_trip};
use toon_metrics::fs;
use toon_metrics::report::{format_count, format_num};
use toon_metrics::savings;

use crate::Settings;

pub fn cmd_encode(file: &Path, codec: &impl Codec) -> anyhow::Result<i32> {
    let doc = crate::read_json(file)?;
    let text = codec
        .encode(&doc)
        .with_context(|| format!("encoding {}", file.display()))?;
    println!("{text}");
    Ok(0)
}

pub fn cmd_decode(file: &Path, codec: &impl Codec) -> anyhow::Result<i32> {
    let text = fs::read_text(file)?
        .ok_or_else(|| anyhow::anyhow!("file not found: {}", file.display()))?;
    let doc = codec
        .decode(&text)
        .with_context(|| format!("decoding {}", file.display()))?;
    crate::output::print_json(&doc);
    Ok(0)
}

pub fn cmd_roundtrip(file: &Path, codec: &impl Codec) -> anyhow::Result<i32> {
    let doc = crate::read_json(file)?;
    match round_trip(codec, &doc).with_context(|| format!("round trip of {}", file.display()))? {
        RoundTrip::Lossless => {
            println!("round trip lossless: {}", file.display());
            Ok(0)
        }
        RoundTrip::Mismatch { decoded } => {
            eprintln!("[toon-metrics] round trip mismatch for {}", file.display());
            eprintln!("[toon-metrics] decoded document:");
            let pretty = serde_json::to_string_pretty(&decoded)?;
            eprintln!("{pretty}");
            Ok(1)
        }
    }
}

pub fn cmd_stats(file: &Path, settings: &Settings, codec: &impl Codec) -> anyhow::Result<i32> {
    let doc = crate::read_json(file)?;
    let stats = savings::compute(codec, &doc)?;

    if settings.json {
        crate::output::print_json(&stats);
        return Ok(0);
    }

    println!("toon-metrics stats");
    println!(
        "  verbose: {} bytes, {} tokens est.",
        format_count(stats.verbose_size),
        format_count(stats.verbose_tokens)
    );
    println!(
        "  compact: {} bytes, {} tokens est.",
        format_count(stats.compact_size),
        format_count(stats.compact_tokens)
    );
    println!(
        "  saved:   {} tokens est. ({})",
        format_num(stats.saved_tokens),
        stats.saved_percent
    );
    Ok(0)
}
