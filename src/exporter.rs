use crate::model::{self, Conversation};
use crate::renderer;
use crate::utils;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone)]
pub struct ExportConfig {
    pub input_path: std::path::PathBuf,
    pub target_dir: std::path::PathBuf,
    pub tags: Option<Vec<String>>,
    pub verbose: bool,
    pub quiet: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportResult {
    /// Markdown files written.
    pub written: usize,
    /// Conversations with zero renderable messages (no file emitted).
    pub skipped: usize,
    /// Conversations that could not be exported (malformed record or failed
    /// write); warned about, never fatal.
    pub errors: usize,
}

/// Filename stem for a conversation: sortable timestamp prefix plus a slug of
/// the title. Slug output is ASCII, so the byte cut is also a char cut.
fn filename_stem(convo: &Conversation) -> String {
    let raw_slug = slug::slugify(convo.display_title());
    let slug = raw_slug[..raw_slug.len().min(100)]
        .trim_end_matches('-')
        .to_string();
    let ts = utils::timestamp_stem(utils::datetime_from_epoch(convo.create_time));
    if slug.is_empty() {
        format!("{}_untitled", ts)
    } else {
        format!("{}_{}", ts, slug)
    }
}

/// Pick a free filename for `stem`, appending `-1`, `-2`, … when the name is
/// already taken this run or already present on disk. Never overwrites.
fn allocate_filename(target_dir: &Path, stem: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}.md", stem);
    let mut n = 0usize;
    while used.contains(&candidate) || target_dir.join(&candidate).exists() {
        n += 1;
        candidate = format!("{}-{}.md", stem, n);
    }
    used.insert(candidate.clone());
    candidate
}

fn export_conversation(
    convo: &Conversation,
    config: &ExportConfig,
    used: &mut HashSet<String>,
    pb: &ProgressBar,
) -> Result<bool> {
    let blocks = renderer::message_blocks(convo);
    if blocks.is_empty() {
        if config.verbose {
            pb.println(format!("Skipped (empty): {}", convo.display_title()));
        }
        return Ok(false);
    }

    let filename = allocate_filename(&config.target_dir, &filename_stem(convo), used);
    let path = config.target_dir.join(&filename);

    let md_file =
        File::create(&path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(md_file);
    renderer::render_conversation(&mut writer, convo, &blocks, config.tags.as_deref())
        .wrap_err_with(|| format!("Failed to write: {}", path.display()))?;
    writer.flush().wrap_err("Failed to flush markdown file")?;

    if config.verbose {
        pb.println(format!("Wrote:   {}", filename));
    }
    Ok(true)
}

/// The main entry point for the export logic.
///
/// The whole input document is parsed before anything is written, so a parse
/// failure aborts with no partial output. Per-conversation problems are
/// counted and warned about; only an unreadable input or an uncreatable
/// target directory is fatal.
pub fn execute(config: &ExportConfig) -> Result<ExportResult> {
    let raw = fs::read_to_string(&config.input_path)
        .wrap_err_with(|| format!("Failed to read input: {}", config.input_path.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Invalid JSON in: {}", config.input_path.display()))?;
    let records = model::conversations_from(doc)
        .wrap_err_with(|| format!("Unexpected shape in: {}", config.input_path.display()))?;

    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;

    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(records.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .unwrap()
            .progress_chars("=>-"),
        );
        bar.println(format!("Found {} conversations.", records.len()));
        bar
    };

    let mut used: HashSet<String> = HashSet::new();
    let mut result = ExportResult::default();

    for record in records {
        match record {
            Ok(convo) => match export_conversation(&convo, config, &mut used, &pb) {
                Ok(true) => result.written += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    result.errors += 1;
                    pb.println(format!("Error [{}]: {:#}", convo.display_title(), e));
                }
            },
            Err(e) => {
                result.errors += 1;
                pb.println(format!("Warning: {:#}", e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    if !config.quiet {
        let mut summary = format!(
            "Done. {} written, {} skipped.",
            result.written, result.skipped
        );
        if result.errors > 0 {
            summary.push_str(&format!(" Completed with {} error(s).", result.errors));
        }
        eprintln!("{}", summary);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convo(value: serde_json::Value) -> Conversation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn stem_strips_illegal_characters() {
        let c = convo(json!({
            "title": "a/b\\c:d*e?f\"g<h>i|j",
            "create_time": 1700000000,
            "mapping": {}
        }));
        let stem = filename_stem(&c);
        assert!(!stem.is_empty());
        for ch in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
            assert!(!stem.contains(ch), "stem {:?} contains {:?}", stem, ch);
        }
        assert!(stem.starts_with("2023-11-14_221320_"));
    }

    #[test]
    fn stem_falls_back_for_unsluggable_titles() {
        let c = convo(json!({"title": "???", "mapping": {}}));
        assert_eq!(filename_stem(&c), "1970-01-01_000000_untitled");
    }

    #[test]
    fn long_titles_are_truncated() {
        let c = convo(json!({"title": "x".repeat(300), "mapping": {}}));
        let stem = filename_stem(&c);
        // timestamp prefix + '_' + at most 100 slug chars
        assert!(stem.len() <= "1970-01-01_000000_".len() + 100);
    }

    #[test]
    fn collisions_get_numeric_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let mut used = HashSet::new();
        assert_eq!(allocate_filename(dir.path(), "note", &mut used), "note.md");
        assert_eq!(allocate_filename(dir.path(), "note", &mut used), "note-1.md");
        assert_eq!(allocate_filename(dir.path(), "note", &mut used), "note-2.md");
    }

    #[test]
    fn preexisting_files_on_disk_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("note.md"), "keep me").unwrap();
        let mut used = HashSet::new();
        assert_eq!(allocate_filename(dir.path(), "note", &mut used), "note-1.md");
    }
}
