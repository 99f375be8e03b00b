use chatgpt_export::exporter::{self, ExportConfig};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Export ChatGPT conversation history (conversations.json) to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to export markdown files.
    /// Defaults to ./chatgpt-export if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    /// Path to the conversations.json from a ChatGPT data export.
    /// Defaults to ./conversations.json
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chatgpt-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Comma-separated tags to add to frontmatter (e.g. "chatgpt,llm").
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bars).
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    input_path: Option<PathBuf>,
    tags: Option<Vec<String>>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("chatgpt-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve target_dir (CLI > Config > Default)
    let target_dir = cli
        .target_dir
        .or(file_cfg.target_dir)
        .unwrap_or_else(|| PathBuf::from("chatgpt-export"));

    // 3. Resolve input_path (CLI > Config > Default)
    let input_path = cli
        .input
        .or(file_cfg.input_path)
        .unwrap_or_else(|| PathBuf::from("conversations.json"));

    if !input_path.exists() {
        return Err(eyre!(
            "Input not found at: {}\nPlace your ChatGPT export's conversations.json here, or use --input.",
            input_path.display()
        ));
    }

    // 4. Resolve tags (CLI > Config)
    let tags = cli.tags.or(file_cfg.tags);

    // 5. Build the Export Config
    let config = ExportConfig {
        input_path,
        target_dir,
        tags,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // 6. Run the Business Logic
    exporter::execute(&config)?;
    Ok(())
}
