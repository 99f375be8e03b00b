//! # chatgpt-export
//!
//! A CLI tool that converts a ChatGPT data export into local Markdown files.
//!
//! ## What it does
//!
//! A ChatGPT export archive contains `conversations.json`: a single JSON array
//! holding every chat, each with its message tree stored as a flat id → node
//! mapping. This tool walks each tree in conversational order and writes one
//! Markdown file per chat, with YAML frontmatter (title, creation time,
//! optional tags) so the output drops straight into Obsidian or any other
//! note-taking app.
//!
//! Filenames are `YYYY-MM-DD_HHMMSS_<title-slug>.md`; name collisions get a
//! numeric suffix, and existing files are never overwritten.
//!
//! ## Usage
//!
//! ```sh
//! # Reads ./conversations.json, writes to ./chatgpt-export
//! chatgpt-export
//!
//! # Explicit paths and Obsidian tags
//! chatgpt-export ~/notes/chatgpt --input ~/Downloads/conversations.json --tags chatgpt,llm
//! ```
//!
//! Preferences can be persisted in `~/.config/chatgpt-export/config.toml`.
//!
//! ## Compatibility
//!
//! Tracks the (undocumented) schema of ChatGPT's "Export data" feature.
//! Unrecognized roles and content kinds are carried through best-effort
//! rather than dropped, so a schema drift degrades output instead of losing it.

pub mod exporter;
pub mod model;
pub mod renderer;
pub mod utils;
