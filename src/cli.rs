use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rtebridge::bridge::{Action, Editor, Payload, encode};
use rtebridge::config::{DEFAULT_CONFIG_FILE, EditorConfig};
use rtebridge::content;
use rtebridge::transport::RendererServer;
use tokio::sync::Notify;

/// rteb - host side of the rich text editor bridge
#[derive(Parser, Debug)]
#[command(name = "rteb")]
#[command(version)]
#[command(about = "Drive an embedded rich text editor and decode its content")]
#[command(long_about = "rteb talks to a browser-rendered rich text editor over a small script bridge.

It can encode editor commands, decode the editor's HTML into content blocks,
and serve a renderer over a Unix socket to export its content.

Quick start:
  1. Run 'rteb --init' to generate a config file
  2. Edit .rtebridge.toml to set placeholders, initial content and timeouts
  3. Run 'rteb export --socket /tmp/editor.sock' and connect a renderer")]
pub struct Cli {
    /// Path to config file (defaults to .rtebridge.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Initialize a new .rtebridge.toml config file
    #[arg(long)]
    pub init: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Decode editor HTML into content blocks (reads stdin when no file is given)
    Decode {
        /// HTML fragment file
        file: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the script instruction for an editor command
    Encode {
        /// Wire name of the command, e.g. bold or SET_CONTENT_HTML
        action: String,
        /// String payload
        #[arg(long, conflicts_with = "json")]
        text: Option<String>,
        /// JSON payload
        #[arg(long)]
        json: Option<String>,
    },
    /// List the editor command vocabulary
    Actions,
    /// Serve one renderer, initialize it and print its content as blocks
    Export {
        /// Unix socket the renderer connects to
        #[arg(long)]
        socket: PathBuf,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load_config(config_path: &str) -> anyhow::Result<EditorConfig> {
    if Path::new(config_path).exists() {
        EditorConfig::from_file(config_path)
    } else {
        tracing::debug!(path = config_path, "no config file, using defaults");
        Ok(EditorConfig::default())
    }
}

/// Write a default config file unless one already exists
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file '{}' already exists.", config_path);
        return Ok(());
    }

    let config = EditorConfig {
        title_placeholder: Some("Title".to_string()),
        content_placeholder: Some("Write something...".to_string()),
        ..EditorConfig::default()
    };
    config
        .save_to_file(config_path)
        .with_context(|| format!("Failed to write config to '{}'", config_path))?;

    println!("Created {}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit {} to set placeholders and initial content", config_path);
    println!("  2. Run 'rteb export --socket <path>' and connect a renderer");
    Ok(())
}

pub fn run_decode(file: Option<&Path>, cdn_prefix: &str, pretty: bool) -> anyhow::Result<String> {
    let html = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut html = String::new();
            std::io::stdin()
                .read_to_string(&mut html)
                .context("Failed to read stdin")?;
            html
        }
    };

    let document = content::decode_document(&html, cdn_prefix);
    tracing::info!(blocks = document.blocks.len(), "decoded content");
    Ok(if pretty {
        document.to_json_pretty()
    } else {
        document.to_json()
    })
}

pub fn run_encode(action: &str, text: Option<&str>, json: Option<&str>) -> anyhow::Result<String> {
    let action: Action = action.parse()?;
    let payload = match (text, json) {
        (Some(text), _) => Some(Payload::text(text)),
        (None, Some(json)) => {
            let value: serde_json::Value = serde_json::from_str(json)
                .with_context(|| format!("Invalid JSON payload: {}", json))?;
            Some(Payload::from(value))
        }
        (None, None) => None,
    };
    Ok(encode(action, payload.as_ref()).into_script())
}

pub fn list_actions() -> String {
    Action::ALL
        .iter()
        .map(|action| format!("{:?}\t{}", action, action.wire_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accept one renderer on `socket`, wait for it to initialize, then fetch and
/// decode its content
pub async fn run_export(socket: &Path, config: EditorConfig, pretty: bool) -> anyhow::Result<String> {
    let ready_timeout = config.query_timeout();
    let server = RendererServer::bind(socket)
        .with_context(|| format!("Failed to bind renderer socket at {:?}", socket))?;

    let editor = Editor::new(config);
    let ready = Arc::new(Notify::new());
    editor.set_ready_callback({
        let ready = Arc::clone(&ready);
        move || ready.notify_one()
    });

    let session = server
        .accept()
        .await
        .context("Failed to accept renderer connection")?;
    let session = session.spawn(editor.clone());

    editor.on_load();
    tokio::time::timeout(ready_timeout, ready.notified())
        .await
        .map_err(|_| anyhow!("Renderer did not initialize within {:?}", ready_timeout))?;

    let document = editor.get_html().await.context("Failed to export content")?;

    editor.detach();
    session.abort();

    Ok(if pretty {
        document.to_json_pretty()
    } else {
        document.to_json()
    })
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
