use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_init_config_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".rtebridge.toml");

    let result = init_config(config_path.to_str().unwrap());
    assert!(result.is_ok(), "init_config should succeed: {:?}", result.err());
    assert!(config_path.exists(), "Config file should be created");

    let config_content = fs::read_to_string(&config_path).unwrap();
    assert!(config_content.contains("title_placeholder = \"Title\""));
    assert!(config_content.contains("query_timeout_ms = 5000"));

    let loaded = EditorConfig::from_file(&config_path).unwrap();
    assert_eq!(loaded.content_placeholder.as_deref(), Some("Write something..."));
}

#[test]
fn test_init_config_skips_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".rtebridge.toml");
    fs::write(&config_path, "grid_width = 80.0\n").unwrap();

    init_config(config_path.to_str().unwrap()).unwrap();

    let content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, "grid_width = 80.0\n");
}

#[test]
fn test_load_config_defaults_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("missing.toml");
    let config = load_config(config_path.to_str().unwrap()).unwrap();
    assert_eq!(config, EditorConfig::default());
}

#[test]
fn test_load_config_reports_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "query_timeout_ms = 0\n").unwrap();

    let err = load_config(config_path.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("query_timeout_ms"));
}

#[test]
fn test_cli_parses_default_config() {
    let cli = Cli::parse_from(["rteb"]);
    assert_eq!(cli.config, ".rtebridge.toml");
    assert!(!cli.init);
    assert_eq!(cli.verbose, 0);
    assert!(cli.command.is_none());
}

#[test]
fn test_cli_parses_custom_config() {
    let cli = Cli::parse_from(["rteb", "-c", "custom.toml"]);
    assert_eq!(cli.config, "custom.toml");
}

#[test]
fn test_cli_parses_init_flag() {
    let cli = Cli::parse_from(["rteb", "--init"]);
    assert!(cli.init);
}

#[test]
fn test_cli_counts_verbosity() {
    let cli = Cli::parse_from(["rteb", "-vv", "actions"]);
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Some(Commands::Actions)));
}

#[test]
fn test_cli_parses_decode_subcommand() {
    let cli = Cli::parse_from(["rteb", "decode", "post.html", "--pretty"]);
    match cli.command {
        Some(Commands::Decode { file, pretty }) => {
            assert_eq!(file, Some(PathBuf::from("post.html")));
            assert!(pretty);
        }
        other => panic!("Expected Decode, got {:?}", other),
    }
}

#[test]
fn test_cli_decode_without_file_reads_stdin() {
    let cli = Cli::parse_from(["rteb", "decode"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Decode { file: None, pretty: false })
    ));
}

#[test]
fn test_cli_parses_encode_with_text() {
    let cli = Cli::parse_from(["rteb", "encode", "SET_CONTENT_HTML", "--text", "<p>x</p>"]);
    match cli.command {
        Some(Commands::Encode { action, text, json }) => {
            assert_eq!(action, "SET_CONTENT_HTML");
            assert_eq!(text.as_deref(), Some("<p>x</p>"));
            assert!(json.is_none());
        }
        other => panic!("Expected Encode, got {:?}", other),
    }
}

#[test]
fn test_cli_rejects_text_and_json_together() {
    let result = Cli::try_parse_from(["rteb", "encode", "bold", "--text", "a", "--json", "1"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_parses_export_subcommand() {
    let cli = Cli::parse_from(["rteb", "export", "--socket", "/tmp/editor.sock"]);
    match cli.command {
        Some(Commands::Export { socket, pretty }) => {
            assert_eq!(socket, PathBuf::from("/tmp/editor.sock"));
            assert!(!pretty);
        }
        other => panic!("Expected Export, got {:?}", other),
    }
}

#[test]
fn test_cli_export_requires_socket() {
    assert!(Cli::try_parse_from(["rteb", "export"]).is_err());
}

#[test]
fn test_run_encode_text_payload() {
    let script = run_encode("SET_TITLE_HTML", Some("a \"b\""), None).unwrap();
    assert_eq!(
        script,
        r#"zss_editor.dispatch({"type":"SET_TITLE_HTML","data":"a \"b\""})"#
    );
}

#[test]
fn test_run_encode_json_payload() {
    let script = run_encode("INST_LINK", None, Some(r#"{"title":"t","url":"u"}"#)).unwrap();
    assert_eq!(
        script,
        r#"zss_editor.dispatch({"type":"INST_LINK","data":{"title":"t","url":"u"}})"#
    );
}

#[test]
fn test_run_encode_without_payload() {
    let script = run_encode("bold", None, None).unwrap();
    assert_eq!(script, r#"zss_editor.dispatch({"type":"bold"})"#);
}

#[test]
fn test_run_encode_unknown_action() {
    let err = run_encode("sparkle", None, None).unwrap_err();
    assert!(err.to_string().contains("unknown action: sparkle"));
}

#[test]
fn test_run_encode_invalid_json() {
    let err = run_encode("INST_LINK", None, Some("{nope")).unwrap_err();
    assert!(err.to_string().contains("Invalid JSON payload"));
}

#[test]
fn test_run_decode_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("post.html");
    fs::write(&html_path, "<p>Hello</p><p></p>").unwrap();

    let json = run_decode(Some(&html_path), "cdn.example.com/", false).unwrap();
    assert_eq!(json, r#"{"blocks":[{"blockType":"Text","htmlContent":"Hello"}]}"#);
}

#[test]
fn test_run_decode_missing_file() {
    let err = run_decode(Some(Path::new("/nonexistent/post.html")), "x/", false).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/post.html"));
}

#[test]
fn test_list_actions_includes_every_action() {
    let listing = list_actions();
    assert_eq!(listing.lines().count(), Action::ALL.len());
    assert!(listing.lines().any(|line| line == "SetBold\tbold"));
    assert!(listing.lines().any(|line| line == "Init\tZSS_INIT"));
}
