use ab_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn unknown_adapter_entry_falls_back_to_defaults() {
    let config = Config::default();
    let entry = config.adapters.for_kind("claude_sdk_url");
    assert!(entry.enabled);
}

#[test]
fn launcher_command_template_roundtrips() {
    let toml_str = r#"
[launcher.command_templates]
opencode = ["opencode-cli", "--rpc"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(
        config.launcher.command_templates.get("opencode").unwrap(),
        &vec!["opencode-cli".to_string(), "--rpc".to_string()]
    );
}
