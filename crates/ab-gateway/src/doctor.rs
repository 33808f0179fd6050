//! `agentbrokerd doctor` — a handful of fast, synchronous sanity checks
//! against the resolved configuration and local filesystem state, run
//! before anyone tries to actually start the daemon.

use ab_domain::config::{Config, ConfigSeverity};

pub fn run(config: &Config, config_path: &str) -> bool {
    println!("agentbrokerd doctor");
    println!("====================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_state_dir(config, &mut all_passed);
    check_launcher_templates(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    all_passed
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_state_dir(config: &Config, all_passed: &mut bool) {
    if !matches!(config.storage.backend, ab_domain::config::StorageBackend::File) {
        print_check("State directory writable", true, "in-memory storage backend, skipped".into());
        return;
    }
    let dir = std::path::Path::new(&config.storage.state_dir);
    let writable = std::fs::create_dir_all(dir).is_ok() && std::fs::metadata(dir).map(|m| !m.permissions().readonly()).unwrap_or(false);
    print_check("State directory writable", writable, config.storage.state_dir.clone());
    if !writable {
        *all_passed = false;
    }
}

fn check_launcher_templates(config: &Config, all_passed: &mut bool) {
    let has_template = config.launcher.command_templates.contains_key("claude_sdk_url");
    print_check(
        "Launcher has a claude_sdk_url command template",
        has_template,
        if has_template {
            "configured".into()
        } else {
            "missing — sessions using claude_sdk_url cannot be launched".into()
        },
    );
    if !has_template {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
