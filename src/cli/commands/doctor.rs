//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::tts::{OutputFormat, TtsProvider};
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Print a group of checks under a heading and collect them.
fn report(title: &str, group: Vec<CheckResult>, checks: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &group {
        check.print();
    }
    println!();
    checks.extend(group);
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("podgen Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    report(
        "External Tools",
        vec![check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg())],
        &mut checks,
    );
    report("Providers", check_providers(settings), &mut checks);
    report("API Keys", check_api_keys(settings), &mut checks);
    report("Directories", check_directories(settings), &mut checks);
    report("Configuration", vec![check_config_file(config_path)], &mut checks);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before generating episodes.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! podgen is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let parts: Vec<&str> = version_cmd.split_whitespace().collect();
    let Some((cmd, args)) = parts.split_first() else {
        return CheckResult::error(name, "no command to run", hint);
    };

    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            // Truncate long version strings
            let version_display = if version.len() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check that the configured provider and output format are known.
fn check_providers(settings: &Settings) -> Vec<CheckResult> {
    let provider = match settings.tts.provider.parse::<TtsProvider>() {
        Ok(provider) => CheckResult::ok("TTS provider", provider.as_str()),
        Err(e) => CheckResult::error("TTS provider", &e.to_string(), "Set tts.provider in the config"),
    };
    let format = match settings.tts.output_format.parse::<OutputFormat>() {
        Ok(format) => CheckResult::ok("Output format", &format.to_string()),
        Err(e) => CheckResult::error("Output format", &e.to_string(), "Set tts.output_format in the config"),
    };
    vec![
        provider,
        format,
        CheckResult::ok("LLM models", &format!("{} / {}", settings.llm.model, settings.llm.fast_model)),
    ]
}

/// Check the API keys the configured providers need.
fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let mut vars = vec![
        ("OPENAI_API_KEY", "LLM and embeddings", true),
        ("TAVILY_API_KEY", "web search in research mode", false),
    ];
    if let Ok(provider) = settings.tts.provider.parse::<TtsProvider>() {
        let var = provider.api_key_var();
        if !vars.iter().any(|(v, _, _)| *v == var) {
            vars.push((var, "speech synthesis", false));
        }
    }

    vars.into_iter()
        .map(|(var, purpose, required)| check_api_key(var, purpose, required, std::env::var(var).ok()))
        .collect()
}

fn check_api_key(var: &str, purpose: &str, required: bool, value: Option<String>) -> CheckResult {
    let hint = format!("Set with: export {}='...' ({})", var, purpose);
    match value {
        Some(key) if key.trim().is_empty() => CheckResult::error(var, "empty", &hint),
        Some(key) => CheckResult::ok(var, &format!("configured ({})", mask(&key))),
        None if required => CheckResult::error(var, "not set", &hint),
        None => CheckResult::warning(var, "not set", &hint),
    }
}

/// Show only the ends of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check output, temp and checkpoint directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    [
        ("Output directory", settings.output_dir()),
        ("Temp directory", settings.temp_dir()),
        ("Checkpoint directory", settings.checkpoint_dir()),
    ]
    .into_iter()
    .map(|(name, dir)| {
        if dir.exists() {
            CheckResult::ok(name, &dir.display().to_string())
        } else {
            CheckResult::warning(
                name,
                &format!("{} (will be created)", dir.display()),
                "Directory will be created on first use",
            )
        }
    })
    .collect()
}

/// Check if the config file exists.
fn check_config_file(config_path: Option<&Path>) -> CheckResult {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: podgen config edit",
        )
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
