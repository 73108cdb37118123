//! `autoclaw config`: configuration management commands.

use autoclaw_config::AppConfig;

/// The configuration as TOML, with the API key masked.
pub fn redacted_toml(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", redacted_toml(&config)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set AUTOCLAW_API_KEY or OPENAI_API_KEY)");
    }
    if config.commands.allow_shell && config.commands.shell_allowlist.is_empty() {
        warnings.push("Shell commands enabled with an empty allowlist; any program may run");
    }
    if config.agent_loop.continuous_mode && config.agent_loop.continuous_limit == 0 {
        warnings.push("Continuous mode without a continuous_limit runs until interrupted");
    }
    if !config.workspace.restrict_to_workspace {
        warnings.push("restrict_to_workspace = false lets commands touch any path");
    }

    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   Warning: {w}");
        }
    }

    println!();
    println!("   Model:      {} / {}", config.fast_llm_model, config.smart_llm_model);
    println!("   Base URL:   {}", config.base_url);
    println!("   Workspace:  {}", config.workspace_dir().display());
    println!("   Continuous: {}", config.agent_loop.continuous_mode);

    Ok(())
}
