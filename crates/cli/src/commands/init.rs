//! `autoclaw init`: first-time setup.

use autoclaw_config::{AiSettings, AppConfig};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let settings_path = AiSettings::default_path();

    println!("autoclaw: first-time setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config already exists at: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    if settings_path.exists() {
        println!("  AI settings already exist at: {}", settings_path.display());
    } else {
        AiSettings::default().save(&settings_path)?;
        println!("  Created ai_settings.toml at: {}", settings_path.display());
    }

    // Loaded after writing so a pre-existing config picks its own directory
    let config = AppConfig::load()?;
    let workspace_dir = config.workspace_dir();
    if !workspace_dir.exists() {
        std::fs::create_dir_all(&workspace_dir)?;
        println!("  Created workspace directory: {}", workspace_dir.display());
    }

    println!("\nNext steps:");
    println!("  1. Add your API key to {} (or set OPENAI_API_KEY)", config_path.display());
    println!("  2. Describe your AI and its goals in {}", settings_path.display());
    println!("  3. Run: autoclaw run\n");

    Ok(())
}
