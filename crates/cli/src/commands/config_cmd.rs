//! `dirflow config`: configuration management commands.

use dirflow_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            match config.provider(&config.default_provider) {
                Some(p) if !p.has_credentials() => warnings.push(format!(
                    "Default provider '{}' has no credentials (set {})",
                    config.default_provider,
                    p.api_key_env.as_deref().unwrap_or("its API key")
                )),
                _ => {}
            }

            if !config.validator.workspace_root.starts_with('/') {
                warnings.push("validator.workspace_root is not an absolute path".to_string());
            }

            if config.validator.denied_path_patterns.iter().all(|p| p != "..") {
                warnings.push("validator.denied_path_patterns does not block \"..\"".to_string());
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!(
                "   Model:     {}",
                config
                    .default_model_for(&config.default_provider)
                    .unwrap_or("(none)")
            );
            println!("   Workspace: {}", config.validator.workspace_root);
            println!(
                "   History:   {} exchanges / {} chars",
                config.context.max_history_items, config.context.max_history_length
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = dirflow_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn starter_config_parses_back() {
        let text = dirflow_config::AppConfig::default_toml();
        let parsed: dirflow_config::AppConfig = toml::from_str(&text).unwrap();
        assert!(parsed.validate().is_ok());
    }
}
