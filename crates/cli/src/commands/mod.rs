pub mod config_cmd;
pub mod context;
pub mod fallback;
pub mod status;
pub mod validate;

use std::io::Read;
use std::path::Path;

/// Read JSON from a file, or from stdin when `input` is `-`.
pub fn read_json(input: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| format!("Failed to read {}: {e}", input.display()))?
    };
    Ok(serde_json::from_str(&text)?)
}

/// Load config, falling back to defaults with a warning when it is broken.
pub fn load_config() -> dirflow_config::AppConfig {
    dirflow_config::AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config could not be loaded, using defaults");
        dirflow_config::AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_json_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"action":"list_files"}}"#).unwrap();
        let value = read_json(file.path()).unwrap();
        assert_eq!(value["action"], "list_files");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_json(Path::new("/nonexistent/dirflow/input.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
