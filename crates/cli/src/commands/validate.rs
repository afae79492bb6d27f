//! `dirflow validate`: run commands through the validator.

use std::path::Path;

use dirflow_security::CommandValidator;
use serde_json::Value;

pub async fn run(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();
    let validator = CommandValidator::new(&config.validator);
    let value = super::read_json(input)?;

    match &value {
        Value::Array(commands) => {
            let report = validator.validate_batch(commands);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.error_count > 0 {
                return Err(format!(
                    "{} of {} commands rejected",
                    report.error_count, report.total_processed
                )
                .into());
            }
        }
        single => match validator.validate(single) {
            Ok(command) => {
                println!("✅ Valid {} command", command.action());
                println!("{}", serde_json::to_string_pretty(&command)?);
            }
            Err(e) => {
                println!("❌ {e}");
                return Err(e.into());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn json_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn accepts_a_valid_command() {
        let file = json_file(r#"{"action":"read_file","path":"notes.md"}"#);
        assert!(run(file.path()).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let file = json_file(r#"{"action":"read_file","path":"../notes.md"}"#);
        assert!(run(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn batch_with_one_reject_fails() {
        let file = json_file(
            r#"[{"action":"list_files"},{"action":"copy_file","source":"a.txt"}]"#,
        );
        let err = run(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }
}
