//! `dirflow context`: normalize a context blob the way a request would.

use std::path::Path;

use dirflow_agent::ContextManager;

pub async fn run(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();
    let manager = ContextManager::new(&config.context);
    let raw = super::read_json(input)?;

    let context = manager.prepare_context(&raw);
    println!("{}", serde_json::to_string_pretty(&context)?);

    let stats = manager.history_stats(&context);
    eprintln!();
    eprintln!("  History:   {} exchanges, {} chars", stats.total_entries, stats.total_length);
    eprintln!(
        "  New chat:  {}",
        if stats.should_suggest_new_chat { "suggested" } else { "not needed" }
    );

    Ok(())
}
