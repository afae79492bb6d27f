//! `dirflow status`: show component limits and agents.

use dirflow_agent::{AgentRegistry, ContextManager};
use dirflow_chat::ResponseBuilder;
use dirflow_config::AppConfig;
use dirflow_security::CommandValidator;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();
    let validator = CommandValidator::new(&config.validator);
    let contexts = ContextManager::new(&config.context);
    let responses = ResponseBuilder::new(&config.response);
    let registry = AgentRegistry::builtin();

    let v = validator.stats();
    let s = validator.search_stats();
    let c = contexts.status();
    let r = responses.stats();

    println!("dirflow Status");
    println!("==============");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Provider:      {}", config.default_provider);
    println!(
        "  Model:         {}",
        config
            .default_model_for(&config.default_provider)
            .unwrap_or("(none)")
    );
    println!();
    println!("  Validator");
    println!("    Actions:       {} ({} dangerous)", v.total_allowed_actions, v.dangerous_actions_count);
    println!("    Batch limit:   {}", v.max_batch_size);
    println!("    Query limit:   {} chars", s.max_query_length);
    println!("    Search via:    {}", s.valid_providers.join(", "));
    println!("    Workspace:     {}", config.validator.workspace_root);
    println!();
    println!("  Context");
    println!("    History:       {} exchanges / {} chars", c.max_history_items, c.max_history_length);
    println!("    File list cap: {}", c.max_file_list);
    println!("    Default path:  {}", c.default_current_path);
    println!();
    println!("  Responses");
    println!("    Error types:   {}", r.supported_error_types.join(", "));
    println!("    Agent notice:  {}", if r.announce_agent { "on" } else { "off" });
    println!();
    println!("  Agents");
    for agent in registry.iter() {
        println!("    {:<18} {}", agent.key, agent.display_name);
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, run `dirflow config init` to create one");
    }

    Ok(())
}
