//! `autoclaw run`: wire the collaborators together and start the loop.

use std::path::PathBuf;
use std::sync::Arc;

use autoclaw_agent::{AgentLoop, AgentState, CycleLog, LoopExit};
use autoclaw_config::{AiSettings, AppConfig};
use autoclaw_core::console::OperatorConsole;
use autoclaw_core::error::ConsoleError;
use autoclaw_core::event::EventBus;
use autoclaw_core::plugin::{Plugin, PluginList};
use autoclaw_security::{PluginDecision, PluginPolicy, Workspace, confirmation_admits};
use clap::Args;
use tracing::{info, warn};

use crate::console::StdinConsole;

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Run without asking for authorization (dangerous)
    #[arg(short, long)]
    pub continuous: bool,

    /// Stop continuous mode after this many cycles
    #[arg(short = 'l', long, requires = "continuous")]
    pub continuous_limit: Option<u64>,

    /// AI settings file (default: ~/.autoclaw/ai_settings.toml)
    #[arg(long)]
    pub ai_settings: Option<PathBuf>,

    /// Sandbox directory for file commands
    #[arg(short, long)]
    pub workspace_directory: Option<PathBuf>,

    /// Use the fast model for everything
    #[arg(long, conflicts_with = "gpt4only")]
    pub gpt3only: bool,

    /// Use the smart model for everything
    #[arg(long)]
    pub gpt4only: bool,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Fold command-line overrides into the loaded configuration.
pub fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if args.continuous {
        config.agent_loop.continuous_mode = true;
    }
    if let Some(limit) = args.continuous_limit {
        config.agent_loop.continuous_limit = limit;
    }
    if let Some(dir) = &args.workspace_directory {
        config.workspace.directory = Some(dir.to_string_lossy().into_owned());
    }
    if args.gpt3only {
        config.smart_llm_model = config.fast_llm_model.clone();
        config.smart_token_limit = config.fast_token_limit;
    }
    if args.gpt4only {
        config.fast_llm_model = config.smart_llm_model.clone();
        config.fast_token_limit = config.smart_token_limit;
    }
}

/// Filter discovered plugins through the policy, asking the operator about
/// any plugin that is neither allowed nor denied.
pub async fn admit_plugins(
    candidates: Vec<Arc<dyn Plugin>>,
    policy: &PluginPolicy,
    console: &dyn OperatorConsole,
    authorise_key: &str,
) -> Result<PluginList, ConsoleError> {
    let mut admitted = Vec::with_capacity(candidates.len());
    for plugin in candidates {
        let name = plugin.name().to_string();
        let load = match policy.check(&name) {
            PluginDecision::Allowed => true,
            PluginDecision::Denied { reason } => {
                warn!(plugin = %name, "{reason}");
                false
            }
            PluginDecision::NeedsConfirmation => {
                console.say(
                    "WARNING: ",
                    &format!(
                        "Plugin {name} ({}) is not in the allowlist.",
                        plugin.description()
                    ),
                );
                let answer = console
                    .read_line(&format!("Load {name} ({authorise_key}/n)?"))
                    .await?;
                confirmation_admits(&answer, authorise_key)
            }
        };
        if load {
            info!(plugin = %name, version = plugin.version(), "Plugin loaded");
            admitted.push(plugin);
        }
    }
    Ok(Arc::from(admitted))
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AUTOCLAW_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let settings_path = args.ai_settings.clone().unwrap_or_else(AiSettings::default_path);
    let settings = AiSettings::load_from(&settings_path)?;

    let workspace = Workspace::new(config.workspace_dir(), config.workspace.restrict_to_workspace)
        .with_forbidden_paths(config.workspace.forbidden_paths.clone());
    workspace.ensure()?;

    let registry = Arc::new(autoclaw_commands::default_registry(&config.commands));
    let provider = autoclaw_providers::build_from_config(&config)?;
    let console: Arc<dyn OperatorConsole> = Arc::new(StdinConsole::new());

    // Plugin discovery is external; nothing is discovered by default.
    let plugins = admit_plugins(
        Vec::new(),
        &PluginPolicy::from_config(&config.plugins),
        console.as_ref(),
        &config.agent_loop.authorise_key,
    )
    .await?;

    println!();
    println!("  Welcome to autoclaw!");
    println!();
    println!("  Name:       {}", settings.ai_name);
    println!("  Role:       {}", settings.ai_role);
    for (i, goal) in settings.ai_goals.iter().enumerate() {
        println!("  Goal {}:     {goal}", i + 1);
    }
    println!("  API budget: {}", settings.budget_label());
    println!("  Provider:   {}", provider.name());
    println!("  Model:      {}", config.fast_llm_model);
    println!("  Workspace:  {}", workspace.root().display());
    println!("  Commands:   {}", registry.names().join(", "));
    println!("  Plugins:    {}", plugins.len());
    println!();
    if config.agent_loop.continuous_mode {
        console.warn(
            "Continuous mode is not recommended. It is potentially dangerous and may cause \
             your AI to run forever or carry out actions you would not usually authorise.",
        );
    }

    let config = Arc::new(config);
    let mut agent = AgentLoop::new(
        provider,
        &config,
        console.clone(),
        workspace,
        Arc::new(EventBus::default()),
    )
    .with_plugins(plugins);
    if let Some(dir) = &config.logging.cycle_log_dir {
        let log = CycleLog::for_run(dir, &settings.ai_name);
        info!(dir = %log.dir().display(), "Cycle log enabled");
        agent = agent.with_cycle_log(log);
    }

    let mut state = AgentState::new(&settings, registry, config.clone());
    let exit = agent.run(&mut state).await;
    let cycles = match exit {
        LoopExit::CeilingReached { cycles } => cycles,
        _ => state.cycle,
    };

    println!();
    println!("  Stopped after {cycles} cycle(s): {}", exit.reason());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Answers(Mutex<Vec<String>>);

    #[async_trait]
    impl OperatorConsole for Answers {
        async fn read_line(&self, _prompt: &str) -> Result<String, ConsoleError> {
            self.0.lock().unwrap().pop().ok_or(ConsoleError::Closed)
        }

        fn say(&self, _title: &str, _content: &str) {}
    }

    struct Named(&'static str);

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn overrides_apply() {
        let mut config = AppConfig::default();
        let args = RunArgs {
            continuous: true,
            continuous_limit: Some(5),
            workspace_directory: Some("/tmp/ws".into()),
            gpt4only: true,
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args);

        assert!(config.agent_loop.continuous_mode);
        assert_eq!(config.agent_loop.continuous_limit, 5);
        assert_eq!(config.workspace_dir(), PathBuf::from("/tmp/ws"));
        assert_eq!(config.fast_llm_model, "gpt-4");
        assert_eq!(config.fast_token_limit, 8000);
    }

    #[test]
    fn gpt3only_uses_fast_model_everywhere() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            &RunArgs {
                gpt3only: true,
                ..RunArgs::default()
            },
        );
        assert_eq!(config.smart_llm_model, "gpt-3.5-turbo");
        assert!(!config.agent_loop.continuous_mode);
    }

    #[test]
    fn cli_rejects_both_model_flags() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            run: RunArgs,
        }

        assert!(Wrapper::try_parse_from(["autoclaw", "--gpt3only", "--gpt4only"]).is_err());
        assert!(Wrapper::try_parse_from(["autoclaw", "--continuous-limit", "3"]).is_err());
        let ok = Wrapper::try_parse_from(["autoclaw", "-c", "-l", "3"]).unwrap();
        assert_eq!(ok.run.continuous_limit, Some(3));
    }

    #[tokio::test]
    async fn plugins_filtered_by_policy_and_operator() {
        let candidates: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(Named("allowed")),
            Arc::new(Named("denied")),
            Arc::new(Named("asked_yes")),
            Arc::new(Named("asked_no")),
        ];
        let policy = PluginPolicy::new(vec!["allowed".into()], vec!["denied".into()]);
        // popped from the end
        let console = Answers(Mutex::new(vec!["n".into(), "Y".into()]));

        let admitted = admit_plugins(candidates, &policy, &console, "y").await.unwrap();
        let names: Vec<&str> = admitted.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["allowed", "asked_yes"]);
    }
}
