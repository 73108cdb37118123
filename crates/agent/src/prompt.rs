//! Prompt assembly: the system prompt, the triggering prompt and the
//! message list sent to the backend each cycle.
//!
//! Layout of a request:
//!
//! ```text
//! SYSTEM PROMPT            (identity, goals, constraints, commands, format)
//! CURRENT TIME
//! SUMMARY MEMORY
//! ...history, newest messages that fit...
//! TRIGGERING PROMPT        (the last thing the model reads)
//! ```

use autoclaw_config::AiSettings;
use autoclaw_core::command::CommandRegistry;
use autoclaw_core::message::{History, Message};
use autoclaw_core::tokenizer::{MESSAGE_OVERHEAD_TOKENS, Tokenizer};
use chrono::Utc;
use tracing::debug;

/// The last message of every request.
pub const TRIGGERING_PROMPT: &str =
    "Determine which next command to use, and respond using the format specified above:";

/// Tokens held back for the model's reply when fitting history.
pub const RESPONSE_RESERVE_TOKENS: usize = 1000;

/// Initial summary memory, so the model never sees an empty past.
pub const INITIAL_SUMMARY: &str = "I was created.";

/// The JSON shape every reply must follow.
pub const RESPONSE_FORMAT: &str = r#"{
    "thoughts": {
        "text": "thought",
        "reasoning": "reasoning",
        "plan": "- short bulleted\n- list that conveys\n- long-term plan",
        "criticism": "constructive self-criticism",
        "speak": "thoughts summary to say to user"
    },
    "command": {
        "name": "command name",
        "args": {
            "arg name": "value"
        }
    }
}"#;

const CONSTRAINTS: &[&str] = &[
    "~4000 word limit for short term memory. Your short term memory is short, so immediately save important information to files.",
    "If you are unsure how you previously did something or want to recall past events, thinking about similar events will help you remember.",
    "No user assistance",
    "Exclusively use the commands listed in double quotes e.g. \"command name\"",
];

const RESOURCES: &[&str] = &[
    "File output.",
    "Long term memory management through files in your workspace.",
];

const PERFORMANCE_EVALUATIONS: &[&str] = &[
    "Continuously review and analyze your actions to ensure you are performing to the best of your abilities.",
    "Constructively self-criticize your big-picture behavior constantly.",
    "Reflect on past decisions and strategies to refine your approach.",
    "Every command has a cost, so be smart and efficient. Aim to complete tasks in the least number of steps.",
    "Write all code to a file.",
];

/// Build the system prompt for an agent identity and its command set.
pub fn system_prompt(settings: &AiSettings, registry: &CommandRegistry) -> String {
    let mut prompt = format!(
        "You are {}, {}\nYour decisions must always be made independently without seeking user \
         assistance. Play to your strengths as an LLM and pursue simple strategies with no legal \
         complications.\n\nGOALS:\n\n",
        settings.ai_name, settings.ai_role
    );
    prompt.push_str(&numbered(settings.ai_goals.iter().map(String::as_str)));

    prompt.push_str("\n\nConstraints:\n");
    prompt.push_str(&numbered(CONSTRAINTS.iter().copied()));

    prompt.push_str("\n\nCommands:\n");
    let commands = registry.descriptions();
    prompt.push_str(&numbered(commands.iter().map(String::as_str)));

    prompt.push_str("\n\nResources:\n");
    prompt.push_str(&numbered(RESOURCES.iter().copied()));

    prompt.push_str("\n\nPerformance Evaluation:\n");
    prompt.push_str(&numbered(PERFORMANCE_EVALUATIONS.iter().copied()));

    prompt.push_str(&format!(
        "\n\nYou should only respond in JSON format as described below \nResponse Format: \n{RESPONSE_FORMAT} \nEnsure the response can be parsed as strict JSON"
    ));
    prompt
}

fn numbered<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the message list for one backend call.
///
/// History is walked from the newest message backwards and stops at the
/// first message that no longer fits into `token_limit` minus the reply
/// reserve, so the oldest messages are the ones dropped.
pub fn assemble(
    system_prompt: &str,
    summary_memory: &str,
    history: &History,
    tokenizer: &dyn Tokenizer,
    model: &str,
    token_limit: usize,
) -> Vec<Message> {
    let cost = |m: &Message| tokenizer.count(&m.content, model) + MESSAGE_OVERHEAD_TOKENS;

    let head = vec![
        Message::system(system_prompt),
        Message::system(format!(
            "The current time and date is {}",
            Utc::now().format("%c")
        )),
        Message::system(format!(
            "This reminds you of these events from your past:\n{summary_memory}\n\n"
        )),
    ];
    let trigger = Message::user(TRIGGERING_PROMPT);

    let budget = token_limit.saturating_sub(RESPONSE_RESERVE_TOKENS);
    let mut used: usize = head.iter().map(cost).sum::<usize>() + cost(&trigger);

    let mut kept: Vec<&Message> = Vec::new();
    for message in history.messages().iter().rev() {
        let tokens = cost(message);
        if used + tokens > budget {
            break;
        }
        used += tokens;
        kept.push(message);
    }

    debug!(
        kept = kept.len(),
        dropped = history.len() - kept.len(),
        tokens = used,
        "Assembled prompt"
    );

    let mut messages = head;
    messages.extend(kept.into_iter().rev().cloned());
    messages.push(trigger);
    messages
}
