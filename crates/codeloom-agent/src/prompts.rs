//! System prompt and the command directory.

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Codeloom, an AI coding assistant working inside the user's project \
directory. You start with only the load_tools meta tool; call it to see the \
available tool categories and load the ones the task needs. Read files \
before editing them, keep edits minimal, and report paths relative to the \
working directory. When a task is done, summarize what changed.";

/// A slash-command preset the client can attach to a chat request.
#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    prompt: &'static str,
}

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "plan",
        description: "Produce a step-by-step plan before touching any file",
        prompt: "Before making any change, write a numbered plan of the steps \
                 you will take and wait for the steps to be sensible. Keep the \
                 plan short and concrete.",
    },
    CommandInfo {
        name: "explain",
        description: "Explain code without modifying anything",
        prompt: "Only read and explain. Do not write, edit or run anything \
                 that modifies the project.",
    },
    CommandInfo {
        name: "fix",
        description: "Diagnose and fix a reported problem",
        prompt: "Reproduce or locate the reported problem first, then apply \
                 the smallest fix that addresses the cause, not the symptom.",
    },
];

pub fn command_directory() -> &'static [CommandInfo] {
    COMMANDS
}

/// The system prompt for a turn, with the command preset appended when the
/// request named one. Unknown commands fall back to the default prompt.
pub fn system_prompt_for(command: Option<&str>) -> String {
    let preset = command.and_then(|name| COMMANDS.iter().find(|c| c.name == name));
    match preset {
        Some(c) => format!("{}\n\n{}", DEFAULT_SYSTEM_PROMPT, c.prompt),
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}
