// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Bit-exact task prompt contract (§4.6).

use agentflow_core::Task;

/// Render the exact textual contract the agent must obey for `task`,
/// given the shared artifacts directory absolute path.
pub fn build_prompt(task: &Task, artifacts_dir: &str) -> String {
    let description = task.description.as_deref().unwrap_or("");
    let inputs = bullet_list(&task.inputs);
    let outputs = bullet_list(&task.outputs);
    let done_when = bullet_list(&task.done_when);

    format!(
        "Task: {title}\n\
         Description: {description}\n\
         Inputs: {inputs}\n\
         Required Outputs: {outputs}\n\
         Done Criteria: {done_when}\n\
         Shared artifacts directory: {artifacts_dir}\n\
         Rules:\n\
         - Write every declared output file into the shared artifacts directory.\n\
         - If an input refers to an artifact filename, read it from that directory.\n\
         - Use exact output filenames.\n\
         When finished output exactly: [TASK_DONE]\n\
         If impossible output exactly:  [TASK_FAILED]\n\
         If you need user input output exactly: [TASK_WAITING] <question>",
        title = task.title,
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
