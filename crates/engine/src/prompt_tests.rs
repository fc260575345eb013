use agentflow_core::TaskType;

use super::*;

fn sample_task() -> Task {
    Task {
        id: agentflow_core::TaskId::new(),
        title: "Implement the parser".to_string(),
        description: Some("Parse terminal directives".to_string()),
        deps: vec![],
        inputs: vec!["spec.txt".to_string()],
        outputs: vec!["parser.rs".to_string()],
        done_when: vec!["parser compiles".to_string()],
        task_type: TaskType::Implement,
        assigned_to: None,
        subtasks: vec![],
    }
}

#[test]
fn prompt_contains_every_required_section() {
    let task = sample_task();
    let prompt = build_prompt(&task, "/tmp/artifacts");
    assert!(prompt.contains("Task: Implement the parser"));
    assert!(prompt.contains("Description: Parse terminal directives"));
    assert!(prompt.contains("Inputs: - spec.txt"));
    assert!(prompt.contains("Required Outputs: - parser.rs"));
    assert!(prompt.contains("Done Criteria: - parser compiles"));
    assert!(prompt.contains("Shared artifacts directory: /tmp/artifacts"));
    assert!(prompt.contains("When finished output exactly: [TASK_DONE]"));
    assert!(prompt.contains("If impossible output exactly:  [TASK_FAILED]"));
    assert!(prompt.contains("If you need user input output exactly: [TASK_WAITING] <question>"));
}

#[test]
fn empty_lists_render_as_none() {
    let mut task = sample_task();
    task.inputs = vec![];
    let prompt = build_prompt(&task, "/tmp/artifacts");
    assert!(prompt.contains("Inputs: - (none)"));
}
