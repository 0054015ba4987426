//! 各阶段的提示词

use crate::core::{ImplementationStep, Plan};

/// Planner：把用户需求转成完整的工程计划
pub fn planner_prompt(user_prompt: &str) -> String {
    format!(
        "You are the PLANNER. Turn the user's request into a COMPLETE engineering project plan.\n\n\
         User request: {user_prompt}\n\n\
         When the request is a web application or an interactive tool:\n\
         - Every UI element must be FULLY FUNCTIONAL.\n\
         - Event handlers, calculations and application logic must be COMPLETE.\n\
         - The app must be usable, not a static mock-up.\n\
         - A frontend-only design (HTML, CSS, JavaScript) without a backend is acceptable.\n"
    )
}

/// Architect：把 Plan 拆成有序的实现步骤
pub fn architect_prompt(plan: &Plan) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_else(|_| format!("{plan:?}"));
    format!(
        "You are the ARCHITECT. Break the project plan below into explicit, ordered implementation tasks.\n\n\
         Rules:\n\
         - Create one or more tasks for every file in the plan.\n\
         - In every task description:\n\
         \x20 * say exactly what to implement;\n\
         \x20 * name the variables, functions, classes and components to define;\n\
         \x20 * for interactive elements, list the events to handle and the logic behind them;\n\
         \x20 * for calculators and forms, give the calculation, validation and UI update flow;\n\
         \x20 * state how the task depends on, or is used by, earlier tasks;\n\
         \x20 * include integration details: imports, function signatures, data flow.\n\
         - Order the tasks so dependencies come first.\n\
         - Each task must be self-contained while carrying forward the context it needs from earlier tasks.\n\
         - Tasks must produce working, interactive code, never bare layouts or placeholders.\n\n\
         Project plan:\n{plan_json}\n"
    )
}

/// Coder 的固定 system 提示
pub const CODER_SYSTEM_PROMPT: &str = "You are the CODER. You implement one engineering task at a time.\n\
You can read, write and list project files through the provided tools; use them.\n\n\
Your code must be:\n\
- COMPLETE: no TODOs, placeholders or stub functions.\n\
- FUNCTIONAL: every button, input and interaction works.\n\
- CHECKED: walk through the user flow before writing.\n\
- INTEGRATED: consistent with every other file in the project.\n\n\
Always:\n\
1. Review the existing project files to understand the full context.\n\
2. Implement complete behaviour, not UI shells.\n\
3. For web apps, attach every event listener, make sure DOM selectors match the HTML, \
and implement real handler logic instead of console.log.\n\
4. For JavaScript, select elements only after they exist in the DOM.\n\
5. Keep names of variables, functions and imports consistent across files; anything imported \
from another file must exist there as described.\n\n\
Your code must actually WORK when run.";

/// Coder 单步任务提示：上下文块 + 任务 + 检查清单 + 目标文件现有内容 + 必须写文件
pub fn coder_task_prompt(context: &str, step: &ImplementationStep, existing: &str) -> String {
    let path = &step.filepath;
    format!(
        "{context}\n\
         Task: {task}\n\
         Path: {path}\n\n\
         CRITICAL REQUIREMENTS:\n\
         1. Write FULLY FUNCTIONAL, INTERACTIVE code, not just layout.\n\
         2. For web apps, every button and input MUST have a working event handler.\n\
         3. For JavaScript, select every DOM element correctly and bind its events.\n\
         4. For forms and calculators, implement the complete calculation, validation and update logic.\n\
         5. Walk through the user interactions step by step before writing.\n\
         6. No placeholders or TODO comments.\n\
         7. When using a JavaScript framework, handle component lifecycle and state properly.\n\n\
         Existing content of {path} (empty if the file does not exist yet):\n{existing}\n\n\
         You MUST call write_file(path=\"{path}\", content=<your complete code>) to save the implementation. \
         Work that is not written with the tools is lost.",
        task = step.task_description,
    )
}
