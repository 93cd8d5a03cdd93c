use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub fn bullet_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You edit resume bullet points. Keep every fact from the \
        original; never invent numbers, employers, or technologies."
    )
}

pub const IMPROVE_BULLET_PROMPT: &str = r#"Rewrite this resume bullet so it starts with a strong action verb,
is concise (one line, under 25 words), and states the outcome.

Target role: {role}

Bullet:
{bullet}

Respond as: {"improved": "<rewritten bullet>"}"#;

pub fn improve_bullet_prompt(bullet: &str, role: Option<&str>) -> String {
    IMPROVE_BULLET_PROMPT
        .replace("{role}", role.unwrap_or("not specified"))
        .replace("{bullet}", bullet)
}
