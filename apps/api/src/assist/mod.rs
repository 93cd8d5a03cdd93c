// Writing assistance for resume content, backed by the injected LLM client.

pub mod handlers;
pub mod prompts;
