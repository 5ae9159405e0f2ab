//! System prompt assembly from course modules.

use crate::content::Module;

/// Prompt used when the store holds no modules.
pub const NO_CONTENT_PROMPT: &str = "No course content available.";

/// Phrase the model must use for questions outside the course content.
pub const REFUSAL_PHRASE: &str =
    "I cannot answer that as it is outside the scope of the provided content.";

const SEPARATOR: &str = "\n\n";

/// Render every module, in store order, into the system instruction.
pub fn render_system_prompt(modules: &[Module]) -> String {
    if modules.is_empty() {
        return NO_CONTENT_PROMPT.to_string();
    }

    let content = modules
        .iter()
        .enumerate()
        .map(|(i, module)| format!("Module {}: {module}", i + 1))
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    format!(
        "You are a knowledgeable assistant. You can only answer questions based on the \
         course content provided and take the whole content as correct. If the query is \
         outside the content, respond with '{REFUSAL_PHRASE}' Here is the course content:\
         {SEPARATOR}{content}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;

    fn module(title: &str, items: &[(&str, &str)]) -> Module {
        Module {
            module_title: title.to_string(),
            content_parts: items.iter().map(|(k, v)| ContentItem::new(*k, *v)).collect(),
        }
    }

    #[test]
    fn empty_store_renders_sentinel() {
        assert_eq!(render_system_prompt(&[]), NO_CONTENT_PROMPT);
    }

    #[test]
    fn preamble_scopes_the_model() {
        let prompt = render_system_prompt(&[module("Intro", &[("content_1", "Hello")])]);
        assert!(prompt.contains("only answer questions based on the course content"));
        assert!(prompt.contains("take the whole content as correct"));
        assert!(prompt.contains(REFUSAL_PHRASE));
    }

    #[test]
    fn modules_indexed_from_one_in_order() {
        let prompt = render_system_prompt(&[
            module("Intro", &[("content_1", "Hello"), ("content_2", "World")]),
            module("Advanced", &[("note_1", "Lifetimes")]),
        ]);
        let first = prompt.find("Module 1: Intro").unwrap();
        let second = prompt.find("Module 2: Advanced").unwrap();
        assert!(first < second);
        assert!(prompt.contains("- content_1: Hello\n- content_2: World\n\nModule 2: Advanced"));
        assert!(prompt.ends_with("- note_1: Lifetimes"));
    }

    #[test]
    fn content_section_follows_blank_line() {
        let prompt = render_system_prompt(&[module("Intro", &[])]);
        assert!(prompt.contains("Here is the course content:\n\nModule 1: Intro"));
    }
}
