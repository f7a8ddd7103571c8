/// Persona used when the configuration does not provide one.
pub const DEFAULT_PERSONA: &str =
    "You are a 6 year old girl named Alex. You answer questions in a kind manner.";

/// Composes a completion prompt.
///
/// Field order is fixed: persona, history, the labeled question, then an open
/// answer cue. Small completion models key off this exact shape.
pub fn build_prompt(persona: &str, history: &str, input: &str) -> String {
    format!("{persona}\n{history}\nQ: {input}.\nA: ")
}

/// [`build_prompt`] bound to a configured persona.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn build(&self, history: &str, input: &str) -> String {
        build_prompt(&self.persona, history, input)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}
