/// Fixed directive placed in front of every user description.
pub const INSTRUCTION_PREFIX: &str = "Generate a complete HTML file with inline CSS based on the user's description. Include a header, main content, and footer unless specified otherwise. The website should be modern, responsive, and use best practices. Here's the user's description: ";

pub fn is_blank(description: &str) -> bool {
    description.trim().is_empty()
}

/// Appends the description verbatim to [`INSTRUCTION_PREFIX`].
///
/// No escaping or truncation happens here; blank input must be rejected by
/// the caller before composing.
pub fn compose_instruction(description: &str) -> String {
    let mut instruction = String::with_capacity(INSTRUCTION_PREFIX.len() + description.len());
    instruction.push_str(INSTRUCTION_PREFIX);
    instruction.push_str(description);
    instruction
}
