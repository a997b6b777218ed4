// Shared prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs alongside it and reuses these.

/// Appended to every prompt that judges a candidate against supplied evidence.
pub const EVIDENCE_ONLY_INSTRUCTION: &str = "\
    CRITICAL: Base your answer ONLY on the evidence provided below. \
    Do NOT infer skills, titles, or experience that the evidence does not state. \
    If the evidence does not address the criterion, say so and score accordingly.";
