// Prompt constants for the criterion judge.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for criterion judging: enforces JSON-only output.
pub const JUDGE_SYSTEM: &str = "You are an experienced technical recruiter. \
    You score one candidate against one evaluation criterion at a time. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Judging prompt template. Replace `{criterion_name}`, `{criterion_description}`,
/// `{importance}`, `{evidence_instruction}` and `{evidence}` before sending.
pub const JUDGE_PROMPT_TEMPLATE: &str = r#"Evaluate the candidate against the following criterion.

Criterion: {criterion_name}
What to look for: {criterion_description}
Importance to the role: {importance}

{evidence_instruction}

Evidence from the candidate's profile:
{evidence}

Score on this integer scale:
1 = no evidence of the criterion
2 = weak or indirect evidence
3 = some relevant evidence
4 = clear evidence
5 = strong, direct evidence

Return a JSON object with this EXACT schema (no extra fields):
{"score": 4, "justification": "One sentence citing the evidence above."}"#;
