// Cross-cutting prompt fragments for the completion client.
// Task-specific prompt assembly lives in prompt.rs.

/// System prompt that pins the model to the extraction role and JSON-only
/// output. Fence stripping in the parser is the fallback for models that
/// ignore the fence rule anyway.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise music-taste extraction assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
