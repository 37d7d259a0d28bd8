// Prompt constants for the gateway operations. Templates use `{placeholder}`
// markers filled with `str::replace` before sending.

/// Shared system fragment for JSON-only operations.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const INTERVIEWER_SYSTEM: &str = "You are Elevo, a warm and professional interviewer \
    speaking simple, clear English. You ask exactly one question per turn and reply with \
    plain text only.";

/// Replace `{role}`, `{track}`, `{skills}`, `{question_number}`, `{turn_budget}`,
/// `{stage}`, `{latest_answer}`, `{recent_questions}`, `{track_rule}`.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Role: {role}
Track: {track}
Skills: {skills}
Question number now: {question_number}/{turn_budget}
Current stage: {stage}
Latest answer: {latest_answer}
Recent questions (newest first):
{recent_questions}

Instructions:
- Start with one short acknowledgement sentence, then ask one realistic next question.
- Keep the total response under 75 words.
- Use easy, natural wording. Never use meta lines like "as mentioned earlier".
- Do not repeat or rephrase any of the recent questions.
- {track_rule}
- Return plain text only."#;

pub const TECHNICAL_TRACK_RULE: &str = "After the introduction ask only technical questions. \
    Mix project-based questions with core fundamentals from the listed skills.";

pub const HR_TRACK_RULE: &str =
    "After the introduction ask only HR, behavioral or situational questions.";

/// Appended on the single regeneration after a repeated question.
pub const AVOID_REPEAT_INSTRUCTION: &str = "\n- Your previous draft repeated an earlier \
    question. Ask about a clearly different topic this time.";

pub const EVALUATOR_SYSTEM: &str = "You are a strict but fair interview evaluator.";

/// Replace `{question}` and `{answer}`.
pub const EVALUATE_PROMPT_TEMPLATE: &str = r#"Evaluate the candidate's answer to the interview question.

Question: {question}
Answer: {answer}

Return a JSON object with this EXACT schema:
{
  "score": 0-100,
  "criteria": {
    "relevance": 0-100,
    "clarity": 0-100,
    "depth": 0-100,
    "communication": 0-100
  },
  "feedback": "two sentences of specific, actionable feedback"
}"#;

pub const RESUME_SYSTEM: &str =
    "You are an applicant tracking system reviewer for campus placement resumes.";

/// Replace `{target_role}`, `{target_skills}`, `{resume_text}`.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Score this resume for ATS readiness.

Target role: {target_role}
Target skills: {target_skills}

Return a JSON object with this EXACT schema:
{
  "keyword_match": 0-100,
  "structure_quality": 0-100,
  "impact_evidence": 0-100,
  "readability": 0-100,
  "suggestions": ["up to six concrete improvements"],
  "detected_highlights": ["up to six short strengths found in the resume"]
}

Scoring guide:
- keyword_match: target skills, or role-relevant skills and tools a screener would search for.
- structure_quality: clear Projects, Experience and Education sections with bullets.
- impact_evidence: measurable outcomes (%, scale, latency, users, revenue).
- readability: concise bullets, no dense paragraphs.

Resume:
{resume_text}"#;

/// Resume text beyond this many characters is not sent.
pub const RESUME_PROMPT_CHAR_LIMIT: usize = 18_000;
