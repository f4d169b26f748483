pub fn build_question_prompt(chunk_text: &str, grade_level: u8) -> String {
    format!(
        r#"You are an educational expert creating questions for a classroom setting.

Generate 3 questions for the given text chunk that simulate realistic teacher and student interactions.
Grade level: {}

Question types:
1. TEACHER QUESTION: a direct, clear question that a teacher would ask to test comprehension
2. STUDENT QUESTION: a curious question that a student might ask when learning this topic
3. ADVANCED QUESTION: a deeper, analytical question that challenges understanding

RULES:
- Use natural, conversational language
- Make questions age-appropriate and answerable from the given text
- Return ONLY the question text, no labels or numbering
- Output ONLY valid JSON matching this schema, nothing else:

{{"questions": ["first question", "second question", "third question"]}}

TEXT:
{}

JSON OUTPUT:"#,
        grade_level, chunk_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only a valid JSON object of the form {{"questions": [...]}} with no markdown formatting, no code blocks, no explanations."#,
        invalid_json
    )
}
