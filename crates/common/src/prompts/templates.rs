// Prompt texts. Placeholders are filled by `prompts::render`.

pub const OCR_PROMPT: &str = "You are an optical character recognition specialist. Extract all of the text from the attached file.

Return only the full extracted text in the `content` field, preserving headings and list structure where they are visible.";

pub const OUTLINE_CHECK_PROMPT: &str = "You are an expert document analyzer. Decide whether the text below is a course outline, syllabus, table of contents, or a similarly structured document that lists topics for study.

Look at the structure, headings and vocabulary. Outlines are usually hierarchical (chapters, sections, bullet points) and use words such as \"Module\", \"Week\", \"Unit\", \"Chapter\", \"Introduction\" or \"Conclusion\".

Answer with true or false in the `isOutline` field only.

Content to analyze:
---
{{content}}
---";

pub const NOTES_FROM_OUTLINE_PROMPT: &str = "You are an expert educator and subject matter expert. Expand the course outline below into a complete set of study notes.

For every main topic and sub-topic write detailed notes, explanations, definitions and examples. Return one well-structured document in plain text or simple markdown, ready for a student to study from, in the `notes` field.

Course outline:
---
{{outline}}
---";

pub const STUDY_GUIDE_PROMPT: &str = "You are an expert educator and study coach who makes complex topics understandable and memorable. Build a structured study guide from the text below.

Instructions:
1. summary: a concise overview of the whole text.
2. keyPoints: the most critical, must-know facts.
3. definitions: important terms with clear, simple definitions.
4. concepts: the main ideas, each with a detailed but approachable explanation.
5. examples: simple, relatable examples tied to a concept.
6. mnemonics: memorable cues (acronyms, rhymes, vivid associations) for key information.
{{#if use_online_sources}}7. Enrichment: you may draw on your own knowledge and reliable online sources to add details, context or examples that are missing from the text but would help a student understand it.
{{/if}}
Use markdown (bold, lists) inside the text fields where it helps.

Provided content:
---
{{content}}
---";

pub const ASSESSMENT_PROMPT: &str = "You are an expert test writer for an educational platform. Write assessment questions based on the study material below.

Instructions:
1. Write exactly {{question_count}} questions.
2. Cover a variety of topics from the material.
3. Use only these question types: {{question_types}}. Put the type in `questionType` using exactly these names.
4. multiple_choice: give 4 options, one correct and three plausible distractors. `correctAnswer` must repeat the correct option verbatim.
5. true_false: `correctAnswer` is exactly \"True\" or \"False\". Do not give options.
6. flashcard: `questionText` is the term or concept and `correctAnswer` is its definition or explanation. Do not give options.
7. Every question needs a brief but clear `explanation` of the correct answer.

Study material:
---
{{content}}
---";

pub const EVALUATION_PROMPT: &str = "You are an expert university examiner. Evaluate a student's answers to the assessment below. Use your full breadth of knowledge, not only the study material.

Instructions:
1. Compute an overall percentage score from 0 to 100 in `overallScore`.
2. For each question decide whether the answer is correct by comparing it to the correct answer, and return one entry in `results` with its `questionNumber`.
3. Give clear, helpful `feedback` for every question:
   - multiple_choice: when wrong, explain why the correct answer is right; when right, briefly confirm it.
   - short_answer and flashcard: when wrong or incomplete, give the ideal complete answer.
   - essay: comment on structure, arguments and accuracy, and fill `essayEvaluation`: split the essay into segments marked green (relevant and correct), orange (partly correct or incomplete) or grey (irrelevant or incorrect); list specific corrections; suggest up to 3 alternative approaches, each with a title and its key marking points.
4. Only essay questions get an `essayEvaluation`.
5. Summarise the student's strengths in `strengthSummary` and give a constructive analysis of their weaknesses in `weaknessAnalysis`.

An answer of \"Not Answered\" means the student left the question blank.

Questions and answers:
---
{{questions}}";

pub const EVALUATION_ITEM: &str = "Question {{number}} ({{question_type}}):
- Question: {{question_text}}
{{#if has_options}}- Options: {{options}}
{{/if}}- Correct answer: {{correct_answer}}
- Student's answer: {{user_answer}}
---";

pub const CHAT_PROMPT: &str = "You are Cognify, a friendly and knowledgeable study assistant. Help the user understand their study materials better.

Conversation so far:
{{history}}

User's new question:
{{query}}

Reply in the `response` field. Be helpful, concise and stay on the user's topic.";

pub const CHAT_TURN: &str = "{{role}}: {{content}}";
