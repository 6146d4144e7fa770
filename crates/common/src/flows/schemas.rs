// Response schemas in the OpenAPI subset accepted by `responseSchema`

use serde_json::{json, Value};

fn string_field(field: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": { field: { "type": "STRING" } },
        "required": [field]
    })
}

pub fn extracted_content() -> Value {
    string_field("content")
}

pub fn outline_notes() -> Value {
    string_field("notes")
}

pub fn chat_reply() -> Value {
    string_field("response")
}

pub fn outline_check() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "isOutline": { "type": "BOOLEAN" } },
        "required": ["isOutline"]
    })
}

fn pairs(left: &str, right: &str) -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                left: { "type": "STRING" },
                right: { "type": "STRING" }
            },
            "required": [left, right]
        }
    })
}

pub fn study_guide() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "keyPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "definitions": pairs("term", "definition"),
            "concepts": pairs("concept", "explanation"),
            "examples": pairs("concept", "example"),
            "mnemonics": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["summary", "keyPoints", "definitions", "concepts", "examples", "mnemonics"]
    })
}

pub fn assessment(question_types: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionText": { "type": "STRING" },
                        "questionType": { "type": "STRING", "enum": question_types },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "correctAnswer": { "type": "STRING" },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["questionText", "questionType", "correctAnswer", "explanation"]
                }
            }
        },
        "required": ["questions"]
    })
}

pub fn evaluation() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": { "type": "INTEGER" },
            "strengthSummary": { "type": "STRING" },
            "weaknessAnalysis": { "type": "STRING" },
            "results": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionNumber": { "type": "INTEGER" },
                        "isCorrect": { "type": "BOOLEAN" },
                        "feedback": { "type": "STRING" },
                        "essayEvaluation": {
                            "type": "OBJECT",
                            "properties": {
                                "highlightedText": {
                                    "type": "ARRAY",
                                    "items": {
                                        "type": "OBJECT",
                                        "properties": {
                                            "text": { "type": "STRING" },
                                            "highlight": {
                                                "type": "STRING",
                                                "enum": ["green", "orange", "grey", "none"]
                                            }
                                        },
                                        "required": ["text", "highlight"]
                                    }
                                },
                                "corrections": { "type": "ARRAY", "items": { "type": "STRING" } },
                                "alternativeAnswers": pairs("title", "content")
                            },
                            "required": ["highlightedText", "corrections", "alternativeAnswers"]
                        }
                    },
                    "required": ["questionNumber", "isCorrect", "feedback"]
                }
            }
        },
        "required": ["overallScore", "strengthSummary", "weaknessAnalysis", "results"]
    })
}
