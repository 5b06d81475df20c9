//! Prompt builders, one per handling path. All pure functions of their inputs.

use crate::protocol::ConversationTurn;

/// Only the most recent turns of history are sent to the model.
pub const MAX_HISTORY_TURNS: usize = 10;

const MEDICAL_ASSISTANT_INSTRUCTION: &str = "You are a professional Medical AI Assistant. \
Provide accurate, empathetic medical information. Always include disclaimers that this is \
not a substitute for professional medical advice.";

const PRESCRIPTION_INSTRUCTION: &str = r#"Analyze this prescription image and extract the following information in JSON format:
{
    "medications": [
        {
            "name": "medication name",
            "quantity": number,
            "dose": "dosage",
            "frequency": "frequency",
            "confidence": 0.9
        }
    ],
    "patient": {
        "name": "patient name or null",
        "dob": "date of birth or null"
    },
    "doctor": {
        "name": "doctor name or null"
    },
    "date": "prescription date or null",
    "human_review_required": false
}

Be thorough and accurate. If text is unclear, indicate lower confidence."#;

/// Conversational prompt: system instruction, the last `MAX_HISTORY_TURNS` turns as
/// `role: content` lines, then the current message and an open assistant turn.
pub fn conversational(history: &[ConversationTurn], message: &str) -> String {
    let mut prompt = String::from(MEDICAL_ASSISTANT_INSTRUCTION);
    prompt.push_str("\n\n");
    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
    for turn in &history[skip..] {
        prompt.push_str(&turn.role);
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("user: ");
    prompt.push_str(message);
    prompt.push_str("\nassistant:");
    prompt
}

/// Single-turn prompt sent together with an image; history is not included.
pub fn conversational_with_image(message: &str) -> String {
    format!(
        "You are a professional Medical AI Assistant. Analyze this image and respond to: {}\n\n\
Provide accurate, empathetic medical information. Always include disclaimers that this is \
not a substitute for professional medical advice.",
        message
    )
}

/// Structured extraction of a prescription image. Always paired with the image.
pub fn prescription() -> &'static str {
    PRESCRIPTION_INSTRUCTION
}

/// Structured extraction of a spoken ordering command.
pub fn voice_command(utterance: &str) -> String {
    format!(
        r#"Parse this voice command for a medical prescription order system:
"{}"

Return JSON with:
{{
    "intent": "add" | "remove" | "confirm" | "done" | "unknown",
    "medication_name": "name or null",
    "quantity": number or null,
    "confidence": 0.8
}}"#,
        utterance
    )
}

pub fn knowledge_lookup(query: &str) -> String {
    format!(
        "As a medical knowledge expert with access to medical databases, answer this query: {}\n\n\
Provide accurate, evidence-based information with sources when possible.",
        query
    )
}

pub fn web_search(query: &str) -> String {
    format!(
        "Search for and provide the latest information about: {}\n\n\
Focus on recent research, clinical trials, and medical news.",
        query
    )
}

pub fn image_analysis(query: &str) -> String {
    format!(
        "As a medical imaging specialist, analyze this image. User query: {}\n\n\
Provide detailed analysis including:\n\
- What type of medical image this is\n\
- Key observations\n\
- Potential findings\n\
- Recommendations\n\n\
IMPORTANT: Include appropriate medical disclaimers.",
        query
    )
}
