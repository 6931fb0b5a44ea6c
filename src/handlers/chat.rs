//! Text-chat fallback handler
//!
//! Answers widget messages with keyword-matched canned replies when the voice
//! session cannot deliver the text itself. Replies are in Spanish, matching
//! the site audience.

use axum::{extract::Json as JsonBody, response::Json};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Request body for POST /api/chat/send
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Response body for POST /api/chat/send
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: u64,
}

/// Handler for POST /api/chat/send
///
/// Rejects empty messages with 400; otherwise always answers 200 within the
/// widget's timeout budget.
pub async fn send_message(
    JsonBody(request): JsonBody<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("empty chat message".to_string()));
    }

    info!(
        source = ?request.source,
        session_id = ?request.session_id,
        "Chat fallback message received"
    );

    let response = reply_for(&request.message);

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("web-session-{now_ms}"));

    Ok(Json(ChatResponse {
        response,
        session_id,
        timestamp: now_ms,
    }))
}

/// Pick a canned reply by keyword intent.
///
/// Rules are checked in order; the first match wins, so put the more specific
/// intents (a concrete program name) above the broad ones (any program talk).
pub fn reply_for(message: &str) -> String {
    let lower = message.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    let reply = if contains_any(&["hola", "buenos días", "buenas tardes"]) {
        "¡Hola! Me da mucho gusto saludarte. Soy el asistente virtual de la universidad. \
         ¿En qué puedo ayudarte hoy?"
    } else if contains_any(&["derecho"]) {
        "La Licenciatura en Derecho es un programa integral que te prepara para ejercer \
         la profesión legal con excelencia. ¿Te gustaría conocer el plan de estudios?"
    } else if contains_any(&["psicología", "psicologia"]) {
        "Nuestra Licenciatura en Psicología combina teoría y práctica para formar \
         profesionales competentes. ¿Quieres información sobre las áreas de especialización?"
    } else if contains_any(&["programa", "carrera", "licenciatura"]) {
        "Ofrecemos diversos programas de alta calidad: Derecho, Psicología, Administración \
         y más. ¿Te interesa algún programa específico?"
    } else if contains_any(&["costo", "precio", "cuánto", "cuanto"]) {
        "Los costos varían según el programa. Te recomiendo contactar a un asesor académico \
         para información detallada sobre inversión y opciones de financiamiento."
    } else if contains_any(&["inscripción", "inscripcion", "inscribir", "proceso"]) {
        "El proceso de inscripción es sencillo. Necesitas acta de nacimiento, certificado \
         de bachillerato y CURP. ¿Te gustaría que te conecte con un asesor?"
    } else if contains_any(&["modalidad", "online", "en línea", "presencial"]) {
        "Contamos con modalidades presencial y en línea para adaptarnos a tus necesidades. \
         ¿Prefieres estudiar de manera presencial o en línea?"
    } else if contains_any(&["contacto", "asesor", "información", "informacion"]) {
        "Puedo conectarte con un asesor académico especializado. También puedes escribirnos \
         por WhatsApp o visitar el campus."
    } else if contains_any(&["gracias"]) {
        "¡De nada! Es un placer ayudarte. Si tienes más preguntas, no dudes en consultarme."
    } else {
        "Gracias por tu mensaje. Estoy aquí para ayudarte con información sobre nuestros \
         programas, procesos de admisión y más. ¿En qué puedo asistirte específicamente?"
    };

    reply.to_string()
}
