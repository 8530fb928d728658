use crate::error::ApiError;

/// Upper bound on request text. Longer text is spoken in several engine
/// requests, so this only guards against abuse.
const MAX_TEXT_LENGTH: usize = 100_000;
/// Reading speed range supported by the engine
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// Validate a streaming TTS request
pub fn validate_tts_request(text: &str, speed: f32) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }

    if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(ApiError::InvalidInput(format!(
            "Invalid speed {}. Expected a value between {} and {}",
            speed, MIN_SPEED, MAX_SPEED
        )));
    }

    Ok(())
}
