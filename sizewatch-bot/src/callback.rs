//! Compact codec for inline-button callback payloads.
//!
//! Telegram caps `callback_data` at 64 bytes, so actions are encoded as a
//! pipe-separated tag plus fields instead of JSON:
//!
//! ```text
//! sz|<product_id>|<size>    toggle one size
//! ok|<product_id>           confirm the selection
//! ```
//!
//! The chat id is deliberately absent from the payload; the callback query
//! event already carries it and the bytes are better spent on the product
//! id and size label.

use thiserror::Error;

/// Hard transport ceiling for `callback_data`, in bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

const TOGGLE_TAG: &str = "sz";
const CONFIRM_TAG: &str = "ok";
const SEP: char = '|';

/// A decoded user intent carried inside a button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Flip membership of one size in the selection.
    ToggleSize { product_id: String, size: String },
    /// Persist the current selection.
    Confirm { product_id: String },
}

/// Encoding failure. Both variants indicate upstream catalog identifiers
/// that cannot be carried in a button payload; they surface at session
/// creation, never on a button press.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("encoded payload is {len} bytes, over the {MAX_CALLBACK_BYTES}-byte limit")]
    OversizedPayload { len: usize },

    #[error("field {0:?} contains the reserved separator")]
    ReservedSeparator(String),
}

/// Decoding failure. Callers ignore the event; a stale button from a
/// superseded session must never crash or mutate state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown action kind {0:?}")]
    UnknownKind(String),

    #[error("malformed callback payload")]
    Malformed,
}

/// Encode an action into its wire form.
///
/// Fails rather than truncates when the result would exceed
/// [`MAX_CALLBACK_BYTES`].
pub fn encode(action: &CallbackAction) -> Result<String, EncodeError> {
    let payload = match action {
        CallbackAction::ToggleSize { product_id, size } => {
            check_field(product_id)?;
            check_field(size)?;
            format!("{TOGGLE_TAG}{SEP}{product_id}{SEP}{size}")
        }
        CallbackAction::Confirm { product_id } => {
            check_field(product_id)?;
            format!("{CONFIRM_TAG}{SEP}{product_id}")
        }
    };

    if payload.len() > MAX_CALLBACK_BYTES {
        return Err(EncodeError::OversizedPayload {
            len: payload.len(),
        });
    }

    Ok(payload)
}

/// Decode a wire payload back into a typed action.
///
/// Validation is strict: exact field count, no empty fields, known tag.
pub fn decode(payload: &str) -> Result<CallbackAction, DecodeError> {
    let parts: Vec<&str> = payload.split(SEP).collect();

    match parts.as_slice() {
        [TOGGLE_TAG, product_id, size] if !product_id.is_empty() && !size.is_empty() => {
            Ok(CallbackAction::ToggleSize {
                product_id: (*product_id).to_string(),
                size: (*size).to_string(),
            })
        }
        [CONFIRM_TAG, product_id] if !product_id.is_empty() => Ok(CallbackAction::Confirm {
            product_id: (*product_id).to_string(),
        }),
        [tag, ..] if *tag != TOGGLE_TAG && *tag != CONFIRM_TAG => {
            Err(DecodeError::UnknownKind((*tag).to_string()))
        }
        _ => Err(DecodeError::Malformed),
    }
}

fn check_field(field: &str) -> Result<(), EncodeError> {
    if field.contains(SEP) {
        return Err(EncodeError::ReservedSeparator(field.to_string()));
    }
    Ok(())
}
