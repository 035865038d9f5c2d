//! Keyboard rendering for size-selection sessions.
//!
//! Pure function from session state to button layout. No store access, no
//! clocks, no randomness: the same session always renders the same rows,
//! which is what makes edit-in-place updates cheap to reason about.

use crate::callback::{encode, CallbackAction, EncodeError};
use crate::session::Session;
use crate::telegram::InlineButton;

const CHECKED: &str = "✅";
const UNCHECKED: &str = "⬜";

/// Render the inline keyboard for a session.
///
/// One row per size in the session's original order, each labelled with a
/// checked/unchecked glyph, plus a final Confirm row. Fails with
/// [`EncodeError`] when a catalog identifier cannot fit a button payload;
/// callers run this once at session creation so that surfaces immediately.
pub fn render(session: &Session) -> Result<Vec<Vec<InlineButton>>, EncodeError> {
    let mut rows = Vec::with_capacity(session.sizes().len() + 1);

    for size in session.sizes() {
        let glyph = if session.is_selected(size) {
            CHECKED
        } else {
            UNCHECKED
        };
        let payload = encode(&CallbackAction::ToggleSize {
            product_id: session.product_id.clone(),
            size: size.clone(),
        })?;
        rows.push(vec![InlineButton::new(format!("{glyph} {size}"), payload)]);
    }

    let confirm = encode(&CallbackAction::Confirm {
        product_id: session.product_id.clone(),
    })?;
    rows.push(vec![InlineButton::new("Confirm", confirm)]);

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(
            42,
            "p1",
            "https://example.com/item/p1",
            "Linen Shirt",
            vec!["S".into(), "M".into(), "L".into()],
        )
    }

    #[test]
    fn renders_one_row_per_size_plus_confirm() {
        let rows = render(&test_session()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0].text, "⬜ S");
        assert_eq!(rows[1][0].text, "⬜ M");
        assert_eq!(rows[2][0].text, "⬜ L");
        assert_eq!(rows[3][0].text, "Confirm");
        assert_eq!(rows[3][0].callback_data, "ok|p1");
    }

    #[test]
    fn preserves_catalog_order() {
        let session = Session::new(
            1,
            "p2",
            "https://example.com/item/p2",
            "Boots",
            vec!["44".into(), "39".into(), "41".into()],
        );
        let rows = render(&session).unwrap();
        assert_eq!(rows[0][0].text, "⬜ 44");
        assert_eq!(rows[1][0].text, "⬜ 39");
        assert_eq!(rows[2][0].text, "⬜ 41");
    }

    #[test]
    fn marks_selected_sizes() {
        let mut session = test_session();
        session.toggle("M");

        let rows = render(&session).unwrap();
        assert_eq!(rows[0][0].text, "⬜ S");
        assert_eq!(rows[1][0].text, "✅ M");
        assert_eq!(rows[2][0].text, "⬜ L");
    }

    #[test]
    fn render_is_deterministic() {
        let mut session = test_session();
        session.toggle("S");
        session.toggle("L");

        assert_eq!(render(&session).unwrap(), render(&session).unwrap());
    }

    #[test]
    fn toggle_twice_renders_identically() {
        let mut session = test_session();
        let before = render(&session).unwrap();

        session.toggle("M");
        session.toggle("M");

        assert_eq!(render(&session).unwrap(), before);
    }

    #[test]
    fn oversized_identifiers_fail_at_render() {
        let session = Session::new(
            1,
            "p".repeat(70),
            "https://example.com",
            "Oversized",
            vec!["M".into()],
        );
        assert!(render(&session).is_err());
    }
}
