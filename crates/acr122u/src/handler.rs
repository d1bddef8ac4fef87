//! Application callbacks for presented cards

use crate::card::Card;

/// Receives every card newly presented to a watched reader
///
/// Calls happen on the thread that invoked
/// [`Context::serve`](crate::Context::serve), one at a time, in the order
/// the cards were detected.
pub trait Handler {
    /// Handle one presented card
    fn serve_card(&mut self, card: &Card);
}

// Implement handlers for closures
impl<F> Handler for F
where
    F: FnMut(&Card),
{
    fn serve_card(&mut self, card: &Card) {
        self(card)
    }
}
