//! Seat identity.

use std::fmt;

use crate::ProtocolError;

/// One of the four fixed player slots at the table.
///
/// A newtype over the seat index so a seat can never be confused with
/// an avatar id or a card count in a signature. Construction is
/// range-checked; arithmetic is cyclic because trading and turn order
/// both wrap around the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seat(u8);

impl Seat {
    /// Number of seats at the table.
    pub const COUNT: usize = 4;

    /// All seats in index order.
    pub const ALL: [Seat; 4] = [Seat(0), Seat(1), Seat(2), Seat(3)];

    /// Creates a seat from an index, if in range.
    pub fn new(index: usize) -> Option<Seat> {
        (index < Self::COUNT).then(|| Seat(index as u8))
    }

    /// The seat's index, 0–3.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The seat `n` positions ahead, wrapping around the table.
    pub fn offset(self, n: usize) -> Seat {
        Seat(((self.index() + n) % Self::COUNT) as u8)
    }

    /// Parses a wire field into a seat.
    pub fn parse(field: &str) -> Result<Seat, ProtocolError> {
        field
            .parse::<usize>()
            .ok()
            .and_then(Seat::new)
            .ok_or_else(|| ProtocolError::BadField {
                field: "seat",
                value: field.to_string(),
            })
    }
}

/// Renders as the bare index — this is the wire form.
impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
