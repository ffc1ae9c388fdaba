//! The messages that travel on the wire, in both directions.

use std::fmt;

use gongzhu_cards::Card;

use crate::{
    INBOUND_PREFIX, INBOUND_SEP, OUTBOUND_PREFIX, OUTBOUND_SEP,
    ProtocolError, Seat,
};

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// A message from the table to one or more display clients.
///
/// `Display` renders the complete outbound line (without the trailing
/// newline): the `SERVERMESSAGE` prefix, the verb, and the fields, all
/// joined by `==`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Greets a freshly accepted connection.
    Welcome,
    /// Confirms a seat assignment to the sitting client.
    TakeSeat { seat: Seat },
    /// Announces a seat's occupant to everyone.
    PlayerInfo {
        seat: Seat,
        avatar: u32,
        name: String,
    },
    /// Rejects a sit-down attempt (seat occupied).
    DoNotSit,
    /// Announces a new frame and the shoe's deck count.
    NewFrame { decks: usize },
    /// Announces that a seat has signalled ready.
    IsReady { seat: Seat },
    /// Announces that the deal is starting.
    Deal,
    /// Delivers one dealt card to its owner.
    Add { card: Card },
    /// Opens the trading phase with the cyclic seat gap.
    TradeStart { gap: usize },
    /// Announces that a seat has chosen its outgoing trade.
    TradeReady { seat: Seat },
    /// Delivers the three traded-in cards to their new owner.
    TradeIn { cards: Vec<Card> },
    /// Opens the exposure phase.
    Exhibit,
    /// Announces the cards a seat exposed (possibly none).
    Shown { seat: Seat, cards: Vec<Card> },
    /// Announces the trick leader's play.
    Lead { seat: Seat, cards: Vec<Card> },
    /// Announces a following play.
    Follow { seat: Seat, cards: Vec<Card> },
    /// Announces the scoring cards captured by a trick's winner.
    Asset { seat: Seat, cards: Vec<Card> },
    /// Announces the running totals at the end of a frame.
    EndFrame { totals: [i32; 4] },
    /// Announces that a seat's connection was lost.
    ConnReset { seat: Seat },
}

fn write_cards(
    f: &mut fmt::Formatter<'_>,
    cards: &[Card],
) -> fmt::Result {
    for card in cards {
        write!(f, "{OUTBOUND_SEP}{card}")?;
    }
    Ok(())
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OUTBOUND_PREFIX}{OUTBOUND_SEP}")?;
        match self {
            Self::Welcome => write!(f, "WELCOME"),
            Self::TakeSeat { seat } => {
                write!(f, "TAKESEAT{OUTBOUND_SEP}{seat}")
            }
            Self::PlayerInfo {
                seat,
                avatar,
                name,
            } => write!(
                f,
                "PLAYERINFO{OUTBOUND_SEP}{seat}{OUTBOUND_SEP}{avatar}{OUTBOUND_SEP}{name}"
            ),
            Self::DoNotSit => write!(f, "DONOTSIT"),
            Self::NewFrame { decks } => {
                write!(f, "NEWFRAME{OUTBOUND_SEP}{decks}")
            }
            Self::IsReady { seat } => {
                write!(f, "ISREADY{OUTBOUND_SEP}{seat}")
            }
            Self::Deal => write!(f, "DEAL"),
            Self::Add { card } => {
                write!(f, "ADD{OUTBOUND_SEP}{card}")
            }
            Self::TradeStart { gap } => {
                write!(f, "TRADESTART{OUTBOUND_SEP}{gap}")
            }
            Self::TradeReady { seat } => {
                write!(f, "TRADEREADY{OUTBOUND_SEP}{seat}")
            }
            Self::TradeIn { cards } => {
                write!(f, "TRADEIN")?;
                write_cards(f, cards)
            }
            Self::Exhibit => write!(f, "EXHIBIT"),
            Self::Shown { seat, cards } => {
                write!(f, "SHOWN{OUTBOUND_SEP}{seat}")?;
                write_cards(f, cards)
            }
            Self::Lead { seat, cards } => {
                write!(f, "LEAD{OUTBOUND_SEP}{seat}")?;
                write_cards(f, cards)
            }
            Self::Follow { seat, cards } => {
                write!(f, "FOLLOW{OUTBOUND_SEP}{seat}")?;
                write_cards(f, cards)
            }
            Self::Asset { seat, cards } => {
                write!(f, "ASSET{OUTBOUND_SEP}{seat}")?;
                write_cards(f, cards)
            }
            Self::EndFrame { totals } => {
                write!(f, "ENDFRAME")?;
                for total in totals {
                    write!(f, "{OUTBOUND_SEP}{total}")?;
                }
                Ok(())
            }
            Self::ConnReset { seat } => {
                write!(f, "CONNRESET{OUTBOUND_SEP}{seat}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// A message from a display client to the table.
///
/// Parsed from a full inbound line by [`ClientMessage::parse`];
/// `Display` renders the line back (used by test clients).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Request to occupy a seat.
    SitDown {
        seat: Seat,
        avatar: u32,
        name: String,
    },
    /// The seat is ready for the next frame.
    Ready,
    /// The seat has received its full hand.
    AllDealt,
    /// The seat's three outgoing trade cards.
    Trade { cards: Vec<Card> },
    /// The cards the seat exposes this frame (possibly none).
    Show { cards: Vec<Card> },
    /// The seat's play for its current turn: one or two cards.
    Play { cards: Vec<Card> },
}

impl ClientMessage {
    /// Parses one inbound line (trailing newline tolerated).
    pub fn parse(line: &str) -> Result<ClientMessage, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split(INBOUND_SEP);
        if fields.next() != Some(INBOUND_PREFIX) {
            return Err(ProtocolError::BadPrefix(line.to_string()));
        }
        let verb = fields
            .next()
            .ok_or(ProtocolError::MissingField("verb"))?;
        match verb {
            "SITDOWN" => {
                let seat = Seat::parse(
                    fields
                        .next()
                        .ok_or(ProtocolError::MissingField("seat"))?,
                )?;
                let avatar_field = fields
                    .next()
                    .ok_or(ProtocolError::MissingField("avatar"))?;
                let avatar = avatar_field.parse().map_err(|_| {
                    ProtocolError::BadField {
                        field: "avatar",
                        value: avatar_field.to_string(),
                    }
                })?;
                let name = fields
                    .next()
                    .ok_or(ProtocolError::MissingField("name"))?
                    .to_string();
                Ok(Self::SitDown {
                    seat,
                    avatar,
                    name,
                })
            }
            "READY" => Ok(Self::Ready),
            "ALLDEALT" => Ok(Self::AllDealt),
            "TRADE" => {
                let cards = parse_cards(fields)?;
                if cards.len() != 3 {
                    return Err(ProtocolError::WrongCardCount {
                        verb: "TRADE",
                        expected: "exactly 3",
                        got: cards.len(),
                    });
                }
                Ok(Self::Trade { cards })
            }
            "SHOW" => Ok(Self::Show {
                cards: parse_cards(fields)?,
            }),
            "PLAY" => {
                let cards = parse_cards(fields)?;
                if cards.is_empty() || cards.len() > 2 {
                    return Err(ProtocolError::WrongCardCount {
                        verb: "PLAY",
                        expected: "1 or 2",
                        got: cards.len(),
                    });
                }
                Ok(Self::Play { cards })
            }
            other => {
                Err(ProtocolError::UnknownMessage(other.to_string()))
            }
        }
    }
}

fn parse_cards<'a>(
    fields: impl Iterator<Item = &'a str>,
) -> Result<Vec<Card>, ProtocolError> {
    fields
        .filter(|field| !field.is_empty())
        .map(|field| Card::parse_alias(field).map_err(Into::into))
        .collect()
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INBOUND_PREFIX}{INBOUND_SEP}")?;
        match self {
            Self::SitDown {
                seat,
                avatar,
                name,
            } => write!(
                f,
                "SITDOWN{INBOUND_SEP}{seat}{INBOUND_SEP}{avatar}{INBOUND_SEP}{name}"
            ),
            Self::Ready => write!(f, "READY"),
            Self::AllDealt => write!(f, "ALLDEALT"),
            Self::Trade { cards } => {
                write!(f, "TRADE")?;
                for card in cards {
                    write!(f, "{INBOUND_SEP}{card}")?;
                }
                Ok(())
            }
            Self::Show { cards } => {
                write!(f, "SHOW")?;
                for card in cards {
                    write!(f, "{INBOUND_SEP}{card}")?;
                }
                Ok(())
            }
            Self::Play { cards } => {
                write!(f, "PLAY")?;
                for card in cards {
                    write!(f, "{INBOUND_SEP}{card}")?;
                }
                Ok(())
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
