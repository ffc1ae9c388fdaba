//! Per-seat agent: state, message handling, and the lifecycle task.
//!
//! Each occupied seat owns one [`PlayerAgent`] wrapped in an `Arc` and
//! driven by two tasks. The listener task reads inbound lines off the
//! socket and turns them into barrier signals; the lifecycle task walks
//! the seat through each frame in lock-step with the table driver. The
//! driver never touches a socket and the listener never touches round
//! state the driver is iterating.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gongzhu_barrier::ResettableBarrier;
use gongzhu_cards::{AssetPile, Card, CardError, ScoreRules};
use gongzhu_protocol::{ClientMessage, Seat, ServerMessage};
use tokio::io::{BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::table::Table;

// ---------------------------------------------------------------------------
// AgentPhase
// ---------------------------------------------------------------------------

/// The message a seat is expected to send next.
///
/// Used only for diagnostics: a message arriving out of phase is logged
/// and still processed, because the barriers already serialize the
/// round correctly and clients may legitimately run ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    SitDown,
    Ready,
    AllDealt,
    Trade,
    Show,
    Play,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SitDown => "sit-down",
            Self::Ready => "ready",
            Self::AllDealt => "all-dealt",
            Self::Trade => "trade",
            Self::Show => "show",
            Self::Play => "play",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// PlayerAgent
// ---------------------------------------------------------------------------

/// One occupied seat.
///
/// Holds the seat's hand and captured assets, the outbound message
/// channel, and the per-seat barriers the lifecycle task parks on.
pub struct PlayerAgent {
    seat: Seat,
    name: String,
    avatar: u32,
    outbound: mpsc::UnboundedSender<ServerMessage>,

    hand: Mutex<Vec<Card>>,
    assets: Mutex<AssetPile>,

    /// Latched ready flag. Survives an abandoned round so the seat does
    /// not have to repeat its READY after a mid-round disconnect
    /// elsewhere at the table.
    ready: AtomicBool,
    /// Set when the connection drops; the lifecycle task is aborted at
    /// the same moment.
    abnormal: AtomicBool,
    phase: Mutex<AgentPhase>,

    outgoing_trade: Mutex<Vec<Card>>,
    pending_shown: Mutex<Vec<Card>>,
    /// Plays buffered ahead of the seat's turn. The queue is the source
    /// of truth; the `turn` barrier is only a wakeup.
    pending_plays: Mutex<VecDeque<Vec<Card>>>,

    turn: ResettableBarrier,
    frame_init: ResettableBarrier,
    frame_playing: ResettableBarrier,
    frame_ending: ResettableBarrier,

    lifecycle: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerAgent {
    pub fn new(
        seat: Seat,
        avatar: u32,
        name: String,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            seat,
            name,
            avatar,
            outbound,
            hand: Mutex::new(Vec::new()),
            assets: Mutex::new(AssetPile::new()),
            ready: AtomicBool::new(false),
            abnormal: AtomicBool::new(false),
            phase: Mutex::new(AgentPhase::Ready),
            outgoing_trade: Mutex::new(Vec::new()),
            pending_shown: Mutex::new(Vec::new()),
            pending_plays: Mutex::new(VecDeque::new()),
            turn: ResettableBarrier::new(1),
            frame_init: ResettableBarrier::new(1),
            frame_playing: ResettableBarrier::new(1),
            frame_ending: ResettableBarrier::new(1),
            lifecycle: Mutex::new(None),
        })
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avatar(&self) -> u32 {
        self.avatar
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_abnormal(&self) -> bool {
        self.abnormal.load(Ordering::SeqCst)
    }

    fn mark_abnormal(&self) {
        self.abnormal.store(true, Ordering::SeqCst);
    }

    /// Queues one outbound message. A send failure means the writer
    /// task is gone, which the listener will notice on its own; it is
    /// not an error here.
    pub fn send(&self, msg: ServerMessage) {
        if self.outbound.send(msg).is_err() {
            debug!(seat = %self.seat, "outbound channel closed");
        }
    }

    // -----------------------------------------------------------------------
    // Hand and assets
    // -----------------------------------------------------------------------

    /// Adds one dealt card to the hand and echoes it to the client.
    pub async fn add_card(&self, card: Card) {
        self.hand.lock().await.push(card);
        self.send(ServerMessage::Add { card });
    }

    pub async fn hand_is_empty(&self) -> bool {
        self.hand.lock().await.is_empty()
    }

    /// Copies of `face` currently in the hand, counted by face alone.
    pub async fn count_in_hand(&self, face: &Card) -> usize {
        self.hand
            .lock()
            .await
            .iter()
            .filter(|c| c.same_face(face))
            .count()
    }

    pub async fn add_assets(&self, cards: &[Card]) {
        self.assets.lock().await.add(cards.iter().copied());
    }

    pub async fn round_score(&self, rules: &ScoreRules) -> i32 {
        self.assets.lock().await.round_score(rules)
    }

    // -----------------------------------------------------------------------
    // Trading
    // -----------------------------------------------------------------------

    /// Moves the named cards from the hand into the outgoing-trade
    /// buffer. Matching is by face; a card the hand does not hold is
    /// logged and skipped.
    pub async fn stage_trade(&self, cards: &[Card]) {
        let mut hand = self.hand.lock().await;
        let mut outgoing = self.outgoing_trade.lock().await;
        for card in cards {
            match hand.iter().position(|c| c.same_face(card)) {
                Some(i) => outgoing.push(hand.remove(i)),
                None => {
                    warn!(seat = %self.seat, card = %card, "trade names a card not in hand");
                }
            }
        }
    }

    pub async fn take_outgoing(&self) -> Vec<Card> {
        std::mem::take(&mut *self.outgoing_trade.lock().await)
    }

    /// Accepts the three cards traded in from another seat.
    pub async fn receive_trade(&self, cards: Vec<Card>) {
        self.hand.lock().await.extend(cards.iter().copied());
        self.send(ServerMessage::TradeIn { cards });
    }

    // -----------------------------------------------------------------------
    // Exposure
    // -----------------------------------------------------------------------

    pub async fn stage_shown(&self, cards: &[Card]) {
        self.pending_shown.lock().await.extend_from_slice(cards);
    }

    pub async fn take_shown(&self) -> Vec<Card> {
        std::mem::take(&mut *self.pending_shown.lock().await)
    }

    /// Raises the exposure level of each named card in the hand.
    ///
    /// When the hand holds both copies of a face, the less-exposed one
    /// is raised first. Returns the upgraded cards, for the broadcast.
    ///
    /// # Errors
    /// Propagates [`CardError::ExposureOverflow`]; with two copies per
    /// face and a cap of 2 this cannot trip on well-formed input, so a
    /// surfacing overflow is a rule-engine bug.
    pub async fn expose(
        &self,
        cards: &[Card],
    ) -> Result<Vec<Card>, CardError> {
        let mut hand = self.hand.lock().await;
        let mut upgraded = Vec::with_capacity(cards.len());
        for card in cards {
            let target = hand
                .iter_mut()
                .filter(|c| c.same_face(card))
                .min_by_key(|c| c.exposed());
            match target {
                Some(held) => {
                    held.upgrade(1)?;
                    upgraded.push(*held);
                }
                None => {
                    warn!(seat = %self.seat, card = %card, "show names a card not in hand");
                }
            }
        }
        Ok(upgraded)
    }

    // -----------------------------------------------------------------------
    // Playing
    // -----------------------------------------------------------------------

    /// Buffers a play and wakes the driver if it is parked on this
    /// seat's turn. Clients may send plays ahead of their turn.
    pub async fn buffer_play(&self, cards: Vec<Card>) {
        self.pending_plays.lock().await.push_back(cards);
        self.turn.count_down();
    }

    /// Awaits this seat's next play. Called by the table driver only
    /// when it is this seat's turn.
    pub async fn play_turn(&self) -> Vec<Card> {
        loop {
            if let Some(cards) = self.pending_plays.lock().await.pop_front()
            {
                self.turn.reset();
                return cards;
            }
            self.turn.wait().await;
        }
    }

    /// Removes the played cards from the hand, matching by face. A
    /// missing card is logged and skipped rather than aborting the
    /// trick.
    pub async fn remove_from_hand(&self, cards: &[Card]) {
        let mut hand = self.hand.lock().await;
        for card in cards {
            match hand.iter().position(|c| c.same_face(card)) {
                Some(i) => {
                    hand.remove(i);
                }
                None => {
                    warn!(seat = %self.seat, card = %card, "play names a card not in hand");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase bookkeeping
    // -----------------------------------------------------------------------

    async fn note_phase(&self, expected: AgentPhase, verb: &str) {
        let phase = *self.phase.lock().await;
        if phase != expected {
            warn!(
                seat = %self.seat,
                phase = %phase,
                verb,
                "message arrived ahead of phase"
            );
        }
    }

    pub async fn set_phase(&self, phase: AgentPhase) {
        *self.phase.lock().await = phase;
    }

    // -----------------------------------------------------------------------
    // Barriers and lifecycle
    // -----------------------------------------------------------------------

    pub fn frame_init(&self) -> &ResettableBarrier {
        &self.frame_init
    }

    pub fn frame_playing(&self) -> &ResettableBarrier {
        &self.frame_playing
    }

    pub fn frame_ending(&self) -> &ResettableBarrier {
        &self.frame_ending
    }

    pub async fn attach_lifecycle(&self, handle: JoinHandle<()>) {
        *self.lifecycle.lock().await = Some(handle);
    }

    /// Aborts the lifecycle task. Called when the connection drops.
    pub async fn interrupt(&self) {
        if let Some(handle) = self.lifecycle.lock().await.take() {
            handle.abort();
        }
    }

    /// Clears everything scoped to a single frame. The ready flag is
    /// deliberately kept: it spans frames until the seat is vacated.
    async fn clear_round_state(&self) {
        self.hand.lock().await.clear();
        self.assets.lock().await.clear();
        self.outgoing_trade.lock().await.clear();
        self.pending_shown.lock().await.clear();
        self.pending_plays.lock().await.clear();
        self.turn.reset();
        self.set_phase(AgentPhase::Ready).await;
    }

    /// The per-seat frame loop.
    ///
    /// Parks at the top of each frame until the driver opens it, then
    /// re-signals a latched READY, then rides the playing and ending
    /// barriers to the frame boundary. If the table abandons the round
    /// mid-frame the epoch watch fires instead of the barrier and the
    /// loop unwinds straight to cleanup.
    pub async fn run_lifecycle(self: Arc<Self>, table: Arc<Table>) {
        loop {
            self.frame_init.wait().await;
            self.frame_init.reset();
            let epoch = table.epoch();

            if self.is_ready() {
                table.signal_ready(self.seat).await;
            }

            let playing = tokio::select! {
                () = self.frame_playing.wait() => {
                    self.frame_playing.reset();
                    true
                }
                () = table.abandoned(epoch) => false,
            };
            if playing {
                tokio::select! {
                    () = self.frame_ending.wait() => {
                        self.frame_ending.reset();
                    }
                    () = table.abandoned(epoch) => {}
                }
            }

            self.clear_round_state().await;
        }
    }

    // -----------------------------------------------------------------------
    // Listener
    // -----------------------------------------------------------------------

    /// Reads inbound lines until the connection closes, then vacates
    /// the seat.
    pub async fn run_listener(
        self: Arc<Self>,
        table: Arc<Table>,
        mut lines: Lines<BufReader<OwnedReadHalf>>,
    ) {
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!(seat = %self.seat, error = %e, "read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let msg = match ClientMessage::parse(&line) {
                Ok(msg) => msg,
                Err(e @ gongzhu_protocol::ProtocolError::BadCard(_)) => {
                    // A malformed card alias means the client and the
                    // table no longer agree on state. Cut the
                    // connection rather than guess.
                    error!(seat = %self.seat, error = %e, "unreadable card alias, dropping connection");
                    break;
                }
                Err(e) => {
                    warn!(seat = %self.seat, error = %e, line = %line, "ignoring unparseable line");
                    continue;
                }
            };
            self.handle_message(&table, msg).await;
        }

        self.mark_abnormal();
        self.interrupt().await;
        table.handle_disconnect(self.seat).await;
    }

    async fn handle_message(&self, table: &Arc<Table>, msg: ClientMessage) {
        match msg {
            ClientMessage::Ready => {
                self.note_phase(AgentPhase::Ready, "READY").await;
                if !self.ready.swap(true, Ordering::SeqCst) {
                    table.signal_ready(self.seat).await;
                }
            }
            ClientMessage::AllDealt => {
                self.note_phase(AgentPhase::AllDealt, "ALLDEALT").await;
                table.signal_dealt(self.seat).await;
            }
            ClientMessage::Trade { cards } => {
                self.note_phase(AgentPhase::Trade, "TRADE").await;
                self.stage_trade(&cards).await;
                table.signal_traded(self.seat).await;
            }
            ClientMessage::Show { cards } => {
                self.note_phase(AgentPhase::Show, "SHOW").await;
                self.stage_shown(&cards).await;
                table.signal_shown(self.seat).await;
            }
            ClientMessage::Play { cards } => {
                self.note_phase(AgentPhase::Play, "PLAY").await;
                self.buffer_play(cards).await;
            }
            ClientMessage::SitDown { .. } => {
                warn!(seat = %self.seat, "sit-down from an already seated client ignored");
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
