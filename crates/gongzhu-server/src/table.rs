//! The table driver: seat occupancy, the frame state machine, and
//! trick play.
//!
//! One driver task per table walks each frame through a fixed phase
//! sequence. Every phase that needs input from the seats parks on one
//! of four aggregate barriers (ready, dealt, traded, shown); listener
//! tasks count those barriers down through the signal methods here.
//! A [`RoundGate`] pairs the current phase with per-seat dedup flags
//! so an out-of-phase or repeated signal can never skew a barrier.
//!
//! A seat vacated mid-round abandons the frame: the abandon epoch is
//! bumped, every parked task unwinds, and the driver starts a fresh
//! frame that waits for the table to fill again.

use std::fmt;
use std::sync::Arc;

use gongzhu_barrier::ResettableBarrier;
use gongzhu_cards::{
    Card, DECKS_PER_SHOE, Rank, Shoe, Suit, resolve_trick,
};
use gongzhu_protocol::{Seat, ServerMessage};
use rand::Rng;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::agent::{AgentPhase, PlayerAgent};
use crate::{ServerConfig, ServerError};

/// Seat gap each frame's trade sends cards across, cycling with the
/// frame number. A gap of zero skips the trading phase entirely.
const TRADE_GAP_CYCLE: [usize; 4] = [1, 2, 3, 0];

/// The card whose holders are favoured when drawing the first leader.
const OPENER: Card = Card::new(Rank::Two, Suit::Clubs);

fn trade_gap(frame: u64) -> usize {
    TRADE_GAP_CYCLE[((frame - 1) % 4) as usize]
}

// ---------------------------------------------------------------------------
// TablePhase
// ---------------------------------------------------------------------------

/// Where the driver currently is in the frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePhase {
    Setup,
    AwaitReady,
    Deal,
    AwaitAllDealt,
    Trade,
    AwaitTrade,
    Exhibit,
    AwaitExhibit,
    Play,
    Score,
    Reset,
}

impl TablePhase {
    /// `true` once cards are in flight: from the deal up to the frame
    /// boundary. Seats may only be taken outside this span, and a seat
    /// vacated inside it abandons the frame.
    pub fn mid_round(self) -> bool {
        !matches!(self, Self::Setup | Self::AwaitReady)
    }
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::AwaitReady => "await-ready",
            Self::Deal => "deal",
            Self::AwaitAllDealt => "await-all-dealt",
            Self::Trade => "trade",
            Self::AwaitTrade => "await-trade",
            Self::Exhibit => "exhibit",
            Self::AwaitExhibit => "await-exhibit",
            Self::Play => "play",
            Self::Score => "score",
            Self::Reset => "reset",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// RoundGate
// ---------------------------------------------------------------------------

/// The driver phase plus one dedup flag per seat and signal kind.
///
/// Signals are admitted under this lock, so a barrier count-down can
/// only happen once per seat per frame and only while the driver is in
/// a phase that expects it. The frame setup wipes the whole gate and
/// re-arms the barriers in one critical section.
struct RoundGate {
    phase: TablePhase,
    ready: [bool; Seat::COUNT],
    dealt: [bool; Seat::COUNT],
    traded: [bool; Seat::COUNT],
    shown: [bool; Seat::COUNT],
}

impl RoundGate {
    fn new(phase: TablePhase) -> Self {
        Self {
            phase,
            ready: [false; Seat::COUNT],
            dealt: [false; Seat::COUNT],
            traded: [false; Seat::COUNT],
            shown: [false; Seat::COUNT],
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// One four-seat table and its round state machine.
pub struct Table {
    config: ServerConfig,
    seats: Mutex<[Option<Arc<PlayerAgent>>; Seat::COUNT]>,

    ready: ResettableBarrier,
    dealt: ResettableBarrier,
    traded: ResettableBarrier,
    shown: ResettableBarrier,

    gate: Mutex<RoundGate>,
    /// Monotonic abandon epoch. Bumped when a mid-round vacancy kills
    /// the current frame; everything parked on the frame observes the
    /// bump and unwinds.
    abandon: watch::Sender<u64>,
    totals: Mutex<[i32; Seat::COUNT]>,
}

impl Table {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let (abandon, _) = watch::channel(0);
        Arc::new(Self {
            config,
            seats: Mutex::new(std::array::from_fn(|_| None)),
            ready: ResettableBarrier::new(Seat::COUNT as u32),
            dealt: ResettableBarrier::new(Seat::COUNT as u32),
            traded: ResettableBarrier::new(Seat::COUNT as u32),
            shown: ResettableBarrier::new(Seat::COUNT as u32),
            gate: Mutex::new(RoundGate::new(TablePhase::Setup)),
            abandon,
            totals: Mutex::new([0; Seat::COUNT]),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Seating
    // -----------------------------------------------------------------------

    /// Seats a new player and spawns its lifecycle task.
    ///
    /// # Errors
    /// Rejects the request with [`ServerError::SeatOccupied`] if the
    /// seat has an occupant, and with [`ServerError::RoundInProgress`]
    /// while cards are in flight — a client may simply retry after the
    /// frame boundary.
    pub async fn seat_player(
        self: &Arc<Self>,
        seat: Seat,
        avatar: u32,
        name: String,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<Arc<PlayerAgent>, ServerError> {
        let mut seats = self.seats.lock().await;
        let frame_open = {
            let gate = self.gate.lock().await;
            if gate.phase.mid_round() {
                return Err(ServerError::RoundInProgress);
            }
            gate.phase == TablePhase::AwaitReady
        };
        if seats[seat.index()].is_some() {
            return Err(ServerError::SeatOccupied(seat));
        }

        let agent = PlayerAgent::new(seat, avatar, name, outbound);
        agent.send(ServerMessage::TakeSeat { seat });
        let newcomer = ServerMessage::PlayerInfo {
            seat,
            avatar: agent.avatar(),
            name: agent.name().to_string(),
        };
        agent.send(newcomer.clone());
        for other in seats.iter().flatten() {
            other.send(newcomer.clone());
            agent.send(ServerMessage::PlayerInfo {
                seat: other.seat(),
                avatar: other.avatar(),
                name: other.name().to_string(),
            });
        }
        seats[seat.index()] = Some(Arc::clone(&agent));
        if frame_open {
            // The driver already opened this frame and counted the init
            // barriers of the seats it saw. Count the newcomer's here
            // so its lifecycle joins the frame in flight instead of
            // parking until the next one while the in-frame barriers
            // accumulate stale releases. The seats lock is held from
            // the phase read to this point, so the frame cannot open or
            // close in between.
            agent.frame_init().count_down();
        }
        drop(seats);

        let handle = tokio::spawn(
            Arc::clone(&agent).run_lifecycle(Arc::clone(self)),
        );
        agent.attach_lifecycle(handle).await;
        info!(seat = %seat, name = agent.name(), "seat taken");
        Ok(agent)
    }

    /// Vacates a seat after its connection dropped. Mid-round this
    /// abandons the frame; between frames it just retracts the seat's
    /// ready count.
    pub async fn handle_disconnect(&self, seat: Seat) {
        let agent = self.seats.lock().await[seat.index()].take();
        let Some(agent) = agent else { return };
        warn!(seat = %seat, name = agent.name(), "connection lost, vacating seat");

        self.totals.lock().await[seat.index()] = 0;
        {
            let mut gate = self.gate.lock().await;
            if gate.phase.mid_round() {
                self.abandon.send_modify(|e| *e += 1);
            } else if std::mem::replace(
                &mut gate.ready[seat.index()],
                false,
            ) {
                self.ready.count_up();
            }
        }
        self.broadcast(ServerMessage::ConnReset { seat }).await;
    }

    async fn full_table(&self) -> Option<[Arc<PlayerAgent>; Seat::COUNT]> {
        let seats = self.seats.lock().await;
        let all: Option<Vec<_>> = seats.iter().cloned().collect();
        all.and_then(|v| v.try_into().ok())
    }

    /// Sends a message to every occupied seat.
    pub async fn broadcast(&self, msg: ServerMessage) {
        for agent in self.seats.lock().await.iter().flatten() {
            agent.send(msg.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Signals from the listeners
    // -----------------------------------------------------------------------

    pub async fn signal_ready(&self, seat: Seat) {
        let admitted = {
            let mut gate = self.gate.lock().await;
            if !matches!(
                gate.phase,
                TablePhase::Setup | TablePhase::AwaitReady
            ) {
                debug!(seat = %seat, phase = %gate.phase, "ready signal out of phase");
                false
            } else if std::mem::replace(&mut gate.ready[seat.index()], true)
            {
                false
            } else {
                self.ready.count_down();
                true
            }
        };
        if admitted {
            self.broadcast(ServerMessage::IsReady { seat }).await;
        }
    }

    pub async fn signal_dealt(&self, seat: Seat) {
        let mut gate = self.gate.lock().await;
        if !matches!(
            gate.phase,
            TablePhase::Deal | TablePhase::AwaitAllDealt
        ) {
            debug!(seat = %seat, phase = %gate.phase, "all-dealt signal out of phase");
            return;
        }
        if !std::mem::replace(&mut gate.dealt[seat.index()], true) {
            self.dealt.count_down();
        }
    }

    pub async fn signal_traded(&self, seat: Seat) {
        let admitted = {
            let mut gate = self.gate.lock().await;
            if !matches!(
                gate.phase,
                TablePhase::Trade | TablePhase::AwaitTrade
            ) {
                debug!(seat = %seat, phase = %gate.phase, "trade signal out of phase");
                false
            } else if std::mem::replace(
                &mut gate.traded[seat.index()],
                true,
            ) {
                false
            } else {
                self.traded.count_down();
                true
            }
        };
        if admitted {
            self.broadcast(ServerMessage::TradeReady { seat }).await;
        }
    }

    pub async fn signal_shown(&self, seat: Seat) {
        let mut gate = self.gate.lock().await;
        if !matches!(
            gate.phase,
            TablePhase::Exhibit | TablePhase::AwaitExhibit
        ) {
            debug!(seat = %seat, phase = %gate.phase, "show signal out of phase");
            return;
        }
        if !std::mem::replace(&mut gate.shown[seat.index()], true) {
            self.shown.count_down();
        }
    }

    // -----------------------------------------------------------------------
    // Abandon epoch
    // -----------------------------------------------------------------------

    pub fn epoch(&self) -> u64 {
        *self.abandon.borrow()
    }

    /// Resolves once the abandon epoch moves past `epoch`.
    pub async fn abandoned(&self, epoch: u64) {
        let mut rx = self.abandon.subscribe();
        // The sender lives in `self`, so the channel never closes here.
        let _ = rx.wait_for(|e| *e > epoch).await;
    }

    async fn phase_wait(
        &self,
        barrier: &ResettableBarrier,
        epoch: u64,
    ) -> Result<(), ServerError> {
        tokio::select! {
            () = barrier.wait() => Ok(()),
            () = self.abandoned(epoch) => Err(ServerError::RoundAbandoned),
        }
    }

    async fn set_phase(&self, phase: TablePhase) {
        self.gate.lock().await.phase = phase;
        debug!(phase = %phase, "table phase");
    }

    // -----------------------------------------------------------------------
    // Driver
    // -----------------------------------------------------------------------

    /// Runs frames forever. An abandoned frame bumps the epoch so every
    /// straggler unwinds, then the next frame waits for a full table
    /// again.
    pub async fn run_driver(self: Arc<Self>) {
        let mut frame: u64 = 0;
        loop {
            frame += 1;
            match self.run_frame(frame).await {
                Ok(()) => {}
                Err(ServerError::RoundAbandoned) => {
                    info!(frame, "frame abandoned, recovering");
                    self.abandon.send_modify(|e| *e += 1);
                }
                Err(e) => {
                    error!(frame, error = %e, "table driver failed");
                    return;
                }
            }
        }
    }

    async fn run_frame(&self, frame: u64) -> Result<(), ServerError> {
        let epoch = self.epoch();
        let gap = trade_gap(frame);
        info!(frame, gap, "starting frame");

        // Setup. Re-arm the barriers and wipe the gate in one critical
        // section so no signal for this frame can land before the
        // barriers are fresh.
        {
            let mut gate = self.gate.lock().await;
            self.ready.reset();
            self.dealt.reset();
            self.traded.reset();
            self.shown.reset();
            *gate = RoundGate::new(TablePhase::Setup);
        }
        self.broadcast(ServerMessage::NewFrame {
            decks: DECKS_PER_SHOE,
        })
        .await;
        // Open the frame: flip to AwaitReady and count every seated
        // agent's init barrier while holding the seats lock, so a
        // concurrent sit-down either lands in this snapshot or observes
        // the open phase and counts its own barrier: exactly one of
        // the two, never both and never neither.
        let opened = {
            let seats = self.seats.lock().await;
            let mut gate = self.gate.lock().await;
            gate.phase = TablePhase::AwaitReady;
            let opened: Vec<_> =
                seats.iter().flatten().cloned().collect();
            for agent in &opened {
                agent.frame_init().count_down();
            }
            opened
        };
        debug!(phase = %TablePhase::AwaitReady, "table phase");
        for agent in opened {
            agent.set_phase(AgentPhase::Ready).await;
        }
        self.phase_wait(&self.ready, epoch).await?;

        // Deal. Every seat must still be occupied once cards go out.
        self.set_phase(TablePhase::Deal).await;
        let Some(agents) = self.full_table().await else {
            return Err(ServerError::RoundAbandoned);
        };
        for agent in &agents {
            agent.set_phase(AgentPhase::AllDealt).await;
        }
        self.broadcast(ServerMessage::Deal).await;
        let mut shoe = Shoe::build();
        let start = ((frame - 1) % Seat::COUNT as u64) as usize;
        let deal_total = self
            .config
            .test_hand_size
            .map(|n| n * Seat::COUNT)
            .unwrap_or_else(|| shoe.remaining());
        for i in 0..deal_total {
            let Some(card) = shoe.deal_card() else { break };
            agents[(start + i) % Seat::COUNT].add_card(card).await;
        }
        self.set_phase(TablePhase::AwaitAllDealt).await;
        self.phase_wait(&self.dealt, epoch).await?;

        // Trade, skipped on gap-zero frames.
        if gap != 0 {
            self.set_phase(TablePhase::Trade).await;
            for agent in &agents {
                agent.set_phase(AgentPhase::Trade).await;
            }
            self.broadcast(ServerMessage::TradeStart { gap }).await;
            self.set_phase(TablePhase::AwaitTrade).await;
            self.phase_wait(&self.traded, epoch).await?;
            for agent in &agents {
                let outgoing = agent.take_outgoing().await;
                let to = agent.seat().offset(gap);
                agents[to.index()].receive_trade(outgoing).await;
            }
        }

        // Exhibit.
        self.set_phase(TablePhase::Exhibit).await;
        for agent in &agents {
            agent.set_phase(AgentPhase::Show).await;
        }
        self.broadcast(ServerMessage::Exhibit).await;
        self.set_phase(TablePhase::AwaitExhibit).await;
        self.phase_wait(&self.shown, epoch).await?;
        for agent in &agents {
            let requested = agent.take_shown().await;
            let shown = agent.expose(&requested).await?;
            self.broadcast(ServerMessage::Shown {
                seat: agent.seat(),
                cards: shown,
            })
            .await;
        }

        // Play.
        self.set_phase(TablePhase::Play).await;
        for agent in &agents {
            agent.set_phase(AgentPhase::Play).await;
            agent.frame_playing().count_down();
        }
        let mut leader = self.draw_leader(&agents).await;
        info!(frame, leader = %leader, "play opens");
        while !agents[leader.index()].hand_is_empty().await {
            let mut plays: [Vec<Card>; Seat::COUNT] = Default::default();
            for turn in 0..Seat::COUNT {
                let seat = leader.offset(turn);
                let agent = &agents[seat.index()];
                let cards = tokio::select! {
                    cards = agent.play_turn() => cards,
                    () = self.abandoned(epoch) => {
                        return Err(ServerError::RoundAbandoned);
                    }
                };
                agent.remove_from_hand(&cards).await;
                let msg = if turn == 0 {
                    ServerMessage::Lead {
                        seat,
                        cards: cards.clone(),
                    }
                } else {
                    ServerMessage::Follow {
                        seat,
                        cards: cards.clone(),
                    }
                };
                self.broadcast(msg).await;
                plays[turn] = cards;
            }
            let winner = Seat::ALL[resolve_trick(leader.index(), &plays)];
            let captured: Vec<Card> = plays
                .iter()
                .flatten()
                .filter(|c| c.is_scoring())
                .copied()
                .collect();
            if !captured.is_empty() {
                agents[winner.index()].add_assets(&captured).await;
                self.broadcast(ServerMessage::Asset {
                    seat: winner,
                    cards: captured,
                })
                .await;
            }
            leader = winner;
        }

        // Score.
        self.set_phase(TablePhase::Score).await;
        let totals = {
            let mut totals = self.totals.lock().await;
            for agent in &agents {
                let score = agent.round_score(&self.config.rules).await;
                totals[agent.seat().index()] += score;
                info!(frame, seat = %agent.seat(), score, "frame scored");
            }
            *totals
        };
        self.broadcast(ServerMessage::EndFrame { totals }).await;

        // Frame boundary: let the lifecycles clear their round state
        // and park at the top of the next frame.
        self.set_phase(TablePhase::Reset).await;
        for agent in &agents {
            agent.frame_ending().count_down();
        }
        Ok(())
    }

    /// Picks the first leader: a weighted draw over how many opener
    /// cards each seat holds, uniform when nobody holds one.
    async fn draw_leader(
        &self,
        agents: &[Arc<PlayerAgent>; Seat::COUNT],
    ) -> Seat {
        let mut weights = [0usize; Seat::COUNT];
        for (i, agent) in agents.iter().enumerate() {
            weights[i] = agent.count_in_hand(&OPENER).await;
        }
        let total: usize = weights.iter().sum();
        let mut rng = rand::rng();
        if total == 0 {
            return Seat::ALL[rng.random_range(0..Seat::COUNT)];
        }
        let mut pick = rng.random_range(0..total);
        for (i, weight) in weights.into_iter().enumerate() {
            if pick < weight {
                return Seat::ALL[i];
            }
            pick -= weight;
        }
        Seat::ALL[0]
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(i: usize) -> Seat {
        Seat::new(i).unwrap()
    }

    #[test]
    fn test_trade_gap_cycles_one_two_three_none() {
        let gaps: Vec<usize> = (1..=8).map(trade_gap).collect();
        assert_eq!(gaps, [1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_mid_round_classification() {
        assert!(!TablePhase::Setup.mid_round());
        assert!(!TablePhase::AwaitReady.mid_round());
        assert!(TablePhase::Deal.mid_round());
        assert!(TablePhase::Play.mid_round());
        assert!(TablePhase::Reset.mid_round());
    }

    #[tokio::test]
    async fn test_ready_signal_counts_once_per_seat() {
        let table = Table::new(ServerConfig::default());
        table.signal_ready(seat(0)).await;
        table.signal_ready(seat(0)).await;
        table.signal_ready(seat(1)).await;
        assert_eq!(table.ready.count(), 2);
    }

    #[tokio::test]
    async fn test_out_of_phase_signal_is_dropped() {
        let table = Table::new(ServerConfig::default());
        // The deal has not started, so an all-dealt signal is noise.
        table.signal_dealt(seat(0)).await;
        assert_eq!(table.dealt.count(), 4);
    }

    #[tokio::test]
    async fn test_seat_taken_during_setup_waits_for_the_frame_open() {
        let table = Table::new(ServerConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let agent = table
            .seat_player(seat(0), 1, "early".into(), tx)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        // The driver counts this barrier when it opens the frame, so
        // it must not be pre-counted here.
        assert_eq!(agent.frame_init().count(), 1);
    }

    #[tokio::test]
    async fn test_seat_taken_mid_await_ready_joins_the_open_frame() {
        let table = Table::new(ServerConfig::default());
        table.gate.lock().await.phase = TablePhase::AwaitReady;
        let (tx, _rx) = mpsc::unbounded_channel();
        let agent = table
            .seat_player(seat(0), 1, "newcomer".into(), tx)
            .await
            .unwrap();

        // Drive the joined frame to its boundary.
        agent.frame_playing().count_down();
        agent.frame_ending().count_down();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // The lifecycle consumed both in-frame count-downs and re-armed
        // the barriers; a lifecycle parked outside the frame would have
        // left stale zero counts here.
        assert_eq!(agent.frame_playing().count(), 1);
        assert_eq!(agent.frame_ending().count(), 1);

        // Open the next frame and deal immediately: the round-state
        // cleanup already ran at the boundary, so the card survives.
        agent.frame_init().count_down();
        let dealt = Card::parse_alias("QS").unwrap();
        agent.add_card(dealt).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(agent.count_in_hand(&dealt).await, 1);
    }

    #[tokio::test]
    async fn test_abandoned_resolves_only_for_newer_epochs() {
        let table = Table::new(ServerConfig::default());
        let old = table.epoch();
        table.abandon.send_modify(|e| *e += 1);
        // Resolves immediately for the stale snapshot.
        table.abandoned(old).await;
        assert_eq!(table.epoch(), old + 1);
    }
}
