//! End-to-end tests: four scripted clients against a real listening
//! server, driving a complete frame over the wire.

use std::net::SocketAddr;
use std::time::Duration;

use gongzhu_cards::{AssetPile, Card, ScoreRules};
use gongzhu_server::{GameServer, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// Cards dealt per seat in test mode. Small hands keep the scripted
/// frame short while still exercising trading and several tricks.
const HAND: usize = 4;

async fn start_server() -> SocketAddr {
    let config = ServerConfig {
        listen_addr: "127.0.0.1:0".into(),
        test_hand_size: Some(HAND),
        ..ServerConfig::default()
    };
    let server = GameServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

// ---------------------------------------------------------------------------
// Scripted client
// ---------------------------------------------------------------------------

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    /// Every received line, split into fields, for post-hoc checks.
    log: Vec<Vec<String>>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> TestClient {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        TestClient {
            lines: BufReader::new(read_half).lines(),
            writer,
            log: Vec::new(),
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Vec<String> {
        let line = timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("timed out waiting for a server line")
            .unwrap()
            .expect("server closed the connection");
        let mut fields: Vec<String> =
            line.split("==").map(str::to_string).collect();
        assert_eq!(fields.remove(0), "SERVERMESSAGE", "line: {line}");
        self.log.push(fields.clone());
        fields
    }

    /// Reads (and logs) lines until one with the given verb arrives.
    async fn recv_until(&mut self, verb: &str) -> Vec<String> {
        loop {
            let fields = self.recv().await;
            if fields[0] == verb {
                return fields;
            }
        }
    }
}

/// Sends the sit-down handshake and the one-time READY.
async fn take_seat(c: &mut TestClient, seat: usize) {
    c.recv_until("WELCOME").await;
    c.send(&format!("FROMCLIENT~~SITDOWN~~{seat}~~1~~player{seat}"))
        .await;
    c.recv_until("TAKESEAT").await;
    c.send("FROMCLIENT~~READY").await;
}

/// Walks the current frame from the deal through the exposure phase,
/// returning the hand aliases after trading.
async fn deal_trade_show(
    c: &mut TestClient,
    expected_gap: &str,
) -> Vec<String> {
    let mut hand: Vec<String> = Vec::new();
    while hand.len() < HAND {
        let fields = c.recv().await;
        if fields[0] == "ADD" {
            hand.push(fields[1].clone());
        }
    }
    c.send("FROMCLIENT~~ALLDEALT").await;

    let trade = c.recv_until("TRADESTART").await;
    assert_eq!(trade[1], expected_gap);
    let outgoing: Vec<String> = hand.drain(..3).collect();
    c.send(&format!("FROMCLIENT~~TRADE~~{}", outgoing.join("~~")))
        .await;
    let incoming = c.recv_until("TRADEIN").await;
    hand.extend(incoming[1..].iter().cloned());
    assert_eq!(hand.len(), HAND);

    c.recv_until("EXHIBIT").await;
    c.send("FROMCLIENT~~SHOW").await;
    hand
}

/// Plays the current frame to its end and returns the ENDFRAME fields.
async fn play_frame(
    c: &mut TestClient,
    expected_gap: &str,
) -> Vec<String> {
    let hand = deal_trade_show(c, expected_gap).await;
    // The server buffers plays ahead of the seat's turn, so the whole
    // hand can be queued immediately.
    for card in &hand {
        c.send(&format!("FROMCLIENT~~PLAY~~{card}")).await;
    }
    c.recv_until("ENDFRAME").await
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_round_reaches_endframe_with_consistent_totals() {
    let addr = start_server().await;

    let tasks: Vec<_> = (0..4)
        .map(|seat| {
            tokio::spawn(async move {
                let mut c = TestClient::connect(addr).await;
                take_seat(&mut c, seat).await;
                play_frame(&mut c, "1").await;
                c.log
            })
        })
        .collect();
    let mut logs = Vec::new();
    for task in tasks {
        logs.push(task.await.unwrap());
    }

    // Every seat saw the same final totals.
    let endframes: Vec<Vec<String>> = logs
        .iter()
        .map(|log| {
            log.iter().find(|f| f[0] == "ENDFRAME").unwrap().clone()
        })
        .collect();
    for endframe in &endframes[1..] {
        assert_eq!(endframe, &endframes[0]);
    }
    let totals: Vec<i32> = endframes[0][1..]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(totals.len(), 4);

    // Rebuild the piles from the asset broadcasts and check that the
    // totals match the scoring arithmetic.
    let rules = ScoreRules::default();
    let mut piles: Vec<AssetPile> =
        (0..4).map(|_| AssetPile::new()).collect();
    for fields in logs[0].iter().filter(|f| f[0] == "ASSET") {
        let seat: usize = fields[1].parse().unwrap();
        piles[seat].add(
            fields[2..]
                .iter()
                .map(|alias| Card::parse_alias(alias).unwrap()),
        );
    }
    for (seat, pile) in piles.iter().enumerate() {
        assert_eq!(
            pile.round_score(&rules),
            totals[seat],
            "seat {seat} total disagrees with its pile"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_totals_accumulate_over_consecutive_frames() {
    let addr = start_server().await;

    let tasks: Vec<_> = (0..4)
        .map(|seat| {
            tokio::spawn(async move {
                let mut c = TestClient::connect(addr).await;
                take_seat(&mut c, seat).await;
                let first = play_frame(&mut c, "1").await;
                // Readiness latches for the life of the seat: frame
                // two opens on the original READY.
                let second = play_frame(&mut c, "2").await;
                (c.log, first, second)
            })
        })
        .collect();
    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    // Every seat saw the same totals at both frame boundaries.
    for (_, first, second) in &results[1..] {
        assert_eq!(first, &results[0].1);
        assert_eq!(second, &results[0].2);
    }
    let (log, first, second) = &results[0];
    let first: Vec<i32> =
        first[1..].iter().map(|s| s.parse().unwrap()).collect();
    let second: Vec<i32> =
        second[1..].iter().map(|s| s.parse().unwrap()).collect();

    // The second frame dealt a complete fresh hand and played a full
    // set of tricks.
    let boundary = log.iter().position(|f| f[0] == "ENDFRAME").unwrap();
    let frame_two = &log[boundary + 1..];
    assert_eq!(frame_two.iter().filter(|f| f[0] == "ADD").count(), HAND);
    assert_eq!(frame_two.iter().filter(|f| f[0] == "LEAD").count(), HAND);

    // Totals carry across the boundary: the second ENDFRAME is the
    // first plus the second frame's pile scores.
    let rules = ScoreRules::default();
    let mut piles: Vec<AssetPile> =
        (0..4).map(|_| AssetPile::new()).collect();
    for fields in frame_two.iter().filter(|f| f[0] == "ASSET") {
        let seat: usize = fields[1].parse().unwrap();
        piles[seat].add(
            fields[2..]
                .iter()
                .map(|alias| Card::parse_alias(alias).unwrap()),
        );
    }
    for seat in 0..4 {
        assert_eq!(
            second[seat],
            first[seat] + piles[seat].round_score(&rules),
            "seat {seat} running total disagrees with its frame-two pile"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnect_mid_play_resets_round_without_killing_table() {
    let addr = start_server().await;

    // Seat 0 walks up to the start of play, then drops its socket.
    let dropper = tokio::spawn(async move {
        let mut c = TestClient::connect(addr).await;
        take_seat(&mut c, 0).await;
        deal_trade_show(&mut c, "1").await;
        // All four exposure announcements mean play is about to open.
        for _ in 0..4 {
            c.recv_until("SHOWN").await;
        }
        drop(c);
    });

    // The survivors never play; they just watch the round collapse and
    // a fresh frame open.
    let survivors: Vec<_> = (1..4)
        .map(|seat| {
            tokio::spawn(async move {
                let mut c = TestClient::connect(addr).await;
                take_seat(&mut c, seat).await;
                deal_trade_show(&mut c, "1").await;
                let reset = c.recv_until("CONNRESET").await;
                assert_eq!(reset[1], "0");
                c.recv_until("NEWFRAME").await;
                c
            })
        })
        .collect();

    dropper.await.unwrap();
    // Keep the survivor connections open so their seats stay occupied.
    let mut kept = Vec::new();
    for task in survivors {
        kept.push(task.await.unwrap());
    }

    // The vacated seat can be taken again.
    let mut replacement = TestClient::connect(addr).await;
    replacement.recv_until("WELCOME").await;
    replacement
        .send("FROMCLIENT~~SITDOWN~~0~~2~~replacement")
        .await;
    replacement.recv_until("TAKESEAT").await;
    drop(kept);
}
