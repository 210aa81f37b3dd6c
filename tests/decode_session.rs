//! End-to-end decoding sessions driven through the public API

use morse_decoder::decoder::{Decoder, DecoderStats, Thresholds};
use morse_decoder::events::DecodeEvent;
use morse_decoder::input::KeyEvent;
use morse_decoder::TimingConfig;
use tokio::sync::{broadcast, mpsc};

/// Build key edges for a pattern like `"... --- / .-"`
///
/// `.` and `-` are symbols, a space ends a letter, `/` ends a word. Each
/// duration is stretched by the next factor in `jitter`.
fn keying(pattern: &str, unit: f64, jitter: &[f64]) -> Vec<KeyEvent> {
    let mut events = Vec::new();
    let mut factors = jitter.iter().cycle();
    let mut t: f64 = 0.0;
    let mut gap: f64 = 0.0;

    for c in pattern.chars() {
        let held = match c {
            '.' => 1.0,
            '-' => 3.0,
            ' ' => {
                gap = gap.max(3.0);
                continue;
            }
            '/' => {
                gap = 7.0;
                continue;
            }
            other => panic!("unexpected pattern character {other:?}"),
        };

        if !events.is_empty() {
            t += gap.max(1.0) * unit * factors.next().unwrap();
        }
        events.push(KeyEvent::Pressed(t));
        t += held * unit * factors.next().unwrap();
        events.push(KeyEvent::Released(t));
        gap = 0.0;
    }

    // Closing press after a letter gap flushes the last letter
    t += 3.0 * unit * factors.next().unwrap();
    events.push(KeyEvent::Pressed(t));
    events
}

fn decode(events: &[KeyEvent], thresholds: Thresholds) -> (String, DecoderStats) {
    let (tx, _rx) = broadcast::channel(256);
    let mut decoder = Decoder::new(thresholds, tx);
    for event in events {
        decoder.handle_event(*event);
    }
    (decoder.current_decoded_text().to_string(), decoder.stats())
}

#[test]
fn test_sos() {
    let events = keying("... --- ...", 1.0, &[1.0]);
    let (text, stats) = decode(&events, Thresholds::from_unit(1.0));
    assert_eq!(text, "SOS");
    assert_eq!(stats.symbols, 9);
    assert_eq!(stats.letters, 3);
    assert_eq!(stats.rejected_edges, 0);
}

#[test]
fn test_words_with_jitter() {
    let pattern = ".... . .-.. .-.. --- / .-- --- .-. .-.. -..";
    let events = keying(pattern, 0.2, &[1.05, 1.2, 1.1, 1.15]);
    let thresholds = TimingConfig::default().thresholds().unwrap();
    let (text, stats) = decode(&events, thresholds);
    assert_eq!(text, "HELLO WORLD");
    assert_eq!(stats.words, 1);
    assert_eq!(stats.unknown_letters, 0);
}

#[test]
fn test_digits() {
    let events = keying("..--- ----- ..--- -....", 0.1, &[1.1]);
    let (text, _) = decode(&events, Thresholds::from_unit(0.1));
    assert_eq!(text, "2026");
}

#[test]
fn test_resynchronizes_after_bad_edge() {
    let mut events = keying(".- -...", 1.0, &[1.0]);
    // Stale release from a skewed clock, then a duplicate press.
    events.insert(2, KeyEvent::Released(0.5));
    events.insert(4, KeyEvent::Pressed(2.5));

    let (text, stats) = decode(&events, Thresholds::from_unit(1.0));
    assert_eq!(text, "AB");
    assert_eq!(stats.rejected_edges, 2);
}

#[tokio::test]
async fn test_channel_session_emits_events() {
    let (event_tx, mut event_rx) = broadcast::channel(256);
    let (key_tx, key_rx) = mpsc::channel(64);
    let mut decoder = Decoder::new(Thresholds::from_unit(1.0), event_tx);

    let events = keying("- . ... - / --- -.-", 1.0, &[1.0, 1.1]);
    tokio::spawn(async move {
        for event in events {
            key_tx.send(event).await.unwrap();
        }
    });

    decoder.run(key_rx).await;
    assert_eq!(decoder.current_decoded_text(), "TEST OK");

    let mut letters = String::new();
    while let Ok(event) = event_rx.try_recv() {
        match event {
            DecodeEvent::LetterDecoded { letter, .. } => letters.push(letter),
            DecodeEvent::WordCompleted { .. } => letters.push(' '),
            _ => {}
        }
    }
    assert_eq!(letters, "TEST OK");
}
