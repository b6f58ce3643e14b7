//! Frame-level decode tests over synthetically encoded telegrams.

use clock_core::telegram::TelegramDecoder;
use clock_core::test_utils::{corrupt_bit, encode_frame, frame_events, FrameSpec};
use clock_core::types::Telegram;
use rstest::rstest;

fn decode(bits: &[u8; 59]) -> Option<Telegram> {
    let mut decoder = TelegramDecoder::new();
    let mut committed = None;
    for event in frame_events(bits) {
        committed = committed.or(decoder.feed(event));
    }
    committed
}

#[test]
fn clean_frame_decodes_every_field() {
    let spec = FrameSpec {
        hours: 23,
        minutes: 59,
        day: 31,
        weekday: 3,
        month: 12,
        year: 99,
        summer_time: false,
    };
    let telegram = decode(&encode_frame(&spec)).expect("clean frame must commit");
    assert_eq!(telegram.hours, 23);
    assert_eq!(telegram.minutes, 59);
    assert_eq!(telegram.day, 31);
    assert_eq!(telegram.month, 12);
    assert_eq!(telegram.year, 99);
    assert!(!telegram.summer_time);
}

#[rstest]
#[case::daylight_saving_bit(17)]
#[case::start_bit(20)]
#[case::minute_lsb(21)]
#[case::minute_parity(28)]
#[case::hour_bit(30)]
#[case::hour_parity(35)]
#[case::day_bit(36)]
#[case::year_bit(52)]
#[case::date_parity(58)]
fn single_bit_flip_discards_the_frame(#[case] index: usize) {
    let mut bits = encode_frame(&FrameSpec::default());
    corrupt_bit(&mut bits, index);
    assert_eq!(decode(&bits), None);
}

#[test]
fn consecutive_minutes_commit_independently() {
    let first = encode_frame(&FrameSpec {
        minutes: 34,
        ..FrameSpec::default()
    });
    let second = encode_frame(&FrameSpec {
        minutes: 35,
        ..FrameSpec::default()
    });

    let mut decoder = TelegramDecoder::new();
    let mut commits = Vec::new();
    for bits in [&first, &second] {
        for event in frame_events(bits) {
            if let Some(telegram) = decoder.feed(event) {
                commits.push(telegram);
            }
        }
    }
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].minutes, 34);
    assert_eq!(commits[1].minutes, 35);
}

#[test]
fn failed_frame_does_not_block_the_next_one() {
    let mut bad = encode_frame(&FrameSpec::default());
    corrupt_bit(&mut bad, 24);
    let good = encode_frame(&FrameSpec::default());

    let mut decoder = TelegramDecoder::new();
    for event in frame_events(&bad) {
        assert_eq!(decoder.feed(event), None);
    }
    let mut committed = None;
    for event in frame_events(&good) {
        committed = committed.or(decoder.feed(event));
    }
    assert!(committed.is_some());
}
