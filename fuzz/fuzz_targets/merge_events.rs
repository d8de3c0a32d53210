#![no_main]

use libfuzzer_sys::fuzz_target;
use scrobsync::key::normalize;
use scrobsync::merge::merge;
use scrobsync::model::PlayEvent;
use scrobsync::store::PlaycountStore;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let key = normalize(&text);
    assert!(!key.is_empty());
    assert_eq!(normalize(&key), key);

    let events: Vec<PlayEvent> = text
        .split(' ')
        .take(16)
        .enumerate()
        .map(|(index, chunk)| PlayEvent {
            artist: chunk.to_string(),
            album: String::new(),
            track: chunk.to_string(),
            timestamp: Some(index as i64),
        })
        .collect();

    let mut store = PlaycountStore::default();
    let total = events.len() as u64;
    merge(&mut store, &events, 1_000).expect("timestamped events always merge");

    let folded: u64 = store.plays.values().map(|record| record.play_count).sum();
    assert_eq!(folded, total);
    assert_eq!(store.watermark, 1_000);
});
