use crate::key::TrackKey;
use crate::model::PlayEvent;
use crate::store::PlaycountStore;
use anyhow::{Result, bail};

pub fn merge(
    store: &mut PlaycountStore,
    events: &[PlayEvent],
    new_watermark: i64,
) -> Result<()> {
    let mut resolved = Vec::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        match event.timestamp {
            Some(timestamp) => resolved.push((event, timestamp)),
            None => bail!(
                "play event {index} ({} - {}) has no timestamp",
                event.artist,
                event.track
            ),
        }
    }

    for (event, timestamp) in resolved {
        let key = TrackKey::new(&event.artist, &event.album, &event.track);
        let record = store.plays.entry(key).or_default();
        record.play_count += 1;
        if record.last_played.is_none() {
            record.last_played = Some(timestamp);
        }
    }
    store.watermark = new_watermark;
    Ok(())
}
