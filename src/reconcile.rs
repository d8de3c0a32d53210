use crate::key::TrackKey;
use crate::model::LocalTrack;
use crate::store::PlaycountStore;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    PlayCount(u64),
    LastPlayed(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub track_id: String,
    pub label: String,
    pub update: Update,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub artist_misses: u64,
    pub album_misses: u64,
    pub track_misses: u64,
    pub count_updated: u64,
    pub count_matched: u64,
    pub lastplayed_updated: u64,
    pub lastplayed_matched: u64,
}

pub fn reconcile(
    store: &PlaycountStore,
    tracks: &[LocalTrack],
    include_lastplayed: bool,
) -> (Vec<Decision>, Stats) {
    let mut decisions = Vec::new();
    let mut stats = Stats::default();

    let mut known_artists = HashSet::new();
    let mut known_albums = HashSet::new();
    for key in store.plays.keys() {
        known_artists.insert(key.artist.as_str());
        known_albums.insert((key.artist.as_str(), key.album.as_str()));
    }

    for track in tracks {
        let key = TrackKey::new(&track.artist, &track.album, &track.title);
        let Some(record) = store.plays.get(&key) else {
            if !known_artists.contains(key.artist.as_str()) {
                stats.artist_misses += 1;
            } else if !known_albums.contains(&(key.artist.as_str(), key.album.as_str())) {
                stats.album_misses += 1;
            } else {
                stats.track_misses += 1;
            }
            continue;
        };

        if record.play_count > track.play_count {
            stats.count_updated += 1;
            decisions.push(Decision {
                track_id: track.id.clone(),
                label: format!("{} - {}", track.artist, track.title),
                update: Update::PlayCount(record.play_count),
            });
        } else {
            stats.count_matched += 1;
        }

        if include_lastplayed
            && let (Some(remote), Some(local)) = (record.last_played, track.last_played)
        {
            if remote > local {
                stats.lastplayed_updated += 1;
                decisions.push(Decision {
                    track_id: track.id.clone(),
                    label: format!("{} - {}", track.artist, track.title),
                    update: Update::LastPlayed(remote),
                });
            } else {
                stats.lastplayed_matched += 1;
            }
        }
    }

    (decisions, stats)
}
