use scrobsync::merge::merge;
use scrobsync::model::{LocalTrack, PlayEvent};
use scrobsync::reconcile::{Decision, Update, reconcile};
use scrobsync::store::{self, PlaycountStore};

fn event(artist: &str, album: &str, track: &str, timestamp: i64) -> PlayEvent {
    PlayEvent {
        artist: String::from(artist),
        album: String::from(album),
        track: String::from(track),
        timestamp: Some(timestamp),
    }
}

fn local(id: &str, artist: &str, album: &str, title: &str, play_count: u64) -> LocalTrack {
    LocalTrack {
        id: String::from(id),
        artist: String::from(artist),
        album: String::from(album),
        title: String::from(title),
        play_count,
        last_played: Some(10),
    }
}

fn apply_all(tracks: &mut [LocalTrack], decisions: &[Decision]) {
    for decision in decisions {
        let track = tracks
            .iter_mut()
            .find(|track| track.id == decision.track_id)
            .expect("decision targets a known track");
        match decision.update {
            Update::PlayCount(count) => track.play_count = count,
            Update::LastPlayed(timestamp) => track.last_played = Some(timestamp),
        }
    }
}

#[test]
fn full_sync_flow_is_idempotent() {
    let mut playcounts = PlaycountStore::default();
    let events = vec![
        event("Röyksopp", "Melody A.M.", "Eple", 300),
        event("Röyksopp", "Melody A.M.", "Eple", 200),
        event("Boards of Canada", "Geogaddi", "1969", 250),
    ];
    merge(&mut playcounts, &events, 300).expect("merge");

    let mut tracks = vec![
        local("id1", "royksopp", "melody a.m.", "EPLE", 1),
        local("id2", "Boards of Canada", "Geogaddi", "1969", 0),
        local("id3", "Autechre", "Amber", "Silverside", 7),
    ];

    let (decisions, stats) = reconcile(&playcounts, &tracks, true);
    assert_eq!(stats.count_updated, 2);
    assert_eq!(stats.artist_misses, 1);
    assert_eq!(stats.lastplayed_updated, 2);

    apply_all(&mut tracks, &decisions);

    let (decisions, stats) = reconcile(&playcounts, &tracks, true);
    assert!(decisions.is_empty());
    assert_eq!(stats.count_updated, 0);
    assert_eq!(stats.lastplayed_updated, 0);
    assert_eq!(stats.count_matched, 2);
}

#[test]
fn persisted_store_reconciles_like_the_in_memory_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("playcounts.json");

    let mut playcounts = PlaycountStore::default();
    let events = vec![
        event("A", "Alb", "T1", 100),
        event("A", "Alb", "T1", 50),
    ];
    merge(&mut playcounts, &events, 100).expect("merge");
    store::save(&path, &playcounts).expect("save");

    let reloaded = store::load(&path).expect("load").expect("present");
    assert_eq!(reloaded, playcounts);

    let tracks = vec![local("id1", "A", "Alb", "T1", 1)];
    let (decisions, stats) = reconcile(&reloaded, &tracks, false);

    assert_eq!(stats.count_updated, 1);
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].update, Update::PlayCount(2));
}

#[test]
fn later_fetch_window_produces_further_updates() {
    let mut playcounts = PlaycountStore::default();
    merge(&mut playcounts, &[event("A", "Alb", "T1", 100)], 100).expect("first window");

    let mut tracks = vec![local("id1", "A", "Alb", "T1", 0)];
    let (decisions, _) = reconcile(&playcounts, &tracks, false);
    apply_all(&mut tracks, &decisions);
    assert_eq!(tracks[0].play_count, 1);

    merge(
        &mut playcounts,
        &[event("A", "Alb", "T1", 300), event("A", "Alb", "T1", 200)],
        300,
    )
    .expect("second window");
    assert_eq!(playcounts.watermark, 300);

    let (decisions, stats) = reconcile(&playcounts, &tracks, false);
    assert_eq!(stats.count_updated, 1);
    apply_all(&mut tracks, &decisions);
    assert_eq!(tracks[0].play_count, 3);
}
