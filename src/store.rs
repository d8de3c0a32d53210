use crate::key::TrackKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub play_count: u64,
    pub last_played: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaycountStore {
    pub watermark: i64,
    pub plays: HashMap<TrackKey, PlayRecord>,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    watermark: i64,
    records: Vec<StoreRow>,
}

#[derive(Serialize, Deserialize)]
struct StoreRow {
    artist: String,
    album: String,
    track: String,
    play_count: u64,
    last_played: Option<i64>,
}

pub fn load(path: &Path) -> Result<Option<PlaycountStore>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: StoreFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let mut plays = HashMap::with_capacity(file.records.len());
    for row in file.records {
        plays.insert(
            TrackKey {
                artist: row.artist,
                album: row.album,
                track: row.track,
            },
            PlayRecord {
                play_count: row.play_count,
                last_played: row.last_played,
            },
        );
    }
    Ok(Some(PlaycountStore {
        watermark: file.watermark,
        plays,
    }))
}

pub fn save(path: &Path, store: &PlaycountStore) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if path.exists() {
        let backup = path.with_extension("json.bak");
        let _ = fs::copy(path, &backup);
    }

    let mut records: Vec<StoreRow> = store
        .plays
        .iter()
        .map(|(key, record)| StoreRow {
            artist: key.artist.clone(),
            album: key.album.clone(),
            track: key.track.clone(),
            play_count: record.play_count,
            last_played: record.last_played,
        })
        .collect();
    records.sort_by(|a, b| {
        (&a.artist, &a.album, &a.track).cmp(&(&b.artist, &b.album, &b.track))
    });

    let file = StoreFile {
        watermark: store.watermark,
        records,
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_store() -> PlaycountStore {
        let mut plays = HashMap::new();
        plays.insert(
            TrackKey::new("Boards of Canada", "Geogaddi", "1969"),
            PlayRecord {
                play_count: 12,
                last_played: Some(1_700_000_000),
            },
        );
        plays.insert(
            TrackKey::new("Autechre", "", "Bike"),
            PlayRecord {
                play_count: 3,
                last_played: None,
            },
        );
        PlaycountStore {
            watermark: 1_700_000_100,
            plays,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("playcounts.json");

        let store = sample_store();
        save(&path, &store).expect("save");
        let loaded = load(&path).expect("load").expect("present");

        assert_eq!(loaded, store);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("playcounts.json");

        assert!(load(&path).expect("load").is_none());
    }

    #[test]
    fn corrupt_file_is_an_error_not_an_empty_store() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("playcounts.json");
        fs::write(&path, "{not json").expect("write");

        assert!(load(&path).is_err());
    }

    #[test]
    fn save_creates_missing_parent_and_backup() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("playcounts.json");

        let store = sample_store();
        save(&path, &store).expect("first save");
        save(&path, &store).expect("second save");

        assert!(path.with_extension("json.bak").exists());
    }

    #[test]
    fn saved_record_order_is_stable() {
        let dir = tempdir().expect("tempdir");
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");

        let store = sample_store();
        save(&first, &store).expect("save a");
        save(&second, &store).expect("save b");

        let a = fs::read_to_string(&first).expect("read a");
        let b = fs::read_to_string(&second).expect("read b");
        assert_eq!(a, b);
    }
}
