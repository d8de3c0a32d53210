use crate::model::LocalTrack;
use crate::reconcile::{Decision, Update};
use anyhow::{Context, Result, bail};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const FIELD_SEPARATOR: char = '\u{1f}';

const ENUMERATE_SCRIPT: &str = r#"
set fieldSep to character id 31
set nowStamp to current date
set output to ""
tell application "Music"
    repeat with t in (get file tracks of library playlist 1)
        set playedAgo to ""
        if played date of t is not missing value then
            set playedAgo to ((nowStamp - (played date of t)) as text)
        end if
        set output to output & (persistent ID of t) & fieldSep & (artist of t) & fieldSep & (album of t) & fieldSep & (name of t) & fieldSep & ((played count of t) as text) & fieldSep & playedAgo & linefeed
    end repeat
end tell
return output
"#;

pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}

pub fn enumerate_tracks() -> Result<Vec<LocalTrack>> {
    let now = now_epoch_seconds();
    let raw = run_osascript(ENUMERATE_SCRIPT)?;
    parse_track_lines(&raw, now)
}

pub fn apply_update(decision: &Decision) -> Result<()> {
    let script = match decision.update {
        Update::PlayCount(count) => set_count_script(&decision.track_id, count),
        Update::LastPlayed(timestamp) => {
            set_played_date_script(&decision.track_id, timestamp, now_epoch_seconds())
        }
    };
    run_osascript(&script)?;
    Ok(())
}

fn run_osascript(script: &str) -> Result<String> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .context("failed to run osascript (Music.app scripting requires macOS)")?;
    if !output.status.success() {
        bail!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_track_lines(raw: &str, now_epoch: i64) -> Result<Vec<LocalTrack>> {
    let mut tracks = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != 6 {
            bail!(
                "malformed library line: expected 6 fields, got {}",
                fields.len()
            );
        }

        let play_count: u64 = fields[4].trim().parse().with_context(|| {
            format!("bad played count {:?} for track {}", fields[4], fields[0])
        })?;
        let last_played = parse_played_ago(fields[5], now_epoch).with_context(|| {
            format!("bad played date {:?} for track {}", fields[5], fields[0])
        })?;

        tracks.push(LocalTrack {
            id: fields[0].trim().to_string(),
            artist: fields[1].trim().to_string(),
            album: fields[2].trim().to_string(),
            title: fields[3].trim().to_string(),
            play_count,
            last_played,
        });
    }
    Ok(tracks)
}

fn parse_played_ago(raw: &str, now_epoch: i64) -> Result<Option<i64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let seconds_ago: f64 = trimmed
        .parse()
        .with_context(|| format!("not a number: {trimmed:?}"))?;
    Ok(Some(now_epoch - seconds_ago as i64))
}

fn set_count_script(track_id: &str, count: u64) -> String {
    format!(
        "tell application \"Music\"\n\
         set t to (first file track of library playlist 1 whose persistent ID is \"{track_id}\")\n\
         set played count of t to {count}\n\
         end tell"
    )
}

fn set_played_date_script(track_id: &str, timestamp: i64, now_epoch: i64) -> String {
    let seconds_ago = now_epoch - timestamp;
    format!(
        "tell application \"Music\"\n\
         set t to (first file track of library playlist 1 whose persistent ID is \"{track_id}\")\n\
         set played date of t to ((current date) - ({seconds_ago}))\n\
         end tell"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: char = '\u{1f}';

    #[test]
    fn parses_enumerated_lines() {
        let raw = format!(
            "ID1{SEP}Röyksopp{SEP}Melody A.M.{SEP}Eple{SEP}4{SEP}3600\n\
             ID2{SEP}Autechre{SEP}{SEP}Bike{SEP}0{SEP}\n"
        );

        let tracks = parse_track_lines(&raw, 1_000_000).expect("parse");

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "ID1");
        assert_eq!(tracks[0].play_count, 4);
        assert_eq!(tracks[0].last_played, Some(996_400));
        assert_eq!(tracks[1].album, "");
        assert_eq!(tracks[1].last_played, None);
    }

    #[test]
    fn fractional_seconds_ago_are_accepted() {
        let raw = format!("ID1{SEP}A{SEP}B{SEP}C{SEP}1{SEP}10.0\n");

        let tracks = parse_track_lines(&raw, 100).expect("parse");

        assert_eq!(tracks[0].last_played, Some(90));
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        let raw = format!("ID1{SEP}A{SEP}B{SEP}C{SEP}1\n");

        assert!(parse_track_lines(&raw, 100).is_err());
    }

    #[test]
    fn bad_play_count_is_an_error() {
        let raw = format!("ID1{SEP}A{SEP}B{SEP}C{SEP}many{SEP}\n");

        assert!(parse_track_lines(&raw, 100).is_err());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let raw = format!("\nID1{SEP}A{SEP}B{SEP}C{SEP}1{SEP}\n\n");

        let tracks = parse_track_lines(&raw, 100).expect("parse");

        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn update_scripts_target_the_right_field() {
        let count = set_count_script("ABC123", 7);
        assert!(count.contains("persistent ID is \"ABC123\""));
        assert!(count.contains("set played count of t to 7"));

        let date = set_played_date_script("ABC123", 900, 1_000);
        assert!(date.contains("(current date) - (100)"));
    }
}
