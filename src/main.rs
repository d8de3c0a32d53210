use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use scrobsync::config;
use scrobsync::lastfm::LastFmClient;
use scrobsync::library;
use scrobsync::merge::merge;
use scrobsync::reconcile::{Stats, reconcile};
use scrobsync::store::{self, PlaycountStore};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Default)]
struct CliArgs {
    username: Option<String>,
    apikey: Option<String>,
    datafile: Option<PathBuf>,
    lastplayed: bool,
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    let Some(username) = args.username else {
        print_help();
        bail!("--username is required");
    };
    let Some(apikey) = args.apikey else {
        print_help();
        bail!("--apikey is required");
    };

    let datafile = match args.datafile {
        Some(path) => path,
        None => {
            config::ensure_data_dir()?;
            config::playcounts_path()?
        }
    };

    run(&username, &apikey, &datafile, args.lastplayed)
}

fn run(username: &str, apikey: &str, datafile: &Path, include_lastplayed: bool) -> Result<()> {
    let mut playcounts = match store::load(datafile) {
        Ok(Some(loaded)) => {
            println!("Loaded playcount data for {} songs.", loaded.plays.len());
            loaded
        }
        Ok(None) => {
            println!("No playcount data at {}, starting fresh.", datafile.display());
            PlaycountStore::default()
        }
        Err(err) => {
            eprintln!(
                "Playcount data at {} is unreadable ({err:#}), starting fresh.",
                datafile.display()
            );
            PlaycountStore::default()
        }
    };

    println!(
        "Fetching plays from last.fm since {}...",
        format_watermark(playcounts.watermark)
    );
    let client = LastFmClient::new(apikey)?;
    let bar = progress_bar(1, "Fetching");
    let fetched = client.fetch_since(username, playcounts.watermark, &bar)?;
    println!("Fetched {} new plays.", fetched.events.len());

    merge(&mut playcounts, &fetched.events, fetched.new_watermark)?;
    store::save(datafile, &playcounts)?;

    println!("Reading local library...");
    let tracks = library::enumerate_tracks()?;
    println!("Found {} local tracks.", tracks.len());

    let (decisions, stats) = reconcile(&playcounts, &tracks, include_lastplayed);

    let bar = progress_bar(decisions.len() as u64, "Updating");
    let mut applied = 0u64;
    let mut failed = 0u64;
    for decision in &decisions {
        match library::apply_update(decision) {
            Ok(()) => applied += 1,
            Err(err) => {
                failed += 1;
                bar.suspend(|| eprintln!("failed to update {}: {err:#}", decision.label));
            }
        }
        bar.inc(1);
    }
    bar.finish();

    print_report(&stats, include_lastplayed, applied, failed);
    Ok(())
}

fn print_report(stats: &Stats, include_lastplayed: bool, applied: u64, failed: u64) {
    println!("{} band misses", stats.artist_misses);
    println!("{} album misses", stats.album_misses);
    println!("{} song misses", stats.track_misses);
    println!("{} songs updated", stats.count_updated);
    println!("{} songs not updated", stats.count_matched);
    if include_lastplayed {
        println!("{} play dates updated", stats.lastplayed_updated);
        println!("{} play dates not updated", stats.lastplayed_matched);
    }
    println!("{applied} updates applied, {failed} failed");
}

fn format_watermark(watermark: i64) -> String {
    if watermark <= 0 {
        return String::from("the beginning");
    }
    OffsetDateTime::from_unix_timestamp(watermark)
        .ok()
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| watermark.to_string())
}

fn progress_bar(len: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("#>-"));
    bar.set_message(label.to_string());
    bar
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "-u" | "--username" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--username requires a value");
                };
                out.username = Some(value.trim().to_string());
            }
            "-k" | "--apikey" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--apikey requires a value");
                };
                out.apikey = Some(value.trim().to_string());
            }
            "-f" | "--datafile" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--datafile requires a path");
                };
                if value.trim().is_empty() {
                    bail!("--datafile cannot be empty");
                }
                out.datafile = Some(PathBuf::from(value.trim()));
            }
            "--lastplayed" => out.lastplayed = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("scrobsync");
    println!("  -u, --username <name>   last.fm username");
    println!("  -k, --apikey <key>      last.fm api key");
    println!("  -f, --datafile <path>   playcount data file (optional)");
    println!("  --lastplayed            also sync played dates");
}
