use crate::model::PlayEvent;
use anyhow::{Context, Result, anyhow, bail};
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const PAGE_LIMIT: u32 = 200;
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200);

pub struct LastFmClient {
    client: Client,
    api_key: String,
    last_request: Mutex<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPage {
    pub events: Vec<PlayEvent>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub events: Vec<PlayEvent>,
    pub new_watermark: i64,
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: Option<RecentTracks>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RecentTracks {
    #[serde(default, deserialize_with = "one_or_many")]
    track: Vec<TrackRow>,
    #[serde(rename = "@attr")]
    attr: Option<PageAttr>,
}

#[derive(Deserialize)]
struct PageAttr {
    #[serde(rename = "totalPages")]
    total_pages: Option<String>,
}

#[derive(Deserialize)]
struct TrackRow {
    name: Option<String>,
    artist: Option<TextNode>,
    album: Option<TextNode>,
    date: Option<DateNode>,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

#[derive(Deserialize)]
struct TextNode {
    #[serde(rename = "#text")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct DateNode {
    uts: Option<String>,
}

#[derive(Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<TrackRow>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<TrackRow>),
        One(TrackRow),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(rows) => rows,
        OneOrMany::One(row) => vec![row],
    })
}

fn parse_page(body: &str) -> Result<FetchPage> {
    let response: RecentTracksResponse =
        serde_json::from_str(body).context("failed to parse last.fm response")?;

    if let Some(code) = response.error {
        bail!(
            "last.fm error {code}: {}",
            response.message.unwrap_or_default()
        );
    }
    let recent = response
        .recenttracks
        .ok_or_else(|| anyhow!("last.fm response has no recenttracks section"))?;

    let total_pages = recent
        .attr
        .and_then(|attr| attr.total_pages)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1);

    let mut events = Vec::new();
    for row in recent.track {
        let now_playing = row
            .attr
            .as_ref()
            .and_then(|attr| attr.nowplaying.as_deref())
            == Some("true");
        if now_playing {
            continue;
        }

        events.push(PlayEvent {
            artist: row.artist.and_then(|node| node.text).unwrap_or_default(),
            album: row.album.and_then(|node| node.text).unwrap_or_default(),
            track: row.name.unwrap_or_default(),
            timestamp: row
                .date
                .and_then(|date| date.uts)
                .and_then(|raw| raw.parse().ok()),
        });
    }

    Ok(FetchPage {
        events,
        total_pages,
    })
}

impl LastFmClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            last_request: Mutex::new(Instant::now() - RATE_LIMIT_INTERVAL),
        })
    }

    fn rate_limit(&self) {
        if let Ok(mut last) = self.last_request.lock() {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                std::thread::sleep(RATE_LIMIT_INTERVAL - elapsed);
            }
            *last = Instant::now();
        }
    }

    fn fetch_page(&self, username: &str, since: i64, page: u32) -> Result<FetchPage> {
        self.rate_limit();

        let url = format!(
            "{API_BASE}?method=user.getrecenttracks&user={username}&api_key={key}\
             &format=json&limit={PAGE_LIMIT}&from={since}&page={page}",
            key = self.api_key
        );
        let response = self
            .client
            .get(&url)
            .send()
            .context("last.fm request failed")?;
        if !response.status().is_success() {
            bail!("last.fm request failed with status {}", response.status());
        }

        let body = response.text().context("failed to read last.fm response")?;
        parse_page(&body)
    }

    pub fn fetch_since(
        &self,
        username: &str,
        watermark: i64,
        bar: &ProgressBar,
    ) -> Result<FetchOutcome> {
        let first = self.fetch_page(username, watermark, 1)?;
        let total_pages = first.total_pages.max(1);
        bar.set_length(u64::from(total_pages));
        bar.inc(1);

        let mut events = first.events;
        for page in 2..=total_pages {
            let mut fetched = self.fetch_page(username, watermark, page)?;
            events.append(&mut fetched.events);
            bar.inc(1);
        }
        bar.finish();

        let new_watermark = events
            .iter()
            .filter_map(|event| event.timestamp)
            .max()
            .map_or(watermark, |newest| newest.max(watermark));

        Ok(FetchOutcome {
            events,
            new_watermark,
        })
    }
}
