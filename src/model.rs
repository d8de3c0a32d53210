#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    pub artist: String,
    pub album: String,
    pub track: String,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub play_count: u64,
    pub last_played: Option<i64>,
}
