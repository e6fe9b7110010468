use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// One observation of the player, produced per poll cycle.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<TrackArtist>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentlyPlayingResponse {
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<TrackItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackItem {
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: u64,
    pub artists: Vec<TrackArtist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_active: bool,
}

/// A finished play as handed to the history sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayedTrack {
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<TrackArtist>,
    pub duration_ms: u64,
    pub device_name: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Sparse catalog projection used only to decide refresh priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonArtist {
    pub id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full artist record as stored in the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub followers: Option<u64>,
    pub popularity: Option<u32>,
    pub image: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchArtistsResponse {
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub followers: Option<Followers>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followers {
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Tabled)]
pub struct HistoryTableRow {
    pub finished: String,
    pub track: String,
    pub artists: String,
    pub device: String,
}

impl ArtistObject {
    /// Converts the wire object into a catalog record stamped at `now`.
    pub fn into_artist(self, now: DateTime<Utc>) -> Artist {
        Artist {
            id: self.id,
            name: self.name,
            genres: self.genres,
            followers: self.followers.and_then(|f| f.total),
            popularity: self.popularity,
            image: self.images.into_iter().next().map(|i| i.url),
            updated_at: Some(now),
        }
    }
}
