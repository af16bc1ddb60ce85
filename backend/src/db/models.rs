use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered identity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Full song record. Everything but the id is optional because the
/// discography mixes album tracks, EP tracks and loose singles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Song {
    #[serde(default)]
    pub id: String,
    pub album_name: Option<String>,
    pub ep: Option<String>,
    pub album_release: Option<String>,
    pub track_number: Option<i64>,
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub featuring: Option<String>,
    pub bonus_track: Option<String>,
    pub promotional_release: Option<String>,
    pub single_release: Option<String>,
    pub track_release: Option<String>,
    pub duration: Option<String>,
    pub lyric: Option<String>,
}

/// What list views show for a song.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SongSummary {
    pub id: String,
    pub track_name: Option<String>,
    pub album_name: Option<String>,
    pub track_number: Option<i64>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: String,
    pub song_id: String,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
