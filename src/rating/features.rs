use serde::{Deserialize, Serialize};

/// Five ordinal popularity tiers derived from an artist's follower count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowerBucket {
    Tiny,
    Small,
    Medium,
    Big,
    Star,
}

impl FollowerBucket {
    pub const ALL: [FollowerBucket; 5] = [
        FollowerBucket::Tiny,
        FollowerBucket::Small,
        FollowerBucket::Medium,
        FollowerBucket::Big,
        FollowerBucket::Star,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FollowerBucket::Tiny => "tiny",
            FollowerBucket::Small => "small",
            FollowerBucket::Medium => "medium",
            FollowerBucket::Big => "big",
            FollowerBucket::Star => "star",
        }
    }
}

/// Bucket a follower count. Each breakpoint belongs to the tier above it.
pub fn follower_bucket(followers: f64) -> FollowerBucket {
    if followers >= 5_000_000.0 {
        FollowerBucket::Star
    } else if followers >= 1_000_000.0 {
        FollowerBucket::Big
    } else if followers >= 200_000.0 {
        FollowerBucket::Medium
    } else if followers >= 20_000.0 {
        FollowerBucket::Small
    } else {
        FollowerBucket::Tiny
    }
}

/// Independent 0/1 membership flags for the genre families the model knows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreFlags {
    pub genre_pop: u8,
    pub genre_rock: u8,
    pub genre_hip_hop: u8,
    pub genre_rap: u8,
    #[serde(rename = "genre_r&b")]
    pub genre_r_and_b: u8,
    pub genre_soul: u8,
    pub genre_electronic: u8,
    pub genre_edm: u8,
    pub genre_dance: u8,
    pub genre_latin: u8,
    pub genre_country: u8,
    pub genre_jazz: u8,
    pub genre_blues: u8,
    pub genre_folk: u8,
    pub genre_metal: u8,
    pub num_genres: usize,
}

impl GenreFlags {
    /// Flag value by model column name
    pub fn get(&self, column: &str) -> Option<f64> {
        let flag = match column {
            "genre_pop" => self.genre_pop,
            "genre_rock" => self.genre_rock,
            "genre_hip_hop" => self.genre_hip_hop,
            "genre_rap" => self.genre_rap,
            "genre_r&b" => self.genre_r_and_b,
            "genre_soul" => self.genre_soul,
            "genre_electronic" => self.genre_electronic,
            "genre_edm" => self.genre_edm,
            "genre_dance" => self.genre_dance,
            "genre_latin" => self.genre_latin,
            "genre_country" => self.genre_country,
            "genre_jazz" => self.genre_jazz,
            "genre_blues" => self.genre_blues,
            "genre_folk" => self.genre_folk,
            "genre_metal" => self.genre_metal,
            "num_genres" => return Some(self.num_genres as f64),
            _ => return None,
        };
        Some(flag as f64)
    }
}

/// Case-insensitive substring match of the artist's genres against the known
/// genre families. The genres are matched as one space-joined string, so a
/// family can be hit across neighbouring entries. `None` counts as no genres.
pub fn genres_to_flags(genres: Option<&[String]>) -> GenreFlags {
    let genres = genres.unwrap_or_default();
    let joined = genres.join(" ").to_lowercase();
    let has = |needles: &[&str]| u8::from(needles.iter().any(|n| joined.contains(n)));

    GenreFlags {
        genre_pop: has(&["pop"]),
        genre_rock: has(&["rock"]),
        genre_hip_hop: has(&["hip hop", "hip-hop", "rap"]),
        genre_rap: has(&["rap"]),
        genre_r_and_b: has(&["r&b", "rnb"]),
        genre_soul: has(&["soul"]),
        genre_electronic: has(&["electronic", "electro"]),
        genre_edm: has(&["edm"]),
        genre_dance: has(&["dance"]),
        genre_latin: has(&["latin"]),
        genre_country: has(&["country"]),
        genre_jazz: has(&["jazz"]),
        genre_blues: has(&["blues"]),
        genre_folk: has(&["folk"]),
        genre_metal: has(&["metal"]),
        num_genres: genres.len(),
    }
}

/// Tempo tier: slow (0), mid (1), upbeat (2), fast (3). Missing tempo counts as mid.
pub fn tempo_bucket_code(tempo: Option<f64>) -> u8 {
    match tempo {
        Some(t) if !t.is_nan() => {
            if t < 80.0 {
                0
            } else if t < 110.0 {
                1
            } else if t < 140.0 {
                2
            } else {
                3
            }
        }
        _ => 1,
    }
}

/// Year from the first four characters of a release date; anything unparseable is missing
pub fn extract_year(date: Option<&str>) -> Option<i32> {
    let prefix: String = date?.chars().take(4).collect();
    prefix.trim().parse().ok()
}

pub fn decade(year: Option<i32>) -> Option<i32> {
    year.map(|y| y.div_euclid(10) * 10)
}

/// `ln(1 + x)` with negative inputs clipped to zero
pub fn log1p_clipped(value: f64) -> f64 {
    value.max(0.0).ln_1p()
}
