use serde::{Deserialize, Deserializer};

/// A recorded tour as listed by Komoot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tour {
    #[serde(deserialize_with = "deserialize_tour_id")]
    pub id: String,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub sport: String,
}

// Komoot sends numeric ids on some endpoints and strings on others.
fn deserialize_tour_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// One page of the tour list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourPage {
    Tours(Vec<Tour>),
    /// The page carried no embedded tour collection.
    Exhausted,
}

#[derive(Deserialize)]
struct TourListResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedTours>,
}

#[derive(Deserialize)]
struct EmbeddedTours {
    #[serde(default)]
    tours: Vec<Tour>,
}

impl TourPage {
    /// Parse a tour list response body.
    ///
    /// A body without `_embedded`, or with an empty tour list, marks the end
    /// of pagination.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let response: TourListResponse = serde_json::from_str(body)?;
        Ok(match response.embedded {
            Some(embedded) if !embedded.tours.is_empty() => TourPage::Tours(embedded.tours),
            _ => TourPage::Exhausted,
        })
    }
}

/// Strava activity type derived from the Komoot sport tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    MountainBikeRide,
    Hike,
}

impl ActivityType {
    /// Unknown sports map to `None` so Strava infers the type itself.
    pub fn from_sport(sport: &str) -> Option<Self> {
        match sport {
            "mtb" => Some(ActivityType::MountainBikeRide),
            "hike" => Some(ActivityType::Hike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::MountainBikeRide => "MountainBikeRide",
            ActivityType::Hike => "Hike",
        }
    }

    /// Value of the `activity_type` upload form field.
    pub fn upload_param(self) -> String {
        self.as_str().to_lowercase()
    }
}

/// A finished Strava upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadedActivity {
    pub upload_id: u64,
    pub activity_id: u64,
}
