use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One face reported by the recognition service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub name: String,
    /// `[x, y, width, height]` of the face in the submitted image.
    #[serde(
        default,
        deserialize_with = "ignore_malformed",
        skip_serializing_if = "Option::is_none"
    )]
    pub bbox: Option<[f64; 4]>,
    /// Service-side wall clock time of the match (`HH:MM:SS`).
    #[serde(
        default,
        deserialize_with = "ignore_malformed",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
}

impl FaceMatch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bbox: None,
            time: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub faces: Vec<FaceMatch>,
}

/// Optional fields are informational; a value of an unexpected shape is
/// dropped instead of failing the whole face.
fn ignore_malformed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FaceMatch>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FaceMatch>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RecognitionResponse {
    pub fn new(faces: Vec<FaceMatch>) -> Self {
        Self { faces }
    }

    /// Name of the first face, unless the service reported it as `unknown_name`.
    ///
    /// Only the first face counts; later faces never trigger a detection.
    pub fn recognized_name(&self, unknown_name: &str) -> Option<&str> {
        self.faces
            .first()
            .map(|face| face.name.as_str())
            .filter(|name| *name != unknown_name)
    }
}
