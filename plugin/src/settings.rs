use serde::{Deserialize, Deserializer, Serialize};

/// Default colors for ladder G, where a high count is good
pub const G_DEFAULT_COLORS: [&str; 4] = ["green", "yellow", "orange", "red"];
/// Default colors for ladder B, where a high count is bad
pub const B_DEFAULT_COLORS: [&str; 4] = ["red", "orange", "yellow", "green"];

/// Per-key settings as stored by the host and edited in the property inspector.
///
/// Field names are the wire contract with the settings UI. Cutoffs arrive either
/// as numbers or as strings typed into a text field; an empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub item_name: String,
    pub item_filter: String,

    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub g_cutoff_1: Option<f64>,
    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub g_cutoff_2: Option<f64>,
    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub g_cutoff_3: Option<f64>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub g_color_1: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub g_color_2: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub g_color_3: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub g_color_4: Option<String>,

    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub b_cutoff_1: Option<f64>,
    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub b_cutoff_2: Option<f64>,
    #[serde(deserialize_with = "cutoff", skip_serializing_if = "Option::is_none")]
    pub b_cutoff_3: Option<f64>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub b_color_1: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub b_color_2: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub b_color_3: Option<String>,
    #[serde(deserialize_with = "color", skip_serializing_if = "Option::is_none")]
    pub b_color_4: Option<String>,
}

impl ButtonConfig {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    pub fn g_ladder(&self) -> Ladder<'_> {
        Ladder {
            cutoffs: [self.g_cutoff_1, self.g_cutoff_2, self.g_cutoff_3],
            colors: [
                self.g_color_1.as_deref(),
                self.g_color_2.as_deref(),
                self.g_color_3.as_deref(),
                self.g_color_4.as_deref(),
            ],
            defaults: &G_DEFAULT_COLORS,
        }
    }

    pub fn b_ladder(&self) -> Ladder<'_> {
        Ladder {
            cutoffs: [self.b_cutoff_1, self.b_cutoff_2, self.b_cutoff_3],
            colors: [
                self.b_color_1.as_deref(),
                self.b_color_2.as_deref(),
                self.b_color_3.as_deref(),
                self.b_color_4.as_deref(),
            ],
            defaults: &B_DEFAULT_COLORS,
        }
    }

    pub fn has_filter(&self) -> bool {
        !self.item_filter.is_empty()
    }
}

/// Up to three descending cutoffs mapped onto four color buckets.
#[derive(Debug, Clone, Copy)]
pub struct Ladder<'a> {
    cutoffs: [Option<f64>; 3],
    colors: [Option<&'a str>; 4],
    defaults: &'static [&'static str; 4],
}

impl<'a> Ladder<'a> {
    /// A ladder only applies once its first cutoff is set
    pub fn is_active(&self) -> bool {
        self.cutoffs[0].is_some()
    }

    /// Pick the bucket color for `count`, or `None` if the ladder is inactive.
    pub fn color_for(&self, count: usize) -> Option<&'a str> {
        let first = self.cutoffs[0]?;
        let count = count as f64;

        let bucket = if count >= first {
            0
        } else if self.cutoffs[1].is_some_and(|c| count >= c) {
            1
        } else if self.cutoffs[2].is_some_and(|c| count >= c) {
            2
        } else {
            3
        };

        Some(self.colors[bucket].unwrap_or(self.defaults[bucket]))
    }
}

/// Process-wide credentials shared by every key.
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalCredentials {
    #[serde(rename = "apiToken")]
    pub api_token: String,
}

impl GlobalCredentials {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    pub fn has_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }
}

impl std::fmt::Debug for GlobalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCredentials")
            .field("api_token", &if self.has_token() { "<redacted>" } else { "<unset>" })
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCutoff {
    Number(f64),
    Text(String),
}

fn cutoff<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCutoff>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawCutoff::Number(n)) => Some(n),
        Some(RawCutoff::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.parse().map_err(|_| {
                    serde::de::Error::custom(format!("cutoff is not a number: {:?}", s))
                })?)
            }
        }
        None => None,
    })
}

fn color<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
