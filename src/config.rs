use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BACKEND_URL: &str = "https://science-institute-backend.vercel.app";
pub const BACKEND_URL_ENV: &str = "TIMETABLED_BACKEND_URL";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Largest real-world UTC offset is +14:00.
const MAX_OFFSET_MINUTES: i64 = 14 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub backend_url: String,
    /// Offset used to render backend instants as wall-clock times and to
    /// resolve form times into instants.
    pub utc_offset_minutes: i32,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            utc_offset_minutes: Local::now().offset().fix().local_minus_utc() / 60,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                cfg.backend_url = url.to_string();
            }
        }
        cfg
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset())
    }

    /// Applies a partial update. Unknown keys and out-of-range values are
    /// rejected and leave `self` untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "backendUrl" => {
                    let s = v
                        .as_str()
                        .map(str::trim)
                        .ok_or_else(|| "backendUrl must be string".to_string())?;
                    if !(s.starts_with("http://") || s.starts_with("https://")) {
                        return Err("backendUrl must start with http:// or https://".into());
                    }
                    next.backend_url = s.to_string();
                }
                "utcOffsetMinutes" => {
                    let n = v
                        .as_i64()
                        .ok_or_else(|| "utcOffsetMinutes must be integer".to_string())?;
                    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&n) {
                        return Err(format!(
                            "utcOffsetMinutes must be in {}..={}",
                            -MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES
                        ));
                    }
                    next.utc_offset_minutes = n as i32;
                }
                "timeoutSecs" => {
                    let n = v
                        .as_u64()
                        .filter(|n| (1..=120).contains(n))
                        .ok_or_else(|| "timeoutSecs must be in 1..=120".to_string())?;
                    next.timeout_secs = n;
                }
                _ => return Err(format!("unknown config field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }
}
