// Channel configuration and settings persistence.
//
// Settings live as pretty JSON next to the recordings, written through a
// .tmp file and renamed into place.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Display range for one measured quantity. `low`/`high` are the boundaries
/// of the yellow and red gauge zones; `min`/`max` the ends of the bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub label: String,
    pub unit: String,
    pub low: f32,
    pub high: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorChannels {
    pub temp: ChannelConfig,
    pub hum: ChannelConfig,
    pub pres: ChannelConfig,
}

impl Default for SensorChannels {
    fn default() -> Self {
        Self {
            temp: ChannelConfig {
                label: "Temperature".to_string(),
                unit: "°C".to_string(),
                low: 20.0,
                high: 26.0,
                min: 10.0,
                max: 35.0,
            },
            hum: ChannelConfig {
                label: "Humidity".to_string(),
                unit: "%".to_string(),
                low: 30.0,
                high: 60.0,
                min: 0.0,
                max: 100.0,
            },
            pres: ChannelConfig {
                label: "Pressure".to_string(),
                unit: "hPa".to_string(),
                low: 1000.0,
                high: 1020.0,
                min: 980.0,
                max: 1040.0,
            },
        }
    }
}

/// Low/normal/high zone colors, as hex strings.
/// Colorblind-friendly alternatives:
///   ["#F0E442", "#009E73", "#D55E00"]  Okabe-Ito
///   ["#CCBB44", "#228833", "#EE6677"]  Paul Tol
pub const DEFAULT_COLORS: [&str; 3] = ["#FFEB3B", "#4CAF50", "#F44336"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub recording_dir: PathBuf,
    pub channels: SensorChannels,
    pub colors: [String; 3],
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            port_name: "COM3".to_string(),
            baud_rate: 9600,
            recording_dir: log_dir(),
            channels: SensorChannels::default(),
            colors: DEFAULT_COLORS.map(str::to_string),
        }
    }
}

/// Universal log folder: Documents/WeatherSensor_logs.
/// Falls back to Desktop, then current directory.
pub fn log_dir() -> PathBuf {
    let base = dirs::document_dir()
        .or_else(dirs::desktop_dir)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("WeatherSensor_logs")
}

pub fn settings_path() -> PathBuf {
    log_dir().join("settings.json")
}

impl AppSettings {
    /// Loads from disk; a missing file yields the defaults.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = settings_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let mut s = String::new();
        fs::File::open(&path)?.read_to_string(&mut s)?;
        let cfg: AppSettings = serde_json::from_str(&s)?;
        Ok(cfg)
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(log_dir())?;
        let path = settings_path();
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json.as_bytes())?;
        if path.exists() {
            let _ = fs::remove_file(&path);
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_defaults_match_sensor_ranges() {
        let channels = SensorChannels::default();
        assert_eq!(channels.temp.low, 20.0);
        assert_eq!(channels.temp.high, 26.0);
        assert_eq!(channels.temp.min, 10.0);
        assert_eq!(channels.temp.max, 35.0);
        assert_eq!(channels.hum.unit, "%");
        assert_eq!(channels.hum.max, 100.0);
        assert_eq!(channels.pres.label, "Pressure");
        assert_eq!(channels.pres.high, 1020.0);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = AppSettings::default();
        settings.port_name = "/dev/ttyUSB0".to_string();
        settings.baud_rate = 115200;
        settings.recording_dir = PathBuf::from("/tmp/weather");

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(back.port_name, "/dev/ttyUSB0");
        assert_eq!(back.baud_rate, 115200);
        assert_eq!(back.recording_dir, PathBuf::from("/tmp/weather"));
        assert_eq!(back.channels.temp.label, "Temperature");
        assert_eq!(back.colors[1], "#4CAF50");
    }
}
