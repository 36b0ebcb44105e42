use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionQuality {
    Estimating,
    Poor,
    Fair,
    Good,
    Excellent,
}

pub struct ConnectionQualityHeuristics;

impl ConnectionQualityHeuristics {
    pub fn color_code(quality: ConnectionQuality) -> u32 {
        match quality {
            ConnectionQuality::Estimating => 0x000000,
            ConnectionQuality::Poor => 0xFF0000,
            ConnectionQuality::Fair => 0xFFFF00,
            ConnectionQuality::Good => 0x00FF00,
            ConnectionQuality::Excellent => 0x00FFFF,
        }
    }

    // judged by how many send intervals of buffering the jitter forces on us
    pub fn pragmatic(buffer_time_multiplier: f64) -> ConnectionQuality {
        if buffer_time_multiplier <= 1.15 {
            return ConnectionQuality::Excellent;
        }
        if buffer_time_multiplier <= 1.25 {
            return ConnectionQuality::Good;
        }
        if buffer_time_multiplier <= 1.50 {
            return ConnectionQuality::Fair;
        }
        ConnectionQuality::Poor
    }

    /// Quality from the jitter part of the dynamic buffer multiplier, tolerance excluded.
    /// `Estimating` until at least one delivery interval was measured.
    pub fn from_delivery_jitter(
        send_interval: f64,
        jitter_standard_deviation: Option<f64>,
    ) -> ConnectionQuality {
        match jitter_standard_deviation {
            Some(jitter) if send_interval > 0.0 => {
                Self::pragmatic((send_interval + jitter) / send_interval)
            }
            _ => ConnectionQuality::Estimating,
        }
    }
}
