// src/config/constants.rs
//! Engine-wide constants. Waveform shape constants are tuned for visual
//! plausibility and may be adjusted freely.

/// Pathology modifier ranges
pub mod conditions {
    pub const MAX_ST_DEVIATION_MM: f64 = 3.0;
    pub const MAX_NOISE_LEVEL: u8 = 10;
}

/// Factory target vitals
pub mod vitals {
    pub const DEFAULT_HEART_RATE: f64 = 80.0;
    pub const DEFAULT_SPO2: f64 = 98.0;
    pub const DEFAULT_RESP_RATE: f64 = 16.0;
    pub const DEFAULT_SYSTOLIC_BP: f64 = 120.0;
    pub const DEFAULT_DIASTOLIC_BP: f64 = 80.0;
    pub const DEFAULT_TEMPERATURE_C: f64 = 37.0;
    pub const DEFAULT_ETCO2: f64 = 38.0;
}

/// Cardiac phase clock
pub mod cardiac {
    /// Beat length used when heart rate is zero, negative or not a number
    pub const FALLBACK_BEAT_DURATION_MS: f64 = 1000.0;
    /// Phase advances by dt / this value in ventricular fibrillation
    pub const VF_PHASE_PERIOD_MS: f64 = 200.0;
    /// Half-width of the uniform AF beat-to-beat jitter
    pub const AF_JITTER_MS: f64 = 200.0;
    /// Shortest beat the AF jitter may produce
    pub const MIN_BEAT_DURATION_MS: f64 = 150.0;
    pub const ECTOPIC_PROBABILITY: f64 = 0.15;
    pub const ECTOPIC_PREMATURITY_FACTOR: f64 = 0.6;
}

/// Respiratory phase clock
pub mod respiratory {
    pub const FALLBACK_BREATH_DURATION_MS: f64 = 10_000.0;
}

/// Electrical, pleth and respiratory waveform shapes
pub mod waveform {
    /// Heart rate at which base pulse widths apply
    pub const REFERENCE_HEART_RATE: f64 = 60.0;

    pub const P_CENTER: f64 = 0.20;
    pub const P_WIDTH: f64 = 0.025;
    pub const P_AMPLITUDE: f64 = 0.15;

    pub const Q_CENTER: f64 = 0.36;
    pub const Q_WIDTH: f64 = 0.010;
    pub const Q_AMPLITUDE: f64 = -0.12;

    pub const R_CENTER: f64 = 0.40;
    pub const R_WIDTH: f64 = 0.012;
    pub const R_AMPLITUDE: f64 = 1.0;

    pub const S_CENTER: f64 = 0.44;
    pub const S_WIDTH: f64 = 0.010;
    pub const S_AMPLITUDE: f64 = -0.25;

    pub const T_CENTER: f64 = 0.62;
    pub const T_WIDTH: f64 = 0.055;
    pub const T_AMPLITUDE: f64 = 0.30;
    /// Skew of the terminal wave; positive values stretch the trailing edge
    pub const T_SKEW: f64 = 1.8;

    pub const QRS_WIDENED_FACTOR: f64 = 2.5;

    /// Signal units per millimetre of ST deviation
    pub const ST_SIGNAL_PER_MM: f64 = 0.08;
    /// Share of the ST deviation carried into the terminal wave amplitude
    pub const ST_T_WAVE_BIAS: f64 = 0.5;
    /// Deviation below which no plateau is drawn
    pub const ST_PLATEAU_MIN_MM: f64 = 0.1;
    pub const ST_PLATEAU_CENTERS: [f64; 2] = [0.49, 0.54];
    pub const ST_PLATEAU_WIDTH: f64 = 0.03;

    pub const AF_WAVE_FREQUENCIES: [f64; 2] = [40.0, 53.0];
    pub const AF_WAVE_AMPLITUDES: [f64; 2] = [0.035, 0.025];

    pub const ECTOPIC_CENTERS: [f64; 2] = [0.40, 0.48];
    pub const ECTOPIC_WIDTHS: [f64; 2] = [0.035, 0.045];
    pub const ECTOPIC_AMPLITUDES: [f64; 2] = [1.3, -0.55];

    pub const VF_FREQUENCIES: [f64; 2] = [15.0, 19.0];
    pub const VF_AMPLITUDES: [f64; 2] = [0.35, 0.25];
    pub const VF_JITTER: f64 = 0.12;

    pub const ASYSTOLE_WANDER: f64 = 0.02;

    /// Noise amplitude per unit of noise level
    pub const NOISE_PER_LEVEL: f64 = 0.015;

    pub const PLETH_PHASE_DELAY: f64 = 0.1;
    pub const PLETH_UPSTROKE_FRACTION: f64 = 0.2;
    pub const PLETH_DECAY_RATE: f64 = 2.6;
    pub const PLETH_NOTCH_CENTER: f64 = 0.18;
    pub const PLETH_NOTCH_WIDTH: f64 = 0.03;
    pub const PLETH_NOTCH_DEPTH: f64 = 0.12;
    pub const PLETH_TACHY_THRESHOLD_BPM: f64 = 140.0;
    pub const PLETH_TACHY_ATTENUATION: f64 = 0.6;
    pub const PLETH_RESP_MODULATION: f64 = 0.1;

    pub const RESP_AMPLITUDE: f64 = 1.0;
}

/// Display jitter bounds and clamps
pub mod jitter {
    pub const HEART_RATE: f64 = 2.0;
    pub const RESP_RATE: f64 = 1.0;
    pub const PRESSURE: f64 = 2.0;
    pub const TEMPERATURE_C: f64 = 0.1;
    pub const ETCO2: f64 = 1.0;
    /// Chance that the displayed SpO2 dips by one point
    pub const SPO2_DIP_PROBABILITY: f64 = 0.2;
    /// Fraction of etCO2 retained per tick without perfusion
    pub const ETCO2_ARREST_DECAY: f64 = 0.6;
    pub const ETCO2_ARREST_FLOOR: f64 = 1.0;
    pub const TEMPERATURE_RANGE_C: (f64, f64) = (30.0, 42.0);
    pub const SPO2_RANGE: (f64, f64) = (0.0, 100.0);
}

/// Scenario interpolation precision
pub mod scenario {
    pub const CONDITION_DECIMALS: i32 = 2;
    pub const TEMPERATURE_DECIMALS: i32 = 1;
    /// Seconds added to the elapsed clock per scheduler tick
    pub const TICK_SECONDS: f64 = 1.0;
}

/// Alarm supervision
pub mod alarm {
    pub const DEBOUNCE_MS: u64 = 5_000;
    pub const DEFAULT_SNOOZE_MINUTES: u32 = 2;
    pub const HISTORY_LIMIT: usize = 200;
    pub const TONE_FREQUENCY_HZ: f64 = 880.0;
    pub const TONE_ON_MS: u64 = 200;
    pub const TONE_PERIOD_MS: u64 = 1_000;
}

/// Periodic activity intervals
pub mod timing {
    pub const ANIMATION_RATE_HZ: u32 = 60;
    pub const SCENARIO_INTERVAL_MS: u64 = 1_000;
    pub const JITTER_INTERVAL_MS: u64 = 2_000;
    pub const ALARM_INTERVAL_MS: u64 = 2_000;
    /// Largest animation step accepted in one tick
    pub const MAX_FRAME_DT_MS: f64 = 1_000.0;
}

/// Rolling sample history
pub mod buffers {
    pub const DEFAULT_CHANNEL_LENGTH: usize = 600;
    pub const MIN_CHANNEL_LENGTH: usize = 16;
    pub const MAX_CHANNEL_LENGTH: usize = 65_536;
}

/// Event notifications
pub mod events {
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
    pub const HEART_RATE_SIGNIFICANCE: f64 = 5.0;
    pub const SPO2_SIGNIFICANCE: f64 = 2.0;
    pub const RESP_RATE_SIGNIFICANCE: f64 = 3.0;
    pub const PRESSURE_SIGNIFICANCE: f64 = 10.0;
    pub const TEMPERATURE_SIGNIFICANCE: f64 = 0.5;
    pub const ETCO2_SIGNIFICANCE: f64 = 5.0;
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/monitor-core/config.toml";
    pub const USER_CONFIG_DIR: &str = ".monitor-core";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";
    pub const THRESHOLDS_FILE: &str = "alarm_thresholds.toml";
    pub const ENV_PREFIX: &str = "MONITOR_";
}
