//! System-wide constants for the rig workspace.
//!
//! Single source of truth for I/O scaling, default channel wiring and the
//! supervision limits used by both axis controllers.

// ─── I/O Scaling ────────────────────────────────────────────────────

/// Full-scale analog reading (10 V).
pub const ADC_FULL_SCALE: u16 = 10_000;

/// ADC counts per volt (0–10000 ⇔ 0–10 V).
pub const ADC_COUNTS_PER_VOLT: f32 = 1000.0;

/// Number of samples averaged for one tilt position read.
pub const TILT_POSITION_SAMPLES: u32 = 3;

/// Default spacing between tilt position samples [ms].
pub const DEFAULT_SAMPLE_SPACING_MS: u64 = 1;

/// Lowest voltage the tilt actuator's potentiometer produces in its valid range.
/// Readings below this are treated as the minimum angle.
pub const TILT_VALID_MIN_VOLTS: f32 = 0.95;

// ─── Default Channel Wiring ─────────────────────────────────────────

/// DI: rotate-axis home proximity sensor.
pub const DI_HOME_ROTATE: u16 = 1;
/// DI: tilt-axis home proximity sensor.
pub const DI_HOME_TILT: u16 = 2;
/// DI: emergency stop button.
pub const DI_ESTOP: u16 = 4;
/// AI: tilt position potentiometer.
pub const AI_TILT_POSITION: u16 = 1;
/// RO: rotate motor enable.
pub const RO_ROTATE_ENABLE: u16 = 1;
/// RO: rotate direction (1 = CW).
pub const RO_ROTATE_DIR: u16 = 2;
/// RO: tilt actuator enable.
pub const RO_TILT_ENABLE: u16 = 3;
/// RO: tilt direction (1 = up/out).
pub const RO_TILT_DIR: u16 = 4;

// ─── Control Loop ───────────────────────────────────────────────────

/// Default orchestrator tick interval [ms] (10 Hz).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default calibration file location.
pub const DEFAULT_CALIBRATION_PATH: &str = "/etc/rig/calibration.json";

// ─── Tilt Supervision ───────────────────────────────────────────────

/// Minimum ADC movement that counts as progress.
pub const TILT_PROGRESS_ADC_THRESHOLD: i32 = 5;

/// Window without progress after which the actuator is considered jammed [ms].
pub const TILT_STALL_TIMEOUT_MS: u64 = 2000;

/// Margin added to every computed tilt timeout [ms].
pub const TILT_TIMEOUT_MARGIN_MS: u64 = 2000;

/// Lower bound for the homing timeout before the margin is added [ms].
pub const TILT_MIN_HOME_TIMEOUT_MS: u64 = 2000;

/// Lower bound for a move timeout before the margin is added [ms].
pub const TILT_MIN_MOVE_TIMEOUT_MS: u64 = 1000;

/// Speed assumed when the calibration carries no usable `sec_per_degree`.
pub const TILT_FALLBACK_SEC_PER_DEGREE: f32 = 0.5;

// ─── Rotate Supervision ─────────────────────────────────────────────

/// Degrees per second at 1 rpm.
pub const DEG_PER_SEC_PER_RPM: f32 = 6.0;

/// Shortest relay pulse for a degree move [ms].
pub const ROTATE_MIN_DURATION_MS: u64 = 200;

/// Lower bound for the full-rotation timeout before the margin is added [ms].
pub const ROTATE_MIN_FULL_TIMEOUT_MS: u64 = 10_000;

/// Full-rotation timeout used when rpm is unusable [ms].
pub const ROTATE_FALLBACK_FULL_TIMEOUT_MS: u64 = 70_000;

/// Speed assumed for duration estimates when rpm is unusable.
pub const ROTATE_FALLBACK_RPM: f32 = 1.0;
