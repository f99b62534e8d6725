//! Asynchronous telemetry frames reported by the robot.
//!
//! The gateway hands every asynchronous frame it receives to the session as a
//! [`TelemetryFrame`]. Only collision reports matter to the roll controller;
//! [`decode`] extracts them and filters every other kind without treating it
//! as an error. Frame kinds round-trip through the compact async-id codes used
//! by the robot so front-ends can inject frames by number.

use core::fmt;

/// Planar sample reported by the robot (acceleration in g, power in raw units).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Axes {
    pub x: f32,
    pub y: f32,
}

impl Axes {
    /// Sample with both components at zero.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2},{:.2})", self.x, self.y)
    }
}

/// Payload of a collision report.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionData {
    pub impact_acceleration: Axes,
    pub impact_power: Axes,
    /// Speed the robot reported at impact, when the firmware includes it.
    pub speed: Option<f32>,
    /// Robot-side timestamp of the impact in milliseconds.
    pub timestamp_ms: Option<u32>,
}

impl CollisionData {
    #[must_use]
    pub const fn new(impact_acceleration: Axes, impact_power: Axes) -> Self {
        Self {
            impact_acceleration,
            impact_power,
            speed: None,
            timestamp_ms: None,
        }
    }

    /// Attaches the robot-side timestamp to the payload.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp_ms: u32) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// Discriminant of an asynchronous frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AsyncFrameKind {
    PowerNotification,
    Diagnostics,
    SensorData,
    CollisionDetected,
    Unknown(u8),
}

impl AsyncFrameKind {
    const POWER_NOTIFICATION_CODE: u8 = 0x01;
    const DIAGNOSTICS_CODE: u8 = 0x02;
    const SENSOR_DATA_CODE: u8 = 0x03;
    const COLLISION_DETECTED_CODE: u8 = 0x07;

    /// Encodes the kind into its async-id code.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            AsyncFrameKind::PowerNotification => Self::POWER_NOTIFICATION_CODE,
            AsyncFrameKind::Diagnostics => Self::DIAGNOSTICS_CODE,
            AsyncFrameKind::SensorData => Self::SENSOR_DATA_CODE,
            AsyncFrameKind::CollisionDetected => Self::COLLISION_DETECTED_CODE,
            AsyncFrameKind::Unknown(code) => code,
        }
    }

    /// Decodes an async-id code, falling back to [`AsyncFrameKind::Unknown`].
    #[must_use]
    pub const fn from_raw(code: u8) -> Self {
        match code {
            Self::POWER_NOTIFICATION_CODE => AsyncFrameKind::PowerNotification,
            Self::DIAGNOSTICS_CODE => AsyncFrameKind::Diagnostics,
            Self::SENSOR_DATA_CODE => AsyncFrameKind::SensorData,
            Self::COLLISION_DETECTED_CODE => AsyncFrameKind::CollisionDetected,
            other => AsyncFrameKind::Unknown(other),
        }
    }
}

impl fmt::Display for AsyncFrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncFrameKind::PowerNotification => f.write_str("power-notification"),
            AsyncFrameKind::Diagnostics => f.write_str("diagnostics"),
            AsyncFrameKind::SensorData => f.write_str("sensor-data"),
            AsyncFrameKind::CollisionDetected => f.write_str("collision-detected"),
            AsyncFrameKind::Unknown(code) => write!(f, "unknown(0x{code:02x})"),
        }
    }
}

/// Asynchronous frame as delivered by the gateway.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TelemetryFrame {
    PowerNotification,
    Diagnostics,
    SensorData,
    CollisionDetected(CollisionData),
    Unknown(u8),
}

impl TelemetryFrame {
    /// Builds a collision frame from acceleration and power samples.
    #[must_use]
    pub const fn collision(acceleration: Axes, power: Axes) -> Self {
        TelemetryFrame::CollisionDetected(CollisionData::new(acceleration, power))
    }

    /// Builds a payload-less frame for `code`.
    ///
    /// Collision reports cannot exist without a payload, so the collision code
    /// yields `None`.
    #[must_use]
    pub const fn without_payload(code: u8) -> Option<Self> {
        match AsyncFrameKind::from_raw(code) {
            AsyncFrameKind::PowerNotification => Some(TelemetryFrame::PowerNotification),
            AsyncFrameKind::Diagnostics => Some(TelemetryFrame::Diagnostics),
            AsyncFrameKind::SensorData => Some(TelemetryFrame::SensorData),
            AsyncFrameKind::CollisionDetected => None,
            AsyncFrameKind::Unknown(other) => Some(TelemetryFrame::Unknown(other)),
        }
    }

    /// Returns the discriminant of this frame.
    #[must_use]
    pub const fn kind(&self) -> AsyncFrameKind {
        match self {
            TelemetryFrame::PowerNotification => AsyncFrameKind::PowerNotification,
            TelemetryFrame::Diagnostics => AsyncFrameKind::Diagnostics,
            TelemetryFrame::SensorData => AsyncFrameKind::SensorData,
            TelemetryFrame::CollisionDetected(_) => AsyncFrameKind::CollisionDetected,
            TelemetryFrame::Unknown(code) => AsyncFrameKind::Unknown(*code),
        }
    }
}

/// Collision extracted from a [`TelemetryFrame`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    pub acceleration: Axes,
    pub power: Axes,
}

impl CollisionEvent {
    #[must_use]
    pub const fn new(acceleration: Axes, power: Axes) -> Self {
        Self {
            acceleration,
            power,
        }
    }
}

/// Returns the collision carried by `frame`, or `None` for every other kind.
#[must_use]
pub fn decode(frame: &TelemetryFrame) -> Option<CollisionEvent> {
    match frame {
        TelemetryFrame::CollisionDetected(data) => Some(CollisionEvent::new(
            data.impact_acceleration,
            data.impact_power,
        )),
        _ => None,
    }
}
