//! Boundary between the controller and the robot link.
//!
//! The gateway owns the wireless connection, the telemetry subscription and
//! the vendor command encoding. The controller only needs the handful of
//! commands listed in [`RobotCommand`] plus a subscription handle it can
//! release again on teardown.

use core::fmt;

use crate::motion::Heading;

/// Identifier of a paired robot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RobotId(u32);

impl RobotId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robot-{}", self.0)
    }
}

/// Colour of the robot's main LED.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Collision detection algorithm selected on the robot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectionMethod {
    Disabled,
    Default,
}

impl DetectionMethod {
    /// Vendor code for the method.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            DetectionMethod::Disabled => 0x00,
            DetectionMethod::Default => 0x01,
        }
    }
}

/// Collision detection parameters, passed through to the robot untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CollisionDetectionConfig {
    pub method: DetectionMethod,
    pub x_threshold: u8,
    pub y_threshold: u8,
    pub x_speed_weight: u8,
    pub y_speed_weight: u8,
    /// Minimum time between two reported collisions.
    pub window_ms: u16,
}

impl CollisionDetectionConfig {
    /// Parameters used when a session starts.
    pub const DEFAULT: Self = Self {
        method: DetectionMethod::Default,
        x_threshold: 5,
        y_threshold: 5,
        x_speed_weight: 100,
        y_speed_weight: 100,
        window_ms: 100,
    };

    /// Parameters that switch collision streaming off.
    pub const DISABLED: Self = Self {
        method: DetectionMethod::Disabled,
        x_threshold: 0,
        y_threshold: 0,
        x_speed_weight: 0,
        y_speed_weight: 0,
        window_ms: 0,
    };

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self.method, DetectionMethod::Disabled)
    }
}

impl Default for CollisionDetectionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Commands the controller issues to a robot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RobotCommand {
    SetLight(Rgb),
    /// Roll along `heading`; a `duration_ms` of zero rolls until stopped.
    Roll {
        heading: Heading,
        speed: f32,
        duration_ms: u32,
    },
    /// Rotate so that `heading` becomes the robot's new zero heading.
    Calibrate { heading: Heading, speed: f32 },
    /// Zero-speed roll.
    Stop,
    ConfigureCollisionDetection(CollisionDetectionConfig),
    DisableCollisionDetection,
}

impl RobotCommand {
    /// Returns `true` for commands that put the robot in motion.
    #[must_use]
    pub const fn is_motion(&self) -> bool {
        matches!(self, RobotCommand::Roll { .. } | RobotCommand::Calibrate { .. })
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotCommand::SetLight(color) => write!(f, "set-light {color}"),
            RobotCommand::Roll {
                heading,
                speed,
                duration_ms,
            } => write!(
                f,
                "roll heading={heading} speed={speed:.2} duration={duration_ms}ms"
            ),
            RobotCommand::Calibrate { heading, speed } => {
                write!(f, "calibrate heading={heading} speed={speed:.2}")
            }
            RobotCommand::Stop => f.write_str("stop"),
            RobotCommand::ConfigureCollisionDetection(config) => write!(
                f,
                "collision-detection method={} x={} y={} x-speed={} y-speed={} window={}ms",
                config.method.to_raw(),
                config.x_threshold,
                config.y_threshold,
                config.x_speed_weight,
                config.y_speed_weight,
                config.window_ms
            ),
            RobotCommand::DisableCollisionDetection => f.write_str("collision-detection disabled"),
        }
    }
}

/// Handle for an active telemetry subscription.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    robot: RobotId,
    id: u32,
}

impl Subscription {
    #[must_use]
    pub const fn new(robot: RobotId, id: u32) -> Self {
        Self { robot, id }
    }

    #[must_use]
    pub const fn robot(&self) -> RobotId {
        self.robot
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }
}

/// Failures reported by a gateway.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// The robot or link refused the request.
    Rejected,
    /// The robot is no longer connected.
    Disconnected,
    /// The outbound queue had no room for the request.
    QueueFull,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Rejected => f.write_str("command rejected"),
            TransportError::Disconnected => f.write_str("robot disconnected"),
            TransportError::QueueFull => f.write_str("transport queue full"),
        }
    }
}

/// Abstraction over the robot link.
///
/// `send` returning `Ok` means the request was accepted for delivery, not
/// that the robot already executed it.
pub trait DeviceGateway {
    /// Submits a command for `robot`.
    fn send(&mut self, robot: RobotId, command: RobotCommand) -> Result<(), TransportError>;

    /// Starts delivering asynchronous frames from `robot`.
    fn subscribe(&mut self, robot: RobotId) -> Result<Subscription, TransportError>;

    /// Stops frame delivery for a subscription returned by [`subscribe`](Self::subscribe).
    fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), TransportError>;

    /// Releases the connection to `robot`.
    fn disconnect(&mut self, robot: RobotId);

    fn set_light(&mut self, robot: RobotId, r: u8, g: u8, b: u8) -> Result<(), TransportError> {
        self.send(robot, RobotCommand::SetLight(Rgb::new(r, g, b)))
    }

    fn roll(
        &mut self,
        robot: RobotId,
        heading: Heading,
        speed: f32,
        duration_ms: u32,
    ) -> Result<(), TransportError> {
        self.send(
            robot,
            RobotCommand::Roll {
                heading,
                speed: speed.clamp(0.0, 1.0),
                duration_ms,
            },
        )
    }

    fn calibrate(
        &mut self,
        robot: RobotId,
        heading: Heading,
        speed: f32,
    ) -> Result<(), TransportError> {
        self.send(
            robot,
            RobotCommand::Calibrate {
                heading,
                speed: speed.clamp(0.0, 1.0),
            },
        )
    }

    fn stop_roll(&mut self, robot: RobotId) -> Result<(), TransportError> {
        self.send(robot, RobotCommand::Stop)
    }

    fn configure_collision_detection(
        &mut self,
        robot: RobotId,
        config: CollisionDetectionConfig,
    ) -> Result<(), TransportError> {
        if config.is_enabled() {
            self.send(robot, RobotCommand::ConfigureCollisionDetection(config))
        } else {
            self.disable_collision_detection(robot)
        }
    }

    fn disable_collision_detection(&mut self, robot: RobotId) -> Result<(), TransportError> {
        self.send(robot, RobotCommand::DisableCollisionDetection)
    }
}

impl<G> DeviceGateway for &mut G
where
    G: DeviceGateway + ?Sized,
{
    fn send(&mut self, robot: RobotId, command: RobotCommand) -> Result<(), TransportError> {
        (**self).send(robot, command)
    }

    fn subscribe(&mut self, robot: RobotId) -> Result<Subscription, TransportError> {
        (**self).subscribe(robot)
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), TransportError> {
        (**self).unsubscribe(subscription)
    }

    fn disconnect(&mut self, robot: RobotId) {
        (**self).disconnect(robot);
    }
}
