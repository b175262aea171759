pub mod api;
pub mod mission;
pub mod telemetry;

pub use api::{CommandAck, Health, Metrics, QosAdvice, QosReport, VideoTarget};
pub use mission::{MissionStatus, MissionUpload, Position, Waypoint};
pub use telemetry::{CommandKind, DriveCommand, LinkMessage, ObserverMessage, TelemetryFrame, TelemetryView};
