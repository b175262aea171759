use rocu_proto::{CommandAck, DriveCommand, LinkMessage};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::link::LinkError;
use crate::state::SessionState;

/// Forward an operator drive command to the vehicle.
///
/// The heartbeat is refreshed before anything else so a failed forward never
/// hides the fact that the operator is still commanding. Transport failures
/// come back as `accepted = false`.
pub async fn relay_drive(session: &SessionState, cmd: DriveCommand) -> CommandAck {
    session.record_command();

    let start = Instant::now();
    let accepted = match session.send_to_vehicle(&LinkMessage::drive(cmd)).await {
        Ok(()) => true,
        Err(LinkError::NotConnected) => {
            debug!("drive command: no vehicle link");
            false
        }
        Err(e) => {
            warn!(error = %e, "drive command forward failed");
            false
        }
    };
    let rtt_ms = start.elapsed().as_secs_f64() * 1000.0;

    CommandAck { accepted, ts: session.wall_now(), rtt_ms }
}
