use crate::audio::CapturedBuffer;
use crate::finalize::FinalizationResult;
use crate::stt::ServerMessage;
use tokio::sync::oneshot;

/// Tagged events drained by the session's single consumer task.
///
/// Capture and transport each run on their own task but only ever send into
/// this queue; all state mutation happens on the consuming side, in strict
/// arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// One captured audio buffer with its meter reading
    Audio(CapturedBuffer),
    /// One decoded message from the transcription service
    Transcript(ServerMessage),
    /// The transcription connection closed or errored
    TransportClosed { reason: Option<String> },
    /// Caller command
    Command(SessionCommand),
}

#[derive(Debug)]
pub enum SessionCommand {
    /// Graceful stop: finalize and report the definitive text
    Stop {
        reply: oneshot::Sender<FinalizationResult>,
    },
    /// Hard cancel: tear down without invoking pending callbacks
    Cancel,
}
