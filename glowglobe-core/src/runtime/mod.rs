//! Input serialization for the session controller.
//!
//! User requests and telemetry frames arrive from different producers. They
//! are funnelled through one [`InputQueue`] and applied by a single
//! [`SessionRuntime`], which is the only owner of the controller. Every input
//! already waiting in the queue is applied before the staged roll script is
//! dispatched, so a stop request queued behind a collision wins over that
//! collision's roll.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use log::{debug, info, warn};

use crate::gateway::DeviceGateway;
use crate::session::{FrameOutcome, SessionController};
use crate::telemetry::TelemetryFrame;

/// Depth of the session input queue.
pub const INPUT_QUEUE_DEPTH: usize = 8;

/// Requests applied to the session, in arrival order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SessionInput {
    Toggle,
    Start,
    Stop,
    Telemetry(TelemetryFrame),
    /// Tear the session down and end the runtime loop.
    Teardown,
}

pub type InputQueue<M> = Channel<M, SessionInput, INPUT_QUEUE_DEPTH>;
pub type InputSender<'a, M> = Sender<'a, M, SessionInput, INPUT_QUEUE_DEPTH>;
pub type InputReceiver<'a, M> = Receiver<'a, M, SessionInput, INPUT_QUEUE_DEPTH>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Finished,
}

/// Single consumer of the input queue.
pub struct SessionRuntime<'a, M, G>
where
    M: RawMutex,
{
    controller: SessionController<G>,
    inputs: InputReceiver<'a, M>,
    finished: bool,
}

impl<'a, M, G> SessionRuntime<'a, M, G>
where
    M: RawMutex,
    G: DeviceGateway,
{
    pub fn new(controller: SessionController<G>, inputs: InputReceiver<'a, M>) -> Self {
        Self {
            controller,
            inputs,
            finished: false,
        }
    }

    /// Applies inputs until a [`SessionInput::Teardown`] is processed.
    pub async fn run(&mut self) {
        while !self.finished {
            let input = self.inputs.receive().await;
            if self.apply(input) == Flow::Finished {
                break;
            }
            self.drain();
        }
        info!("session runtime finished");
    }

    /// Applies every queued input, then dispatches the staged script.
    ///
    /// Returns the number of inputs applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while !self.finished {
            let Ok(input) = self.inputs.try_receive() else {
                break;
            };
            applied += 1;
            if self.apply(input) == Flow::Finished {
                return applied;
            }
        }

        if !self.finished {
            self.dispatch();
        }
        applied
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController<G> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SessionController<G> {
        &mut self.controller
    }

    pub fn into_controller(self) -> SessionController<G> {
        self.controller
    }

    fn apply(&mut self, input: SessionInput) -> Flow {
        let result = match input {
            SessionInput::Toggle => self.controller.toggle().map(|_| ()),
            SessionInput::Start => self.controller.start(),
            SessionInput::Stop => self.controller.stop(),
            SessionInput::Telemetry(frame) => self.controller.handle_frame(&frame).map(|outcome| {
                if let FrameOutcome::Rolled { heading, .. } = outcome {
                    debug!("roll towards {heading} staged");
                }
            }),
            SessionInput::Teardown => {
                if let Err(err) = self.controller.teardown() {
                    warn!("teardown incomplete: {err}");
                }
                self.finished = true;
                return Flow::Finished;
            }
        };

        if let Err(err) = result {
            warn!("{input:?} failed: {err}");
        }
        Flow::Continue
    }

    fn dispatch(&mut self) {
        match self.controller.flush() {
            Ok(0) => {}
            Ok(sent) => debug!("dispatched {sent} command(s)"),
            Err(err) => warn!("dispatch failed: {err}"),
        }
    }
}

/// Pushes gateway frames into the input queue without blocking.
pub struct TelemetryForwarder<'a, M>
where
    M: RawMutex,
{
    sender: InputSender<'a, M>,
}

impl<'a, M> TelemetryForwarder<'a, M>
where
    M: RawMutex,
{
    pub fn new(sender: InputSender<'a, M>) -> Self {
        Self { sender }
    }

    /// Queues `frame`; returns `false` when the queue was full and the frame
    /// was dropped.
    pub fn deliver(&self, frame: TelemetryFrame) -> bool {
        match self.sender.try_send(SessionInput::Telemetry(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("input queue full, dropping {} frame", frame.kind());
                false
            }
        }
    }
}
