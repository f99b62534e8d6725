//! Cancellable dispatch of command scripts.
//!
//! The sequencer holds at most one script in flight. Submitting a script
//! supersedes the previous one, and [`CommandSequencer::cancel`] advances the
//! generation marker so a stale script is suppressed at the next dispatch
//! point, even when some of its steps already reached the gateway.

use core::fmt;

use log::{debug, warn};

use crate::gateway::{DeviceGateway, RobotCommand, RobotId, TransportError};
use crate::sequences::CommandScript;

/// Generation stamp identifying one submitted script.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct ScriptTicket(u32);

impl ScriptTicket {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScriptTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script#{}", self.0)
    }
}

#[derive(Clone, Debug)]
struct InFlight {
    ticket: ScriptTicket,
    script: CommandScript,
    next_step: usize,
}

impl InFlight {
    fn remaining(&self) -> usize {
        self.script.step_count().saturating_sub(self.next_step)
    }
}

/// Dispatches command scripts to a gateway one step at a time.
#[derive(Clone, Debug, Default)]
pub struct CommandSequencer {
    generation: u32,
    in_flight: Option<InFlight>,
}

impl CommandSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: 0,
            in_flight: None,
        }
    }

    /// Stages `script` for dispatch, superseding any script still in flight.
    pub fn submit(&mut self, script: CommandScript) -> ScriptTicket {
        if let Some(previous) = self.live() {
            debug!(
                "{} superseded with {} step(s) left",
                previous.ticket,
                previous.remaining()
            );
        }

        self.generation = self.generation.wrapping_add(1);
        let ticket = ScriptTicket(self.generation);
        self.in_flight = Some(InFlight {
            ticket,
            script,
            next_step: 0,
        });
        ticket
    }

    /// Ticket of the script currently allowed to dispatch.
    #[must_use]
    pub fn current(&self) -> Option<ScriptTicket> {
        self.live().map(|flight| flight.ticket)
    }

    /// Number of steps of the live script not yet handed to the gateway.
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.live().map_or(0, InFlight::remaining)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_steps() > 0
    }

    /// Hands the next step of the live script to the gateway.
    ///
    /// Returns the command that was sent, or `None` when nothing is staged.
    /// A rejected step discards the rest of its script; there is no retry.
    pub fn dispatch_next<G>(&mut self, gateway: &mut G) -> Result<Option<RobotCommand>, TransportError>
    where
        G: DeviceGateway + ?Sized,
    {
        let generation = self.generation;
        let Some(flight) = self.in_flight.as_mut() else {
            return Ok(None);
        };

        if flight.ticket.get() != generation {
            debug!("{} suppressed after cancellation", flight.ticket);
            self.in_flight = None;
            return Ok(None);
        }

        let Some(step) = flight.script.steps().get(flight.next_step).copied() else {
            self.in_flight = None;
            return Ok(None);
        };

        let command = step.command();
        match gateway.send(flight.script.robot(), command) {
            Ok(()) => {
                flight.next_step += 1;
                if flight.remaining() == 0 {
                    self.in_flight = None;
                }
                Ok(Some(command))
            }
            Err(err) => {
                warn!("{} aborted: {command} failed ({err})", flight.ticket);
                self.in_flight = None;
                Err(err)
            }
        }
    }

    /// Dispatches every remaining step of the live script in order.
    pub fn flush<G>(&mut self, gateway: &mut G) -> Result<usize, TransportError>
    where
        G: DeviceGateway + ?Sized,
    {
        let mut sent = 0;
        while self.dispatch_next(gateway)?.is_some() {
            sent += 1;
        }
        Ok(sent)
    }

    /// Invalidates the live script and stops `robot` immediately.
    ///
    /// Once this returns, nothing from a previously submitted script reaches
    /// the gateway.
    pub fn cancel<G>(&mut self, gateway: &mut G, robot: RobotId) -> Result<(), TransportError>
    where
        G: DeviceGateway + ?Sized,
    {
        if let Some(flight) = self.live() {
            debug!(
                "{} cancelled with {} step(s) left",
                flight.ticket,
                flight.remaining()
            );
        }
        self.generation = self.generation.wrapping_add(1);
        gateway.stop_roll(robot)
    }

    fn live(&self) -> Option<&InFlight> {
        self.in_flight
            .as_ref()
            .filter(|flight| flight.ticket.get() == self.generation)
    }
}
