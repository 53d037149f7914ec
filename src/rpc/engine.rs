//! Command engine: maps decoded requests onto controller operations.
//!
//! Stateless: every datagram is handled on its own.  Anything that fails
//! to decode is logged and echoed back, so one bad datagram costs the
//! caller a reply with no effect and nothing more.
//!
//! ```text
//!  datagram ─▶ normalize ─▶ decode ─┬─ GET  ─▶ ControlPort query ─▶ JSON
//!                                   ├─ SET  ─▶ ControlPort command ─▶ echo
//!                                   └─ err  ─▶ warn!               ─▶ echo
//! ```

use log::{debug, info, warn};

use crate::app::commands::{Command, Query, Request};
use crate::app::ports::ControlPort;

use super::codec::{self, Response};

/// Protocol handler bound to one controller.
pub struct CommandEngine<C: ControlPort> {
    control: C,
}

impl<C: ControlPort> CommandEngine<C> {
    pub fn new(control: C) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Handle one raw datagram and produce the reply body.
    pub fn handle_datagram(&self, datagram: &[u8]) -> String {
        let payload = codec::normalize(datagram);
        debug!("Received: {}", payload);
        let response = self.handle(&payload);
        response.encode()
    }

    /// Handle one normalized payload.
    pub fn handle(&self, payload: &str) -> Response {
        match codec::decode(payload) {
            Ok(request) => self.dispatch(request, payload),
            Err(e) => {
                warn!("Rejected request {}: {}", payload, e);
                Response::Echo(payload.to_string())
            }
        }
    }

    fn dispatch(&self, request: Request, payload: &str) -> Response {
        match request {
            Request::Get(Query::Status) => Response::Status(self.control.current_status()),
            Request::Get(Query::Stations) => Response::Stations(self.control.stations()),
            Request::Set(command) => {
                self.execute(command);
                Response::Echo(payload.to_string())
            }
        }
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Operate {
                zone,
                duration_secs,
            } => {
                if self.control.enqueue(&zone, duration_secs) {
                    info!("OPERATE {} for {}", zone, duration_secs);
                }
            }
            Command::Cancel => {
                info!("CANCEL");
                self.control.cancel_current();
            }
            Command::CancelAll => {
                info!("CANCEL_ALL");
                self.control.cancel_all();
            }
        }
    }
}
