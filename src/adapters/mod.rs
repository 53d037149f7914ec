//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements    | Connects to                      |
//! |--------------|---------------|----------------------------------|
//! | `gpio`       | ActuatorPort  | `OutputPin` drivers (sim, sysfs) |
//! | `log_sink`   | AuditSink     | `log` facade                     |
//! | `event_log`  | AuditSink     | Append-only text file            |
//! | `sql_log`    | AuditSink     | SQLite `retic_logs` table        |

pub mod event_log;
pub mod gpio;
pub mod log_sink;
pub mod sql_log;
