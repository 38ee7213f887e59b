//! Plain stdout logger for the `log` facade.
//!
//! The backing heap's `DEBUG` flag emits its traces through [`log::debug!`];
//! without a logger installed those records go nowhere. Installing this one
//! turns them into the classic printf-style debug stream on standard
//! output. Library users with their own logger simply skip [`init`].

use log::{Level, LevelFilter, Metadata, Record};

static LOGGER: StdoutLogger = StdoutLogger;

struct StdoutLogger;

impl log::Log for StdoutLogger {
  fn enabled(
    &self,
    metadata: &Metadata,
  ) -> bool {
    metadata.level() <= Level::Debug
  }

  fn log(
    &self,
    record: &Record,
  ) {
    if self.enabled(record.metadata()) {
      println!(
        "[{}] ({}) {}",
        record.level(),
        record.module_path().unwrap_or("unknown"),
        record.args()
      );
    }
  }

  fn flush(&self) {}
}

/// Installs the stdout logger at `Debug` level. Does nothing when another
/// logger was installed first.
pub fn init() {
  if log::set_logger(&LOGGER).is_ok() {
    log::set_max_level(LevelFilter::Debug);
  }
}
