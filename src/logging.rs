//! Logging sinks: Info and above to stdout, everything (Trace+) to a
//! `latest.log` file in the working directory.

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::Write;
use std::sync::Mutex;

struct ToyDbLogger {
    file: Option<Mutex<File>>,
}

impl Log for ToyDbLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = format!(
            "{} [{}] {}: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        if record.level() <= Level::Info {
            print!("{}", line);
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

static LOGGER: OnceCell<ToyDbLogger> = OnceCell::new();

/// Install the global logger. Safe to call more than once; later calls
/// are no-ops. When `latest.log` cannot be created, logging continues on
/// stdout only.
pub fn init() {
    let logger = LOGGER.get_or_init(|| {
        let file = match File::create("latest.log") {
            Ok(file) => Some(Mutex::new(file)),
            Err(err) => {
                eprintln!("warning: cannot create latest.log: {}", err);
                None
            }
        };
        ToyDbLogger { file }
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}
