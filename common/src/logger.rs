use log::{Level, LevelFilter, Metadata, Record};
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

/// Environment variable overriding the maximum log level (`error`, `warn`, `info`, `debug`, `trace`).
pub const LOG_LEVEL_ENV: &str = "SIGNALS_LOG";

/// A logger that logs to stdout and, in release builds, to a file under `logs/`
pub struct MyLog {
    start: Instant,
    log_file: Option<Mutex<BufWriter<File>>>,
}

impl MyLog {
    fn new() -> Self {
        let log_file;
        #[cfg(not(any(debug_assertions, test)))]
        {
            let _ = std::fs::create_dir("logs");
            use std::time::SystemTime;
            log_file = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .ok()
                .and_then(|d| File::create(format!("logs/log_{}.log", d.as_micros())).ok())
                .map(|f| Mutex::new(BufWriter::new(f)));
        }

        #[cfg(any(debug_assertions, test))]
        {
            log_file = None;
        }

        Self {
            start: Instant::now(),
            log_file,
        }
    }

    /// Installs the logger with the level read from [`LOG_LEVEL_ENV`], defaulting to debug.
    /// Calling it more than once is harmless, which lets every test call it.
    pub fn init() {
        let level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Debug);
        Self::init_with_level(level);
    }

    pub fn init_with_level(level: LevelFilter) {
        let leaked = Box::leak(Box::new(MyLog::new()));
        crate::unwrap_orr!(log::set_logger(leaked), return);
        log::set_max_level(level);
        log_panics::init();
    }
}

macro_rules! write_log_stdout {
    ($file:expr, $($arg:tt)*) => {
        let _ = println!($($arg)*);

        if let Some(ref m) = $file {
            if let Ok(mut bw) = m.lock() {
                let _ = writeln!(bw, $($arg)*);
                let _ = bw.flush();
            }
        }
    }
}

impl log::Log for MyLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        let l = metadata.level();
        if metadata.target().starts_with("quickcheck") {
            return l <= Level::Warn;
        }
        l <= log::max_level()
    }

    fn log(&self, r: &Record<'_>) {
        if r.target() == "panic" {
            write_log_stdout!(self.log_file, "{}", r.args());
            self.flush();
            return;
        }

        if std::thread::panicking() {
            self.flush();
            return;
        }

        if !self.enabled(r.metadata()) {
            return;
        }

        let time = self.start.elapsed().as_micros();
        if r.level() > Level::Warn {
            let module_path = r.module_path_static().unwrap_or_else(|| r.target());
            write_log_stdout!(
                self.log_file,
                "[{:9} {:5} {:12}] {}",
                time,
                r.level(),
                module_path,
                r.args()
            );
        } else {
            write_log_stdout!(
                self.log_file,
                "[{:9} {:5} {}:{}] {}",
                time,
                r.level(),
                r.file().unwrap_or_default(),
                r.line().unwrap_or_default(),
                r.args()
            );
        }
    }

    fn flush(&self) {
        let _ = stdout().flush();
        if let Some(ref x) = self.log_file {
            if let Ok(mut f) = x.lock() {
                let _ = f.flush();
            }
        }
    }
}
