use log::Level;

/// Sink for progress and failure reports emitted by the transcript pipeline.
pub trait Diagnostics: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }
}

/// Forwards reports to the `log` facade, optionally echoing them to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics {
    pub echo: bool,
}

impl LogDiagnostics {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl Diagnostics for LogDiagnostics {
    fn report(&self, level: Level, message: &str) {
        log::log!(target: "ytqa::pipeline", level, "{message}");
        if self.echo && level <= Level::Info {
            eprintln!("{message}");
        }
    }
}
