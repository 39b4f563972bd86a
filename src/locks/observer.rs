//! Progress and cancellation callbacks for blocking lock acquisition.

use log::info;

/// Receives progress while a caller waits for a contended lock.
pub trait WaitObserver {
    /// Human-readable progress ("waiting...", lock owner, abandonment countdown).
    fn on_status(&mut self, _text: &str) {}

    /// Called on every poll tick so a hosting UI can pump events.
    ///
    /// Returning `false` cancels the wait without touching any lock file.
    fn on_pump(&mut self) -> bool {
        true
    }
}

/// Observer that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WaitObserver for NoopObserver {}

/// Observer forwarding progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl WaitObserver for LogObserver {
    fn on_status(&mut self, text: &str) {
        info!("{}", text);
    }
}

/// Observer built from a status closure and a pump closure.
pub struct CallbackObserver<S, P> {
    status: S,
    pump: P,
}

impl<S, P> CallbackObserver<S, P>
where
    S: FnMut(&str),
    P: FnMut() -> bool,
{
    pub fn new(status: S, pump: P) -> Self {
        Self { status, pump }
    }
}

impl<S, P> WaitObserver for CallbackObserver<S, P>
where
    S: FnMut(&str),
    P: FnMut() -> bool,
{
    fn on_status(&mut self, text: &str) {
        (self.status)(text);
    }

    fn on_pump(&mut self) -> bool {
        (self.pump)()
    }
}

/// Forwards status to an observer only when the text changes.
pub(crate) struct StatusReporter<'a> {
    observer: &'a mut dyn WaitObserver,
    last: String,
}

impl<'a> StatusReporter<'a> {
    pub(crate) fn new(observer: &'a mut dyn WaitObserver) -> Self {
        Self {
            observer,
            last: String::new(),
        }
    }

    pub(crate) fn report(&mut self, text: String) {
        if text != self.last {
            self.observer.on_status(&text);
            self.last = text;
        }
    }

    pub(crate) fn pump(&mut self) -> bool {
        self.observer.on_pump()
    }
}
