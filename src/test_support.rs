use crate::config::Config;
use crate::error::IdentityError;
use crate::identity::{ProcessIdentity, ProcessProbe};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) const FAKE_MACHINE: &str = "Test.fake-host";
pub(crate) const FAKE_USER: &str = "1000(tester)";
pub(crate) const FAKE_PID: u64 = 4000;
pub(crate) const FAKE_SESSION: u64 = 500;

/// Process table shared between fake probes, mapping pid to session.
type ProcessTable = Arc<Mutex<HashMap<u64, u64>>>;

/// In-memory stand-in for the OS process table.
///
/// Probes created with [`FakeProbe::sibling`] share one table, so several
/// registries in one test behave like processes on the same machine.
pub(crate) struct FakeProbe {
    local: ProcessIdentity,
    processes: ProcessTable,
}

impl FakeProbe {
    pub(crate) fn new() -> Self {
        let probe = Self {
            local: ProcessIdentity {
                machine_name: FAKE_MACHINE.to_string(),
                user_id: FAKE_USER.to_string(),
                session_id: FAKE_SESSION,
                process_id: FAKE_PID,
            },
            processes: Arc::new(Mutex::new(HashMap::new())),
        };
        probe.spawn(FAKE_PID, FAKE_SESSION);
        probe
    }

    /// Another process on the same machine, under the same user.
    pub(crate) fn sibling(&self, pid: u64, session: u64) -> Self {
        self.spawn(pid, session);
        Self {
            local: self.identity_of(pid, session),
            processes: Arc::clone(&self.processes),
        }
    }

    /// Identity of a process on this machine, under this user.
    pub(crate) fn identity_of(&self, pid: u64, session: u64) -> ProcessIdentity {
        ProcessIdentity {
            process_id: pid,
            session_id: session,
            ..self.local.clone()
        }
    }

    pub(crate) fn spawn(&self, pid: u64, session: u64) {
        self.processes.lock().unwrap().insert(pid, session);
    }

    pub(crate) fn kill(&self, pid: u64) {
        self.processes.lock().unwrap().remove(&pid);
    }
}

impl ProcessProbe for FakeProbe {
    fn local_identity(&self) -> Result<ProcessIdentity, IdentityError> {
        Ok(self.local.clone())
    }

    fn session_of(&self, pid: u64) -> Result<Option<u64>, IdentityError> {
        Ok(self.processes.lock().unwrap().get(&pid).copied())
    }
}

/// Config with timings short enough for tests but keeping the 6x ratio.
pub(crate) fn fast_config() -> Config {
    Config {
        heartbeat_interval_ms: 50,
        abandonment_window_ms: 400,
        poll_interval_ms: 10,
        ..Config::default()
    }
}
