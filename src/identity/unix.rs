//! POSIX identity: `uid(name)` users, `getsid` sessions, signal-0 probes.

use super::ProcessIdentity;
use crate::error::IdentityError;
use std::ffi::CStr;
use std::io;

pub(super) fn local_identity() -> Result<ProcessIdentity, IdentityError> {
    let host = hostname::get().map_err(IdentityError::MachineName)?;
    let machine_name = format!("{}.{}", os_label(), host.to_string_lossy());

    // SAFETY: getuid cannot fail.
    let uid = unsafe { libc::getuid() };
    let user_id = match user_name(uid) {
        Some(name) => format!("{}({})", uid, name),
        None => uid.to_string(),
    };

    let process_id = u64::from(std::process::id());
    // SAFETY: getsid(0) only reads the calling process's session.
    let sid = unsafe { libc::getsid(0) };
    if sid < 0 {
        return Err(IdentityError::Session {
            pid: process_id,
            source: io::Error::last_os_error(),
        });
    }

    Ok(ProcessIdentity {
        machine_name,
        user_id,
        session_id: sid as u64,
        process_id,
    })
}

pub(super) fn session_of(pid: u64) -> Result<Option<u64>, IdentityError> {
    // Out of range pids cannot exist here; 0 and negatives address process groups.
    let raw = match libc::pid_t::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return Ok(None),
    };

    // SAFETY: signal 0 performs the permission and existence checks only.
    if unsafe { libc::kill(raw, 0) } != 0 {
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => return Ok(None),
            // exists, but belongs to someone else
            Some(libc::EPERM) => {}
            _ => return Err(IdentityError::Session { pid, source: err }),
        }
    }

    // SAFETY: getsid has no memory-safety preconditions.
    let sid = unsafe { libc::getsid(raw) };
    if sid < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(None);
        }
        return Err(IdentityError::Session { pid, source: err });
    }

    Ok(Some(sid as u64))
}

fn os_label() -> &'static str {
    if cfg!(target_os = "linux") {
        "Linux"
    } else if cfg!(target_os = "macos") {
        "macOS"
    } else {
        std::env::consts::OS
    }
}

/// Look up the login name of `uid`, falling back to the environment.
fn user_name(uid: libc::uid_t) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: passwd is plain old data; getpwuid_r fills it in.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: every pointer refers to a live, correctly sized buffer.
    let rc = unsafe { libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc == 0 && !result.is_null() && !pwd.pw_name.is_null() {
        // SAFETY: pw_name points into `buf` and is NUL-terminated on success.
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Some(name.to_string_lossy().into_owned());
    }

    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|name| !name.is_empty())
}
