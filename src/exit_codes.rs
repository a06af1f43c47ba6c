//! Exit code constants for the nfslock CLI.
//!
//! - 0: Success (lock taken and released, or left held on request)
//! - 1: Internal failure (bad configuration, timeout, I/O, lease lost)
//! - N: The supervised command's own exit status
//! - 128 + S: The supervised command was killed by signal S

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any failure of nfslock itself.
pub const FAILURE: i32 = 1;

/// Added to a signal number to report a child killed by that signal.
pub const SIGNAL_BASE: i32 = 128;

/// Exit status used when a child was terminated by `signal`.
pub fn for_signal(signal: i32) -> i32 {
    SIGNAL_BASE + signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_are_distinct() {
        assert_ne!(SUCCESS, FAILURE);
    }

    #[test]
    fn signal_statuses_follow_shell_convention() {
        assert_eq!(for_signal(9), 137);
        assert_eq!(for_signal(15), 143);
    }
}
