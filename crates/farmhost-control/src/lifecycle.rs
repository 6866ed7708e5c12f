//! Host lock and hardware state rules.
//!
//! Lock state and hardware state are independent axes. Operators move the lock
//! freely between its three values. Hardware state follows reboots:
//!
//! ```text
//!              reboot_now                    agent acks
//!     Up ─────────────────────▶ Rebooting ──────────────▶ (host reports Up)
//!      │                            │
//!      │                            │ agent unreachable
//!      │                            ▼
//!      │                          Down
//!      │
//!      │ reboot_when_idle
//!      └─────────────────────▶ RebootWhenIdle   (kept even if the agent is unreachable)
//! ```
//!
//! `Repair` and `Down` are only entered by an explicit hardware state write or by
//! the reboot compensation above.

use farmhost_store::{HardwareState, LockState, ResourceStats};

/// Returns true if the host is not open for farm work.
#[must_use]
pub const fn is_locked(state: LockState) -> bool {
    !matches!(state, LockState::Open)
}

/// Returns true if the host's hardware is healthy.
#[must_use]
pub const fn is_up(state: HardwareState) -> bool {
    matches!(state, HardwareState::Up)
}

/// Returns true if the scheduler may place new work on the host.
#[must_use]
pub const fn is_dispatchable(lock: LockState, hardware: HardwareState) -> bool {
    !is_locked(lock) && is_up(hardware)
}

/// Returns true if the host is under memory pressure and its procs are
/// candidates for reclamation.
#[must_use]
pub const fn is_kill_mode(stats: &ResourceStats, min_swap_used: u64, max_free_memory: u64) -> bool {
    stats.used_swap() > min_swap_used && stats.free_memory < max_free_memory
}

/// The hardware state a host should hold after its agent failed to take a
/// reboot command issued while it was in `requested`.
#[must_use]
pub const fn state_after_failed_reboot(requested: HardwareState) -> HardwareState {
    match requested {
        HardwareState::Rebooting => HardwareState::Down,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_states() {
        assert!(!is_locked(LockState::Open));
        assert!(is_locked(LockState::Locked));
        assert!(is_locked(LockState::NimbyLocked));
    }

    #[test]
    fn only_up_is_up() {
        for state in HardwareState::ALL {
            assert_eq!(is_up(state), state == HardwareState::Up);
        }
    }

    #[test]
    fn dispatchable_requires_open_and_up() {
        assert!(is_dispatchable(LockState::Open, HardwareState::Up));
        assert!(!is_dispatchable(LockState::Locked, HardwareState::Up));
        assert!(!is_dispatchable(LockState::NimbyLocked, HardwareState::Up));
        assert!(!is_dispatchable(LockState::Open, HardwareState::RebootWhenIdle));
        assert!(!is_dispatchable(LockState::Open, HardwareState::Repair));
    }

    #[test]
    fn kill_mode_needs_swap_and_low_memory() {
        let swapping = ResourceStats {
            total_swap: 4096,
            free_swap: 1024,
            free_memory: 100,
            ..ResourceStats::default()
        };
        assert!(is_kill_mode(&swapping, 2048, 512));

        let plenty_free = ResourceStats {
            free_memory: 8192,
            ..swapping.clone()
        };
        assert!(!is_kill_mode(&plenty_free, 2048, 512));

        let no_swap = ResourceStats {
            total_swap: 4096,
            free_swap: 4096,
            ..swapping
        };
        assert!(!is_kill_mode(&no_swap, 2048, 512));
    }

    #[test]
    fn failed_reboot_compensation() {
        assert_eq!(
            state_after_failed_reboot(HardwareState::Rebooting),
            HardwareState::Down
        );
        assert_eq!(
            state_after_failed_reboot(HardwareState::RebootWhenIdle),
            HardwareState::RebootWhenIdle
        );
    }
}
