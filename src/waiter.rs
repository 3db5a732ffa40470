//! Bounded wait for an asynchronous device-routing-changed notification.
//!
//! Starting a stream is answered, some time later and on another thread, by
//! a device-changed callback naming the mix io handle and the device the
//! stream was routed to. [`DeviceChangeWaiter`] turns that callback into a
//! blocking call with a deadline:
//!
//! ```text
//! Idle --arm--> Armed --notify--> Fulfilled
//!                 |
//!                 +--timeout--> TimedOut
//! ```
//!
//! Fulfilled and TimedOut are terminal for the current arm. Arming again
//! starts over and discards the previous payload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::WaitError;
use crate::patch::{IoHandle, PortId};

/// Payload of a device-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceChange {
    /// The mix the stream plays through.
    pub io_handle: IoHandle,
    /// The device port the stream was routed to.
    pub device_id: PortId,
}

impl DeviceChange {
    /// Creates a notification payload.
    pub fn new(io_handle: IoHandle, device_id: PortId) -> Self {
        Self {
            io_handle,
            device_id,
        }
    }
}

/// Callback a notification source invokes on device changes.
pub type DeviceCallback = Arc<dyn Fn(DeviceChange) + Send + Sync>;

/// Creates a [`DeviceCallback`] from a closure.
pub fn device_callback<F>(f: F) -> DeviceCallback
where
    F: Fn(DeviceChange) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Observable state of a [`DeviceChangeWaiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Not armed.
    Idle,
    /// Armed and waiting for a notification.
    Armed,
    /// A notification was delivered for the current arm.
    Fulfilled,
    /// The wait for the current arm timed out.
    TimedOut,
}

impl WaitState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Fulfilled => "fulfilled",
            Self::TimedOut => "timed out",
        }
    }
}

#[derive(Debug)]
struct Slot {
    state: WaitState,
    /// Only notifications for this handle fulfil the arm, if set.
    expected: Option<IoHandle>,
    payload: Option<DeviceChange>,
    timeout: Duration,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    signal: Condvar,
}

/// Waits for the device-changed notification that follows a stream start.
///
/// Cloning yields another handle to the same waiter; the control thread keeps
/// one and the notification side gets [`callback`](Self::callback).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use audio_policy_routing::{DeviceChange, DeviceChangeWaiter, IoHandle, PortId};
///
/// let waiter = DeviceChangeWaiter::new();
/// waiter.arm()?;
///
/// let callback = waiter.callback();
/// std::thread::spawn(move || callback(DeviceChange::new(IoHandle(7), PortId(42))));
///
/// let change = waiter.wait(Duration::from_secs(5))?;
/// assert_eq!(change.device_id, PortId(42));
/// # Ok::<(), audio_policy_routing::WaitError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DeviceChangeWaiter {
    shared: Arc<Shared>,
}

impl Default for DeviceChangeWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceChangeWaiter {
    /// Creates an idle waiter.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: WaitState::Idle,
                    expected: None,
                    payload: None,
                    timeout: Duration::ZERO,
                }),
                signal: Condvar::new(),
            }),
        }
    }

    /// Arms the waiter for the next notification on any io handle.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::AlreadyArmed`] if the previous arm has not
    /// reached a terminal state.
    pub fn arm(&self) -> Result<(), WaitError> {
        self.arm_with(None)
    }

    /// Arms the waiter for the next notification on `io_handle` only.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::AlreadyArmed`] if the previous arm has not
    /// reached a terminal state.
    pub fn arm_for(&self, io_handle: IoHandle) -> Result<(), WaitError> {
        self.arm_with(Some(io_handle))
    }

    fn arm_with(&self, expected: Option<IoHandle>) -> Result<(), WaitError> {
        let mut slot = self.shared.slot.lock();
        if slot.state == WaitState::Armed {
            return Err(WaitError::AlreadyArmed);
        }
        slot.state = WaitState::Armed;
        slot.expected = expected;
        slot.payload = None;
        tracing::trace!(?expected, "device-change waiter armed");
        Ok(())
    }

    /// Delivers a notification. Returns true if it fulfilled the current arm.
    ///
    /// Notifications are dropped unless the waiter is armed and, for
    /// [`arm_for`](Self::arm_for), the io handle matches. Nothing is queued.
    pub fn notify(&self, change: DeviceChange) -> bool {
        let mut slot = self.shared.slot.lock();
        let matches = slot.expected.map_or(true, |h| h == change.io_handle);
        if slot.state != WaitState::Armed || !matches {
            tracing::debug!(
                io_handle = %change.io_handle,
                device_id = %change.device_id,
                state = slot.state.as_str(),
                "dropping device-changed notification"
            );
            return false;
        }
        slot.state = WaitState::Fulfilled;
        slot.payload = Some(change);
        drop(slot);
        self.shared.signal.notify_all();
        true
    }

    /// Blocks until the current arm is fulfilled or `timeout` elapses.
    ///
    /// A timeout too large to form a deadline waits without bound.
    ///
    /// Calling `wait` again after a terminal state returns the same outcome
    /// without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::NotArmed`] if the waiter was never armed, and
    /// [`WaitError::TimedOut`] if no matching notification arrived in time.
    pub fn wait(&self, timeout: Duration) -> Result<DeviceChange, WaitError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.slot.lock();
        loop {
            match slot.state {
                WaitState::Idle => return Err(WaitError::NotArmed),
                WaitState::Fulfilled => {
                    // payload is always set together with Fulfilled
                    return slot.payload.ok_or(WaitError::NotArmed);
                }
                WaitState::TimedOut => {
                    return Err(WaitError::TimedOut {
                        timeout: slot.timeout,
                    })
                }
                WaitState::Armed => {
                    let Some(deadline) = deadline else {
                        self.shared.signal.wait(&mut slot);
                        continue;
                    };
                    if self
                        .shared
                        .signal
                        .wait_until(&mut slot, deadline)
                        .timed_out()
                        && slot.state == WaitState::Armed
                    {
                        slot.state = WaitState::TimedOut;
                        slot.timeout = timeout;
                        tracing::warn!(?timeout, "no device-changed notification");
                    }
                }
            }
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> WaitState {
        self.shared.slot.lock().state
    }

    /// Returns the payload delivered for the current arm, if any.
    pub fn payload(&self) -> Option<DeviceChange> {
        self.shared.slot.lock().payload
    }

    /// Returns a callback that delivers notifications to this waiter.
    pub fn callback(&self) -> DeviceCallback {
        let waiter = self.clone();
        device_callback(move |change| {
            waiter.notify(change);
        })
    }
}
