//! Repeated discovery with superseding cycles
//!
//! Every [`DeviceRefresher::refresh`] starts a numbered cycle on its own task.
//! Cycles are never queued behind one another, and a cycle that completes
//! after a newer one has already published is discarded. Readers always see
//! the most recent completed list through [`DeviceRefresher::latest`], however
//! stale, and never wait on a cycle in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use runtarget_core::prelude::*;
use runtarget_core::{sort_devices, Device};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sources::{ConnectedDeviceSource, VirtualDeviceSource};
use crate::task::DevicesTask;

/// Default refresh cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// The device list produced by one completed cycle
#[derive(Debug, Clone, Default)]
pub struct DeviceSnapshot {
    /// Cycle number; 0 before any cycle has completed
    pub cycle: u64,
    /// Devices in presentation order
    pub devices: Arc<Vec<Device>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct DeviceRefresher<V, C> {
    task: DevicesTask<V, C>,
    next_cycle: Arc<AtomicU64>,
    sender: Arc<watch::Sender<DeviceSnapshot>>,
}

impl<V, C> Clone for DeviceRefresher<V, C> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            next_cycle: Arc::clone(&self.next_cycle),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<V, C> DeviceRefresher<V, C>
where
    V: VirtualDeviceSource,
    C: ConnectedDeviceSource + Sync + 'static,
{
    pub fn new(task: DevicesTask<V, C>) -> Self {
        let (sender, _) = watch::channel(DeviceSnapshot::default());
        Self {
            task,
            next_cycle: Arc::new(AtomicU64::new(0)),
            sender: Arc::new(sender),
        }
    }

    /// Start a new cycle
    ///
    /// The handle resolves to whether the cycle's result was published.
    pub fn refresh(&self) -> JoinHandle<bool> {
        let cycle = self.next_cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let task = self.task.clone();
        let sender = Arc::clone(&self.sender);

        tokio::spawn(async move {
            let mut devices = task.collect().await;
            sort_devices(&mut devices);

            sender.send_if_modified(|current| {
                if cycle <= current.cycle {
                    debug!(
                        "Discarding discovery cycle {} (cycle {} already published)",
                        cycle, current.cycle
                    );
                    return false;
                }
                trace!("Publishing discovery cycle {} ({} devices)", cycle, devices.len());
                *current = DeviceSnapshot {
                    cycle,
                    devices: Arc::new(devices),
                    completed_at: Some(Utc::now()),
                };
                true
            })
        })
    }

    /// Run one cycle and return the latest snapshot afterwards
    ///
    /// The snapshot may come from a newer cycle if one overtook this one.
    pub async fn refresh_now(&self) -> DeviceSnapshot {
        if let Err(e) = self.refresh().await {
            warn!("Discovery cycle task failed: {}", e);
        }
        self.latest()
    }

    /// The most recent completed snapshot
    pub fn latest(&self) -> DeviceSnapshot {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.sender.subscribe()
    }

    /// Refresh every `interval` until the returned task is aborted
    ///
    /// Ticks do not wait for the previous cycle, so a hung source cannot
    /// hold back later cycles.
    pub fn spawn_polling(&self, interval: Duration) -> JoinHandle<()> {
        let refresher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                drop(refresher.refresh());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::tests::{avd, online, FixedAvds, ScriptedConnected};

    #[tokio::test]
    async fn test_latest_is_empty_before_first_cycle() {
        let refresher = DeviceRefresher::new(DevicesTask::new(
            FixedAvds(Vec::new()),
            ScriptedConnected::new(Vec::new()),
        ));
        let snapshot = refresher.latest();
        assert_eq!(snapshot.cycle, 0);
        assert!(snapshot.devices.is_empty());
        assert!(snapshot.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_publishes_sorted_devices() {
        let refresher = DeviceRefresher::new(DevicesTask::new(
            FixedAvds(vec![avd("Zeta"), avd("Alpha")]),
            ScriptedConnected::new(vec![online("R58M123")]),
        ));

        let snapshot = refresher.refresh_now().await;
        assert_eq!(snapshot.cycle, 1);
        assert!(snapshot.completed_at.is_some());

        let names: Vec<&str> = snapshot.devices.iter().map(Device::name).collect();
        assert_eq!(names, vec!["call 0", "Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn test_late_cycle_is_superseded() {
        let refresher = DeviceRefresher::new(DevicesTask::new(
            FixedAvds(Vec::new()),
            ScriptedConnected::new(vec![online("R58M123")])
                .with_delays(vec![Duration::from_millis(400), Duration::ZERO]),
        ));

        let slow = refresher.refresh();
        // Let the first cycle reach the source before starting the second
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = refresher.refresh();

        assert!(fast.await.unwrap());
        assert!(!slow.await.unwrap());

        let snapshot = refresher.latest();
        assert_eq!(snapshot.cycle, 2);
        assert_eq!(snapshot.devices[0].name(), "call 1");
    }

    #[tokio::test]
    async fn test_subscribers_see_new_cycles() {
        let refresher = DeviceRefresher::new(DevicesTask::new(
            FixedAvds(vec![avd("Pixel_6")]),
            ScriptedConnected::new(Vec::new()),
        ));
        let mut receiver = refresher.subscribe();

        refresher.refresh();
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow().cycle, 1);
    }

    #[tokio::test]
    async fn test_polling_keeps_refreshing() {
        let refresher = DeviceRefresher::new(DevicesTask::new(
            FixedAvds(vec![avd("Pixel_6")]),
            ScriptedConnected::new(Vec::new()),
        ));
        let mut receiver = refresher.subscribe();

        let poller = refresher.spawn_polling(Duration::from_millis(10));
        receiver.changed().await.unwrap();
        receiver.changed().await.unwrap();
        poller.abort();

        assert!(refresher.latest().cycle >= 2);
    }
}
