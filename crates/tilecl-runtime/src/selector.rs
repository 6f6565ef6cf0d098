//! Device discovery and selection.
//!
//! Every enumerated device handle is owned by the selector while scanning; handles that lose
//! the ranking, or whose queries fail, are dropped on the spot so exactly one survives.

use core::{fmt::Display, str::FromStr};

use crate::{
    backend::{ComputeBackend, DeviceFilter, LocalMemoryKind},
    error::DiscoveryError,
};

/// Name used when a device doesn't report one.
pub const UNKNOWN_DEVICE_NAME: &str = "<unknown device>";

/// How the device of a run is picked. A run uses exactly one policy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Rank every device of every platform: dedicated local memory first, then the largest
    /// work-group size.
    #[default]
    Ranked,
    /// The first accelerator of the first platform exposing any, never a CPU device.
    FirstAccelerator,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ranked" => Ok(Self::Ranked),
            "first-accelerator" => Ok(Self::FirstAccelerator),
            other => Err(format!(
                "unknown selection policy '{other}', expected 'ranked' or 'first-accelerator'"
            )),
        }
    }
}

impl Display for SelectionPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SelectionPolicy::Ranked => f.write_str("ranked"),
            SelectionPolicy::FirstAccelerator => f.write_str("first-accelerator"),
        }
    }
}

/// Attributes of a device consulted during selection.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Local memory implementation.
    pub local_memory: LocalMemoryKind,
    /// Maximum work-items per work-group, when the device reported it.
    pub max_work_group_size: Option<usize>,
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (local memory: {}", self.name, self.local_memory)?;
        match self.max_work_group_size {
            Some(max) => write!(f, ", max work-group size: {max})"),
            None => f.write_str(")"),
        }
    }
}

/// Ranking key of a device.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    /// Local memory implementation.
    pub local_memory: LocalMemoryKind,
    /// Maximum work-items per work-group.
    pub max_work_group_size: usize,
}

impl Rank {
    /// Whether a candidate displaces the current best.
    ///
    /// Dedicated local memory wins over anything else. Otherwise only a device of the same memory
    /// kind with a strictly larger work-group size displaces the best, so ties keep the first
    /// device encountered.
    pub fn outranks(&self, best: &Rank) -> bool {
        let local = LocalMemoryKind::Local;

        (self.local_memory == local && best.local_memory != local)
            || (self.local_memory == best.local_memory
                && self.max_work_group_size > best.max_work_group_size)
    }
}

/// The device chosen for a run, the only device handle left alive by the selector.
#[derive(Debug)]
pub struct SelectedDevice<B: ComputeBackend> {
    /// The device handle.
    pub device: B::Device,
    /// Its attributes.
    pub info: DeviceInfo,
}

/// Pick one device according to the policy.
pub fn select_device<B: ComputeBackend>(
    backend: &B,
    policy: SelectionPolicy,
) -> Result<SelectedDevice<B>, DiscoveryError> {
    let selected = match policy {
        SelectionPolicy::Ranked => select_ranked(backend)?,
        SelectionPolicy::FirstAccelerator => select_first_accelerator(backend)?,
    };

    log::info!(
        "Selected device {} with the {policy} policy on {}",
        selected.info,
        backend.name()
    );

    Ok(selected)
}

fn select_ranked<B: ComputeBackend>(backend: &B) -> Result<SelectedDevice<B>, DiscoveryError> {
    let platforms = backend.platforms().map_err(DiscoveryError::Platforms)?;

    let mut best: Option<(Rank, SelectedDevice<B>)> = None;
    let mut enumerated = 0;
    let mut skipped = 0;

    for (platform_index, platform) in platforms.iter().enumerate() {
        let devices = match backend.devices(platform, DeviceFilter::All) {
            Ok(devices) => devices,
            Err(err) => {
                log::warn!("Skipping platform #{platform_index}: {err}");
                continue;
            }
        };

        for device in devices {
            enumerated += 1;

            let Some((rank, info)) = query_rank(backend, &device) else {
                skipped += 1;
                continue;
            };

            log::debug!("Found device {info} on platform #{platform_index}");

            let replaces = match &best {
                Some((best_rank, _)) => rank.outranks(best_rank),
                None => true,
            };

            if replaces {
                // Assigning drops the displaced device.
                best = Some((rank, SelectedDevice { device, info }));
            }
        }
    }

    match best {
        Some((_, selected)) => Ok(selected),
        None => Err(DiscoveryError::NoDevice {
            enumerated,
            skipped,
        }),
    }
}

fn query_rank<B: ComputeBackend>(backend: &B, device: &B::Device) -> Option<(Rank, DeviceInfo)> {
    let local_memory = match backend.local_memory_kind(device) {
        Ok(kind) => kind,
        Err(err) => {
            log::warn!("Skipping device: local memory query failed: {err}");
            return None;
        }
    };
    let max_work_group_size = match backend.max_work_group_size(device) {
        Ok(size) => size,
        Err(err) => {
            log::warn!("Skipping device: work-group size query failed: {err}");
            return None;
        }
    };
    let name = device_name(backend, device);

    Some((
        Rank::new(local_memory, max_work_group_size),
        DeviceInfo::new(name, local_memory, Some(max_work_group_size)),
    ))
}

fn select_first_accelerator<B: ComputeBackend>(
    backend: &B,
) -> Result<SelectedDevice<B>, DiscoveryError> {
    let platforms = backend.platforms().map_err(DiscoveryError::Platforms)?;

    for (platform_index, platform) in platforms.iter().enumerate() {
        // Backends report "no device of this type" as an error.
        let devices = match backend.devices(platform, DeviceFilter::Accelerator) {
            Ok(devices) => devices,
            Err(err) => {
                log::debug!("No accelerator on platform #{platform_index}: {err}");
                continue;
            }
        };

        let Some(device) = devices.into_iter().next() else {
            continue;
        };

        let local_memory = backend
            .local_memory_kind(&device)
            .unwrap_or(LocalMemoryKind::Other);
        let max_work_group_size = backend.max_work_group_size(&device).ok();
        let info = DeviceInfo::new(
            device_name(backend, &device),
            local_memory,
            max_work_group_size,
        );

        log::debug!("Found accelerator {info} on platform #{platform_index}");

        return Ok(SelectedDevice { device, info });
    }

    Err(DiscoveryError::NoAccelerator)
}

fn device_name<B: ComputeBackend>(backend: &B, device: &B::Device) -> String {
    backend.device_name(device).unwrap_or_else(|err| {
        log::warn!("Device name query failed: {err}");
        UNKNOWN_DEVICE_NAME.to_string()
    })
}
