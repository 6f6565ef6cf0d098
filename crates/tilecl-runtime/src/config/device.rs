use crate::selector::SelectionPolicy;

/// Configuration of the device selection.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DeviceConfig {
    /// The policy used to pick the device of a run.
    #[serde(default)]
    pub policy: SelectionPolicy,
}
