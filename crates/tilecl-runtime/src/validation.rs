use crate::{error::GeometryError, geometry::LaunchGeometry, selector::DeviceInfo};

/// Validate that the launch covers every axis with whole work-groups.
pub fn validate_alignment(geometry: &LaunchGeometry) -> Result<(), GeometryError> {
    let axes = [
        ("global[0]", geometry.global.x, geometry.local.x),
        ("global[1]", geometry.global.y, geometry.local.y),
    ];

    for (dim, value, multiple) in axes {
        if multiple == 0 || value == 0 || value % multiple != 0 {
            return Err(GeometryError::NotMultiple {
                dim,
                value,
                multiple,
            });
        }
    }

    Ok(())
}

/// Validate that the work-group fits within the device limit, when the device reported one.
pub fn validate_units(info: &DeviceInfo, geometry: &LaunchGeometry) -> Result<(), GeometryError> {
    let requested = geometry.units_per_group();

    match info.max_work_group_size {
        Some(max) if requested > max => Err(GeometryError::WorkGroupTooLarge { requested, max }),
        _ => Ok(()),
    }
}

/// Validate a launch against the device it runs on.
pub fn validate_launch(info: &DeviceInfo, geometry: &LaunchGeometry) -> Result<(), GeometryError> {
    validate_alignment(geometry)?;
    validate_units(info, geometry)
}
