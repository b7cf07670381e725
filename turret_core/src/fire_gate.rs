//! Firing authorization.

/// Everything the fire decision depends on for one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireInputs {
    pub turret_enabled: bool,
    pub x_in_range: bool,
    pub y_in_range: bool,
    pub door_active: bool,
    pub motion_active: bool,
    /// Reported for completeness; a person sighting alone never fires.
    pub person_active: bool,
}

/// Fire only when armed, aimed on both axes, and a door or motion trigger
/// is inside its hold window.
#[inline]
pub fn fire_gate(inputs: &FireInputs) -> bool {
    inputs.turret_enabled
        && inputs.x_in_range
        && inputs.y_in_range
        && (inputs.door_active || inputs.motion_active)
}
