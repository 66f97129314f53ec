//! Euler-angle conventions shared by descriptors, scene files and snapshots.
//! Angles are degrees `{pitch, yaw, roll}` about X, Y and Z, applied yaw
//! first, then pitch, then roll (Y-up, left-handed scene convention used by
//! the producer's engine).

use glam::{EulerRot, Quat, Vec3};

pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Inverse of [`quat_from_euler_degrees`]; yaw and roll land in (-180, 180].
pub fn euler_degrees_from_quat(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}
