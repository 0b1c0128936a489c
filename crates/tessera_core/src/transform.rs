//! Position, rotation and scale of a scene object.

use tessera_math::{DMat3, DMat4, DMat4Ext, DQuat, DVec3, EulerRot};

use crate::observer::Observer;

/// Rotation from Euler angles in degrees: yaw about Y, then pitch about X, then roll about Z.
/// `degrees` is `(pitch, yaw, roll)`.
pub fn euler_rotation(degrees: DVec3) -> DQuat {
    DQuat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

/// Object transform with cached matrices.
///
/// The model matrix is `T * R * S`. Every setter recomputes the cache and notifies
/// [`Transform::on_changed`].
#[derive(Debug)]
pub struct Transform {
    position: DVec3,
    rotation: DVec3,
    scale: DVec3,
    matrix: DMat4,
    inverse: DMat4,
    normal_matrix: DMat3,
    changed: Observer<()>,
    quiet: bool,
    pending: bool,
}

impl Transform {
    pub fn new(position: DVec3, rotation: DVec3, scale: DVec3) -> Self {
        let mut transform = Self {
            position,
            rotation,
            scale,
            matrix: DMat4::IDENTITY,
            inverse: DMat4::IDENTITY,
            normal_matrix: DMat3::IDENTITY,
            changed: Observer::new(),
            quiet: false,
            pending: false,
        };
        transform.update_matrices();
        transform
    }

    pub fn from_position(position: DVec3) -> Self {
        Self::new(position, DVec3::ZERO, DVec3::ONE)
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Euler angles in degrees, see [`euler_rotation`].
    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    pub fn scale(&self) -> DVec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.update_matrices();
    }

    pub fn set_rotation(&mut self, rotation: DVec3) {
        self.rotation = rotation;
        self.update_matrices();
    }

    /// Set the scale. Zero components would make the matrix singular and are replaced
    /// by a tiny positive value.
    pub fn set_scale(&mut self, scale: DVec3) {
        self.scale = scale.abs().max(DVec3::splat(1e-9)) * scale.signum();
        self.update_matrices();
    }

    pub fn translate(&mut self, offset: DVec3) {
        self.set_position(self.position + offset);
    }

    pub fn rotate(&mut self, degrees: DVec3) {
        self.set_rotation(self.rotation + degrees);
    }

    pub fn scale_by(&mut self, factor: DVec3) {
        self.set_scale(self.scale * factor);
    }

    /// Take `other`'s placement. Observers of `self` are kept and notified once.
    pub fn set_from(&mut self, other: &Transform) {
        self.position = other.position;
        self.rotation = other.rotation;
        self.scale = other.scale;
        self.update_matrices();
    }

    /// Run `edit` with notifications held back. Returns true if any setter ran, in
    /// which case the caller is expected to call [`Transform::notify_changed`].
    pub(crate) fn edit_quietly<F: FnOnce(&mut Transform)>(&mut self, edit: F) -> bool {
        self.quiet = true;
        self.pending = false;
        edit(self);
        self.quiet = false;
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn notify_changed(&self) {
        self.changed.notify(&());
    }

    /// Object to world.
    pub fn matrix(&self) -> &DMat4 {
        &self.matrix
    }

    /// World to object.
    pub fn inverse_matrix(&self) -> &DMat4 {
        &self.inverse
    }

    /// Inverse-transpose of the upper 3x3, for carrying normals to world space.
    pub fn normal_matrix(&self) -> &DMat3 {
        &self.normal_matrix
    }

    pub fn on_changed(&mut self) -> &mut Observer<()> {
        &mut self.changed
    }

    fn update_matrices(&mut self) {
        self.matrix = DMat4::from_scale_rotation_translation(
            self.scale,
            euler_rotation(self.rotation),
            self.position,
        );
        self.inverse = self.matrix.inverse();
        self.normal_matrix = self.matrix.normal_matrix();
        if self.quiet {
            self.pending = true;
        } else {
            self.changed.notify(&());
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::ZERO, DVec3::ONE)
    }
}

impl Clone for Transform {
    /// Clones the placement only; observers stay with the original.
    fn clone(&self) -> Self {
        Self::new(self.position, self.rotation, self.scale)
    }
}
