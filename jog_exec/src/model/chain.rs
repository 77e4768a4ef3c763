//! Serial-chain kinematic model
//!
//! A revolute serial chain described by a parameter file: each joint has a
//! fixed origin transform relative to its parent frame and a rotation axis,
//! and a fixed tip transform hangs off the last joint. Forward kinematics
//! composes the per-joint isometries; the geometric Jacobian column for
//! joint `i` is `[z_i x (p_tip - p_i); z_i]` in the base frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::Deserialize;

// Internal
use super::{JointBounds, KinematicModel, ModelError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing a serial kinematic chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainParams {
    /// The name of the base link. The base frame is the planning frame of
    /// the chain and maps to the identity transform.
    pub base_link: String,

    /// The name of the link rigidly attached after the last joint.
    pub tip_link: String,

    /// Position of the tip link in the last joint's frame.
    ///
    /// Units: meters
    pub tip_origin_xyz_m: [f64; 3],

    /// Orientation of the tip link in the last joint's frame, as
    /// roll/pitch/yaw.
    ///
    /// Units: radians
    pub tip_origin_rpy_rad: [f64; 3],

    /// A well-conditioned home configuration to start jogging from, one
    /// entry per joint. Empty means all joints at zero.
    ///
    /// Units: radians
    #[serde(default)]
    pub home_position_rad: Vec<f64>,

    /// The joints of the chain, base first.
    pub joints: Vec<ChainJointParams>,
}

/// Parameters for a single chain joint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainJointParams {
    /// The joint name.
    pub name: String,

    /// The name of the link rigidly attached after this joint.
    pub child_link: String,

    /// Position of the joint in its parent frame.
    ///
    /// Units: meters
    pub origin_xyz_m: [f64; 3],

    /// Orientation of the joint in its parent frame, as roll/pitch/yaw.
    ///
    /// Units: radians
    pub origin_rpy_rad: [f64; 3],

    /// The rotation axis of the joint, in the joint frame. Need not be
    /// normalised.
    pub axis: [f64; 3],

    /// Position and velocity bounds, if the joint has any.
    #[serde(default)]
    pub limits: Option<JointBounds>,
}

/// A revolute serial-chain model implementing the jogging core's kinematic
/// capability set.
pub struct SerialChainModel {
    base_link: String,
    tip_link: String,
    tip_origin: Isometry3<f64>,
    names: Vec<String>,
    child_links: Vec<String>,
    origins: Vec<Isometry3<f64>>,
    axes: Vec<Unit<Vector3<f64>>>,
    bounds: Vec<Option<JointBounds>>,
    positions_rad: DVector<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SerialChainModel {
    /// Build a model from chain parameters, with all joints at zero.
    pub fn from_params(params: &ChainParams) -> Result<Self, ModelError> {
        let num_joints = params.joints.len();

        let mut names = Vec::with_capacity(num_joints);
        let mut child_links = Vec::with_capacity(num_joints);
        let mut origins = Vec::with_capacity(num_joints);
        let mut axes = Vec::with_capacity(num_joints);
        let mut bounds = Vec::with_capacity(num_joints);

        for joint in &params.joints {
            let axis = Unit::try_new(Vector3::from(joint.axis), 1e-12)
                .ok_or_else(|| ModelError::InvalidAxis(joint.name.clone()))?;

            names.push(joint.name.clone());
            child_links.push(joint.child_link.clone());
            origins.push(isometry_from_xyz_rpy(
                &joint.origin_xyz_m,
                &joint.origin_rpy_rad,
            ));
            axes.push(axis);
            bounds.push(joint.limits);
        }

        Ok(Self {
            base_link: params.base_link.clone(),
            tip_link: params.tip_link.clone(),
            tip_origin: isometry_from_xyz_rpy(&params.tip_origin_xyz_m, &params.tip_origin_rpy_rad),
            names,
            child_links,
            origins,
            axes,
            bounds,
            positions_rad: DVector::zeros(num_joints),
        })
    }

    /// Compute the pre-rotation (mount) and post-rotation frame of every
    /// joint, base first.
    fn joint_frames(&self) -> Vec<(Isometry3<f64>, Isometry3<f64>)> {
        let mut frames = Vec::with_capacity(self.names.len());
        let mut parent = Isometry3::identity();

        for i in 0..self.names.len() {
            let mount = parent * self.origins[i];
            let rotation = UnitQuaternion::from_axis_angle(&self.axes[i], self.positions_rad[i]);
            let frame = mount * Isometry3::from_parts(Translation3::identity(), rotation);

            frames.push((mount, frame));
            parent = frame;
        }

        frames
    }

    /// The base to tip-link transform at the current configuration.
    fn tip_transform(&self) -> Isometry3<f64> {
        match self.joint_frames().last() {
            Some((_, frame)) => frame * self.tip_origin,
            None => self.tip_origin,
        }
    }
}

impl KinematicModel for SerialChainModel {
    fn variable_names(&self) -> &[String] {
        &self.names
    }

    fn joint_positions(&self) -> DVector<f64> {
        self.positions_rad.clone()
    }

    fn set_joint_positions(&mut self, positions_rad: &DVector<f64>) -> Result<(), ModelError> {
        if positions_rad.len() != self.names.len() {
            return Err(ModelError::WrongJointCount {
                expected: self.names.len(),
                actual: positions_rad.len(),
            });
        }

        self.positions_rad.copy_from(positions_rad);
        Ok(())
    }

    fn jacobian(&self) -> DMatrix<f64> {
        let frames = self.joint_frames();
        let tip = self.tip_transform().translation.vector;

        let mut jacobian = DMatrix::zeros(6, self.names.len());

        for (i, (mount, _)) in frames.iter().enumerate() {
            let z = mount.rotation * self.axes[i].into_inner();
            let p = mount.translation.vector;
            let linear = z.cross(&(tip - p));

            for r in 0..3 {
                jacobian[(r, i)] = linear[r];
                jacobian[(r + 3, i)] = z[r];
            }
        }

        jacobian
    }

    fn link_transform(&self, link_name: &str) -> Result<Isometry3<f64>, ModelError> {
        if link_name == self.base_link {
            return Ok(Isometry3::identity());
        }

        if link_name == self.tip_link {
            return Ok(self.tip_transform());
        }

        match self.child_links.iter().position(|l| l == link_name) {
            Some(i) => Ok(self.joint_frames()[i].1),
            None => Err(ModelError::UnknownLink(link_name.to_string())),
        }
    }

    fn joint_bounds(&self) -> &[Option<JointBounds>] {
        &self.bounds
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build an isometry from a translation and roll/pitch/yaw angles.
fn isometry_from_xyz_rpy(xyz_m: &[f64; 3], rpy_rad: &[f64; 3]) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(xyz_m[0], xyz_m[1], xyz_m[2]),
        UnitQuaternion::from_euler_angles(rpy_rad[0], rpy_rad[1], rpy_rad[2]),
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-10;

    /// A planar two-revolute chain with unit link lengths, rotating about z.
    fn planar_2r() -> SerialChainModel {
        let params = ChainParams {
            base_link: "base".into(),
            tip_link: "tool".into(),
            tip_origin_xyz_m: [1.0, 0.0, 0.0],
            tip_origin_rpy_rad: [0.0, 0.0, 0.0],
            home_position_rad: Vec::new(),
            joints: vec![
                ChainJointParams {
                    name: "shoulder".into(),
                    child_link: "upper_arm".into(),
                    origin_xyz_m: [0.0, 0.0, 0.0],
                    origin_rpy_rad: [0.0, 0.0, 0.0],
                    axis: [0.0, 0.0, 1.0],
                    limits: None,
                },
                ChainJointParams {
                    name: "elbow".into(),
                    child_link: "forearm".into(),
                    origin_xyz_m: [1.0, 0.0, 0.0],
                    origin_rpy_rad: [0.0, 0.0, 0.0],
                    axis: [0.0, 0.0, 1.0],
                    limits: None,
                },
            ],
        };

        SerialChainModel::from_params(&params).unwrap()
    }

    #[test]
    fn test_fk_at_zero() {
        let model = planar_2r();

        let tool = model.link_transform("tool").unwrap();
        assert!((tool.translation.vector - Vector3::new(2.0, 0.0, 0.0)).norm() < EPS);

        let forearm = model.link_transform("forearm").unwrap();
        assert!((forearm.translation.vector - Vector3::new(1.0, 0.0, 0.0)).norm() < EPS);

        assert!(model.link_transform("base").unwrap() == Isometry3::identity());
        assert!(model.link_transform("nope").is_err());
    }

    #[test]
    fn test_fk_shoulder_rotated() {
        let mut model = planar_2r();
        model
            .set_joint_positions(&DVector::from_vec(vec![std::f64::consts::FRAC_PI_2, 0.0]))
            .unwrap();

        let tool = model.link_transform("tool").unwrap();
        assert!((tool.translation.vector - Vector3::new(0.0, 2.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn test_jacobian_matches_analytic() {
        let model = planar_2r();
        let jacobian = model.jacobian();

        // At zero configuration: column 0 moves the tip by z x (2,0,0),
        // column 1 by z x (1,0,0), angular parts are the z axis.
        assert!((jacobian[(1, 0)] - 2.0).abs() < EPS);
        assert!((jacobian[(1, 1)] - 1.0).abs() < EPS);
        assert!((jacobian[(5, 0)] - 1.0).abs() < EPS);
        assert!((jacobian[(5, 1)] - 1.0).abs() < EPS);

        // No other linear motion at this configuration
        assert!(jacobian[(0, 0)].abs() < EPS);
        assert!(jacobian[(2, 0)].abs() < EPS);
    }

    #[test]
    fn test_wrong_joint_count_rejected() {
        let mut model = planar_2r();
        let result = model.set_joint_positions(&DVector::zeros(3));

        assert!(matches!(
            result,
            Err(ModelError::WrongJointCount {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_zero_axis_rejected() {
        let params = ChainParams {
            base_link: "base".into(),
            tip_link: "tool".into(),
            tip_origin_xyz_m: [0.0, 0.0, 0.0],
            tip_origin_rpy_rad: [0.0, 0.0, 0.0],
            home_position_rad: Vec::new(),
            joints: vec![ChainJointParams {
                name: "bad".into(),
                child_link: "link".into(),
                origin_xyz_m: [0.0, 0.0, 0.0],
                origin_rpy_rad: [0.0, 0.0, 0.0],
                axis: [0.0, 0.0, 0.0],
                limits: None,
            }],
        };

        assert!(matches!(
            SerialChainModel::from_params(&params),
            Err(ModelError::InvalidAxis(_))
        ));
    }
}
