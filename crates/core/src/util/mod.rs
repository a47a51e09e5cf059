/// A macro to measure the evaluation time of an expression. Wraps an
/// expression, logs how long it took to evaluate, and outputs the value of the
/// expression.
#[macro_export]
macro_rules! timed {
    ($label:expr, $ex:expr) => {
        $crate::timed!($label, log::Level::Debug, $ex)
    };
    ($label:expr, $log_level:expr, $ex:expr) => {{
        let now = std::time::Instant::now();
        let value = $ex;
        let elapsed = now.elapsed();
        log::log!(
            $log_level,
            "{} took {} µs",
            $label,
            elapsed.as_micros()
        );
        value
    }};
}

// Serialize a single point as a `[x, y, z]` array. nalgebra has its own serde
// support, but its format is tied to its storage internals, and we want
// something that's pleasant to hand-write in a TOML scene file.
pub mod serde_point {
    use nalgebra::Point3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        point: &Point3<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        [point.x, point.y, point.z].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Point3<f64>, D::Error> {
        let [x, y, z] = <[f64; 3]>::deserialize(deserializer)?;
        Ok(Point3::new(x, y, z))
    }
}

// Same as above, but for a list of points
pub mod serde_points {
    use nalgebra::Point3;
    use serde::{
        ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer,
    };

    pub fn serialize<S: Serializer>(
        points: &[Point3<f64>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(points.len()))?;
        for point in points {
            seq.serialize_element(&[point.x, point.y, point.z])?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Point3<f64>>, D::Error> {
        let raw: Vec<[f64; 3]> = Vec::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect())
    }
}

/// Serialize a pose (position + rotation) as:
///
/// ```json
/// { "position": [x, y, z], "rotation": [x, y, z, w] }
/// ```
///
/// The rotation is a quaternion, and gets normalized on the way in. Both
/// fields are optional when deserializing; they default to the origin and the
/// identity rotation.
pub mod serde_pose {
    use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
    use serde::{
        de::Error, Deserialize, Deserializer, Serialize, Serializer,
    };

    /// Anything shorter than this can't be normalized into a rotation
    const MIN_QUATERNION_NORM: f64 = 1e-9;

    #[derive(Serialize, Deserialize)]
    struct Pose {
        #[serde(default)]
        position: [f64; 3],
        #[serde(default = "identity_rotation")]
        rotation: [f64; 4],
    }

    fn identity_rotation() -> [f64; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }

    /// Default value for pose fields that weren't specified
    pub fn identity() -> Isometry3<f64> {
        Isometry3::identity()
    }

    pub fn serialize<S: Serializer>(
        pose: &Isometry3<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let position = pose.translation.vector;
        let rotation = pose.rotation.coords;
        Pose {
            position: [position.x, position.y, position.z],
            rotation: [rotation.x, rotation.y, rotation.z, rotation.w],
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Isometry3<f64>, D::Error> {
        let Pose { position, rotation } = Pose::deserialize(deserializer)?;
        let [x, y, z, w] = rotation;
        let quaternion = Quaternion::new(w, x, y, z);
        if !(quaternion.norm() >= MIN_QUATERNION_NORM) {
            return Err(D::Error::custom(format!(
                "rotation must be a non-zero quaternion, got {:?}",
                rotation
            )));
        }

        Ok(Isometry3::from_parts(
            Translation3::new(position[0], position[1], position[2]),
            UnitQuaternion::from_quaternion(quaternion),
        ))
    }
}
