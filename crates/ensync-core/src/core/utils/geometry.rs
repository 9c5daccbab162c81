use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

pub fn calculate_centroid(coords: &[Point3<f64>]) -> Option<Point3<f64>> {
    if coords.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = coords.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / coords.len() as f64))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Least-squares rigid transform mapping `mobile` onto `target` (Kabsch).
///
/// Returns `None` when the point sets differ in length, have fewer than three
/// points, or the decomposition fails.
pub fn superposition_transform(
    mobile: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Option<Isometry3<f64>> {
    if mobile.len() != target.len() || mobile.len() < 3 {
        return None;
    }
    let mobile_center = calculate_centroid(mobile)?;
    let target_center = calculate_centroid(target)?;

    let mut covariance = Matrix3::zeros();
    for (p, q) in mobile.iter().zip(target) {
        covariance += (p - mobile_center) * (q - target_center).transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    // Reflection correction keeps the result a proper rotation.
    let mut correction = Matrix3::identity();
    if (v_t.transpose() * u.transpose()).determinant() < 0.0 {
        correction[(2, 2)] = -1.0;
    }
    let rotation = Rotation3::from_matrix_unchecked(v_t.transpose() * correction * u.transpose());
    let translation = target_center.coords - rotation * mobile_center.coords;

    Some(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}
