//! Dense linear algebra primitives: system solving, point-set rank and
//! circumcenters of simplices of any rank embedded in any dimension.

use nalgebra::{DMatrix, DVector};

use crate::error::{DiagramError, Result};
use crate::point::dot;

/// Solve `a * x = b` for a square system.
pub fn solve(a: DMatrix<f64>, b: DVector<f64>) -> Result<DVector<f64>> {
    if !a.is_square() || a.nrows() != b.len() {
        return Err(DiagramError::degenerate(format!(
            "cannot solve a {}x{} system with {} right-hand terms",
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }

    a.lu()
        .solve(&b)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or_else(|| DiagramError::degenerate("singular linear system"))
}

/// Affine rank of a point set: the rank of the difference vectors from the first point.
///
/// `tolerance` is relative to the largest coordinate difference.
pub fn rank(points: &[&[f64]], tolerance: f64) -> usize {
    let Some((first, rest)) = points.split_first() else {
        return 0;
    };
    let dim = first.len();
    if rest.is_empty() || dim == 0 {
        return 0;
    }

    let vectors = DMatrix::from_fn(rest.len(), dim, |i, j| rest[i][j] - first[j]);
    let scale = vectors.amax();
    if scale == 0.0 {
        return 0;
    }

    vectors.rank(tolerance * scale * rest.len().max(dim) as f64)
}

/// Returns the point equidistant from every site, lying in the affine hull of the sites.
///
/// With `r + 1` sites in `D` dimensions the bisector hyperplanes between the first
/// site and every other one give `r` equations. When `r == D` they are solved
/// directly. Otherwise the center is written as `s0 + sum(t_k * (s_k - s0))` and the
/// same hyperplanes pin down the `r` parameters.
pub fn circumcenter(sites: &[&[f64]], tolerance: f64) -> Result<Vec<f64>> {
    let Some((first, rest)) = sites.split_first() else {
        return Err(DiagramError::degenerate("circumcenter of an empty site set"));
    };
    let dim = first.len();
    let r = rest.len();

    if r == 0 {
        return Ok(first.to_vec());
    }
    if r > dim {
        return Err(DiagramError::degenerate(format!(
            "{} sites cannot be affinely independent in {dim} dimensions",
            r + 1
        )));
    }
    if rank(sites, tolerance) < r {
        return Err(DiagramError::degenerate(
            "circumcenter of affinely dependent sites",
        ));
    }

    // Bisector between sites[0] and sites[i + 1]: normals[i] . x = offsets[i]
    let normals: Vec<Vec<f64>> = rest
        .iter()
        .map(|s| first.iter().zip(s.iter()).map(|(a, b)| a - b).collect())
        .collect();
    let offsets: Vec<f64> = rest
        .iter()
        .zip(&normals)
        .map(|(s, c)| {
            let mid: Vec<f64> = first.iter().zip(s.iter()).map(|(a, b)| (a + b) / 2.0).collect();
            dot(c, &mid)
        })
        .collect();

    if r == dim {
        let a = DMatrix::from_fn(dim, dim, |i, j| normals[i][j]);
        let b = DVector::from_fn(dim, |i, _| offsets[i]);
        let x = solve(a, b)?;
        return Ok(x.iter().copied().collect());
    }

    let directions: Vec<Vec<f64>> = rest
        .iter()
        .map(|s| s.iter().zip(first.iter()).map(|(a, b)| a - b).collect())
        .collect();

    let params: Vec<f64> = if r == 1 {
        let coeff = dot(&normals[0], &directions[0]);
        if coeff == 0.0 {
            return Err(DiagramError::degenerate("coincident sites"));
        }
        vec![(offsets[0] - dot(&normals[0], first)) / coeff]
    } else {
        let a = DMatrix::from_fn(r, r, |row, col| dot(&normals[row], &directions[col]));
        let b = DVector::from_fn(r, |row, _| offsets[row] - dot(&normals[row], first));
        solve(a, b)?.iter().copied().collect()
    };

    let mut center = first.to_vec();
    for (t, direction) in params.iter().zip(&directions) {
        for (c, d) in center.iter_mut().zip(direction) {
            *c += t * d;
        }
    }
    Ok(center)
}

/// Unit normal of the hyperplane spanned by `facet` inside the affine hull of
/// `facet` and `opposite`, pointing away from `opposite`.
pub fn hull_normal(facet: &[&[f64]], opposite: &[f64], tolerance: f64) -> Result<Vec<f64>> {
    let Some((anchor, rest)) = facet.split_first() else {
        return Err(DiagramError::degenerate("normal of an empty facet"));
    };
    let dim = anchor.len();

    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(rest.len());
    for site in rest {
        let mut v = DVector::from_fn(dim, |i, _| site[i] - anchor[i]);
        let scale = v.norm();
        for b in &basis {
            let projection = v.dot(b);
            v -= b * projection;
        }
        let length = v.norm();
        if length <= tolerance * scale {
            return Err(DiagramError::degenerate("facet sites are affinely dependent"));
        }
        basis.push(v / length);
    }

    let mut outward = DVector::from_fn(dim, |i, _| anchor[i] - opposite[i]);
    let scale = outward.norm();
    for b in &basis {
        let projection = outward.dot(b);
        outward -= b * projection;
    }

    let length = outward.norm();
    if length <= tolerance * scale || length == 0.0 {
        return Err(DiagramError::degenerate(
            "opposite site lies in the facet hyperplane",
        ));
    }

    Ok((outward / length).iter().copied().collect())
}

// =============================================================================

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use glam::DVec3;
    use rand::Rng;
    use rand_distr::StandardNormal;

    use super::*;
    use crate::point::{distance_squared, norm};

    const TOL: f64 = 1e-10;

    fn random_sphere_point(dim: usize) -> Vec<f64> {
        loop {
            let v: Vec<f64> = (0..dim)
                .map(|_| rand::thread_rng().sample::<f64, _>(StandardNormal))
                .collect();
            let length = norm(&v);
            if length > 0.01 {
                return v.iter().map(|x| x / length).collect();
            }
        }
    }

    fn random_sphere_simplex(dim: usize, sites: usize) -> (Vec<Vec<f64>>, Vec<f64>, f64) {
        let center_dist = rand::distributions::Uniform::from(-100.0..100.0);
        let center: Vec<f64> = (0..dim)
            .map(|_| rand::thread_rng().sample(center_dist))
            .collect();
        let radius = rand::thread_rng().sample(rand::distributions::Uniform::from(1.0..100.0));

        let points = (0..sites)
            .map(|_| {
                random_sphere_point(dim)
                    .iter()
                    .zip(&center)
                    .map(|(p, c)| p * radius + c)
                    .collect()
            })
            .collect();
        (points, center, radius)
    }

    /// Closed-form circumcenter of a tetrahedron.
    fn tetrahedron_circumcenter(v: [DVec3; 4]) -> DVec3 {
        let u1 = v[1] - v[0];
        let u2 = v[2] - v[0];
        let u3 = v[3] - v[0];

        v[0] + (u1.length_squared() * u2.cross(u3)
            + u2.length_squared() * u3.cross(u1)
            + u3.length_squared() * u1.cross(u2))
            / (2.0 * u1.dot(u2.cross(u3)))
    }

    #[test]
    fn test_circumcenter_full_rank() {
        for dim in 2..6 {
            for _ in 0..20 {
                let (points, true_center, true_radius) = random_sphere_simplex(dim, dim + 1);
                let refs: Vec<&[f64]> = points.iter().map(|p| p.as_slice()).collect();

                let Ok(center) = circumcenter(&refs, TOL) else {
                    // nearly flat random simplex, skip
                    continue;
                };

                let delta = distance_squared(&center, &true_center).sqrt();
                if delta > 0.003 {
                    panic!("Distance err: {center:?} vs {true_center:?} = {delta}");
                }

                let radius = distance_squared(&center, &points[0]).sqrt();
                assert_relative_eq!(radius, true_radius, epsilon = 0.003);
            }
        }
    }

    #[test]
    fn test_circumcenter_matches_tetrahedron_formula() {
        let vertices = [
            DVec3::new(0.0, 0.1, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.9, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
        ];
        let expected = tetrahedron_circumcenter(vertices);

        let points: Vec<Vec<f64>> = vertices.iter().map(|v| v.to_array().to_vec()).collect();
        let refs: Vec<&[f64]> = points.iter().map(|p| p.as_slice()).collect();
        let center = circumcenter(&refs, TOL).unwrap();

        assert_relative_eq!(center[0], expected.x, epsilon = 1e-9);
        assert_relative_eq!(center[1], expected.y, epsilon = 1e-9);
        assert_relative_eq!(center[2], expected.z, epsilon = 1e-9);
    }

    #[test]
    fn test_circumcenter_subspace() {
        // a triangle living in the z = 2 plane of 3D space
        let points: [&[f64]; 3] = [&[0.0, 0.0, 2.0], &[4.0, 0.0, 2.0], &[0.0, 2.0, 2.0]];
        let center = circumcenter(&points, TOL).unwrap();

        assert_relative_eq!(center[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(center[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(center[2], 2.0, epsilon = 1e-12);

        // a segment in 4D
        let segment: [&[f64]; 2] = [&[10.0, 0.0, 45.0, 2.0], &[10.0, 0.0, 45.0, 50.0]];
        let center = circumcenter(&segment, TOL).unwrap();
        assert_eq!(center, vec![10.0, 0.0, 45.0, 26.0]);

        // a random triangle in 5D
        let (points, _, _) = random_sphere_simplex(5, 3);
        let refs: Vec<&[f64]> = points.iter().map(|p| p.as_slice()).collect();
        if let Ok(center) = circumcenter(&refs, TOL) {
            let r0 = distance_squared(&center, &points[0]);
            assert_relative_eq!(distance_squared(&center, &points[1]), r0, max_relative = 1e-6);
            assert_relative_eq!(distance_squared(&center, &points[2]), r0, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_circumcenter_degenerate() {
        let collinear: [&[f64]; 3] = [&[0.0, 0.0], &[1.0, 1.0], &[2.0, 2.0]];
        assert!(matches!(
            circumcenter(&collinear, TOL),
            Err(DiagramError::DegenerateConfiguration { .. })
        ));

        let too_many: [&[f64]; 3] = [&[0.0], &[1.0], &[2.0]];
        assert!(circumcenter(&too_many, TOL).is_err());

        let single: [&[f64]; 1] = [&[3.0, 4.0]];
        assert_eq!(circumcenter(&single, TOL).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_rank() {
        let collinear: [&[f64]; 4] = [
            &[10.0, 0.0, 45.0, 2.0],
            &[10.0, 0.0, 45.0, 50.0],
            &[10.0, 0.0, 45.0, -1.0],
            &[10.0, 0.0, 45.0, -21.0],
        ];
        assert_eq!(rank(&collinear, TOL), 1);

        let plane: [&[f64]; 4] = [
            &[0.0, 0.0, 1.0],
            &[1.0, 0.0, 1.0],
            &[0.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0],
        ];
        assert_eq!(rank(&plane, TOL), 2);

        let tetra: [&[f64]; 4] = [
            &[0.0, 0.0, 0.0],
            &[1.0, 0.0, 0.0],
            &[0.0, 1.0, 0.0],
            &[0.0, 0.0, 1.0],
        ];
        assert_eq!(rank(&tetra, TOL), 3);

        let single: [&[f64]; 1] = [&[1.0, 2.0]];
        assert_eq!(rank(&single, TOL), 0);
        let repeated: [&[f64]; 2] = [&[1.0, 2.0], &[1.0, 2.0]];
        assert_eq!(rank(&repeated, TOL), 0);
    }

    #[test]
    fn test_solve() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let b = DVector::from_column_slice(&[2.0, 2.0]);
        let x = solve(a, b).unwrap();
        assert_relative_eq!(x[0], 1.0);
        assert_relative_eq!(x[1], 0.5);

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_column_slice(&[1.0, 1.0]);
        assert!(solve(singular, b).is_err());
    }

    #[test]
    fn test_hull_normal() {
        // edge on the x axis, opposite site above it
        let facet: [&[f64]; 2] = [&[0.0, 0.0], &[2.0, 0.0]];
        let normal = hull_normal(&facet, &[1.0, 3.0], TOL).unwrap();
        assert_relative_eq!(normal[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(normal[1], -1.0, epsilon = 1e-12);

        // single site facet of a segment embedded in 3D
        let facet: [&[f64]; 1] = [&[0.0, 0.0, 5.0]];
        let normal = hull_normal(&facet, &[0.0, 0.0, 1.0], TOL).unwrap();
        assert_eq!(normal, vec![0.0, 0.0, 1.0]);

        // the normal stays inside the plane of the triangle
        let facet: [&[f64]; 2] = [&[0.0, 0.0, 1.0], &[1.0, 1.0, 1.0]];
        let normal = hull_normal(&facet, &[1.0, 0.0, 1.0], TOL).unwrap();
        assert_relative_eq!(normal[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(normal[0], -normal[1], epsilon = 1e-12);
        assert!(normal[1] > 0.0);

        assert!(hull_normal(&facet, &[2.0, 2.0, 1.0], TOL).is_err());
    }
}
