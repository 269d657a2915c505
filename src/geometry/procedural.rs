//! Deterministic procedural meshes for benchmarks and tests.
//!
//! All generators are seeded so the same arguments always give the same
//! triangles.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Mesh, Vertex};

/// Push one triangle built from three positions.
fn push_triangle(mesh: &mut Mesh, p: [Vec3; 3]) {
    let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
    let base = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::new(p[0], normal, Vec2::new(0.0, 0.0)));
    mesh.vertices.push(Vertex::new(p[1], normal, Vec2::new(1.0, 0.0)));
    mesh.vertices.push(Vertex::new(p[2], normal, Vec2::new(0.0, 1.0)));
    mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
}

/// Random triangle with its vertices within `size` of `center` on every axis.
fn jittered_triangle(rng: &mut StdRng, center: Vec3, size: f32) -> [Vec3; 3] {
    let mut jitter = || {
        Vec3::new(
            rng.gen_range(-size..=size),
            rng.gen_range(-size..=size),
            rng.gen_range(-size..=size),
        )
    };
    [center + jitter(), center + jitter(), center + jitter()]
}

/// `count` small triangles with centers uniformly spread over `[0, extent]^3`.
pub fn scatter(count: usize, extent: f32, size: f32, seed: u64) -> Mesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = Mesh::default();
    for _ in 0..count {
        let center = Vec3::new(
            rng.gen_range(0.0..extent),
            rng.gen_range(0.0..extent),
            rng.gen_range(0.0..extent),
        );
        let tri = jittered_triangle(&mut rng, center, size);
        push_triangle(&mut mesh, tri);
    }
    mesh
}

/// `count` small triangles with centers inside a cube of half-width `radius`.
pub fn cluster(count: usize, center: Vec3, radius: f32, size: f32, seed: u64) -> Mesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = Mesh::default();
    for _ in 0..count {
        let c = center
            + Vec3::new(
                rng.gen_range(-radius..=radius),
                rng.gen_range(-radius..=radius),
                rng.gen_range(-radius..=radius),
            );
        let tri = jittered_triangle(&mut rng, c, size);
        push_triangle(&mut mesh, tri);
    }
    mesh
}

/// Planar strip of unit quads along +X, lying in the `z = 0` plane.
pub fn quad_strip(quads: usize) -> Mesh {
    let mut mesh = Mesh::default();
    for i in 0..quads {
        let x = i as f32;
        let a = Vec3::new(x, 0.0, 0.0);
        let b = Vec3::new(x + 1.0, 0.0, 0.0);
        let c = Vec3::new(x + 1.0, 1.0, 0.0);
        let d = Vec3::new(x, 1.0, 0.0);
        push_triangle(&mut mesh, [a, b, c]);
        push_triangle(&mut mesh, [a, c, d]);
    }
    mesh
}

/// `count` unit triangles laid out in ascending X order, `spacing` apart.
pub fn sorted_row(count: usize, spacing: f32) -> Mesh {
    let mut mesh = Mesh::default();
    for i in 0..count {
        let x = i as f32 * spacing;
        push_triangle(
            &mut mesh,
            [
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x, 1.0, 0.5),
            ],
        );
    }
    mesh
}

/// `count` copies of the same triangle.
pub fn coincident(count: usize) -> Mesh {
    let mut mesh = Mesh::default();
    for _ in 0..count {
        push_triangle(
            &mut mesh,
            [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 1.0)],
        );
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_is_deterministic() {
        let a = scatter(20, 100.0, 0.5, 7);
        let b = scatter(20, 100.0, 0.5, 7);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.triangle_count(), 20);
        assert_eq!(a.indices.len(), 60);
    }

    #[test]
    fn test_quad_strip_is_planar() {
        let mesh = quad_strip(4);
        assert_eq!(mesh.triangle_count(), 8);
        assert!(mesh.vertices.iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn test_cluster_stays_near_center() {
        let center = Vec3::new(100.0, 0.0, 0.0);
        let mesh = cluster(50, center, 2.0, 0.5, 1);
        for v in &mesh.vertices {
            assert!((v.position() - center).abs().max_element() <= 2.5 + 1e-4);
        }
    }
}
