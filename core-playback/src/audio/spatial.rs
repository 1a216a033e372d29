//! Mapping spot positions on cube faces to listener-relative directions.
//!
//! The listener stands at the center of a cube and looks north (`-z`), with
//! `+x` to the right and `+y` up. A spot is placed by a face and an origin
//! in that face's texture, `(0, 0)` at the top-left corner.

use bridge_traits::Vec3;

/// Cube face a spot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Face {
    /// Face for a scene index (`0` north through `5` down).
    pub fn from_index(index: u32) -> Option<Self> {
        Some(match index {
            0 => Face::North,
            1 => Face::East,
            2 => Face::South,
            3 => Face::West,
            4 => Face::Up,
            5 => Face::Down,
            _ => return None,
        })
    }
}

/// Origin of a spot in face-texture pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Unit direction from the listener toward `origin` on `face`.
///
/// `face_size` is the texture edge length; origins outside it are clamped
/// onto the face.
pub fn face_direction(face: Face, origin: Point, face_size: f32) -> Vec3 {
    let size = if face_size > 0.0 { face_size } else { 1.0 };
    let u = (origin.x / size).clamp(0.0, 1.0) * 2.0 - 1.0;
    let v = (origin.y / size).clamp(0.0, 1.0) * 2.0 - 1.0;

    let raw = match face {
        Face::North => Vec3::new(u, -v, -1.0),
        Face::East => Vec3::new(1.0, -v, u),
        Face::South => Vec3::new(-u, -v, 1.0),
        Face::West => Vec3::new(-1.0, -v, -u),
        Face::Up => Vec3::new(u, 1.0, v),
        Face::Down => Vec3::new(u, -1.0, -v),
    };

    let length = raw.length();
    Vec3::new(raw.x / length, raw.y / length, raw.z / length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5 && (a.z - b.z).abs() < 1e-5
    }

    #[test]
    fn test_face_centers_point_along_axes() {
        let center = Point::new(1024.0, 1024.0);

        assert!(approx(face_direction(Face::North, center, 2048.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(approx(face_direction(Face::East, center, 2048.0), Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx(face_direction(Face::South, center, 2048.0), Vec3::new(0.0, 0.0, 1.0)));
        assert!(approx(face_direction(Face::West, center, 2048.0), Vec3::new(-1.0, 0.0, 0.0)));
        assert!(approx(face_direction(Face::Up, center, 2048.0), Vec3::new(0.0, 1.0, 0.0)));
        assert!(approx(face_direction(Face::Down, center, 2048.0), Vec3::new(0.0, -1.0, 0.0)));
    }

    #[test]
    fn test_north_face_edges() {
        let right = face_direction(Face::North, Point::new(2048.0, 1024.0), 2048.0);
        assert!(right.x > 0.7 && right.z < -0.7);

        let top = face_direction(Face::North, Point::new(1024.0, 0.0), 2048.0);
        assert!(top.y > 0.7);
    }

    #[test]
    fn test_directions_are_unit_length() {
        for index in 0..6 {
            let face = Face::from_index(index).unwrap();
            let dir = face_direction(face, Point::new(300.0, 1700.0), 2048.0);
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
        assert_eq!(Face::from_index(6), None);
    }
}
