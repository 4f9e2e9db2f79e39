//! Triangle soup input for navigation mesh baking

use crate::{Error, Result};
use glam::Vec3;

#[cfg(feature = "std")]
use std::path::Path;

/// A triangle soup with one area id per triangle
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TriMesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Vertex indices, three per triangle
    pub triangles: Vec<[u32; 3]>,
    /// Area id per triangle
    pub areas: Vec<u8>,
}

impl TriMesh {
    /// Area id given to faces read from OBJ data
    pub const DEFAULT_AREA: u8 = 63;

    /// Creates a new empty triangle mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a mesh from an OBJ file
    #[cfg(feature = "std")]
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_obj_str(&content)
    }

    /// Parses OBJ content from a string
    ///
    /// Only `v` and `f` records are read. Polygonal faces are fan triangulated
    /// and every triangle gets [`TriMesh::DEFAULT_AREA`].
    ///
    /// # Example
    ///
    /// ```
    /// use navgeom_common::TriMesh;
    ///
    /// let obj_content = r#"
    /// v 0.0 0.0 0.0
    /// v 1.0 0.0 0.0
    /// v 0.5 0.0 1.0
    /// f 1 2 3
    /// "#;
    ///
    /// let mesh = TriMesh::from_obj_str(obj_content).unwrap();
    /// assert_eq!(mesh.vertices.len(), 3);
    /// assert_eq!(mesh.triangles.len(), 1);
    /// ```
    pub fn from_obj_str(content: &str) -> Result<Self> {
        let mut mesh = Self::new();

        for (line_no, line) in content.lines().enumerate() {
            mesh.parse_obj_line(line)
                .map_err(|e| Error::InvalidMesh(format!("line {}: {}", line_no + 1, e)))?;
        }

        Ok(mesh)
    }

    fn parse_obj_line(&mut self, line: &str) -> std::result::Result<(), String> {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let mut coord = |axis: &str| -> std::result::Result<f32, String> {
                    tokens
                        .next()
                        .ok_or_else(|| format!("vertex is missing its {axis} coordinate"))?
                        .parse::<f32>()
                        .map_err(|_| format!("vertex {axis} coordinate is not a number"))
                };
                let x = coord("x")?;
                let y = coord("y")?;
                let z = coord("z")?;
                self.vertices.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let mut face = Vec::new();
                for token in tokens {
                    let index = token
                        .split('/')
                        .next()
                        .unwrap_or_default()
                        .parse::<i64>()
                        .map_err(|_| "face vertex index is not a number".to_string())?;
                    face.push(self.resolve_index(index)?);
                }

                if face.len() < 3 {
                    return Err("face has less than 3 vertices".to_string());
                }

                for i in 1..face.len() - 1 {
                    self.triangles.push([face[0], face[i], face[i + 1]]);
                    self.areas.push(Self::DEFAULT_AREA);
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// OBJ indices are 1-based, negative values count back from the last vertex
    fn resolve_index(&self, index: i64) -> std::result::Result<u32, String> {
        let count = self.vertices.len() as i64;
        let resolved = if index < 0 { count + index } else { index - 1 };
        if resolved < 0 || resolved >= count {
            return Err(format!("face references missing vertex {index}"));
        }
        Ok(resolved as u32)
    }

    /// Sets the same area id on every triangle
    pub fn with_area(mut self, area: u8) -> Self {
        self.areas.iter_mut().for_each(|a| *a = area);
        self
    }

    /// Calculates the axis-aligned bounding box of the mesh
    pub fn calculate_bounds(&self) -> Option<(Vec3, Vec3)> {
        crate::calc_bounds(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_is_fan_triangulated() -> Result<()> {
        let obj = r#"
# quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 0.0 1.0
v 0.0 0.0 1.0
vn 0.0 1.0 0.0
f 1//1 2//1 3//1 4//1
"#;
        let mesh = TriMesh::from_obj_str(obj)?;
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.areas, vec![TriMesh::DEFAULT_AREA; 2]);
        Ok(())
    }

    #[test]
    fn test_negative_indices() -> Result<()> {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 0 1\nf -3 -2 -1\n";
        let mesh = TriMesh::from_obj_str(obj)?.with_area(5);
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.areas, vec![5]);
        Ok(())
    }

    #[test]
    fn test_invalid_input() {
        assert!(TriMesh::from_obj_str("v 0.0 0.0").is_err());
        assert!(TriMesh::from_obj_str("v 0 0 0\nv 1 0 0\nf 1 2").is_err());
        assert!(TriMesh::from_obj_str("v 0 0 0\nf 1 2 3").is_err());
    }
}
