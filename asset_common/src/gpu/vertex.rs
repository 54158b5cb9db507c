use serde::{Deserialize, Serialize};

/// Interleaved vertex layout handed to the GPU backend.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
    pub color: [f32; 4],
    pub object_id: u32,
}

impl Vertex {
    pub const STRIDE: usize = std::mem::size_of::<Self>();
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0; 2],
            tangent: [1.0, 0.0, 0.0, 1.0],
            color: [1.0; 4],
            object_id: 0,
        }
    }
}
