mod material;
mod mesh;
mod object;
mod texture;

pub use material::*;
pub use mesh::*;
pub use object::*;
pub use texture::*;
