
use thiserror::Error;

/// Errors surfaced from asset loading and scene setup. Per-pixel rendering
/// itself cannot fail — any degenerate math (NaNs, zero PDFs) is handled
/// inline by the tracer instead of propagated as an error.
#[derive(Error,Debug)]
pub enum RenderError {
  #[error("failed to read mesh file {path}: {source}")]
  MeshLoad {
    path   : String,
    source : std::io::Error
  },

  #[error("obj file references unknown material '{name}'")]
  UnknownMaterial { name : String },

  #[error("obj file face references out-of-range {kind} index {index}")]
  MalformedMesh { kind : &'static str, index : i64 },

  #[error("scene references mesh index {index} but only {count} meshes were loaded")]
  MeshIndexOutOfRange { index : usize, count : usize },

  #[error("failed to write image to {path}: {source}")]
  ImageWrite {
    path   : String,
    source : std::io::Error
  },

  #[error("render configuration is invalid: {0}")]
  InvalidConfig( String )
}
