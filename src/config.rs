
use crate::math::Vec3;

/// A salt mixed into every pixel-sample RNG seed, kept from the original
/// assignment-seed convention — here it's just a fixed constant, not tied
/// to any person.
pub const STUDENT_ID : u32 = 152121358;

#[cfg(feature = "production")]
mod resolution {
  pub const IMAGE_WIDTH         : u32 = 1920;
  pub const IMAGE_HEIGHT        : u32 = 1080;
  pub const SAMPLES_PER_PIXEL   : u32 = 1024;
  pub const FRAMERATE           : u32 = 30;
  pub const MAX_BOUNCES         : u32 = 5;
}

#[cfg(not(feature = "production"))]
mod resolution {
  pub const IMAGE_WIDTH         : u32 = 640;
  pub const IMAGE_HEIGHT        : u32 = 360;
  pub const SAMPLES_PER_PIXEL   : u32 = 256;
  pub const FRAMERATE           : u32 = 30;
  pub const MAX_BOUNCES         : u32 = 4;
}

pub use resolution::*;

pub const SAMPLES_PER_MOTION_BLUR_STEP : u32 = 8;
pub const MIN_RAY_DIST : f32 = 1e-4;
pub const MAX_RAY_DIST : f32 = 1e9;
pub const PATH_SPACE_REGULARIZATION_GAMMA : f32 = 0.15;

pub const EARTH_RADIUS : f32 = 6.3781e6;
pub const ATMOSPHERE_PRIMARY_ITERATIONS : u32 = 8;
pub const ATMOSPHERE_SECONDARY_ITERATIONS : u32 = 4;
pub const ATMOSPHERE_HEIGHT : f32 = 1.0e5;
pub const ATMOSPHERE_RAYLEIGH_SCALE_HEIGHT : f32 = 7994.0;
pub const ATMOSPHERE_MIE_ANISOTROPY : f32 = 0.80;
pub const ATMOSPHERE_MIE_SCALE_HEIGHT : f32 = 1200.0;

pub fn atmosphere_rayleigh_coefficient( ) -> Vec3 {
  Vec3::new( 5.8e-6, 13.6e-6, 33.1e-6 )
}

pub fn atmosphere_mie_coefficient( ) -> Vec3 {
  Vec3::splat( 4.0e-6 )
}
