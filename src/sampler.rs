
use std::f32::consts::PI;

use crate::math::{ clamp, create_tangent_space, inv_erf, Vec2, Vec3 };

/// Inverse-error-function disk sample used for film-plane jitter — the
/// antialiasing filter is a clamped Gaussian, not a box.
pub fn sample_gaussian( u : f32, sigma : f32, epsilon : f32 ) -> f32 {
  let k = clamp( u * 2.0 - 1.0, -( 1.0 - epsilon ), 1.0 - epsilon );
  sigma * 1.41421356 * inv_erf( k )
}

pub fn sample_gaussian_weighted_disk( u : Vec2, sigma : f32 ) -> Vec2 {
  let r = u.x.sqrt( );
  let theta = 2.0 * PI * u.y;
  let r = sample_gaussian( r, sigma, 1e-6 );
  Vec2::new( theta.cos( ), theta.sin( ) ) * r
}

/// Malley's method: project a uniform disk sample onto the hemisphere.
pub fn sample_cosine_hemisphere( u : Vec2 ) -> Vec3 {
  let r = u.x.sqrt( );
  let theta = 2.0 * PI * u.y;
  let d = Vec2::new( theta.cos( ), theta.sin( ) ) * r;
  Vec3::new( d.x, d.y, ( 1.0 - d.dot( d ) ).max( 0.0 ).sqrt( ) )
}

pub fn cosine_hemisphere_pdf( dir : Vec3 ) -> f32 {
  ( dir.z * ( 1.0 / PI ) ).max( 0.0 )
}

/// Uniformly samples a spherical cap of half-angle `acos(cos_theta_min)`
/// around `dir`.
pub fn sample_cone( dir : Vec3, cos_theta_min : f32, u : Vec2 ) -> Vec3 {
  let cos_theta = crate::math::mix( 1.0, cos_theta_min, u.x );
  let sin_theta = ( 1.0 - cos_theta * cos_theta ).sqrt( );
  let phi = u.y * 2.0 * PI;
  let local = Vec3::new( phi.cos( ) * sin_theta, phi.sin( ) * sin_theta, cos_theta );
  create_tangent_space( dir ).mul_vec_left( local )
}

/// Uniformly samples the interior of a regular polygon (used for the
/// camera's aperture shape) by first picking one of its `sides` triangles.
pub fn sample_regular_polygon( u : Vec2, angle : f32, sides : u32 ) -> Vec2 {
  let side = ( u.x * sides as f32 ).floor( );
  let mut u = Vec2::new( u.x * sides as f32, u.y );
  u.x -= u.x.floor( );

  let side_radians = ( 2.0 * PI ) / sides as f32;
  let a1 = side_radians * side + angle;
  let a2 = side_radians * ( side + 1.0 ) + angle;
  let b = Vec2::new( a1.sin( ), a1.cos( ) );
  let c = Vec2::new( a2.sin( ), a2.cos( ) );
  let u = if u.x + u.y > 1.0 { Vec2::new( 1.0, 1.0 ) - u } else { u };
  b * u.x + c * u.y
}

/// Samples a GGX-distributed half-vector from the visible-normal
/// distribution, conditioned on `view` (Dupuy & Benyoub 2023). Degenerates
/// to the shading normal when `roughness` is effectively zero (a mirror).
pub fn sample_ggx_vndf( view : Vec3, roughness : f32, u : Vec2 ) -> Vec3 {
  if roughness < 1e-3 {
    return Vec3::new( 0.0, 0.0, 1.0 );
  }

  let v = Vec3::new( roughness * view.x, roughness * view.y, view.z ).normalize( );

  let phi = 2.0 * PI * u.x;
  let z = ( 1.0 - u.y ) * ( 1.0 + v.z ) - v.z;
  let sin_theta = clamp( 1.0 - z * z, 0.0, 1.0 ).sqrt( );
  let x = sin_theta * phi.cos( );
  let y = sin_theta * phi.sin( );
  let h = Vec3::new( x, y, z ) + v;

  Vec3::new( roughness * h.x, roughness * h.y, h.z.max( 0.0 ) ).normalize( )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cosine_hemisphere_samples_stay_in_upper_hemisphere( ) {
    for i in 0..32 {
      let u = Vec2::new( ( i as f32 + 0.5 ) / 32.0, 0.37 );
      let d = sample_cosine_hemisphere( u );
      assert!( d.z >= 0.0 );
      assert!( ( d.len( ) - 1.0 ).abs( ) < 1e-5 );
    }
  }

  #[test]
  fn cone_sample_at_u1_zero_is_axis( ) {
    let dir = Vec3::new( 0.0, 0.0, 1.0 );
    let sample = sample_cone( dir, 0.9, Vec2::new( 0.0, 0.25 ) );
    assert!( ( sample.z - 1.0 ).abs( ) < 1e-5 );
  }

  #[test]
  fn ggx_vndf_degenerates_to_normal_at_zero_roughness( ) {
    let view = Vec3::new( 0.3, 0.1, 0.9 ).normalize( );
    let h = sample_ggx_vndf( view, 0.0, Vec2::new( 0.2, 0.8 ) );
    assert_eq!( h, Vec3::new( 0.0, 0.0, 1.0 ) );
  }

  #[test]
  fn regular_polygon_samples_stay_bounded( ) {
    for i in 0..16 {
      let u = Vec2::new( ( i as f32 + 0.5 ) / 16.0, 0.6 );
      let p = sample_regular_polygon( u, 0.0, 6 );
      assert!( p.len( ) <= 1.0001 );
    }
  }
}
