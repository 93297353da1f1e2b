
use std::f32::consts::PI;

use crate::config::{
  atmosphere_mie_coefficient, atmosphere_rayleigh_coefficient,
  ATMOSPHERE_HEIGHT, ATMOSPHERE_MIE_ANISOTROPY, ATMOSPHERE_MIE_SCALE_HEIGHT,
  ATMOSPHERE_PRIMARY_ITERATIONS, ATMOSPHERE_RAYLEIGH_SCALE_HEIGHT,
  ATMOSPHERE_SECONDARY_ITERATIONS, EARTH_RADIUS, MAX_RAY_DIST
};
use crate::math::Vec3;
use crate::ray::ray_sphere_intersection;

fn earth_origin( ) -> Vec3 {
  Vec3::new( 0.0, -EARTH_RADIUS, 0.0 )
}

/// Attenuation-only pass through Earth's atmosphere along `(pos, view)` up
/// to `tmax` (pass a negative `tmax` for an unbounded ray, e.g. toward the
/// sky). `jitter` decorrelates the ray-march step boundaries across pixel
/// samples. Returns black if the segment dips below sea level (the sun is
/// below the horizon from `pos`'s perspective).
pub fn nishita_atmosphere_attenuation( jitter : f32, iterations : u32, pos : Vec3, view : Vec3, tmax : f32 ) -> Vec3 {
  let earth_origin = earth_origin( );
  let mut attenuation = Vec3::new( 1.0, 1.0, 1.0 );

  let hit = ray_sphere_intersection( pos, view, earth_origin, EARTH_RADIUS + ATMOSPHERE_HEIGHT );
  let ( tmin, atmax ) = match hit {
    Some( t ) => t,
    None => return attenuation
  };
  let tmin = tmin.max( 0.0 );
  let tmax = atmax.min( if tmax < 0.0 { MAX_RAY_DIST } else { tmax } );

  let segment = ( tmax - tmin ) / iterations as f32;
  let mut rayleigh_optical_depth = 0.0;
  let mut mie_optical_depth = 0.0;
  let mut shadowed = false;

  for i in 0..iterations {
    let t = segment * ( jitter + i as f32 );
    let height = ( pos + t * view - earth_origin ).len( ) - EARTH_RADIUS;
    rayleigh_optical_depth += ( -height / ATMOSPHERE_RAYLEIGH_SCALE_HEIGHT ).exp( );
    mie_optical_depth += ( -height / ATMOSPHERE_MIE_SCALE_HEIGHT ).exp( );
    if height < 0.0 { shadowed = true; }
  }

  let tau = ( atmosphere_rayleigh_coefficient( ) * rayleigh_optical_depth +
    atmosphere_mie_coefficient( ) * mie_optical_depth ) * segment;
  attenuation = Vec3::new( ( -tau.x ).exp( ), ( -tau.y ).exp( ), ( -tau.z ).exp( ) );
  if shadowed { attenuation = Vec3::ZERO; }

  attenuation
}

/// Result of the full primary+secondary Nishita scattering integral: the
/// extinction suffered by light traveling `(pos, view)` plus the radiance
/// it gains from in-scattered sunlight along the way.
pub struct ScatteringResult {
  pub attenuation : Vec3,
  pub in_scatter : Vec3
}

/// Full ray-marched sky model: primary march along the view ray, with a
/// secondary march toward the sun at each primary step to account for
/// self-shadowing by the Earth. `jitter` is `(u, v)` decorrelation noise for
/// the primary/secondary step boundaries respectively.
pub fn nishita_atmosphere_scattering(
  jitter : (f32, f32), pos : Vec3, view : Vec3, tmax : f32,
  light_dir : Vec3, light_color : Vec3
) -> ScatteringResult {
  let earth_origin = earth_origin( );

  let mut result = ScatteringResult { attenuation: Vec3::new( 1.0, 1.0, 1.0 ), in_scatter: Vec3::ZERO };
  if tmax > 0.0 && tmax < 1e3 { return result; }

  let hit = ray_sphere_intersection( pos, view, earth_origin, EARTH_RADIUS + ATMOSPHERE_HEIGHT );
  let ( tmin, atmax ) = match hit {
    Some( t ) => t,
    None => return result
  };
  let tmin = tmin.max( 0.0 );
  let tmax = atmax.min( if tmax < 0.0 { MAX_RAY_DIST } else { tmax } );

  let interval = tmax - tmin;
  let segment = interval / ATMOSPHERE_PRIMARY_ITERATIONS as f32;

  let mu = view.dot( light_dir );
  let rayleigh_phase = 3.0 / ( 16.0 * PI ) * ( 1.0 + mu * mu );
  let g = ATMOSPHERE_MIE_ANISOTROPY;
  let mie_phase = 3.0 / ( 8.0 * PI ) * ( 1.0 - g * g ) * ( 1.0 + mu * mu ) /
    ( ( 2.0 + g * g ) * ( 1.0 + g * g - 2.0 * g * mu ).powf( 1.5 ) );

  let mut rayleigh_optical_depth = 0.0;
  let mut mie_optical_depth = 0.0;
  let mut rayleigh_sum = Vec3::ZERO;
  let mut mie_sum = Vec3::ZERO;

  for i in 0..ATMOSPHERE_PRIMARY_ITERATIONS {
    let t = segment * ( jitter.0 + i as f32 );
    let p = pos + t * view;

    let ( light_tmin, light_tmax ) = ray_sphere_intersection(
      p, light_dir, earth_origin, EARTH_RADIUS + ATMOSPHERE_HEIGHT ).unwrap_or( ( 0.0, 0.0 ) );
    let light_segment = ( light_tmax - light_tmin ) / ATMOSPHERE_SECONDARY_ITERATIONS as f32;
    let mut light_rayleigh_optical_depth = 0.0;
    let mut light_mie_optical_depth = 0.0;
    let mut shadowed = false;

    for j in 0..ATMOSPHERE_SECONDARY_ITERATIONS {
      let t = light_segment * ( jitter.1 + j as f32 );
      let height = ( p + t * light_dir - earth_origin ).len( ) - EARTH_RADIUS;
      light_rayleigh_optical_depth += ( -height / ATMOSPHERE_RAYLEIGH_SCALE_HEIGHT ).exp( );
      light_mie_optical_depth += ( -height / ATMOSPHERE_MIE_SCALE_HEIGHT ).exp( );
      if height < 0.0 { shadowed = true; }
    }

    let height = ( ( p - earth_origin ).len( ) - EARTH_RADIUS ).max( 0.0 );
    let rayleigh_density = ( -height / ATMOSPHERE_RAYLEIGH_SCALE_HEIGHT ).exp( ) * segment;
    let mie_density = ( -height / ATMOSPHERE_MIE_SCALE_HEIGHT ).exp( ) * segment;

    rayleigh_optical_depth += rayleigh_density;
    mie_optical_depth += mie_density;

    let tau = atmosphere_rayleigh_coefficient( ) * ( light_rayleigh_optical_depth * light_segment + rayleigh_optical_depth ) +
      atmosphere_mie_coefficient( ) * ( light_mie_optical_depth * light_segment + mie_optical_depth );

    let mut local_attenuation = Vec3::new( ( -tau.x ).exp( ), ( -tau.y ).exp( ), ( -tau.z ).exp( ) );
    if shadowed { local_attenuation = Vec3::ZERO; }

    rayleigh_sum = rayleigh_sum + local_attenuation * rayleigh_density;
    mie_sum = mie_sum + local_attenuation * mie_density;
  }

  let tau = atmosphere_rayleigh_coefficient( ) * rayleigh_optical_depth +
    atmosphere_mie_coefficient( ) * mie_optical_depth;

  result.attenuation = Vec3::new( ( -tau.x ).exp( ), ( -tau.y ).exp( ), ( -tau.z ).exp( ) );
  result.in_scatter = ( rayleigh_sum * atmosphere_rayleigh_coefficient( ) * rayleigh_phase +
    mie_sum * atmosphere_mie_coefficient( ) * mie_phase ) * light_color * 4.0;

  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn attenuation_is_identity_when_atmosphere_is_missed( ) {
    let pos = Vec3::new( 0.0, 1e9, 0.0 );
    let view = Vec3::new( 0.0, 1.0, 0.0 );
    let a = nishita_atmosphere_attenuation( 0.5, 8, pos, view, -1.0 );
    assert_eq!( a, Vec3::new( 1.0, 1.0, 1.0 ) );
  }

  #[test]
  fn attenuation_through_atmosphere_darkens_light( ) {
    let pos = Vec3::new( 0.0, 10.0, 0.0 );
    let view = Vec3::new( 1.0, 0.0, 0.0 );
    let a = nishita_atmosphere_attenuation( 0.5, 8, pos, view, -1.0 );
    assert!( a.x < 1.0 && a.x > 0.0 );
  }

  #[test]
  fn scattering_is_skipped_for_short_segments( ) {
    let pos = Vec3::new( 0.0, 10.0, 0.0 );
    let view = Vec3::new( 0.0, 1.0, 0.0 );
    let light_dir = Vec3::new( 0.0, 1.0, 0.0 );
    let r = nishita_atmosphere_scattering( ( 0.3, 0.6 ), pos, view, 500.0, light_dir, Vec3::splat( 1.0 ) );
    assert_eq!( r.attenuation, Vec3::new( 1.0, 1.0, 1.0 ) );
    assert_eq!( r.in_scatter, Vec3::ZERO );
  }
}
