
use std::f32::consts::PI;

use crate::math::rng::sign;
use crate::math::{ mix, Vec2, Vec3 };
use crate::sampler::{ cosine_hemisphere_pdf, sample_cosine_hemisphere, sample_ggx_vndf };

/// Schlick's Fresnel approximation, extended to account for the roughness
/// attenuation used when blending toward a mirror lobe, and for the
/// total-internal-reflection case when entering a denser medium (`eta > 1`).
pub fn fresnel_schlick_bidir_attenuated( v_dot_h : f32, f0 : f32, eta : f32, roughness : f32 ) -> f32 {
  let mut v_dot_h = v_dot_h;
  if eta > 1.0 {
    let sin_theta2 = eta * eta * ( 1.0 - v_dot_h * v_dot_h );
    if sin_theta2 >= 1.0 { return 1.0; }
    v_dot_h = ( 1.0 - sin_theta2 ).sqrt( );
  }
  f0 + ( f0.max( 1.0 - roughness ) - f0 ) * ( 1.0 - v_dot_h ).max( 0.0 ).powf( 5.0 )
}

pub fn fresnel_schlick_bidir( v_dot_h : f32, f0 : f32, eta : f32 ) -> f32 {
  fresnel_schlick_bidir_attenuated( v_dot_h, f0, eta, 0.0 )
}

/// GGX/Trowbridge-Reitz normal distribution, normalized so the half-vector
/// lobe integrates to one over the hemisphere.
pub fn trowbridge_reitz_distribution( hdotn : f32, a : f32 ) -> f32 {
  let a2 = a * a;
  let denom = hdotn * hdotn * ( a2 - 1.0 ) + 1.0;
  a2 / ( PI * denom * denom ).max( 1e-10 )
}

/// Height-correlated Smith G2 masking-shadowing term.
pub fn trowbridge_reitz_masking_shadowing( ldotn : f32, ldoth : f32, vdotn : f32, vdoth : f32, a : f32 ) -> f32 {
  if vdotn * vdoth < 0.0 { return 0.0; }
  if ldotn * ldoth < 0.0 { return 0.0; }
  0.5 / (
    vdotn.abs( ) * ( ldotn * ldotn - a * a * ldotn * ldotn + a * a ).sqrt( ) +
    ldotn.abs( ) * ( vdotn * vdotn - a * a * vdotn * vdotn + a * a ).sqrt( ) )
}

/// Single-lobe Smith masking term `G1`, used to turn the VNDF sampling
/// density into a solid-angle PDF.
pub fn trowbridge_reitz_masking( vdotn : f32, vdoth : f32, a : f32 ) -> f32 {
  if vdotn * vdoth < 0.0 { return 0.0; }
  2.0 * vdotn / ( vdotn + ( vdotn * vdotn * ( 1.0 - a * a ) + a * a ).sqrt( ) )
}

/// Breakdown of the per-channel hemispherical PDFs a single `bsdf_core`
/// evaluation produces, before they're combined with the lobe-selection
/// probabilities in `bsdf`/`sample_bsdf`.
struct LobePdfs {
  reflection : f32,
  diffuse : f32,
  transmission : f32
}

/// Evaluates the combined diffuse + specular-reflection + specular-
/// transmission BSDF for a light/half-vector/view triple already expressed
/// in tangent space, returning the unweighted radiance contribution and
/// the per-lobe PDFs needed by the caller to combine with lobe-selection
/// probabilities.
fn bsdf_core(
  light : Vec3, h : Vec3, view : Vec3,
  albedo : Vec3, roughness : f32, metallic : f32, transmission : f32, eta : f32, f0 : f32,
  distribution : f32
) -> ( Vec3, LobePdfs ) {
  let brdf = light.z > 0.0;
  let ldotn = light.z;
  let vdotn = view.z;
  let hdotn = h.z;
  let vdoth = view.dot( h );
  let ldoth = light.dot( h );

  let fresnel = fresnel_schlick_bidir( vdoth, f0, eta );
  let geometry = trowbridge_reitz_masking_shadowing( ldotn, ldoth, vdotn, vdoth, roughness );
  let g1 = trowbridge_reitz_masking( vdotn, vdoth, roughness );

  let ( color, pdfs ) = if brdf {
    let mut color = ( albedo * metallic + fresnel * ( 1.0 - metallic ) ) * geometry * distribution;
    color = color + ( 1.0 - fresnel ) * ( 1.0 - metallic ) * ( 1.0 - transmission ) / PI * albedo;
    ( color, LobePdfs {
      reflection: g1 * distribution / ( 4.0 * view.z ),
      diffuse: cosine_hemisphere_pdf( light ),
      transmission: 0.0
    } )
  } else {
    let denom = eta * vdoth + ldoth;
    let color = albedo * ( transmission * ( vdoth * ldoth ).abs( ) * ( 1.0 - fresnel ) * 4.0 * geometry * distribution / ( denom * denom ) );
    ( color, LobePdfs {
      reflection: 0.0,
      diffuse: 0.0,
      transmission: ( vdoth * ldoth ).abs( ) * g1 * distribution / ( view.z.abs( ) * denom * denom )
    } )
  };

  ( color * ldotn.abs( ), pdfs )
}

fn lobe_probabilities( view : Vec3, albedo : Vec3, roughness : f32, metallic : f32, transmission : f32, eta : f32, f0 : f32 ) -> ( f32, f32, f32 ) {
  let reflection_prob = mix(
    1.0, fresnel_schlick_bidir_attenuated( view.z, f0, eta, roughness ),
    albedo.luminance( ) * ( 1.0 - metallic ) );
  let transmission_prob = ( 1.0 - reflection_prob ) * transmission;
  let diffuse_prob = ( 1.0 - reflection_prob ) * ( 1.0 - transmission );
  ( reflection_prob, transmission_prob, diffuse_prob )
}

fn dielectric_f0( eta : f32 ) -> f32 {
  let f0 = ( 1.0 - eta ) / ( 1.0 + eta );
  f0 * f0
}

/// Evaluates the full tangent-space BSDF for an explicit `light` direction
/// (the NEE branch), returning the attenuation and the combined PDF of
/// having sampled `light` from the BSDF's own importance distribution.
pub fn bsdf( light : Vec3, view : Vec3, albedo : Vec3, roughness : f32, metallic : f32, transmission : f32, eta : f32 ) -> ( Vec3, f32 ) {
  let h =
    if light.z > 0.0 { ( view + light ).normalize( ) }
    else { sign( eta - 1.0 ) * ( light + eta * view ).normalize( ) };
  let distribution = trowbridge_reitz_distribution( h.z, roughness );

  let f0 = dielectric_f0( eta );
  let ( reflection_prob, transmission_prob, diffuse_prob ) =
    lobe_probabilities( view, albedo, roughness, metallic, transmission, eta, f0 );

  let ( attenuation, pdfs ) = bsdf_core(
    light, h, view, albedo, roughness, metallic, transmission, eta, f0,
    if roughness < 1e-3 { 0.0 } else { distribution } );

  let pdf =
    pdfs.reflection * reflection_prob +
    pdfs.diffuse * diffuse_prob +
    pdfs.transmission * transmission_prob;
  ( attenuation, pdf )
}

/// Result of importance-sampling a scattering direction from the BSDF.
pub struct BsdfSample {
  pub direction : Vec3,
  pub attenuation : Vec3,
  /// Negative when `direction` came from a near-delta (mirror/glass) lobe —
  /// callers must fold this back through `abs()` for radiance weighting and
  /// use it as-is to detect when NEE toward this vertex would be wasted.
  pub pdf : f32
}

/// Importance-samples a scattering direction (reflection, transmission, or
/// diffuse) from the tangent-space BSDF, given three uniform random numbers
/// in `u` (`u.z` selects the lobe).
pub fn sample_bsdf( u : Vec3, view : Vec3, albedo : Vec3, roughness : f32, metallic : f32, transmission : f32, eta : f32 ) -> BsdfSample {
  let mut h = sample_ggx_vndf( view, roughness, Vec2::new( u.x, u.y ) );

  let f0 = dielectric_f0( eta );
  let ( reflection_prob, transmission_prob, _diffuse_prob ) =
    lobe_probabilities( view, albedo, roughness, metallic, transmission, eta, f0 );

  let mut uz = u.z;
  let direction;
  let diffuse;
  let bad;

  uz -= reflection_prob;
  if uz <= 0.0 {
    direction = ( -view ).reflect( h );
    diffuse = false;
    bad = direction.z <= 0.0;
  } else {
    uz -= transmission_prob;
    if uz <= 0.0 {
      direction = ( -view ).refract( h, eta );
      diffuse = false;
      bad = direction.z >= 0.0;
    } else {
      direction = sample_cosine_hemisphere( Vec2::new( u.x, u.y ) );
      h = ( direction + view ).normalize( );
      diffuse = true;
      bad = direction.z == 0.0;
    }
  }

  if bad {
    return BsdfSample { direction: Vec3::new( 0.0, 0.0, 1.0 ), attenuation: Vec3::ZERO, pdf: 1.0 };
  }

  let mut distribution = trowbridge_reitz_distribution( h.z, roughness );
  if roughness < 1e-3 {
    distribution = if diffuse { 0.0 } else { ( 4.0 * direction.z * view.z ).abs( ) };
  }

  let ( attenuation, pdfs ) = bsdf_core(
    direction, h, view, albedo, roughness, metallic, transmission, eta, f0, distribution );

  let mut pdf = pdfs.reflection * reflection_prob + pdfs.transmission * transmission_prob;
  if roughness < 1e-3 && !diffuse {
    pdf = -pdf;
  } else {
    let diffuse_prob = ( 1.0 - reflection_prob ) * ( 1.0 - transmission );
    pdf += pdfs.diffuse * diffuse_prob;
  }

  BsdfSample { direction, attenuation, pdf }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresnel_at_normal_incidence_returns_f0( ) {
    let f0 = dielectric_f0( 1.5 );
    let f = fresnel_schlick_bidir( 1.0, f0, 1.5 );
    assert!( ( f - f0 ).abs( ) < 1e-5 );
  }

  #[test]
  fn distribution_peaks_at_normal_for_smooth_surface( ) {
    let peak = trowbridge_reitz_distribution( 1.0, 0.05 );
    let off_axis = trowbridge_reitz_distribution( 0.5, 0.05 );
    assert!( peak > off_axis );
  }

  #[test]
  fn diffuse_lobe_returns_positive_albedo_color( ) {
    let view = Vec3::new( 0.0, 0.0, 1.0 );
    let light = Vec3::new( 0.2, 0.0, 0.97 ).normalize( );
    let ( color, pdf ) = bsdf( light, view, Vec3::splat( 0.8 ), 0.6, 0.0, 0.0, 1.5 );
    assert!( color.x > 0.0 );
    assert!( pdf > 0.0 );
  }

  #[test]
  fn sample_bsdf_produces_finite_direction( ) {
    let view = Vec3::new( 0.1, 0.05, 0.99 ).normalize( );
    let sample = sample_bsdf( Vec3::new( 0.3, 0.7, 0.4 ), view, Vec3::splat( 0.5 ), 0.4, 0.0, 0.0, 1.5 );
    assert!( sample.direction.len( ).is_finite( ) );
  }
}
