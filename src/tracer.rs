
use crate::atmosphere::{ nishita_atmosphere_attenuation, nishita_atmosphere_scattering };
use crate::bsdf::{ bsdf, sample_bsdf };
use crate::bvh::{ Bvh, BvhLink, TlasInstance };
use crate::config::{
  ATMOSPHERE_PRIMARY_ITERATIONS, MAX_BOUNCES, MAX_RAY_DIST, MIN_RAY_DIST,
  PATH_SPACE_REGULARIZATION_GAMMA, SAMPLES_PER_MOTION_BLUR_STEP, STUDENT_ID
};
use crate::math::rng::Pcg4d;
use crate::math::{ create_tangent_space, Mat3, Vec2, Vec3 };
use crate::mesh::MeshBuffers;
use crate::ray::Aabb;
use crate::ray_query::RayQuery;
use crate::sampler::{ sample_cone, sample_gaussian_weighted_disk, sample_regular_polygon };
use crate::scene::{ Camera, DirectionalLight, Subframe };

/// Everything a trace needs to resolve hits and shade them: the TLAS built
/// for this subframe, the scene's acceleration-structure and mesh arenas,
/// and the one directional light.
pub struct TraceContext< 'a > {
  pub tlas         : Bvh,
  pub instances    : &'a [ TlasInstance ],
  pub nodes        : &'a [ Aabb ],
  pub links        : &'a [ BvhLink ],
  pub mesh_buffers : &'a MeshBuffers,
  pub light        : DirectionalLight
}

/// Shading-relevant state at a ray/scene intersection, already resolved into
/// tangent space. `thit < 0` means the ray escaped to the sky, in which case
/// only `albedo` (the sun's radiance, if this direction landed inside its
/// disc) and `nee_pdf` are meaningful.
#[derive(Copy,Clone,Debug)]
pub struct HitInfo {
  pub thit         : f32,
  pub pos          : Vec3,
  pub tbn          : Mat3,
  pub albedo       : Vec3,
  pub alpha        : f32,
  pub roughness    : f32,
  pub metallic     : f32,
  pub emission     : f32,
  pub transmission : f32,
  pub eta          : f32,
  /// PDF of having sampled this direction via NEE toward the sun, given that
  /// it missed all geometry. Zero for a geometric hit.
  pub nee_pdf      : f32
}

const GLASS_IOR : f32 = 1.5;

/// Traces one ray against the scene, resolving a triangle hit into shaded
/// tangent-space material data, or an escape into the sky.
pub fn trace_ray( ctx : &TraceContext, origin : Vec3, dir : Vec3, tmin : f32 ) -> HitInfo {
  let hit = crate::ray_query::find_closest_hit(
    ctx.tlas, ctx.instances, ctx.nodes, ctx.links, ctx.mesh_buffers,
    origin, dir, tmin, MAX_RAY_DIST );

  if !hit.is_hit( ) {
    let visible = dir.dot( ctx.light.direction ) > ctx.light.cos_solid_angle;
    let nee_pdf = 1.0 / ( 2.0 * std::f32::consts::PI * ( 1.0 - ctx.light.cos_solid_angle ) );
    let albedo = if visible { ctx.light.color } else { Vec3::ZERO };
    return HitInfo {
      thit: -1.0, pos: Vec3::ZERO, tbn: Mat3::IDENTITY,
      albedo, alpha: 0.0, roughness: 0.0, metallic: 0.0, emission: 1.0, transmission: 0.0, eta: 1.0,
      nee_pdf
    };
  }

  let inst = ctx.instances[ hit.instance_id as usize ];
  let rot = crate::math::mat::extract_m4m3( inst.transform );

  let bary = hit.barycentrics;
  let albedo4 = ctx.mesh_buffers.interpolate_albedo( &inst.mesh, hit.primitive_id, bary.x, bary.y );
  let mat4 = ctx.mesh_buffers.interpolate_material( &inst.mesh, hit.primitive_id, bary.x, bary.y );
  let n_local = ctx.mesh_buffers.interpolate_normal( &inst.mesh, hit.primitive_id, bary.x, bary.y );
  let mut n = rot.mul_vec( n_local ).normalize( );

  let eta = if hit.back_face {
    n = -n;
    GLASS_IOR
  } else {
    1.0 / GLASS_IOR
  };

  HitInfo {
    thit: hit.thit,
    pos: origin + dir * hit.thit,
    tbn: create_tangent_space( n ),
    albedo: Vec3::new( albedo4.x, albedo4.y, albedo4.z ),
    alpha: albedo4.w,
    // Perceptual roughness is authored linearly; shading uses its square.
    roughness: mat4.x * mat4.x,
    metallic: mat4.y,
    transmission: mat4.z,
    emission: mat4.w,
    eta,
    nee_pdf: 0.0
  }
}

/// `true` if anything occludes the segment `(origin, origin + dir*tmax)`.
/// Only needs to know whether any candidate hit exists, so it never calls
/// `confirm()` and never resolves a closest hit.
pub fn trace_shadow_ray( ctx : &TraceContext, origin : Vec3, dir : Vec3, tmin : f32, tmax : f32 ) -> bool {
  let mut rq = RayQuery::new( ctx.tlas, ctx.instances, ctx.nodes, ctx.links, ctx.mesh_buffers, origin, dir, tmin, tmax );
  rq.proceed( )
}

/// Projects pixel `coord` (already jittered for antialiasing) through `cam`'s
/// lens model into a world-space ray. `u` drives aperture sampling for depth
/// of field.
pub fn get_camera_ray( cam : &Camera, u : Vec2, coord : Vec2, image_width : u32, image_height : u32 ) -> ( Vec3, Vec3 ) {
  let mut uv = Vec2::new(
    coord.x / image_width as f32 * 2.0 - 1.0,
    coord.y / image_height as f32 * 2.0 - 1.0 );
  uv.x *= cam.aspect_ratio;
  uv.y = -uv.y;

  let aperture_pos = if cam.aperture_polygon >= 4 {
    sample_regular_polygon( u, cam.aperture_angle, cam.aperture_polygon ) * cam.aperture_radius
  } else {
    Vec2::ZERO
  };

  let origin_local = Vec3::new( aperture_pos.x, aperture_pos.y, 0.0 );
  let focus_point = Vec3::new( uv.x * cam.inv_focal_length, uv.y * cam.inv_focal_length, -1.0 ) * cam.focal_distance;
  let dir_local = ( focus_point - origin_local ).normalize( );

  let dir = cam.orientation.mul_vec_left( dir_local );
  let origin = cam.orientation.mul_vec_left( origin_local ) + cam.position;
  ( dir, origin )
}

/// One next-event-estimation sample toward the sun, MIS-weighted against the
/// BSDF's own PDF of having produced the same direction.
fn nee_branch( seed : &mut Pcg4d, ctx : &TraceContext, info : &HitInfo, tview : Vec3 ) -> Vec3 {
  let u = seed.next_uniform4( );
  let light_dir = sample_cone( ctx.light.direction, ctx.light.cos_solid_angle, Vec2::new( u.x, u.y ) );
  let nee_pdf = 1.0 / ( 2.0 * std::f32::consts::PI * ( 1.0 - ctx.light.cos_solid_angle ) );

  let light_local = info.tbn.mul_vec( light_dir );
  let ( attenuation, bsdf_pdf ) = bsdf(
    light_local, tview, info.albedo, info.roughness, info.metallic, info.transmission, info.eta );

  let mut color = attenuation * ctx.light.color;
  if ( color.x == 0.0 && color.y == 0.0 && color.z == 0.0 ) ||
    trace_shadow_ray( ctx, info.pos, light_dir, MIN_RAY_DIST, MAX_RAY_DIST ) {
    return Vec3::ZERO;
  }

  let mis_pdf = if ctx.light.cos_solid_angle < 1.0 {
    ( nee_pdf * nee_pdf + bsdf_pdf * bsdf_pdf ) / nee_pdf
  } else {
    nee_pdf
  };

  color = color * nishita_atmosphere_attenuation( u.w, ATMOSPHERE_PRIMARY_ITERATIONS, info.pos, light_dir, MAX_RAY_DIST );
  color / mis_pdf
}

/// Path-traces one `(pixel, sample)` pair, returning its linear HDR radiance
/// contribution. A pure function of its inputs and `(x, y, sample_index,
/// STUDENT_ID)` — callers may evaluate samples in any order or in parallel.
pub fn path_trace_pixel(
  x : u32, y : u32, sample_index : u32,
  subframes : &[ Subframe ],
  instances : &[ TlasInstance ], nodes : &[ Aabb ], links : &[ BvhLink ],
  mesh_buffers : &MeshBuffers,
  image_width : u32, image_height : u32
) -> Vec3 {
  let subframe_index = ( ( sample_index / SAMPLES_PER_MOTION_BLUR_STEP ) as usize ).min( subframes.len( ) - 1 );
  let sf = &subframes[ subframe_index ];

  let mut seed = Pcg4d::seed( x, y, sample_index, STUDENT_ID );
  let u0 = seed.next_uniform4( );

  let film_offset = sample_gaussian_weighted_disk( Vec2::new( u0.x, u0.y ), 0.4 );
  let ( mut ray_dir, mut ray_o ) = get_camera_ray(
    &sf.cam, Vec2::new( u0.z, u0.w ),
    Vec2::new( x as f32 + 0.5 + film_offset.x, y as f32 + 0.5 + film_offset.y ),
    image_width, image_height );

  let ctx = TraceContext { tlas: sf.tlas, instances, nodes, links, mesh_buffers, light: sf.light };

  let mut info = trace_ray( &ctx, ray_o, ray_dir, 0.0 );

  let primary = nishita_atmosphere_scattering(
    ( u0.x, u0.y ), ray_o, ray_dir, info.thit, ctx.light.direction, ctx.light.color );
  let mut attenuation = primary.attenuation;
  let mut contribution = primary.in_scatter + attenuation * info.albedo * info.emission;

  let mut regularization = 1.0f32;
  let mut bounce = 0;
  while bounce < MAX_BOUNCES && info.thit > 0.0 {
    let mut view = info.tbn.mul_vec( -ray_dir );
    view.z = view.z.max( 1e-7 );
    let view = view.normalize( );

    contribution = contribution + attenuation * nee_branch( &mut seed, &ctx, &info, view );

    let ub = seed.next_uniform4( );
    let sample = sample_bsdf(
      Vec3::new( ub.x, ub.y, ub.z ), view, info.albedo, info.roughness, info.metallic, info.transmission, info.eta );

    if sample.pdf == 0.0 { break; }

    ray_dir = info.tbn.mul_vec_left( sample.direction ).normalize( );
    ray_o = info.pos;

    attenuation = attenuation * sample.attenuation;

    if sample.pdf > 0.0 {
      regularization *= ( 1.0 - PATH_SPACE_REGULARIZATION_GAMMA / sample.pdf.powf( 0.25 ) ).max( 0.0 );
    }

    info = trace_ray( &ctx, ray_o, ray_dir, MIN_RAY_DIST );
    info.roughness = 1.0 - ( 1.0 - info.roughness ) * regularization;

    let scatter = nishita_atmosphere_scattering(
      ( ub.w, u0.x ), ray_o, ray_dir, info.thit, ctx.light.direction, ctx.light.color );

    let mis_pdf = if sample.pdf < 0.0 {
      1.0
    } else {
      let bsdf_pdf = sample.pdf;
      ( info.nee_pdf * info.nee_pdf + bsdf_pdf * bsdf_pdf ) / bsdf_pdf.max( 1e-10 )
    };

    contribution = contribution + attenuation *
      ( scatter.in_scatter + scatter.attenuation * info.albedo * info.emission ) / mis_pdf;
    attenuation = attenuation * scatter.attenuation / sample.pdf.abs( );

    bounce += 1;
  }

  contribution
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn camera_ray_at_center_points_forward( ) {
    let cam = Camera {
      orientation: Mat3::IDENTITY, position: Vec3::ZERO, aspect_ratio: 1.0,
      inv_focal_length: 1.0, focal_distance: 1.0, aperture_angle: 0.0,
      aperture_polygon: 0, aperture_radius: 0.0
    };
    let ( dir, origin ) = get_camera_ray( &cam, Vec2::new( 0.0, 0.0 ), Vec2::new( 320.0, 180.0 ), 640, 360 );
    assert_eq!( origin, Vec3::ZERO );
    assert!( dir.z < 0.0 );
  }

  #[test]
  fn camera_ray_is_normalized( ) {
    let cam = Camera {
      orientation: Mat3::IDENTITY, position: Vec3::new( 1.0, 2.0, 3.0 ), aspect_ratio: 1.777,
      inv_focal_length: 0.7, focal_distance: 1.0, aperture_angle: 0.0,
      aperture_polygon: 0, aperture_radius: 0.0
    };
    let ( dir, _ ) = get_camera_ray( &cam, Vec2::new( 0.5, 0.5 ), Vec2::new( 12.0, 340.0 ), 640, 360 );
    assert!( ( dir.len( ) - 1.0 ).abs( ) < 1e-5 );
  }
}
