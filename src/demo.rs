
use std::path::Path;

use crate::config::{ FRAMERATE, SAMPLES_PER_MOTION_BLUR_STEP, STUDENT_ID };
use crate::error::RenderError;
use crate::math::rng::Pcg4d;
use crate::math::{ Mat3, Mat4, Vec3 };
use crate::scene::{ AnimationStop, Animator, Camera, DirectionalLight, Scene };

const CLIP_SECONDS : f32 = 2.0;
const FRAME_COUNT : u32 = ( CLIP_SECONDS as u32 ) * FRAMERATE;

/// The state an animator track can drive: the camera's orbit angle and the
/// sun's elevation. A real scene would animate dozens of such variables;
/// two is enough to exercise the pipeline end to end.
pub struct DemoState {
  pub camera_orbit_radians : f32,
  pub sun_elevation_radians : f32
}

/// Scatters a handful of decorative instances ("trees"/"rocks" stand-ins —
/// here, emissive lamps and glass orbs) across a small disc, deterministically
/// from a fixed seed. Reproduces the original's placement bug verbatim:
/// the second branch of the `u.z < 0.3` chain is unreachable (both arms
/// test the same threshold), so the third placement option is chosen twice
/// as often as intended. This is a known defect in the source being
/// preserved for fidelity, not a bug in this port — do not "fix" the
/// threshold.
fn scatter_decorations( scene : &mut Scene, count : u32 ) {
  let mut seed = Pcg4d::seed( 0, 0, 0, STUDENT_ID );
  for _ in 0..count {
    let u = seed.next_uniform4( );
    let radius = 4.0 + u.x * 16.0;
    let angle = u.y * std::f32::consts::TAU;
    let pos = Vec3::new( angle.cos( ) * radius, 0.0, angle.sin( ) * radius );

    if u.z < 0.3 {
      scene.add_instance( "lamp", Mat4::translation( pos ) * Mat4::scaling( Vec3::splat( 0.4 ) ) );
    } else if u.z < 0.3 {
      // Unreachable: `u.z < 0.3` was already handled above. Kept as-is.
      scene.add_instance( "lamp", Mat4::translation( pos ) * Mat4::scaling( Vec3::splat( 0.25 ) ) );
    } else {
      scene.add_instance( "glass_orb", Mat4::translation( pos + Vec3::new( 0.0, 0.8, 0.0 ) ) );
    }
  }
}

/// Builds the short demo scene: a ground plane, a ring of scattered lamp
/// and glass-orb instances, one directional sun light, and a camera that
/// orbits the scene over `FRAME_COUNT` frames.
pub fn build_demo_scene( data_dir : &Path ) -> Result< ( Scene, Animator< DemoState > ), RenderError > {
  let mut scene = Scene::new( );
  scene.load_mesh_bvh_pair( "ground", &data_dir.join( "ground.obj" ) )?;
  scene.load_mesh_bvh_pair( "lamp", &data_dir.join( "lamp.obj" ) )?;
  scene.load_mesh_bvh_pair( "glass_orb", &data_dir.join( "glass_orb.obj" ) )?;

  scene.add_instance( "ground", Mat4::IDENTITY );
  scatter_decorations( &mut scene, 24 );
  scene.freeze_static_instances( );

  let animator = Animator::new( vec![
    AnimationStop {
      start: 0.0, duration: CLIP_SECONDS, from: 0.0, to: std::f32::consts::TAU,
      set: |s : &mut DemoState, v| s.camera_orbit_radians = v
    },
    AnimationStop {
      start: 0.0, duration: CLIP_SECONDS, from: 0.35, to: 0.9,
      set: |s : &mut DemoState, v| s.sun_elevation_radians = v
    }
  ] );

  Ok( ( scene, animator ) )
}

fn orbit_camera( orbit_radians : f32, aspect_ratio : f32 ) -> Camera {
  let radius = 22.0;
  let height = 9.0;
  let position = Vec3::new( orbit_radians.cos( ) * radius, height, orbit_radians.sin( ) * radius );
  Camera::looking_at( position, Vec3::new( 0.0, 2.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 ), aspect_ratio, 0.8 )
}

fn sun_light( elevation_radians : f32 ) -> DirectionalLight {
  let dir = Vec3::new( 0.3, elevation_radians.sin( ), 0.2 ).normalize( );
  DirectionalLight {
    direction: dir,
    color: Vec3::new( 4.0, 3.7, 3.3 ),
    cos_solid_angle: 0.9998
  }
}

/// Rebuilds the scene's dynamic instances, light, and camera for
/// `frame_index`, producing one `Subframe` per motion-blur sub-step and
/// appending them to `scene.subframes`. Frees the previous frame's subframe
/// TLASes first (in reverse build order, since the arena backing them is a
/// stack), so `scene.bvh_buf` only ever holds one frame's worth of TLASes.
pub fn setup_animation_frame( scene : &mut Scene, animator : &Animator< DemoState >, frame_index : u32, aspect_ratio : f32 ) {
  for sf in scene.subframes.iter_mut( ).rev( ) {
    scene.bvh_buf.pop_bvh( &mut sf.tlas );
  }
  scene.subframes.clear( );
  for sub in 0..SAMPLES_PER_MOTION_BLUR_STEP {
    let t = ( frame_index as f32 + sub as f32 / SAMPLES_PER_MOTION_BLUR_STEP as f32 ) / FRAMERATE as f32;

    let mut state = DemoState { camera_orbit_radians: 0.0, sun_elevation_radians: 0.35 };
    animator.evaluate( &mut state, t );

    scene.truncate_to_static( );
    let tlas = scene.rebuild_tlas( None );

    scene.subframes.push( crate::scene::Subframe {
      tlas,
      cam: orbit_camera( state.camera_orbit_radians, aspect_ratio ),
      light: sun_light( state.sun_elevation_radians )
    } );
  }
}

pub fn animation_frame_count( ) -> u32 {
  FRAME_COUNT
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn demo_scene_loads_and_scatters_instances( ) {
    let ( scene, _animator ) = build_demo_scene( Path::new( "data" ) ).expect( "demo assets load" );
    assert!( scene.instances.len( ) > 1 );
    assert_eq!( scene.static_instance_count, scene.instances.len( ) );
  }

  #[test]
  fn animation_frame_count_matches_clip_length( ) {
    assert_eq!( animation_frame_count( ), ( CLIP_SECONDS as u32 ) * FRAMERATE );
  }
}
