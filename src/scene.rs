
use std::collections::HashMap;

use crate::bvh::{ build_blas, build_tlas, Bvh, BvhBuffers, TlasInstance };
use crate::math::{ Mat3, Mat4, Vec3 };
use crate::mesh::{ Mesh, MeshBuffers };

/// Projection and lens parameters for one frame's camera.
#[derive(Copy,Clone,Debug)]
pub struct Camera {
  pub orientation      : Mat3,
  pub position         : Vec3,
  pub aspect_ratio     : f32,
  pub inv_focal_length : f32,
  pub focal_distance   : f32,
  pub aperture_angle    : f32,
  /// `0` or `< 4` disables depth-of-field sampling; `>= 4` is the polygon's
  /// side count.
  pub aperture_polygon  : u32,
  pub aperture_radius   : f32
}

impl Camera {
  pub fn looking_at( position : Vec3, target : Vec3, up : Vec3, aspect_ratio : f32, fov_y : f32 ) -> Camera {
    let forward = ( target - position ).normalize( );
    let right = forward.cross( up ).normalize( );
    let true_up = right.cross( forward );
    // Rows are (right, up, -forward) so that local -Z looks toward `target`.
    let orientation = Mat3::from_rows( right, true_up, -forward );
    Camera {
      orientation, position, aspect_ratio,
      inv_focal_length: ( fov_y * 0.5 ).tan( ),
      focal_distance: 1.0,
      aperture_angle: 0.0,
      aperture_polygon: 0,
      aperture_radius: 0.0
    }
  }
}

/// A single, infinitely distant sun light with a small angular size (so it
/// casts soft shadows and can be importance-sampled as a cone).
#[derive(Copy,Clone,Debug)]
pub struct DirectionalLight {
  pub direction       : Vec3,
  pub color           : Vec3,
  pub cos_solid_angle : f32
}

/// Everything that changes within one motion-blur sub-step: the camera, the
/// light, and the TLAS built for that instant.
#[derive(Copy,Clone,Debug)]
pub struct Subframe {
  pub tlas  : Bvh,
  pub cam   : Camera,
  pub light : DirectionalLight
}

/// One mesh instance under a world-space transform, with optional per-frame
/// animation driven by the scene's animator.
#[derive(Clone,Debug)]
pub struct Instance {
  pub mesh_name : String,
  pub transform : Mat4
}

/// Full scene state: the mesh/BVH arenas, named mesh→BLAS lookup, the
/// instance list, and the per-subframe data built fresh each frame.
///
/// The first `static_instance_count` entries of `instances` never change
/// across frames; only the tail (and the subframes) are rebuilt per frame.
pub struct Scene {
  pub mesh_buf : MeshBuffers,
  pub bvh_buf  : BvhBuffers,
  pub meshes   : HashMap< String, ( Mesh, Bvh ) >,
  pub instances : Vec< TlasInstance >,
  pub static_instance_count : usize,
  pub subframes : Vec< Subframe >
}

impl Scene {
  pub fn new( ) -> Scene {
    Scene {
      mesh_buf: MeshBuffers::new( ),
      bvh_buf: BvhBuffers::new( ),
      meshes: HashMap::new( ),
      instances: Vec::new( ),
      static_instance_count: 0,
      subframes: Vec::new( )
    }
  }

  /// Loads `obj_path`, builds its BLAS, and registers it under `name` for
  /// later `add_instance` calls.
  pub fn load_mesh_bvh_pair( &mut self, name : &str, obj_path : &std::path::Path ) -> Result< (), crate::error::RenderError > {
    let mesh = crate::obj::load_mesh( &mut self.mesh_buf, obj_path )?;
    let blas = build_blas( &mesh, &self.mesh_buf, &mut self.bvh_buf );
    self.meshes.insert( name.to_string( ), ( mesh, blas ) );
    Ok( ( ) )
  }

  /// Instances a previously-loaded mesh at `transform`. Panics if `name`
  /// hasn't been loaded — this mirrors the reference's `unordered_map::at`,
  /// a scene-setup bug rather than a runtime condition to recover from.
  pub fn add_instance( &mut self, name : &str, transform : Mat4 ) {
    let ( mesh, blas ) = *self.meshes.get( name ).expect( "instance references unloaded mesh" );
    self.instances.push( TlasInstance { blas, mesh, transform, inv_transform: transform.inverse( ) } );
  }

  /// Drops every instance appended since `load_mesh_bvh_pair`/initial
  /// `add_instance` setup finished, keeping only the static prefix. Used
  /// before rebuilding a frame's dynamic instance set.
  pub fn truncate_to_static( &mut self ) {
    self.instances.truncate( self.static_instance_count );
  }

  /// Marks every instance currently in the scene as static — nothing
  /// dynamic has been added yet, so nothing here will be rebuilt per frame.
  pub fn freeze_static_instances( &mut self ) {
    self.static_instance_count = self.instances.len( );
  }

  /// Builds the TLAS over the scene's current instance list. Replaces
  /// `previous`, if given, by popping its BVH first — this only succeeds
  /// if `previous` is still the most recently appended BVH in `bvh_buf`.
  pub fn rebuild_tlas( &mut self, previous : Option< &mut Bvh > ) -> Bvh {
    if let Some( bvh ) = previous {
      self.bvh_buf.pop_bvh( bvh );
    }
    let indexed : Vec< ( u32, TlasInstance ) > =
      self.instances.iter( ).enumerate( ).map( |( i, inst )| ( i as u32, *inst ) ).collect( );
    build_tlas( &indexed, &mut self.bvh_buf )
  }
}

/// One segment of a piecewise-linear keyframe animation: holds at `from`
/// until `start`, then blends linearly to `to` over `duration` seconds
/// (instantaneous if `duration` is zero).
pub struct AnimationStop< T > {
  pub start    : f32,
  pub duration : f32,
  pub from     : f32,
  pub to       : f32,
  pub set      : fn( &mut T, f32 )
}

/// Plays a set of independent animation tracks against a single target.
/// Stops are stored sorted by `start`; `evaluate` applies every stop whose
/// `start <= t`, in order. Deliberately "sticky": evaluating a second time
/// at the same `t` re-applies every eligible stop and the *last* one in
/// start order always wins, even if an earlier call already settled on its
/// `to` value.
pub struct Animator< T > {
  stops : Vec< AnimationStop< T > >
}

impl< T > Animator< T > {
  pub fn new( mut stops : Vec< AnimationStop< T > > ) -> Animator< T > {
    stops.sort_by( |a, b| a.start.partial_cmp( &b.start ).unwrap( ) );
    Animator { stops }
  }

  pub fn evaluate( &self, target : &mut T, t : f32 ) {
    for stop in &self.stops {
      if stop.start > t { continue; }
      let lt = if stop.duration == 0.0 { 1.0 } else {
        crate::math::clamp( ( t - stop.start ) / stop.duration, 0.0, 1.0 )
      };
      ( stop.set )( target, crate::math::mix( stop.from, stop.to, lt ) );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Counter { value : f32 }

  #[test]
  fn animator_holds_value_before_start( ) {
    let anim = Animator::new( vec![
      AnimationStop { start: 1.0, duration: 1.0, from: 0.0, to: 10.0, set: |c : &mut Counter, v| c.value = v }
    ] );
    let mut c = Counter { value: -1.0 };
    anim.evaluate( &mut c, 0.5 );
    assert_eq!( c.value, -1.0 );
  }

  #[test]
  fn animator_is_sticky_on_repeated_evaluation( ) {
    let anim = Animator::new( vec![
      AnimationStop { start: 0.0, duration: 0.0, from: 0.0, to: 5.0, set: |c : &mut Counter, v| c.value = v }
    ] );
    let mut c = Counter { value: -1.0 };
    anim.evaluate( &mut c, 10.0 );
    assert_eq!( c.value, 5.0 );
    anim.evaluate( &mut c, 10.0 );
    assert_eq!( c.value, 5.0 );
  }

  #[test]
  fn animator_applies_stops_in_start_order( ) {
    let anim = Animator::new( vec![
      AnimationStop { start: 2.0, duration: 0.0, from: 0.0, to: 2.0, set: |c : &mut Counter, v| c.value = v },
      AnimationStop { start: 1.0, duration: 0.0, from: 0.0, to: 1.0, set: |c : &mut Counter, v| c.value = v }
    ] );
    let mut c = Counter { value: -1.0 };
    anim.evaluate( &mut c, 3.0 );
    assert_eq!( c.value, 2.0 );
  }
}
