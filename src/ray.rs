
use crate::math::Vec3;

/// Origin and (not necessarily normalized, depending on context) direction of
/// a ray in some coordinate space.
#[derive(Copy,Clone,Debug)]
pub struct Ray {
  pub origin : Vec3,
  pub dir    : Vec3
}

impl Ray {
  pub fn new( origin : Vec3, dir : Vec3 ) -> Ray {
    Ray { origin, dir }
  }

  pub fn at( self, distance : f32 ) -> Vec3 {
    self.origin + distance * self.dir
  }
}

/// An axis-aligned bounding box. BVH node bounds and mesh extents are both
/// this.
#[derive(Copy,Clone,Debug)]
pub struct Aabb {
  pub min : Vec3,
  pub max : Vec3
}

impl Aabb {
  pub const EMPTY : Aabb = Aabb {
    min: Vec3 { x: f32::MAX, y: f32::MAX, z: f32::MAX },
    max: Vec3 { x: f32::MIN, y: f32::MIN, z: f32::MIN }
  };

  pub fn from_point( p : Vec3 ) -> Aabb {
    Aabb { min: p, max: p }
  }

  pub fn union( self, other : Aabb ) -> Aabb {
    Aabb { min: self.min.min( other.min ), max: self.max.max( other.max ) }
  }

  pub fn extend( self, p : Vec3 ) -> Aabb {
    Aabb { min: self.min.min( p ), max: self.max.max( p ) }
  }

  pub fn size( self ) -> Vec3 {
    self.max - self.min
  }

  /// Twice the surface area; the factor of two cancels out of every SAH
  /// cost comparison so it's never worth carrying.
  pub fn half_area( self ) -> f32 {
    let s = self.size( );
    s.x * s.y + s.z * s.x + s.y * s.z
  }

  /// Slab test against a precomputed `1 / dir`. Returns the entry/exit
  /// distances along the ray regardless of hit, so callers compare against
  /// their own `[tmin, tmax]` window.
  pub fn intersect( self, origin : Vec3, inv_dir : Vec3 ) -> ( f32, f32 ) {
    let t0 = ( self.min - origin ) * inv_dir;
    let t1 = ( self.max - origin ) * inv_dir;
    let mins = t0.min( t1 );
    let maxs = t0.max( t1 );
    let near = mins.x.max( mins.y ).max( mins.z );
    let far = maxs.x.min( maxs.y ).min( maxs.z );
    ( near, far )
  }
}

/// Precomputed, direction-dependent state for the Woop-style ray-triangle
/// test: which axis was permuted to the largest-magnitude component, and the
/// shear coefficients built from it.
#[derive(Copy,Clone,Debug)]
pub struct TriangleIntersector {
  pub axis : i32,
  pub s    : Vec3
}

impl TriangleIntersector {
  pub fn new( dir : Vec3 ) -> TriangleIntersector {
    let absdir = dir.abs( );
    let ( axis, rdir ) =
      if absdir.x > absdir.y && absdir.x > absdir.z { ( 0, Vec3::new( dir.z, dir.y, dir.x ) ) }
      else if absdir.y > absdir.z { ( 1, Vec3::new( dir.x, dir.z, dir.y ) ) }
      else { ( 2, dir ) };
    let s = Vec3::new( rdir.x, rdir.y, 1.0 ) * ( 1.0 / rdir.z );
    TriangleIntersector { axis, s }
  }
}

/// Result of a triangle intersection test: `u`, `v` barycentric coordinates
/// (the third is `1 - u - v`) and the hit distance along the ray.
#[derive(Copy,Clone,Debug)]
pub struct TriangleHit {
  pub u         : f32,
  pub v         : f32,
  pub t         : f32,
  pub back_face : bool
}

/// Watertight ray-triangle intersection (Woop, Benthin & Wald 2013), using
/// the axis permutation and shear from `TriangleIntersector::new`.
pub fn ray_triangle_intersection(
  origin : Vec3, isect : TriangleIntersector,
  pos0 : Vec3, pos1 : Vec3, pos2 : Vec3
) -> Option< TriangleHit > {
  let a = pos0 - origin;
  let b = pos1 - origin;
  let c = pos2 - origin;

  let ( mut x, mut y, mut z ) = ( Vec3::new( a.x, b.x, c.x ), Vec3::new( a.y, b.y, c.y ), Vec3::new( a.z, b.z, c.z ) );

  if isect.axis == 0 {
    let tmp = x; x = z; z = tmp;
  } else if isect.axis == 1 {
    let tmp = y; y = z; z = tmp;
  }

  x = x - isect.s.x * z;
  y = y - isect.s.y * z;

  let uvw = y.cross( x );
  let det = uvw.x + uvw.y + uvw.z;
  if det == 0.0 { return None; }

  let t = uvw.dot( isect.s.z * z ) / det;
  let u = uvw.x / det;
  let v = uvw.y / det;
  let w = uvw.z / det;

  let mut back_face = det < 0.0;
  if isect.s.z < 0.0 { back_face = !back_face; }
  if isect.axis != 2 { back_face = !back_face; }

  let inside = ( uvw.x >= 0.0 && uvw.y >= 0.0 && uvw.z >= 0.0 ) || ( uvw.x <= 0.0 && uvw.y <= 0.0 && uvw.z <= 0.0 );
  if !inside { return None; }

  let _ = w;
  Some( TriangleHit { u, v, t, back_face } )
}

/// Roots of `|origin + t*dir - center|^2 = radius^2`, smallest first. `dir`
/// must be normalized. Returns `None` when the ray misses the sphere.
pub fn ray_sphere_intersection( origin : Vec3, dir : Vec3, center : Vec3, radius : f32 ) -> Option< ( f32, f32 ) > {
  let oc = origin - center;
  let b = oc.dot( dir );
  let c = oc.dot( oc ) - radius * radius;
  let discriminant = b * b - c;
  if discriminant < 0.0 { return None; }
  let d = discriminant.sqrt( );
  Some( ( -b - d, -b + d ) )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn triangle_hit_in_center( ) {
    let dir = Vec3::new( 0.0, 0.0, -1.0 );
    let isect = TriangleIntersector::new( dir );
    let hit = ray_triangle_intersection(
      Vec3::new( 0.0, 0.0, 5.0 ), isect,
      Vec3::new( -1.0, -1.0, 0.0 ), Vec3::new( 1.0, -1.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 )
    );
    assert!( hit.is_some( ) );
    let hit = hit.unwrap( );
    assert!( ( hit.t - 5.0 ).abs( ) < 1e-4 );
    assert!( !hit.back_face );
  }

  #[test]
  fn triangle_miss_outside( ) {
    let dir = Vec3::new( 0.0, 0.0, -1.0 );
    let isect = TriangleIntersector::new( dir );
    let hit = ray_triangle_intersection(
      Vec3::new( 10.0, 10.0, 5.0 ), isect,
      Vec3::new( -1.0, -1.0, 0.0 ), Vec3::new( 1.0, -1.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 )
    );
    assert!( hit.is_none( ) );
  }

  #[test]
  fn aabb_slab_hit( ) {
    let bounds = Aabb { min: Vec3::new( -1.0, -1.0, -1.0 ), max: Vec3::new( 1.0, 1.0, 1.0 ) };
    let origin = Vec3::new( 0.0, 0.0, -5.0 );
    let dir = Vec3::new( 0.0, 0.0, 1.0 );
    let ( near, far ) = bounds.intersect( origin, Vec3::new( 1.0 / dir.x.max( 1e-30 ), 1.0 / dir.y.max( 1e-30 ), 1.0 / dir.z ) );
    assert!( near <= far );
  }

  #[test]
  fn sphere_hit_roots_ordered( ) {
    let hit = ray_sphere_intersection( Vec3::new( 0.0, 0.0, -5.0 ), Vec3::new( 0.0, 0.0, 1.0 ), Vec3::ZERO, 1.0 );
    let ( tmin, tmax ) = hit.unwrap( );
    assert!( tmin < tmax );
    assert!( ( tmin - 4.0 ).abs( ) < 1e-4 );
  }
}
