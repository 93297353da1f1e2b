
use std::ops;

use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;

/// Row-major 3x3 matrix.
#[derive(Copy,Clone,Debug)]
pub struct Mat3 {
  pub rows : [ Vec3; 3 ]
}

/// Row-major 4x4 matrix.
#[derive(Copy,Clone,Debug)]
pub struct Mat4 {
  pub rows : [ Vec4; 4 ]
}

impl Mat3 {
  pub const IDENTITY: Mat3 = Mat3 {
    rows: [
      Vec3 { x: 1.0, y: 0.0, z: 0.0 },
      Vec3 { x: 0.0, y: 1.0, z: 0.0 },
      Vec3 { x: 0.0, y: 0.0, z: 1.0 }
    ]
  };

  pub fn from_rows( r0 : Vec3, r1 : Vec3, r2 : Vec3 ) -> Mat3 {
    Mat3 { rows: [ r0, r1, r2 ] }
  }

  pub fn transpose( self ) -> Mat3 {
    Mat3::from_rows(
      Vec3::new( self.rows[0].x, self.rows[1].x, self.rows[2].x ),
      Vec3::new( self.rows[0].y, self.rows[1].y, self.rows[2].y ),
      Vec3::new( self.rows[0].z, self.rows[1].z, self.rows[2].z ) )
  }

  /// `M * v`, treating `v` as a column vector.
  pub fn mul_vec( self, v : Vec3 ) -> Vec3 {
    Vec3::new( self.rows[0].dot( v ), self.rows[1].dot( v ), self.rows[2].dot( v ) )
  }

  /// `v^T * M`, i.e. `M^T * v` as a column vector. This is the convention
  /// used to transform tangent-space directions by a TBN frame.
  pub fn mul_vec_left( self, v : Vec3 ) -> Vec3 {
    self.transpose( ).mul_vec( v )
  }
}

impl Mat4 {
  pub const IDENTITY: Mat4 = Mat4 {
    rows: [
      Vec4 { x: 1.0, y: 0.0, z: 0.0, w: 0.0 },
      Vec4 { x: 0.0, y: 1.0, z: 0.0, w: 0.0 },
      Vec4 { x: 0.0, y: 0.0, z: 1.0, w: 0.0 },
      Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    ]
  };

  pub fn from_rows( r0 : Vec4, r1 : Vec4, r2 : Vec4, r3 : Vec4 ) -> Mat4 {
    Mat4 { rows: [ r0, r1, r2, r3 ] }
  }

  pub fn translation( offset : Vec3 ) -> Mat4 {
    Mat4::from_rows(
      Vec4::new( 1.0, 0.0, 0.0, offset.x ),
      Vec4::new( 0.0, 1.0, 0.0, offset.y ),
      Vec4::new( 0.0, 0.0, 1.0, offset.z ),
      Vec4::new( 0.0, 0.0, 0.0, 1.0 ) )
  }

  pub fn scaling( scale : Vec3 ) -> Mat4 {
    Mat4::from_rows(
      Vec4::new( scale.x, 0.0, 0.0, 0.0 ),
      Vec4::new( 0.0, scale.y, 0.0, 0.0 ),
      Vec4::new( 0.0, 0.0, scale.z, 0.0 ),
      Vec4::new( 0.0, 0.0, 0.0, 1.0 ) )
  }

  /// Rotation of `angle` radians around `axis` (Rodrigues' formula), via
  /// `expand_rotation_3`.
  pub fn rotation( axis : Vec3, angle : f32 ) -> Mat4 {
    let sa = angle.sin( );
    let ca = angle.cos( );
    let k = Mat3::from_rows(
      Vec3::new( 0.0, axis.z, -axis.y ),
      Vec3::new( -axis.z, 0.0, axis.x ),
      Vec3::new( axis.y, -axis.x, 0.0 ) );
    let kk = mat3_mul( k, k );

    let mut r = Mat3::IDENTITY;
    for i in 0..3 {
      r.rows[i] = r.rows[i] + k.rows[i] * sa + kk.rows[i] * ( 1.0 - ca );
    }
    expand_m3m4( r )
  }

  pub fn transpose( self ) -> Mat4 {
    Mat4::from_rows(
      Vec4::new( self.rows[0].x, self.rows[1].x, self.rows[2].x, self.rows[3].x ),
      Vec4::new( self.rows[0].y, self.rows[1].y, self.rows[2].y, self.rows[3].y ),
      Vec4::new( self.rows[0].z, self.rows[1].z, self.rows[2].z, self.rows[3].z ),
      Vec4::new( self.rows[0].w, self.rows[1].w, self.rows[2].w, self.rows[3].w ) )
  }

  /// `M * v`, treating `v` as a column vector.
  pub fn mul_vec( self, v : Vec4 ) -> Vec4 {
    Vec4::new(
      self.rows[0].dot( v ), self.rows[1].dot( v ),
      self.rows[2].dot( v ), self.rows[3].dot( v ) )
  }

  /// Matrix inverse via cofactor expansion. Adapted from the same
  /// reference formulation GLM uses for `inverse(mat4)`.
  pub fn inverse( self ) -> Mat4 {
    let a = self;
    let r = |i : usize, c : usize| a.rows[i].get( c );

    let c00 = r(2,2) * r(3,3) - r(3,2) * r(2,3);
    let c02 = r(1,2) * r(3,3) - r(3,2) * r(1,3);
    let c03 = r(1,2) * r(2,3) - r(2,2) * r(1,3);
    let c04 = r(2,1) * r(3,3) - r(3,1) * r(2,3);
    let c06 = r(1,1) * r(3,3) - r(3,1) * r(1,3);
    let c07 = r(1,1) * r(2,3) - r(2,1) * r(1,3);
    let c08 = r(2,1) * r(3,2) - r(3,1) * r(2,2);
    let c10 = r(1,1) * r(3,2) - r(3,1) * r(1,2);
    let c11 = r(1,1) * r(2,2) - r(2,1) * r(1,2);
    let c12 = r(2,0) * r(3,3) - r(3,0) * r(2,3);
    let c14 = r(1,0) * r(3,3) - r(3,0) * r(1,3);
    let c15 = r(1,0) * r(2,3) - r(2,0) * r(1,3);
    let c16 = r(2,0) * r(3,2) - r(3,0) * r(2,2);
    let c18 = r(1,0) * r(3,2) - r(3,0) * r(1,2);
    let c19 = r(1,0) * r(2,2) - r(2,0) * r(1,2);
    let c20 = r(2,0) * r(3,1) - r(3,0) * r(2,1);
    let c22 = r(1,0) * r(3,1) - r(3,0) * r(1,1);
    let c23 = r(1,0) * r(2,1) - r(2,0) * r(1,1);

    let f0 = Vec4::new( c00, c00, c02, c03 );
    let f1 = Vec4::new( c04, c04, c06, c07 );
    let f2 = Vec4::new( c08, c08, c10, c11 );
    let f3 = Vec4::new( c12, c12, c14, c15 );
    let f4 = Vec4::new( c16, c16, c18, c19 );
    let f5 = Vec4::new( c20, c20, c22, c23 );

    let v0 = Vec4::new( r(1,0), r(0,0), r(0,0), r(0,0) );
    let v1 = Vec4::new( r(1,1), r(0,1), r(0,1), r(0,1) );
    let v2 = Vec4::new( r(1,2), r(0,2), r(0,2), r(0,2) );
    let v3 = Vec4::new( r(1,3), r(0,3), r(0,3), r(0,3) );

    let sign_a = Vec4::new( 1.0, -1.0, 1.0, -1.0 );
    let sign_b = Vec4::new( -1.0, 1.0, -1.0, 1.0 );

    let inv0 = vec4_mul( vec4_sub( vec4_mul( v1, f0 ), vec4_mul( v2, f1 ) ) + vec4_mul( v3, f2 ), sign_a );
    let inv1 = vec4_mul( vec4_sub( vec4_mul( v0, f0 ), vec4_mul( v2, f3 ) ) + vec4_mul( v3, f4 ), sign_b );
    let inv2 = vec4_mul( vec4_sub( vec4_mul( v0, f1 ), vec4_mul( v1, f3 ) ) + vec4_mul( v3, f5 ), sign_a );
    let inv3 = vec4_mul( vec4_sub( vec4_mul( v0, f2 ), vec4_mul( v1, f4 ) ) + vec4_mul( v2, f5 ), sign_b );

    let inv = Mat4::from_rows( inv0, inv1, inv2, inv3 );

    let det = a.rows[0].dot( Vec4::new(
      inv.rows[0].x, inv.rows[1].x, inv.rows[2].x, inv.rows[3].x ) );
    let inv_det = 1.0 / det;
    Mat4::from_rows(
      inv.rows[0] * inv_det, inv.rows[1] * inv_det,
      inv.rows[2] * inv_det, inv.rows[3] * inv_det )
  }
}

impl ops::Mul< Mat4 > for Mat4 {
  type Output = Mat4;

  /// Matrix composition: `(self * rhs).mul_vec(v) == self.mul_vec(rhs.mul_vec(v))`.
  fn mul( self, rhs : Mat4 ) -> Mat4 {
    let rhs_t = rhs.transpose( );
    Mat4::from_rows(
      Vec4::new( self.rows[0].dot( rhs_t.rows[0] ), self.rows[0].dot( rhs_t.rows[1] ), self.rows[0].dot( rhs_t.rows[2] ), self.rows[0].dot( rhs_t.rows[3] ) ),
      Vec4::new( self.rows[1].dot( rhs_t.rows[0] ), self.rows[1].dot( rhs_t.rows[1] ), self.rows[1].dot( rhs_t.rows[2] ), self.rows[1].dot( rhs_t.rows[3] ) ),
      Vec4::new( self.rows[2].dot( rhs_t.rows[0] ), self.rows[2].dot( rhs_t.rows[1] ), self.rows[2].dot( rhs_t.rows[2] ), self.rows[2].dot( rhs_t.rows[3] ) ),
      Vec4::new( self.rows[3].dot( rhs_t.rows[0] ), self.rows[3].dot( rhs_t.rows[1] ), self.rows[3].dot( rhs_t.rows[2] ), self.rows[3].dot( rhs_t.rows[3] ) ) )
  }
}

fn vec4_sub( a : Vec4, b : Vec4 ) -> Vec4 {
  Vec4::new( a.x - b.x, a.y - b.y, a.z - b.z, a.w - b.w )
}

fn vec4_mul( a : Vec4, b : Vec4 ) -> Vec4 {
  Vec4::new( a.x * b.x, a.y * b.y, a.z * b.z, a.w * b.w )
}

fn mat3_mul( b : Mat3, a : Mat3 ) -> Mat3 {
  let bt = b.transpose( );
  Mat3::from_rows(
    Vec3::new( a.rows[0].dot( bt.rows[0] ), a.rows[0].dot( bt.rows[1] ), a.rows[0].dot( bt.rows[2] ) ),
    Vec3::new( a.rows[1].dot( bt.rows[0] ), a.rows[1].dot( bt.rows[1] ), a.rows[1].dot( bt.rows[2] ) ),
    Vec3::new( a.rows[2].dot( bt.rows[0] ), a.rows[2].dot( bt.rows[1] ), a.rows[2].dot( bt.rows[2] ) ) )
}

/// Embeds a 3x3 linear map as the upper-left block of a 4x4 affine matrix.
pub fn expand_m3m4( m : Mat3 ) -> Mat4 {
  Mat4::from_rows(
    Vec4::new( m.rows[0].x, m.rows[0].y, m.rows[0].z, 0.0 ),
    Vec4::new( m.rows[1].x, m.rows[1].y, m.rows[1].z, 0.0 ),
    Vec4::new( m.rows[2].x, m.rows[2].y, m.rows[2].z, 0.0 ),
    Vec4::new( 0.0, 0.0, 0.0, 1.0 ) )
}

/// Extracts the upper-left 3x3 linear part of a 4x4 matrix, discarding
/// translation. Used to transform directions (as opposed to points).
pub fn extract_m4m3( m : Mat4 ) -> Mat3 {
  Mat3::from_rows(
    Vec3::new( m.rows[0].x, m.rows[0].y, m.rows[0].z ),
    Vec3::new( m.rows[1].x, m.rows[1].y, m.rows[1].z ),
    Vec3::new( m.rows[2].x, m.rows[2].y, m.rows[2].z ) )
}
