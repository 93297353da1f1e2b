pub mod vec2;
pub mod vec3;
pub mod vec4;
pub mod mat;
pub mod rng;

pub use vec2::Vec2;
pub use vec3::Vec3;
pub use vec4::Vec4;
pub use mat::{ Mat3, Mat4 };
pub use rng::{ Pcg4d, inv_erf };

/// Minimum ray-traversal epsilon, kept separate from `config::MIN_RAY_DIST`
/// since this one guards general float comparisons, not ray self-intersection.
pub static EPSILON : f32 = 0.0002;

pub fn clamp( x : f32, min_val : f32, max_val : f32 ) -> f32 {
  max_val.min( min_val.max( x ) )
}

pub fn mix( a : f32, b : f32, t : f32 ) -> f32 {
  a * ( 1.0 - t ) + b * t
}

pub fn mix_vec3( a : Vec3, b : Vec3, t : f32 ) -> Vec3 {
  a * ( 1.0 - t ) + b * t
}

/// Builds an orthonormal tangent vector for `normal`, picking whichever
/// world axis is least aligned with it to avoid a degenerate cross product.
pub fn create_tangent( normal : Vec3 ) -> Vec3 {
  let major =
    if normal.x.abs( ) < 0.57735026918962576451 { Vec3::new( 1.0, 0.0, 0.0 ) }
    else if normal.y.abs( ) < 0.57735026918962576451 { Vec3::new( 0.0, 1.0, 0.0 ) }
    else { Vec3::new( 0.0, 0.0, 1.0 ) };
  normal.cross( major ).normalize( )
}

/// Builds a tangent-bitangent-normal frame as a `Mat3` whose rows are
/// `(tangent, bitangent, normal)` — multiplying a tangent-space vector by
/// this matrix's transpose maps it into world space.
pub fn create_tangent_space( normal : Vec3 ) -> Mat3 {
  let tangent = create_tangent( normal );
  let bitangent = normal.cross( tangent );
  Mat3::from_rows( tangent, bitangent, normal )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tangent_frame_is_orthonormal( ) {
    let normal = Vec3::new( 0.2, 0.6, 0.7745966 ).normalize( );
    let tbn = create_tangent_space( normal );
    let t = tbn.rows[0];
    let b = tbn.rows[1];
    let n = tbn.rows[2];

    assert!( ( t.len( ) - 1.0 ).abs( ) < 1e-6 );
    assert!( ( b.len( ) - 1.0 ).abs( ) < 1e-6 );
    assert!( t.dot( b ).abs( ) < 1e-6 );
    assert!( t.dot( n ).abs( ) < 1e-6 );
    assert!( b.dot( n ).abs( ) < 1e-6 );

    let cross = t.cross( b );
    assert!( ( cross.x - n.x ).abs( ) < 1e-6 );
    assert!( ( cross.y - n.y ).abs( ) < 1e-6 );
    assert!( ( cross.z - n.z ).abs( ) < 1e-6 );
  }
}
