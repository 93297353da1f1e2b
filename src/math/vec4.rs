
use std::ops;
use crate::math::vec3::Vec3;

/// A four-component float vector. Used for homogeneous points/directions and
/// for the packed `(rgb, alpha)` / `(roughness, metallic, transmission,
/// emission)` mesh vertex channels.
#[derive(Copy,Clone,Debug,PartialEq)]
pub struct Vec4 {
  pub x : f32,
  pub y : f32,
  pub z : f32,
  pub w : f32
}

impl Vec4 {
  pub const ZERO: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

  pub fn new( x : f32, y : f32, z : f32, w : f32 ) -> Vec4 {
    Vec4 { x, y, z, w }
  }

  pub fn from_vec3( v : Vec3, w : f32 ) -> Vec4 {
    Vec4::new( v.x, v.y, v.z, w )
  }

  pub fn xyz( self ) -> Vec3 {
    Vec3::new( self.x, self.y, self.z )
  }

  pub fn dot( self, rhs : Vec4 ) -> f32 {
    self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
  }

  pub fn get( self, index : usize ) -> f32 {
    match index {
      0 => self.x,
      1 => self.y,
      2 => self.z,
      _ => self.w
    }
  }
}

impl ops::Add< Vec4 > for Vec4 {
  type Output = Vec4;

  fn add( self, rhs : Vec4 ) -> Vec4 {
    Vec4::new( self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w )
  }
}

impl ops::Mul< f32 > for Vec4 {
  type Output = Vec4;

  fn mul( self, rhs : f32 ) -> Vec4 {
    Vec4::new( self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs )
  }
}
