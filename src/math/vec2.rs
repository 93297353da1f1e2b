
use std::ops;

/// A two-component float vector. Used for film-plane and aperture samples.
#[derive(Copy,Clone,Debug,PartialEq)]
pub struct Vec2 {
  pub x : f32,
  pub y : f32
}

impl Vec2 {
  pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

  pub fn new( x : f32, y : f32 ) -> Vec2 {
    Vec2 { x, y }
  }

  pub fn dot( self, rhs : Vec2 ) -> f32 {
    self.x * rhs.x + self.y * rhs.y
  }

  pub fn len( self ) -> f32 {
    self.dot( self ).sqrt( )
  }

  pub fn normalize( self ) -> Vec2 {
    self / self.len( )
  }

  pub fn floor( self ) -> Vec2 {
    Vec2::new( self.x.floor( ), self.y.floor( ) )
  }
}

impl ops::Neg for Vec2 {
  type Output = Vec2;

  fn neg( self ) -> Vec2 {
    Vec2::new( -self.x, -self.y )
  }
}

impl ops::Add< Vec2 > for Vec2 {
  type Output = Vec2;

  fn add( self, rhs : Vec2 ) -> Vec2 {
    Vec2::new( self.x + rhs.x, self.y + rhs.y )
  }
}

impl ops::Sub< Vec2 > for Vec2 {
  type Output = Vec2;

  fn sub( self, rhs : Vec2 ) -> Vec2 {
    Vec2::new( self.x - rhs.x, self.y - rhs.y )
  }
}

impl ops::Mul< f32 > for Vec2 {
  type Output = Vec2;

  fn mul( self, rhs : f32 ) -> Vec2 {
    Vec2::new( self.x * rhs, self.y * rhs )
  }
}

impl ops::Mul< Vec2 > for Vec2 {
  type Output = Vec2;

  fn mul( self, rhs : Vec2 ) -> Vec2 {
    Vec2::new( self.x * rhs.x, self.y * rhs.y )
  }
}

impl ops::Div< f32 > for Vec2 {
  type Output = Vec2;

  fn div( self, rhs : f32 ) -> Vec2 {
    Vec2::new( self.x / rhs, self.y / rhs )
  }
}
