
use std::fs;
use std::path::Path;

use crate::error::RenderError;
use crate::math::Vec3;

/// Maps a linear HDR color to an 8-bit sRGB `(r, g, b)` triple via a
/// simplified ACES fit followed by the standard sRGB transfer function.
pub fn tonemap_pixel( color : Vec3 ) -> [ u8; 3 ] {
  let mapped = ( color * ( color * 2.51 + Vec3::splat( 0.03 ) ) ) /
    ( color * ( color * 2.43 + Vec3::splat( 0.59 ) ) + Vec3::splat( 0.14 ) );

  let srgb = |c : f32| if c < 0.0031308 { c * 12.92 } else { c.powf( 1.0 / 2.4 ) * 1.055 - 0.055 };
  let encoded = Vec3::new( srgb( mapped.x ), srgb( mapped.y ), srgb( mapped.z ) )
    .clamp( Vec3::ZERO, Vec3::ONE );

  [
    ( encoded.x * 255.0 ).round( ) as u8,
    ( encoded.y * 255.0 ).round( ) as u8,
    ( encoded.z * 255.0 ).round( ) as u8
  ]
}

/// Writes a 24-bit BGR bottom-up DIB (`BITMAPFILEHEADER` + 40-byte
/// `BITMAPINFOHEADER`), matching the format any standard image viewer
/// expects. `pixels` is `width * height` RGB triples in top-down row-major
/// order; the row order is flipped on write, not by the caller.
pub fn write_bmp( path : &Path, width : u32, height : u32, pixels : &[ [ u8; 3 ] ] ) -> Result< (), RenderError > {
  assert_eq!( pixels.len( ), ( width * height ) as usize );

  let row_stride = ( width * 3 + 3 ) / 4 * 4;
  let file_size = 54 + row_stride * height;
  let mut data = vec![ 0u8; file_size as usize ];

  data[0x00..0x02].copy_from_slice( b"BM" );
  data[0x02..0x06].copy_from_slice( &file_size.to_le_bytes( ) );
  data[0x0A..0x0E].copy_from_slice( &54u32.to_le_bytes( ) );

  data[0x0E..0x12].copy_from_slice( &40u32.to_le_bytes( ) );
  data[0x12..0x16].copy_from_slice( &width.to_le_bytes( ) );
  data[0x16..0x1A].copy_from_slice( &height.to_le_bytes( ) );
  data[0x1A..0x1C].copy_from_slice( &1u16.to_le_bytes( ) );
  data[0x1C..0x1E].copy_from_slice( &24u16.to_le_bytes( ) );
  data[0x1E..0x22].copy_from_slice( &0u32.to_le_bytes( ) );
  data[0x22..0x26].copy_from_slice( &( row_stride * height ).to_le_bytes( ) );
  data[0x26..0x2A].copy_from_slice( &2835u32.to_le_bytes( ) );
  data[0x2A..0x2E].copy_from_slice( &2835u32.to_le_bytes( ) );
  data[0x2E..0x32].copy_from_slice( &0u32.to_le_bytes( ) );
  data[0x32..0x36].copy_from_slice( &0u32.to_le_bytes( ) );

  for y in 0..height {
    let src_row = height - 1 - y;
    for x in 0..width {
      let [ r, g, b ] = pixels[ ( src_row * width + x ) as usize ];
      let offset = 54 + y * row_stride + x * 3;
      data[ offset as usize ] = b;
      data[ offset as usize + 1 ] = g;
      data[ offset as usize + 2 ] = r;
    }
  }

  fs::write( path, data )
    .map_err( |e| RenderError::ImageWrite { path: path.display( ).to_string( ), source: e } )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tonemap_clamps_to_valid_byte_range( ) {
    let p = tonemap_pixel( Vec3::new( 50.0, 0.0, -1.0 ) );
    assert!( p[0] <= 255 );
    assert_eq!( p[2], 0 );
  }

  #[test]
  fn tonemap_black_stays_black( ) {
    assert_eq!( tonemap_pixel( Vec3::ZERO ), [ 0, 0, 0 ] );
  }

  #[test]
  fn bmp_header_has_expected_magic_and_size( ) {
    let pixels = vec![ [ 255u8, 0, 0 ]; 4 ];
    let dir = std::env::temp_dir( ).join( "pathtracer_bmp_test.bmp" );
    write_bmp( &dir, 2, 2, &pixels ).unwrap( );
    let bytes = fs::read( &dir ).unwrap( );
    assert_eq!( &bytes[0..2], b"BM" );
    assert_eq!( bytes.len( ), 54 + 8 * 2 );
    let _ = fs::remove_file( &dir );
  }
}
