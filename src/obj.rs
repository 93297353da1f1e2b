
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::math::{ Vec3, Vec4 };
use crate::mesh::{ Mesh, MeshBuffers };
use crate::error::RenderError;

#[derive(Clone)]
struct MtlMaterial {
  name          : String,
  albedo        : Vec3,
  alpha         : f32,
  emission      : Vec3,
  roughness     : f32,
  metallicness  : f32,
  transmission  : Vec3
}

impl Default for MtlMaterial {
  fn default( ) -> MtlMaterial {
    MtlMaterial {
      name: String::new( ),
      albedo: Vec3::ONE,
      alpha: 0.0,
      emission: Vec3::ZERO,
      roughness: 1.0,
      metallicness: 0.0,
      transmission: Vec3::ZERO
    }
  }
}

#[derive(PartialEq,Eq,Hash,Clone,Copy)]
struct IndexGroup {
  pos_index      : i64,
  normal_index   : i64,
  material_index : i64
}

fn parse_floats( tokens : &mut std::str::SplitWhitespace ) -> [ f32; 3 ] {
  let mut v = [ 0.0f32; 3 ];
  for i in 0..3 {
    v[i] = tokens.next( ).and_then( |t| t.parse( ).ok( ) ).unwrap_or( 0.0 );
  }
  v
}

fn load_mtl( materials : &mut Vec< MtlMaterial >, path : &Path ) -> Result< ( ), RenderError > {
  let text = fs::read_to_string( path )
    .map_err( |e| RenderError::MeshLoad { path: path.display( ).to_string( ), source: e } )?;

  let mut current : Option< usize > = None;
  for line in text.lines( ) {
    let mut tokens = line.split_whitespace( );
    let command = match tokens.next( ) { Some( c ) => c, None => continue };

    if command == "newmtl" {
      let name = tokens.next( ).unwrap_or( "" ).to_string( );
      materials.push( MtlMaterial { name, ..Default::default( ) } );
      current = Some( materials.len( ) - 1 );
    } else if let Some( i ) = current {
      let mat = &mut materials[i];
      match command {
        "Kd" => { let v = parse_floats( &mut tokens ); mat.albedo = Vec3::new( v[0], v[1], v[2] ); }
        "Ke" => { let v = parse_floats( &mut tokens ); mat.emission = Vec3::new( v[0], v[1], v[2] ); }
        "d"  => { mat.alpha = tokens.next( ).and_then( |t| t.parse( ).ok( ) ).unwrap_or( 0.0 ); }
        "Pr" => { mat.roughness = tokens.next( ).and_then( |t| t.parse( ).ok( ) ).unwrap_or( 1.0 ); }
        "Pm" => { mat.metallicness = tokens.next( ).and_then( |t| t.parse( ).ok( ) ).unwrap_or( 0.0 ); }
        "Tf" => { let v = parse_floats( &mut tokens ); mat.transmission = Vec3::new( v[0], v[1], v[2] ); }
        _ => { }
      }
    }
  }

  Ok( ( ) )
}

fn parse_face_index( token : &str ) -> IndexGroup {
  let mut parts = token.split( '/' );
  let pos = parts.next( ).and_then( |t| t.parse::<i64>( ).ok( ) ).unwrap_or( 0 ) - 1;
  let _tex = parts.next( );
  let normal = parts.next( ).and_then( |t| t.parse::<i64>( ).ok( ) ).unwrap_or( 0 ) - 1;
  IndexGroup { pos_index: pos, normal_index: normal, material_index: 0 }
}

/// Loads a Wavefront OBJ file (plus its referenced MTL, if any) into `mb`,
/// fan-triangulating faces with more than three vertices, and returns a
/// handle to the newly appended mesh.
pub fn load_mesh( mb : &mut MeshBuffers, obj_path : &Path ) -> Result< Mesh, RenderError > {
  let index_offset = mb.indices.len( ) as u32;
  let base_vertex_offset = mb.pos.len( ) as u32;

  let mut positions : Vec< Vec3 > = Vec::new( );
  let mut normals : Vec< Vec3 > = Vec::new( );
  let mut materials : Vec< MtlMaterial > = vec![ MtlMaterial::default( ) ];
  let mut active_material = 0usize;
  let mut face_indices : Vec< IndexGroup > = Vec::new( );

  let prefix = obj_path.parent( ).unwrap_or_else( || Path::new( "" ) );

  let text = fs::read_to_string( obj_path )
    .map_err( |e| RenderError::MeshLoad { path: obj_path.display( ).to_string( ), source: e } )?;

  for line in text.lines( ) {
    let mut tokens = line.split_whitespace( );
    let command = match tokens.next( ) { Some( c ) => c, None => continue };

    match command {
      "v" => {
        let v = parse_floats( &mut tokens );
        positions.push( Vec3::new( v[0], v[1], v[2] ) );
      }
      "vn" => {
        let v = parse_floats( &mut tokens );
        normals.push( Vec3::new( v[0], v[1], v[2] ).normalize( ) );
      }
      "vt" => { /* texture coordinates are not used by this renderer */ }
      "f" => {
        let corners : Vec< IndexGroup > = tokens.map( |t| {
          let mut ig = parse_face_index( t );
          ig.material_index = active_material as i64;
          ig
        } ).collect( );
        // Triangulate via a fan from the first vertex, matching how
        // most exporters emit convex n-gons.
        for i in 1..corners.len( ).saturating_sub( 1 ) {
          face_indices.push( corners[0] );
          face_indices.push( corners[i] );
          face_indices.push( corners[i + 1] );
        }
      }
      "usemtl" => {
        if let Some( name ) = tokens.next( ) {
          active_material = materials.iter( ).position( |m| m.name == name ).unwrap_or( active_material );
        }
      }
      "mtllib" => {
        if let Some( name ) = tokens.next( ) {
          load_mtl( &mut materials, &prefix.join( name ) )?;
        }
      }
      _ => { }
    }
  }

  let triangle_count = ( face_indices.len( ) / 3 ) as u32;
  let mut ig_to_index : HashMap< IndexGroup, u32 > = HashMap::new( );
  let mut vertex_count = 0u32;

  for ig in &face_indices {
    if ig.pos_index < 0 || ig.pos_index as usize >= positions.len( ) {
      return Err( RenderError::MalformedMesh { kind: "vertex", index: ig.pos_index } );
    }
    if ig.normal_index >= 0 && ig.normal_index as usize >= normals.len( ) {
      return Err( RenderError::MalformedMesh { kind: "normal", index: ig.normal_index } );
    }

    let vertex_result = ig_to_index.get( ig ).copied( );
    let vertex = match vertex_result {
      Some( v ) => v,
      None => {
        let pos = positions[ ig.pos_index as usize ];
        let normal = if ig.normal_index >= 0 {
          normals[ ig.normal_index as usize ]
        } else { Vec3::ZERO };

        let ( albedo, material ) = if ( ig.material_index as usize ) < materials.len( ) {
          let mat = &materials[ ig.material_index as usize ];
          let albedo = Vec4::new( mat.albedo.x, mat.albedo.y, mat.albedo.z, mat.alpha );

          // Emission is stored as a scalar strength relative to albedo, since
          // vertices only carry one float for it.
          let denom = mat.albedo.max( mat.emission ).max( Vec3::splat( 1e-6 ) );
          let mut scaled_emission = Vec3::new(
            mat.emission.x / denom.x, mat.emission.y / denom.y, mat.emission.z / denom.z
          ).max( Vec3::ZERO );
          if mat.emission.x == 0.0 { scaled_emission.x = 0.0; }
          if mat.emission.y == 0.0 { scaled_emission.y = 0.0; }
          if mat.emission.z == 0.0 { scaled_emission.z = 0.0; }

          let transmission = mat.transmission.x.max( mat.transmission.y ).max( mat.transmission.z );
          let emission = scaled_emission.x.max( scaled_emission.y ).max( scaled_emission.z );
          ( albedo, Vec4::new( mat.roughness, mat.metallicness, transmission, emission ) )
        } else {
          ( Vec4::ZERO, Vec4::ZERO )
        };

        mb.pos.push( pos );
        mb.normal.push( normal );
        mb.albedo.push( albedo );
        mb.material.push( material );
        vertex_count += 1;
        let new_index = vertex_count - 1;
        ig_to_index.insert( *ig, new_index );
        new_index
      }
    };
    mb.indices.push( vertex );
  }

  Ok( Mesh { vertex_count, triangle_count, index_offset, base_vertex_offset } )
}
