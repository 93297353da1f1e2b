
use crate::bvh::{ Bvh, BvhLink, TlasInstance, MISS };
use crate::math::mat::extract_m4m3;
use crate::math::{ Vec3, Vec4 };
use crate::mesh::{ Mesh, MeshBuffers };
use crate::ray::{ ray_triangle_intersection, Aabb, TriangleIntersector };

/// Result of a completed or in-progress ray query.
#[derive(Copy,Clone,Debug)]
pub struct HitInfo {
  /// `(u, v, 1-u-v)` barycentric weights of the hit triangle.
  pub barycentrics : Vec3,
  /// Hit distance along the ray, negative when there is no hit.
  pub thit         : f32,
  pub instance_id  : u32,
  pub primitive_id : u32,
  pub back_face    : bool
}

impl HitInfo {
  fn miss( ) -> HitInfo {
    HitInfo { barycentrics: Vec3::ZERO, thit: -1.0, instance_id: MISS, primitive_id: 0, back_face: false }
  }

  pub fn is_hit( &self ) -> bool {
    self.thit >= 0.0
  }
}

#[derive(Copy,Clone,Debug)]
struct Context {
  as_bvh      : Bvh,
  origin      : Vec3,
  dir         : Vec3,
  inv_dir     : Vec3,
  link_offset : u32,
  node_index  : u32
}

fn safe_inv_dir( dir : Vec3 ) -> Vec3 {
  Vec3::new(
    if dir.x == 0.0 { 1e40 } else { 1.0 / dir.x },
    if dir.y == 0.0 { 1e40 } else { 1.0 / dir.y },
    if dir.z == 0.0 { 1e40 } else { 1.0 / dir.z } )
}

fn directional_link_index( dir : Vec3 ) -> u32 {
  ( if dir.x > 0.0 { 1 } else { 0 } ) |
  ( if dir.y > 0.0 { 2 } else { 0 } ) |
  ( if dir.z > 0.0 { 4 } else { 0 } )
}

/// Stackless traversal of a TLAS, switching transparently into whichever
/// BLAS a TLAS instance resolves to. Modeled after Vulkan's ray query
/// interface: call `proceed()` in a loop, inspect `candidate`, and call
/// `confirm()` to accept it as the new closest hit.
///
/// ```ignore
/// let mut rq = RayQuery::new( tlas, instances, nodes, links, mesh_buffers, origin, dir, tmin, tmax );
/// while rq.proceed( ) {
///   if should_accept( &rq.candidate ) { rq.confirm( ); }
/// }
/// // rq.closest now holds the nearest accepted hit, if any.
/// ```
pub struct RayQuery< 'a > {
  nodes        : &'a [ Aabb ],
  links        : &'a [ BvhLink ],
  instances    : &'a [ TlasInstance ],
  mesh_buffers : &'a MeshBuffers,

  tlas_ctx : Context,
  blas_ctx : Context,
  blas_mesh  : Mesh,
  blas_isect : TriangleIntersector,
  /// `< 0` while traversing the TLAS; the preprocessed triangle axis once
  /// inside a BLAS.
  blas_axis : i32,

  tmin : f32,
  tmax : f32,

  pub candidate : HitInfo,
  pub closest   : HitInfo
}

impl< 'a > RayQuery< 'a > {
  pub fn new(
    tlas : Bvh,
    instances : &'a [ TlasInstance ],
    nodes : &'a [ Aabb ],
    links : &'a [ BvhLink ],
    mesh_buffers : &'a MeshBuffers,
    origin : Vec3, direction : Vec3,
    tmin : f32, tmax : f32
  ) -> RayQuery< 'a > {
    let inv_dir = safe_inv_dir( direction );
    let link_offset = tlas.node_offset * 8 + directional_link_index( direction ) * tlas.node_count;

    RayQuery {
      nodes, links, instances, mesh_buffers,
      tlas_ctx: Context { as_bvh: tlas, origin, dir: direction, inv_dir, link_offset, node_index: 0 },
      blas_ctx: Context { as_bvh: Bvh { node_count: 0, node_offset: 0 }, origin: Vec3::ZERO, dir: Vec3::ZERO, inv_dir: Vec3::ZERO, link_offset: 0, node_index: 0 },
      blas_mesh: Mesh { vertex_count: 0, triangle_count: 0, index_offset: 0, base_vertex_offset: 0 },
      blas_isect: TriangleIntersector { axis: 2, s: Vec3::ZERO },
      blas_axis: -1,
      tmin, tmax,
      candidate: HitInfo::miss( ),
      closest: HitInfo::miss( )
    }
  }

  fn enter_blas( &mut self, index : u32 ) {
    let inst = self.instances[ index as usize ];
    self.blas_ctx.as_bvh = inst.blas;

    let origin = inst.inv_transform.mul_vec( Vec4::from_vec3( self.tlas_ctx.origin, 1.0 ) ).xyz( );
    self.blas_ctx.origin = origin;

    let dir_transform = extract_m4m3( inst.inv_transform );
    let dir = dir_transform.mul_vec( self.tlas_ctx.dir );

    self.blas_ctx.dir = dir;
    self.blas_ctx.inv_dir = safe_inv_dir( dir );
    self.blas_ctx.link_offset = inst.blas.node_offset * 8 + directional_link_index( dir ) * inst.blas.node_count;
    self.blas_ctx.node_index = 0;
    self.blas_mesh = inst.mesh;

    self.blas_isect = TriangleIntersector::new( dir );
    self.blas_axis = self.blas_isect.axis;
  }

  fn traverse( ctx : &mut Context, nodes : &[ Aabb ], links : &[ BvhLink ], tmin : f32, tmax : f32 ) -> u32 {
    while ctx.node_index < ctx.as_bvh.node_count {
      let node = nodes[ ( ctx.as_bvh.node_offset + ctx.node_index ) as usize ];
      let link = links[ ( ctx.link_offset + ctx.node_index ) as usize ];
      let ( near, far ) = node.intersect( ctx.origin, ctx.inv_dir );

      if near <= far && far > tmin && near < tmax {
        let accept = link.accept & 0x7FFF_FFFF;
        if accept != link.accept {
          ctx.node_index = link.cancel;
          return accept;
        } else {
          ctx.node_index = accept;
        }
      } else {
        ctx.node_index = link.cancel;
      }
    }
    MISS
  }

  fn test_triangle( &mut self ) -> bool {
    let p = self.mesh_buffers.triangle_positions( &self.blas_mesh, self.candidate.primitive_id );
    match ray_triangle_intersection( self.blas_ctx.origin, self.blas_isect, p[0], p[1], p[2] ) {
      Some( hit ) => {
        self.candidate.thit = hit.t;
        self.candidate.barycentrics = Vec3::new( hit.u, hit.v, 1.0 - hit.u - hit.v );
        self.candidate.back_face = hit.back_face;
        hit.t < self.tmax && hit.t > self.tmin
      }
      None => {
        self.candidate.thit = -1.0;
        false
      }
    }
  }

  /// Advances traversal to the next raw candidate hit. Returns `false` once
  /// the whole TLAS/BLAS combination has been exhausted.
  pub fn proceed( &mut self ) -> bool {
    loop {
      let leaf = if self.blas_axis < 0 {
        RayQuery::traverse( &mut self.tlas_ctx, self.nodes, self.links, self.tmin, self.tmax )
      } else {
        RayQuery::traverse( &mut self.blas_ctx, self.nodes, self.links, self.tmin, self.tmax )
      };

      if leaf != MISS {
        if self.blas_axis < 0 {
          self.candidate.instance_id = leaf;
          self.enter_blas( leaf );
        } else {
          self.candidate.primitive_id = leaf;
          if self.test_triangle( ) { return true; }
        }
      } else if self.blas_axis < 0 {
        return false;
      } else {
        self.blas_axis = -1;
      }
    }
  }

  /// Accepts `candidate` as the new closest hit, shrinking `tmax` so
  /// further traversal only considers closer hits.
  pub fn confirm( &mut self ) {
    self.closest = self.candidate;
    self.tmax = self.candidate.thit;
  }
}

/// Convenience wrapper around the `proceed`/`confirm` loop for the common
/// case of wanting the single closest opaque hit.
pub fn find_closest_hit(
  tlas : Bvh, instances : &[ TlasInstance ], nodes : &[ Aabb ], links : &[ BvhLink ],
  mesh_buffers : &MeshBuffers, origin : Vec3, direction : Vec3, tmin : f32, tmax : f32
) -> HitInfo {
  let mut rq = RayQuery::new( tlas, instances, nodes, links, mesh_buffers, origin, direction, tmin, tmax );
  while rq.proceed( ) { rq.confirm( ); }
  rq.closest
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bvh::{ build_blas, build_tlas, BvhBuffers };
  use crate::math::Mat4;

  fn triangle_scene( ) -> ( MeshBuffers, BvhBuffers, Bvh, Vec< TlasInstance > ) {
    let mut mb = MeshBuffers::new( );
    for corner in &[ Vec3::new( -1.0, -1.0, 0.0 ), Vec3::new( 1.0, -1.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 ) ] {
      mb.pos.push( *corner );
      mb.normal.push( Vec3::new( 0.0, 0.0, 1.0 ) );
      mb.albedo.push( Vec4::ZERO );
      mb.material.push( Vec4::ZERO );
    }
    mb.indices.extend_from_slice( &[ 0, 1, 2 ] );
    let mesh = Mesh { vertex_count: 3, triangle_count: 1, index_offset: 0, base_vertex_offset: 0 };

    let mut bc = BvhBuffers::new( );
    let blas = build_blas( &mesh, &mb, &mut bc );
    let transform = Mat4::IDENTITY;
    let instances = vec![ TlasInstance { blas, mesh, transform, inv_transform: transform.inverse( ) } ];
    let tlas = build_tlas( &[ ( 0, instances[0] ) ], &mut bc );
    ( mb, bc, tlas, instances )
  }

  #[test]
  fn ray_through_triangle_hits( ) {
    let ( mb, bc, tlas, instances ) = triangle_scene( );
    let hit = find_closest_hit(
      tlas, &instances, &bc.nodes, &bc.links, &mb,
      Vec3::new( 0.0, 0.0, -5.0 ), Vec3::new( 0.0, 0.0, 1.0 ), 0.0, 1e30 );
    assert!( hit.is_hit( ) );
    assert_eq!( hit.instance_id, 0 );
  }

  #[test]
  fn ray_missing_triangle_misses( ) {
    let ( mb, bc, tlas, instances ) = triangle_scene( );
    let hit = find_closest_hit(
      tlas, &instances, &bc.nodes, &bc.links, &mb,
      Vec3::new( 10.0, 10.0, -5.0 ), Vec3::new( 0.0, 0.0, 1.0 ), 0.0, 1e30 );
    assert!( !hit.is_hit( ) );
  }
}
