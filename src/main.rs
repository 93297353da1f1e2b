
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use tracing::info;

use pathtracer::math::Vec3;
use pathtracer::scene::Scene;
use pathtracer::{ config, demo, image, tracer };

fn render_frame( scene : &Scene, width : u32, height : u32, samples : u32 ) -> Vec< [ u8; 3 ] > {
  ( 0..( width * height ) ).into_par_iter( ).map( |idx| {
    let x = idx % width;
    let y = idx / width;

    let mut sum = Vec3::ZERO;
    for sample in 0..samples {
      sum += tracer::path_trace_pixel(
        x, y, sample, &scene.subframes,
        &scene.instances, &scene.bvh_buf.nodes, &scene.bvh_buf.links, &scene.mesh_buf,
        width, height );
    }
    image::tonemap_pixel( sum / samples as f32 )
  } ).collect( )
}

fn main( ) -> anyhow::Result< ( ) > {
  tracing_subscriber::fmt( )
    .with_env_filter( tracing_subscriber::EnvFilter::from_default_env( ) )
    .init( );

  let width = config::IMAGE_WIDTH;
  let height = config::IMAGE_HEIGHT;
  let samples = config::SAMPLES_PER_PIXEL;
  let aspect_ratio = width as f32 / height as f32;

  info!( width, height, samples, "starting render" );

  let ( mut scene, animator ) = demo::build_demo_scene( Path::new( "data" ) )
    .context( "failed to build demo scene" )?;

  std::fs::create_dir_all( "output" ).context( "failed to create output directory" )?;

  let frame_count = demo::animation_frame_count( );
  for frame in 0..frame_count {
    info!( frame, frame_count, "rendering frame" );
    demo::setup_animation_frame( &mut scene, &animator, frame, aspect_ratio );

    let pixels = render_frame( &scene, width, height, samples );

    let path = format!( "output/frame_{:04}.bmp", frame );
    image::write_bmp( Path::new( &path ), width, height, &pixels )
      .with_context( || format!( "failed to write {}", path ) )?;
  }

  info!( "render complete" );
  Ok( ( ) )
}
