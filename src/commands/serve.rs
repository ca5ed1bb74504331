use actix_web::{delete, get, middleware, put, web, App, HttpServer, HttpResponse, Responder};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use clap::Parser;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::cache::{codec, BoundedMemoryCache, PersistentTileCache, TileCache};
use crate::models::map_info::MapFileInfo;
use crate::models::tile::TileKey;
use crate::store::config;
use crate::store::map_file::MapFile;

#[derive(Parser)]
pub struct ServeCommand {
  // Port to listen on
  #[clap(long, default_value_t = 3000)]
  port: u16,

  // Host to listen on
  #[clap(long, default_value = "localhost")]
  host: String,

  // Cache configuration
  #[clap(required=true)]
  config_file: String
}

pub struct MapEntry {
  map: MapFile,
  cache: PersistentTileCache,
}

type MapsArc = Arc<HashMap<String, MapEntry>>;

impl ServeCommand {
  pub fn execute(&self) -> Result<(), Box<dyn Error>> {
    let config = config::Root::from_file(&self.config_file)?;

    // caches spawn their disk tasks on this runtime
    let rt = Runtime::new()?;
    let maps = {
      let _guard = rt.enter();
      load_maps(&config)?
    };

    let maps = Arc::new(maps);
    rt.block_on(async {
      server(&self.host, self.port, maps.clone()).await?;
      for entry in maps.values() {
        entry.cache.flush().await;
      }
      Ok::<(), std::io::Error>(())
    })?;
    Ok(())
  }
}

fn load_maps(config: &config::Root) -> Result<HashMap<String, MapEntry>, Box<dyn Error>> {
  let mut maps = HashMap::new();
  for serialized_map in config.maps.iter() {
    let map = serialized_map.load()?;
    let memory = Arc::new(BoundedMemoryCache::new(config.memory_capacity));
    let cache = PersistentTileCache::new(memory, &config.cache_dir, &serialized_map.profile)?;
    maps.insert(serialized_map.name.clone(), MapEntry { map, cache });
  }
  Ok(maps)
}

fn text_response(status: StatusCode, body: String) -> HttpResponse {
  HttpResponse::build(status)
    .content_type(ContentType(mime::TEXT_PLAIN))
    .body(body)
}

fn map_not_found() -> HttpResponse {
  text_response(StatusCode::NOT_FOUND, "map not found".to_string())
}

#[derive(Serialize)]
struct MapStatus<'a> {
  map: &'a MapFileInfo,
  cache_directory: &'a Path,
  cache_initialized: bool,
  cached_tiles: usize,
}

#[get("/maps/{name}/info")]
async fn get_map_info(maps: web::Data<MapsArc>, path: web::Path<String>) -> impl Responder {
  let entry = match maps.get(&path.into_inner()) {
    Some(e) => e,
    None => return map_not_found(),
  };

  let status = MapStatus {
    map: entry.map.header().map_file_info(),
    cache_directory: entry.cache.directory(),
    cache_initialized: entry.cache.is_initialized(),
    cached_tiles: entry.cache.tracked_count(),
  };
  match serde_yaml::to_string(&status) {
    Ok(body) => text_response(StatusCode::OK, body),
    Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
  }
}

#[get("/maps/{name}/tiles/{zoom}/{tile_x}/{tile_y}.png")]
async fn get_tile(
  maps: web::Data<MapsArc>,
  path: web::Path<(String, u8, u32, u32)>,
) -> impl Responder {
  let (name, zoom, tile_x, tile_y) = path.into_inner();
  let entry = match maps.get(&name) {
    Some(e) => e,
    None => return map_not_found(),
  };

  let key = TileKey::new(zoom, tile_x, tile_y);
  let lookup = match entry.cache.get_tile_bitmap(&key) {
    Some(bitmap) => Ok(Some(bitmap)),
    None => entry.cache.get_tile_bitmap_async(&key).await,
  };
  let bitmap = match lookup {
    Ok(Some(b)) => b,
    Ok(None) => return text_response(StatusCode::NOT_FOUND, "tile not rendered".to_string()),
    Err(e) => {
      error!("Cached tile {} of {} is unusable: {}", key, name, e);
      return text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
  };

  match web::block(move || codec::encode(&bitmap)).await {
    Ok(Ok(imgdata)) => HttpResponse::Ok()
      .content_type(ContentType(mime::IMAGE_PNG))
      .append_header(("cache-control", "max-age=2678400"))
      .body(imgdata),
    Ok(Err(e)) => text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
  }
}

/// Accepts a tile rendered elsewhere. The first upload for a tile wins.
#[put("/maps/{name}/tiles/{zoom}/{tile_x}/{tile_y}.png")]
async fn put_tile(
  maps: web::Data<MapsArc>,
  path: web::Path<(String, u8, u32, u32)>,
  body: web::Bytes,
) -> impl Responder {
  let (name, zoom, tile_x, tile_y) = path.into_inner();
  let entry = match maps.get(&name) {
    Some(e) => e,
    None => return map_not_found(),
  };

  let header = entry.map.header();
  if header.query_zoom_level(zoom) != zoom {
    return text_response(StatusCode::BAD_REQUEST, format!("zoom level {} not covered by map", zoom));
  }

  let bitmap = match web::block(move || codec::decode(&body)).await {
    Ok(Ok(b)) => b,
    Ok(Err(e)) => return text_response(StatusCode::BAD_REQUEST, e.to_string()),
    Err(e) => return text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
  };
  let tile_size = header.map_file_info().tile_pixel_size as u32;
  if bitmap.width() != tile_size || bitmap.height() != tile_size {
    return text_response(
      StatusCode::BAD_REQUEST,
      format!("tile must be {0}x{0} pixels", tile_size),
    );
  }

  let key = TileKey::new(zoom, tile_x, tile_y);
  entry.cache.add_tile_bitmap(key, Arc::new(bitmap));
  text_response(StatusCode::CREATED, key.to_string())
}

#[delete("/maps/{name}/tiles")]
async fn purge_tiles(maps: web::Data<MapsArc>, path: web::Path<String>) -> impl Responder {
  let name = path.into_inner();
  let entry = match maps.get(&name) {
    Some(e) => e,
    None => return map_not_found(),
  };
  let deleted = entry.cache.purge().await;
  warn!("Purged {} tiles of {}", deleted, name);
  text_response(StatusCode::OK, deleted.to_string())
}

fn configure(cfg: &mut web::ServiceConfig) {
  cfg
    .service(get_map_info)
    .service(get_tile)
    .service(put_tile)
    .service(purge_tiles);
}

async fn server(host: &str, port: u16, maps: MapsArc) -> std::io::Result<()> {
  info!("Starting server on {}:{}", host, port);
  HttpServer::new(move || {
      App::new()
        .app_data(web::Data::new(maps.clone()))
        .wrap(middleware::Logger::default())
        .configure(configure)
  })
  .bind((host, port))?
  .run()
  .await
}
